#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use mockito::Matcher;
use pmokef::{AudioStream, Clock, KefConfig, Result, ServedStream, StreamServer};

/// What the simulated speaker answers to state queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyMode {
    Normal,
    /// Eight bytes that match no reply prefix.
    Garbage,
}

#[derive(Debug)]
struct DeviceState {
    volume: u8,
    input: u8,
    mode: ReplyMode,
    connections: Vec<Instant>,
    requests: Vec<Vec<u8>>,
}

/// Simulated KEF binary control port on 127.0.0.1.
///
/// The accept loop runs on a detached thread for the lifetime of the test
/// process.
#[derive(Clone, Debug)]
pub struct FakeKefDevice {
    port: u16,
    state: Arc<Mutex<DeviceState>>,
}

impl FakeKefDevice {
    pub fn start() -> Self {
        Self::start_with(ReplyMode::Normal)
    }

    pub fn start_with(mode: ReplyMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(DeviceState {
            volume: 0x20,
            input: 0x12,
            mode,
            connections: Vec::new(),
            requests: Vec::new(),
        }));

        let shared = state.clone();
        thread::spawn(move || {
            for conn in listener.incoming() {
                let Ok(mut conn) = conn else { continue };
                shared.lock().unwrap().connections.push(Instant::now());
                conn.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

                let mut buf = [0u8; 8];
                let n = conn.read(&mut buf).unwrap_or(0);
                let request = buf[..n].to_vec();
                let reply = {
                    let mut state = shared.lock().unwrap();
                    state.requests.push(request.clone());
                    state.handle(&request)
                };
                if let Some(reply) = reply {
                    let _ = conn.write_all(&reply);
                }
            }
        });

        Self { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn volume(&self) -> u8 {
        self.state.lock().unwrap().volume
    }

    pub fn set_volume(&self, code: u8) {
        self.state.lock().unwrap().volume = code;
    }

    pub fn input(&self) -> u8 {
        self.state.lock().unwrap().input
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().unwrap().connections.len()
    }

    /// When each connection was accepted, in order.
    pub fn connection_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().connections.clone()
    }

    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl DeviceState {
    fn handle(&mut self, request: &[u8]) -> Option<[u8; 8]> {
        match request {
            [0x47, 0x25, 0x80] => Some(self.reply([0x52, 0x25, 0x81], self.volume)),
            [0x47, 0x30, 0x80] => Some(self.reply([0x52, 0x30, 0x81], self.input)),
            [0x53, 0x25, 0x81, code] => {
                self.volume = *code;
                None
            }
            [0x53, 0x30, 0x81, code] => {
                self.input = *code;
                None
            }
            _ => None,
        }
    }

    fn reply(&self, prefix: [u8; 3], value: u8) -> [u8; 8] {
        match self.mode {
            ReplyMode::Normal => [prefix[0], prefix[1], prefix[2], value, 0, 0, 0, 0],
            ReplyMode::Garbage => [0xFF; 8],
        }
    }
}

/// A local port nothing listens on.
pub fn closed_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

pub fn port_of(server: &mockito::Server) -> u16 {
    server
        .host_with_port()
        .rsplit(':')
        .next()
        .unwrap()
        .parse()
        .unwrap()
}

pub fn config(tcp_port: u16, http_port: u16) -> KefConfig {
    KefConfig {
        tcp_port,
        http_port,
        linger_ms: 0,
        connect_timeout_ms: 1000,
        read_timeout_ms: 1000,
        http_timeout_ms: 2000,
        ..KefConfig::new("127.0.0.1")
    }
}

/// Clock that never really sleeps: time moves only when the client waits.
#[derive(Debug)]
pub struct SteppingClock {
    base: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl SteppingClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        *self.offset.lock().unwrap() += duration;
    }
}

/// Stream server that records its calls.
#[derive(Debug, Default)]
pub struct RecordingStreamServer {
    calls: Mutex<Vec<(String, Option<Duration>)>>,
}

impl RecordingStreamServer {
    pub fn calls(&self) -> Vec<(String, Option<Duration>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl StreamServer for RecordingStreamServer {
    fn serve(&self, stream: &AudioStream, retention: Option<Duration>) -> Result<ServedStream> {
        self.calls
            .lock()
            .unwrap()
            .push((stream.id.clone(), retention));
        Ok(ServedStream {
            relative_url: format!("/stream/{}", stream.id),
            content_length: None,
        })
    }
}

pub const AVT_SOAPACTION_PREFIX: &str = "urn:schemas-upnp-org:service:AVTransport:1#";

pub fn soapaction(action: &str) -> Matcher {
    Matcher::Exact(format!("\"{}{}\"", AVT_SOAPACTION_PREFIX, action))
}

pub fn soap_response(action: &str, fields: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
<s:Body><u:{action}Response xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">{fields}</u:{action}Response></s:Body>
</s:Envelope>"#
    )
}

pub fn soap_fault(code: u32, description: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
<s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>UPnPError</faultstring><detail><UPnPError xmlns="urn:schemas-upnp-org:control-1-0"><errorCode>{code}</errorCode><errorDescription>{description}</errorDescription></UPnPError></detail></s:Fault></s:Body>
</s:Envelope>"#
    )
}
