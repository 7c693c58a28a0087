mod pacer;

use std::{
    io::{self, Read, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    sync::Arc,
    time::Duration,
};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, warn};

use crate::config::KefConfig;
use crate::errors::{KefError, Result};
use crate::model::AmplitudeCode;

pub use pacer::{Clock, Pacer, SystemClock};

#[cfg(test)]
pub(crate) use pacer::tests::ManualClock;

pub const RESPONSE_SIZE: usize = 8;

pub const GET_VOLUME: [u8; 3] = [0x47, 0x25, 0x80];
pub const VOLUME_REPLY: [u8; 3] = [0x52, 0x25, 0x81];
pub const SET_VOLUME: [u8; 3] = [0x53, 0x25, 0x81];
pub const GET_INPUT: [u8; 3] = [0x47, 0x30, 0x80];
pub const INPUT_REPLY: [u8; 3] = [0x52, 0x30, 0x81];
pub const SET_INPUT: [u8; 3] = [0x53, 0x30, 0x81];

/// Client for the speaker's binary control port.
///
/// Every call opens its own connection and closes it before returning; the
/// only state kept between calls is the [`Pacer`].
#[derive(Debug)]
pub struct KefTcpClient {
    host: String,
    address: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    linger: Duration,
    pacer: Pacer,
}

impl KefTcpClient {
    pub fn new(config: &KefConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            host: config.host.clone(),
            address: config.tcp_address(),
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            linger: config.linger(),
            pacer: Pacer::new(clock, config.min_connect_interval()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// True iff a connection can be opened. Never fails.
    pub fn probe(&mut self) -> bool {
        match self.send_frame(&[]) {
            Ok(()) => true,
            Err(err) => {
                debug!("KEF host {} is not reachable: {}", self.host, err);
                false
            }
        }
    }

    /// Writes `frame` (if any) on a fresh connection.
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        let mut stream = self.connect()?;
        if !frame.is_empty() {
            self.write_frame(&mut stream, frame)?;
        }
        debug!("KEF frame sent to {}: {:02X?}", self.host, frame);
        Ok(())
    }

    /// Writes `frame` and performs a single read into an 8-byte buffer.
    ///
    /// A short read leaves the remaining bytes zeroed; callers check the
    /// reply prefix before using the content.
    pub fn send_frame_expect_response(&mut self, frame: &[u8]) -> Result<[u8; RESPONSE_SIZE]> {
        let mut response = [0u8; RESPONSE_SIZE];
        let mut stream = self.connect()?;
        if frame.is_empty() {
            return Ok(response);
        }

        self.write_frame(&mut stream, frame)?;
        let read = stream.read(&mut response).map_err(|err| {
            warn!(
                "Couldn't read KEF response from {} (command {:02X?}): {}",
                self.address, frame, err
            );
            KefError::Communication(format!(
                "Failed to read response from {} (command {:02X?}): {}",
                self.address, frame, err
            ))
        })?;

        debug!(
            "KEF response from {} ({} bytes): {:02X?}",
            self.host, read, response
        );
        Ok(response)
    }

    /// Current amplitude code, `None` if the reply is not a volume frame.
    pub fn query_volume(&mut self) -> Result<Option<AmplitudeCode>> {
        let response = self.send_frame_expect_response(&GET_VOLUME)?;
        Ok(reply_value(&response, &VOLUME_REPLY).map(AmplitudeCode))
    }

    pub fn write_volume(&mut self, code: AmplitudeCode) -> Result<()> {
        self.send_frame(&command_frame(&SET_VOLUME, code.0))
    }

    /// Raw input code, `None` if the reply is not an input frame.
    pub fn query_input(&mut self) -> Result<Option<u8>> {
        let response = self.send_frame_expect_response(&GET_INPUT)?;
        Ok(reply_value(&response, &INPUT_REPLY))
    }

    pub fn write_input(&mut self, code: u8) -> Result<()> {
        self.send_frame(&command_frame(&SET_INPUT, code))
    }

    fn write_frame(&self, stream: &mut TcpStream, frame: &[u8]) -> Result<()> {
        stream
            .write_all(frame)
            .and_then(|_| stream.flush())
            .map_err(|err| {
                warn!("Couldn't write to KEF host {}: {}", self.address, err);
                KefError::Communication(format!(
                    "Failed to write KEF frame {:02X?} to {}: {}",
                    frame, self.address, err
                ))
            })
    }

    fn connect(&mut self) -> Result<TcpStream> {
        self.pacer.wait_turn();

        let addrs = self.address.to_socket_addrs().map_err(|err| {
            warn!("Failed to resolve KEF host {}: {}", self.address, err);
            KefError::Communication(format!("Failed to resolve {}: {}", self.address, err))
        })?;

        let mut last_err = None;
        for addr in addrs {
            match self.open_socket(&addr) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some((addr, err)),
            }
        }

        match last_err {
            Some((addr, err)) if is_timeout(&err) => {
                warn!("Connection timeout while connecting to KEF host {}", addr);
                Err(KefError::Communication(format!(
                    "Connection timeout while connecting to {} via {}",
                    self.host, addr
                )))
            }
            Some((addr, err)) => {
                warn!("Couldn't connect to KEF host {}: {}", addr, err);
                Err(KefError::Communication(format!(
                    "Failed to connect to {} via {}: {}",
                    self.host, addr, err
                )))
            }
            None => Err(KefError::Communication(format!(
                "No socket addresses resolved for {}",
                self.address
            ))),
        }
    }

    fn open_socket(&self, addr: &SocketAddr) -> io::Result<TcpStream> {
        let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_keepalive(false)?;
        if !self.linger.is_zero() {
            socket.set_linger(Some(self.linger))?;
        }
        socket.connect_timeout(&SockAddr::from(*addr), self.connect_timeout)?;
        socket.set_read_timeout(Some(self.read_timeout))?;
        socket.set_write_timeout(Some(self.read_timeout))?;
        Ok(socket.into())
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

pub fn command_frame(prefix: &[u8; 3], value: u8) -> [u8; 4] {
    [prefix[0], prefix[1], prefix[2], value]
}

/// Byte following `prefix` in `response`, if the response starts with it.
pub fn reply_value(response: &[u8; RESPONSE_SIZE], prefix: &[u8; 3]) -> Option<u8> {
    if response.starts_with(prefix) {
        Some(response[prefix.len()])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn client_for(listener: &TcpListener) -> KefTcpClient {
        let port = listener.local_addr().unwrap().port();
        let config = KefConfig {
            tcp_port: port,
            linger_ms: 0,
            read_timeout_ms: 1000,
            connect_timeout_ms: 1000,
            ..KefConfig::new("127.0.0.1")
        };
        KefTcpClient::new(&config, Arc::new(ManualClock::new()))
    }

    #[test]
    fn reply_value_checks_prefix() {
        let frame = [0x52, 0x25, 0x81, 0x40, 0, 0, 0, 0];
        assert_eq!(reply_value(&frame, &VOLUME_REPLY), Some(0x40));
        assert_eq!(reply_value(&frame, &INPUT_REPLY), None);
        assert_eq!(reply_value(&[0u8; 8], &VOLUME_REPLY), None);
    }

    #[test]
    fn command_frames() {
        assert_eq!(command_frame(&SET_VOLUME, 0x80), [0x53, 0x25, 0x81, 0x80]);
        assert_eq!(command_frame(&SET_INPUT, 0x1B), [0x53, 0x30, 0x81, 0x1B]);
    }

    #[test]
    fn query_reads_a_single_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);

        let device = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut request = [0u8; 3];
            conn.read_exact(&mut request).unwrap();
            conn.write_all(&[0x52, 0x25, 0x81, 0x33, 0, 0, 0, 0]).unwrap();
            request
        });

        let code = client.query_volume().unwrap();
        assert_eq!(code, Some(AmplitudeCode(0x33)));
        assert_eq!(device.join().unwrap(), GET_VOLUME);
    }

    #[test]
    fn short_reply_is_no_data() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);

        let device = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut request = [0u8; 3];
            conn.read_exact(&mut request).unwrap();
            conn.write_all(&[0x52]).unwrap();
        });

        assert_eq!(client.query_input().unwrap(), None);
        device.join().unwrap();
    }

    #[test]
    fn probe_reports_unreachable_host() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);
        drop(listener);
        assert!(!client.probe());
    }

    #[test]
    fn failed_attempts_still_count_for_pacing() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let mut client = client_for(&listener);
        drop(listener);
        assert!(client.send_frame(&GET_VOLUME).is_err());
        assert!(client.pacer.last_connect().is_some());
    }
}
