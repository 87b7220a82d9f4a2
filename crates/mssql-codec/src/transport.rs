//! The byte transport boundary.
//!
//! The framer consumes exactly four operations: connect, disconnect, a
//! gather send of (header, payload) and an exact-length receive. Anything
//! that can provide those — a TCP socket, a TLS stream, a scripted test
//! double — can carry a TDS session.

use std::io::{self, IoSlice, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Blocking byte transport used by the framer.
pub trait Transport {
    /// Establish the connection.
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;

    /// Tear the connection down. Idempotent.
    fn disconnect(&mut self);

    /// Send one TDS packet as a gather write of header and payload.
    fn send(&mut self, header: &[u8], payload: &[u8]) -> io::Result<()>;

    /// Receive exactly `dst.len()` bytes.
    fn recv_exact(&mut self, dst: &mut [u8]) -> io::Result<()>;
}

/// Inactivity timeout applied to blocking socket reads.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the initial TCP connect.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP transport over `std::net::TcpStream`.
#[derive(Debug, Default)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create an unconnected TCP transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport not connected"))
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        let mut last_err =
            io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses resolved");
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    stream.set_nodelay(true)?;
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }

    fn send(&mut self, header: &[u8], payload: &[u8]) -> io::Result<()> {
        let stream = self.stream()?;

        // One vectored write covers the common case; fall back to plain
        // writes for whatever the kernel did not take.
        let written = stream.write_vectored(&[IoSlice::new(header), IoSlice::new(payload)])?;
        if written < header.len() {
            stream.write_all(&header[written..])?;
            stream.write_all(payload)?;
        } else if written < header.len() + payload.len() {
            stream.write_all(&payload[written - header.len()..])?;
        }
        stream.flush()
    }

    fn recv_exact(&mut self, dst: &mut [u8]) -> io::Result<()> {
        self.stream()?.read_exact(dst)
    }
}
