//! Connection state management.

use std::io::{self, Read, Write};

use bytes::BytesMut;
use mio::net::TcpStream;

use crate::http::{self, MAX_REQUEST_HEAD, METRICS_PATH, Parsed};

/// What the event loop should do with a connection after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ready {
    /// Keep it registered and wait for the next event.
    Open,
    /// A `/metrics` request arrived; its response comes through
    /// [`Connection::respond`].
    Metrics,
    /// Done or broken; deregister and drop it.
    Closed,
}

/// State of a client connection.
pub struct Connection {
    /// TCP stream.
    pub stream: TcpStream,
    /// Read buffer.
    read_buf: BytesMut,
    /// Write buffer.
    write_buf: BytesMut,
    /// Whether a response has been queued.
    responded: bool,
    /// Whether a metrics render is in flight for this connection.
    awaiting_metrics: bool,
}

impl Connection {
    /// Creates a new connection.
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(1024),
            write_buf: BytesMut::new(),
            responded: false,
            awaiting_metrics: false,
        }
    }

    /// Advances the connection after a readiness event.
    pub fn on_ready(&mut self) -> io::Result<Ready> {
        if self.awaiting_metrics {
            return Ok(Ready::Open);
        }

        if !self.responded {
            let open = self.read()?;
            let response = match http::parse_request(&self.read_buf) {
                Parsed::Get(METRICS_PATH) => {
                    self.awaiting_metrics = true;
                    return Ok(Ready::Metrics);
                }
                Parsed::Get(path) => http::dispatch(path),
                Parsed::Invalid => http::bad_request(),
                Parsed::Incomplete if self.read_buf.len() > MAX_REQUEST_HEAD => http::bad_request(),
                Parsed::Incomplete if open => return Ok(Ready::Open),
                Parsed::Incomplete => return Ok(Ready::Closed),
            };
            self.write_buf.extend_from_slice(response.as_bytes());
            self.responded = true;
        }

        self.flush()
    }

    /// Queues the rendered `/metrics` response and starts sending it.
    pub fn respond(&mut self, response: &str) -> io::Result<Ready> {
        self.awaiting_metrics = false;
        self.responded = true;
        self.write_buf.extend_from_slice(response.as_bytes());
        self.flush()
    }

    // Keep the connection only while part of the response is unsent.
    fn flush(&mut self) -> io::Result<Ready> {
        if self.write()? {
            Ok(Ready::Closed)
        } else {
            Ok(Ready::Open)
        }
    }

    /// Reads data from the socket into the read buffer.
    ///
    /// Returns `true` if the connection is still open.
    fn read(&mut self) -> io::Result<bool> {
        let mut temp_buf = [0u8; 1024];

        loop {
            match self.stream.read(&mut temp_buf) {
                Ok(0) => {
                    // Connection closed
                    return Ok(false);
                }
                Ok(n) => {
                    self.read_buf.extend_from_slice(&temp_buf[..n]);
                    if self.read_buf.len() > MAX_REQUEST_HEAD {
                        return Ok(true);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    // No more data available
                    return Ok(true);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Writes data from the write buffer to the socket.
    ///
    /// Returns `true` if all data was written.
    fn write(&mut self) -> io::Result<bool> {
        while !self.write_buf.is_empty() {
            match self.stream.write(&self.write_buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write to socket",
                    ));
                }
                Ok(n) => {
                    let _ = self.write_buf.split_to(n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    // Socket not ready for writing
                    return Ok(false);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }
}
