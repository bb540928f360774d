//! Blocking TCP transport and length-prefixed framing.
//!
//! Architecture:
//! - [`Transport`] is the seam between the session and the network: partial
//!   `read`/`write` plus an idempotent `close`.  [`Socket`] implements it over
//!   a `std::net::TcpStream`; tests substitute a mock.
//! - [`read_fully`]/[`write_fully`] loop over partial transfers.
//! - [`read_frame`]/[`write_frame`] add the 4-byte big-endian length prefix.
//!
//! # Unblocking a reader (for beginners)
//!
//! The session's reader thread spends nearly all its life blocked inside
//! `read`.  To stop it, another thread calls [`Transport::close`], which shuts
//! the socket down in both directions.  The blocked `read` then returns
//! straight away (with end-of-stream or an error) and the reader loop exits.

use std::io::{self, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use msgbridge_core::protocol::framing::{encode_frame, FRAME_HEADER_SIZE, SESSION_ID_SIZE};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur in the transport layer.
#[derive(Debug, Error)]
pub enum SocketError {
    /// The host name could not be resolved to any address.
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// No resolved address accepted the connection.
    #[error("failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// An I/O error occurred on the established connection.
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the connection, or it was closed locally.
    #[error("connection closed")]
    Closed,

    /// A frame header announced more bytes than the configured limit.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: u64, max: u32 },
}

/// A bidirectional byte stream with partial-transfer semantics.
///
/// All methods take `&self` so one thread can block in `read` while others
/// `write` or `close`.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Reads up to `buf.len()` bytes.  `Ok(0)` means end of stream.
    fn read(&self, buf: &mut [u8]) -> Result<usize, SocketError>;

    /// Writes up to `buf.len()` bytes, returning how many were written.
    fn write(&self, buf: &[u8]) -> Result<usize, SocketError>;

    /// Shuts the connection down.  Calling it again does nothing.
    fn close(&self);
}

// ── Socket ────────────────────────────────────────────────────────────────────

/// A connected TCP stream.
#[derive(Debug)]
pub struct Socket {
    stream: TcpStream,
    closed: AtomicBool,
}

impl Socket {
    /// Connects to `host:port`.
    ///
    /// `host` is tried as a literal IP address first and only resolved
    /// through DNS if that fails.  Every resolved address is attempted in
    /// turn, each bounded by `timeout`.  Nagle's algorithm is disabled on
    /// the resulting stream.
    ///
    /// # Errors
    ///
    /// [`SocketError::Resolve`] if no address could be found,
    /// [`SocketError::ConnectFailed`] carrying the last failure otherwise.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, SocketError> {
        let addrs = resolve(host, port)?;

        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no address to connect to");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    info!(%addr, "connected");
                    return Ok(Self::from_stream(stream));
                }
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_error = e;
                }
            }
        }

        Err(SocketError::ConnectFailed {
            host: host.to_string(),
            port,
            source: last_error,
        })
    }

    /// Wraps an already-connected stream (for example one accepted by a
    /// listener).
    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream,
            closed: AtomicBool::new(false),
        }
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.stream.peer_addr()?)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.stream.local_addr()?)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn check_open(&self) -> Result<(), SocketError> {
        if self.is_closed() {
            Err(SocketError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Transport for Socket {
    fn read(&self, buf: &mut [u8]) -> Result<usize, SocketError> {
        self.check_open()?;
        match (&self.stream).read(buf) {
            Ok(n) => Ok(n),
            // A local close surfaces as an arbitrary error on some platforms.
            Err(_) if self.is_closed() => Err(SocketError::Closed),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize, SocketError> {
        self.check_open()?;
        match (&self.stream).write(buf) {
            Ok(n) => Ok(n),
            Err(_) if self.is_closed() => Err(SocketError::Closed),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                warn!(error = %e, "socket shutdown failed");
            }
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close();
    }
}

fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, SocketError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| SocketError::Resolve {
            host: host.to_string(),
            source,
        })?
        .collect();

    if addrs.is_empty() {
        return Err(SocketError::Resolve {
            host: host.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
        });
    }
    Ok(addrs)
}

// ── Transfer helpers ──────────────────────────────────────────────────────────

fn is_interrupted(err: &SocketError) -> bool {
    matches!(err, SocketError::Io(e) if e.kind() == io::ErrorKind::Interrupted)
}

/// Fills `buf` completely.  End of stream before that is [`SocketError::Closed`].
pub fn read_fully<T: Transport + ?Sized>(transport: &T, buf: &mut [u8]) -> Result<(), SocketError> {
    let mut filled = 0;
    while filled < buf.len() {
        match transport.read(&mut buf[filled..]) {
            Ok(0) => return Err(SocketError::Closed),
            Ok(n) => filled += n,
            Err(e) if is_interrupted(&e) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Writes all of `buf`.
pub fn write_fully<T: Transport + ?Sized>(transport: &T, buf: &[u8]) -> Result<(), SocketError> {
    let mut written = 0;
    while written < buf.len() {
        match transport.write(&buf[written..]) {
            Ok(0) => return Err(SocketError::Closed),
            Ok(n) => written += n,
            Err(e) if is_interrupted(&e) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Reads the 4-byte big-endian session id the server sends after accept.
pub fn read_session_id<T: Transport + ?Sized>(transport: &T) -> Result<i32, SocketError> {
    let mut raw = [0u8; SESSION_ID_SIZE];
    read_fully(transport, &mut raw)?;
    Ok(i32::from_be_bytes(raw))
}

/// Reads one `[u32 BE length][payload]` frame and returns the payload.
///
/// # Errors
///
/// [`SocketError::FrameTooLarge`] if the announced length is above
/// `max_frame_size`; the payload is not read in that case.
pub fn read_frame<T: Transport + ?Sized>(
    transport: &T,
    max_frame_size: u32,
) -> Result<Vec<u8>, SocketError> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    read_fully(transport, &mut header)?;
    let len = u32::from_be_bytes(header);
    if len > max_frame_size {
        return Err(SocketError::FrameTooLarge {
            len: u64::from(len),
            max: max_frame_size,
        });
    }

    let mut payload = vec![0u8; len as usize];
    read_fully(transport, &mut payload)?;
    Ok(payload)
}

/// Writes `payload` as one length-prefixed frame.
pub fn write_frame<T: Transport + ?Sized>(transport: &T, payload: &[u8]) -> Result<(), SocketError> {
    let frame = encode_frame(payload).map_err(|_| SocketError::FrameTooLarge {
        len: payload.len() as u64,
        max: u32::MAX,
    })?;
    write_fully(transport, &frame)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
