//! Listener socket construction.
//!
//! Builds the listening socket with socket2 so the IPv6-only option can be
//! cleared before bind: a V6 target is always opened dual-stack, accepting
//! native IPv6 and IPv4-mapped peers on the same socket. The finished
//! listener is handed back as a blocking `std::net::TcpListener`.

use crate::iface::{AddrFamily, BindTarget};
use socket2::{Domain, Protocol, Socket, Type};
use std::fmt;
use std::io;
use std::net::{AddrParseError, SocketAddr, TcpListener};

/// Fixed number of pending connections queued by the OS.
pub const LISTEN_BACKLOG: i32 = 10;

/// Listener setup errors. All fatal at startup.
#[derive(Debug)]
pub enum ListenerError {
    /// The target's textual address did not parse as a numeric IP.
    Resolve(AddrParseError),
    /// Socket creation failed.
    Socket(io::Error),
    /// Clearing the IPv6-only option failed; without it the dual-stack
    /// guarantee does not hold, so this is not ignorable.
    DualStack(io::Error),
    /// Bind failed (address in use, permission denied, ...).
    Bind(SocketAddr, io::Error),
    /// Listen failed.
    Listen(SocketAddr, io::Error),
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerError::Resolve(e) => {
                write!(f, "invalid bind address: {e}")
            }
            ListenerError::Socket(e) => {
                write!(f, "failed to create listener socket: {e}")
            }
            ListenerError::DualStack(e) => {
                write!(f, "failed to disable IPv6-only on listener socket: {e}")
            }
            ListenerError::Bind(addr, e) => {
                write!(f, "failed to bind listener to {addr}: {e}")
            }
            ListenerError::Listen(addr, e) => {
                write!(f, "failed to listen on {addr}: {e}")
            }
        }
    }
}

impl std::error::Error for ListenerError {}

/// Open, configure, bind and start the listening socket for `target`.
///
/// If any step fails the partially constructed socket is dropped, which
/// closes the descriptor before the error is returned.
pub fn create_listener(target: &BindTarget) -> Result<TcpListener, ListenerError> {
    let addr = target.socket_addr().map_err(ListenerError::Resolve)?;

    let socket = Socket::new(
        match target.family {
            AddrFamily::V4 => Domain::IPV4,
            AddrFamily::V6 => Domain::IPV6,
        },
        Type::STREAM,
        Some(Protocol::TCP),
    )
    .map_err(ListenerError::Socket)?;

    if target.family == AddrFamily::V6 {
        socket.set_only_v6(false).map_err(ListenerError::DualStack)?;
    }

    socket
        .bind(&addr.into())
        .map_err(|e| ListenerError::Bind(addr, e))?;
    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|e| ListenerError::Listen(addr, e))?;

    Ok(socket.into())
}
