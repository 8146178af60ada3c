//! Sequential accept/serve loop.
//!
//! One client is served end to end (accept, read, respond, close) before
//! the next accept; the OS listen backlog is the only queue. Accept
//! failures are logged and the loop keeps waiting. Read failures abandon
//! that session without a response. Sends are best-effort single writes.

use crate::protocol::{self, MAX_REQUEST_SIZE};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Server instance, owning the listening socket for the process lifetime.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Create a server around an already-listening socket.
    pub fn new(listener: TcpListener) -> Self {
        Server { listener }
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve clients forever, one at a time.
    ///
    /// Never returns; the process is stopped externally.
    pub fn run(&self) {
        loop {
            let (mut stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Transient accept failures must not stop the service.
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };
            info!(peer = %peer, "client connected");

            match handle_client(&mut stream) {
                Ok(()) => debug!(peer = %peer, "connection served"),
                Err(e) => warn!(peer = %peer, error = %e, "session abandoned"),
            }
            // stream drops here, closing the connection on success and
            // failure alike
        }
    }
}

/// Serve one session: a single bounded read, then the three response
/// payloads. A read error, or EOF before any request bytes, abandons the
/// session without sending anything.
fn handle_client(stream: &mut TcpStream) -> io::Result<()> {
    let mut request = [0u8; MAX_REQUEST_SIZE];
    let received = stream.read(&mut request)?;
    if received == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before any request bytes",
        ));
    }
    // The buffer is only valid up to `received`; there is no terminator.
    debug!(bytes = received, "request read");

    send_payload(stream, protocol::RESPONSE_PREAMBLE);
    send_payload(stream, &request[..received]);
    send_payload(stream, protocol::timestamp().as_bytes());
    Ok(())
}

/// Best-effort single write of one payload. Short writes and send errors
/// are logged and the exchange moves on; nothing is retried.
fn send_payload(stream: &mut TcpStream, payload: &[u8]) {
    match stream.write(payload) {
        Ok(sent) if sent < payload.len() => {
            warn!(sent, expected = payload.len(), "short write, payload truncated");
        }
        Ok(sent) => debug!(sent, "payload sent"),
        Err(e) => warn!(error = %e, "send failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iface::BindTarget;
    use crate::listener::create_listener;
    use crate::protocol::RESPONSE_PREAMBLE;
    use chrono::NaiveDateTime;
    use std::net::Shutdown;
    use std::thread;

    /// ctime-style timestamps are always 24 characters plus a newline.
    const TIMESTAMP_LEN: usize = 25;

    fn spawn_server() -> SocketAddr {
        let target = BindTarget::explicit("127.0.0.1".parse().unwrap(), 0);
        let listener = create_listener(&target).unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || Server::new(listener).run());
        addr
    }

    fn exchange(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(request).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).unwrap();
        response
    }

    fn assert_echo_response(response: &[u8], expected_body: &[u8]) {
        assert!(
            response.starts_with(RESPONSE_PREAMBLE),
            "response does not start with the fixed preamble"
        );
        let body = &response[RESPONSE_PREAMBLE.len()..];
        assert_eq!(body.len(), expected_body.len() + TIMESTAMP_LEN);
        assert_eq!(&body[..expected_body.len()], expected_body);

        let stamp = std::str::from_utf8(&body[expected_body.len()..]).unwrap();
        assert!(stamp.ends_with('\n'));
        assert!(NaiveDateTime::parse_from_str(stamp.trim_end(), "%a %b %e %H:%M:%S %Y").is_ok());
    }

    #[test]
    fn test_hello_round_trip() {
        let addr = spawn_server();
        let response = exchange(addr, b"hello");
        assert_echo_response(&response, b"hello");
    }

    #[test]
    fn test_empty_request_gets_no_response() {
        let addr = spawn_server();

        let mut client = TcpStream::connect(addr).unwrap();
        client.shutdown(Shutdown::Write).unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).unwrap();
        assert!(response.is_empty());

        // The abandoned session must not affect the next connection.
        let response = exchange(addr, b"still alive");
        assert_echo_response(&response, b"still alive");
    }

    #[test]
    fn test_sequential_sessions_are_structurally_identical() {
        let addr = spawn_server();
        for _ in 0..5 {
            let response = exchange(addr, b"hello");
            assert_echo_response(&response, b"hello");
        }
    }

    #[test]
    fn test_max_size_request_is_echoed_in_full() {
        let addr = spawn_server();
        let request = [b'a'; MAX_REQUEST_SIZE];
        let response = exchange(addr, &request);
        assert_echo_response(&response, &request);
    }

    #[test]
    fn test_stalled_client_does_not_break_the_next_session() {
        let addr = spawn_server();

        // Occupies the server without sending anything; processing is
        // strictly sequential, so the second session waits behind it.
        let stalled = TcpStream::connect(addr).unwrap();

        let mut second = TcpStream::connect(addr).unwrap();
        second.write_all(b"after you").unwrap();
        second.shutdown(Shutdown::Write).unwrap();

        // Closing the stalled client surfaces EOF on the server's read,
        // which abandons that session and frees the loop.
        drop(stalled);

        let mut response = Vec::new();
        second.read_to_end(&mut response).unwrap();
        assert_echo_response(&response, b"after you");
    }
}
