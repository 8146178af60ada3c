//! Wire-format constants for the echo-back exchange.
//!
//! The response is deliberately loose HTTP: a fixed status-line/header
//! block with no Content-Length, followed by the echoed request bytes and
//! a ctime-style timestamp as extra body content. Clients depend on these
//! exact bytes, so the framing is not to be "fixed up".

/// Maximum number of request bytes read from a client.
pub const MAX_REQUEST_SIZE: usize = 1024;

/// Fixed response preamble: status line, close + content-type headers,
/// blank line, then the banner introducing the echoed bytes.
pub const RESPONSE_PREAMBLE: &[u8] = b"HTTP/1.1 200 OK\r\n\
Connection: close\r\n\
Content-Type: text/plain\r\n\r\n\
You have sent me this message:\r\n";

/// Current local time in ctime(3) form, e.g. `"Wed Jun 30 21:49:08 1993\n"`.
///
/// `%e` keeps the day-of-month space-padded, matching ctime's fixed
/// 24-character layout; the trailing newline is part of the payload.
pub fn timestamp() -> String {
    chrono::Local::now().format("%a %b %e %H:%M:%S %Y\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_preamble_exact_bytes() {
        assert_eq!(
            RESPONSE_PREAMBLE,
            b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Type: text/plain\r\n\r\nYou have sent me this message:\r\n"
        );
    }

    #[test]
    fn test_timestamp_is_ctime_shaped() {
        let ts = timestamp();
        // ctime output is always 24 characters plus the newline
        assert_eq!(ts.len(), 25);
        assert!(ts.ends_with('\n'));
        assert!(NaiveDateTime::parse_from_str(ts.trim_end(), "%a %b %e %H:%M:%S %Y").is_ok());
    }
}
