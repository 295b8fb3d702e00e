//! SMTP response parser.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from response lines (line terminators already removed).
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// # Errors
///
/// Returns an error if the reply is malformed or the lines disagree on the
/// reply code.
pub fn parse_reply(lines: &[Bytes]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::MalformedReply("empty reply".into()));
    };

    let code = parse_code(first)?;

    let mut message = Vec::with_capacity(lines.len());
    for line in lines {
        if parse_code(line)? != code {
            return Err(Error::MalformedReply(format!(
                "reply code changed mid-reply: {}",
                String::from_utf8_lossy(line)
            )));
        }
        match line.len() {
            3 => message.push(Bytes::new()),
            _ if matches!(line[3], b' ' | b'-') => message.push(line.slice(4..)),
            _ => {
                return Err(Error::MalformedReply(format!(
                    "bad separator: {}",
                    String::from_utf8_lossy(line)
                )));
            }
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

fn parse_code(line: &[u8]) -> Result<u16> {
    if line.len() < 3 {
        return Err(Error::MalformedReply(format!(
            "reply too short: {}",
            String::from_utf8_lossy(line)
        )));
    }

    let code = &line[..3];
    if !code.iter().all(u8::is_ascii_digit) {
        return Err(Error::MalformedReply(format!(
            "invalid reply code: {}",
            String::from_utf8_lossy(code)
        )));
    }

    Ok(code
        .iter()
        .fold(0u16, |acc, digit| acc * 10 + u16::from(digit - b'0')))
}

/// Checks if a line is the last line of a multi-line reply.
///
/// Multi-line replies use `-` separator for continuation and ` ` for the last
/// line. A bare code (`250`) also ends the reply.
#[must_use]
pub fn is_last_reply_line(line: &[u8]) -> bool {
    line.len() == 3 || (line.len() >= 4 && line[3] == b' ')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&'static [u8]]) -> Vec<Bytes> {
        raw.iter().map(|l| Bytes::from_static(l)).collect()
    }

    #[test]
    fn test_parse_single_line_reply() {
        let reply = parse_reply(&lines(&[b"235 2.7.0 Authentication successful"])).unwrap();
        assert_eq!(reply.code, ReplyCode::AUTH_SUCCESS);
        assert_eq!(reply.message, lines(&[b"2.7.0 Authentication successful"]));
    }

    #[test]
    fn test_parse_ehlo_reply() {
        let reply = parse_reply(&lines(&[
            b"250-mail.example.com",
            b"250-AUTH PLAIN LOGIN",
            b"250 SIZE 10000000",
        ]))
        .unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(
            reply.message,
            lines(&[b"mail.example.com", b"AUTH PLAIN LOGIN", b"SIZE 10000000"])
        );
    }

    #[test]
    fn test_parse_bare_code() {
        let reply = parse_reply(&lines(&[b"250"])).unwrap();
        assert_eq!(reply.message, vec![Bytes::new()]);
    }

    #[test]
    fn test_parse_keeps_non_utf8() {
        let reply = parse_reply(&lines(&[b"250-h\xe9llo", b"250 X"])).unwrap();
        assert_eq!(&reply.message[0][..], b"h\xe9llo");
    }

    #[test]
    fn test_is_last_reply_line() {
        assert!(is_last_reply_line(b"250 OK"));
        assert!(is_last_reply_line(b"250"));
        assert!(!is_last_reply_line(b"250-Continuing"));
        assert!(!is_last_reply_line(b"25"));
    }

    #[test]
    fn test_parse_error_empty() {
        assert!(matches!(parse_reply(&[]), Err(Error::MalformedReply(_))));
    }

    #[test]
    fn test_parse_error_too_short() {
        assert!(parse_reply(&lines(&[b"25"])).is_err());
    }

    #[test]
    fn test_parse_error_invalid_code() {
        assert!(parse_reply(&lines(&[b"ABC OK"])).is_err());
        assert!(parse_reply(&lines(&[b"+50 OK"])).is_err());
    }

    #[test]
    fn test_parse_error_bad_separator() {
        assert!(parse_reply(&lines(&[b"250_OK"])).is_err());
    }

    #[test]
    fn test_parse_error_code_mismatch() {
        assert!(parse_reply(&lines(&[b"250-first", b"550 second"])).is_err());
    }
}
