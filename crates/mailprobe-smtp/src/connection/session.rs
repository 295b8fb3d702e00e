//! One SMTP command/reply dialog over an owned stream.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Reply, ReplyCode};

/// Longest reply line accepted, terminator included.
const MAX_LINE_LEN: usize = 4096;

/// Most lines accepted in one multi-line reply.
const MAX_REPLY_LINES: usize = 256;

/// An open SMTP session.
///
/// The session exclusively owns its stream from open to close. Every read of
/// a reply is bounded by the session timeout.
#[derive(Debug)]
pub struct Session<S> {
    stream: BufReader<S>,
    host: String,
    port: u16,
    timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    /// Wraps an established stream.
    pub fn new(stream: S, host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Returns the host this session is connected to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port this session is connected to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the underlying stream.
    #[must_use]
    pub fn stream(&self) -> &S {
        self.stream.get_ref()
    }

    /// Reads the server greeting and requires `220`.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the server is not ready, or a timeout or
    /// I/O error if the greeting does not arrive.
    pub async fn read_greeting(&mut self) -> Result<Reply> {
        let greeting = self.read_reply().await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(self.unexpected("greeting", &greeting));
        }
        Ok(greeting)
    }

    /// Sends a command and reads the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or the reply read fails.
    pub async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        debug!(host = %self.host, port = self.port, "C: {cmd:?}");
        let data = cmd.serialize();
        let stream = self.stream.get_mut();
        stream.write_all(&data).await?;
        stream.flush().await?;
        self.read_reply().await
    }

    /// Reads one complete (possibly multi-line) reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectTimeout`] if the reply does not complete within
    /// the session timeout, or a protocol error if it is malformed.
    pub async fn read_reply(&mut self) -> Result<Reply> {
        let lines = tokio::time::timeout(self.timeout, self.read_reply_lines())
            .await
            .map_err(|_| self.timed_out())??;

        let reply = parse_reply(&lines)
            .map_err(|e| Error::protocol(&self.host, self.port, e.to_string()))?;
        debug!(
            host = %self.host,
            port = self.port,
            code = reply.code.as_u16(),
            "S: {}",
            reply.message_text()
        );
        Ok(reply)
    }

    async fn read_reply_lines(&mut self) -> Result<Vec<Bytes>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                return Ok(lines);
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(Error::protocol(
                    &self.host,
                    self.port,
                    format!("reply longer than {MAX_REPLY_LINES} lines"),
                ));
            }
        }
    }

    async fn read_line(&mut self) -> Result<Bytes> {
        let mut buf = Vec::new();
        let read = (&mut self.stream)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut buf)
            .await?;

        if read == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }
        if !buf.ends_with(b"\n") && buf.len() >= MAX_LINE_LEN {
            return Err(Error::protocol(
                &self.host,
                self.port,
                format!("reply line longer than {MAX_LINE_LEN} bytes"),
            ));
        }

        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(Bytes::from(buf))
    }

    /// Gives up the stream, e.g. to upgrade it to TLS.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the server already sent bytes that were
    /// not consumed; after STARTTLS such bytes would have been injected into
    /// the plaintext channel.
    pub fn into_stream(self) -> Result<S> {
        if !self.stream.buffer().is_empty() {
            return Err(Error::protocol(
                &self.host,
                self.port,
                "unexpected data after STARTTLS reply",
            ));
        }
        Ok(self.stream.into_inner())
    }

    /// Sends QUIT and closes the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;
        if reply.code != ReplyCode::CLOSING && !reply.is_success() {
            return Err(self.unexpected("QUIT", &reply));
        }
        let _ = self.stream.get_mut().shutdown().await;
        Ok(())
    }

    /// Protocol error for a reply that does not match what `step` expects.
    pub(crate) fn unexpected(&self, step: &str, reply: &Reply) -> Error {
        Error::protocol(
            &self.host,
            self.port,
            format!(
                "{step} rejected with {}: {}",
                reply.code,
                reply.message_text()
            ),
        )
    }

    fn timed_out(&self) -> Error {
        Error::ConnectTimeout {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::{Builder, Mock};

    fn session(mock: Mock) -> Session<Mock> {
        Session::new(mock, "mail.example.com", 587, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn reply_split_across_reads() {
        let mock = Builder::new()
            .write(b"EHLO localhost\r\n")
            .read(b"250-mail.example.com\r\n250-AUTH PL")
            .read(b"AIN\r\n250 SIZE 100\r\n")
            .build();
        let mut session = session(mock);

        let reply = session
            .send_command(&Command::Ehlo {
                hostname: "localhost".into(),
            })
            .await
            .unwrap();

        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.message.len(), 3);
        assert_eq!(&reply.message[1][..], b"AUTH PLAIN");
    }

    #[tokio::test]
    async fn bare_lf_terminators() {
        let mock = Builder::new().read(b"220 ready\n").build();
        let greeting = session(mock).read_greeting().await.unwrap();
        assert_eq!(&greeting.message[0][..], b"ready");
    }

    #[tokio::test]
    async fn greeting_must_be_220() {
        let mock = Builder::new().read(b"554 5.3.2 No service\r\n").build();
        let err = session(mock).read_greeting().await.unwrap_err();
        assert!(matches!(err, Error::Protocol { port: 587, .. }));
        assert!(err.to_string().contains("554"));
    }

    #[tokio::test]
    async fn malformed_reply_names_target() {
        let mock = Builder::new().read(b"ABC hello\r\n").build();
        let err = session(mock).read_reply().await.unwrap_err();
        assert!(err.to_string().starts_with("mail.example.com:587:"));
    }

    #[tokio::test]
    async fn eof_is_an_io_error() {
        let mock = Builder::new().build();
        let err = session(mock).read_reply().await.unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn into_stream_rejects_buffered_bytes() {
        let mock = Builder::new()
            .write(b"STARTTLS\r\n")
            .read(b"220 go ahead\r\n250 injected\r\n")
            .build();
        let mut session = session(mock);

        session.send_command(&Command::StartTls).await.unwrap();

        assert!(matches!(
            session.into_stream(),
            Err(Error::Protocol { .. })
        ));
    }

    #[tokio::test]
    async fn endless_reply_is_cut_off() {
        let flood = b"250-x\r\n".repeat(MAX_REPLY_LINES);
        let mock = Builder::new().read(&flood).build();
        let err = session(mock).read_reply().await.unwrap_err();
        assert!(matches!(err, Error::Protocol { ref reason, .. } if reason.contains("lines")));
    }

    #[tokio::test]
    async fn reply_at_line_limit_is_accepted() {
        let mut full = b"250-x\r\n".repeat(MAX_REPLY_LINES - 1);
        full.extend_from_slice(b"250 done\r\n");
        let mock = Builder::new().read(&full).build();
        let reply = session(mock).read_reply().await.unwrap();
        assert_eq!(reply.message.len(), MAX_REPLY_LINES);
    }

    #[tokio::test]
    async fn quit_accepts_221() {
        let mock = Builder::new()
            .write(b"QUIT\r\n")
            .read(b"221 2.0.0 Bye\r\n")
            .build();
        session(mock).quit().await.unwrap();
    }
}
