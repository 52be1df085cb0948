//! Telnet channel over any async byte stream.

use std::io;

use bytes::BytesMut;
use futures_util::FutureExt;
use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::config::TelnetConfig;
use super::negotiation::{TelnetEvent, TelnetParser, respond};
use crate::channel::Channel;
use crate::error::{ChannelError, Error, Result, TransportError};

const READ_CHUNK: usize = 4096;

/// Telnet session on top of a byte stream (TCP in production).
///
/// Option negotiation is answered inline while reading, so callers only
/// ever see data.
pub struct TelnetChannel<S = TcpStream> {
    stream: S,
    host: String,
    parser: TelnetParser,

    /// Remote end closed the stream.
    eof: bool,

    /// We closed the stream.
    closed: bool,

    /// Failure hit after data was already read; reported on the next read.
    deferred: Option<Error>,
}

impl TelnetChannel<TcpStream> {
    /// Open a TCP connection to the device.
    pub async fn connect(config: &TelnetConfig) -> Result<Self> {
        let stream = tokio::time::timeout(
            config.timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|source| TransportError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;
        stream.set_nodelay(true).map_err(TransportError::Io)?;

        debug!("telnet connected to {}", config.socket_addr());
        Ok(Self::new(stream, config.host.clone()))
    }
}

impl<S> TelnetChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-connected stream.
    pub fn new(stream: S, host: impl Into<String>) -> Self {
        Self {
            stream,
            host: host.into(),
            parser: TelnetParser::new(),
            eof: false,
            closed: false,
            deferred: None,
        }
    }

    /// Whether either side has closed the stream.
    pub fn is_closed(&self) -> bool {
        self.eof || self.closed
    }

    /// Drain whatever the stream has ready without waiting.
    ///
    /// An error after some bytes arrived is deferred so those bytes still
    /// reach the caller.
    fn drain_ready(&mut self) -> Result<BytesMut> {
        let mut raw = BytesMut::with_capacity(READ_CHUNK);
        while !self.eof {
            match self.stream.read_buf(&mut raw).now_or_never() {
                Some(Ok(0)) => {
                    debug!("{}: telnet stream closed by remote", self.host);
                    self.eof = true;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) if raw.is_empty() => return Err(io_error(e)),
                Some(Err(e)) => {
                    self.defer(io_error(e));
                    break;
                }
                None => break,
            }
        }
        Ok(raw)
    }

    fn defer(&mut self, err: Error) {
        debug!("{}: telnet stream failed after data: {}", self.host, err);
        if err.is_closed() {
            self.eof = true;
        } else {
            self.deferred = Some(err);
        }
    }
}

impl<S> Channel for TelnetChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read(&mut self) -> Result<String> {
        if self.closed {
            return Err(ChannelError::Closed.into());
        }
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }

        let raw = self.drain_ready()?;
        if raw.is_empty() && self.eof {
            return Err(ChannelError::Closed.into());
        }

        let mut data = Vec::with_capacity(raw.len());
        let mut reply_failed = false;
        for event in self.parser.feed(&raw) {
            match event {
                TelnetEvent::Data(bytes) => data.extend_from_slice(&bytes),
                TelnetEvent::Negotiate { command, option } if !reply_failed => {
                    if let Some(reply) = respond(command, option) {
                        trace!(
                            "{}: negotiation {} {} -> {:?}",
                            self.host, command, option, reply
                        );
                        if let Err(e) = self.stream.write_all(&reply).await {
                            reply_failed = true;
                            self.defer(io_error(e));
                        }
                    }
                }
                TelnetEvent::Negotiate { .. } => {}
            }
        }

        if data.is_empty() {
            if let Some(err) = self.deferred.take() {
                return Err(err);
            }
            if reply_failed && self.eof {
                return Err(ChannelError::Closed.into());
            }
        }
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    // UTF-8 text never contains 0xFF, so outgoing data needs no IAC escaping.
    async fn write(&mut self, data: &str) -> Result<()> {
        if self.is_closed() {
            return Err(ChannelError::Closed.into());
        }
        self.stream
            .write_all(data.as_bytes())
            .await
            .map_err(io_error)?;
        self.stream.flush().await.map_err(io_error)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.shutdown().await.map_err(io_error)
    }

    fn host(&self) -> &str {
        &self.host
    }
}

fn io_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::UnexpectedEof => ChannelError::Closed.into(),
        _ => ChannelError::Io(e).into(),
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;

    #[tokio::test]
    async fn test_negotiation_answered_inline() {
        let mock = Builder::new()
            .read(b"\xff\xfb\x01\xff\xfd\x1fLogin Name: ")
            .write(b"\xff\xfd\x01")
            .write(b"\xff\xfc\x1f")
            .build();
        let mut channel = TelnetChannel::new(mock, "ups-1");

        let text = channel.read().await.unwrap();

        assert_eq!(text, "Login Name: ");
        assert_eq!(channel.host(), "ups-1");
    }

    #[tokio::test]
    async fn test_nothing_pending_reads_empty() {
        let mock = Builder::new().write(b"admin\r").build();
        let mut channel = TelnetChannel::new(mock, "ups-2");

        // the pending write keeps the read side quiet
        assert_eq!(channel.read().await.unwrap(), "");
        channel.write("admin\r").await.unwrap();
    }

    #[tokio::test]
    async fn test_remote_close_after_data() {
        let mock = Builder::new().read(b"Login incorrect\r\n").build();
        let mut channel = TelnetChannel::new(mock, "ups-3");

        assert_eq!(channel.read().await.unwrap(), "Login incorrect\r\n");
        assert!(channel.is_closed());

        let err = channel.read().await.unwrap_err();
        assert!(err.is_closed());
        assert!(channel.write("admin\r").await.unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_close_then_read_is_closed() {
        let mock = Builder::new().build();
        let mut channel = TelnetChannel::new(mock, "ups-4");

        channel.close().await.unwrap();
        channel.close().await.unwrap();
        assert!(channel.read().await.unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_reset_after_data_keeps_the_data() {
        let mock = Builder::new()
            .read(b"Login incorrect\r\n")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut channel = TelnetChannel::new(mock, "ups-6");

        assert_eq!(channel.read().await.unwrap(), "Login incorrect\r\n");
        assert!(channel.read().await.unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_other_error_after_data_reported_next_read() {
        let mock = Builder::new()
            .read(b"Login Name: ")
            .read_error(io::Error::other("driver fault"))
            .build();
        let mut channel = TelnetChannel::new(mock, "ups-7");

        assert_eq!(channel.read().await.unwrap(), "Login Name: ");
        let err = channel.read().await.unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::Io(_))));
        assert!(!err.is_closed());
    }

    #[tokio::test]
    async fn test_failed_negotiation_reply_keeps_the_data() {
        let mock = Builder::new()
            .read(b"\xff\xfb\x01Login Name: ")
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let mut channel = TelnetChannel::new(mock, "ups-8");

        assert_eq!(channel.read().await.unwrap(), "Login Name: ");
        assert!(channel.is_closed());
        assert!(channel.read().await.unwrap_err().is_closed());
    }

    #[tokio::test]
    async fn test_reset_is_reported_as_closed() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut channel = TelnetChannel::new(mock, "ups-5");

        assert!(channel.read().await.unwrap_err().is_closed());
    }
}
