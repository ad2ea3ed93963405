//! LSP Transport Layer
//!
//! Handles message framing with Content-Length headers:
//! ```text
//! Content-Length: 123\r\n
//! \r\n
//! {"jsonrpc":"2.0",...}
//! ```

use super::message::Message;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

/// Largest body accepted from a client
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// Reads framed message bodies from a byte stream
pub struct MessageReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next message body.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between messages. The
    /// body is not validated as JSON; invalid UTF-8 is replaced so the caller
    /// can still answer with a parse error.
    pub async fn read_message(&mut self) -> io::Result<Option<String>> {
        let content_length = match self.read_headers().await? {
            Some(length) => length,
            None => return Ok(None),
        };

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await?;

        let json = String::from_utf8_lossy(&body).into_owned();
        trace!("LSP <- {}", json);
        Ok(Some(json))
    }

    /// Read headers and return Content-Length
    async fn read_headers(&mut self) -> io::Result<Option<usize>> {
        let mut content_length: Option<usize> = None;
        let mut line = String::new();
        let mut first = true;

        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                if first {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream closed inside message headers",
                ));
            }
            first = false;

            let line = line.trim();

            // Empty line marks end of headers
            if line.is_empty() {
                if content_length.is_none() {
                    continue;
                }
                break;
            }

            if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("Content-Length") {
                    let length: usize = value
                        .trim()
                        .parse()
                        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                    if length > MAX_CONTENT_LENGTH {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("message of {} bytes exceeds limit", length),
                        ));
                    }
                    content_length = Some(length);
                }
                // Ignore other headers (Content-Type, etc.)
            }
        }

        Ok(content_length)
    }
}

/// Writes framed messages to a byte stream
pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_message(&mut self, message: &Message) -> io::Result<()> {
        let json = message
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        trace!("LSP -> {}", json);

        let frame = format!("Content-Length: {}\r\n\r\n{}", json.len(), json);
        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.flush().await
    }
}
