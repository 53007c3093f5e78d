//! Message framing.
//!
//! Two framings are supported; both peers must use the same one:
//! - [`WireFormat::Json`]: one JSON document per line (human readable)
//! - [`WireFormat::Bincode`]: big-endian `u32` length prefix, then bincode

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use duel_core::protocol::Message;

use crate::error::{Result, SessionError};

/// Largest accepted bincode frame.
pub const MAX_FRAME_LEN: u32 = 1 << 20;

/// Wire framing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum WireFormat {
    /// Newline-delimited JSON.
    #[default]
    Json,
    /// Length-prefixed bincode.
    Bincode,
}

/// Encode one message into a complete frame.
///
/// # Errors
///
/// Returns [`SessionError::Encode`] if serialization fails.
pub fn encode(format: WireFormat, message: &Message) -> Result<Vec<u8>> {
    match format {
        WireFormat::Json => {
            let mut frame =
                serde_json::to_vec(message).map_err(|e| SessionError::Encode(e.to_string()))?;
            frame.push(b'\n');
            Ok(frame)
        }
        WireFormat::Bincode => {
            let body = bincode::serialize(message).map_err(|e| SessionError::Encode(e.to_string()))?;
            let len = u32::try_from(body.len())
                .ok()
                .filter(|&len| len <= MAX_FRAME_LEN)
                .ok_or_else(|| SessionError::Encode(format!("frame of {} bytes", body.len())))?;
            let mut frame = Vec::with_capacity(body.len() + 4);
            frame.extend_from_slice(&len.to_be_bytes());
            frame.extend_from_slice(&body);
            Ok(frame)
        }
    }
}

/// Reads framed messages from a byte stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: BufReader<R>,
    format: WireFormat,
    line: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a reader.
    pub fn new(reader: R, format: WireFormat) -> Self {
        Self {
            inner: BufReader::new(reader),
            format,
            line: Vec::new(),
        }
    }

    /// Read the next message. `Ok(None)` means the stream ended cleanly.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Connection`] on transport failure
    /// - [`SessionError::Decode`] on a malformed or oversized frame
    pub async fn read_message(&mut self) -> Result<Option<Message>> {
        match self.format {
            WireFormat::Json => self.read_json().await,
            WireFormat::Bincode => self.read_bincode().await,
        }
    }

    async fn read_json(&mut self) -> Result<Option<Message>> {
        let limit = u64::from(MAX_FRAME_LEN) + 1;
        loop {
            self.line.clear();
            let read = (&mut self.inner)
                .take(limit)
                .read_until(b'\n', &mut self.line)
                .await?;
            if read == 0 {
                return Ok(None);
            }
            if self.line.len() > MAX_FRAME_LEN as usize {
                return Err(SessionError::Decode(format!(
                    "line exceeds {MAX_FRAME_LEN} bytes"
                )));
            }
            if self.line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return serde_json::from_slice(&self.line)
                .map(Some)
                .map_err(|e| SessionError::Decode(e.to_string()));
        }
    }

    async fn read_bincode(&mut self) -> Result<Option<Message>> {
        let len = match self.inner.read_u32().await {
            Ok(len) => len,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if len > MAX_FRAME_LEN {
            return Err(SessionError::Decode(format!(
                "frame of {len} bytes exceeds {MAX_FRAME_LEN}"
            )));
        }
        let mut body = vec![0; len as usize];
        self.inner.read_exact(&mut body).await?;
        bincode::deserialize(&body)
            .map(Some)
            .map_err(|e| SessionError::Decode(e.to_string()))
    }
}

/// Writes framed messages to a byte stream.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
    format: WireFormat,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wrap a writer.
    pub fn new(writer: W, format: WireFormat) -> Self {
        Self {
            inner: writer,
            format,
        }
    }

    /// Write and flush one message.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub async fn write_message(&mut self, message: &Message) -> Result<()> {
        let frame = encode(self.format, message)?;
        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shut down the write half.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
