//! Writing finalized responses to a transport.
//!
//! The emitter writes the status line, one line per header value (splitting
//! newline-joined values), a blank line and the body. It consumes the
//! [`HttpResponse`], so a response can only be emitted once.

use http::Version;
use rester_core::HttpResponse;
use std::future::Future;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Errors raised while writing a response.
#[derive(Error, Debug)]
pub enum EmitError {
    /// The underlying writer failed.
    #[error("failed to write response: {0}")]
    Io(#[from] std::io::Error),

    /// A header name or value would break the framing.
    #[error("invalid header line `{0}`")]
    InvalidHeader(String),
}

/// Serializes an [`HttpResponse`] onto a byte stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseEmitter;

impl ResponseEmitter {
    /// The status line, without its line terminator.
    pub fn status_line(response: &HttpResponse) -> String {
        let version = match response.version {
            Version::HTTP_09 => "0.9",
            Version::HTTP_10 => "1.0",
            Version::HTTP_2 => "2",
            Version::HTTP_3 => "3",
            _ => "1.1",
        };
        match response.status.canonical_reason() {
            Some(reason) => format!("HTTP/{version} {} {reason}", response.status.as_u16()),
            None => format!("HTTP/{version} {}", response.status.as_u16()),
        }
    }

    /// Status line and header block, terminated by the blank line.
    pub fn encode_head(response: &HttpResponse) -> Result<Vec<u8>, EmitError> {
        let mut head = Self::status_line(response);
        head.push_str("\r\n");
        for (name, value) in response.headers.lines() {
            if name.is_empty() || name.contains([':', '\r', '\n']) || value.contains('\r') {
                return Err(EmitError::InvalidHeader(format!("{name}: {value}")));
            }
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        Ok(head.into_bytes())
    }

    /// Write `response` to `writer`, returning the number of bytes written.
    pub async fn emit<W>(&self, writer: &mut W, response: HttpResponse) -> Result<usize, EmitError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let head = Self::encode_head(&response)?;
        writer.write_all(&head).await?;
        writer.write_all(&response.body).await?;
        writer.flush().await?;
        Ok(head.len() + response.body.len())
    }
}

/// The sink a dispatch sends its single response to.
pub trait Transport: Send {
    /// Send the response.
    fn send(
        &mut self,
        response: HttpResponse,
    ) -> impl Future<Output = Result<(), EmitError>> + Send;
}

/// A [`Transport`] over any async byte stream.
#[derive(Debug)]
pub struct WriterTransport<W> {
    writer: W,
    emitter: ResponseEmitter,
}

impl<W> WriterTransport<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            emitter: ResponseEmitter,
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> Transport for WriterTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, response: HttpResponse) -> Result<(), EmitError> {
        let written = self.emitter.emit(&mut self.writer, response).await?;
        tracing::trace!(bytes = written, "response emitted");
        Ok(())
    }
}
