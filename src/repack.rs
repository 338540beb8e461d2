//! # Repackager
//!
//! Decodes a Transport Stream packet by packet and re-encodes it to another
//! sink, exercising the full codec round trip.

use crate::error::{Result, TsError};
use crate::ts::{Container, TS_PACKET_SIZE};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Streaming decode/encode pump between two async byte endpoints.
pub struct Repacker<R, W> {
    input: R,
    output: W,
    container: Container,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Repacker<R, W> {
    /// New repackager with a fresh decode context.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            container: Container::new(),
        }
    }

    /// The decode context with the PIDs discovered so far.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Pumps packets until EOF or cancellation.
    ///
    /// A clean end of input and a cancellation both return `Ok(())`; decode
    /// errors and sink failures propagate.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let Self {
            input,
            output,
            container,
        } = self;

        let mut buf = [0u8; TS_PACKET_SIZE];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                read = input.read_exact(&mut buf) => {
                    match read {
                        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                        Err(e) => return Err(e.into()),
                        Ok(_) => {
                            let packet = container.decode_packet(&buf)?;
                            output
                                .write_all(&packet.encode()?)
                                .await
                                .map_err(|e| TsError::Sink(e.to_string()))?;
                        }
                    }
                }
            }
        }
        output
            .flush()
            .await
            .map_err(|e| TsError::Sink(e.to_string()))
    }
}
