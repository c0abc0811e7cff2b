use std::future::Future;
use std::io;

use afpacket::tokio::RawPacketStream;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};

/// Write side of a capture handle: pushes one link-layer frame per call.
pub(crate) trait FrameSink {
    fn send_frame(&mut self, frame: &[u8]) -> impl Future<Output = io::Result<()>> + Send;
}

/// Read side of a capture handle: fills `buf` with the next inbound frame.
pub(crate) trait FrameSource {
    fn recv_frame(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;
}

impl FrameSink for RawPacketStream {
    async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.write_all(frame).await
    }
}

impl FrameSource for RawPacketStream {
    async fn recv_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf).await
    }
}

pub(crate) fn open_stream(interface_name: &str) -> Result<RawPacketStream> {
    let mut stream = RawPacketStream::new().map_err(|err| {
        Error::CapabilityOpen(format!("failed to create packet stream, reason: {}", err))
    })?;
    stream.bind(interface_name).map_err(|err| {
        Error::CapabilityOpen(format!(
            "failed to bind interface {} to stream, reason: {}",
            interface_name, err
        ))
    })?;
    Ok(stream)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::mpsc;

    /// In-memory sink delivering each frame as one message, boundaries kept.
    pub(crate) struct ChannelSink(pub(crate) mpsc::UnboundedSender<Vec<u8>>);

    impl FrameSink for ChannelSink {
        async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> {
            self.0
                .send(frame.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "capture closed"))
        }
    }

    /// In-memory source; a drained channel behaves like a quiet interface.
    pub(crate) struct ChannelSource(pub(crate) mpsc::UnboundedReceiver<Vec<u8>>);

    impl FrameSource for ChannelSource {
        async fn recv_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.recv().await {
                Some(frame) => {
                    let len = frame.len().min(buf.len());
                    buf[..len].copy_from_slice(&frame[..len]);
                    Ok(len)
                }
                None => std::future::pending().await,
            }
        }
    }

    /// Yields its frames, then fails every read, like an interface that went
    /// away mid-session.
    pub(crate) struct FailingSource(pub(crate) std::collections::VecDeque<Vec<u8>>);

    impl FailingSource {
        pub(crate) fn new(frames: Vec<Vec<u8>>) -> Self {
            Self(frames.into())
        }
    }

    impl FrameSource for FailingSource {
        async fn recv_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(frame) => {
                    let len = frame.len().min(buf.len());
                    buf[..len].copy_from_slice(&frame[..len]);
                    Ok(len)
                }
                None => Err(io::Error::new(
                    io::ErrorKind::Other,
                    "no buffer space available",
                )),
            }
        }
    }
}
