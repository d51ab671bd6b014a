//! Publish-side transport.
//!
//! The core publishes through the narrow [`Transmitter`] trait; wire details
//! stay behind it. The shipped implementation is a TCP fan-out publisher:
//! subscribers connect to the bind address and receive every frame for every
//! channel, filtering by channel name client-side.
//!
//! Frame layout, length-prefixed:
//!
//! ```text
//! [4-byte big-endian length][channel name][NUL][payload bytes]
//! ```
//!
//! The length covers channel name, NUL and payload. Frames above 1 MiB are
//! rejected. Publishing is synchronous on the loop thread; a slow subscriber
//! blocks the tick for the duration of its write, and a disconnected one is
//! dropped on the first failed write.

use crate::error::{AppResult, RelayError};
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Maximum frame size accepted by the publisher.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Publish contract to the transport collaborator. Failure is non-fatal and
/// logged by the caller.
pub trait Transmitter {
    /// Publish one payload on a named channel.
    fn publish(&mut self, channel: &str, payload: &str) -> AppResult<()>;
}

/// TCP fan-out publisher.
#[derive(Debug)]
pub struct TcpTransmitter {
    listener: TcpListener,
    clients: Vec<TcpStream>,
    frame: Vec<u8>,
}

impl TcpTransmitter {
    /// Bind the publisher. A bind failure is startup-fatal.
    pub fn bind(address: &str) -> AppResult<Self> {
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(true)?;
        info!(%address, "publisher listening");
        Ok(Self {
            listener,
            clients: Vec::new(),
            frame: Vec::with_capacity(4096),
        })
    }

    /// Local address the publisher is bound to.
    pub fn local_addr(&self) -> AppResult<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of currently connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.clients.len()
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        warn!("failed to configure subscriber {}: {}", addr, e);
                        continue;
                    }
                    info!("subscriber connected: {}", addr);
                    self.clients.push(stream);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("error accepting subscriber: {}", e);
                    break;
                }
            }
        }
    }
}

impl Transmitter for TcpTransmitter {
    fn publish(&mut self, channel: &str, payload: &str) -> AppResult<()> {
        self.accept_pending();

        let frame_length = channel.len() + 1 + payload.len();
        if frame_length > MAX_FRAME_BYTES {
            return Err(RelayError::Transport(format!(
                "frame of {} bytes exceeds the {} byte limit on channel '{}'",
                frame_length, MAX_FRAME_BYTES, channel
            )));
        }

        self.frame.clear();
        self.frame
            .extend_from_slice(&(frame_length as u32).to_be_bytes());
        self.frame.extend_from_slice(channel.as_bytes());
        self.frame.push(0);
        self.frame.extend_from_slice(payload.as_bytes());

        let frame = &self.frame;
        self.clients.retain_mut(|client| match client.write_all(frame) {
            Ok(()) => true,
            Err(e) => {
                if let Ok(addr) = client.peer_addr() {
                    debug!("subscriber {} dropped: {}", addr, e);
                }
                false
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_publish_with_no_subscribers_succeeds() {
        let mut tx = TcpTransmitter::bind("127.0.0.1:0").unwrap();
        assert!(tx.publish("events", "[]").is_ok());
        assert_eq!(tx.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_receives_framed_payload() {
        let mut tx = TcpTransmitter::bind("127.0.0.1:0").unwrap();
        let addr = tx.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).unwrap();

        tx.publish("events", r#"["rec"]"#).unwrap();
        assert_eq!(tx.subscriber_count(), 1);

        let mut len_buf = [0u8; 4];
        client.read_exact(&mut len_buf).unwrap();
        let frame_length = u32::from_be_bytes(len_buf) as usize;
        let mut body = vec![0u8; frame_length];
        client.read_exact(&mut body).unwrap();

        let nul = body.iter().position(|b| *b == 0).unwrap();
        assert_eq!(&body[..nul], b"events");
        assert_eq!(&body[nul + 1..], br#"["rec"]"#);
    }

    #[test]
    fn test_disconnected_subscriber_is_dropped() {
        let mut tx = TcpTransmitter::bind("127.0.0.1:0").unwrap();
        let addr = tx.local_addr().unwrap();
        {
            let _client = TcpStream::connect(addr).unwrap();
            tx.publish("events", "first").unwrap();
            assert_eq!(tx.subscriber_count(), 1);
        }
        // The peer is gone; writes eventually fail and the client is pruned.
        for _ in 0..16 {
            tx.publish("events", "after-disconnect").unwrap();
            if tx.subscriber_count() == 0 {
                return;
            }
        }
        panic!("disconnected subscriber never pruned");
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut tx = TcpTransmitter::bind("127.0.0.1:0").unwrap();
        let payload = "x".repeat(MAX_FRAME_BYTES + 1);
        let err = tx.publish("events", &payload).unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
    }
}
