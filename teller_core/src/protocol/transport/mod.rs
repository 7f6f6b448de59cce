//! Transport layer for datagram communication
//!
//! This module defines the contract the protocol needs from the network: send
//! a datagram to an address, receive the next datagram with its source. The
//! channel underneath may drop, duplicate, or reorder datagrams; it never
//! delivers part of one.
//!
//! Receive timeouts are not part of the contract. Callers that need one wrap
//! `recv_from` in `tokio::time::timeout`.

mod socket;

pub use socket::{TransportStats, UdpTransport};

use crate::protocol::codec::Codec;
use crate::protocol::error::Result;
use crate::protocol::messages::Message;
use async_trait::async_trait;
use log::{debug, trace};
use std::net::SocketAddr;
use std::sync::Arc;

/// Unreliable, unordered, message-oriented channel
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Send one datagram to `dest`
    async fn send_to(&self, data: &[u8], dest: SocketAddr) -> Result<()>;

    /// Receive the next datagram into `buffer`, returning its size and source
    async fn recv_from(&self, buffer: &mut [u8]) -> Result<(usize, SocketAddr)>;

    /// Address this endpoint receives on
    fn local_addr(&self) -> Result<SocketAddr>;
}

#[async_trait]
impl<T: DatagramTransport + ?Sized> DatagramTransport for Arc<T> {
    async fn send_to(&self, data: &[u8], dest: SocketAddr) -> Result<()> {
        (**self).send_to(data, dest).await
    }

    async fn recv_from(&self, buffer: &mut [u8]) -> Result<(usize, SocketAddr)> {
        (**self).recv_from(buffer).await
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        (**self).local_addr()
    }
}

/// A transport paired with the message codec
pub struct MessageChannel<T> {
    transport: T,
    codec: Codec,
    buffer: Vec<u8>,
}

impl<T: DatagramTransport> MessageChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            codec: Codec::new(),
            buffer: vec![0u8; crate::protocol::MAX_DATAGRAM_SIZE],
        }
    }

    /// Encode and send `message` to `dest`
    pub async fn send_message(&mut self, message: &Message, dest: SocketAddr) -> Result<()> {
        let bytes = self.codec.encode(message)?;
        debug!("Sending {message} to {dest}");
        self.transport.send_to(&bytes, dest).await
    }

    /// Receive the next datagram and decode it.
    ///
    /// The outer `Result` fails only on transport errors. A datagram that
    /// arrived but did not decode is returned as the inner error together with
    /// its source, so the caller can drop it and keep going.
    pub async fn recv_message(&mut self) -> Result<(Result<Message>, SocketAddr)> {
        let (size, source) = self.transport.recv_from(&mut self.buffer).await?;
        trace!("Received {size} bytes from {source}");
        let decoded = self.codec.decode(&self.buffer[..size]);
        Ok((decoded, source))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
