//! Endpoint of the simulated network

use super::SimulatedNetwork;
use async_trait::async_trait;
use std::net::SocketAddr;
use teller_core::protocol::{DatagramTransport, ProtocolError, Result};
use tokio::sync::{Mutex, mpsc};

/// A bound address on a [`SimulatedNetwork`]
pub struct SimulatedSocket {
    network: SimulatedNetwork,
    addr: SocketAddr,
    inbox: Mutex<mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>>,
}

impl SimulatedSocket {
    pub(super) fn new(
        network: SimulatedNetwork,
        addr: SocketAddr,
        inbox: mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>,
    ) -> Self {
        Self {
            network,
            addr,
            inbox: Mutex::new(inbox),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn network(&self) -> &SimulatedNetwork {
        &self.network
    }
}

impl Drop for SimulatedSocket {
    fn drop(&mut self) {
        self.network.unbind(self.addr);
    }
}

#[async_trait]
impl DatagramTransport for SimulatedSocket {
    async fn send_to(&self, data: &[u8], dest: SocketAddr) -> Result<()> {
        self.network.transmit(self.addr, dest, data);
        Ok(())
    }

    /// Datagrams larger than `buffer` are truncated, as with a real socket
    async fn recv_from(&self, buffer: &mut [u8]) -> Result<(usize, SocketAddr)> {
        let received = self.inbox.lock().await.recv().await;
        let (bytes, source) = received.ok_or_else(|| {
            ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "simulated network closed",
            ))
        })?;
        let size = bytes.len().min(buffer.len());
        buffer[..size].copy_from_slice(&bytes[..size]);
        Ok((size, source))
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.addr)
    }
}
