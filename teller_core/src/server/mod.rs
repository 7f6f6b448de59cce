//! Server side of the at-most-once protocol
//!
//! A single receive loop owns the [`ServerSession`]: it takes one datagram,
//! classifies it, executes at most once, and sends whatever reply results to
//! the peer. There is no client registration; the peer is whichever address
//! sent the most recent datagram.

mod ack;
mod dedup;
pub mod reply_cache;
pub mod session;

pub use reply_cache::ReplyCache;
pub use session::{Dispatch, DropReason, RequestDisposition, ServerSession, ServerStats};

use crate::error::Result;
use crate::protocol::{DatagramTransport, MessageChannel};
use log::{debug, info, warn};
use std::future::Future;
use std::net::SocketAddr;

/// The server loop bound to one transport
pub struct Server<T> {
    channel: MessageChannel<T>,
    session: ServerSession,
    /// Source of the most recent datagram
    peer: Option<SocketAddr>,
}

impl<T: DatagramTransport> Server<T> {
    pub fn new(transport: T) -> Self {
        Self::with_session(transport, ServerSession::new())
    }

    /// Serve with pre-existing session state
    pub fn with_session(transport: T, session: ServerSession) -> Self {
        Self {
            channel: MessageChannel::new(transport),
            session,
            peer: None,
        }
    }

    /// Receive one datagram, handle it, and send any reply.
    ///
    /// Errors are transport failures only; bad datagrams are reported as
    /// [`Dispatch::Dropped`].
    pub async fn serve_one(&mut self) -> Result<Dispatch> {
        let (decoded, source) = self.channel.recv_message().await?;
        self.peer = Some(source);

        let dispatch = match decoded {
            Ok(message) => {
                debug!("Received {message} from {source}");
                self.session.handle(&message)
            }
            Err(e) => {
                warn!("Dropping malformed datagram from {source}: {e}");
                self.session.record_malformed()
            }
        };

        if let (Some(reply), Some(peer)) = (dispatch.reply(), self.peer) {
            self.channel.send_message(reply, peer).await?;
        }
        Ok(dispatch)
    }

    /// Serve until a non-transient transport error
    pub async fn run(&mut self) -> Result<()> {
        info!("Server listening on {}", self.channel.local_addr()?);
        loop {
            self.serve_step().await?;
        }
    }

    /// Serve until `shutdown` completes
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Server listening on {}", self.channel.local_addr()?);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    return Ok(());
                }
                served = self.serve_step() => served?,
            }
        }
    }

    /// One iteration of the loop; transient failures are logged and survived.
    /// A reply that failed to send is still cached and goes out on replay.
    async fn serve_step(&mut self) -> Result<()> {
        match self.serve_one().await {
            Ok(_) => Ok(()),
            Err(crate::Error::Protocol(e)) if e.is_transient() || e.is_malformed() => {
                warn!("Transport error, continuing: {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn session(&self) -> &ServerSession {
        &self.session
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.channel.local_addr()?)
    }

    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    pub fn into_session(self) -> ServerSession {
        self.session
    }
}
