//! Server and client wiring on a simulated network

use crate::network::{SimulatedNetwork, SimulatedSocket};
use std::net::SocketAddr;
use teller_core::{ClientSession, RetryPolicy, Server, ServerSession};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Port the test server listens on
pub const SERVER_PORT: u16 = 25565;

/// A running server task
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<ServerSession>,
}

impl ServerHandle {
    /// Stop the loop and hand back the final session state
    pub async fn shutdown(self) -> ServerSession {
        let _ = self.shutdown.send(());
        self.task.await.expect("server task panicked")
    }
}

/// A simulated network with a server address reserved on it
pub struct TestBed {
    pub network: SimulatedNetwork,
    pub server_addr: SocketAddr,
}

impl Default for TestBed {
    fn default() -> Self {
        Self::new(SimulatedNetwork::new())
    }
}

impl TestBed {
    pub fn new(network: SimulatedNetwork) -> Self {
        let server_addr = SocketAddr::from(([127, 0, 0, 1], SERVER_PORT));
        Self {
            network,
            server_addr,
        }
    }

    /// Spawn a server with a fresh session
    pub fn spawn_server(&self) -> ServerHandle {
        self.spawn_server_with(ServerSession::new())
    }

    /// Spawn a server starting from `session`
    pub fn spawn_server_with(&self, session: ServerSession) -> ServerHandle {
        let socket = self.network.bind(self.server_addr);
        let (shutdown, stop) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut server = Server::with_session(socket, session);
            server
                .run_until(async {
                    let _ = stop.await;
                })
                .await
                .expect("server loop failed");
            server.into_session()
        });

        ServerHandle {
            addr: self.server_addr,
            shutdown,
            task,
        }
    }

    /// A client on its own ephemeral address
    pub fn client(&self, policy: RetryPolicy) -> ClientSession<SimulatedSocket> {
        let socket = self.network.bind_local(0);
        ClientSession::new(socket, self.server_addr, policy)
    }
}
