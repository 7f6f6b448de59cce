//! Simulated datagram network
//!
//! Endpoints exchange datagrams through unbounded in-memory queues. Every
//! send passes through a fault model first:
//!
//! | Fault     | Effect                                               |
//! |-----------|------------------------------------------------------|
//! | Drop      | The datagram is never delivered                      |
//! | Duplicate | The datagram is delivered twice                      |
//! | Delay     | Delivery happens later, letting later sends overtake |
//! | Corrupt   | The kind byte is overwritten so decoding fails       |
//!
//! Faults come from two sources. Scripted faults are queued per link and
//! consumed one per datagram, in order; they make scenario tests exact.
//! Random faults are drawn from a seeded `StdRng` so failures reproduce.
//! Scripted faults win when both apply.
//!
//! Delays are implemented with `tokio::time::sleep`, so tests running with
//! paused time see them advance instantly and deterministically.

mod socket;

pub use socket::SimulatedSocket;

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teller_core::Message;
use teller_core::protocol::codec::Codec;
use tokio::sync::mpsc;

/// Byte written over the kind field of corrupted datagrams
pub const CORRUPT_KIND: u8 = 0xFF;

/// What happens to one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Deliver,
    Drop,
    Duplicate,
    Delay(Duration),
    Corrupt,
}

/// Probabilities for random faults, each in `[0.0, 1.0]`
#[derive(Debug, Clone, PartialEq)]
pub struct FaultConfig {
    pub loss_rate: f64,
    pub duplicate_rate: f64,
    pub delay_rate: f64,
    pub max_delay: Duration,
    pub corrupt_rate: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        // Transparent pass-through
        Self {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            delay_rate: 0.0,
            max_delay: Duration::ZERO,
            corrupt_rate: 0.0,
        }
    }
}

impl FaultConfig {
    /// Only drop datagrams, with probability `loss_rate`
    pub fn lossy(loss_rate: f64) -> Self {
        Self {
            loss_rate,
            ..Self::default()
        }
    }
}

/// One datagram as it was handed to the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub from: SocketAddr,
    pub to: SocketAddr,
    pub bytes: Vec<u8>,
}

impl Datagram {
    /// Decode the datagram, if it is well formed
    pub fn decode(&self) -> Option<Message> {
        Codec::new().decode(&self.bytes).ok()
    }
}

/// Counters across the whole network
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NetworkStats {
    pub sent: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub duplicated: u64,
    pub delayed: u64,
    pub corrupted: u64,
}

type Inbox = mpsc::UnboundedSender<(Vec<u8>, SocketAddr)>;

struct NetworkState {
    endpoints: HashMap<SocketAddr, Inbox>,
    scripts: HashMap<(SocketAddr, SocketAddr), VecDeque<Fault>>,
    down: HashSet<SocketAddr>,
    config: FaultConfig,
    rng: StdRng,
    log: Vec<Datagram>,
    stats: NetworkStats,
    next_port: u16,
}

/// Shared handle to an in-memory network
#[derive(Clone)]
pub struct SimulatedNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl Default for SimulatedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedNetwork {
    /// A fault-free network
    pub fn new() -> Self {
        Self::with_faults(FaultConfig::default(), 0)
    }

    /// A network with random faults drawn from `seed`
    pub fn with_faults(config: FaultConfig, seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(NetworkState {
                endpoints: HashMap::new(),
                scripts: HashMap::new(),
                down: HashSet::new(),
                config,
                rng: StdRng::seed_from_u64(seed),
                log: Vec::new(),
                stats: NetworkStats::default(),
                next_port: 40000,
            })),
        }
    }

    /// Attach an endpoint at `addr`
    pub fn bind(&self, addr: SocketAddr) -> SimulatedSocket {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().unwrap();
        let addr = if addr.port() == 0 {
            let port = state.next_port;
            state.next_port += 1;
            SocketAddr::new(addr.ip(), port)
        } else {
            addr
        };
        state.endpoints.insert(addr, tx);
        SimulatedSocket::new(self.clone(), addr, rx)
    }

    /// Attach an endpoint on 127.0.0.1 at `port`
    pub fn bind_local(&self, port: u16) -> SimulatedSocket {
        self.bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port))
    }

    /// Queue faults for the next datagrams sent from `from` to `to`
    pub fn script(&self, from: SocketAddr, to: SocketAddr, faults: impl IntoIterator<Item = Fault>) {
        let mut state = self.state.lock().unwrap();
        state
            .scripts
            .entry((from, to))
            .or_default()
            .extend(faults);
    }

    /// Take `addr` off the network: everything to or from it is lost
    pub fn set_down(&self, addr: SocketAddr, down: bool) {
        let mut state = self.state.lock().unwrap();
        if down {
            state.down.insert(addr);
        } else {
            state.down.remove(&addr);
        }
    }

    /// Replace the random fault model
    pub fn set_faults(&self, config: FaultConfig) {
        self.state.lock().unwrap().config = config;
    }

    /// Every datagram handed to the network, in send order
    pub fn sent(&self) -> Vec<Datagram> {
        self.state.lock().unwrap().log.clone()
    }

    /// Decoded messages sent from `from` to `to`
    pub fn messages_between(&self, from: SocketAddr, to: SocketAddr) -> Vec<Message> {
        self.sent()
            .iter()
            .filter(|d| d.from == from && d.to == to)
            .filter_map(Datagram::decode)
            .collect()
    }

    pub fn stats(&self) -> NetworkStats {
        self.state.lock().unwrap().stats.clone()
    }

    /// Inject raw bytes as if `from` had sent them to `to`, bypassing faults
    pub fn inject(&self, from: SocketAddr, to: SocketAddr, bytes: Vec<u8>) {
        let state = self.state.lock().unwrap();
        if let Some(inbox) = state.endpoints.get(&to) {
            let _ = inbox.send((bytes, from));
        }
    }

    pub(crate) fn unbind(&self, addr: SocketAddr) {
        self.state.lock().unwrap().endpoints.remove(&addr);
    }

    /// Route one datagram through the fault model
    pub(crate) fn transmit(&self, from: SocketAddr, to: SocketAddr, bytes: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.stats.sent += 1;
        state.log.push(Datagram {
            from,
            to,
            bytes: bytes.to_vec(),
        });

        let fault = if state.down.contains(&from) || state.down.contains(&to) {
            Fault::Drop
        } else {
            state.next_fault(from, to)
        };
        trace!("{from} -> {to}: {} bytes, {fault:?}", bytes.len());

        let Some(inbox) = state.endpoints.get(&to).cloned() else {
            state.stats.dropped += 1;
            return;
        };

        match fault {
            Fault::Deliver => {
                state.stats.delivered += 1;
                let _ = inbox.send((bytes.to_vec(), from));
            }
            Fault::Drop => state.stats.dropped += 1,
            Fault::Duplicate => {
                state.stats.duplicated += 1;
                state.stats.delivered += 2;
                let _ = inbox.send((bytes.to_vec(), from));
                let _ = inbox.send((bytes.to_vec(), from));
            }
            Fault::Corrupt => {
                state.stats.corrupted += 1;
                state.stats.delivered += 1;
                let mut garbled = bytes.to_vec();
                if let Some(kind) = garbled.first_mut() {
                    *kind = CORRUPT_KIND;
                }
                let _ = inbox.send((garbled, from));
            }
            Fault::Delay(delay) => {
                state.stats.delayed += 1;
                state.stats.delivered += 1;
                let bytes = bytes.to_vec();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = inbox.send((bytes, from));
                });
            }
        }
    }
}

impl NetworkState {
    fn next_fault(&mut self, from: SocketAddr, to: SocketAddr) -> Fault {
        if let Some(fault) = self.scripts.get_mut(&(from, to)).and_then(VecDeque::pop_front) {
            return fault;
        }

        let config = &self.config;
        if self.rng.random_bool(config.loss_rate) {
            Fault::Drop
        } else if self.rng.random_bool(config.corrupt_rate) {
            Fault::Corrupt
        } else if self.rng.random_bool(config.duplicate_rate) {
            Fault::Duplicate
        } else if !config.max_delay.is_zero() && self.rng.random_bool(config.delay_rate) {
            let millis = self.rng.random_range(1..=config.max_delay.as_millis().max(1) as u64);
            Fault::Delay(Duration::from_millis(millis))
        } else {
            Fault::Deliver
        }
    }
}
