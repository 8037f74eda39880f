//! In-process fabric connecting ranks through tokio channels
//!
//! Every rank gets a `LocalMessenger` with an inbox; rank 0 additionally
//! holds the link to an optional client. Sends are delivered when issued and
//! report completion after a configurable number of polls, so tests can hold
//! a send in flight.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::debug;

use super::{Messenger, Request, Source, Tag, TransportError};
use crate::coordinator::ProgressPacket;
use crate::domain::Rank;

/// A packet travelling between ranks
#[derive(Debug, Clone)]
struct Envelope {
    source: Rank,
    tag: Tag,
    packet: ProgressPacket,
}

/// Bytes forwarded from the root to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEnvelope {
    pub channel: i32,
    pub tag: Tag,
    pub bytes: Vec<u8>,
}

/// Receiving end of one rank; envelopes that did not match a receive wait in
/// the backlog
#[derive(Debug)]
struct Inbox {
    rx: mpsc::UnboundedReceiver<Envelope>,
    backlog: VecDeque<Envelope>,
}

impl Inbox {
    fn take_matching(&mut self, source: Source, tag: Tag) -> Option<ProgressPacket> {
        let matches = |env: &Envelope| env.tag == tag && source.accepts(env.source);

        if let Some(pos) = self.backlog.iter().position(matches) {
            return self.backlog.remove(pos).map(|env| env.packet);
        }

        while let Ok(env) = self.rx.try_recv() {
            if matches(&env) {
                return Some(env.packet);
            }
            self.backlog.push_back(env);
        }
        None
    }
}

fn lock(inbox: &Mutex<Inbox>) -> MutexGuard<'_, Inbox> {
    inbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Send that completes after a fixed number of polls
#[derive(Debug)]
pub struct LocalSendRequest {
    remaining_polls: u32,
    cancelled: bool,
}

impl Request for LocalSendRequest {
    type Output = ();

    fn test(&mut self) -> Option<()> {
        if self.cancelled {
            return None;
        }
        if self.remaining_polls == 0 {
            return Some(());
        }
        self.remaining_polls -= 1;
        None
    }

    /// The packet is already in the peer's inbox; cancelling only stops
    /// completion from being reported
    fn cancel(&mut self) {
        debug!("LocalSendRequest::cancel: called");
        self.cancelled = true;
    }
}

/// Receive that completes once a matching packet is in the inbox
#[derive(Debug)]
pub struct LocalRecvRequest {
    inbox: Arc<Mutex<Inbox>>,
    source: Source,
    tag: Tag,
    cancelled: bool,
}

impl Request for LocalRecvRequest {
    type Output = ProgressPacket;

    fn test(&mut self) -> Option<ProgressPacket> {
        if self.cancelled {
            return None;
        }
        lock(&self.inbox).take_matching(self.source, self.tag)
    }

    fn cancel(&mut self) {
        debug!(tag = self.tag, "LocalRecvRequest::cancel: called");
        self.cancelled = true;
    }
}

/// One rank's endpoint on a `LocalFabric`
#[derive(Debug)]
pub struct LocalMessenger {
    rank: Rank,
    peers: Vec<mpsc::UnboundedSender<Envelope>>,
    inbox: Arc<Mutex<Inbox>>,
    client: Option<mpsc::UnboundedSender<ClientEnvelope>>,
    send_latency: u32,
}

impl Messenger for LocalMessenger {
    type SendRequest = LocalSendRequest;
    type RecvRequest = LocalRecvRequest;

    fn rank(&self) -> Rank {
        self.rank
    }

    fn send_nonblocking(
        &mut self,
        packet: ProgressPacket,
        dest: Rank,
        tag: Tag,
    ) -> Result<LocalSendRequest, TransportError> {
        debug!(from = %self.rank, to = %dest, tag, ?packet, "LocalMessenger::send_nonblocking: called");
        let peer = self.peers.get(dest.index()).ok_or(TransportError::InvalidRank {
            rank: dest.index(),
            size: self.peers.len(),
        })?;

        peer.send(Envelope {
            source: self.rank,
            tag,
            packet,
        })
        .map_err(|_| TransportError::Disconnected { rank: dest.index() })?;

        Ok(LocalSendRequest {
            remaining_polls: self.send_latency,
            cancelled: false,
        })
    }

    fn receive_nonblocking(&mut self, source: Source, tag: Tag) -> Result<LocalRecvRequest, TransportError> {
        debug!(rank = %self.rank, ?source, tag, "LocalMessenger::receive_nonblocking: called");
        if let Source::Rank(rank) = source
            && rank.index() >= self.peers.len()
        {
            return Err(TransportError::InvalidRank {
                rank: rank.index(),
                size: self.peers.len(),
            });
        }

        Ok(LocalRecvRequest {
            inbox: Arc::clone(&self.inbox),
            source,
            tag,
            cancelled: false,
        })
    }

    fn socket_send(&mut self, bytes: &[u8], channel: i32, tag: Tag) -> Result<(), TransportError> {
        debug!(len = bytes.len(), channel, tag, "LocalMessenger::socket_send: called");
        let client = self.client.as_ref().ok_or(TransportError::ClientUnavailable)?;
        client
            .send(ClientEnvelope {
                channel,
                tag,
                bytes: bytes.to_vec(),
            })
            .map_err(|_| TransportError::ClientUnavailable)
    }
}

/// Client side of the socket link
#[derive(Debug)]
pub struct LocalClient {
    rx: mpsc::UnboundedReceiver<ClientEnvelope>,
}

impl LocalClient {
    pub fn try_recv(&mut self) -> Option<ClientEnvelope> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next forwarded frame; `None` once the root is gone
    pub async fn recv(&mut self) -> Option<ClientEnvelope> {
        self.rx.recv().await
    }
}

/// Builder for a set of connected in-process ranks
#[derive(Debug, Clone)]
pub struct LocalFabric {
    ranks: usize,
    client: bool,
    send_latency: u32,
}

impl LocalFabric {
    pub fn new(ranks: usize) -> Self {
        debug!(%ranks, "LocalFabric::new: called");
        Self {
            ranks,
            client: false,
            send_latency: 0,
        }
    }

    /// Attach a client to rank 0
    pub fn with_client(mut self) -> Self {
        self.client = true;
        self
    }

    /// Number of polls a send stays in flight before it reports completion
    pub fn with_send_latency(mut self, polls: u32) -> Self {
        self.send_latency = polls;
        self
    }

    /// Wire up the endpoints, indexed by rank
    pub fn into_parts(self) -> (Vec<LocalMessenger>, Option<LocalClient>) {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..self.ranks).map(|_| mpsc::unbounded_channel()).unzip();

        let (client_tx, client) = if self.client {
            let (tx, rx) = mpsc::unbounded_channel();
            (Some(tx), Some(LocalClient { rx }))
        } else {
            (None, None)
        };

        let messengers = receivers
            .into_iter()
            .enumerate()
            .map(|(index, rx)| LocalMessenger {
                rank: Rank(index),
                peers: senders.clone(),
                inbox: Arc::new(Mutex::new(Inbox {
                    rx,
                    backlog: VecDeque::new(),
                })),
                client: if index == 0 { client_tx.clone() } else { None },
                send_latency: self.send_latency,
            })
            .collect();

        (messengers, client)
    }
}
