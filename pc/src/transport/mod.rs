//! Transport seam between the coordinator and the process fabric
//!
//! The coordinator only ever issues non-blocking requests and tests them for
//! completion inline; nothing here blocks the calling thread. `PendingRequest`
//! holds at most one outstanding request per direction.

pub mod local;

use thiserror::Error;
use tracing::debug;

use crate::coordinator::ProgressPacket;
use crate::domain::Rank;

pub use local::{ClientEnvelope, LocalClient, LocalFabric, LocalMessenger};

/// Message tag distinguishing progress traffic from other traffic
pub type Tag = i32;

/// Errors reported by a transport
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Rank {rank} is disconnected")]
    Disconnected { rank: usize },

    #[error("Rank {rank} is outside the process group of {size}")]
    InvalidRank { rank: usize, size: usize },

    #[error("No client connection available")]
    ClientUnavailable,
}

/// Where a receive may accept a message from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Any,
    Rank(Rank),
}

impl Source {
    pub fn accepts(self, rank: Rank) -> bool {
        match self {
            Source::Any => true,
            Source::Rank(expected) => expected == rank,
        }
    }
}

/// A non-blocking operation in flight
pub trait Request {
    type Output;

    /// Test for completion without blocking; yields the result once
    fn test(&mut self) -> Option<Self::Output>;

    /// Abandon the operation
    fn cancel(&mut self);
}

/// Non-blocking point-to-point messaging plus the socket link to a client
pub trait Messenger {
    type SendRequest: Request<Output = ()>;
    type RecvRequest: Request<Output = ProgressPacket>;

    /// Rank of this process
    fn rank(&self) -> Rank;

    /// Start sending `packet` to `dest`
    fn send_nonblocking(&mut self, packet: ProgressPacket, dest: Rank, tag: Tag)
    -> Result<Self::SendRequest, TransportError>;

    /// Start receiving one packet from `source`
    fn receive_nonblocking(&mut self, source: Source, tag: Tag) -> Result<Self::RecvRequest, TransportError>;

    /// Forward raw bytes to the connected client
    fn socket_send(&mut self, bytes: &[u8], channel: i32, tag: Tag) -> Result<(), TransportError>;
}

/// Single-slot holder for one outstanding request
#[derive(Debug)]
pub struct PendingRequest<R: Request> {
    slot: Option<R>,
}

impl<R: Request> Default for PendingRequest<R> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<R: Request> PendingRequest<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Start a request only if none is outstanding
    ///
    /// Returns `Ok(false)` without calling `start` when the slot is occupied.
    pub fn try_issue<E>(&mut self, start: impl FnOnce() -> Result<R, E>) -> Result<bool, E> {
        if self.slot.is_some() {
            debug!("PendingRequest::try_issue: slot occupied, not issuing");
            return Ok(false);
        }
        self.slot = Some(start()?);
        Ok(true)
    }

    /// Test the outstanding request; frees the slot when it completes
    pub fn poll(&mut self) -> Option<R::Output> {
        let output = self.slot.as_mut()?.test()?;
        self.slot = None;
        Some(output)
    }

    /// Cancel the outstanding request, if any. Returns whether one was cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.slot.take() {
            Some(mut request) => {
                request.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Countdown {
        remaining: u32,
        cancelled: bool,
    }

    impl Request for Countdown {
        type Output = u32;

        fn test(&mut self) -> Option<u32> {
            if self.remaining == 0 {
                Some(42)
            } else {
                self.remaining -= 1;
                None
            }
        }

        fn cancel(&mut self) {
            self.cancelled = true;
        }
    }

    fn countdown(remaining: u32) -> Result<Countdown, TransportError> {
        Ok(Countdown {
            remaining,
            cancelled: false,
        })
    }

    #[test]
    fn test_slot_refuses_double_issue() {
        let mut pending = PendingRequest::new();
        assert!(pending.try_issue(|| countdown(3)).unwrap());
        assert!(pending.is_pending());

        let mut called = false;
        let issued = pending
            .try_issue(|| {
                called = true;
                countdown(0)
            })
            .unwrap();
        assert!(!issued);
        assert!(!called);
    }

    #[test]
    fn test_poll_frees_slot_on_completion() {
        let mut pending = PendingRequest::new();
        pending.try_issue(|| countdown(1)).unwrap();

        assert_eq!(pending.poll(), None);
        assert!(pending.is_pending());
        assert_eq!(pending.poll(), Some(42));
        assert!(!pending.is_pending());
        assert_eq!(pending.poll(), None);
    }

    #[test]
    fn test_cancel_empties_slot() {
        let mut pending = PendingRequest::new();
        assert!(!pending.cancel());

        pending.try_issue(|| countdown(10)).unwrap();
        assert!(pending.cancel());
        assert!(!pending.is_pending());
    }

    #[test]
    fn test_issue_error_leaves_slot_empty() {
        let mut pending: PendingRequest<Countdown> = PendingRequest::new();
        let result = pending.try_issue(|| Err(TransportError::ClientUnavailable));

        assert_eq!(result, Err(TransportError::ClientUnavailable));
        assert!(!pending.is_pending());
    }

    #[test]
    fn test_source_accepts() {
        assert!(Source::Any.accepts(Rank(4)));
        assert!(Source::Rank(Rank(2)).accepts(Rank(2)));
        assert!(!Source::Rank(Rank(2)).accepts(Rank(3)));
    }
}
