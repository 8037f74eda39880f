//! Wire shapes exchanged by coordinators, and coordinator metrics

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FilterId, Rank};
use crate::progress::MAX_PERCENT;

/// Satellite-to-root report: three integers `[origin_rank, filter_id, percent]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPacket {
    buffer: [i32; 3],
}

impl ProgressPacket {
    pub fn new(origin: i32, filter: i32, percent: i32) -> Self {
        Self {
            buffer: [origin, filter, percent],
        }
    }

    /// Pack a local report for sending; percent is clamped to 100 the same
    /// way the ledger clamps local values
    pub fn pack(origin: Rank, filter: FilterId, percent: u8) -> Self {
        let origin = i32::try_from(origin.index()).unwrap_or(i32::MAX);
        Self::new(origin, filter.0, i32::from(percent.min(MAX_PERCENT)))
    }

    pub fn from_buffer(buffer: [i32; 3]) -> Self {
        Self { buffer }
    }

    pub fn as_buffer(&self) -> [i32; 3] {
        self.buffer
    }

    pub fn origin(&self) -> i32 {
        self.buffer[0]
    }

    pub fn filter(&self) -> FilterId {
        FilterId(self.buffer[1])
    }

    pub fn percent(&self) -> i32 {
        self.buffer[2]
    }

    /// Decode into typed values if the origin is a rank of a group of
    /// `num_processes` and the percentage is in range
    pub fn validate(&self, num_processes: usize) -> Option<(Rank, FilterId, u8)> {
        let origin = usize::try_from(self.origin()).ok().filter(|&r| r < num_processes)?;
        let percent = u8::try_from(self.percent()).ok().filter(|&p| p <= MAX_PERCENT)?;
        Some((Rank(origin), self.filter(), percent))
    }
}

/// Errors decoding a client frame
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame is empty")]
    Empty,

    #[error("Frame percent {0} is out of range")]
    PercentOutOfRange(u8),

    #[error("Frame name is not NUL-terminated")]
    Unterminated,
}

/// Root-to-client update: one percent byte, then a NUL-terminated name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFrame {
    pub percent: u8,
    pub name: String,
}

impl ClientFrame {
    pub fn new(name: impl Into<String>, percent: u8) -> Self {
        Self {
            percent,
            name: name.into(),
        }
    }

    /// Encode; a NUL inside the name ends it early
    pub fn encode(&self) -> Vec<u8> {
        let name = self.name.split('\0').next().unwrap_or_default();
        let mut bytes = Vec::with_capacity(name.len() + 2);
        bytes.push(self.percent.min(MAX_PERCENT));
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let (&percent, rest) = bytes.split_first().ok_or(FrameError::Empty)?;
        if percent > MAX_PERCENT {
            return Err(FrameError::PercentOutOfRange(percent));
        }
        let end = rest.iter().position(|&b| b == 0).ok_or(FrameError::Unterminated)?;
        Ok(Self {
            percent,
            name: String::from_utf8_lossy(&rest[..end]).into_owned(),
        })
    }
}

/// Counters describing what a coordinator did with the reports it saw
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorMetrics {
    pub windows_opened: u64,
    pub events_seen: u64,
    pub dropped_outside_window: u64,
    pub throttled: u64,
    pub packets_sent: u64,
    pub packets_drained: u64,
    pub unknown_sources: u64,
    pub display_updates: u64,
    pub client_frames_sent: u64,
    pub transport_errors: u64,
    pub requests_cancelled: u64,
}
