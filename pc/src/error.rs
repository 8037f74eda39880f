//! Error types for the progress coordinator

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by the coordinator
///
/// Only misconfiguration and lifecycle misuse reach the caller. Reports about
/// unknown stages and empty ledgers are handled locally and never appear here.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error(
        "No process role matches topology (client={is_client}, server={is_server}, rank={local_rank}, processes={num_processes})"
    )]
    UnreachableRole {
        is_client: bool,
        is_server: bool,
        local_rank: usize,
        num_processes: usize,
    },

    #[error("CleanupPendingProgress called without an open update window")]
    WindowNotOpen,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl ProgressError {
    /// Fatal errors mean the topology or the lifecycle is broken
    pub fn is_fatal(&self) -> bool {
        match self {
            ProgressError::UnreachableRole { .. } => true,
            ProgressError::WindowNotOpen => true,
            ProgressError::Transport(_) => false,
        }
    }
}
