//! progresscoord - distributed progress-reporting coordinator
//!
//! Pipeline stages running across a client, a root compute process and any
//! number of satellite workers all report progress. The coordinator on each
//! process decides, from the process topology, whether to show a report
//! directly, to throttle it and send it to rank 0, or to merge it with what
//! the satellites sent and forward the least-advanced value.
//!
//! # Core Concepts
//!
//! - **Role from topology**: computed once per process, never re-derived
//! - **Minimum wins**: the pipeline is only as far along as its slowest stage on its slowest rank
//! - **One request per direction**: a single outstanding send and receive, polled inline
//! - **Update windows**: `prepare_progress` / `cleanup_pending_progress` bracket each update
//!
//! # Modules
//!
//! - [`domain`] - Roles, topology and identifiers
//! - [`progress`] - Object registry and progress ledger
//! - [`coordinator`] - The dispatcher, throttle and wire shapes
//! - [`transport`] - Messenger seam and the in-process fabric
//! - [`display`] - Display and name-resolution seams
//! - [`simulation`] - Multi-rank simulated update
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod domain;
pub mod error;
pub mod progress;
pub mod simulation;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, SimulationConfig};
pub use coordinator::{
    ClientFrame, CoordinatorConfig, CoordinatorMetrics, FrameError, ProgressCoordinator, ProgressPacket, Throttle,
};
pub use display::{ConsoleDisplay, DisplayUpdate, NameResolver, NoNames, ProgressDisplay, RecordingDisplay};
pub use domain::{FilterId, ObjectKey, ProcessRole, Rank, RoleClassifier, Topology, classify};
pub use error::ProgressError;
pub use progress::{ObjectRegistry, ProgressLedger, STALE_PERCENT};
pub use simulation::SimulationReport;
pub use transport::{LocalClient, LocalFabric, LocalMessenger, Messenger, PendingRequest, Request, Source, TransportError};
