//! Process roles and their derivation from process topology

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Rank;
use crate::error::ProgressError;

/// Where a process sits in the client / server / worker hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessRole {
    /// Single process, no client, no peers
    Standalone,
    /// Rank 0 of a multi-process run with no client attached
    #[serde(rename = "StandaloneMPIRoot")]
    StandaloneMpiRoot,
    /// Any rank other than 0; reports to the root
    #[serde(rename = "SatelliteMPI")]
    SatelliteMpi,
    /// Interactive controller driving a server
    ClientConnectedToServer,
    /// Server with exactly one process
    ServerRootSingleProcess,
    /// Rank 0 of a multi-process server; forwards to the client
    #[serde(rename = "ServerRootMPI")]
    ServerRootMpi,
}

impl ProcessRole {
    pub const ALL: [ProcessRole; 6] = [
        ProcessRole::Standalone,
        ProcessRole::StandaloneMpiRoot,
        ProcessRole::SatelliteMpi,
        ProcessRole::ClientConnectedToServer,
        ProcessRole::ServerRootSingleProcess,
        ProcessRole::ServerRootMpi,
    ];

    /// Roles that aggregate the ledger and drain satellite reports
    pub fn is_root(self) -> bool {
        matches!(
            self,
            ProcessRole::StandaloneMpiRoot | ProcessRole::ServerRootSingleProcess | ProcessRole::ServerRootMpi
        )
    }

    /// Roles that hand every report straight to the display, window or not
    pub fn forwards_directly(self) -> bool {
        matches!(self, ProcessRole::Standalone | ProcessRole::ClientConnectedToServer)
    }
}

impl std::fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standalone => write!(f, "Standalone"),
            Self::StandaloneMpiRoot => write!(f, "StandaloneMPIRoot"),
            Self::SatelliteMpi => write!(f, "SatelliteMPI"),
            Self::ClientConnectedToServer => write!(f, "ClientConnectedToServer"),
            Self::ServerRootSingleProcess => write!(f, "ServerRootSingleProcess"),
            Self::ServerRootMpi => write!(f, "ServerRootMPI"),
        }
    }
}

/// The four inputs a role is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Topology {
    pub is_client: bool,
    pub is_server: bool,
    pub local_rank: Rank,
    pub num_processes: usize,
}

impl Topology {
    pub fn standalone() -> Self {
        Self {
            is_client: false,
            is_server: false,
            local_rank: Rank::ROOT,
            num_processes: 1,
        }
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::standalone()
    }
}

/// One row of the decision table; `None` matches either value
struct RoleRow {
    is_client: Option<bool>,
    is_server: Option<bool>,
    non_root: Option<bool>,
    multi_process: Option<bool>,
    role: ProcessRole,
}

const fn row(
    is_client: Option<bool>,
    is_server: Option<bool>,
    non_root: Option<bool>,
    multi_process: Option<bool>,
    role: ProcessRole,
) -> RoleRow {
    RoleRow {
        is_client,
        is_server,
        non_root,
        multi_process,
        role,
    }
}

/// Rows are checked in order; the first match wins
const DECISION_TABLE: [RoleRow; 7] = [
    row(Some(true), None, None, None, ProcessRole::ClientConnectedToServer),
    row(Some(false), Some(true), Some(true), None, ProcessRole::SatelliteMpi),
    row(Some(false), Some(true), Some(false), Some(true), ProcessRole::ServerRootMpi),
    row(Some(false), Some(true), Some(false), Some(false), ProcessRole::ServerRootSingleProcess),
    row(Some(false), Some(false), Some(true), None, ProcessRole::SatelliteMpi),
    row(Some(false), Some(false), Some(false), Some(true), ProcessRole::StandaloneMpiRoot),
    row(Some(false), Some(false), Some(false), Some(false), ProcessRole::Standalone),
];

impl RoleRow {
    fn matches(&self, is_client: bool, is_server: bool, non_root: bool, multi_process: bool) -> bool {
        let cell = |want: Option<bool>, have: bool| want.is_none_or(|w| w == have);
        cell(self.is_client, is_client)
            && cell(self.is_server, is_server)
            && cell(self.non_root, non_root)
            && cell(self.multi_process, multi_process)
    }
}

/// Derive the role for a topology
///
/// Only `rank > 0` and `num_processes > 1` are consulted, so a rank outside
/// the group still classifies (any non-root rank is a satellite). The table
/// covers every input; the error is kept for a table that stops doing so.
pub fn classify(topology: &Topology) -> Result<ProcessRole, ProgressError> {
    let Topology {
        is_client,
        is_server,
        local_rank,
        num_processes,
    } = *topology;
    let non_root = !local_rank.is_root();
    let multi_process = num_processes > 1;

    DECISION_TABLE
        .iter()
        .find(|row| row.matches(is_client, is_server, non_root, multi_process))
        .map(|row| row.role)
        .ok_or(ProgressError::UnreachableRole {
            is_client,
            is_server,
            local_rank: local_rank.index(),
            num_processes,
        })
}

/// Classifies once, then answers from the cached role
#[derive(Debug, Clone)]
pub struct RoleClassifier {
    topology: Topology,
    role: Option<ProcessRole>,
}

impl RoleClassifier {
    pub fn new(topology: Topology) -> Self {
        debug!(?topology, "RoleClassifier::new: called");
        Self { topology, role: None }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The cached role, if classification already ran
    pub fn cached(&self) -> Option<ProcessRole> {
        self.role
    }

    /// Classify on first call; every later call returns the same role
    pub fn role(&mut self) -> Result<ProcessRole, ProgressError> {
        if let Some(role) = self.role {
            return Ok(role);
        }
        let role = classify(&self.topology)?;
        info!(%role, rank = %self.topology.local_rank, "Process role classified");
        self.role = Some(role);
        Ok(role)
    }
}
