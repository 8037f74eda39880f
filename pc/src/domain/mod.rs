//! Domain types shared by every layer of the coordinator

mod id;
mod role;

pub use id::{FilterId, ObjectKey, Rank};
pub use role::{ProcessRole, RoleClassifier, Topology, classify};
