//! Identifier newtypes

use serde::{Deserialize, Serialize};

/// Small integer handle naming one pipeline stage for one update cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(pub i32);

impl std::fmt::Display for FilterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for FilterId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// Position of a process within a distributed run (0 is the root)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(pub usize);

impl Rank {
    pub const ROOT: Rank = Rank(0);

    pub fn is_root(self) -> bool {
        self.0 == 0
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-owning identity of an in-process pipeline stage
///
/// Built from the address of the stage object. It never dereferences the
/// address, so a key can outlive its object; a stale key simply stops being
/// looked up once the next registration pass overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

impl ObjectKey {
    /// Identity of the object behind `obj`
    pub fn of<T: ?Sized>(obj: &T) -> Self {
        Self(obj as *const T as *const () as usize)
    }

    /// Key from a raw identity, for stages tracked by handle rather than address
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> usize {
        self.0
    }
}
