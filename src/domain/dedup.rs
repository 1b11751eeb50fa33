use std::collections::HashSet;
use std::fmt;

/// Identifies one deliverable event for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryKey {
    Created(String),
    Status(String),
}

impl fmt::Display for DeliveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryKey::Created(id) => write!(f, "created:{id}"),
            DeliveryKey::Status(id) => write!(f, "status:{id}"),
        }
    }
}

/// Remembers which events already reached the caller.
///
/// Scoped to a single session and cleared when the session is replaced or
/// the engine is torn down.
#[derive(Debug, Default, Clone)]
pub struct DedupRegistry {
    delivered: HashSet<DeliveryKey>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a key is claimed, `false` afterwards.
    pub fn claim(&mut self, key: DeliveryKey) -> bool {
        self.delivered.insert(key)
    }

    pub fn clear(&mut self) {
        self.delivered.clear();
    }
}
