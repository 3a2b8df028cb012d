use crate::net::Identity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("backend identity {id} ({username:?}) collides with a placeholder")]
    IdentityCollision { id: Identity, username: String },
    #[error("backend team {0:?} collides with a slot team")]
    TeamCollision(String),
    #[error("no free row for {id} with {size} active rows")]
    SlotExhausted { id: Identity, size: usize },
    #[error("row index {0} out of range")]
    RowOutOfRange(usize),
    #[error("roster size {0} out of range")]
    InvalidSize(usize),
}

impl EngineError {
    /// Fatal errors mean the connection's view can no longer be trusted and
    /// the engine must be torn down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::IdentityCollision { .. } | Self::TeamCollision(_) | Self::SlotExhausted { .. }
        )
    }
}
