use serde::Deserialize;

use crate::error::EngineError;
use crate::placeholder::MAX_ROWS;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether the client protocol carries a team collision rule.
    pub collision_rule_supported: bool,
    pub initial_size: usize,
    /// Start with virtualization disabled.
    pub passthrough: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            collision_rule_supported: true,
            initial_size: 0,
            passthrough: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.initial_size > MAX_ROWS {
            return Err(EngineError::InvalidSize(self.initial_size));
        }
        Ok(())
    }
}
