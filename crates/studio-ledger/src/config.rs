use serde::{Deserialize, Serialize};

/// Configuration for the ledger engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of lock stripes used to serialize per-owner updates.
    pub lock_stripes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { lock_stripes: 64 }
    }
}

impl EngineConfig {
    /// A single stripe: every mutating operation runs strictly one at a time.
    pub fn serialized() -> Self {
        Self { lock_stripes: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        assert_eq!(EngineConfig::default().lock_stripes, 64);
        assert_eq!(EngineConfig::serialized().lock_stripes, 1);
    }
}
