use serde::{Deserialize, Serialize};

/// Engine settings fixed when a [crate::Database] is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Resolve WHERE conditions through the column indices. When off, every
    /// condition is answered by scanning the table.
    pub use_indexes: bool,
    /// Reject VARCHAR(n) values longer than `n` characters.
    pub enforce_varchar_length: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_indexes: true,
            enforce_varchar_length: false,
        }
    }
}

impl Config {
    /// The default configuration with indices disabled.
    pub fn scan_only() -> Self {
        Self {
            use_indexes: false,
            ..Self::default()
        }
    }
}
