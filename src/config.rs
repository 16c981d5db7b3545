//! 会话与统计配置。

use serde::{Deserialize, Serialize};

use crate::game::{history::DEFAULT_HISTORY_WINDOW, Life, SessionError};

pub const DEFAULT_STARTING_LIFE: Life = 8000;
pub const DEFAULT_RECENT_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    pub starting_life: Life,
    pub history_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_life: DEFAULT_STARTING_LIFE,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let config: SessionConfig =
            serde_json::from_str(json).map_err(|error| SessionError::InvalidConfig {
                reason: error.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.starting_life <= 0 {
            return Err(SessionError::InvalidConfig {
                reason: format!("starting_life must be positive, got {}", self.starting_life),
            });
        }
        if self.history_window == 0 {
            return Err(SessionError::InvalidConfig {
                reason: "history_window must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatsOptions {
    pub recent_limit: usize,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}
