// Engine tuning, optionally read from <project>/.loopbox/config.json

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::pipeline::persistence::loopbox_dir;

const CONFIG_FILE: &str = "config.json";

// 25 ms ticks give 2 ticks per sixteenth even at 300 BPM; a 100 ms window
// survives three consecutive late or lost ticks.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 25;
pub const DEFAULT_LOOKAHEAD_MS: u64 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tick_interval_ms: u64,
    pub lookahead_ms: u64,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            lookahead_ms: DEFAULT_LOOKAHEAD_MS,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Missing file means defaults; a file that exists must parse and validate.
    pub fn load(project_dir: &Path) -> anyhow::Result<Self> {
        let path = loopbox_dir(project_dir).join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be positive");
        }
        if self.lookahead_ms <= self.tick_interval_ms {
            anyhow::bail!(
                "lookahead_ms ({}) must exceed tick_interval_ms ({})",
                self.lookahead_ms,
                self.tick_interval_ms
            );
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> f64 {
        self.tick_interval_ms as f64 / 1000.0
    }

    pub fn lookahead(&self) -> f64 {
        self.lookahead_ms as f64 / 1000.0
    }
}
