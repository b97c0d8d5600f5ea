//! Framework configuration, loaded from YAML.
//!
//! ```yaml
//! prefixes: ["!", "?"]
//! mention_prefix: true
//! bot_id: 1234
//! snapshot_dir: .argot/snapshots
//! log_filter: argot=debug
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diagnostics::CommandError;
use crate::err_msg;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameworkConfig {
    /// Text prefixes that mark a message as a command.
    pub prefixes: Vec<String>,
    /// Accept a mention of `bot_id` as a prefix.
    pub mention_prefix: bool,
    pub bot_id: Option<u64>,
    /// Where confirmed schema registrations are persisted.
    pub snapshot_dir: Option<PathBuf>,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Drop text commands issued by bot accounts.
    pub ignore_bots: bool,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            prefixes: vec!["!".to_string()],
            mention_prefix: false,
            bot_id: None,
            snapshot_dir: None,
            log_filter: "info".to_string(),
            ignore_bots: true,
        }
    }
}

impl FrameworkConfig {
    pub fn from_yaml(text: &str) -> Result<Self, CommandError> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| CommandError::Config {
            message: format!("invalid configuration: {e}"),
            ctx: Default::default(),
            source: Some(Box::new(e)),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CommandError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CommandError::Config {
            message: format!("cannot read configuration '{}': {e}", path.display()),
            ctx: Default::default(),
            source: Some(Box::new(e)),
        })?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        if self.prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(err_msg!(Config, "prefixes must not be blank"));
        }
        if self.prefixes.is_empty() && !self.mention_prefix {
            return Err(err_msg!(
                Config,
                "no prefixes configured and mention_prefix is disabled"
            ));
        }
        if self.mention_prefix && self.bot_id.is_none() {
            return Err(err_msg!(Config, "mention_prefix requires bot_id"));
        }
        Ok(())
    }
}
