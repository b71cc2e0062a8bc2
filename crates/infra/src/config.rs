//! Configuration loading and representation.

use tracing::warn;

/// Settings for a [`crate::projections::ProjectionEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionConfig {
    /// Name used in log fields.
    pub name: String,
    /// Replay the full log into the read model when the engine starts.
    pub replay_on_start: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            name: "read_model".to_string(),
            replay_on_start: true,
        }
    }
}

impl ProjectionConfig {
    pub const NAME_VAR: &'static str = "HAPPYFACTORY_PROJECTION_NAME";
    pub const REPLAY_ON_START_VAR: &'static str = "HAPPYFACTORY_REPLAY_ON_START";

    /// Read overrides from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(name) = lookup(Self::NAME_VAR).filter(|n| !n.trim().is_empty()) {
            config.name = name.trim().to_string();
        }

        if let Some(raw) = lookup(Self::REPLAY_ON_START_VAR) {
            match parse_flag(&raw) {
                Some(flag) => config.replay_on_start = flag,
                None => warn!(
                    var = Self::REPLAY_ON_START_VAR,
                    value = %raw,
                    default = config.replay_on_start,
                    "unparsable flag; using default"
                ),
            }
        }

        config
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_replay_on_start(mut self, replay_on_start: bool) -> Self {
        self.replay_on_start = replay_on_start;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
