use std::path::Path;

use serde::Deserialize;

/// Configuration loaded from a `.shibfilterrc` TOML file.
///
/// Looked up first in the working directory, then in `$HOME`.
/// CLI flags always take precedence over file values.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RcConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
    pub no_color: Option<bool>,
    pub watch: Option<bool>,
    /// Log filter directive used when `RUST_LOG` is unset.
    pub log: Option<String>,
}

impl RcConfig {
    /// Load `.shibfilterrc` from `dir`, falling back to `$HOME`.
    pub fn load(dir: &Path) -> Self {
        let candidates = [
            Some(dir.join(".shibfilterrc")),
            dirs_home().map(|h| h.join(".shibfilterrc")),
        ];

        for candidate in candidates.iter().flatten() {
            if let Ok(contents) = std::fs::read_to_string(candidate) {
                match toml::from_str::<RcConfig>(&contents) {
                    Ok(cfg) => return cfg,
                    Err(e) => tracing::warn!(file = %candidate.display(), error = %e, "ignoring invalid run control file"),
                }
            }
        }

        RcConfig::default()
    }
}

fn dirs_home() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME").map(std::path::PathBuf::from)
}
