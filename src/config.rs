use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::filter::builder;
use crate::filter::engine::AttributeFilterEngine;
use crate::model::attribute_policy::PolicyGroupConfig;
use crate::parsers;

/// A parsed policy file and the engine built from it.
pub struct LoadedPolicy {
    pub path: PathBuf,
    pub config: PolicyGroupConfig,
    pub engine: AttributeFilterEngine,
}

/// Parses, builds and activates the policy at `path`.
pub fn load_policy(path: &Path) -> Result<LoadedPolicy> {
    let config = parsers::attribute_policy::parse(path)?;
    let engine = builder::build_engine(&config)
        .with_context(|| format!("Failed to build policy from {}", path.display()))?;
    Ok(LoadedPolicy {
        path: path.to_path_buf(),
        config,
        engine,
    })
}

/// Expands the request arguments into request files.
///
/// Files are taken as given; a directory contributes its `*.json` files in
/// name order.
pub fn discover_requests(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut requests = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let pattern = input.join("*.json").to_string_lossy().to_string();
            let mut found: Vec<PathBuf> = glob::glob(&pattern)
                .with_context(|| format!("Invalid directory name {}", input.display()))?
                .filter_map(|e| e.ok())
                .collect();
            found.sort();
            if found.is_empty() {
                bail!("no *.json request files in {}", input.display());
            }
            requests.extend(found);
        } else if input.is_file() {
            requests.push(input.clone());
        } else {
            bail!("'{}' does not exist", input.display());
        }
    }
    Ok(requests)
}
