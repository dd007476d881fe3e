//! Optional `faro.toml` profile.
//!
//! A profile supplies table locations and fallback query parameters so
//! repeated invocations do not need the full flag set. Explicit flags
//! always win over profile values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::CliError;

/// Parsed `faro.toml` contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// `[tables]` section.
    #[serde(default)]
    pub tables: TablePaths,
    /// `[query]` section.
    #[serde(default)]
    pub query: QueryDefaults,
}

/// Where the three CSV relations live.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TablePaths {
    /// Customer CSV path.
    pub customer: Option<PathBuf>,
    /// Orders CSV path.
    pub orders: Option<PathBuf>,
    /// Lineitem CSV path.
    pub lineitem: Option<PathBuf>,
}

/// Fallback parameter values for `run` and `explain`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryDefaults {
    /// Market segment filter.
    pub segment: Option<String>,
    /// Cutoff date in `YYYY-MM-DD` form.
    pub cutoff: Option<String>,
}

/// Loads a profile from `path`.
pub fn load_profile(path: &Path) -> Result<Profile, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|err| CliError::Message(format!("cannot read {}: {err}", path.display())))?;
    Ok(toml::from_str(&raw)?)
}
