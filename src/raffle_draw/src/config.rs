use crate::error::ExportError;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one run of the `raffle-draw` binary. Missing fields take the defaults.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DrawConfig {
    pub input: PathBuf,
    pub audit_output: PathBuf,
    pub winners_output: PathBuf,
    pub result_json: Option<PathBuf>,
    // fixed seed for a reproducible draw, entropy otherwise
    pub seed: Option<u64>,
    pub concurrent: bool,
}

impl Default for DrawConfig {
    fn default() -> Self {
        DrawConfig {
            input: PathBuf::from("raffle_tickets.csv"),
            audit_output: PathBuf::from("raffle_audit.csv"),
            winners_output: PathBuf::from("raffle_winners.csv"),
            result_json: None,
            seed: None,
            concurrent: false,
        }
    }
}

impl DrawConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(raw)?)
    }
}
