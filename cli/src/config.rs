//! Optional TOML config file (§10.4): supplies defaults for any flag not
//! given explicitly on the command line, mirroring the teacher's
//! `frontend` config-file convention minus the platform config-dir search.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub rom: Option<PathBuf>,
    pub rom_extra: Option<PathBuf>,
    pub program: Option<PathBuf>,
    pub steps: Option<u64>,
    pub dump_frame: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Config, String> {
        let text = std::fs::read_to_string(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
        toml::from_str(&text).map_err(|e| format!("parsing {}: {e}", path.display()))
    }
}
