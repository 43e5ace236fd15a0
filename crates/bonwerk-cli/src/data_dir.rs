// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Config file location and loading.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use bonwerk_core::PrinterConfig;
use bonwerk_core::error::Result;

const CONFIG_FILE: &str = "config.json";

/// `$XDG_DATA_HOME/bonwerk`, else `~/.local/share/bonwerk`.
pub fn data_dir() -> PathBuf {
    base_dir(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
    .join("bonwerk")
}

fn base_dir(xdg: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    if let Some(xdg) = xdg.filter(|p| !p.as_os_str().is_empty()) {
        return xdg;
    }
    if let Some(home) = home {
        return home.join(".local").join("share");
    }
    std::env::temp_dir()
}

/// Load the config from `explicit`, or from the data dir when present.
///
/// An explicit path must exist. The default location is optional and falls
/// back to built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<PrinterConfig> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "loading config");
        return PrinterConfig::load(path);
    }

    let path = data_dir().join(CONFIG_FILE);
    if path.is_file() {
        info!(path = %path.display(), "loading config");
        PrinterConfig::load(&path)
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        Ok(PrinterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let dir = base_dir(Some("/xdg".into()), Some("/home/ops".into()));
        assert_eq!(dir, PathBuf::from("/xdg"));
    }

    #[test]
    fn home_fallback() {
        let dir = base_dir(Some(PathBuf::new()), Some("/home/ops".into()));
        assert_eq!(dir, PathBuf::from("/home/ops/.local/share"));
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("printer.json");
        std::fs::write(&path, r#"{"default_port": 9101}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.default_port, 9101);
        assert_eq!(config.status_timeout_ms, 1000);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.json"))).is_err());
    }
}
