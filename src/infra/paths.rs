// src/infra/paths.rs — Path management
//
// All paths respect the WINEAR_HOME environment variable for isolation.
// When WINEAR_HOME is set, config and data live under that directory.
// When unset, config uses ~/.winear/ and data uses XDG_DATA_HOME/winear.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Returns the WINEAR_HOME override, if set.
fn winear_home() -> Option<PathBuf> {
    std::env::var_os("WINEAR_HOME").map(PathBuf::from)
}

/// Home directory, falling back to the working directory on exotic systems.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $WINEAR_HOME/ or ~/.winear/
pub fn config_dir() -> PathBuf {
    if let Some(home) = winear_home() {
        return home;
    }
    dirs_home().join(".winear")
}

/// Data directory: $WINEAR_HOME/data/ or ~/.local/share/winear/
pub fn data_dir() -> PathBuf {
    if let Some(home) = winear_home() {
        return home.join("data");
    }
    ProjectDirs::from("", "", "winear")
        .map(|d| d.data_local_dir().to_path_buf())
        .unwrap_or_else(|| config_dir().join("data"))
}

/// Default SQLite database path
pub fn db_path() -> PathBuf {
    data_dir().join("winear.db")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Ensure the data directory exists
pub async fn ensure_dirs() -> anyhow::Result<()> {
    tokio::fs::create_dir_all(data_dir()).await?;
    Ok(())
}
