pub mod application;
pub mod domain;
pub mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use serde::Serialize;
use std::path::PathBuf;

pub use application::commands::AppState;
pub use infrastructure::config::AppSettings;
pub use infrastructure::error::InfraError;

#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    pub workspace_root: String,
    pub settings_path: String,
}

/// Prepares `root` (or the current directory) for use as a workspace.
pub fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
    let workspace_root = match root {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };

    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        settings_path: result.settings_path.display().to_string(),
    })
}
