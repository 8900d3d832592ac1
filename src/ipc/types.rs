use crate::catalog::Catalog;
use rusqlite::Connection;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Always populated: the embedded default before a workspace is
    /// selected, possibly a workspace override afterwards.
    pub catalog: Catalog,
    /// True when the active catalog came from the workspace rules file.
    pub rules_from_workspace: bool,
}
