use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::auth::Authenticator;
use crate::report::ReportRenderer;
use crate::roster::{Roster, RosterStore};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything one session owns. Handlers get it by `&mut`; nothing lives in
/// globals.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<RosterStore>,
    pub roster: Roster,
    pub user: Option<String>,
    pub default_subjects: usize,
    pub auth: Box<dyn Authenticator>,
    pub reports: Box<dyn ReportRenderer>,
}

impl AppState {
    pub fn new(
        default_subjects: usize,
        auth: Box<dyn Authenticator>,
        reports: Box<dyn ReportRenderer>,
    ) -> Self {
        Self {
            workspace: None,
            store: None,
            roster: Roster::with_subject_count(default_subjects),
            user: None,
            default_subjects,
            auth,
            reports,
        }
    }

    /// Points the session at a workspace directory and hydrates the roster
    /// from its file. Returns the load warning, if any.
    pub fn select_workspace(&mut self, path: &Path) -> anyhow::Result<Option<String>> {
        std::fs::create_dir_all(path)?;
        let store = RosterStore::in_workspace(path);
        let outcome = store.load(self.default_subjects);
        info!(
            workspace = %path.display(),
            students = outcome.roster.len(),
            "workspace selected"
        );
        self.workspace = Some(path.to_path_buf());
        self.store = Some(store);
        self.roster = outcome.roster;
        Ok(outcome.warning)
    }
}
