use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;

/// Credential check used to gate a session. The grading code never sees it.
pub trait Authenticator {
    fn authenticate(&self, username: &str, password: &str) -> bool;
}

/// Plain username to password lookup. No hashing; this only keeps casual
/// users out of a single-operator tool.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    /// Reads a JSON object of `{ "username": "password" }`.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials {}", path.to_string_lossy()))?;
        let users: HashMap<String, String> = serde_json::from_str(&text)
            .with_context(|| format!("credentials {} are not a JSON object of strings", path.to_string_lossy()))?;
        Ok(Self::new(users))
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::new(HashMap::from([
            ("teacher1".to_string(), "password123".to_string()),
            ("admin".to_string(), "admin123".to_string()),
        ]))
    }
}

impl Authenticator for StaticCredentials {
    fn authenticate(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .map(|p| p == password)
            .unwrap_or(false)
    }
}
