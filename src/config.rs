use crate::auth::StaticCredentials;
use crate::roster::{subject_count_in_range, DEFAULT_SUBJECTS, MAX_SUBJECTS, MIN_SUBJECTS};
use anyhow::anyhow;
use clap::Parser;
use std::path::PathBuf;

/// Grading sidecar: reads one JSON request per line on stdin and answers
/// on stdout.
#[derive(Debug, Clone, Parser)]
#[command(name = "gradebookd", version, about)]
pub struct Config {
    /// Directory holding student_grades.csv; selected before the first request
    #[arg(long, env = "GRADEBOOK_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Number of subjects for a new roster
    #[arg(long, env = "GRADEBOOK_SUBJECTS", default_value_t = DEFAULT_SUBJECTS)]
    pub subjects: usize,

    /// JSON file mapping usernames to passwords
    #[arg(long, env = "GRADEBOOK_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Log level or filter directive (e.g. "debug", "gradebookd=trace")
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !subject_count_in_range(self.subjects) {
            return Err(anyhow!(
                "--subjects must be between {} and {}, got {}",
                MIN_SUBJECTS,
                MAX_SUBJECTS,
                self.subjects
            ));
        }
        Ok(())
    }

    pub fn credentials(&self) -> anyhow::Result<StaticCredentials> {
        match &self.credentials {
            Some(p) => StaticCredentials::from_json_file(p),
            None => Ok(StaticCredentials::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_three_subjects_and_info() {
        let cfg = Config::try_parse_from(["gradebookd"]).expect("parse");
        assert_eq!(cfg.subjects, 3);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.workspace.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn subject_count_is_bounded() {
        let cfg = Config::try_parse_from(["gradebookd", "--subjects", "11"]).expect("parse");
        assert!(cfg.validate().is_err());
        let cfg = Config::try_parse_from(["gradebookd", "--subjects", "0"]).expect("parse");
        assert!(cfg.validate().is_err());
        let cfg = Config::try_parse_from(["gradebookd", "--subjects", "10"]).expect("parse");
        assert!(cfg.validate().is_ok());
    }
}
