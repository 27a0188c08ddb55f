use crate::calc::{evaluate, round_off_2_decimals, Grade, StudentRecord};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ROSTER_FILE: &str = "student_grades.csv";
pub const MIN_SUBJECTS: usize = 1;
pub const MAX_SUBJECTS: usize = 10;
pub const DEFAULT_SUBJECTS: usize = 3;

const NAME_COLUMN: &str = "Name";
const AVERAGE_COLUMN: &str = "Average";
const GRADE_COLUMN: &str = "Grade";
/// One cent, plus slack for binary representation.
const AVERAGE_TOLERANCE: f64 = 0.01 + 1e-9;

pub fn subject_labels(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("Subject {i}")).collect()
}

pub fn subject_count_in_range(count: usize) -> bool {
    (MIN_SUBJECTS..=MAX_SUBJECTS).contains(&count)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("roster file {path} is unreadable: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("failed to write roster file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove roster file {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode roster: {0}")]
    Encode(#[from] csv::Error),
}

/// Ordered results for the active session. The subject labels travel with
/// the roster so every record has the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    subjects: Vec<String>,
    records: Vec<StudentRecord>,
}

impl Roster {
    pub fn new(subjects: Vec<String>) -> Self {
        Self {
            subjects,
            records: Vec::new(),
        }
    }

    pub fn with_subject_count(count: usize) -> Self {
        Self::new(subject_labels(count))
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record with this name, matching the trimmed input exactly.
    pub fn find(&self, name: &str) -> Option<&StudentRecord> {
        let name = name.trim();
        self.records.iter().find(|r| r.name() == name)
    }

    pub fn with_record(&self, record: StudentRecord) -> Roster {
        let mut next = self.clone();
        next.records.push(record);
        next
    }
}

fn format_number(v: f64) -> String {
    format!("{v}")
}

/// Serializes a roster as CSV: `Name,<subjects>,Average,Grade`.
pub fn export_csv(roster: &Roster) -> Result<Vec<u8>, StoreError> {
    let mut w = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = Vec::with_capacity(roster.subjects.len() + 3);
    header.push(NAME_COLUMN);
    header.extend(roster.subjects.iter().map(|s| s.as_str()));
    header.push(AVERAGE_COLUMN);
    header.push(GRADE_COLUMN);
    w.write_record(&header)?;

    for r in &roster.records {
        let mut row: Vec<String> = Vec::with_capacity(header.len());
        row.push(r.name().to_string());
        row.extend(r.scores().iter().map(|s| format_number(*s)));
        row.push(format_number(r.average()));
        row.push(r.grade().to_string());
        w.write_record(&row)?;
    }

    w.into_inner().map_err(|e| {
        let io = std::io::Error::new(e.error().kind(), e.error().to_string());
        StoreError::Encode(csv::Error::from(io))
    })
}

/// Parses roster CSV. The header decides the subject columns.
pub fn parse_csv(bytes: &[u8]) -> Result<Roster, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let header = rdr.headers().map_err(|e| e.to_string())?.clone();
    let cols: Vec<&str> = header.iter().collect();
    if cols.len() < 4 {
        return Err(format!("expected at least 4 columns, found {}", cols.len()));
    }
    if cols[0] != NAME_COLUMN
        || cols[cols.len() - 2] != AVERAGE_COLUMN
        || cols[cols.len() - 1] != GRADE_COLUMN
    {
        return Err(format!("unexpected header: {}", cols.join(",")));
    }
    let subjects: Vec<String> = cols[1..cols.len() - 2]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut roster = Roster::new(subjects);
    for (i, row) in rdr.records().enumerate() {
        let line = i + 2;
        let row = row.map_err(|e| format!("line {line}: {e}"))?;
        let fields: Vec<&str> = row.iter().collect();

        let mut scores = Vec::with_capacity(roster.subjects.len());
        for raw in &fields[1..fields.len() - 2] {
            let v = raw
                .parse::<f64>()
                .map_err(|_| format!("line {line}: score {raw:?} is not numeric"))?;
            scores.push(v);
        }
        let record = StudentRecord::from_scores(fields[0], scores)
            .map_err(|e| format!("line {line}: {e}"))?;

        let stored_avg = fields[fields.len() - 2]
            .parse::<f64>()
            .map_err(|_| format!("line {line}: average is not numeric"))?;
        // Other writers may round exact half-cents the other way.
        if (round_off_2_decimals(stored_avg) - record.average()).abs() > AVERAGE_TOLERANCE {
            return Err(format!(
                "line {line}: stored average {stored_avg} disagrees with scores ({})",
                record.average()
            ));
        }
        let stored_grade: Grade = fields[fields.len() - 1]
            .parse()
            .map_err(|e: String| format!("line {line}: {e}"))?;
        if stored_grade != record.grade() && stored_grade != evaluate(stored_avg) {
            return Err(format!(
                "line {line}: stored grade {stored_grade} disagrees with average ({})",
                record.grade()
            ));
        }
        if stored_avg != record.average() {
            warn!(
                line,
                stored = stored_avg,
                recomputed = record.average(),
                "stored average differs by rounding, using recomputed value"
            );
        }

        roster.records.push(record);
    }
    Ok(roster)
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub roster: Roster,
    pub warning: Option<String>,
}

/// The roster's flat file. Every mutation rewrites it whole.
#[derive(Debug, Clone)]
pub struct RosterStore {
    path: PathBuf,
}

impl RosterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_workspace(workspace: &Path) -> Self {
        Self::new(workspace.join(ROSTER_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty roster. An unreadable one is also an empty
    /// roster, with the reason reported back as a warning.
    pub fn load(&self, default_subjects: usize) -> LoadOutcome {
        let empty = || Roster::with_subject_count(default_subjects);
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return LoadOutcome {
                    roster: empty(),
                    warning: None,
                }
            }
            Err(e) => return self.recovered(empty(), e.to_string()),
        };
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return LoadOutcome {
                roster: empty(),
                warning: None,
            };
        }

        match parse_csv(&bytes) {
            Ok(roster) => {
                info!(
                    path = %self.path.display(),
                    students = roster.len(),
                    subjects = roster.subjects.len(),
                    "roster loaded"
                );
                LoadOutcome {
                    roster,
                    warning: None,
                }
            }
            Err(reason) => self.recovered(empty(), reason),
        }
    }

    fn recovered(&self, roster: Roster, reason: String) -> LoadOutcome {
        let e = StoreError::Read {
            path: self.path.clone(),
            reason,
        };
        warn!(error = %e, "starting with an empty roster");
        LoadOutcome {
            roster,
            warning: Some(e.to_string()),
        }
    }

    /// Writes the whole roster through a temp file and a rename.
    pub fn save(&self, roster: &Roster) -> Result<(), StoreError> {
        let bytes = export_csv(roster)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let tmp = self.path.with_extension("csv.writing");
        std::fs::write(&tmp, &bytes).map_err(write_err)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(write_err(e));
        }
        Ok(())
    }

    /// Persists `roster` plus `record` and only then hands back the new
    /// roster. On error the caller still holds the old one.
    pub fn append(&self, roster: &Roster, record: StudentRecord) -> Result<Roster, StoreError> {
        let next = roster.with_record(record);
        self.save(&next)?;
        info!(path = %self.path.display(), students = next.len(), "roster saved");
        Ok(next)
    }

    pub fn clear(&self, subjects: &[String]) -> Result<Roster, StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "roster file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Remove {
                    path: self.path.clone(),
                    source,
                })
            }
        }
        Ok(Roster::new(subjects.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::build_record;

    fn rec(name: &str, scores: &[&str]) -> StudentRecord {
        build_record(Some(name), scores, &subject_labels(scores.len())).expect("record")
    }

    #[test]
    fn export_writes_header_and_rows() {
        let roster = Roster::with_subject_count(3)
            .with_record(rec("Alice", &["90", "85", "95"]))
            .with_record(rec("Bob", &["70", "65", "68"]));
        let text = String::from_utf8(export_csv(&roster).expect("csv")).expect("utf8");
        assert_eq!(
            text,
            "Name,Subject 1,Subject 2,Subject 3,Average,Grade\n\
             Alice,90,85,95,90,A\n\
             Bob,70,65,68,67.67,C\n"
        );
    }

    #[test]
    fn export_quotes_names_with_commas() {
        let roster = Roster::with_subject_count(1).with_record(rec("Smith, Jo", &["55.5"]));
        let text = String::from_utf8(export_csv(&roster).expect("csv")).expect("utf8");
        assert!(text.contains("\"Smith, Jo\",55.5,55.5,D"), "{text}");
    }

    #[test]
    fn parse_takes_subjects_from_header() {
        let text = "Name,Maths,Art,Average,Grade\nZed,50,60,55,D\n";
        let roster = parse_csv(text.as_bytes()).expect("parse");
        assert_eq!(roster.subjects(), &["Maths".to_string(), "Art".to_string()]);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.records()[0].average(), 55.0);
    }

    #[test]
    fn parse_rejects_inconsistent_rows() {
        let bad_grade = "Name,Subject 1,Average,Grade\nZed,90,90,F\n";
        assert!(parse_csv(bad_grade.as_bytes()).is_err());
        let bad_avg = "Name,Subject 1,Average,Grade\nZed,90,12,A\n";
        assert!(parse_csv(bad_avg.as_bytes()).is_err());
        let bad_score = "Name,Subject 1,Average,Grade\nZed,abc,90,A\n";
        assert!(parse_csv(bad_score.as_bytes()).is_err());
        let short_row = "Name,Subject 1,Subject 2,Average,Grade\nZed,90,90,A\n";
        assert!(parse_csv(short_row.as_bytes()).is_err());
        let bad_header = "Student,Subject 1,Average,Grade\n";
        assert!(parse_csv(bad_header.as_bytes()).is_err());
    }

    #[test]
    fn half_cent_average_rounded_the_other_way_is_accepted() {
        let text = "Name,Subject 1,Subject 2,Average,Grade\nAl,50.25,50,50.12,D\n";
        let roster = parse_csv(text.as_bytes()).expect("parse");
        let al = roster.find("Al").expect("Al");
        assert_eq!(al.average(), 50.13);
        assert_eq!(al.grade(), Grade::D);

        let two_cents_off = "Name,Subject 1,Subject 2,Average,Grade\nAl,50.25,50,50.11,D\n";
        assert!(parse_csv(two_cents_off.as_bytes()).is_err());
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RosterStore::in_workspace(dir.path());
        let out = store.load(4);
        assert!(out.roster.is_empty());
        assert_eq!(out.roster.subjects().len(), 4);
        assert!(out.warning.is_none());
    }

    #[test]
    fn malformed_file_loads_empty_with_warning() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RosterStore::in_workspace(dir.path());
        std::fs::write(store.path(), "this is not a roster\n").expect("write");
        let out = store.load(3);
        assert!(out.roster.is_empty());
        assert!(out.warning.is_some());
    }

    #[test]
    fn append_rewrites_file_and_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RosterStore::in_workspace(dir.path());

        let r0 = store.load(3).roster;
        let alice = rec("Alice", &["90", "85", "95"]);
        let r1 = store.append(&r0, alice.clone()).expect("append");
        assert_eq!(r1.len(), 1);
        assert!(r0.is_empty());

        let reloaded = store.load(3).roster;
        assert_eq!(reloaded, r1);
        assert_eq!(reloaded.records()[0], alice);

        let bob = rec("Bob", &["70", "65", "68"]);
        let r2 = store.append(&reloaded, bob).expect("append");
        let loaded = store.load(3).roster;
        let names: Vec<&str> = loaded.records().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert_eq!(export_csv(&r2).expect("csv"), std::fs::read(store.path()).expect("read"));
    }

    #[test]
    fn failed_write_leaves_roster_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").expect("write");
        let store = RosterStore::in_workspace(&blocker);

        let r0 = Roster::with_subject_count(1);
        let err = store.append(&r0, rec("Al", &["50"])).expect_err("write fails");
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(r0.is_empty());
    }

    #[test]
    fn clear_without_file_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RosterStore::in_workspace(dir.path());
        let cleared = store.clear(&subject_labels(3)).expect("clear");
        assert!(cleared.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RosterStore::in_workspace(dir.path());
        let r = store
            .append(&Roster::with_subject_count(1), rec("Al", &["50"]))
            .expect("append");
        assert!(store.path().exists());
        let cleared = store.clear(r.subjects()).expect("clear");
        assert!(cleared.is_empty());
        assert_eq!(cleared.subjects(), r.subjects());
        assert!(!store.path().exists());
    }

    #[test]
    fn find_matches_trimmed_name() {
        let r = Roster::with_subject_count(1)
            .with_record(rec("Alice", &["50"]))
            .with_record(rec("Alice", &["90"]));
        assert_eq!(r.find(" Alice ").expect("found").average(), 50.0);
        assert!(r.find("Bob").is_none());
    }
}
