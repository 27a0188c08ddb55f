use crate::validate::{parse_score, valid_name, valid_score};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const PASS_MARK: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            other => Err(format!("unknown grade: {other:?}")),
        }
    }
}

/// Letter grade for an average. Bands are half-open and checked from the
/// top, so a boundary value belongs to the higher band. NaN falls through
/// every comparison and lands on `F`.
pub fn evaluate(average: f64) -> Grade {
    if average >= 80.0 {
        Grade::A
    } else if average >= 70.0 {
        Grade::B
    } else if average >= 60.0 {
        Grade::C
    } else if average >= PASS_MARK {
        Grade::D
    } else {
        Grade::F
    }
}

/// Two-decimal rounding, half away from zero.
pub fn round_off_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / (values.len() as f64)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", join_messages(.errors))]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

impl ValidationFailure {
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }
}

/// One student's row in the roster. `average` and `grade` are fixed at
/// construction and always agree with `scores`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    name: String,
    scores: Vec<f64>,
    average: f64,
    grade: Grade,
}

impl StudentRecord {
    /// Builds a record from scores that are already numeric, e.g. when
    /// hydrating from the persisted file.
    pub fn from_scores(name: &str, scores: Vec<f64>) -> Result<Self, ValidationFailure> {
        let mut errors = Vec::new();
        if !valid_name(Some(name)) {
            errors.push(FieldError::new("name", "Name cannot be empty."));
        }
        if scores.is_empty() {
            errors.push(FieldError::new("scores", "at least one score is required"));
        }
        for (i, s) in scores.iter().enumerate() {
            if !s.is_finite() || !(0.0..=100.0).contains(s) {
                let label = format!("Subject {}", i + 1);
                errors.push(FieldError::new(
                    &label,
                    format!("{label} must be between 0 and 100."),
                ));
            }
        }
        if !errors.is_empty() {
            return Err(ValidationFailure { errors });
        }

        let average = round_off_2_decimals(mean(&scores));
        Ok(Self {
            name: name.trim().to_string(),
            scores,
            average,
            grade: evaluate(average),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn passed(&self) -> bool {
        self.average >= PASS_MARK
    }
}

/// Validates a submitted form and turns it into a record. Every field is
/// checked before anything is reported so the caller can show all problems
/// at once.
pub fn build_record<S: AsRef<str>>(
    name: Option<&str>,
    raw_scores: &[S],
    subject_labels: &[String],
) -> Result<StudentRecord, ValidationFailure> {
    let mut errors = Vec::new();
    if !valid_name(name) {
        errors.push(FieldError::new("name", "Name cannot be empty."));
    }
    if raw_scores.len() != subject_labels.len() {
        errors.push(FieldError::new(
            "scores",
            format!(
                "expected {} scores, got {}",
                subject_labels.len(),
                raw_scores.len()
            ),
        ));
    }

    for (i, raw) in raw_scores.iter().enumerate() {
        if valid_score(raw.as_ref()) {
            continue;
        }
        let label = subject_labels
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("Subject {}", i + 1));
        errors.push(FieldError::new(
            &label,
            format!("{label} must be between 0 and 100."),
        ));
    }

    if !errors.is_empty() {
        return Err(ValidationFailure { errors });
    }
    let scores: Vec<f64> = raw_scores
        .iter()
        .filter_map(|raw| parse_score(raw.as_ref()))
        .collect();
    StudentRecord::from_scores(name.unwrap_or_default(), scores)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStudent {
    pub name: String,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub total_students: usize,
    pub class_average: Option<f64>,
    pub top: Option<RankedStudent>,
    pub bottom: Option<RankedStudent>,
    pub pass_rate: Option<f64>,
    pub grade_distribution: BTreeMap<Grade, usize>,
}

/// Dashboard view over a roster. Ties for top and bottom go to the earliest
/// record.
pub fn class_stats(records: &[StudentRecord]) -> ClassStats {
    let mut grade_distribution: BTreeMap<Grade, usize> =
        Grade::ALL.iter().map(|g| (*g, 0)).collect();
    for r in records {
        *grade_distribution.entry(r.grade).or_insert(0) += 1;
    }

    if records.is_empty() {
        return ClassStats {
            total_students: 0,
            class_average: None,
            top: None,
            bottom: None,
            pass_rate: None,
            grade_distribution,
        };
    }

    let averages: Vec<f64> = records.iter().map(|r| r.average).collect();
    let mut top = &records[0];
    let mut bottom = &records[0];
    for r in &records[1..] {
        if r.average > top.average {
            top = r;
        }
        if r.average < bottom.average {
            bottom = r;
        }
    }
    let passed = records.iter().filter(|r| r.passed()).count();

    ClassStats {
        total_students: records.len(),
        class_average: Some(round_off_2_decimals(mean(&averages))),
        top: Some(RankedStudent {
            name: top.name.clone(),
            average: top.average,
        }),
        bottom: Some(RankedStudent {
            name: bottom.name.clone(),
            average: bottom.average,
        }),
        pass_rate: Some(100.0 * (passed as f64) / (records.len() as f64)),
        grade_distribution,
    }
}
