use crate::calc::StudentRecord;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub file_name: String,
    pub media_type: &'static str,
    pub body: Vec<u8>,
}

/// Turns one record into a single-page document.
pub trait ReportRenderer {
    fn render(&self, record: &StudentRecord, subjects: &[String]) -> RenderedReport;
}

/// Fixed one-page plain text layout: title, one line per subject in order,
/// then average and grade.
#[derive(Debug, Clone, Default)]
pub struct TextReport {
    /// Pinned timestamp for the footer; `None` uses the current time.
    pub generated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
impl TextReport {
    pub fn at(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at: Some(generated_at),
        }
    }
}

impl ReportRenderer for TextReport {
    fn render(&self, record: &StudentRecord, subjects: &[String]) -> RenderedReport {
        let mut out = String::new();
        out.push_str(&format!("Student Report: {}\n\n", record.name()));
        for (i, score) in record.scores().iter().enumerate() {
            let label = subjects
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("Subject {}", i + 1));
            out.push_str(&format!("{label}: {score}\n"));
        }
        out.push('\n');
        out.push_str(&format!("Average: {}\n", record.average()));
        out.push_str(&format!("Grade: {}\n", record.grade()));

        let ts = self.generated_at.unwrap_or_else(Utc::now);
        out.push_str(&format!("\nGenerated {}\n", ts.format("%Y-%m-%d %H:%M UTC")));

        RenderedReport {
            file_name: format!("{}_report.txt", record.name()),
            media_type: "text/plain; charset=utf-8",
            body: out.into_bytes(),
        }
    }
}
