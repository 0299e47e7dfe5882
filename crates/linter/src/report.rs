use drift_code_chunker::Chunk;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a doc chunk has drifted from the code it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Healthy,
    /// No related code at all; possibly orphaned documentation
    Info,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Healthy => "healthy",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The documentation chunk an item is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRef {
    pub chunk_id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
}

impl From<&Chunk> for DocRef {
    fn from(chunk: &Chunk) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            file_path: chunk.file_path.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            heading: chunk.symbol_name().map(str::to_string),
        }
    }
}

/// A related code chunk and its similarity to the doc chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRef {
    pub chunk_id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
    pub score: f32,
}

impl CodeRef {
    pub(crate) fn new(chunk: &Chunk, score: f32) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            file_path: chunk.file_path.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            symbol_name: chunk.symbol_name().map(str::to_string),
            score,
        }
    }

    /// The symbol when known, else `path:start-end`.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.symbol_name {
            Some(symbol) => symbol.clone(),
            None => format!("{}:{}-{}", self.file_path, self.start_line, self.end_line),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StalenessItem {
    pub doc: DocRef,
    pub severity: Severity,
    /// Best similarity against related code; `0.0` for orphaned docs
    pub score: f32,
    pub related_code: Vec<CodeRef>,
    pub suggestion: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub warning: usize,
    pub healthy: usize,
    pub info: usize,
}

impl SeverityCounts {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::Warning => self.warning += 1,
            Severity::Healthy => self.healthy += 1,
            Severity::Info => self.info += 1,
        }
    }
}

/// Outcome of one staleness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Most severe first, then lowest score, then by location
    pub items: Vec<StalenessItem>,
    pub counts: SeverityCounts,
    /// Doc chunks examined, including healthy ones left out of `items`
    pub checked: usize,
    /// Critical, warning or healthy; info items never raise it
    pub overall: Severity,
    pub score: f32,
}

impl Report {
    #[must_use]
    pub fn new(mut items: Vec<StalenessItem>, checked: usize) -> Self {
        items.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| a.score.total_cmp(&b.score))
                .then_with(|| a.doc.file_path.cmp(&b.doc.file_path))
                .then_with(|| a.doc.start_line.cmp(&b.doc.start_line))
        });

        let mut counts = SeverityCounts::default();
        for item in &items {
            counts.add(item.severity);
        }

        let overall = if counts.critical > 0 {
            Severity::Critical
        } else if counts.warning > 0 {
            Severity::Warning
        } else {
            Severity::Healthy
        };

        Self {
            score: aggregate_score(&counts, items.len()),
            items,
            counts,
            checked,
            overall,
        }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.overall == Severity::Healthy
    }
}

#[allow(clippy::cast_precision_loss)]
fn aggregate_score(counts: &SeverityCounts, total: usize) -> f32 {
    if total == 0 {
        return 1.0;
    }
    let total = total as f32;
    if counts.critical > 0 {
        1.0 - counts.critical as f32 / total
    } else if counts.warning > 0 {
        1.0 - 0.5 * counts.warning as f32 / total
    } else {
        1.0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(
                f,
                "[{}] {}:{}-{} (score {:.2})",
                item.severity,
                item.doc.file_path,
                item.doc.start_line,
                item.doc.end_line,
                item.score
            )?;
            if let Some(heading) = &item.doc.heading {
                writeln!(f, "    section: {heading}")?;
            }
            for code in &item.related_code {
                writeln!(f, "    ~ {} ({:.2})", code.label(), code.score)?;
            }
            writeln!(f, "    {}", item.suggestion)?;
        }
        write!(
            f,
            "{} doc chunks checked: {} critical, {} warning, {} healthy, {} info. Overall {} (score {:.2})",
            self.checked,
            self.counts.critical,
            self.counts.warning,
            self.counts.healthy,
            self.counts.info,
            self.overall,
            self.score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(path: &str, severity: Severity, score: f32) -> StalenessItem {
        StalenessItem {
            doc: DocRef {
                chunk_id: format!("{path}:1:3"),
                file_path: path.to_string(),
                start_line: 1,
                end_line: 3,
                heading: None,
            },
            severity,
            score,
            related_code: vec![],
            suggestion: "review".into(),
        }
    }

    #[test]
    fn empty_report_is_healthy() {
        let report = Report::new(vec![], 0);
        assert_eq!(report.overall, Severity::Healthy);
        assert_eq!(report.score, 1.0);
        assert!(report.is_clean());
    }

    #[test]
    fn critical_dominates() {
        let report = Report::new(
            vec![
                item("a.md", Severity::Warning, 0.6),
                item("b.md", Severity::Critical, 0.4),
                item("c.md", Severity::Healthy, 0.8),
                item("d.md", Severity::Info, 0.0),
            ],
            6,
        );
        assert_eq!(report.overall, Severity::Critical);
        assert_eq!(report.score, 0.75);
        assert_eq!(
            report.counts,
            SeverityCounts {
                critical: 1,
                warning: 1,
                healthy: 1,
                info: 1,
            }
        );
        assert_eq!(report.items[0].doc.file_path, "b.md");
        assert_eq!(report.items[3].severity, Severity::Info);
    }

    #[test]
    fn warnings_cost_half() {
        let report = Report::new(
            vec![
                item("a.md", Severity::Warning, 0.6),
                item("b.md", Severity::Healthy, 0.8),
            ],
            2,
        );
        assert_eq!(report.overall, Severity::Warning);
        assert_eq!(report.score, 0.75);
    }

    #[test]
    fn info_only_stays_healthy() {
        let report = Report::new(vec![item("a.md", Severity::Info, 0.0)], 1);
        assert_eq!(report.overall, Severity::Healthy);
        assert_eq!(report.score, 1.0);
    }

    #[test]
    fn serializes_lowercase_severity() {
        let report = Report::new(vec![item("a.md", Severity::Critical, 0.1)], 1);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["overall"], "critical");
        assert_eq!(json["items"][0]["severity"], "critical");
        assert_eq!(json["counts"]["critical"], 1);
    }

    #[test]
    fn code_ref_label_falls_back_to_range() {
        let code = CodeRef {
            chunk_id: "src/a.rs:4:9".into(),
            file_path: "src/a.rs".into(),
            start_line: 4,
            end_line: 9,
            symbol_name: None,
            score: 0.5,
        };
        assert_eq!(code.label(), "src/a.rs:4-9");
    }
}
