use crate::config::{compile_glob, LinterConfig};
use crate::error::Result;
use crate::report::{CodeRef, DocRef, Report, Severity, StalenessItem};
use drift_code_chunker::ChunkKind;
use drift_vector_store::{IndexEntry, SearchOptions, VectorStore};
use globset::{GlobMatcher, GlobSet};
use std::sync::Arc;

const MAX_NAMED_SYMBOLS: usize = 3;

/// Scores every indexed doc chunk against its nearest code chunks.
///
/// Stateless: each check works on a fresh snapshot of the store and uses the
/// vectors stored there, so no embedder is needed.
pub struct Linter {
    store: Arc<VectorStore>,
    config: LinterConfig,
    ignore: GlobSet,
}

impl Linter {
    pub fn new(store: Arc<VectorStore>, config: LinterConfig) -> Result<Self> {
        config.validate()?;
        let ignore = config.ignore_set()?;
        Ok(Self {
            store,
            config,
            ignore,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &LinterConfig {
        &self.config
    }

    pub fn check_all(&self) -> Result<Report> {
        self.check(|_| true)
    }

    /// Check only doc chunks whose path matches `filter`.
    ///
    /// A filter with glob metacharacters is matched as a glob; otherwise it
    /// selects one file or every file below a directory.
    pub fn check_path(&self, filter: &str) -> Result<Report> {
        let filter = PathFilter::parse(filter)?;
        self.check(|path| filter.matches(path))
    }

    fn check(&self, selected: impl Fn(&str) -> bool) -> Result<Report> {
        let options = SearchOptions::top_k(self.config.top_k)
            .with_kind(ChunkKind::Code)
            .with_min_score(self.config.min_score);

        let mut items = Vec::new();
        let mut checked = 0;
        for entry in self.store.entries_of_kind(ChunkKind::Doc) {
            let path = entry.chunk.file_path.as_str();
            if !selected(path) || self.ignore.is_match(path) {
                continue;
            }
            checked += 1;
            if let Some(item) = self.assess(&entry, options)? {
                items.push(item);
            }
        }

        let report = Report::new(items, checked);
        log::info!(
            "Checked {} doc chunks: {} critical, {} warning, {} info",
            report.checked,
            report.counts.critical,
            report.counts.warning,
            report.counts.info
        );
        Ok(report)
    }

    /// `None` when the doc chunk is healthy enough to leave out of the report.
    fn assess(&self, entry: &IndexEntry, options: SearchOptions) -> Result<Option<StalenessItem>> {
        let doc = DocRef::from(&entry.chunk);
        let hits = self.store.search(&entry.vector, options)?;

        if hits.is_empty() {
            log::debug!("{} has no related code", doc.chunk_id);
            return Ok(Some(StalenessItem {
                doc,
                severity: Severity::Info,
                score: 0.0,
                related_code: vec![],
                suggestion: suggestion(Severity::Info, &[]),
            }));
        }

        let related: Vec<CodeRef> = hits
            .iter()
            .map(|hit| CodeRef::new(&hit.chunk, hit.score))
            .collect();
        let score = related
            .iter()
            .map(|code| code.score)
            .fold(f32::NEG_INFINITY, f32::max);

        let severity = self.classify(score);
        if severity == Severity::Healthy && score >= self.config.healthy_threshold {
            return Ok(None);
        }
        log::debug!("{} scored {score:.3} ({severity})", doc.chunk_id);

        Ok(Some(StalenessItem {
            suggestion: suggestion(severity, &related),
            doc,
            severity,
            score,
            related_code: related,
        }))
    }

    fn classify(&self, score: f32) -> Severity {
        if score < self.config.critical_threshold {
            Severity::Critical
        } else if score < self.config.warning_threshold {
            Severity::Warning
        } else {
            Severity::Healthy
        }
    }
}

const ORPHANED_SUGGESTION: &str = "No related code found. The documented feature may have been \
     removed or renamed; update or delete this section.";

fn suggestion(severity: Severity, related: &[CodeRef]) -> String {
    let names = related
        .iter()
        .take(MAX_NAMED_SYMBOLS)
        .map(CodeRef::label)
        .collect::<Vec<_>>()
        .join(", ");
    match severity {
        Severity::Critical => format!(
            "Likely outdated: this section no longer matches {names}. Rewrite it against the current code."
        ),
        Severity::Warning => {
            format!("Possibly outdated: check this section against recent changes to {names}.")
        }
        Severity::Healthy => format!("Mostly in sync with {names}; a quick review may still help."),
        Severity::Info => ORPHANED_SUGGESTION.to_string(),
    }
}

enum PathFilter {
    Glob(GlobMatcher),
    Path(String),
}

impl PathFilter {
    fn parse(filter: &str) -> Result<Self> {
        let filter = filter.trim().trim_start_matches("./");
        if filter.contains(['*', '?', '[', '{']) {
            return Ok(Self::Glob(compile_glob(filter)?.compile_matcher()));
        }
        Ok(Self::Path(filter.replace('\\', "/").trim_end_matches('/').to_string()))
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Glob(glob) => glob.is_match(path),
            Self::Path(prefix) if prefix.is_empty() => true,
            Self::Path(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}
