use crate::error::{LinterError, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

/// Severity thresholds and search knobs for staleness checks.
///
/// A doc chunk whose best code match scores below `critical_threshold` is
/// critical, below `warning_threshold` a warning, and below
/// `healthy_threshold` a reported healthy item. Anything at or above
/// `healthy_threshold` stays out of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinterConfig {
    pub critical_threshold: f32,
    pub warning_threshold: f32,
    pub healthy_threshold: f32,

    /// Code chunks considered per doc chunk
    pub top_k: usize,

    /// Code matches below this do not count as related
    pub min_score: f32,

    /// Doc paths matching any of these globs are never checked
    pub ignore: Vec<String>,
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            critical_threshold: 0.5,
            warning_threshold: 0.7,
            healthy_threshold: 0.85,
            top_k: 5,
            min_score: 0.3,
            ignore: Vec::new(),
        }
    }
}

impl LinterConfig {
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            0.0,
            self.critical_threshold,
            self.warning_threshold,
            self.healthy_threshold,
            1.0,
        ];
        if thresholds.iter().any(|t| !t.is_finite())
            || thresholds.windows(2).any(|pair| pair[0] > pair[1])
        {
            return Err(LinterError::InvalidConfig(format!(
                "thresholds must satisfy 0 <= critical ({}) <= warning ({}) <= healthy ({}) <= 1",
                self.critical_threshold, self.warning_threshold, self.healthy_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(LinterError::InvalidConfig("top_k must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(LinterError::InvalidConfig(format!(
                "min_score must be within [0, 1], got {}",
                self.min_score
            )));
        }
        self.ignore_set().map(|_| ())
    }

    pub(crate) fn ignore_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore {
            builder.add(compile_glob(pattern)?);
        }
        builder.build().map_err(|source| LinterError::InvalidPattern {
            pattern: self.ignore.join(", "),
            source,
        })
    }
}

pub(crate) fn compile_glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| LinterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}
