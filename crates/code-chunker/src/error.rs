use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors raised while building a chunker or running one strategy.
///
/// [`crate::Chunker::chunk`] never returns these: a failed syntax pass falls
/// back to line windows. They surface from configuration and from the
/// strategies when driven directly.
#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("{language} source could not be parsed")]
    Parse { language: &'static str },

    #[error("no grammar bundled for {0}")]
    UnsupportedLanguage(String),

    #[error("invalid chunker configuration: {0}")]
    InvalidConfig(String),

    #[error("grammar rejected by the parser")]
    Grammar(#[from] tree_sitter::LanguageError),

    #[error("markdown pattern failed to compile")]
    Pattern(#[from] regex::Error),
}

impl ChunkerError {
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
