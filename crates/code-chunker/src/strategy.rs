use crate::error::Result;
use crate::language::Language;
use crate::types::{ChunkKind, ChunkOrigin};

/// Borrowed view of one file prepared for splitting.
pub(crate) struct SourceText<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub lines: Vec<&'a str>,
    pub language: Language,
    pub kind: ChunkKind,
}

impl<'a> SourceText<'a> {
    pub fn new(path: &'a str, content: &'a str, kind: ChunkKind) -> Self {
        Self {
            path,
            content,
            lines: content.lines().collect(),
            language: Language::from_path(path),
            kind,
        }
    }

    /// Text of lines `start..=end` (1-indexed)
    pub fn slice(&self, start: usize, end: usize) -> String {
        self.lines[start - 1..end].join("\n")
    }

    pub fn origin_without_symbol(&self) -> ChunkOrigin {
        match self.kind {
            ChunkKind::Code => ChunkOrigin::code(self.language.as_str()),
            ChunkKind::Doc => ChunkOrigin::doc(),
        }
    }
}

/// Line range (1-indexed, inclusive) plus what the strategy learned about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Span {
    pub start_line: usize,
    pub end_line: usize,
    pub origin: ChunkOrigin,
}

/// One way of cutting a file into spans.
///
/// The chunker tries a primary strategy and falls back to line windows when
/// it errors or finds nothing.
pub(crate) trait ChunkStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn split(&self, source: &SourceText<'_>) -> Result<Vec<Span>>;

    /// Whether spans from this strategy go through the minimum-length filter
    fn filters_noise(&self) -> bool {
        false
    }
}

/// Fixed-size line windows with overlap. Works on anything.
pub(crate) struct LineWindowStrategy {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl LineWindowStrategy {
    pub const fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn windows(&self, source: &SourceText<'_>) -> Vec<Span> {
        let total = source.lines.len();
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut spans = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + self.chunk_size).min(total);
            spans.push(Span {
                start_line: start + 1,
                end_line: end,
                origin: source.origin_without_symbol(),
            });
            if end == total {
                break;
            }
            start += step;
        }

        spans
    }
}

impl ChunkStrategy for LineWindowStrategy {
    fn name(&self) -> &'static str {
        "line-window"
    }

    fn split(&self, source: &SourceText<'_>) -> Result<Vec<Span>> {
        Ok(self.windows(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_content(lines: usize) -> String {
        (0..lines)
            .map(|i| format!("fn test_function_{i}() {{ }}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn windows_overlap_and_end_at_eof() {
        let content = create_test_content(25);
        let source = SourceText::new("test.go", &content, ChunkKind::Code);
        let spans = LineWindowStrategy::new(10, 3).windows(&source);

        let ranges: Vec<_> = spans.iter().map(|s| (s.start_line, s.end_line)).collect();
        assert_eq!(ranges, vec![(1, 10), (8, 17), (15, 24), (22, 25)]);
    }

    #[test]
    fn short_file_is_a_single_window() {
        let content = create_test_content(4);
        let source = SourceText::new("test.go", &content, ChunkKind::Code);
        let spans = LineWindowStrategy::new(50, 10).windows(&source);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start_line, spans[0].end_line), (1, 4));
    }

    #[test]
    fn window_origin_matches_kind() {
        let source = SourceText::new("notes.txt", "alpha\nbeta", ChunkKind::Doc);
        let spans = LineWindowStrategy::new(50, 10).windows(&source);
        assert_eq!(spans[0].origin, ChunkOrigin::doc());

        let source = SourceText::new("main.go", "package main", ChunkKind::Code);
        let spans = LineWindowStrategy::new(50, 10).windows(&source);
        assert_eq!(spans[0].origin, ChunkOrigin::code("go"));
    }
}
