use crate::ast_analyzer::AstStrategy;
use crate::config::ChunkerConfig;
use crate::error::Result;
use crate::language::Language;
use crate::markdown::MarkdownStrategy;
use crate::strategy::{ChunkStrategy, LineWindowStrategy, SourceText, Span};
use crate::types::{Chunk, ChunkKind};
use std::collections::HashMap;

/// One file handed to the chunker.
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    /// Workspace-relative path with forward slashes
    pub path: &'a str,
    pub content: &'a str,
    pub kind: ChunkKind,
    /// Milliseconds since the Unix epoch
    pub last_modified: u64,
}

impl<'a> SourceFile<'a> {
    /// Kind is inferred from the path's extension.
    pub fn new(path: &'a str, content: &'a str) -> Self {
        Self {
            path,
            content,
            kind: ChunkKind::from_path(path),
            last_modified: 0,
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: ChunkKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn with_last_modified(mut self, last_modified: u64) -> Self {
        self.last_modified = last_modified;
        self
    }
}

/// Main chunker interface for processing code and documentation
pub struct Chunker {
    config: ChunkerConfig,
    syntax: AstStrategy,
    markdown: MarkdownStrategy,
    windows: LineWindowStrategy,
}

impl Chunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            syntax: AstStrategy::new(config.include_doc_comments, config.merge_imports),
            markdown: MarkdownStrategy::new()?,
            windows: LineWindowStrategy::new(config.chunk_size, config.chunk_overlap),
            config,
        })
    }

    /// Split a file into chunks.
    ///
    /// Never fails: when the preferred strategy errors or finds nothing the
    /// file is cut into line windows instead. Whitespace-only content yields
    /// no chunks.
    pub fn chunk(&self, file: &SourceFile<'_>) -> Vec<Chunk> {
        if file.content.trim().is_empty() {
            return Vec::new();
        }

        let source = SourceText::new(file.path, file.content, file.kind);
        let spans = self.spans(&source);
        assign_ids(file, &source, spans)
    }

    fn primary_strategy(&self, source: &SourceText<'_>) -> Option<&dyn ChunkStrategy> {
        match source.kind {
            ChunkKind::Doc if source.language == Language::Markdown => Some(&self.markdown),
            ChunkKind::Code if self.config.use_syntax && source.language.supports_ast() => {
                Some(&self.syntax)
            }
            _ => None,
        }
    }

    fn spans(&self, source: &SourceText<'_>) -> Vec<Span> {
        let Some(strategy) = self.primary_strategy(source) else {
            return self.windows.windows(source);
        };

        match strategy.split(source) {
            Ok(spans) if !spans.is_empty() => {
                if strategy.filters_noise() {
                    self.drop_noise(source, spans)
                } else {
                    spans
                }
            }
            Ok(_) => {
                log::debug!(
                    "{} strategy found no sections in {}, using line windows",
                    strategy.name(),
                    source.path
                );
                self.windows.windows(source)
            }
            Err(e) => {
                log::warn!(
                    "{} chunking failed for {}, falling back to line windows: {e}",
                    strategy.name(),
                    source.path
                );
                self.windows.windows(source)
            }
        }
    }

    fn drop_noise(&self, source: &SourceText<'_>, mut spans: Vec<Span>) -> Vec<Span> {
        let min = self.config.min_chunk_chars;
        if min > 0 {
            spans.retain(|span| {
                source
                    .slice(span.start_line, span.end_line)
                    .trim()
                    .chars()
                    .count()
                    >= min
            });
        }
        spans
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Get statistics about chunking
    #[must_use]
    pub fn stats(chunks: &[Chunk]) -> ChunkingStats {
        let lines = chunks.iter().map(Chunk::line_count);
        let total_lines: usize = lines.clone().sum();

        ChunkingStats {
            total_chunks: chunks.len(),
            code_chunks: chunks.iter().filter(|c| c.kind() == ChunkKind::Code).count(),
            doc_chunks: chunks.iter().filter(|c| c.kind() == ChunkKind::Doc).count(),
            total_lines,
            avg_lines_per_chunk: total_lines.checked_div(chunks.len()).unwrap_or(0),
            min_lines: lines.clone().min().unwrap_or(0),
            max_lines: lines.max().unwrap_or(0),
        }
    }
}

/// Builds chunks from spans, giving each a stable id unique within the file.
fn assign_ids(file: &SourceFile<'_>, source: &SourceText<'_>, spans: Vec<Span>) -> Vec<Chunk> {
    let total = source.lines.len();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut chunks = Vec::with_capacity(spans.len());

    for span in spans {
        if span.start_line == 0 || span.start_line > span.end_line || span.end_line > total {
            log::debug!(
                "dropping out-of-range span {}-{} in {}",
                span.start_line,
                span.end_line,
                file.path
            );
            continue;
        }

        let mut id = format!("{}:{}:{}", file.path, span.start_line, span.end_line);
        if let Some(symbol) = span.origin.symbol_name() {
            id.push('#');
            id.push_str(symbol);
        }

        let count = seen.entry(id.clone()).or_insert(0);
        if *count > 0 {
            id = format!("{id}~{count}");
        }
        *count += 1;

        chunks.push(Chunk {
            id,
            file_path: file.path.to_string(),
            start_line: span.start_line,
            end_line: span.end_line,
            text: source.slice(span.start_line, span.end_line),
            last_modified: file.last_modified,
            origin: span.origin,
        });
    }

    chunks
}

/// Lines `start..=end` (1-indexed) of `content`, joined with `\n`.
///
/// Returns `None` when the range falls outside the content.
#[must_use]
pub fn slice_lines(content: &str, start: usize, end: usize) -> Option<String> {
    if start == 0 || start > end {
        return None;
    }
    let lines: Vec<&str> = content.lines().collect();
    lines.get(start - 1..end).map(|range| range.join("\n"))
}

/// Statistics about chunking results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub code_chunks: usize,
    pub doc_chunks: usize,
    pub total_lines: usize,
    pub avg_lines_per_chunk: usize,
    pub min_lines: usize,
    pub max_lines: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} (code {}, doc {}) | Lines: {} | Avg: {} | Range: {}-{}",
            self.total_chunks,
            self.code_chunks,
            self.doc_chunks,
            self.total_lines,
            self.avg_lines_per_chunk,
            self.min_lines,
            self.max_lines
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkOrigin, ChunkType};
    use pretty_assertions::assert_eq;

    const RUST_CODE: &str = r#"use std::collections::HashMap;

/// Main function
fn main() {
    println!("Hello, world!");
}

struct Point {
    x: i32,
    y: i32,
}

impl Point {
    fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
"#;

    fn chunker() -> Chunker {
        Chunker::new(ChunkerConfig::default()).unwrap()
    }

    #[test]
    fn test_chunk_rust_by_declaration() {
        let chunks = chunker().chunk(&SourceFile::new("src/main.rs", RUST_CODE));
        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "src/main.rs:1:1",
                "src/main.rs:3:6#main",
                "src/main.rs:8:11#Point",
                "src/main.rs:14:16#new",
            ]
        );
        assert_eq!(chunks[3].chunk_type(), Some(ChunkType::Method));
        assert_eq!(chunks[1].language(), Some("rust"));
    }

    #[test]
    fn test_chunk_empty_content() {
        let chunker = chunker();
        assert!(chunker.chunk(&SourceFile::new("test.rs", "")).is_empty());
        assert!(chunker.chunk(&SourceFile::new("README.md", "  \n\t\n")).is_empty());
    }

    #[test]
    fn markdown_headings_become_chunks() {
        let content = "# A\nintro text\n\n## B\ndetails";
        let chunks = chunker().chunk(&SourceFile::new("docs/guide.md", content));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[1].start_line, 4);
        assert_eq!(chunks[1].id, "docs/guide.md:4:5#B");
        assert!(chunks.iter().all(|c| c.kind() == ChunkKind::Doc));
    }

    #[test]
    fn plain_text_docs_use_line_windows() {
        let content = (1..=60).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let chunks = chunker().chunk(&SourceFile::new("NOTES.txt", &content));

        let ranges: Vec<_> = chunks.iter().map(|c| (c.start_line, c.end_line)).collect();
        assert_eq!(ranges, vec![(1, 50), (41, 60)]);
        assert_eq!(chunks[0].origin, ChunkOrigin::doc());
    }

    #[test]
    fn unsupported_language_falls_back_to_windows() {
        let content = "package main\n\nfunc main() {\n}\n";
        let chunks = chunker().chunk(&SourceFile::new("main.go", content));
        assert_eq!(chunks.len(), 1);
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 4));
        assert_eq!(chunks[0].language(), Some("go"));
    }

    #[test]
    fn file_without_declarations_falls_back_to_windows() {
        let content = "// just a comment\n// and another one\n";
        let chunks = chunker().chunk(&SourceFile::new("empty.rs", content));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].symbol_name(), None);
    }

    #[test]
    fn syntax_disabled_uses_windows() {
        let chunker = Chunker::new(ChunkerConfig::for_speed()).unwrap();
        let chunks = chunker.chunk(&SourceFile::new("src/main.rs", RUST_CODE));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_line, 17);
    }

    #[test]
    fn tiny_declarations_are_dropped() {
        let content = "fn a(){}\n\nfn long_enough() -> u32 {\n    42\n}\n";
        let chunks = chunker().chunk(&SourceFile::new("lib.rs", content));
        let names: Vec<_> = chunks.iter().filter_map(Chunk::symbol_name).collect();
        assert_eq!(names, vec!["long_enough"]);
    }

    #[test]
    fn text_matches_line_range() {
        let content = "# Title\r\nfirst\r\n\r\n## Next\r\nsecond\r\n";
        let chunks = chunker().chunk(&SourceFile::new("a.md", content));
        for chunk in &chunks {
            assert_eq!(
                Some(chunk.text.clone()),
                slice_lines(content, chunk.start_line, chunk.end_line)
            );
        }
        assert_eq!(chunks[0].text, "# Title\nfirst\n");
    }

    #[test]
    fn colliding_ids_get_ordinal_suffix() {
        let file = SourceFile::new("a.md", "same\nsame");
        let source = SourceText::new(file.path, file.content, file.kind);
        let span = Span {
            start_line: 1,
            end_line: 2,
            origin: ChunkOrigin::doc(),
        };
        let chunks = assign_ids(&file, &source, vec![span.clone(), span.clone(), span]);
        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a.md:1:2", "a.md:1:2~1", "a.md:1:2~2"]);
    }

    #[test]
    fn chunking_is_deterministic() {
        let chunker = chunker();
        let file = SourceFile::new("src/main.rs", RUST_CODE).with_last_modified(42);
        let first = chunker.chunk(&file);
        assert_eq!(first, chunker.chunk(&file));
        assert!(first.iter().all(|c| c.last_modified == 42));
    }

    #[test]
    fn slice_lines_rejects_out_of_range() {
        assert_eq!(slice_lines("a\nb", 1, 2).as_deref(), Some("a\nb"));
        assert_eq!(slice_lines("a\nb", 0, 1), None);
        assert_eq!(slice_lines("a\nb", 2, 3), None);
    }

    #[test]
    fn test_chunking_stats() {
        let chunks = chunker().chunk(&SourceFile::new("src/main.rs", RUST_CODE));
        let stats = Chunker::stats(&chunks);

        assert_eq!(stats.total_chunks, chunks.len());
        assert_eq!(stats.code_chunks, 4);
        assert_eq!(stats.doc_chunks, 0);
        assert_eq!(stats.min_lines, 1);
        assert_eq!(stats.max_lines, 4);
    }
}
