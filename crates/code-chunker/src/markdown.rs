use crate::error::Result;
use crate::strategy::{ChunkStrategy, SourceText, Span};
use crate::types::ChunkOrigin;
use regex::Regex;

const HEADING_PATTERN: &str = r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t]*$";
const FENCE_PATTERN: &str = r"^ {0,3}(`{3,}|~{3,})";

/// Section splitting for markdown: every ATX heading opens a chunk.
pub(crate) struct MarkdownStrategy {
    heading: Regex,
    fence: Regex,
}

struct Heading {
    line: usize,
    level: u8,
    title: String,
}

impl MarkdownStrategy {
    pub fn new() -> Result<Self> {
        Ok(Self {
            heading: Regex::new(HEADING_PATTERN)?,
            fence: Regex::new(FENCE_PATTERN)?,
        })
    }

    fn headings(&self, lines: &[&str]) -> Vec<Heading> {
        let mut headings = Vec::new();
        // (fence char, fence length) of the currently open code block
        let mut open_fence: Option<(char, usize)> = None;

        for (idx, line) in lines.iter().enumerate() {
            if let Some(found) = self.fence.captures(line).and_then(|caps| caps.get(1)) {
                let marker = found.as_str();
                let ch = marker.chars().next().unwrap_or('`');
                match open_fence {
                    None => open_fence = Some((ch, marker.len())),
                    Some((open_ch, open_len)) => {
                        let closes = ch == open_ch
                            && marker.len() >= open_len
                            && line[found.end()..].trim().is_empty();
                        if closes {
                            open_fence = None;
                        }
                    }
                }
                continue;
            }

            if open_fence.is_some() {
                continue;
            }

            if let Some(caps) = self.heading.captures(line) {
                let level = caps.get(1).map_or(1, |m| m.as_str().len());
                let title = caps
                    .get(2)
                    .map(|m| m.as_str().trim_end_matches('#').trim().to_string())
                    .unwrap_or_default();
                headings.push(Heading {
                    line: idx + 1,
                    level: u8::try_from(level).unwrap_or(6),
                    title,
                });
            }
        }

        headings
    }
}

impl ChunkStrategy for MarkdownStrategy {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn split(&self, source: &SourceText<'_>) -> Result<Vec<Span>> {
        let total = source.lines.len();
        let headings = self.headings(&source.lines);
        let mut spans = Vec::with_capacity(headings.len() + 1);

        let first_heading = headings.first().map_or(total + 1, |h| h.line);
        let preamble_end = first_heading - 1;
        let has_preamble = source.lines[..preamble_end]
            .iter()
            .any(|line| !line.trim().is_empty());
        if has_preamble {
            spans.push(Span {
                start_line: 1,
                end_line: preamble_end,
                origin: ChunkOrigin::doc(),
            });
        }

        for (idx, heading) in headings.iter().enumerate() {
            let end_line = headings.get(idx + 1).map_or(total, |next| next.line - 1);
            let title = (!heading.title.is_empty()).then(|| heading.title.clone());
            spans.push(Span {
                start_line: heading.line,
                end_line,
                origin: ChunkOrigin::Doc {
                    symbol_name: title,
                    heading_level: Some(heading.level),
                },
            });
        }

        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkKind;
    use pretty_assertions::assert_eq;

    fn split(content: &str) -> Vec<Span> {
        let source = SourceText::new("README.md", content, ChunkKind::Doc);
        MarkdownStrategy::new().unwrap().split(&source).unwrap()
    }

    fn ranges(spans: &[Span]) -> Vec<(usize, usize)> {
        spans.iter().map(|s| (s.start_line, s.end_line)).collect()
    }

    #[test]
    fn heading_opens_each_section() {
        let spans = split("# A\nintro\n## B\nmore\n");
        assert_eq!(ranges(&spans), vec![(1, 2), (3, 4)]);
        assert_eq!(spans[0].origin.symbol_name(), Some("A"));
        assert_eq!(
            spans[1].origin,
            ChunkOrigin::Doc {
                symbol_name: Some("B".to_string()),
                heading_level: Some(2),
            }
        );
    }

    #[test]
    fn preamble_before_first_heading_is_kept() {
        let spans = split("Some badge line\n\n# Title\nbody");
        assert_eq!(ranges(&spans), vec![(1, 2), (3, 4)]);
        assert_eq!(spans[0].origin.symbol_name(), None);
    }

    #[test]
    fn blank_preamble_is_not_a_chunk() {
        let spans = split("\n\n# Title\nbody");
        assert_eq!(ranges(&spans), vec![(3, 4)]);
    }

    #[test]
    fn hashes_inside_fences_are_not_headings() {
        let spans = split("# Setup\n```bash\n# install deps\nmake\n```\n## Usage\nrun it");
        assert_eq!(ranges(&spans), vec![(1, 5), (6, 7)]);
    }

    #[test]
    fn requires_space_after_hashes() {
        let spans = split("#hashtag\n####### seven\n### Real ###");
        assert_eq!(ranges(&spans), vec![(1, 2), (3, 3)]);
        assert_eq!(spans[1].origin.symbol_name(), Some("Real"));
    }

    #[test]
    fn document_without_headings_is_one_chunk() {
        let spans = split("just prose\nover two lines");
        assert_eq!(ranges(&spans), vec![(1, 2)]);
    }
}
