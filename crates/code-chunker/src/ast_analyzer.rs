use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::strategy::{ChunkStrategy, SourceText, Span};
use crate::types::{ChunkOrigin, ChunkType};
use tree_sitter::{Node, Parser};

/// Declaration-aligned splitting backed by tree-sitter.
pub(crate) struct AstStrategy {
    include_doc_comments: bool,
    merge_imports: bool,
}

impl AstStrategy {
    pub const fn new(include_doc_comments: bool, merge_imports: bool) -> Self {
        Self {
            include_doc_comments,
            merge_imports,
        }
    }
}

impl ChunkStrategy for AstStrategy {
    fn name(&self) -> &'static str {
        "syntax"
    }

    fn split(&self, source: &SourceText<'_>) -> Result<Vec<Span>> {
        let mut analyzer = AstAnalyzer::new(source.language)?;
        let mut spans = analyzer.declarations(source)?;

        if self.include_doc_comments {
            attach_doc_comments(&mut spans, source);
        }
        if self.merge_imports {
            spans = merge_adjacent_imports(spans);
        }
        Ok(spans)
    }

    fn filters_noise(&self) -> bool {
        true
    }
}

/// Walks one parse tree and records a span per top-level declaration
struct AstAnalyzer {
    parser: Parser,
    language: Language,
}

impl AstAnalyzer {
    fn new(language: Language) -> Result<Self> {
        if !language.supports_ast() {
            return Err(ChunkerError::unsupported_language(language.as_str()));
        }

        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser.set_language(&ts_language)?;

        Ok(Self { parser, language })
    }

    fn declarations(&mut self, source: &SourceText<'_>) -> Result<Vec<Span>> {
        let tree = self
            .parser
            .parse(source.content, None)
            .ok_or(ChunkerError::Parse {
                language: self.language.as_str(),
            })?;

        let mut spans = Vec::new();
        let root = tree.root_node();
        match self.language {
            Language::Rust => self.rust_items(source, root, None, &mut spans),
            Language::Python => self.python_items(source, root, &mut spans),
            Language::JavaScript | Language::TypeScript => self.js_items(source, root, &mut spans),
            _ => return Err(ChunkerError::unsupported_language(self.language.as_str())),
        }

        spans.sort_by(|a, b| {
            a.start_line
                .cmp(&b.start_line)
                .then_with(|| a.end_line.cmp(&b.end_line))
        });
        Ok(spans)
    }

    fn rust_items(
        &self,
        source: &SourceText<'_>,
        node: Node,
        scope: Option<&str>,
        spans: &mut Vec<Span>,
    ) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let chunk_type = match child.kind() {
                "function_item" | "function_signature_item" | "macro_definition" => {
                    ChunkType::Function
                }
                "struct_item" | "union_item" => ChunkType::Struct,
                "enum_item" => ChunkType::Enum,
                "trait_item" => ChunkType::Interface,
                "type_item" => ChunkType::Type,
                "const_item" => ChunkType::Const,
                "static_item" => ChunkType::Variable,
                "use_declaration" | "extern_crate_declaration" => ChunkType::Import,
                "impl_item" => {
                    self.rust_impl(source, child, spans);
                    continue;
                }
                "mod_item" => {
                    let body = child.child_by_field_name("body");
                    if let Some(body) = body {
                        let name = symbol_name(source.content, child);
                        self.rust_items(source, body, name.as_deref(), spans);
                    } else {
                        spans.push(self.span(source, child, ChunkType::Module, scope));
                    }
                    continue;
                }
                _ => continue,
            };
            spans.push(self.span(source, child, chunk_type, scope));
        }
    }

    /// Impl blocks contribute their members, scoped to the impl target
    fn rust_impl(&self, source: &SourceText<'_>, impl_node: Node, spans: &mut Vec<Span>) {
        let target = impl_target(source.content, impl_node);
        let before = spans.len();

        if let Some(body) = impl_node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.children(&mut cursor) {
                let chunk_type = match member.kind() {
                    "function_item" => ChunkType::Method,
                    "const_item" => ChunkType::Const,
                    "type_item" => ChunkType::Type,
                    _ => continue,
                };
                spans.push(self.span(source, member, chunk_type, target.as_deref()));
            }
        }

        // Marker impls (`impl Send for X {}`) still deserve a chunk
        if spans.len() == before {
            let mut span = self.span(source, impl_node, ChunkType::Impl, None);
            if let ChunkOrigin::Code { symbol_name, .. } = &mut span.origin {
                symbol_name.clone_from(&target);
            }
            spans.push(span);
        }
    }

    fn python_items(&self, source: &SourceText<'_>, node: Node, spans: &mut Vec<Span>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            let chunk_type = match child.kind() {
                "function_definition" => ChunkType::Function,
                "class_definition" => ChunkType::Class,
                "decorated_definition" => {
                    let inner = child.child_by_field_name("definition");
                    let chunk_type = match inner.map(|n| n.kind()) {
                        Some("class_definition") => ChunkType::Class,
                        _ => ChunkType::Function,
                    };
                    let mut span = self.span(source, child, chunk_type, None);
                    if let (Some(inner), ChunkOrigin::Code { symbol_name, .. }) =
                        (inner, &mut span.origin)
                    {
                        *symbol_name = self::symbol_name(source.content, inner);
                    }
                    spans.push(span);
                    continue;
                }
                "import_statement" | "import_from_statement" | "future_import_statement" => {
                    ChunkType::Import
                }
                "expression_statement" => {
                    let Some(assignment) = child
                        .named_child(0)
                        .filter(|n| n.kind() == "assignment")
                    else {
                        continue;
                    };
                    let mut span = self.span(source, child, ChunkType::Variable, None);
                    if let ChunkOrigin::Code { symbol_name, .. } = &mut span.origin {
                        *symbol_name = assignment
                            .child_by_field_name("left")
                            .map(|left| node_text(source.content, left).to_string());
                    }
                    spans.push(span);
                    continue;
                }
                _ => continue,
            };
            spans.push(self.span(source, child, chunk_type, None));
        }
    }

    fn js_items(&self, source: &SourceText<'_>, node: Node, spans: &mut Vec<Span>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            // `export ...` wraps the declaration; keep the keyword inside the span
            let (outer, decl) = if child.kind() == "export_statement" {
                let Some(decl) = child
                    .child_by_field_name("declaration")
                    .or_else(|| child.child_by_field_name("value"))
                else {
                    continue;
                };
                (child, decl)
            } else {
                (child, child)
            };

            let Some(chunk_type) = js_chunk_type(decl) else {
                continue;
            };

            let mut span = self.span(source, outer, chunk_type, None);
            if let ChunkOrigin::Code { symbol_name, .. } = &mut span.origin {
                *symbol_name = js_symbol_name(source.content, decl);
            }
            spans.push(span);
        }
    }

    fn span(
        &self,
        source: &SourceText<'_>,
        node: Node,
        chunk_type: ChunkType,
        parent_scope: Option<&str>,
    ) -> Span {
        let (start_line, end_line) = node_lines(node);
        let symbol_name = if chunk_type == ChunkType::Import {
            None
        } else {
            symbol_name(source.content, node)
        };

        Span {
            start_line,
            end_line: end_line.min(source.lines.len()).max(start_line),
            origin: ChunkOrigin::Code {
                language: Some(self.language.as_str().to_string()),
                symbol_name,
                chunk_type: Some(chunk_type),
                parent_scope: parent_scope.map(ToString::to_string),
            },
        }
    }
}

fn js_chunk_type(node: Node) -> Option<ChunkType> {
    let chunk_type = match node.kind() {
        "function_declaration" | "generator_function_declaration" => ChunkType::Function,
        "class_declaration" | "abstract_class_declaration" | "class" => ChunkType::Class,
        "interface_declaration" => ChunkType::Interface,
        "type_alias_declaration" => ChunkType::Type,
        "enum_declaration" => ChunkType::Enum,
        "module" | "internal_module" => ChunkType::Module,
        "import_statement" => ChunkType::Import,
        "lexical_declaration" | "variable_declaration" => {
            let declarator = node.named_child(0)?;
            let is_function = declarator
                .child_by_field_name("value")
                .is_some_and(|v| {
                    matches!(
                        v.kind(),
                        "arrow_function" | "function_expression" | "function"
                    )
                });
            if is_function {
                ChunkType::Function
            } else {
                ChunkType::Variable
            }
        }
        _ => return None,
    };
    Some(chunk_type)
}

fn js_symbol_name(content: &str, node: Node) -> Option<String> {
    match node.kind() {
        "import_statement" => None,
        "lexical_declaration" | "variable_declaration" => node
            .named_child(0)
            .and_then(|declarator| declarator.child_by_field_name("name"))
            .map(|name| node_text(content, name).to_string()),
        _ => symbol_name(content, node),
    }
}

/// 1-indexed inclusive lines; a node ending at column 0 stops on the previous line
fn node_lines(node: Node) -> (usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    let end_row = if end.column == 0 && end.row > start.row {
        end.row - 1
    } else {
        end.row
    };
    (start.row + 1, end_row + 1)
}

fn node_text<'a>(content: &'a str, node: Node) -> &'a str {
    &content[node.start_byte()..node.end_byte()]
}

/// Extract symbol name from AST node
fn symbol_name(content: &str, node: Node) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(node_text(content, name).to_string());
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let is_name_node = matches!(
            child.kind(),
            "identifier" | "name" | "type_identifier" | "field_identifier"
        );
        if is_name_node {
            return Some(node_text(content, child).to_string());
        }
    }
    None
}

/// Extract the target of an impl block (struct/trait name)
fn impl_target(content: &str, impl_node: Node) -> Option<String> {
    let ty = impl_node.child_by_field_name("type")?;
    match ty.kind() {
        "type_identifier" => Some(node_text(content, ty).to_string()),
        // `impl<T> Foo<T>` or `impl a::Foo`: keep the base identifier
        "generic_type" | "scoped_type_identifier" => {
            let mut cursor = ty.walk();
            let found = ty
                .children(&mut cursor)
                .filter(|child| child.kind() == "type_identifier")
                .last()
                .map(|child| node_text(content, child).to_string());
            found.or_else(|| Some(node_text(content, ty).to_string()))
        }
        _ => Some(node_text(content, ty).to_string()),
    }
}

/// Pull each span's start upward over comment lines glued to it.
fn attach_doc_comments(spans: &mut [Span], source: &SourceText<'_>) {
    let prefixes = source.language.doc_comment_prefixes();
    if prefixes.is_empty() {
        return;
    }

    let mut floor = 0; // last line already owned by an earlier span
    for span in spans.iter_mut() {
        let mut start = span.start_line;
        while start > 1 && start - 1 > floor {
            let above = source.lines[start - 2].trim_start();
            if above.is_empty() || !prefixes.iter().any(|p| above.starts_with(p)) {
                break;
            }
            start -= 1;
        }
        span.start_line = start;
        floor = floor.max(span.end_line);
    }
}

/// Runs of import spans on consecutive lines become one chunk.
fn merge_adjacent_imports(spans: Vec<Span>) -> Vec<Span> {
    let mut out: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(prev) = out.last_mut() {
            if is_import(prev) && is_import(&span) && span.start_line <= prev.end_line + 1 {
                prev.end_line = prev.end_line.max(span.end_line);
                continue;
            }
        }
        out.push(span);
    }
    out
}

fn is_import(span: &Span) -> bool {
    matches!(
        span.origin,
        ChunkOrigin::Code {
            chunk_type: Some(ChunkType::Import),
            ..
        }
    )
}
