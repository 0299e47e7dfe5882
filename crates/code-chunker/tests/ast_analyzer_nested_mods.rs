use drift_code_chunker::{
    slice_lines, Chunk, ChunkKind, ChunkType, Chunker, ChunkerConfig, SourceFile,
};

fn chunk(path: &str, code: &str) -> Vec<Chunk> {
    let chunker = Chunker::new(ChunkerConfig::default()).expect("default config is valid");
    chunker.chunk(&SourceFile::new(path, code))
}

#[test]
fn extracts_methods_inside_module_impl() {
    let code = r"
mod api {
    pub struct Car {
        wheels: u8,
    }

    impl Car {
        pub fn drive(&self) -> u8 { self.wheels }
        fn stop(&self) -> bool { true }
    }
}
";

    let chunks = chunk("nested.rs", code);
    let methods: Vec<_> = chunks
        .iter()
        .filter(|c| c.chunk_type() == Some(ChunkType::Method))
        .filter_map(Chunk::symbol_name)
        .collect();

    assert!(
        methods.contains(&"drive") && methods.contains(&"stop"),
        "expected method chunks inside module impl, got: {methods:?}"
    );
}

#[test]
fn real_embeddings_rs_has_method_chunks() {
    let code = include_str!("../../vector-store/src/embeddings.rs");

    let chunks = chunk("crates/vector-store/src/embeddings.rs", code);
    let has_embed = chunks.iter().any(|c| {
        c.chunk_type() == Some(ChunkType::Method) && c.symbol_name() == Some("embed_batch")
    });
    assert!(
        has_embed,
        "embed_batch should be extracted as a method chunk from impl"
    );
}

#[test]
fn every_chunk_round_trips_to_its_lines() {
    let sources = [
        (
            "crates/vector-store/src/embeddings.rs",
            include_str!("../../vector-store/src/embeddings.rs"),
        ),
        ("crates/code-chunker/src/chunker.rs", include_str!("../src/chunker.rs")),
        ("README.md", "# Drift\n\nIntro.\n\n```sh\n# not a heading\n```\n\n## Usage\nRun it.\n"),
    ];

    for (path, content) in sources {
        for chunk in chunk(path, content) {
            assert_eq!(
                Some(chunk.text.as_str()),
                slice_lines(content, chunk.start_line, chunk.end_line).as_deref(),
                "text mismatch for {}",
                chunk.id
            );
        }
    }
}

#[test]
fn markdown_sections_start_at_headings() {
    let doc = "# A\nalpha body\n## B\nbeta body\n";
    let chunks = chunk("docs/a.md", doc);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].start_line, 1);
    assert_eq!(chunks[1].start_line, 3);
    assert!(chunks.iter().all(|c| c.kind() == ChunkKind::Doc));
}

#[test]
fn ids_are_unique_and_stable() {
    let code = include_str!("../src/chunker.rs");
    let first = chunk("crates/code-chunker/src/chunker.rs", code);
    let second = chunk("crates/code-chunker/src/chunker.rs", code);

    let mut ids: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, second.iter().map(|c| c.id.clone()).collect::<Vec<_>>());

    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total, "chunk ids must be unique within a file");
}
