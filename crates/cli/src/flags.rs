use clap::ValueEnum;
use drift_code_chunker::ChunkKind;
use drift_vector_store::EmbeddingMode;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum EmbedModeFlag {
    Hashing,
    Onnx,
}

impl EmbedModeFlag {
    pub(crate) const fn as_domain(self) -> EmbeddingMode {
        match self {
            EmbedModeFlag::Hashing => EmbeddingMode::Hashing,
            EmbedModeFlag::Onnx => EmbeddingMode::Onnx,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum KindFlag {
    Code,
    Doc,
}

impl KindFlag {
    pub(crate) const fn as_domain(self) -> ChunkKind {
        match self {
            KindFlag::Code => ChunkKind::Code,
            KindFlag::Doc => ChunkKind::Doc,
        }
    }
}
