use crate::error::{Result, VectorStoreError};
use crate::types::IndexEntry;
use drift_code_chunker::{Chunk, ChunkKind, ChunkOrigin, ChunkType};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const INDEX_SCHEMA_VERSION: u32 = 1;

/// On-disk form of the whole store.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedIndex {
    pub schema_version: u32,
    pub dimension: usize,
    #[serde(default)]
    pub model_id: Option<String>,
    /// Insertion order
    pub records: Vec<PersistedRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PersistedRecord {
    id: String,
    vector: Vec<f32>,
    text: String,
    file_path: String,
    start_line: usize,
    end_line: usize,
    kind: ChunkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    symbol_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    heading_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chunk_type: Option<ChunkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_scope: Option<String>,
    last_modified: u64,
}

impl From<&IndexEntry> for PersistedRecord {
    fn from(entry: &IndexEntry) -> Self {
        let chunk = &entry.chunk;
        let (language, heading_level, chunk_type, parent_scope) = match &chunk.origin {
            ChunkOrigin::Code {
                language,
                chunk_type,
                parent_scope,
                ..
            } => (language.clone(), None, *chunk_type, parent_scope.clone()),
            ChunkOrigin::Doc { heading_level, .. } => (None, *heading_level, None, None),
        };

        Self {
            id: chunk.id.clone(),
            vector: entry.vector.clone(),
            text: chunk.text.clone(),
            file_path: chunk.file_path.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            kind: chunk.kind(),
            language,
            symbol_name: chunk.symbol_name().map(ToString::to_string),
            heading_level,
            chunk_type,
            parent_scope,
            last_modified: chunk.last_modified,
        }
    }
}

impl From<PersistedRecord> for IndexEntry {
    fn from(record: PersistedRecord) -> Self {
        let origin = match record.kind {
            ChunkKind::Code => ChunkOrigin::Code {
                language: record.language,
                symbol_name: record.symbol_name,
                chunk_type: record.chunk_type,
                parent_scope: record.parent_scope,
            },
            ChunkKind::Doc => ChunkOrigin::Doc {
                symbol_name: record.symbol_name,
                heading_level: record.heading_level,
            },
        };

        Self {
            chunk: Chunk {
                id: record.id,
                file_path: record.file_path,
                start_line: record.start_line,
                end_line: record.end_line,
                text: record.text,
                last_modified: record.last_modified,
                origin,
            },
            vector: record.vector,
        }
    }
}

/// `Ok(None)` when nothing has been persisted yet.
pub(crate) async fn load(path: &Path) -> Result<Option<PersistedIndex>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let persisted: PersistedIndex = serde_json::from_slice(&bytes)?;
    if persisted.schema_version != INDEX_SCHEMA_VERSION {
        return Err(VectorStoreError::UnsupportedSchema {
            found: persisted.schema_version,
            expected: INDEX_SCHEMA_VERSION,
        });
    }
    Ok(Some(persisted))
}

/// Write via a sibling temp file so readers never see a torn snapshot.
pub(crate) async fn save(path: &Path, bytes: Vec<u8>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(origin: ChunkOrigin) -> IndexEntry {
        IndexEntry::new(
            Chunk {
                id: "src/lib.rs:1:3#run".to_string(),
                file_path: "src/lib.rs".to_string(),
                start_line: 1,
                end_line: 3,
                text: "fn run() {\n    go();\n}".to_string(),
                last_modified: 1_700_000_000_000,
                origin,
            },
            vec![0.5, -0.5],
        )
    }

    #[test]
    fn record_keeps_code_metadata() {
        let original = entry(ChunkOrigin::Code {
            language: Some("rust".to_string()),
            symbol_name: Some("run".to_string()),
            chunk_type: Some(ChunkType::Function),
            parent_scope: Some("Runner".to_string()),
        });
        let restored = IndexEntry::from(PersistedRecord::from(&original));
        assert_eq!(restored, original);
    }

    #[test]
    fn doc_record_json_shape() {
        let original = entry(ChunkOrigin::Doc {
            symbol_name: Some("Usage".to_string()),
            heading_level: Some(2),
        });
        let json = serde_json::to_value(PersistedRecord::from(&original)).unwrap();
        assert_eq!(json["kind"], "doc");
        assert_eq!(json["heading_level"], 2);
        assert!(json.get("language").is_none());
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(load(&tmp.path().join("index.json")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_unknown_schema() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        tokio::fs::write(&path, r#"{"schema_version": 99, "dimension": 2, "records": []}"#)
            .await
            .unwrap();
        assert!(matches!(
            load(&path).await,
            Err(VectorStoreError::UnsupportedSchema { found: 99, .. })
        ));
    }
}
