use crate::progress::{create_progress_bar, report_batch};
use crate::workspace::{warn_on_model_change, Workspace};
use anyhow::Result;
use drift_code_chunker::ChunkKind;
use drift_indexer::IndexOutcome;
use drift_linter::Severity;
use drift_vector_store::SearchOptions;
use serde_json::json;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Process exit status of a command that ran to completion.
pub(crate) type ExitStatus = i32;

const EXIT_OK: ExitStatus = 0;
const EXIT_STALE: ExitStatus = 1;
const EXIT_INTERRUPTED: ExitStatus = 130;

pub(crate) struct IndexRequest {
    pub full: bool,
    pub json: bool,
    pub quiet: bool,
}

pub(crate) async fn run_index(ws: &Workspace, request: IndexRequest) -> Result<ExitStatus> {
    if request.full {
        ws.remove_index().await?;
        log::info!("Rebuilding index from scratch");
    }
    let store = ws.open_store().await?;
    let embedder = ws.embedder()?;

    let pb = create_progress_bar(request.quiet || request.json);
    let bar = pb.clone();
    let indexer = ws
        .indexer(embedder, store)?
        .with_progress(move |progress| report_batch(&bar, progress));

    let cancel = cancel_on_interrupt();
    let outcome = indexer.index_root(&cancel).await;
    pb.finish_and_clear();

    print_outcome(&outcome?, request.json)
}

pub(crate) async fn run_sync(ws: &Workspace, json: bool, quiet: bool) -> Result<ExitStatus> {
    let store = ws.open_store().await?;
    let embedder = ws.embedder()?;

    let pb = create_progress_bar(quiet || json);
    let bar = pb.clone();
    let indexer = ws
        .indexer(embedder, store)?
        .with_progress(move |progress| report_batch(&bar, progress));

    let cancel = cancel_on_interrupt();
    let outcome = indexer.sync(&cancel).await;
    pb.finish_and_clear();

    print_outcome(&outcome?, json)
}

pub(crate) async fn run_check(
    ws: &Workspace,
    path: Option<&str>,
    json: bool,
) -> Result<ExitStatus> {
    let store = ws.open_store().await?;
    if store.entries_of_kind(ChunkKind::Doc).is_empty() {
        log::warn!("No documentation indexed; run `drift index` first");
    }

    let linter = ws.linter(store)?;
    let report = match path {
        Some(filter) => linter.check_path(filter)?,
        None => linter.check_all()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    Ok(if report.overall == Severity::Critical {
        EXIT_STALE
    } else {
        EXIT_OK
    })
}

pub(crate) struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub kind: Option<ChunkKind>,
    pub min_score: Option<f32>,
    pub json: bool,
}

pub(crate) async fn run_search(ws: &Workspace, request: SearchRequest) -> Result<ExitStatus> {
    let store = ws.open_store().await?;
    let embedder = ws.embedder()?;
    warn_on_model_change(&store, &embedder);

    let vector = embedder.embed(&request.query).await?;
    let mut options = SearchOptions::top_k(request.top_k);
    if let Some(kind) = request.kind {
        options = options.with_kind(kind);
    }
    if let Some(min_score) = request.min_score {
        options = options.with_min_score(min_score);
    }
    let hits = store.search(&vector, options)?;

    if request.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(EXIT_OK);
    }

    if hits.is_empty() {
        println!("No results");
    }
    for (rank, hit) in hits.iter().enumerate() {
        let chunk = &hit.chunk;
        println!(
            "{}. {:.3} [{}] {}",
            rank + 1,
            hit.score,
            chunk.kind().as_str(),
            chunk.display_ref()
        );
        if let Some(first) = chunk.text.lines().find(|line| !line.trim().is_empty()) {
            println!("   {}", first.trim());
        }
    }
    Ok(EXIT_OK)
}

pub(crate) async fn run_stats(ws: &Workspace, json: bool) -> Result<ExitStatus> {
    let store = ws.open_store().await?;
    let files: BTreeMap<String, usize> = store
        .file_paths()
        .into_iter()
        .map(|path| {
            let count = store.count_for_path(&path);
            (path, count)
        })
        .collect();
    let code = store.entries_of_kind(ChunkKind::Code).len();
    let docs = store.entries_of_kind(ChunkKind::Doc).len();

    if json {
        let body = json!({
            "index": ws.index_path(),
            "model_id": store.model_id(),
            "dimension": store.dimension(),
            "items": store.item_count(),
            "code_chunks": code,
            "doc_chunks": docs,
            "files": files,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(EXIT_OK);
    }

    println!("Index: {}", ws.index_path().display());
    println!(
        "Model: {} (dimension {})",
        store.model_id().as_deref().unwrap_or("none"),
        store.dimension()
    );
    println!(
        "Items: {} ({code} code, {docs} doc) across {} files",
        store.item_count(),
        files.len()
    );
    for (path, count) in &files {
        println!("  {count:>5}  {path}");
    }
    Ok(EXIT_OK)
}

pub(crate) async fn run_clear(ws: &Workspace) -> Result<ExitStatus> {
    let store = ws.open_store().await?;
    let removed = store.item_count();
    store.clear();
    store.flush().await?;
    println!("Removed {removed} entries from {}", ws.index_path().display());
    Ok(EXIT_OK)
}

/// Token cancelled on the first Ctrl-C; the running pass stops after its current batch.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; stopping after the current batch");
            token.cancel();
        }
    });
    cancel
}

fn print_outcome(outcome: &IndexOutcome, json: bool) -> Result<ExitStatus> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        for failure in &outcome.failures {
            log::warn!("{}: {}", failure.path, failure.error);
        }
        println!("{outcome}");
    }
    Ok(if outcome.cancelled {
        EXIT_INTERRUPTED
    } else {
        EXIT_OK
    })
}
