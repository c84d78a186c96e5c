//! Ingestion pipeline orchestration.
//!
//! For every discovered workbook: read the capability sheet, resolve its
//! header, normalize rows, build chunks, embed them in batches and replace
//! the file's chunks in the store. A failing file is logged and recorded in
//! the [`IngestReport`]; it never aborts the run. A workbook that can no
//! longer be read into rows loses its previously stored chunks; one that
//! fails while embedding or storing keeps them.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::Path;

use crate::chunk;
use crate::config::Config;
use crate::discover::{discover_workbooks, display_path, file_name};
use crate::embedding::{embed_batched, EmbeddingProvider};
use crate::header::resolve;
use crate::models::{Chunk, FileIngestResult, FileStatus, IngestReport, Provenance};
use crate::normalize::normalize;
use crate::store::{StoredChunk, VectorStore};
use crate::workbook::read_sheet;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Clear the whole store before indexing.
    pub rebuild: bool,
    /// Build chunks and count them without embedding or writing.
    pub dry_run: bool,
}

/// Index every workbook under `dir`.
///
/// A directory that cannot be scanned yields an empty report with `error`
/// set. Fails only when the store cannot be cleared for a rebuild.
pub async fn ingest_directory(
    config: &Config,
    dir: &Path,
    options: IngestOptions,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> Result<IngestReport> {
    let mut report = IngestReport {
        directory: dir.display().to_string(),
        dry_run: options.dry_run,
        files: Vec::new(),
        files_found: 0,
        files_succeeded: 0,
        files_failed: 0,
        total_chunks: 0,
        error: None,
    };

    let paths = match discover_workbooks(dir, &config.workbooks) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(directory = %dir.display(), error = %e, "indexing skipped");
            report.error = Some(e.to_string());
            return Ok(report);
        }
    };
    tracing::info!(directory = %dir.display(), files = paths.len(), "found workbooks");

    if options.rebuild && !options.dry_run {
        let removed = store.clear().await.context("Failed to clear store")?;
        tracing::info!(removed, "cleared store for rebuild");
    }

    report.files_found = paths.len();
    for path in &paths {
        let result = index_one(config, path, options.dry_run, embedder, store).await;
        report.files.push(result);
    }

    report.files_succeeded = report
        .files
        .iter()
        .filter(|f| f.status == FileStatus::Indexed)
        .count();
    report.files_failed = report.files_found - report.files_succeeded;
    report.total_chunks = report.files.iter().map(|f| f.chunks).sum();

    Ok(report)
}

async fn index_one(
    config: &Config,
    path: &Path,
    dry_run: bool,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> FileIngestResult {
    let name = file_name(path);
    let file_path = display_path(path);

    let outcome = match build_chunks(config, path) {
        Ok(chunks) if dry_run => Ok(chunks.len()),
        Ok(chunks) => store_chunks(config, &file_path, chunks, embedder, store).await,
        Err(e) => {
            // The workbook no longer yields rows: its previous chunks are stale.
            if !dry_run {
                match store.delete_file(&file_path).await {
                    Ok(0) => {}
                    Ok(removed) => {
                        tracing::warn!(file = %name, removed, "removed stale chunks")
                    }
                    Err(del) => {
                        tracing::warn!(file = %name, error = %del, "could not remove stale chunks")
                    }
                }
            }
            Err(e)
        }
    };

    match outcome {
        Ok(chunks) => {
            tracing::info!(file = %name, chunks, "indexed");
            FileIngestResult {
                file_name: name,
                file_path,
                status: FileStatus::Indexed,
                chunks,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(file = %name, error = %format!("{:#}", e), "failed to index");
            FileIngestResult {
                file_name: name,
                file_path,
                status: FileStatus::Failed,
                chunks: 0,
                error: Some(format!("{:#}", e)),
            }
        }
    }
}

/// Read, resolve and normalize the capability sheet into chunks.
///
/// A workbook that yields no chunks is an error so it shows up as failed.
fn build_chunks(config: &Config, path: &Path) -> Result<Vec<Chunk>> {
    let sheet = &config.workbooks.sheet_name;
    let grid = read_sheet(path, sheet)?;

    let header = resolve(&grid);
    if !header.is_found() {
        bail!("Could not find required columns in '{}'", sheet);
    }

    let provenance = Provenance {
        file_name: file_name(path),
        file_path: display_path(path),
        sheet_name: sheet.clone(),
    };
    let rows = normalize(&grid, &header, &provenance)?;

    let indexed_at = Utc::now();
    let chunks: Vec<Chunk> = rows
        .iter()
        .filter_map(|row| chunk::build(row, indexed_at))
        .collect();
    if chunks.is_empty() {
        bail!("No capability rows found");
    }
    tracing::debug!(file = %provenance.file_name, chunks = chunks.len(), "built chunks");
    Ok(chunks)
}

/// Embed `chunks` and replace the file's stored chunks with them.
async fn store_chunks(
    config: &Config,
    file_path: &str,
    chunks: Vec<Chunk>,
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
) -> Result<usize> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embed_batched(embedder, &texts, config.embedding.batch_size)
        .await
        .context("Embedding failed")?;

    let records: Vec<StoredChunk> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(c, v)| StoredChunk::new(c, embedder.model_name(), v))
        .collect();
    let count = records.len();

    store
        .replace_file(file_path, &records)
        .await
        .context("Failed to store chunks")?;

    Ok(count)
}
