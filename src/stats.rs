//! Store statistics and per-file inventory.
//!
//! Backs `caplook stats` (totals, database size, embedding models) and
//! `caplook files` (chunks per source workbook with the last index time).

use anyhow::Result;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::models::{FileInventory, StoreStats};
use crate::store::{VectorStore, COLLECTION_NAME};

pub async fn collect_stats(config: &Config, store: &dyn VectorStore) -> Result<StoreStats> {
    let total_chunks = store.count().await?;
    let files = list_files(store).await?;
    let embedding_models = store.models().await?;

    let database_bytes = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(StoreStats {
        collection: COLLECTION_NAME.to_string(),
        database_path: config.db.path.display().to_string(),
        database_bytes,
        total_chunks,
        source_files: files.len(),
        embedding_models,
    })
}

/// One entry per distinct source file path, ordered by file name.
pub async fn list_files(store: &dyn VectorStore) -> Result<Vec<FileInventory>> {
    let mut by_path: BTreeMap<String, FileInventory> = BTreeMap::new();

    for meta in store.list(None).await? {
        let entry = by_path
            .entry(meta.file_path.clone())
            .or_insert_with(|| FileInventory {
                file_name: meta.file_name.clone(),
                file_path: meta.file_path.clone(),
                chunks: 0,
                last_indexed_at: None,
            });
        entry.chunks += 1;
        // RFC 3339 UTC timestamps compare correctly as strings
        if entry
            .last_indexed_at
            .as_deref()
            .map_or(true, |last| meta.indexed_at.as_str() > last)
        {
            entry.last_indexed_at = Some(meta.indexed_at);
        }
    }

    let mut files: Vec<FileInventory> = by_path.into_values().collect();
    files.sort_by(|a, b| {
        a.file_name
            .cmp(&b.file_name)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
    Ok(files)
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Render an RFC 3339 timestamp relative to now ("3 hours ago"). Falls back
/// to the input when it does not parse.
pub fn format_relative(timestamp: &str) -> String {
    let Ok(ts) = chrono::DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_string();
    };
    let ts = ts.with_timezone(&chrono::Utc);
    let delta = (chrono::Utc::now() - ts).num_seconds();

    if delta < 0 {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}
