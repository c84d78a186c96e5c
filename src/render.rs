//! Human-readable rendering of command results.
//!
//! Every command result is also `Serialize`; `--format json` prints that
//! instead of these renderings.

use std::fmt::Write;

use crate::models::{
    FileInventory, FileStatus, IngestReport, QueryResult, StoreStats, ValidationReport,
};
use crate::stats::{format_bytes, format_relative};

const RULE_WIDTH: usize = 60;

fn heading(out: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", rule);
}

pub fn validation_report(report: &ValidationReport) -> String {
    let mut out = String::new();
    heading(&mut out, "WORKBOOK VALIDATION");
    let _ = writeln!(out, "Directory: {}", report.directory);

    if let Some(error) = &report.error {
        let _ = writeln!(out, "Error: {}", error);
        return out;
    }

    let _ = writeln!(
        out,
        "Files: {}  valid: {}  invalid: {}",
        report.total_files, report.valid_files, report.invalid_files
    );

    for file in &report.files {
        let _ = writeln!(out);
        let mark = if file.is_valid { "✓" } else { "✗" };
        let _ = writeln!(out, "{} {}", mark, file.file_name);
        if !file.sheets.is_empty() {
            let _ = writeln!(out, "    sheets:     {}", file.sheets.join(", "));
        }
        if let Some(row) = file.header_row {
            let _ = writeln!(out, "    header row: {}", row);
        }
        if let Some(mapping) = &file.column_mapping {
            for (label, canonical) in mapping {
                let _ = writeln!(out, "    column:     {} -> {}", label, canonical);
            }
        }
        if file.is_valid {
            let _ = writeln!(out, "    data rows:  {}", file.data_rows);
        }
        for error in &file.errors {
            let _ = writeln!(out, "    error:      {}", error);
        }
        for warning in &file.warnings {
            let _ = writeln!(out, "    warning:    {}", warning);
        }
    }
    out
}

pub fn ingest_report(report: &IngestReport) -> String {
    let mut out = String::new();
    let title = if report.dry_run {
        "index (dry-run)"
    } else {
        "index"
    };
    let _ = writeln!(out, "{} {}", title, report.directory);

    if let Some(error) = &report.error {
        let _ = writeln!(out, "  error: {}", error);
        return out;
    }

    let _ = writeln!(out, "  files found: {}", report.files_found);

    for file in &report.files {
        match file.status {
            FileStatus::Indexed => {
                let _ = writeln!(out, "  ✓ {} ({} chunks)", file.file_name, file.chunks);
            }
            FileStatus::Failed => {
                let _ = writeln!(
                    out,
                    "  ✗ {}: {}",
                    file.file_name,
                    file.error.as_deref().unwrap_or("no valid data")
                );
            }
        }
    }

    let _ = writeln!(out, "  succeeded: {}", report.files_succeeded);
    let _ = writeln!(out, "  failed: {}", report.files_failed);
    let chunk_label = if report.dry_run {
        "chunks (not written)"
    } else {
        "total chunks indexed"
    };
    let _ = writeln!(out, "  {}: {}", chunk_label, report.total_chunks);
    out
}

pub fn query_result(result: &QueryResult) -> String {
    let mut out = String::new();
    heading(&mut out, "CAPABILITY SEARCH RESULTS");
    let _ = writeln!(out, "Query: '{}'", result.query);
    let _ = writeln!(out, "Found: {} matches", result.total_found);

    if let Some(error) = &result.error {
        let _ = writeln!(out);
        let _ = writeln!(out, "Error: {}", error);
        return out;
    }

    let _ = writeln!(out);
    heading(&mut out, "OVERVIEW");
    let _ = writeln!(out, "{}", result.overview);

    if !result.matches.is_empty() {
        let _ = writeln!(out);
        heading(&mut out, "SOURCE FILES");
        for m in &result.matches {
            let _ = writeln!(
                out,
                "{}. {} (Similarity: {:.2})",
                m.rank, m.file_name, m.similarity_score
            );
            let _ = writeln!(out, "   Capability: {}", m.capability);
            if !m.business_description.is_empty() {
                let _ = writeln!(out, "   Description: {}", m.business_description);
            }
            if !m.system_changes.is_empty() {
                let _ = writeln!(out, "   System Changes: {}", m.system_changes);
            }
            if let Some(summary) = &m.summary {
                let _ = writeln!(out, "   Summary: {}", summary);
            }
            let _ = writeln!(out, "   Source: {}", m.source_link);
        }
    }
    out
}

pub fn store_stats(stats: &StoreStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Capability Lookup: Store Stats");
    let _ = writeln!(out, "==============================");
    let _ = writeln!(out);
    let _ = writeln!(out, "  Collection:   {}", stats.collection);
    let _ = writeln!(out, "  Database:     {}", stats.database_path);
    let _ = writeln!(out, "  Size:         {}", format_bytes(stats.database_bytes));
    let _ = writeln!(out);
    let _ = writeln!(out, "  Chunks:       {}", stats.total_chunks);
    let _ = writeln!(out, "  Source files: {}", stats.source_files);
    if !stats.embedding_models.is_empty() {
        let _ = writeln!(out, "  Models:       {}", stats.embedding_models.join(", "));
    }
    out
}

pub fn file_inventory(files: &[FileInventory]) -> String {
    let mut out = String::new();
    if files.is_empty() {
        let _ = writeln!(out, "No files indexed.");
        return out;
    }

    let _ = writeln!(out, "  {:<40} {:>8}   {}", "FILE", "CHUNKS", "LAST INDEXED");
    let _ = writeln!(out, "  {}", "-".repeat(72));
    for f in files {
        let when = f
            .last_indexed_at
            .as_deref()
            .map(format_relative)
            .unwrap_or_else(|| "never".to_string());
        let _ = writeln!(out, "  {:<40} {:>8}   {}", f.file_name, f.chunks, when);
    }
    out
}
