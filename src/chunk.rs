//! Row-to-chunk conversion.
//!
//! Every [`NormalizedRow`] becomes exactly one [`Chunk`]: a labelled text
//! block followed by a `Keywords:` line that repeats the field values in
//! lowercase to bias retrieval toward them. Each chunk carries a SHA-256 hash
//! of its text for change detection.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::header::is_blank_value;
use crate::models::{Chunk, ChunkMetadata, NormalizedRow};

/// Build the chunk for `row`, stamping it with `indexed_at`.
///
/// Returns `None` when the row has no usable capability.
pub fn build(row: &NormalizedRow, indexed_at: DateTime<Utc>) -> Option<Chunk> {
    let capability = row.capability.trim();
    if is_blank_value(capability) {
        return None;
    }

    let scope = present(&row.scope_description);
    let changes = present(&row.system_changes);

    let mut text = format!("Capability: {}\n", capability);
    if let Some(scope) = scope {
        text.push_str(&format!("Business Description: {}\n", scope));
    }
    if let Some(changes) = changes {
        text.push_str(&format!("System Changes: {}\n", changes));
    }

    text.push_str("Keywords: ");
    text.push_str(&capability.to_lowercase());
    for extra in [scope, changes].into_iter().flatten() {
        text.push(' ');
        text.push_str(&extra.to_lowercase());
    }

    let metadata = ChunkMetadata {
        file_name: row.source_file.clone(),
        file_path: row.source_path.clone(),
        sheet_name: row.sheet_name.clone(),
        row_index: row.row_index as i64,
        capability: capability.to_string(),
        scope_description: row.scope_description.trim().to_string(),
        system_changes: row.system_changes.trim().to_string(),
        indexed_at: indexed_at.to_rfc3339_opts(SecondsFormat::Micros, true),
    };

    Some(Chunk {
        hash: hash_text(&text),
        text,
        metadata,
    })
}

/// Build the chunk for `row` using the current time.
pub fn build_now(row: &NormalizedRow) -> Option<Chunk> {
    build(row, Utc::now())
}

fn present(value: &str) -> Option<&str> {
    let v = value.trim();
    if is_blank_value(v) {
        None
    } else {
        Some(v)
    }
}

pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(capability: &str, scope: &str, changes: &str) -> NormalizedRow {
        NormalizedRow {
            capability: capability.to_string(),
            scope_description: scope.to_string(),
            system_changes: changes.to_string(),
            source_file: "estimate.xlsx".to_string(),
            source_path: "/data/estimate.xlsx".to_string(),
            sheet_name: "Capability List".to_string(),
            row_index: 4,
        }
    }

    fn frozen() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_full_row_text() {
        let chunk = build(&row("Login", "Users sign in", "Add OAuth"), frozen()).unwrap();
        assert_eq!(
            chunk.text,
            "Capability: Login\nBusiness Description: Users sign in\n\
             System Changes: Add OAuth\nKeywords: login users sign in add oauth"
        );
    }

    #[test]
    fn test_optional_fields_omitted() {
        let chunk = build(&row("Payments", "NaN", ""), frozen()).unwrap();
        assert_eq!(chunk.text, "Capability: Payments\nKeywords: payments");

        let chunk = build(&row("Payments", "", "Ledger"), frozen()).unwrap();
        assert_eq!(
            chunk.text,
            "Capability: Payments\nSystem Changes: Ledger\nKeywords: payments ledger"
        );
    }

    #[test]
    fn test_rejects_blank_capability() {
        assert!(build(&row("  ", "a", "b"), frozen()).is_none());
        assert!(build(&row("nan", "a", "b"), frozen()).is_none());
        assert!(build(&row("NAN", "a", "b"), frozen()).is_none());
    }

    #[test]
    fn test_metadata() {
        let chunk = build(&row("Login", "Users sign in", "Add OAuth"), frozen()).unwrap();
        let m = &chunk.metadata;
        assert_eq!(m.file_name, "estimate.xlsx");
        assert_eq!(m.file_path, "/data/estimate.xlsx");
        assert_eq!(m.sheet_name, "Capability List");
        assert_eq!(m.row_index, 4);
        assert_eq!(m.capability, "Login");
        assert_eq!(m.scope_description, "Users sign in");
        assert_eq!(m.system_changes, "Add OAuth");
        assert_eq!(m.indexed_at, "2024-05-01T12:30:00.000000Z");
    }

    #[test]
    fn test_deterministic_except_timestamp() {
        let r = row("Consent", "Review current consent", "Consent API");
        let a = build(&r, frozen()).unwrap();
        let b = build(&r, frozen()).unwrap();
        assert_eq!(a, b);

        let later = build(&r, frozen() + chrono::Duration::hours(1)).unwrap();
        assert_eq!(a.text, later.text);
        assert_eq!(a.hash, later.hash);
        assert_ne!(a.metadata.indexed_at, later.metadata.indexed_at);
    }

    #[test]
    fn test_starts_and_ends_with_capability() {
        let chunk = build_now(&row("Mutual Funds Selection", "", "")).unwrap();
        assert!(chunk.text.starts_with("Capability: Mutual Funds Selection"));
        let last = chunk.text.lines().last().unwrap();
        assert!(last.starts_with("Keywords: "));
        assert!(last.contains("mutual funds selection"));
    }
}
