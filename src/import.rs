//! One-shot bulk import of licensed UNSPSC/ETIM CSV files.
//!
//! Import is an offline administrative operation, so its error posture is
//! the opposite of the read paths: a missing file or a header that does
//! not match the expected schema aborts the whole run. Individual
//! malformed rows are skipped with a warning and counted, since licensed
//! data files routinely carry a few bad rows.
//!
//! Upserts are idempotent: importing the same file twice yields the same
//! row count and identical field values.

use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::StringRecord;
use tracing::warn;

use crate::hierarchy;
use crate::models::{EtimClass, UnspscCode, DEFAULT_ETIM_VERSION};
use crate::store::ReferenceStore;

/// Outcome of one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub upserted: usize,
    pub skipped: usize,
}

struct Columns {
    required: Vec<usize>,
    optional: Vec<Option<usize>>,
}

/// Resolve header names to column indexes; missing required headers are
/// fatal before any row is read.
fn resolve_columns(
    headers: &StringRecord,
    required: &[&str],
    optional: &[&str],
    path: &Path,
) -> Result<Columns> {
    let find = |name: &str| headers.iter().position(|h| h.trim() == name);

    let mut required_idx = Vec::with_capacity(required.len());
    for name in required {
        match find(name) {
            Some(idx) => required_idx.push(idx),
            None => bail!(
                "{}: required column '{}' missing (found: {})",
                path.display(),
                name,
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        }
    }
    let optional_idx = optional.iter().map(|name| find(name)).collect();
    Ok(Columns {
        required: required_idx,
        optional: optional_idx,
    })
}

fn field(record: &StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").trim().to_string()
}

fn optional_field(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.map(|i| field(record, i)).filter(|s| !s.is_empty())
}

/// Import UNSPSC codes from a licensed CSV export.
///
/// Required columns: `Code`, `Title`. Optional: `Description`. Hierarchy
/// sub-fields and level are always derived from the code's own
/// zero-structure, which keeps rows consistent regardless of what the
/// export carries.
pub async fn import_unspsc(store: &dyn ReferenceStore, path: &Path) -> Result<ImportReport> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open UNSPSC CSV: {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let columns = resolve_columns(&headers, &["Code", "Title"], &["Description"], path)?;

    let mut report = ImportReport::default();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("{}: unreadable row", path.display()))?;
        let code = field(&record, columns.required[0]);
        let title = field(&record, columns.required[1]);
        let description = optional_field(&record, columns.optional[0]);

        let Some(row) = UnspscCode::from_code(&code, &title, description) else {
            warn!(line = line + 2, %code, "skipping row with malformed UNSPSC code");
            report.skipped += 1;
            continue;
        };
        if title.is_empty() {
            warn!(line = line + 2, %code, "skipping row with empty title");
            report.skipped += 1;
            continue;
        }
        store.upsert_code(&row).await?;
        report.upserted += 1;
    }
    Ok(report)
}

/// Import ETIM classes from a licensed CSV export.
///
/// Required columns: `ClassCode`, `DescriptionEN`. Optional: `Version`
/// (defaults to the current licensed version), `DescriptionDE`,
/// `DescriptionFR`, `ParentClass`.
pub async fn import_etim(store: &dyn ReferenceStore, path: &Path) -> Result<ImportReport> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open ETIM CSV: {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let columns = resolve_columns(
        &headers,
        &["ClassCode", "DescriptionEN"],
        &["Version", "DescriptionDE", "DescriptionFR", "ParentClass"],
        path,
    )?;

    let mut report = ImportReport::default();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("{}: unreadable row", path.display()))?;
        let class_code = field(&record, columns.required[0]);
        let description_en = field(&record, columns.required[1]);

        if !hierarchy::validate_etim_format(&class_code) || description_en.is_empty() {
            warn!(line = line + 2, %class_code, "skipping malformed ETIM row");
            report.skipped += 1;
            continue;
        }
        let parent_class = optional_field(&record, columns.optional[3])
            .filter(|p| hierarchy::validate_etim_format(p));

        store
            .upsert_etim_class(&EtimClass {
                class_code,
                version: optional_field(&record, columns.optional[0])
                    .unwrap_or_else(|| DEFAULT_ETIM_VERSION.to_string()),
                description_en,
                description_de: optional_field(&record, columns.optional[1]),
                description_fr: optional_field(&record, columns.optional[2]),
                parent_class,
            })
            .await?;
        report.upserted += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_import_unspsc_derives_hierarchy() {
        let store = MemoryStore::new();
        let file = write_csv(
            "Code,Title,Description\n\
             25171501,Drill bits,Bits for rotary drills\n\
             25170000,Transport components,\n",
        );
        let report = import_unspsc(&store, file.path()).await.unwrap();
        assert_eq!(report, ImportReport { upserted: 2, skipped: 0 });

        let commodity = store.get_code("25171501").await.unwrap().unwrap();
        assert_eq!(commodity.level, 4);
        assert_eq!(commodity.family.as_deref(), Some("2517"));
        assert_eq!(commodity.description.as_deref(), Some("Bits for rotary drills"));

        let family = store.get_code("25170000").await.unwrap().unwrap();
        assert_eq!(family.level, 2);
        assert!(family.class_code.is_none());
    }

    #[tokio::test]
    async fn test_import_unspsc_is_idempotent() {
        let store = MemoryStore::new();
        let file = write_csv("Code,Title\n25171501,Drill bits\n25171502,Auger bits\n");
        let first = import_unspsc(&store, file.path()).await.unwrap();
        let second = import_unspsc(&store, file.path()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.count_codes().await.unwrap(), 2);
        let row = store.get_code("25171501").await.unwrap().unwrap();
        assert_eq!(row.title, "Drill bits");
    }

    #[tokio::test]
    async fn test_import_unspsc_skips_malformed_rows() {
        let store = MemoryStore::new();
        let file = write_csv(
            "Code,Title\n\
             25171501,Good row\n\
             001715,Bad code\n\
             2517150x,Bad digits\n",
        );
        let report = import_unspsc(&store, file.path()).await.unwrap();
        assert_eq!(report.upserted, 1);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_import_unspsc_missing_column_is_fatal() {
        let store = MemoryStore::new();
        let file = write_csv("Identifier,Title\n25171501,Drill bits\n");
        let err = import_unspsc(&store, file.path()).await.unwrap_err();
        assert!(err.to_string().contains("required column 'Code'"));
        assert_eq!(store.count_codes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_unspsc_missing_file_is_fatal() {
        let store = MemoryStore::new();
        let result = import_unspsc(&store, Path::new("/nonexistent/codes.csv")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_import_etim_defaults_version() {
        let store = MemoryStore::new();
        let file = write_csv(
            "ClassCode,DescriptionEN,ParentClass\n\
             EC002714,Cordless drill,\n\
             EC002715,Drill accessory,EC002714\n",
        );
        let report = import_etim(&store, file.path()).await.unwrap();
        assert_eq!(report.upserted, 2);

        let class = store
            .get_etim_class("EC002714", DEFAULT_ETIM_VERSION)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(class.description_en, "Cordless drill");
        let child = store
            .get_etim_class("EC002715", DEFAULT_ETIM_VERSION)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(child.parent_class.as_deref(), Some("EC002714"));
    }

    #[tokio::test]
    async fn test_import_etim_skips_bad_class_codes() {
        let store = MemoryStore::new();
        let file = write_csv(
            "ClassCode,DescriptionEN\n\
             EC002714,Good\n\
             XY123456,Bad prefix\n",
        );
        let report = import_etim(&store, file.path()).await.unwrap();
        assert_eq!(report.upserted, 1);
        assert_eq!(report.skipped, 1);
    }
}
