//! CSV import of records
//!
//! Headers are matched to field names case- and space-insensitively, so a
//! file exported by `bms export` (or typed by hand with "From Team" style
//! headers) imports cleanly. Store-managed columns are ignored.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;

use crate::core::entity::Record;
use crate::core::error::{BmsError, Result};
use crate::core::service::BmsService;
use crate::core::validation::{normalize_key, FieldError, Fields, ValidationErrors};

/// Columns assigned by the store, never taken from the file
const IGNORED_COLUMNS: &[&str] = &["id", "created_at", "updated_at"];

/// A row that could not be imported
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    /// 1-based line number in the file (the header is line 1)
    pub line: usize,
    pub errors: ValidationErrors,
}

/// Outcome of an import run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub rows_processed: usize,
    /// Ids of the created records (empty on a dry run)
    pub created: Vec<i64>,
    /// Rows that would have been created on a dry run
    pub valid: usize,
    pub failed: Vec<RowFailure>,
    pub dry_run: bool,
}

impl ImportSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

fn row_fields(headers: &[Option<String>], row: &StringRecord) -> Fields {
    headers
        .iter()
        .zip(row.iter())
        .filter_map(|(header, value)| header.as_deref().map(|h| (h, value)))
        .collect()
}

/// Import every row of `reader` as an `R`
///
/// Rows that fail to parse or validate are reported and skipped; the rest
/// are created. With `dry_run` nothing is written.
pub fn import_csv<R: Record, Rd: Read>(
    service: &BmsService,
    reader: Rd,
    dry_run: bool,
) -> Result<ImportSummary> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<Option<String>> = rdr
        .headers()?
        .iter()
        .map(normalize_key)
        .map(|h| (!IGNORED_COLUMNS.contains(&h.as_str())).then_some(h))
        .collect();

    let mut summary = ImportSummary {
        dry_run,
        ..Default::default()
    };

    for (row_idx, result) in rdr.records().enumerate() {
        summary.rows_processed += 1;
        // Quoted fields may span lines, so ask the reader where the row began
        let fallback = row_idx + 2;

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                let line = e.position().map_or(fallback, |p| p.line() as usize);
                summary.failed.push(RowFailure {
                    line,
                    errors: vec![FieldError::new("row", format!("CSV parse error: {}", e))].into(),
                });
                continue;
            }
        };

        let line = row.position().map_or(fallback, |p| p.line() as usize);
        let record = match R::from_fields(&row_fields(&headers, &row)) {
            Ok(record) => record,
            Err(errors) => {
                summary.failed.push(RowFailure { line, errors });
                continue;
            }
        };

        if dry_run {
            summary.valid += 1;
            continue;
        }

        match service.create(record) {
            Ok(created) => {
                summary.valid += 1;
                summary.created.extend(created.id());
            }
            Err(BmsError::Validation { errors, .. }) => {
                summary.failed.push(RowFailure { line, errors });
            }
            Err(e) => return Err(e),
        }
    }

    log::info!(
        "import of {}: {} rows, {} created, {} failed{}",
        R::TABLE,
        summary.rows_processed,
        summary.created.len(),
        summary.failed.len(),
        if dry_run { " (dry run)" } else { "" }
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::write_csv;
    use crate::core::store::ListFilter;
    use crate::entities::{Handover, HandoverStatus, Issue, IssueSeverity, TestSuite};

    #[test]
    fn test_import_form_style_headers() {
        let service = BmsService::in_memory().unwrap();
        let csv = "From Team,To Team,Date,Description,Documents,Status,ID\n\
                   Ops,Dev,2024-03-01,Half done,a.pdf; b.pdf,In Progress,17\n";

        let summary = import_csv::<Handover, _>(&service, csv.as_bytes(), false).unwrap();
        assert!(summary.is_clean());
        assert_eq!(summary.created, vec![1]);

        let ho: Handover = service.get(1).unwrap();
        assert_eq!(ho.title, "Ops → Dev");
        assert_eq!(ho.status, HandoverStatus::InProgress);
        assert_eq!(ho.documents, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_bad_rows_are_reported_not_fatal() {
        let service = BmsService::in_memory().unwrap();
        let csv = "title,type,severity\n\
                   Disk full,infrastructure,critical\n\
                   ,application,low\n\
                   Slow,performance,urgent\n";

        let summary = import_csv::<Issue, _>(&service, csv.as_bytes(), false).unwrap();
        assert_eq!(summary.rows_processed, 3);
        assert_eq!(summary.created.len(), 1);
        let lines: Vec<usize> = summary.failed.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![3, 4]);
        assert!(summary.failed[1].errors.has_field("severity"));

        let issue: Issue = service.get(summary.created[0]).unwrap();
        assert_eq!(issue.severity, IssueSeverity::Critical);
    }

    #[test]
    fn test_failure_line_counts_multiline_fields() {
        let service = BmsService::in_memory().unwrap();
        let csv = "title,type,description\n\
                   Disk full,infrastructure,\"first line\nsecond line\nthird line\"\n\
                   Slow,teleport,\n";

        let summary = import_csv::<Issue, _>(&service, csv.as_bytes(), false).unwrap();
        assert_eq!(summary.created.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].line, 5);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let service = BmsService::in_memory().unwrap();
        let csv = "name,pass_count,fail_count\nsmoke,10,0\nnightly,3,1\n";

        let summary = import_csv::<TestSuite, _>(&service, csv.as_bytes(), true).unwrap();
        assert_eq!(summary.valid, 2);
        assert!(summary.created.is_empty());
        assert_eq!(service.count::<TestSuite>(&ListFilter::new()).unwrap(), 0);
    }

    #[test]
    fn test_export_then_import_reproduces_records() {
        let source = BmsService::in_memory().unwrap();
        let mut suite = TestSuite::new("nightly");
        suite.pass_count = 40;
        suite.fail_count = 2;
        suite.fix_notes = "retry, then \"flaky\" tag".to_string();
        source.create(suite).unwrap();
        let exported: Vec<TestSuite> = source.list(&ListFilter::new()).unwrap();
        let mut csv = Vec::new();
        write_csv(&exported, &mut csv).unwrap();

        let target = BmsService::in_memory().unwrap();
        let summary = import_csv::<TestSuite, _>(&target, csv.as_slice(), false).unwrap();
        assert!(summary.is_clean());

        let imported: TestSuite = target.get(summary.created[0]).unwrap();
        assert_eq!(imported.name, exported[0].name);
        assert_eq!(imported.fail_count, 2);
        assert_eq!(imported.fix_notes, exported[0].fix_notes);
    }
}
