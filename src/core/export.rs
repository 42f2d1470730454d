//! CSV export of record lists and the dashboard

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::core::dashboard::Dashboard;
use crate::core::entity::Record;
use crate::core::error::Result;
use crate::core::store::columns;

/// Write `records` as CSV: a header of field names in declared order, then
/// one row per record
pub fn write_csv<R: Record, W: Write>(records: &[R], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(R::csv_headers())?;
    for record in records {
        let mut row = Vec::with_capacity(R::COLUMNS.len() + 1);
        row.push(record.id().map(|id| id.to_string()).unwrap_or_default());
        row.extend(record.csv_values());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the dashboard as two CSV sections separated by a blank line
pub fn write_dashboard_csv<W: Write>(dashboard: &Dashboard, mut writer: W) -> Result<()> {
    {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(&mut writer);
        wtr.write_record(["DASHBOARD STATISTICS"])?;
        wtr.write_record(["Metric", "Count"])?;
        for (label, count) in dashboard.stats.rows() {
            wtr.write_record([label.to_string(), count.to_string()])?;
        }
        wtr.flush()?;
    }

    writer.write_all(b"\n")?;

    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(&mut writer);
    wtr.write_record(["RECENT ACTIVITIES"])?;
    wtr.write_record(["Type", "ID", "Title", "Status", "Updated"])?;
    for activity in &dashboard.recent {
        wtr.write_record([
            activity.kind.label().to_string(),
            activity.id.to_string(),
            activity.title.clone(),
            activity.status.clone(),
            columns::format_timestamp(&activity.updated_at),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// `<kind>_export_YYYYmmdd_HHMMSS.csv`
pub fn export_filename(kind: &str, now: DateTime<Utc>) -> String {
    format!("{}_export_{}.csv", kind, now.format("%Y%m%d_%H%M%S"))
}
