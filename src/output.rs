use crate::common::error::Result;
use crate::common::types::{Column, EventRecord, Site};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Header row followed by one row per record, in column order
pub fn write_csv(path: &Path, columns: &[Column], records: &[EventRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns.iter().map(|c| c.header))?;
    for record in records {
        writer.write_record(columns.iter().map(|c| record.get(c.field)))?;
    }
    writer.flush()?;
    Ok(())
}

/// Every row of a CSV file, header included
pub fn read_csv(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.records() {
        rows.push(row?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Write `{stem}_{timestamp}.csv` and refresh `{stem}_latest.csv`.
/// Returns the paths written; nothing is written for an empty list.
pub fn save_events(records: &[EventRecord], site: Site, output_dir: &Path) -> Result<Vec<PathBuf>> {
    if records.is_empty() {
        warn!("No events to save for {}", site);
        return Ok(Vec::new());
    }

    fs::create_dir_all(output_dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let stem = site.file_stem();
    let timestamped = output_dir.join(format!("{stem}_{timestamp}.csv"));
    let latest = output_dir.join(format!("{stem}_latest.csv"));

    let columns = site.columns();
    write_csv(&timestamped, columns, records)?;
    write_csv(&latest, columns, records)?;

    info!("💾 Saved {} events to {}", records.len(), timestamped.display());
    info!("💾 Also saved as {}", latest.display());
    Ok(vec![timestamped, latest])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never_created");
        let written = save_events(&[], Site::Meetup, &out).unwrap();
        assert!(written.is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn rows_follow_site_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("webook.csv");

        let mut record = EventRecord::new(Site::WeBook);
        record.name = "Padel Night".into();
        record.price = "120".into();
        write_csv(&path, Site::WeBook.columns(), &[record]).unwrap();

        let rows = read_csv(&path).unwrap();
        assert_eq!(
            rows[0],
            vec!["Site", "Name", "Start Date", "End Date", "Location", "Price", "Description", "URL"]
        );
        assert_eq!(
            rows[1],
            vec!["webook.com", "Padel Night", "N/A", "N/A", "N/A", "120", "N/A", "N/A"]
        );
    }
}
