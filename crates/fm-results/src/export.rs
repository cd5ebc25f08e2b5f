//! CSV export of mission point records.

use crate::ResultsResult;
use crate::types::MissionPointRecord;
use std::io::Write;
use std::path::Path;

/// Header row from the record field names, one row per point.
pub fn write_csv<W: Write>(writer: W, records: &[MissionPointRecord]) -> ResultsResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn export_csv(path: &Path, records: &[MissionPointRecord]) -> ResultsResult<()> {
    let file = std::fs::File::create(path)?;
    write_csv(std::io::BufWriter::new(file), records)
}
