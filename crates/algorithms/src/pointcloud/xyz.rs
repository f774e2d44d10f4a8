//! ASCII XYZ reader
//!
//! One point per line: `x y z [class]`, separated by commas, tabs or runs of
//! blanks. Lines whose first non-blank character is `#` are comments. A missing class means 0.

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use lidem_core::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::{source_error, BoundingBox, PointReader, PointRecord};

/// Streams points out of an ASCII XYZ file.
///
/// The file is scanned once when opened to establish its bounds and point
/// count.
pub struct XyzPointReader {
    path: PathBuf,
    records: StringRecordsIntoIter<File>,
    bounds: BoundingBox,
    count: u64,
}

impl XyzPointReader {
    pub fn open(path: &Path) -> Result<Self> {
        let delimiter = sniff_delimiter(path)?;

        let mut bounds = BoundingBox::empty();
        let mut count = 0u64;
        let mut scan = builder(delimiter)
            .from_path(path)
            .map_err(|e| source_error(path, e))?;
        for record in scan.records() {
            let record = record.map_err(|e| source_error(path, e))?;
            if let Some(p) = parse_record(&record, path)? {
                bounds.add(p.x, p.y);
                count += 1;
            }
        }

        let records = builder(delimiter)
            .from_path(path)
            .map_err(|e| source_error(path, e))?
            .into_records();
        Ok(Self {
            path: path.to_path_buf(),
            records,
            bounds,
            count,
        })
    }
}

impl PointReader for XyzPointReader {
    fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    fn point_count(&self) -> u64 {
        self.count
    }

    fn next_point(&mut self) -> Option<Result<PointRecord>> {
        loop {
            let record = match self.records.next()? {
                Ok(r) => r,
                Err(e) => return Some(Err(source_error(&self.path, e))),
            };
            match parse_record(&record, &self.path) {
                Ok(Some(p)) => return Some(Ok(p)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn builder(delimiter: u8) -> ReaderBuilder {
    let mut b = ReaderBuilder::new();
    b.has_headers(false)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All);
    b
}

/// Delimiter of the first data line: comma, tab, or blank
fn sniff_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path).map_err(|e| source_error(path, e))?;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| source_error(path, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.contains(',') {
            return Ok(b',');
        }
        if line.contains('\t') {
            return Ok(b'\t');
        }
        break;
    }
    Ok(b' ')
}

/// `None` for a blank or comment record
fn parse_record(record: &StringRecord, path: &Path) -> Result<Option<PointRecord>> {
    // Runs of blanks produce empty fields
    let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
    // the reader only skips comments that start in the first column
    if fields.first().map_or(true, |f| f.starts_with('#')) {
        return Ok(None);
    }
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    if fields.len() < 3 || fields.len() > 4 {
        return Err(source_error(
            path,
            format!("line {}: expected 'x y z [class]', got {} values", line, fields.len()),
        ));
    }
    let coord = |i: usize| {
        fields[i].parse::<f64>().map_err(|_| {
            source_error(path, format!("line {}: '{}' is not a number", line, fields[i]))
        })
    };
    let classification = match fields.get(3) {
        Some(s) => s.parse::<u8>().map_err(|_| {
            source_error(path, format!("line {}: '{}' is not a classification code", line, s))
        })?,
        None => 0,
    };
    Ok(Some(PointRecord::new(coord(0)?, coord(1)?, coord(2)?, classification)))
}
