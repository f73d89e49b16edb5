use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::CrawlError;
use crate::record::Record;

/// What a merge did to a dataset file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub existing: usize,
    pub added: usize,
    pub total: usize,
    pub date_range: Option<(String, String)>,
    pub id_range: Option<(String, String)>,
}

/// Load every record of a JSONL dataset. A missing file is an empty dataset.
pub fn read_records(path: &Path) -> Result<Vec<Record>, CrawlError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CrawlError::io(path, e)),
    };

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| CrawlError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| CrawlError::CorruptDataset {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Merge freshly parsed records into the dataset at `path`.
///
/// Records whose id is already stored are discarded, as are repeats within
/// `fresh` after their first occurrence. The result is sorted by date then id
/// and replaces the file in one rename. Empty input leaves the file untouched.
pub fn merge(path: &Path, fresh: Vec<Record>) -> Result<MergeReport, CrawlError> {
    if fresh.is_empty() {
        info!("No results to save");
        return Ok(MergeReport::default());
    }

    let mut records = read_records(path)?;
    let existing = records.len();
    info!("Loaded {} existing records from {}", existing, path.display());

    let mut seen: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
    let before = records.len();
    records.extend(fresh.into_iter().filter(|r| seen.insert(r.id.clone())));
    let added = records.len() - before;
    debug!("{} new records after removing known ids", added);

    records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    write_atomic(path, &records)?;

    let report = MergeReport {
        existing,
        added,
        total: records.len(),
        date_range: span(&records, |r| &r.date),
        id_range: span(&records, |r| &r.id),
    };
    info!(
        "Saved {} new results to {} (total {})",
        report.added,
        path.display(),
        report.total
    );
    Ok(report)
}

fn span(records: &[Record], key: impl Fn(&Record) -> &String) -> Option<(String, String)> {
    let min = records.iter().map(&key).min()?;
    let max = records.iter().map(&key).max()?;
    Some((min.clone(), max.clone()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_atomic(path: &Path, records: &[Record]) -> Result<(), CrawlError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CrawlError::io(parent, e))?;
    }

    let tmp = temp_path(path);
    let result = write_lines(&tmp, records)
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| CrawlError::io(path, e)));
    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!("Could not remove {}: {}", tmp.display(), e);
        }
    }
    result
}

fn write_lines(tmp: &Path, records: &[Record]) -> Result<(), CrawlError> {
    let file = File::create(tmp).map_err(|e| CrawlError::io(tmp, e))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let line = serde_json::to_string(record).map_err(|source| CrawlError::Encode {
            id: record.id.clone(),
            source,
        })?;
        writeln!(writer, "{}", line).map_err(|e| CrawlError::io(tmp, e))?;
    }
    writer.flush().map_err(|e| CrawlError::io(tmp, e))
}
