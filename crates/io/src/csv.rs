// CSV/TSV dataset import/export

use std::io::Read;
use std::path::Path;

use dupguard_dedup::config::ClassificationConfig;
use dupguard_dedup::{Dataset, DedupError, Value};

/// Load a delimited file as a dataset, classifying columns with the default vocabulary.
pub fn load_dataset(path: &Path, label: &str) -> Result<Dataset, DedupError> {
    load_dataset_with(path, label, &ClassificationConfig::default())
}

pub fn load_dataset_with(
    path: &Path,
    label: &str,
    classification: &ClassificationConfig,
) -> Result<Dataset, DedupError> {
    let content = read_file_as_utf8(path)?;
    let dataset = parse_dataset(&content, label, classification).map_err(|e| match e {
        DedupError::Csv(msg) => DedupError::Csv(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    log::debug!(
        "loaded {label} from {}: {} rows x {} columns",
        path.display(),
        dataset.row_count(),
        dataset.column_count()
    );
    Ok(dataset)
}

pub fn load_dataset_from_str(content: &str, label: &str) -> Result<Dataset, DedupError> {
    parse_dataset(content, label, &ClassificationConfig::default())
}

pub fn parse_dataset(
    content: &str,
    label: &str,
    classification: &ClassificationConfig,
) -> Result<Dataset, DedupError> {
    let delimiter = sniff_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let columns: Vec<String> = match records.next() {
        Some(header) => header
            .map_err(|e| DedupError::Csv(e.to_string()))?
            .iter()
            .map(|name| name.trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| DedupError::Csv(e.to_string()))?;
        // Blank lines are skipped by the reader; a lone empty field is not data either
        if record.len() == 1 && record.get(0).is_some_and(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Dataset::from_records(label, columns, rows, classification)
}

/// Delimiters tried when sniffing, in tie-break order.
const DELIMITER_CANDIDATES: [u8; 4] = [b'\t', b';', b',', b'|'];

/// Lines sampled from the top of the file when sniffing.
const SNIFF_LINES: usize = 10;

/// Pick the delimiter that splits the sampled lines most consistently.
///
/// A candidate is viable only if it splits the header into more than one
/// field. It scores (lines agreeing with the header's field count) times that
/// count, so wider consistent splits win. Falls back to comma.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().take(SNIFF_LINES).collect();
    let Some(header) = sample.first() else {
        return b',';
    };

    DELIMITER_CANDIDATES
        .iter()
        .filter_map(|&delim| {
            let width = field_count(header, delim);
            if width <= 1 {
                return None;
            }
            let agreeing = sample.iter().filter(|line| field_count(line, delim) == width).count();
            Some((agreeing * width, delim))
        })
        // First candidate wins ties
        .fold(None, |best: Option<(usize, u8)>, (score, delim)| match best {
            Some((top, _)) if top >= score => best,
            _ => Some((score, delim)),
        })
        .map_or(b',', |(_, delim)| delim)
}

/// Fields in one line under `delim`, honouring quotes.
fn field_count(line: &str, delim: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |record| record.len())
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, DedupError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| DedupError::Io(format!("{}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| DedupError::Io(format!("{}: {e}", path.display())))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel exports are usually Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            log::debug!("{} is not UTF-8; decoded as Windows-1252", path.display());
            Ok(decoded.into_owned())
        }
    }
}

/// Write header and rows as comma-separated values. Ragged rows are written as stored.
///
/// Loaded cells are written with their original text; only datasets built in
/// memory fall back to each value's display form.
pub fn write_dataset(dataset: &Dataset, path: &Path) -> Result<(), DedupError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| DedupError::Csv(e.to_string()))?;

    writer
        .write_record(dataset.column_names())
        .map_err(|e| DedupError::Csv(e.to_string()))?;
    for (i, row) in dataset.rows().iter().enumerate() {
        let written = match dataset.source_row(i) {
            Some(source) => writer.write_record(source),
            None => writer.write_record(row.iter().map(Value::to_string)),
        };
        written.map_err(|e| DedupError::Csv(e.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}
