//! Loading a dataset and its column definitions from CSV/TSV files.

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveTime;
use tracing::debug;

use crate::column::{ColumnDef, FilterKind};
use crate::error::GridError;
use crate::row::{Dataset, Row, RowId};
use crate::value::{parse_datetime, parse_numeric, CellValue};

/// Non-empty cells sampled per column when inferring its type.
const TYPE_PROBE_SAMPLE_SIZE: usize = 20;

/// Text columns with at most this many distinct values get a multiselect filter.
const MAX_SELECT_OPTIONS: usize = 12;

/// Header naming the column that supplies row ids.
pub const ID_COLUMN: &str = "id";

/// Detected file format
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Csv,
    Tsv,
}

impl FileFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(FileFormat::Csv),
            "tsv" | "tab" => Some(FileFormat::Tsv),
            _ => None,
        }
    }

    pub fn delimiter(self) -> u8 {
        match self {
            FileFormat::Csv => b',',
            FileFormat::Tsv => b'\t',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Number,
    Date,
    Text,
}

/// Result of loading a file, including any warnings
#[derive(Debug)]
pub struct LoadResult {
    pub dataset: Dataset,
    pub columns: Vec<ColumnDef>,
    pub warnings: Vec<String>,
}

/// Load `path`, inferring a column definition per header.
///
/// The delimiter comes from `delimiter`, else the file extension, else comma.
pub fn load_csv(path: &Path, delimiter: Option<u8>) -> Result<LoadResult, GridError> {
    let delim = delimiter
        .or_else(|| FileFormat::from_extension(path).map(FileFormat::delimiter))
        .unwrap_or(b',');

    let file = File::open(path).map_err(|source| GridError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::with_capacity(1 << 20, file);

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Fields)
        .from_reader(reader);

    let mut warnings = Vec::new();
    let headers = column_ids(csv_reader.headers()?, &mut warnings);
    if headers.is_empty() {
        return Err(GridError::MissingHeader(path.to_path_buf()));
    }

    let mut records: Vec<(u64, Vec<String>)> = Vec::new();
    let mut padded = 0usize;
    let mut truncated = 0usize;
    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(records.len() as u64 + 2);
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        if cells.iter().all(String::is_empty) {
            continue;
        }
        if cells.len() < headers.len() {
            padded += 1;
        } else if cells.len() > headers.len() {
            truncated += 1;
        }
        cells.resize(headers.len(), String::new());
        records.push((line, cells));
    }
    if padded > 0 {
        warnings.push(format!("Padded {} short rows", padded));
    }
    if truncated > 0 {
        warnings.push(format!("Dropped extra cells from {} rows", truncated));
    }

    let types: Vec<ColumnType> = (0..headers.len())
        .map(|col| probe_column_type(records.iter().map(|(_, cells)| cells[col].as_str())))
        .collect();

    let id_col = headers.iter().position(|h| h.eq_ignore_ascii_case(ID_COLUMN));
    let mut rows = Vec::with_capacity(records.len());
    for (line, cells) in &records {
        let id = match id_col {
            Some(col) => RowId::from(cells[col].as_str()),
            None => RowId::from(*line),
        };
        let mut row = Row::new(id);
        for ((header, cell), ty) in headers.iter().zip(cells).zip(&types) {
            row.set(header.as_str(), convert_cell(cell, *ty));
        }
        rows.push(row);
    }

    let columns = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            column_def(header, types[col], records.iter().map(|(_, cells)| cells[col].as_str()))
        })
        .collect();

    let dataset = Dataset::new(rows)?;
    debug!(
        path = %path.display(),
        rows = dataset.len(),
        columns = headers.len(),
        "loaded dataset"
    );

    Ok(LoadResult {
        dataset,
        columns,
        warnings,
    })
}

/// Column ids from the header record. Blank headers get a positional name,
/// repeated headers get a numeric suffix.
fn column_ids(record: &csv::StringRecord, warnings: &mut Vec<String>) -> Vec<String> {
    if record.iter().all(str::is_empty) {
        return Vec::new();
    }
    let mut seen: HashSet<String> = HashSet::new();
    let mut ids = Vec::with_capacity(record.len());
    for (idx, header) in record.iter().enumerate() {
        let base = if header.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            header.to_string()
        };
        let mut id = base.clone();
        let mut n = 2;
        while seen.contains(&id) {
            id = format!("{}_{}", base, n);
            n += 1;
        }
        if id != header {
            warnings.push(format!("Renamed column {} to `{}`", idx + 1, id));
        }
        seen.insert(id.clone());
        ids.push(id);
    }
    ids
}

/// Probe a column to determine its type.
/// Samples up to TYPE_PROBE_SAMPLE_SIZE non-empty cells.
/// Recognizes formatted numbers (currency, percentages, etc.)
pub fn probe_column_type<'a, I>(cells: I) -> ColumnType
where
    I: IntoIterator<Item = &'a str>,
{
    let mut numeric_count = 0;
    let mut date_count = 0;
    let mut total_count = 0;

    for cell in cells {
        if total_count >= TYPE_PROBE_SAMPLE_SIZE {
            break;
        }
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            continue;
        }
        total_count += 1;
        if parse_numeric(trimmed).is_some() {
            numeric_count += 1;
        } else if parse_datetime(trimmed).is_some() {
            date_count += 1;
        }
    }

    // If more than half are of one kind, treat the column as that kind
    if total_count == 0 {
        ColumnType::Text
    } else if numeric_count * 2 >= total_count {
        ColumnType::Number
    } else if date_count * 2 >= total_count {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

/// Typed value of one cell. Cells that don't parse as the column's type stay text.
pub fn convert_cell(cell: &str, ty: ColumnType) -> CellValue {
    if cell.is_empty() {
        return CellValue::Null;
    }
    let parsed = match ty {
        ColumnType::Number => parse_numeric(cell).map(CellValue::Number),
        // Midnight timestamps are plain dates
        ColumnType::Date => parse_datetime(cell).map(|dt| {
            if dt.time() == NaiveTime::MIN {
                CellValue::Date(dt.date())
            } else {
                CellValue::DateTime(dt)
            }
        }),
        ColumnType::Text => None,
    };
    parsed.unwrap_or_else(|| CellValue::Text(cell.to_string()))
}

fn column_def<'a, I>(header: &str, ty: ColumnType, cells: I) -> ColumnDef
where
    I: Iterator<Item = &'a str>,
{
    let def = ColumnDef::new(header);
    match ty {
        ColumnType::Number => def.filter(FilterKind::Number),
        ColumnType::Date => def.filter(FilterKind::DateRange),
        ColumnType::Text => {
            if header.eq_ignore_ascii_case(ID_COLUMN) {
                return def;
            }
            let mut distinct: BTreeSet<&str> = BTreeSet::new();
            let mut total = 0usize;
            for cell in cells.filter(|c| !c.is_empty()) {
                total += 1;
                distinct.insert(cell);
                if distinct.len() > MAX_SELECT_OPTIONS {
                    return def;
                }
            }
            // A column is categorical only when its values repeat
            if distinct.is_empty() || distinct.len() * 2 > total {
                return def;
            }
            def.filter(FilterKind::MultiSelect).options(distinct)
        }
    }
}
