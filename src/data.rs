use crate::config::InputConfig;
use crate::error::PipelineError;
use crate::types::ValueTable;
use anyhow::{Context, Result, anyhow};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// A spreadsheet cell, reduced to what the loader distinguishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

pub fn load_data(input: &InputConfig) -> Result<ValueTable> {
    info!("Loading population data from {:?}", input.spreadsheet);

    let extension = input.spreadsheet.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input spreadsheet has no extension: {:?}", input.spreadsheet))?;

    let rows = match extension.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook(&input.spreadsheet, input.sheet.as_deref())?,
        "csv" => read_csv(&input.spreadsheet)?,
        _ => return Err(PipelineError::UnsupportedFormat(extension).into()),
    };

    let table = parse_rows(rows, input.skip_rows)?;
    info!("Loaded totals for {} countries", table.len());
    Ok(table)
}

/// Turns raw rows into a country table.
///
/// `skip_rows` rows are dropped, then one header row. Only the first two
/// columns are read. Rows without a total are dropped.
pub fn parse_rows(rows: Vec<Vec<Cell>>, skip_rows: usize) -> Result<ValueTable> {
    let mut table = ValueTable::new();

    for (i, row) in rows.into_iter().enumerate().skip(skip_rows + 1) {
        let sheet_row = i + 1;
        let mut cells = row.into_iter();
        let country = cells.next().unwrap_or(Cell::Empty);
        let total = cells.next().unwrap_or(Cell::Empty);

        let Some(total) = parse_total(&total, &country, sheet_row)? else {
            debug!("Row {}: no total, skipping", sheet_row);
            continue;
        };

        let name = cell_text(&country);
        if name.is_empty() {
            warn!("Row {}: total {} has no country name, skipping", sheet_row, total);
            continue;
        }

        table.insert(name, total);
    }

    Ok(table)
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(n) => n.to_string(),
        Cell::Empty => String::new(),
    }
}

/// Numeric cells truncate toward zero. Text cells must hold a plain
/// non-negative integer: "27.679" or "7.0" are rejected, not guessed at.
fn parse_total(cell: &Cell, country: &Cell, row: usize) -> Result<Option<u64>, PipelineError> {
    let malformed = |value: String| PipelineError::MalformedTotal {
        row,
        country: cell_text(country),
        value,
    };

    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(n) if !n.is_finite() || *n < 0.0 => Err(malformed(n.to_string())),
        Cell::Number(n) => Ok(Some(n.trunc() as u64)),
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<u64>().map(Some).map_err(|_| malformed(s.to_string()))
        }
    }
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<Cell>>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open spreadsheet: {:?}", path))?;

    let range = match sheet {
        Some(name) => workbook.worksheet_range(name)
            .with_context(|| format!("Failed to read worksheet '{}'", name))?,
        None => workbook.worksheet_range_at(0)
            .ok_or(PipelineError::EmptySheet)?
            .context("Failed to read first worksheet")?,
    };

    // The range starts at the first used cell; pad so row numbers match the sheet.
    let leading = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); leading];
    rows.extend(range.rows().map(|row| row.iter().map(cell_from_data).collect()));
    Ok(rows)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

fn read_csv(path: &Path) -> Result<Vec<Vec<Cell>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.with_context(|| format!("Failed to read CSV record in {:?}", path))?;
        rows.push(
            record.iter()
                .map(|field| if field.trim().is_empty() { Cell::Empty } else { Cell::Text(field.to_string()) })
                .collect(),
        );
    }
    Ok(rows)
}
