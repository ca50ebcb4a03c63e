use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{guess_cell_type, Cell, Grid};

/// Loader knobs that come from the command line.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Worksheet to read from a workbook; the first sheet when `None`.
    pub sheet: Option<String>,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the raw cells of a plate export.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` / `.tsv` – delimited text, no header handling
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – first (or named) worksheet
/// * `.json`    – array of arrays, or array of `{ "well": .., "absorbance": .. }` records
/// * `.parquet` – any flat table; field names become the first row
pub fn load_grid(path: &Path, options: &LoadOptions) -> Result<Grid> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let grid = match ext.as_str() {
        "csv" | "txt" => load_delimited(path, b','),
        "tsv" => load_delimited(path, b'\t'),
        "xlsx" | "xlsm" | "xls" | "ods" => load_workbook(path, options.sheet.as_deref()),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::debug!(
        "loaded {} rows x {} columns from {}",
        grid.height(),
        grid.width(),
        path.display()
    );
    Ok(grid)
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

fn load_delimited(path: &Path, delimiter: u8) -> Result<Grid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .context("opening delimited file")?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }
    Ok(Grid::new(rows))
}

// ---------------------------------------------------------------------------
// Workbooks
// ---------------------------------------------------------------------------

fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<Grid> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .context("workbook has no worksheets")?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("reading worksheet '{sheet_name}'"))?;

    // Ranges start at the first used cell; pad so grid positions match the sheet.
    let (top, left) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); top as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; left as usize];
        cells.extend(row.iter().map(workbook_cell));
        rows.push(cells);
    }
    Ok(Grid::new(rows))
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Two shapes are accepted:
///
/// ```json
/// [["", 1, 2, ...], ["A", 0.12, 0.15, ...], ...]
/// ```
///
/// or records, the default `df.to_json(orient='records')`:
///
/// ```json
/// [{ "well": "A1", "absorbance": 0.12 }, ...]
/// ```
fn load_json(path: &Path) -> Result<Grid> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let items = root.as_array().context("Expected top-level JSON array")?;

    if items.iter().all(JsonValue::is_array) {
        let rows = items
            .iter()
            .filter_map(JsonValue::as_array)
            .map(|row| row.iter().map(json_to_cell).collect())
            .collect();
        return Ok(Grid::new(rows));
    }

    let mut header: Vec<String> = Vec::new();
    for (i, rec) in items.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is neither an array nor an object"))?;
        for key in obj.keys() {
            if !header.contains(key) {
                header.push(key.clone());
            }
        }
    }

    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(items.len() + 1);
    rows.push(header.iter().map(|h| Cell::Text(h.clone())).collect());
    for rec in items.iter().filter_map(JsonValue::as_object) {
        rows.push(
            header
                .iter()
                .map(|key| rec.get(key).map_or(Cell::Empty, json_to_cell))
                .collect(),
        );
    }
    Ok(Grid::new(rows))
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => Cell::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Int(i)
            } else if let Some(f) = n.as_f64() {
                Cell::Float(f)
            } else {
                Cell::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Cell::Bool(*b),
        JsonValue::Null => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Load a flat Parquet table. Field names become the first row, so a
/// `Well` / `Absorbance` export is picked up by the long-format detector.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Grid> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let header: Vec<Cell> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| Cell::Text(f.name().clone()))
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = vec![header];
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_cell(col, row))
                    .collect(),
            );
        }
    }
    Ok(Grid::new(rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Cell {
    if col.is_null(row) {
        return Cell::Empty;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => match any.downcast_ref::<StringArray>() {
            Some(s) => Cell::Text(s.value(row).to_string()),
            None => Cell::Empty,
        },
        DataType::LargeUtf8 => Cell::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map_or(Cell::Empty, |a| Cell::Int(i64::from(a.value(row)))),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map_or(Cell::Empty, |a| Cell::Int(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map_or(Cell::Empty, |a| Cell::Float(f64::from(a.value(row)))),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map_or(Cell::Empty, |a| Cell::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map_or(Cell::Empty, |a| Cell::Bool(a.value(row))),
        other => Cell::Text(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::layout::read_plate;
    use crate::data::model::Layout;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_rows_keep_their_shape() {
        let file = write_temp(".csv", ",1,2\nA,0.5,\"1,200\"\nB,0.7\n");
        let grid = load_grid(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.cell(0, 1), &Cell::Int(1));
        assert_eq!(grid.cell(1, 2).as_number(), Some(1200.0));
        assert!(grid.cell(2, 2).is_empty());
    }

    #[test]
    fn tsv_uses_tab_delimiter() {
        let file = write_temp(".tsv", "Well\tAbsorbance\nA1\t0.25\n");
        let grid = load_grid(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(grid.cell(1, 0), &Cell::Text("A1".into()));
        assert_eq!(grid.cell(1, 1), &Cell::Float(0.25));
    }

    #[test]
    fn json_records_become_header_and_rows() {
        let file = write_temp(
            ".json",
            r#"[{"well": "A1", "absorbance": 0.1}, {"well": "A2", "absorbance": null}]"#,
        );
        let grid = load_grid(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(grid.height(), 3);
        let header: Vec<String> = grid.rows().next().unwrap().iter().map(Cell::as_text).collect();
        assert!(header.contains(&"well".to_string()));
        assert!(header.contains(&"absorbance".to_string()));
        let abs_col = header.iter().position(|h| h == "absorbance").unwrap();
        assert!(grid.cell(2, abs_col).is_empty());
    }

    #[test]
    fn json_array_of_arrays_is_a_raw_grid() {
        let file = write_temp(".json", r#"[["", 1, 2], ["A", 0.1, 0.2]]"#);
        let grid = load_grid(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(grid.cell(1, 2), &Cell::Float(0.2));
        assert_eq!(grid.cell(0, 1), &Cell::Int(1));
    }

    #[test]
    fn json_record_keys_keep_first_seen_order() {
        let file = write_temp(
            ".json",
            r#"[{"Well ID": "A1", "OD": 0.5}, {"Well ID": "A2", "OD": 0.6, "Note": "edge"}]"#,
        );
        let grid = load_grid(file.path(), &LoadOptions::default()).unwrap();
        let header: Vec<String> = grid.rows().next().unwrap().iter().map(Cell::as_text).collect();
        assert_eq!(header, ["Well ID", "OD", "Note"]);
        assert!(grid.cell(1, 2).is_empty());
    }

    #[test]
    fn json_records_without_well_key_use_two_column_fallback() {
        let file = write_temp(
            ".json",
            r#"[{"Well ID": "A1", "OD": 0.5}, {"Well ID": "A2", "OD": 0.6}]"#,
        );
        let grid = load_grid(file.path(), &LoadOptions::default()).unwrap();
        let reading = read_plate(&grid).unwrap();
        assert_eq!(reading.layout(), Layout::TwoColumn);
        assert_eq!(reading.len(), 2);
        assert_eq!(reading.value("A2".parse().unwrap()), Some(0.6));
    }

    #[test]
    fn parquet_long_format_keeps_null_readings() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Well", DataType::Utf8, false),
            Field::new("Absorbance", DataType::Float64, true),
            Field::new("Replicate", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["A1", "A2", "B1"])),
                Arc::new(Float64Array::from(vec![Some(0.25), None, Some(0.5)])),
                Arc::new(Int64Array::from(vec![1, 1, 2])),
            ],
        )
        .unwrap();
        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let handle = file.as_file().try_clone().unwrap();
        let mut writer = ArrowWriter::try_new(handle, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let grid = load_grid(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.cell(0, 0), &Cell::Text("Well".into()));
        assert_eq!(grid.cell(0, 1), &Cell::Text("Absorbance".into()));
        assert_eq!(grid.cell(1, 1), &Cell::Float(0.25));
        assert!(grid.cell(2, 1).is_empty());
        assert_eq!(grid.cell(3, 2), &Cell::Int(2));

        let reading = read_plate(&grid).unwrap();
        assert_eq!(reading.layout(), Layout::LongFormat);
        assert_eq!(reading.len(), 3);
        assert_eq!(reading.get("A2".parse().unwrap()), Some(None));
        assert_eq!(reading.value("B1".parse().unwrap()), Some(0.5));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = write_temp(".docx", "");
        let err = load_grid(file.path(), &LoadOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));
    }
}
