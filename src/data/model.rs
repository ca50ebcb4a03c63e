use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Plate geometry: 8 rows (A–H) by 12 columns.
pub const PLATE_ROWS: usize = 8;
pub const PLATE_COLS: usize = 12;

// ---------------------------------------------------------------------------
// Cell – a single raw value from the input table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as read from CSV, a workbook, JSON or Parquet.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Cell {
    /// Numeric coercion used by every layout detector.
    ///
    /// Text is trimmed and stripped of `,` thousands separators before
    /// parsing. Non-finite results are rejected so a missing reading is
    /// always `None`, never NaN.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Cell::Int(i) => *i as f64,
            Cell::Float(f) => *f,
            Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
            Cell::Empty | Cell::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Trimmed text form, used for labels and headers.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Guess a cell type from delimited text.
pub fn guess_cell_type(s: &str) -> Cell {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Cell::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return Cell::Float(f);
        }
    }
    if trimmed == "true" || trimmed == "false" {
        return Cell::Bool(trimmed == "true");
    }
    Cell::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// Grid – the raw table, rows × cells
// ---------------------------------------------------------------------------

/// Raw rows of an input table. Rows may be ragged; missing trailing cells
/// read as [`Cell::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Grid { rows }
    }

    /// Build a grid of text cells, typing each one like the CSV loader does.
    pub fn from_text_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| guess_cell_type(s.as_ref())).collect())
            .collect();
        Grid { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

// ---------------------------------------------------------------------------
// WellId – "A1" … "H12"
// ---------------------------------------------------------------------------

/// A well on a 96-well plate. Ordered row-major: A1, A2, …, A12, B1, …
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WellId {
    row: u8,
    col: u8,
}

impl WellId {
    /// `row` is 0-based (0 = A), `col` is the 1-based plate column.
    pub fn new(row: usize, col: usize) -> Option<Self> {
        if row < PLATE_ROWS && (1..=PLATE_COLS).contains(&col) {
            Some(WellId {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// Well at a 0-based position inside an 8×12 block.
    pub fn from_block_position(row: usize, col: usize) -> Option<Self> {
        WellId::new(row, col + 1)
    }

    /// Well from a row label (`'A'..='H'`, any case) and 1-based column.
    pub fn from_label(letter: char, col: usize) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        if !('A'..='H').contains(&upper) {
            return None;
        }
        WellId::new((upper as u8 - b'A') as usize, col)
    }

    pub fn row_letter(&self) -> char {
        (b'A' + self.row) as char
    }

    pub fn row_index(&self) -> usize {
        self.row as usize
    }

    pub fn column(&self) -> usize {
        self.col as usize
    }
}

impl fmt::Display for WellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a well id (expected A1..H12)")]
pub struct ParseWellError(pub String);

impl FromStr for WellId {
    type Err = ParseWellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseWellError(s.to_string());
        let mut chars = trimmed.chars();
        let letter = chars.next().ok_or_else(err)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let col: usize = digits.parse().map_err(|_| err())?;
        WellId::from_label(letter, col).ok_or_else(err)
    }
}

impl Serialize for WellId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// PlateReading – the normalised plate
// ---------------------------------------------------------------------------

/// Which detector produced a [`PlateReading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    LabeledGrid,
    /// Unlabeled 8×12 window; `row`/`col` locate well A1 in the grid.
    Block { row: usize, col: usize },
    LongFormat,
    TwoColumn,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::LabeledGrid => write!(f, "labeled 8x12 grid"),
            Layout::Block { row, col } => write!(f, "8x12 block at row {row}, column {col}"),
            Layout::LongFormat => write!(f, "Well/Absorbance table"),
            Layout::TwoColumn => write!(f, "two-column table"),
        }
    }
}

/// Well → absorbance. `None` marks a cell that could not be read as a
/// number; such wells are kept so reports can show the gap.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateReading {
    values: BTreeMap<WellId, Option<f64>>,
    layout: Layout,
}

impl PlateReading {
    pub fn new(values: BTreeMap<WellId, Option<f64>>, layout: Layout) -> Self {
        PlateReading { values, layout }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn contains(&self, well: WellId) -> bool {
        self.values.contains_key(&well)
    }

    /// Numeric value of a well; `None` when absent or unreadable.
    pub fn value(&self, well: WellId) -> Option<f64> {
        self.values.get(&well).copied().flatten()
    }

    /// Raw entry: `None` when absent, `Some(None)` when unreadable.
    pub fn get(&self, well: WellId) -> Option<Option<f64>> {
        self.values.get(&well).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WellId, Option<f64>)> + '_ {
        self.values.iter().map(|(w, v)| (*w, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn numeric_count(&self) -> usize {
        self.values.values().filter(|v| v.is_some()).count()
    }
}
