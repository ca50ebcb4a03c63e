//! Plate layout auto-detection.
//!
//! A [`Grid`] is turned into a [`PlateReading`] by trying a fixed list of
//! detectors in order. Each detector is a pure function that either
//! recognises the layout or returns `None`; the first reading with at least
//! one well wins.

use std::collections::BTreeMap;

use log::{debug, info};
use serde::Serialize;
use thiserror::Error;

use super::model::{Cell, Grid, Layout, PlateReading, WellId, PLATE_COLS, PLATE_ROWS};

/// Cells in one 8×12 window.
const BLOCK_CELLS: usize = PLATE_ROWS * PLATE_COLS;

/// Fraction of numeric cells needed to accept an unlabeled block.
pub const BLOCK_ACCEPT_FRACTION: f64 = 0.5;

/// Fraction reported by the block inspector.
pub const INSPECT_FRACTION: f64 = 0.2;

/// Window offsets tried at every anchor, in order.
const BLOCK_OFFSETS: [(usize, usize); 4] = [(0, 0), (1, 1), (0, 1), (1, 0)];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("could not interpret plate file format; expected 8x12 grid or Well/Absorbance table")]
    Unrecognized,
}

type Detector = fn(&Grid) -> Option<PlateReading>;

/// Detectors in priority order.
const DETECTORS: [(&str, Detector); 4] = [
    ("labeled grid", detect_labeled_grid),
    ("8x12 block scan", detect_block),
    ("long format", detect_long_format),
    ("two-column fallback", detect_two_column),
];

/// Detect the plate layout of `grid` and normalise it into a reading.
pub fn read_plate(grid: &Grid) -> Result<PlateReading, LayoutError> {
    for (name, detect) in DETECTORS {
        match detect(grid) {
            Some(reading) if !reading.is_empty() => {
                info!(
                    "{name} detector matched: {} wells ({} numeric)",
                    reading.len(),
                    reading.numeric_count()
                );
                return Ok(reading);
            }
            _ => debug!("{name} detector did not match"),
        }
    }
    Err(LayoutError::Unrecognized)
}

// ---------------------------------------------------------------------------
// (a) Labeled grid
// ---------------------------------------------------------------------------

fn is_row_label(cell: &Cell) -> bool {
    label_letter(cell).is_some()
}

fn label_letter(cell: &Cell) -> Option<char> {
    let text = cell.as_text();
    let mut chars = text.chars();
    let c = chars.next()?.to_ascii_uppercase();
    (chars.next().is_none() && ('A'..='H').contains(&c)).then_some(c)
}

/// Integral column header in 1..=12.
fn column_header(cell: &Cell) -> Option<usize> {
    let v = cell.as_number()?;
    if v.fract() != 0.0 || !(1.0..=PLATE_COLS as f64).contains(&v) {
        return None;
    }
    Some(v as usize)
}

/// Longest run of consecutive indices; earliest run wins ties.
fn longest_run(indices: &[usize]) -> Vec<usize> {
    let mut best: Vec<usize> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for &idx in indices {
        if current.last().is_some_and(|&last| idx == last + 1) {
            current.push(idx);
        } else {
            current = vec![idx];
        }
        if current.len() > best.len() {
            best = current.clone();
        }
    }
    best
}

fn detect_labeled_grid(grid: &Grid) -> Option<PlateReading> {
    let (h, w) = (grid.height(), grid.width());

    let (label_col, label_rows) = (0..w).find_map(|c| {
        let hits: Vec<usize> = (0..h).filter(|&r| is_row_label(grid.cell(r, c))).collect();
        let run = longest_run(&hits);
        (run.len() >= 2).then_some((c, run))
    })?;

    let (header_row, header_cols) = (0..h).find_map(|r| {
        let hits: Vec<usize> = (0..w)
            .filter(|&c| column_header(grid.cell(r, c)).is_some())
            .collect();
        let run = longest_run(&hits);
        (run.len() >= 2).then_some((r, run))
    })?;

    debug!(
        "row labels in column {label_col} (rows {:?}), column headers in row {header_row} (columns {:?})",
        label_rows, header_cols
    );

    let mut values = BTreeMap::new();
    for &r in &label_rows {
        let Some(letter) = label_letter(grid.cell(r, label_col)) else {
            continue;
        };
        for &c in &header_cols {
            let Some(number) = column_header(grid.cell(header_row, c)) else {
                continue;
            };
            if let Some(well) = WellId::from_label(letter, number) {
                values.insert(well, grid.cell(r, c).as_number());
            }
        }
    }
    Some(PlateReading::new(values, Layout::LabeledGrid))
}

// ---------------------------------------------------------------------------
// (b) Unlabeled 8×12 block scan
// ---------------------------------------------------------------------------

/// An 8×12 window considered by the block scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlockCandidate {
    /// Grid row of well A1.
    pub row: usize,
    /// Grid column of well A1.
    pub col: usize,
    /// Numeric cells in the window.
    pub numeric: usize,
    pub fraction: f64,
}

fn numeric_in_window(grid: &Grid, row: usize, col: usize) -> usize {
    (row..row + PLATE_ROWS)
        .flat_map(|r| (col..col + PLATE_COLS).map(move |c| (r, c)))
        .filter(|&(r, c)| grid.cell(r, c).as_number().is_some())
        .count()
}

/// Every window position in scan order: anchors row-major, then offsets.
fn windows(grid: &Grid) -> Vec<(usize, usize)> {
    let (h, w) = (grid.height(), grid.width());
    if h < PLATE_ROWS || w < PLATE_COLS {
        return Vec::new();
    }
    let mut out = Vec::new();
    for r0 in 0..(h - (PLATE_ROWS - 1)).max(1) {
        for c0 in 0..(w - (PLATE_COLS - 1)).max(1) {
            for (dr, dc) in BLOCK_OFFSETS {
                let (row, col) = (r0 + dr, c0 + dc);
                if row + PLATE_ROWS <= h && col + PLATE_COLS <= w {
                    out.push((row, col));
                }
            }
        }
    }
    out
}

/// List candidate 8×12 windows whose numeric fraction is at least
/// `min_fraction`, in scan order. Windows reachable from several anchors
/// are listed each time they are visited.
pub fn scan_blocks(grid: &Grid, min_fraction: f64) -> Vec<BlockCandidate> {
    windows(grid)
        .into_iter()
        .filter_map(|(row, col)| {
            let numeric = numeric_in_window(grid, row, col);
            let fraction = numeric as f64 / BLOCK_CELLS as f64;
            (fraction >= min_fraction).then_some(BlockCandidate {
                row,
                col,
                numeric,
                fraction,
            })
        })
        .collect()
}

/// Picks the window with the most numeric cells (earliest in scan order on
/// ties) and accepts it when at least half of its cells are numeric.
fn detect_block(grid: &Grid) -> Option<PlateReading> {
    let mut best: Option<(usize, usize, usize)> = None;
    for (row, col) in windows(grid) {
        let numeric = numeric_in_window(grid, row, col);
        if best.map_or(true, |(_, _, n)| numeric > n) {
            best = Some((row, col, numeric));
        }
        if numeric == BLOCK_CELLS {
            break;
        }
    }
    let (row, col, numeric) = best?;
    if (numeric as f64) < BLOCK_CELLS as f64 * BLOCK_ACCEPT_FRACTION {
        return None;
    }

    let mut values = BTreeMap::new();
    for i in 0..PLATE_ROWS {
        for j in 0..PLATE_COLS {
            if let Some(well) = WellId::from_block_position(i, j) {
                values.insert(well, grid.cell(row + i, col + j).as_number());
            }
        }
    }
    Some(PlateReading::new(values, Layout::Block { row, col }))
}

// ---------------------------------------------------------------------------
// (c) Long format and (d) two-column fallback
// ---------------------------------------------------------------------------

fn pair_columns<'a>(
    rows: impl Iterator<Item = &'a [Cell]>,
    well_col: usize,
    value_col: usize,
) -> BTreeMap<WellId, Option<f64>> {
    let mut values = BTreeMap::new();
    for (i, row) in rows.enumerate() {
        let (Some(well_cell), Some(value_cell)) = (row.get(well_col), row.get(value_col)) else {
            continue;
        };
        match well_cell.as_text().parse::<WellId>() {
            Ok(well) => {
                values.insert(well, value_cell.as_number());
            }
            Err(e) => debug!("skipping row {i}: {e}"),
        }
    }
    values
}

fn detect_long_format(grid: &Grid) -> Option<PlateReading> {
    let header: Vec<String> = grid
        .rows()
        .next()?
        .iter()
        .map(|c| c.as_text().to_lowercase())
        .collect();
    let well_col = header.iter().position(|h| h == "well")?;
    let abs_col = header.iter().position(|h| h.contains("absorb"))?;

    let values = pair_columns(grid.rows().skip(1), well_col, abs_col);
    Some(PlateReading::new(values, Layout::LongFormat))
}

fn detect_two_column(grid: &Grid) -> Option<PlateReading> {
    if grid.width() < 2 {
        return None;
    }
    let values = pair_columns(grid.rows(), 0, 1);
    Some(PlateReading::new(values, Layout::TwoColumn))
}
