//! Helpers shared by the integration tests

use std::path::{Path, PathBuf};

use plate_calibrate::cli::{Cli, DEFAULT_OUTPUT};

/// Absorbance written for `well` in the synthetic plates: a perfect line
/// through 0.05 + 0.1·concentration, where the concentration is encoded in
/// the well position.
pub fn synthetic_absorbance(row: usize, col: usize) -> f64 {
    0.05 + 0.1 * concentration_of(row, col)
}

pub fn concentration_of(row: usize, col: usize) -> f64 {
    (row * 12 + col) as f64 / 10.0
}

/// Labeled plate as CSV text: a header row of 1..12 and A..H row labels,
/// shifted down by `top` note lines and right by `left` empty columns.
pub fn labeled_plate_csv(top: usize, left: usize) -> String {
    let pad = ",".repeat(left);
    let mut out = "Plate reader export\n".repeat(top);
    out.push_str(&pad);
    for c in 1..=12 {
        out.push_str(&format!(",{c}"));
    }
    out.push('\n');
    for r in 0..8 {
        out.push_str(&pad);
        out.push((b'A' + r as u8) as char);
        for c in 0..12 {
            out.push_str(&format!(",{:.4}", synthetic_absorbance(r, c)));
        }
        out.push('\n');
    }
    out
}

/// Write `contents` to `name` inside `dir` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn cli_for(input: PathBuf, dir: &Path) -> Cli {
    Cli {
        input,
        output: dir.join(DEFAULT_OUTPUT),
        groups: None,
        json: None,
        sheet: None,
        inspect: false,
    }
}

/// Relative error: |actual - expected| / |expected|
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-10 {
        (actual - expected).abs()
    } else {
        (actual - expected).abs() / expected.abs()
    }
}
