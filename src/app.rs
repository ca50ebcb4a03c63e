use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use log::info;

use crate::calibration::fit::{calibrate, Calibration};
use crate::calibration::prompt::{prompt_groups, read_group_file};
use crate::cli::Cli;
use crate::data::layout::{read_plate, scan_blocks, INSPECT_FRACTION};
use crate::data::loader::{load_grid, LoadOptions};
use crate::data::model::Grid;
use crate::report::json::{write_json, RunReport};
use crate::report::{console, workbook};

// ---------------------------------------------------------------------------
// One calibration run
// ---------------------------------------------------------------------------

/// Run the pipeline for `cli`, prompting on `input` and printing to `out`.
///
/// Returns the calibration when one was computed; `None` for `--inspect`
/// and for runs without standards.
pub fn run<R: BufRead, W: Write>(cli: &Cli, input: &mut R, out: &mut W) -> Result<Option<Calibration>> {
    let options = LoadOptions {
        sheet: cli.sheet.clone(),
    };
    let grid = load_grid(&cli.input, &options)?;

    if cli.inspect {
        inspect(cli, &grid, out)?;
        return Ok(None);
    }

    let reading = read_plate(&grid).with_context(|| format!("reading {}", cli.input.display()))?;
    writeln!(
        out,
        "Read {} wells from {} ({})",
        reading.len(),
        cli.input.display(),
        reading.layout()
    )?;

    let groups = match &cli.groups {
        Some(path) => read_group_file(path)?,
        None => prompt_groups(input, out)?,
    };
    if !groups.has_standards() {
        writeln!(out, "No standards provided; aborting")?;
        return Ok(None);
    }

    let calibration = calibrate(&reading, &groups)?;
    writeln!(out, "{}", console::fit_summary(&calibration))?;
    write!(out, "{}", console::render_tables(&calibration))?;

    workbook::write_workbook(&cli.output, &calibration)?;
    writeln!(out, "Wrote results to {}", cli.output.display())?;

    if let Some(json_path) = &cli.json {
        let report = RunReport {
            input: &cli.input,
            layout: reading.layout(),
            wells_read: reading.len(),
            groups: &groups,
            calibration: &calibration,
        };
        write_json(json_path, &report)?;
        info!("wrote JSON report to {}", json_path.display());
    }

    Ok(Some(calibration))
}

fn inspect<W: Write>(cli: &Cli, grid: &Grid, out: &mut W) -> Result<()> {
    writeln!(out, "Reading {} ...", cli.input.display())?;
    writeln!(out, "Sheet size: {} rows x {} cols", grid.height(), grid.width())?;
    write!(out, "{}", console::render_candidates(&scan_blocks(grid, INSPECT_FRACTION)))?;
    match read_plate(grid) {
        Ok(reading) => writeln!(
            out,
            "Selected layout: {} ({} wells, {} numeric)",
            reading.layout(),
            reading.len(),
            reading.numeric_count()
        )?,
        Err(e) => writeln!(out, "No layout selected: {e}")?,
    }
    Ok(())
}
