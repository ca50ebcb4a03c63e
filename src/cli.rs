use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_OUTPUT: &str = "calibration_output.xlsx";

/// Detect a 96-well plate layout, fit a blank-corrected calibration line
/// and estimate sample concentrations.
#[derive(Parser, Debug, Clone)]
#[command(name = "plate-calibrate", version, about)]
pub struct Cli {
    /// Plate file (CSV, TSV, Excel, ODS, JSON or Parquet)
    pub input: PathBuf,

    /// Output Excel file
    #[arg(short, long, default_value = DEFAULT_OUTPUT, env = "PLATE_CALIBRATE_OUTPUT")]
    pub output: PathBuf,

    /// Read group lines ("A1,A2 -> blank", "B1 -> 2.0") from a file instead of prompting
    #[arg(short, long, value_name = "FILE")]
    pub groups: Option<PathBuf>,

    /// Also write the full result as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Worksheet to read from a workbook (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// List candidate 8x12 blocks and the detected layout, then exit
    #[arg(long, default_value_t = false)]
    pub inspect: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_calibration_workbook() {
        let cli = Cli::try_parse_from(["plate-calibrate", "plate.csv"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("plate.csv"));
        if std::env::var_os("PLATE_CALIBRATE_OUTPUT").is_none() {
            assert_eq!(cli.output, PathBuf::from(DEFAULT_OUTPUT));
        }
        assert!(!cli.inspect);
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from([
            "plate-calibrate",
            "plate.xlsx",
            "-o",
            "out.xlsx",
            "--groups",
            "groups.txt",
            "--sheet",
            "Raw",
            "--inspect",
        ])
        .unwrap();
        assert_eq!(cli.output, PathBuf::from("out.xlsx"));
        assert_eq!(cli.groups, Some(PathBuf::from("groups.txt")));
        assert_eq!(cli.sheet.as_deref(), Some("Raw"));
        assert!(cli.inspect);
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["plate-calibrate"]).is_err());
    }
}
