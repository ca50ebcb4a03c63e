use std::fmt::Write as _;

use crate::calibration::fit::Calibration;
use crate::data::layout::BlockCandidate;

/// Below this magnitude six decimals would print as zero.
const SCIENTIFIC_BELOW: f64 = 1e-4;

/// Six decimals, or scientific notation for small non-zero values.
fn fmt_num(v: f64) -> String {
    if v != 0.0 && v.abs() < SCIENTIFIC_BELOW {
        format!("{v:.6e}")
    } else {
        format!("{v:.6}")
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_string(), fmt_num)
}

/// One-line summary of the fitted line.
pub fn fit_summary(cal: &Calibration) -> String {
    format!(
        "Fit: y = {} x + {} (R^2={:.4}), blank_mean={}",
        fmt_num(cal.fit.slope),
        fmt_num(cal.fit.intercept),
        cal.fit.r_squared,
        fmt_num(cal.blank_mean)
    )
}

/// Standards and per-sample estimates as plain-text tables.
pub fn render_tables(cal: &Calibration) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Standards:");
    let _ = writeln!(
        out,
        "  {:>14} {:>12} {:>12} {:>12}",
        "Concentration", "MeanAbs", "Blank-sub", "Fitted"
    );
    for p in &cal.standards {
        let _ = writeln!(
            out,
            "  {:>14.6} {:>12.6} {:>12.6} {:>12.6}",
            p.concentration,
            p.mean_absorbance,
            p.blank_subtracted,
            cal.fit.predict(p.concentration)
        );
    }

    let _ = writeln!(out, "Samples:");
    let _ = writeln!(
        out,
        "  {:<5} {:>12} {:>12} {:>14}",
        "Well", "Absorbance", "Blank-sub", "Estimated"
    );
    for s in &cal.samples {
        let _ = writeln!(
            out,
            "  {:<5} {:>12} {:>12} {:>14}",
            s.well.to_string(),
            fmt_opt(s.raw),
            fmt_opt(s.blank_subtracted),
            fmt_opt(s.concentration)
        );
    }
    out
}

/// Listing printed by `--inspect`.
pub fn render_candidates(candidates: &[BlockCandidate]) -> String {
    if candidates.is_empty() {
        return "No candidate 8x12 blocks found (try exporting a simple Well/Absorbance CSV).\n"
            .to_string();
    }
    let mut out = String::new();
    for c in candidates {
        let _ = writeln!(
            out,
            "Candidate block at r={} c={} -> numeric {}/96 ({:.2})",
            c.row, c.col, c.numeric, c.fraction
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::fit::{LinearFit, SampleEstimate, StandardPoint};

    fn calibration() -> Calibration {
        Calibration {
            blank_mean: 0.1,
            fit: LinearFit {
                slope: 0.5,
                intercept: 0.0,
                r_squared: 1.0,
            },
            standards: vec![StandardPoint {
                concentration: 1.0,
                wells: vec!["B1".parse().unwrap()],
                mean_absorbance: 0.6,
                blank_subtracted: 0.5,
            }],
            samples: vec![SampleEstimate {
                well: "D4".parse().unwrap(),
                raw: None,
                blank_subtracted: None,
                concentration: None,
            }],
        }
    }

    #[test]
    fn summary_reports_fit_and_blank() {
        assert_eq!(
            fit_summary(&calibration()),
            "Fit: y = 0.500000 x + 0.000000 (R^2=1.0000), blank_mean=0.100000"
        );
    }

    #[test]
    fn tiny_coefficients_keep_their_digits() {
        let mut cal = calibration();
        cal.fit.slope = 3e-7;
        cal.fit.intercept = -2.5e-5;
        cal.blank_mean = 0.0;
        assert_eq!(
            fit_summary(&cal),
            "Fit: y = 3.000000e-7 x + -2.500000e-5 (R^2=1.0000), blank_mean=0.000000"
        );
    }

    #[test]
    fn sample_estimates_use_scientific_notation_when_small() {
        let mut cal = calibration();
        cal.samples[0].concentration = Some(4.2e-6);
        let tables = render_tables(&cal);
        assert!(tables.contains("4.200000e-6"));
        assert!(!tables.contains("0.000004"));
    }

    #[test]
    fn missing_sample_values_print_as_nan() {
        let tables = render_tables(&calibration());
        let d4 = tables.lines().find(|l| l.trim_start().starts_with("D4")).unwrap();
        assert_eq!(d4.matches("NaN").count(), 3);
    }

    #[test]
    fn no_candidates_suggests_long_format() {
        assert!(render_candidates(&[]).starts_with("No candidate 8x12 blocks"));
    }
}
