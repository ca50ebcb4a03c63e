//! Blank-corrected linear calibration.
//!
//! Standards are reduced to one point each (concentration, mean absorbance
//! minus the blank mean) and fitted with ordinary least squares:
//!
//! ```text
//! m = Σ(x − x̄)(y − ȳ) / Σ(x − x̄)²      b = ȳ − m·x̄      R² = 1 − SS_res / SS_tot
//! ```
//!
//! Every well outside the declared groups is then inverted through the line
//! to estimate its concentration.

use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

use super::groups::GroupSet;
use crate::data::model::{PlateReading, WellId};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("no standard groups were declared")]
    NoStandards,
    #[error("no numeric values for wells {}", format_wells(.wells))]
    EmptyGroup { wells: Vec<WellId> },
    #[error("zero variance in concentrations; cannot fit")]
    ZeroVariance,
}

fn format_wells(wells: &[WellId]) -> String {
    let names: Vec<String> = wells.iter().map(ToString::to_string).collect();
    format!("[{}]", names.join(", "))
}

// ---------------------------------------------------------------------------
// Least-squares line
// ---------------------------------------------------------------------------

/// y = slope·x + intercept, with its coefficient of determination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Concentration for a blank-subtracted absorbance; `None` for a flat line.
    pub fn invert(&self, y: f64) -> Option<f64> {
        if self.slope == 0.0 {
            None
        } else {
            Some((y - self.intercept) / self.slope)
        }
    }

    pub fn equation(&self) -> String {
        format!("y = {}*x + {}", self.slope, self.intercept)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Ordinary least-squares fit of `ys` against `xs`.
///
/// Fails with [`CalibrationError::ZeroVariance`] when every x is the same,
/// which includes the single-point case.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Result<LinearFit, CalibrationError> {
    let mean_x = mean(xs).ok_or(CalibrationError::NoStandards)?;
    let mean_y = mean(ys).ok_or(CalibrationError::NoStandards)?;

    let num: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let den: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if den == 0.0 {
        return Err(CalibrationError::ZeroVariance);
    }

    let slope = num / den;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
    let r_squared = if ss_tot != 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

// ---------------------------------------------------------------------------
// Calibration over a plate
// ---------------------------------------------------------------------------

/// One standard group reduced to a calibration point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardPoint {
    pub concentration: f64,
    pub wells: Vec<WellId>,
    pub mean_absorbance: f64,
    pub blank_subtracted: f64,
}

/// Estimate for a well outside every group. All fields are `None` when the
/// reading is missing; `concentration` is also `None` for a flat line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleEstimate {
    pub well: WellId,
    pub raw: Option<f64>,
    pub blank_subtracted: Option<f64>,
    pub concentration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calibration {
    pub blank_mean: f64,
    pub fit: LinearFit,
    pub standards: Vec<StandardPoint>,
    pub samples: Vec<SampleEstimate>,
}

/// Numeric readings of `wells`, skipping absent and unreadable wells.
fn numeric_values(reading: &PlateReading, wells: &[WellId]) -> Vec<f64> {
    wells
        .iter()
        .filter_map(|&w| {
            if !reading.contains(w) {
                debug!("well {w} is not on the plate");
            }
            reading.value(w)
        })
        .collect()
}

/// Fit the blank-corrected calibration line and estimate every sample well.
pub fn calibrate(reading: &PlateReading, groups: &GroupSet) -> Result<Calibration, CalibrationError> {
    if !groups.has_standards() {
        return Err(CalibrationError::NoStandards);
    }

    let blank_mean = match mean(&numeric_values(reading, &groups.blanks)) {
        Some(m) => m,
        None => {
            warn!("no numeric blank readings; using a blank mean of 0");
            0.0
        }
    };

    let standards = groups
        .standards
        .iter()
        .map(|group| {
            let mean_absorbance = mean(&numeric_values(reading, &group.wells)).ok_or_else(|| {
                CalibrationError::EmptyGroup {
                    wells: group.wells.clone(),
                }
            })?;
            Ok(StandardPoint {
                concentration: group.concentration,
                wells: group.wells.clone(),
                mean_absorbance,
                blank_subtracted: mean_absorbance - blank_mean,
            })
        })
        .collect::<Result<Vec<_>, CalibrationError>>()?;

    let xs: Vec<f64> = standards.iter().map(|p| p.concentration).collect();
    let ys: Vec<f64> = standards.iter().map(|p| p.blank_subtracted).collect();
    let fit = fit_line(&xs, &ys)?;

    let assigned = groups.assigned();
    let samples = reading
        .iter()
        .filter(|(well, _)| !assigned.contains(well))
        .map(|(well, raw)| {
            let blank_subtracted = raw.map(|v| v - blank_mean);
            SampleEstimate {
                well,
                raw,
                blank_subtracted,
                concentration: blank_subtracted.and_then(|y| fit.invert(y)),
            }
        })
        .collect();

    Ok(Calibration {
        blank_mean,
        fit,
        standards,
        samples,
    })
}
