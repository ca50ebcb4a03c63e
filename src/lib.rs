//! 96-well plate calibration.
//!
//! Reads a plate reader export, detects its layout, fits a blank-corrected
//! least-squares line through declared standards and estimates the
//! concentration of every other well.

pub mod app;
pub mod calibration;
pub mod cli;
pub mod data;
pub mod report;
