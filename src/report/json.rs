use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::calibration::fit::Calibration;
use crate::calibration::groups::GroupSet;
use crate::data::model::Layout;

/// Everything a run produced, in one serialisable record.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub input: &'a Path,
    pub layout: Layout,
    pub wells_read: usize,
    pub groups: &'a GroupSet,
    pub calibration: &'a Calibration,
}

pub fn write_json(path: &Path, report: &RunReport<'_>) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("serialising report")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}
