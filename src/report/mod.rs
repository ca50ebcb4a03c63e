/// Output sinks for a finished calibration: terminal text, an `.xlsx`
/// workbook with a chart, and an optional JSON record.
pub mod console;
pub mod json;
pub mod workbook;
