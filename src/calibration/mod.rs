/// Calibration layer: which wells are blanks and standards, and the fit.
///
/// ```text
///   stdin / --groups file ──► prompt ──► groups (GroupSet)
///                                             │
///                      PlateReading ──────────┤
///                                             ▼
///                                    fit (Calibration)
/// ```
pub mod fit;
pub mod groups;
pub mod prompt;
