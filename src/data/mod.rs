/// Data layer: raw cells, loading, and plate layout detection.
///
/// Architecture:
/// ```text
///  .csv / .xlsx / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Grid (rows × cells)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  layout   │  labeled grid → 8x12 block → long format → two columns
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ PlateReading  │  WellId → Option<f64>
///   └──────────────┘
/// ```

pub mod layout;
pub mod loader;
pub mod model;
