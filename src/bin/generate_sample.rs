use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Absorbance of an empty well.
const BACKGROUND: f64 = 0.05;
/// Absorbance per unit concentration.
const RESPONSE: f64 = 0.12;
const NOISE: f64 = 0.004;

const BLANK_WELLS: [(usize, usize); 3] = [(0, 1), (0, 2), (0, 3)];
/// Row B holds duplicate standards: (first column, concentration).
const STANDARDS: [(usize, f64); 5] = [(1, 0.5), (3, 1.0), (5, 2.0), (7, 5.0), (9, 10.0)];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn concentration_at(row: usize, col: usize, rng: &mut SimpleRng) -> f64 {
    if BLANK_WELLS.contains(&(row, col)) {
        return 0.0;
    }
    if row == 1 {
        if let Some(&(_, conc)) = STANDARDS
            .iter()
            .find(|(first, _)| col == *first || col == first + 1)
        {
            return conc;
        }
    }
    rng.next_f64() * 8.0
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // 8x12 absorbances, row-major.
    let mut plate = [[0.0f64; 12]; 8];
    for (r, row) in plate.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            let conc = concentration_at(r, c + 1, &mut rng);
            *cell = (BACKGROUND + RESPONSE * conc + rng.gauss(0.0, NOISE)).max(0.0);
        }
    }

    // Labeled grid CSV, the layout most plate readers export.
    let csv_path = "sample_plate.csv";
    let mut writer = csv::Writer::from_path(csv_path).context("creating CSV")?;
    let mut header = vec![String::new()];
    header.extend((1..=12).map(|c| c.to_string()));
    writer.write_record(&header)?;
    for (r, row) in plate.iter().enumerate() {
        let mut record = vec![((b'A' + r as u8) as char).to_string()];
        record.extend(row.iter().map(|v| format!("{v:.4}")));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    // Long-format Parquet with Well / Absorbance columns.
    let wells: Vec<String> = (0..8)
        .flat_map(|r| (1..=12).map(move |c| format!("{}{c}", (b'A' + r as u8) as char)))
        .collect();
    let values: Vec<f64> = plate.iter().flatten().copied().collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("Well", DataType::Utf8, false),
        Field::new("Absorbance", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(
                wells.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(values)),
        ],
    )
    .context("building record batch")?;

    let parquet_path = "sample_plate.parquet";
    let file = std::fs::File::create(parquet_path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch)?;
    writer.close()?;

    println!("Wrote 96 wells to {csv_path} and {parquet_path}");
    println!("Group lines for this plate:");
    let blanks: Vec<String> = BLANK_WELLS
        .iter()
        .map(|&(r, c)| format!("{}{c}", (b'A' + r as u8) as char))
        .collect();
    println!("  {} -> blank", blanks.join(","));
    for (first, conc) in STANDARDS {
        println!("  B{},B{} -> {conc}", first, first + 1);
    }
    Ok(())
}
