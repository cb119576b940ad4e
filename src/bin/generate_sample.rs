use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, DictionaryArray, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

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

/// Soil levels; "peat" is declared but never sampled.
const SOILS: [&str; 4] = ["clay", "loam", "sand", "peat"];
const SOIL_EFFECT: [f64; 3] = [0.4, 1.0, -0.3];

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    // 4 fields × 25 plots on a 5×5 grid each
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut elevation = Vec::new();
    let mut soil_keys = Vec::new();
    let mut fields = Vec::new();
    let mut yields = Vec::new();

    for field in 0..4i64 {
        let (ox, oy) = ((field % 2) as f64 * 100.0, (field / 2) as f64 * 100.0);
        for plot in 0..25 {
            let x = ox + (plot % 5) as f64 * 10.0 + rng.gauss(0.0, 1.0);
            let y = oy + (plot / 5) as f64 * 10.0 + rng.gauss(0.0, 1.0);
            let elev = 120.0 + 0.05 * x - 0.02 * y + rng.gauss(0.0, 2.0);
            let soil = (rng.next_u64() % SOIL_EFFECT.len() as u64) as usize;

            xs.push(x);
            ys.push(y);
            elevation.push(elev);
            soil_keys.push(soil as i32);
            fields.push(field);
            yields.push(3.0 + 0.01 * (elev - 120.0) + SOIL_EFFECT[soil] + rng.gauss(0.0, 0.2));
        }
    }

    let soil = DictionaryArray::<Int32Type>::try_new(
        Int32Array::from(soil_keys),
        Arc::new(StringArray::from(SOILS.to_vec())),
    )
    .context("building soil dictionary")?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::Float64, false),
        Field::new("y", DataType::Float64, false),
        Field::new("elevation", DataType::Float64, false),
        Field::new(
            "soil",
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
            false,
        ),
        Field::new("field", DataType::Int64, false),
        Field::new("yield", DataType::Float64, false),
    ]));

    let n_rows = xs.len();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(xs)) as ArrayRef,
            Arc::new(Float64Array::from(ys)),
            Arc::new(Float64Array::from(elevation)),
            Arc::new(soil),
            Arc::new(Int64Array::from(fields)),
            Arc::new(Float64Array::from(yields)),
        ],
    )
    .context("creating record batch")?;

    // Write Parquet
    let output_path = "sample_task.parquet";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    // Matching task config
    let config_path = "sample_task.json";
    let config = serde_json::json!({
        "id": "yield",
        "type": "regr",
        "target": "yield",
        "blocking": "field",
        "fixup": "warn",
        "spatial": true
    });
    std::fs::write(config_path, serde_json::to_string_pretty(&config)?)
        .context("writing task config")?;

    println!("Wrote {n_rows} plots to {output_path} and a task config to {config_path}");
    Ok(())
}
