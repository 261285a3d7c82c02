//! Write a synthetic multibody result file to browse with `h5plotserie`.
//!
//! Usage: `generate_sample [OUTPUT]` (default `sample.mbsh5`).

use anyhow::{Context, Result};
use ndarray::Array2;

use h5plotserie::data::writer::{add_attribute, add_data, add_group, add_group_with_data, SerieWriter};

const STEPS: usize = 2001;
const DT: f64 = 1e-3;
const GRAVITY: f64 = 9.81;

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

/// Damped pendulum of length `length` released at `phi0`, integrated with
/// semi-implicit Euler. Columns: Time, x, y, phi, omega.
fn pendulum(length: f64, phi0: f64, damping: f64) -> Array2<f64> {
    let (mut phi, mut omega) = (phi0, 0.0);
    let mut states = Array2::zeros((STEPS, 5));
    for (i, mut row) in states.rows_mut().into_iter().enumerate() {
        if i > 0 {
            omega += (-GRAVITY / length * phi.sin() - damping * omega) * DT;
            phi += omega * DT;
        }
        row[0] = i as f64 * DT;
        row[1] = length * phi.sin();
        row[2] = -length * phi.cos();
        row[3] = phi;
        row[4] = omega;
    }
    states
}

fn main() -> Result<()> {
    env_logger::init();
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample.mbsh5".to_string());
    let mut rng = SimpleRng::new(42);

    let writer = SerieWriter::create(&output).with_context(|| format!("creating {output}"))?;
    let root = writer.root();
    add_attribute(root, "Generator", "generate_sample")?;

    let model = add_group(root, "Pendulums", Some("Three damped pendulums"), false)?;
    let bodies = add_group(&model, "RigidBody", None, false)?;
    let joints = add_group(&model, "Joint", None, false)?;

    let mut energy = Array2::<f64>::zeros((STEPS, 2));
    let specs = [(1.0, 0.3, 0.05), (0.5, 0.8, 0.1), (2.0, 1.2, 0.0)];
    for (n, &(length, phi0, damping)) in specs.iter().enumerate() {
        let states = pendulum(length, phi0, damping);
        let body = add_group(&bodies, &format!("Body{}", n + 1), Some("point mass, 1 kg"), false)?;
        add_data(
            &body,
            &["Time", "x", "y", "phi", "omega"],
            &states,
            Some("position and angle of the pendulum bob"),
        )?;

        // rod force with sensor noise
        let force = Array2::from_shape_fn((STEPS, 2), |(i, j)| match j {
            0 => states[[i, 0]],
            _ => {
                let (phi, omega) = (states[[i, 3]], states[[i, 4]]);
                GRAVITY * phi.cos() + length * omega * omega + rng.gauss(0.0, 0.01)
            }
        });
        add_group_with_data(&joints, &format!("Revolute{}", n + 1), &["Time", "F"], &force)?;

        for i in 0..STEPS {
            let (y, omega) = (states[[i, 2]], states[[i, 4]]);
            energy[[i, 0]] = states[[i, 0]];
            energy[[i, 1]] += 0.5 * (length * omega).powi(2) + GRAVITY * (y + length);
        }
    }

    let results = add_group(root, "Results", None, false)?;
    add_data(&results, &["Time", "Energy"], &energy, Some("total mechanical energy"))?;
    writer.flush()?;

    println!("Wrote {} pendulums ({STEPS} steps each) to {output}", specs.len());
    Ok(())
}
