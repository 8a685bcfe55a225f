use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeightInit {
    #[default]
    Xavier,              // Good for tanh activation
    He,                  // Good for ReLU activation
    LeCun,               // Good for SELU activation
    UniformRandom {      // Simple uniform random in range
        min: f32,
        max: f32,
    },
    Constant(f32),
}

impl WeightInit {
    // Box-Muller transform to generate normal distribution
    fn normal_sample<R: Rng>(rng: &mut R, mean: f32, std_dev: f32) -> f32 {
        // 1 - [0, 1) keeps ln away from zero
        let u1: f32 = 1.0 - rng.gen::<f32>();
        let u2: f32 = rng.gen();

        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + std_dev * z
    }

    fn fans(shape: &[usize]) -> (usize, usize) {
        match shape {
            // Dense: [out_features, in_features]
            [out, inp] => (*inp, *out),
            // Conv: [out_channels, in_channels, kernel_h, kernel_w]
            [out, inp, kh, kw] => (inp * kh * kw, out * kh * kw),
            [len] => (1, *len),
            _ => (1, 1),
        }
    }

    /// Draws `shape.iter().product()` values from `rng`.
    pub fn init<R: Rng>(&self, shape: &[usize], rng: &mut R) -> Vec<f32> {
        let total_elements: usize = shape.iter().product();
        let (fan_in, fan_out) = Self::fans(shape);

        match *self {
            WeightInit::Xavier => {
                let limit = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
                let dist = Uniform::new_inclusive(-limit, limit);
                (0..total_elements).map(|_| dist.sample(rng)).collect()
            }

            WeightInit::He => {
                let std_dev = (2.0 / fan_in.max(1) as f32).sqrt();
                (0..total_elements)
                    .map(|_| Self::normal_sample(rng, 0.0, std_dev))
                    .collect()
            }

            WeightInit::LeCun => {
                let std_dev = (1.0 / fan_in.max(1) as f32).sqrt();
                (0..total_elements)
                    .map(|_| Self::normal_sample(rng, 0.0, std_dev))
                    .collect()
            }

            WeightInit::UniformRandom { min, max } => {
                let dist = Uniform::new_inclusive(min.min(max), max.max(min));
                (0..total_elements).map(|_| dist.sample(rng)).collect()
            }

            WeightInit::Constant(value) => vec![value; total_elements],
        }
    }
}
