//! Sample a 10 dimensional normal distribution with mean 3 and
//! print the posterior means.

use anyhow::Result;
use nuts_slice::{CpuLogpFunc, LogpError, NutsSampler, NutsSettings, RngKey};
use thiserror::Error;

// The density might fail in a recoverable or non-recoverable manner...
#[derive(Debug, Error)]
enum PosteriorLogpError {}

impl LogpError for PosteriorLogpError {
    fn is_recoverable(&self) -> bool {
        false
    }
}

struct PosteriorDensity {
    mu: f64,
}

impl CpuLogpFunc for PosteriorDensity {
    type LogpError = PosteriorLogpError;

    fn dim(&self) -> usize {
        10
    }

    fn logp(&mut self, position: &[f64], grad: &mut [f64]) -> Result<f64, Self::LogpError> {
        let logp = position
            .iter()
            .zip(grad.iter_mut())
            .map(|(x, grad)| {
                let diff = x - self.mu;
                *grad = -diff;
                -diff * diff / 2.
            })
            .sum();
        Ok(logp)
    }
}

fn main() -> Result<()> {
    let settings = NutsSettings {
        num_tune: 500,
        target_accept: 0.8,
        ..Default::default()
    };
    let mut sampler = NutsSampler::new(PosteriorDensity { mu: 3. }, &[0.; 10], settings)?;
    let trace = sampler.sample(1000, RngKey::new(42))?;

    let num_draws = trace.samples.nrows();
    let means: Vec<f64> = (0..trace.samples.ncols())
        .map(|j| (0..num_draws).map(|i| trace.samples[(i, j)]).sum::<f64>() / num_draws as f64)
        .collect();

    println!("step size: {:.4}", trace.step_size);
    println!("divergences: {}", trace.num_divergences());
    println!("gradient evaluations: {}", sampler.n_grad_evals());
    println!("posterior means: {:.3?}", means);
    Ok(())
}
