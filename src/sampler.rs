use faer::Mat;
use log::{info, warn};

use crate::cpu_potential::{CpuLogpFunc, Potential};
use crate::nuts::{draw, Collector, NullCollector, NutsError, NutsOptions, Result, SampleInfo};
use crate::rng::RngKey;
use crate::state::State;
use crate::stepsize::find_reasonable_step_size;
use crate::stepsize_dual_avg::{DualAverage, DualAverageOptions};

/// Settings for the sampler
#[derive(Debug, Clone, Copy)]
pub struct NutsSettings {
    /// The acceptance statistic that step size adaptation aims for.
    pub target_accept: f64,
    /// The number of tuning steps, where we fit the step size.
    /// At least one tuning step is always run.
    pub num_tune: u64,
    /// If the energy error is larger than this threshold we treat the leapfrog
    /// step as a divergence.
    pub max_energy_error: f64,
    /// The maximum tree depth during sampling. The number of leapfrog steps
    /// is smaller than 2 ^ maxdepth.
    pub maxdepth: u64,
    /// Settings for step size adaptation.
    pub step_size_adapt: DualAverageOptions,
    /// Start the adaptation from this step size instead of searching for one.
    pub initial_step_size: Option<f64>,
}

impl Default for NutsSettings {
    fn default() -> Self {
        Self {
            target_accept: 0.6,
            num_tune: 1000,
            max_energy_error: 1000f64,
            maxdepth: 10,
            step_size_adapt: DualAverageOptions::default(),
            initial_step_size: None,
        }
    }
}

impl NutsSettings {
    fn validate(&self) -> Result<()> {
        if !((self.target_accept > 0.) & (self.target_accept < 1.)) {
            return Err(NutsError::InvalidSettings(format!(
                "target_accept must be in (0, 1), got {}",
                self.target_accept
            )));
        }
        if !((self.max_energy_error > 0.) & self.max_energy_error.is_finite()) {
            return Err(NutsError::InvalidSettings(format!(
                "max_energy_error must be positive and finite, got {}",
                self.max_energy_error
            )));
        }
        if self.maxdepth == 0 {
            return Err(NutsError::InvalidSettings(
                "maxdepth must be at least 1".to_string(),
            ));
        }
        if !self.step_size_adapt.is_valid() {
            return Err(NutsError::InvalidSettings(format!(
                "invalid step size adaptation options: {:?}",
                self.step_size_adapt
            )));
        }
        if let Some(step_size) = self.initial_step_size {
            if !((step_size > 0.) & step_size.is_finite()) {
                return Err(NutsError::InvalidSettings(format!(
                    "initial_step_size must be positive and finite, got {}",
                    step_size
                )));
            }
        }
        Ok(())
    }

    fn nuts_options(&self) -> NutsOptions {
        NutsOptions {
            maxdepth: self.maxdepth,
            max_energy_error: self.max_energy_error,
        }
    }
}

/// The result of a call to [`NutsSampler::sample`].
#[derive(Debug)]
pub struct Trace {
    /// The draws after warm-up, one row per draw.
    pub samples: Mat<f64>,
    /// The step size after warm-up, used for all draws.
    pub step_size: f64,
    /// The key to continue sampling with.
    pub key: RngKey,
    /// Statistics of each draw after warm-up.
    pub stats: Vec<SampleInfo>,
}

impl Trace {
    pub fn num_divergences(&self) -> usize {
        self.stats.iter().filter(|info| info.diverging).count()
    }
}

/// A single NUTS chain for a log density.
///
/// Every call to [`sample`](NutsSampler::sample) starts at the initial
/// position and runs a fresh warm-up, so the result only depends on the
/// settings and the key.
pub struct NutsSampler<F: CpuLogpFunc> {
    potential: Potential<F>,
    init: State,
    settings: NutsSettings,
}

impl<F: CpuLogpFunc> NutsSampler<F> {
    pub fn new(logp: F, initial_position: &[f64], settings: NutsSettings) -> Result<Self> {
        settings.validate()?;

        let dim = logp.dim();
        if initial_position.is_empty() {
            return Err(NutsError::EmptyPosition);
        }
        if initial_position.len() != dim {
            return Err(NutsError::DimensionMismatch {
                expected: dim,
                found: initial_position.len(),
            });
        }

        let mut potential = Potential::new(logp);
        let init = potential.new_state(initial_position.into(), vec![0f64; dim].into())?;
        if !init.logp().is_finite() {
            return Err(NutsError::NonFiniteInitialLogp(init.logp()));
        }

        Ok(NutsSampler {
            potential,
            init,
            settings,
        })
    }

    pub fn dim(&self) -> usize {
        self.potential.dim()
    }

    pub fn settings(&self) -> &NutsSettings {
        &self.settings
    }

    /// Total number of log density evaluations of this sampler.
    pub fn n_grad_evals(&self) -> u64 {
        self.potential.n_grad_evals()
    }

    /// Run the warm-up and return `num_draws` draws after it.
    pub fn sample(&mut self, num_draws: usize, key: RngKey) -> Result<Trace> {
        self.sample_with_collector(num_draws, key, &mut NullCollector)
    }

    pub fn sample_with_collector<C: Collector>(
        &mut self,
        num_draws: usize,
        key: RngKey,
        collector: &mut C,
    ) -> Result<Trace> {
        let options = self.settings.nuts_options();
        let num_tune = self.settings.num_tune.max(1);
        let target = self.settings.target_accept;

        let (mut step_size, mut key) = match self.settings.initial_step_size {
            Some(step_size) => (step_size, key),
            None => find_reasonable_step_size(&mut self.potential, &self.init, key)?,
        };
        check_step_size(step_size)?;
        info!("initial step size {:.4e}", step_size);

        let mut adapt = DualAverage::new(self.settings.step_size_adapt, step_size);

        let total = num_tune + num_draws as u64;
        let mut path: Vec<Box<[f64]>> = Vec::with_capacity(total as usize);
        let mut stats = Vec::with_capacity(num_draws);
        let mut current = self.init.clone();

        for m in 1..=total {
            let (result, next) = draw(
                &mut self.potential,
                &current,
                step_size,
                &options,
                &mut *collector,
                key,
            )?;
            key = next;
            collector.register_draw(&result.info);

            if m <= num_tune {
                adapt.advance(result.info.accept.mean(), target);
                step_size = if m == num_tune {
                    adapt.current_step_size_adapted()
                } else {
                    adapt.current_step_size()
                };
                check_step_size(step_size)?;
                collector.register_tune(
                    m,
                    adapt.current_step_size(),
                    adapt.current_step_size_adapted(),
                );
                if m == num_tune {
                    info!(
                        "warm-up finished after {} iterations with step size {:.4e}",
                        num_tune, step_size
                    );
                }
            } else {
                stats.push(result.info);
            }

            path.push(result.state.q.clone());
            current = result.state;
        }

        let num_divergent = stats.iter().filter(|info| info.diverging).count();
        if num_divergent > 0 {
            warn!(
                "{} of {} draws after warm-up diverged",
                num_divergent, num_draws
            );
        }

        let offset = num_tune as usize;
        let samples: Mat<f64> = Mat::from_fn(num_draws, self.dim(), |i, j| path[offset + i][j]);

        Ok(Trace {
            samples,
            step_size,
            key,
            stats,
        })
    }
}

fn check_step_size(step_size: f64) -> Result<()> {
    if (step_size > 0.) & step_size.is_finite() {
        Ok(())
    } else {
        Err(NutsError::InvalidStepSize(step_size))
    }
}
