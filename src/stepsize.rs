//! Heuristic for a first step size, before dual averaging takes over.

use log::debug;

use crate::cpu_potential::{CpuLogpFunc, Potential};
use crate::integrator::leapfrog;
use crate::nuts::{NutsError, Result};
use crate::rng::RngKey;
use crate::state::State;

/// Upper bound on the number of times the step size is halved or doubled.
pub(crate) const MAX_STEP_SIZE_SEARCH: usize = 100;

/// Find a step size for which a single leapfrog step from `init` has an
/// acceptance probability of roughly one half.
///
/// Starting at one, the step size is first halved until the leapfrog step
/// lands on a finite log density and gradient, and then repeatedly doubled
/// or halved until the acceptance probability crosses 0.5. The result only
/// has to be the right order of magnitude.
pub(crate) fn find_reasonable_step_size<F: CpuLogpFunc>(
    potential: &mut Potential<F>,
    init: &State,
    key: RngKey,
) -> Result<(f64, RngKey)> {
    if !init.logp().is_finite() {
        return Err(NutsError::NonFiniteInitialLogp(init.logp()));
    }

    let (key, momentum_key) = key.split();
    let mut start = init.clone();
    start.resample_momentum(momentum_key);
    let initial_joint = start.log_joint();

    let mut step_size = 1f64;
    let mut end = leapfrog(potential, &start, step_size)?;

    let mut halvings = 0;
    while !end.is_finite() {
        if halvings == MAX_STEP_SIZE_SEARCH {
            return Err(NutsError::StepSizeSearch(step_size));
        }
        step_size /= 2.;
        halvings += 1;
        end = leapfrog(potential, &start, step_size)?;
    }

    let log_half = 0.5f64.ln();
    let a = if end.log_joint() - initial_joint > log_half {
        1f64
    } else {
        -1f64
    };

    let mut rescalings = 0;
    while a * (end.log_joint() - initial_joint) > a * log_half {
        if rescalings == MAX_STEP_SIZE_SEARCH {
            return Err(NutsError::StepSizeSearch(step_size));
        }
        step_size *= 2f64.powf(a);
        rescalings += 1;
        end = leapfrog(potential, &start, step_size)?;
    }

    if !(step_size.is_finite() && step_size > 0.) {
        return Err(NutsError::StepSizeSearch(step_size));
    }

    debug!(
        "step size heuristic finished after {} halvings and {} rescalings",
        halvings, rescalings
    );
    Ok((step_size, key))
}
