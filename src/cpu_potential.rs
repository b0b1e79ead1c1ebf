use std::fmt::Debug;

use log::debug;
use thiserror::Error;

use crate::nuts::{NutsError, Result};
use crate::state::State;

/// Errors that happen when we evaluate the logp and gradient function
pub trait LogpError: std::error::Error {
    /// Unrecoverable errors during logp computation stop sampling,
    /// recoverable errors are seen as divergences.
    fn is_recoverable(&self) -> bool;
}

/// The log density of the distribution to sample from, together with its gradient.
///
/// This needs to be implemented by users of the library. The function must be
/// deterministic for a fixed position. Returning a non-finite value for
/// positions outside the support is allowed and is treated as a divergence.
pub trait CpuLogpFunc {
    type LogpError: Debug + Send + Sync + LogpError + 'static;

    /// The dimension of the parameter space.
    fn dim(&self) -> usize;

    /// Compute the unnormalized log density at `position` and write its
    /// gradient into `grad`.
    fn logp(
        &mut self,
        position: &[f64],
        grad: &mut [f64],
    ) -> std::result::Result<f64, Self::LogpError>;
}

/// The error type of a log density that can not fail.
#[derive(Error, Debug)]
pub enum NoLogpError {}

impl LogpError for NoLogpError {
    fn is_recoverable(&self) -> bool {
        match *self {}
    }
}

/// Wrap a closure `(position, grad) -> logp` as a [`CpuLogpFunc`].
pub struct LogpFn<F> {
    dim: usize,
    func: F,
}

impl<F> LogpFn<F>
where
    F: FnMut(&[f64], &mut [f64]) -> f64,
{
    pub fn new(dim: usize, func: F) -> LogpFn<F> {
        LogpFn { dim, func }
    }
}

impl<F> CpuLogpFunc for LogpFn<F>
where
    F: FnMut(&[f64], &mut [f64]) -> f64,
{
    type LogpError = NoLogpError;

    fn dim(&self) -> usize {
        self.dim
    }

    fn logp(
        &mut self,
        position: &[f64],
        grad: &mut [f64],
    ) -> std::result::Result<f64, NoLogpError> {
        Ok((self.func)(position, grad))
    }
}

/// Evaluates the user log density and turns the results into phase space points.
pub(crate) struct Potential<F: CpuLogpFunc> {
    logp: F,
    n_grad_evals: u64,
}

impl<F: CpuLogpFunc> Potential<F> {
    pub(crate) fn new(logp: F) -> Self {
        Potential {
            logp,
            n_grad_evals: 0,
        }
    }

    pub(crate) fn dim(&self) -> usize {
        self.logp.dim()
    }

    /// Total number of gradient evaluations so far.
    pub(crate) fn n_grad_evals(&self) -> u64 {
        self.n_grad_evals
    }

    /// Evaluate the log density at `position` and build a state with momentum `momentum`.
    ///
    /// Recoverable logp errors produce a state with `logp = -inf`, which the
    /// trajectory builder sees as a divergence.
    pub(crate) fn new_state(
        &mut self,
        position: Box<[f64]>,
        momentum: Box<[f64]>,
    ) -> Result<State> {
        assert!(position.len() == self.dim());
        assert!(momentum.len() == self.dim());

        let mut grad: Box<[f64]> = vec![0f64; position.len()].into();
        self.n_grad_evals += 1;
        let logp = match self.logp.logp(&position, &mut grad) {
            Ok(logp) => logp,
            Err(err) if err.is_recoverable() => {
                debug!("recoverable logp error treated as divergence: {}", err);
                grad.fill(f64::NAN);
                f64::NEG_INFINITY
            }
            Err(err) => return Err(NutsError::LogpFailure(Box::new(err))),
        };
        Ok(State::new(position, momentum, grad, logp))
    }
}


#[cfg(test)]
mod tests {
    use super::test_logps::{BoundedLogp, NormalLogp};
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn closure_logp() {
        let mut func = LogpFn::new(2, |x: &[f64], grad: &mut [f64]| {
            grad[0] = -x[0];
            grad[1] = -2. * x[1];
            -0.5 * x[0] * x[0] - x[1] * x[1]
        });
        assert_eq!(func.dim(), 2);
        let mut grad = [0.; 2];
        let logp = func.logp(&[1., 2.], &mut grad).unwrap();
        assert_relative_eq!(logp, -4.5);
        assert_eq!(grad, [-1., -4.]);
    }

    #[test]
    fn new_state_counts_evals() {
        let mut potential = Potential::new(NormalLogp::new(3, 1.));
        let state = potential
            .new_state(vec![1., 2., 3.].into(), vec![0.; 3].into())
            .unwrap();
        assert_relative_eq!(state.logp(), -2.5);
        assert_eq!(&*state.grad, &[0., -1., -2.]);
        assert_eq!(potential.n_grad_evals(), 1);
    }

    #[test]
    fn recoverable_error_is_divergence() {
        let mut potential = Potential::new(BoundedLogp {
            bound: 1.,
            recoverable: true,
        });
        let state = potential
            .new_state(vec![2.].into(), vec![0.].into())
            .unwrap();
        assert_eq!(state.logp(), f64::NEG_INFINITY);
        assert!(!state.is_finite());
    }

    #[test]
    fn unrecoverable_error_fails() {
        let mut potential = Potential::new(BoundedLogp {
            bound: 1.,
            recoverable: false,
        });
        let result = potential.new_state(vec![2.].into(), vec![0.].into());
        assert!(matches!(result, Err(NutsError::LogpFailure(_))));
    }
}
