use rand::distr::{Distribution, StandardUniform};

use crate::cpu_potential::{CpuLogpFunc, Potential};
use crate::math::{axpy, axpy_out};
use crate::nuts::Result;
use crate::state::State;

/// The direction in simulated time in which a trajectory is extended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.,
            Direction::Backward => -1.,
        }
    }
}

impl Distribution<Direction> for StandardUniform {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Direction {
        if rng.random::<bool>() {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

/// Perform one leapfrog step of length `epsilon`.
///
/// A negative `epsilon` integrates backward in time. Non-finite values
/// returned by the log density are passed through unchanged.
pub(crate) fn leapfrog<F: CpuLogpFunc>(
    potential: &mut Potential<F>,
    start: &State,
    epsilon: f64,
) -> Result<State> {
    let dim = start.q.len();

    let mut p: Box<[f64]> = start.p.clone();
    axpy(&start.grad, &mut p, 0.5 * epsilon);

    let mut q: Box<[f64]> = vec![0f64; dim].into();
    axpy_out(&p, &start.q, epsilon, &mut q);

    let mut out = potential.new_state(q, p)?;
    let State { p, grad, .. } = &mut out;
    axpy(grad, p, 0.5 * epsilon);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu_potential::test_logps::NormalLogp;
    use crate::cpu_potential::LogpFn;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn init_state<F: CpuLogpFunc>(potential: &mut Potential<F>, q: &[f64], p: &[f64]) -> State {
        potential.new_state(q.into(), p.into()).unwrap()
    }

    proptest! {
        #[test]
        fn reversible(
            q in prop::collection::vec(-5f64..5f64, 3),
            p in prop::collection::vec(-5f64..5f64, 3),
            epsilon in 0.001f64..0.8,
        ) {
            let mut potential = Potential::new(NormalLogp::new(3, 0.5));
            let start = init_state(&mut potential, &q, &p);
            let forward = leapfrog(&mut potential, &start, epsilon).unwrap();
            let back = leapfrog(&mut potential, &forward, -epsilon).unwrap();
            for (a, b) in back.q.iter().zip(start.q.iter()) {
                prop_assert!((a - b).abs() < 1e-9);
            }
            for (a, b) in back.p.iter().zip(start.p.iter()) {
                prop_assert!((a - b).abs() < 1e-9);
            }
            prop_assert!((back.logp() - start.logp()).abs() < 1e-9);
        }
    }

    #[test]
    fn single_step() {
        let mut potential = Potential::new(NormalLogp::new(1, 0.));
        let start = init_state(&mut potential, &[1.], &[0.5]);
        let end = leapfrog(&mut potential, &start, 0.1).unwrap();

        let p_half = 0.5 - 0.05 * 1.;
        let q = 1. + 0.1 * p_half;
        let p = p_half - 0.05 * q;
        assert_relative_eq!(end.q[0], q);
        assert_relative_eq!(end.p[0], p);
        assert_relative_eq!(end.logp(), -0.5 * q * q);
        assert_relative_eq!(end.grad[0], -q);
    }

    #[test]
    fn energy_is_nearly_conserved() {
        let mut potential = Potential::new(NormalLogp::new(4, 0.));
        let mut state = init_state(&mut potential, &[1., -2., 0.5, 3.], &[0.3, 0.1, -1., 0.]);
        let initial = state.log_joint();
        for _ in 0..100 {
            state = leapfrog(&mut potential, &state, 0.05).unwrap();
            assert!((state.log_joint() - initial).abs() < 1e-2);
        }
    }

    #[test]
    fn non_finite_values_pass_through() {
        let mut potential = Potential::new(LogpFn::new(1, |x: &[f64], grad: &mut [f64]| {
            if x[0] > 1. {
                grad[0] = f64::NAN;
                f64::NAN
            } else {
                grad[0] = -x[0];
                -0.5 * x[0] * x[0]
            }
        }));
        let start = init_state(&mut potential, &[0.9], &[2.]);
        let end = leapfrog(&mut potential, &start, 0.5).unwrap();
        assert!(end.logp().is_nan());
        assert!(end.p[0].is_nan());
    }

    #[test]
    fn direction_sign() {
        assert_eq!(Direction::Forward.sign(), 1.);
        assert_eq!(Direction::Backward.sign(), -1.);
    }
}
