use crate::math::{all_finite, scalar_prods_diff, vector_dot};
use crate::rng::RngKey;

/// A point in phase space: position, momentum and the log density
/// and gradient at the position.
#[derive(Debug, Clone)]
pub(crate) struct State {
    pub(crate) q: Box<[f64]>,
    pub(crate) p: Box<[f64]>,
    pub(crate) grad: Box<[f64]>,
    logp: f64,
}

impl State {
    pub(crate) fn new(q: Box<[f64]>, p: Box<[f64]>, grad: Box<[f64]>, logp: f64) -> State {
        State { q, p, grad, logp }
    }

    pub(crate) fn logp(&self) -> f64 {
        self.logp
    }

    pub(crate) fn kinetic_energy(&self) -> f64 {
        0.5 * vector_dot(&self.p, &self.p)
    }

    /// `logp(q) - p.p / 2`, the log density of the augmented distribution.
    pub(crate) fn log_joint(&self) -> f64 {
        self.logp - self.kinetic_energy()
    }

    /// Whether the log density and gradient are both finite.
    pub(crate) fn is_finite(&self) -> bool {
        self.logp.is_finite() && all_finite(&self.grad)
    }

    /// Replace the momentum with a fresh standard normal draw.
    pub(crate) fn resample_momentum(&mut self, key: RngKey) {
        self.p = key.standard_normal(self.q.len());
    }

    /// U-turn criterion between the two ends of a trajectory.
    ///
    /// The trajectory is turning if moving either end further along its
    /// momentum would decrease the distance between the ends.
    pub(crate) fn is_turning(minus: &State, plus: &State) -> bool {
        let (at_minus, at_plus) = scalar_prods_diff(&plus.q, &minus.q, &minus.p, &plus.p);
        !((at_minus >= 0.) & (at_plus >= 0.))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state(q: &[f64], p: &[f64], logp: f64) -> State {
        State::new(q.into(), p.into(), vec![0.; q.len()].into(), logp)
    }

    #[test]
    fn joint() {
        let s = state(&[1., 2.], &[3., 4.], -1.5);
        assert_relative_eq!(s.kinetic_energy(), 12.5);
        assert_relative_eq!(s.log_joint(), -14.);
        assert!(s.is_finite());
        assert!(!state(&[0.], &[0.], f64::NAN).is_finite());
    }

    #[test]
    fn turning() {
        let minus = state(&[0., 0.], &[1., 0.], 0.);
        let plus = state(&[1., 0.], &[1., 0.], 0.);
        assert!(!State::is_turning(&minus, &plus));

        let plus = state(&[1., 0.], &[-1., 0.], 0.);
        assert!(State::is_turning(&minus, &plus));

        let minus = state(&[0., 0.], &[-0.5, 1.], 0.);
        let plus = state(&[1., 0.], &[1., 0.], 0.);
        assert!(State::is_turning(&minus, &plus));

        // Orthogonal momenta are not a U-turn yet
        let minus = state(&[0., 0.], &[0., 1.], 0.);
        let plus = state(&[1., 0.], &[0., -1.], 0.);
        assert!(!State::is_turning(&minus, &plus));
    }

    #[test]
    fn nan_momentum_is_turning() {
        let minus = state(&[0.], &[f64::NAN], 0.);
        let plus = state(&[1.], &[1.], 0.);
        assert!(State::is_turning(&minus, &plus));
    }

    #[test]
    fn momentum_is_resampled() {
        let mut s = state(&[0.; 4], &[0.; 4], 0.);
        s.resample_momentum(RngKey::new(5));
        assert_eq!(s.p.len(), 4);
        assert!(s.p.iter().all(|p| *p != 0.));
    }
}
