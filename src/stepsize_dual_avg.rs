/// Settings for step size adaptation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualAverageOptions {
    /// Exponent of the weight of new iterates in the averaged step size (kappa).
    pub k: f64,
    /// Offset that damps the first iterations.
    pub t0: f64,
    /// Amount of shrinkage towards `log(10 * initial_step)`.
    pub gamma: f64,
}

impl Default for DualAverageOptions {
    fn default() -> DualAverageOptions {
        DualAverageOptions {
            k: 0.75,
            t0: 10.,
            gamma: 0.05,
        }
    }
}

impl DualAverageOptions {
    pub(crate) fn is_valid(&self) -> bool {
        (self.k > 0.5)
            & (self.k <= 1.)
            & (self.t0 >= 0.)
            & self.t0.is_finite()
            & (self.gamma > 0.)
            & self.gamma.is_finite()
    }
}

/// Dual averaging of the log step size towards a target acceptance rate.
#[derive(Debug, Clone)]
pub struct DualAverage {
    log_step: f64,
    log_step_adapted: f64,
    hbar: f64,
    mu: f64,
    count: u64,
    settings: DualAverageOptions,
}

impl DualAverage {
    /// Start the adaptation from `initial_step`.
    ///
    /// The averaged step size starts at one and the iterates are
    /// shrunk towards `10 * initial_step`.
    pub fn new(settings: DualAverageOptions, initial_step: f64) -> DualAverage {
        DualAverage {
            log_step: initial_step.ln(),
            log_step_adapted: 0.,
            hbar: 0.,
            mu: (10. * initial_step).ln(),
            count: 1,
            settings,
        }
    }

    /// Feed the mean acceptance statistic of one trajectory.
    pub fn advance(&mut self, accept_stat: f64, target: f64) {
        let m = self.count as f64;
        let w = 1. / (m + self.settings.t0);
        self.hbar = (1. - w) * self.hbar + w * (target - accept_stat);
        self.log_step = self.mu - self.hbar * m.sqrt() / self.settings.gamma;
        let mk = m.powf(-self.settings.k);
        self.log_step_adapted = mk * self.log_step + (1. - mk) * self.log_step_adapted;
        self.count += 1;
    }

    pub fn current_step_size(&self) -> f64 {
        self.log_step.exp()
    }

    pub fn current_step_size_adapted(&self) -> f64 {
        self.log_step_adapted.exp()
    }

    /// Running average of `target - accept_stat`.
    pub fn hbar(&self) -> f64 {
        self.hbar
    }

    /// Number of completed adaptation steps.
    pub fn count(&self) -> u64 {
        self.count - 1
    }
}
