//! Sample from unnormalized densities with the No-U-Turn Sampler.
//!
//! This is the slice sampling variant of NUTS with dual averaging step
//! size adaptation (Hoffman & Gelman, Algorithm 6). A [`NutsSampler`]
//! drives a single chain. All randomness comes from an explicit
//! [`RngKey`], so a run is fully determined by its settings and key.
//!
//! ```
//! use nuts_slice::{LogpFn, NutsSampler, NutsSettings, RngKey};
//!
//! let logp = LogpFn::new(1, |x: &[f64], grad: &mut [f64]| {
//!     grad[0] = -x[0];
//!     -0.5 * x[0] * x[0]
//! });
//! let settings = NutsSettings {
//!     num_tune: 100,
//!     ..Default::default()
//! };
//! let mut sampler = NutsSampler::new(logp, &[1.], settings).unwrap();
//! let trace = sampler.sample(100, RngKey::new(42)).unwrap();
//! assert_eq!(trace.samples.nrows(), 100);
//! ```

pub(crate) mod cpu_potential;
pub(crate) mod integrator;
pub(crate) mod math;
pub(crate) mod nuts;
pub(crate) mod rng;
pub(crate) mod sampler;
pub(crate) mod state;
pub(crate) mod stepsize;
pub(crate) mod stepsize_dual_avg;

pub use cpu_potential::{CpuLogpFunc, LogpError, LogpFn, NoLogpError};
pub use integrator::Direction;
pub use nuts::{
    AcceptanceStats, Collector, NullCollector, NutsError, NutsOptions, Result, SampleInfo,
    SubtreeInfo,
};
pub use rng::RngKey;
pub use sampler::{NutsSampler, NutsSettings, Trace};
pub use stepsize_dual_avg::{DualAverage, DualAverageOptions};
