use log::debug;
use thiserror::Error;

use crate::cpu_potential::{CpuLogpFunc, Potential};
use crate::integrator::{leapfrog, Direction};
use crate::rng::RngKey;
use crate::state::State;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NutsError {
    #[error("Logp function returned unrecoverable error")]
    LogpFailure(Box<dyn std::error::Error + Send + Sync>),

    #[error("Invalid sampler settings: {0}")]
    InvalidSettings(String),

    #[error("The initial position must contain at least one value")]
    EmptyPosition,

    #[error("The initial position has dimension {found}, but the log density expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("The log density at the initial position is not finite: {0}")]
    NonFiniteInitialLogp(f64),

    #[error("Could not find a reasonable initial step size (last candidate {0})")]
    StepSizeSearch(f64),

    #[error("Step size adaptation produced an invalid step size: {0}")]
    InvalidStepSize(f64),
}

pub type Result<T> = std::result::Result<T, NutsError>;

/// Options for the trajectory of a single draw.
#[derive(Debug, Clone, Copy)]
pub struct NutsOptions {
    /// Stop doubling the trajectory after this many doublings.
    pub maxdepth: u64,
    /// Largest drop of the joint log density below the slice before
    /// a leapfrog step counts as divergent.
    pub max_energy_error: f64,
}

impl Default for NutsOptions {
    fn default() -> Self {
        NutsOptions {
            maxdepth: 10,
            max_energy_error: 1000.,
        }
    }
}

/// Sum of the pseudo acceptance probabilities of the leapfrog steps of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AcceptanceStats {
    pub sum: f64,
    pub count: u64,
}

impl AcceptanceStats {
    fn single(accept: f64) -> AcceptanceStats {
        AcceptanceStats {
            sum: accept,
            count: 1,
        }
    }

    fn merge(self, other: AcceptanceStats) -> AcceptanceStats {
        AcceptanceStats {
            sum: self.sum + other.sum,
            count: self.count + other.count,
        }
    }

    /// Mean acceptance probability, the statistic used for step size adaptation.
    ///
    /// # Panics
    ///
    /// Every tree contains at least one leapfrog step, so an empty statistic
    /// is a bug and panics.
    pub fn mean(&self) -> f64 {
        assert!(
            self.count > 0,
            "acceptance statistic of a tree without leapfrog steps"
        );
        self.sum / self.count as f64
    }
}

/// Summary of a finished subtree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubtreeInfo {
    pub depth: u64,
    pub direction: Direction,
    /// Number of states of the subtree inside the slice.
    pub size: u64,
    /// False if the subtree diverged or made a U-turn.
    pub can_extend: bool,
    pub diverging: bool,
    pub accept: AcceptanceStats,
}

/// Information about a draw
#[derive(Debug, Clone, PartialEq)]
pub struct SampleInfo {
    /// The number of doublings of the trajectory
    pub depth: u64,

    /// Whether any leapfrog step of the trajectory diverged
    pub diverging: bool,

    /// Whether the trajectory was terminated because it reached
    /// the maximum tree depth.
    pub reached_maxdepth: bool,

    /// Number of leapfrog steps in the whole trajectory
    pub n_steps: u64,

    /// Number of trajectory states inside the slice, including the initial point
    pub tree_size: u64,

    /// Acceptance statistic of the last doubling
    pub accept: AcceptanceStats,
}

/// Callbacks for various events during sampling.
///
/// Collectors can compute statistics like the mean acceptance rate
/// or record where trajectories stopped.
pub trait Collector {
    fn register_subtree(&mut self, _info: &SubtreeInfo) {}
    fn register_draw(&mut self, _info: &SampleInfo) {}
    fn register_tune(&mut self, _iteration: u64, _step_size: f64, _step_size_adapted: f64) {}
}

/// A collector that ignores all events.
pub struct NullCollector;

impl Collector for NullCollector {}

/// A part of the trajectory tree.
///
/// Only the two ends and a single draw are kept, the states in
/// between are dropped as soon as the subtree is merged.
#[derive(Debug)]
pub(crate) struct Subtree {
    /// The end of the subtree that lies furthest backward in time.
    pub(crate) minus: State,
    pub(crate) plus: State,

    /// A draw from the states of the subtree that lie inside the slice.
    pub(crate) draw: State,
    pub(crate) size: u64,
    pub(crate) can_extend: bool,
    pub(crate) diverging: bool,
    pub(crate) accept: AcceptanceStats,
}

impl Subtree {
    /// Merge `other`, which extends `self` in `direction`.
    fn merge(self, other: Subtree, direction: Direction, key: RngKey) -> Subtree {
        let Subtree {
            mut minus,
            mut plus,
            mut draw,
            size,
            diverging,
            accept,
            ..
        } = self;

        match direction {
            Direction::Forward => plus = other.plus,
            Direction::Backward => minus = other.minus,
        }

        let total = size + other.size;
        if key.uniform() < other.size as f64 / total.max(1) as f64 {
            draw = other.draw;
        }

        let can_extend = other.can_extend && !State::is_turning(&minus, &plus);

        Subtree {
            minus,
            plus,
            draw,
            size: total,
            can_extend,
            diverging: diverging | other.diverging,
            accept: accept.merge(other.accept),
        }
    }

    fn info(&self, depth: u64, direction: Direction) -> SubtreeInfo {
        SubtreeInfo {
            depth,
            direction,
            size: self.size,
            can_extend: self.can_extend,
            diverging: self.diverging,
            accept: self.accept,
        }
    }
}

/// Everything that stays fixed while the trajectory of one draw is built.
pub(crate) struct TreeBuilder<'a, F: CpuLogpFunc, C: Collector> {
    pub(crate) potential: &'a mut Potential<F>,
    pub(crate) collector: &'a mut C,
    pub(crate) step_size: f64,
    /// Log of the slice variable.
    pub(crate) log_u: f64,
    /// Joint log density of the initial point of the trajectory.
    pub(crate) initial_joint: f64,
    pub(crate) max_energy_error: f64,
}

impl<F: CpuLogpFunc, C: Collector> TreeBuilder<'_, F, C> {
    /// Build a subtree of `2^depth` leapfrog steps starting next to `start`.
    ///
    /// The doubling stops early as soon as one half of the subtree diverges
    /// or makes a U-turn.
    pub(crate) fn build_tree(
        &mut self,
        start: &State,
        direction: Direction,
        depth: u64,
        key: RngKey,
    ) -> Result<(Subtree, RngKey)> {
        let (tree, key) = if depth == 0 {
            (self.single_step(start, direction)?, key)
        } else {
            self.double(start, direction, depth, key)?
        };
        self.collector.register_subtree(&tree.info(depth, direction));
        Ok((tree, key))
    }

    fn double(
        &mut self,
        start: &State,
        direction: Direction,
        depth: u64,
        key: RngKey,
    ) -> Result<(Subtree, RngKey)> {
        let (inner, key) = self.build_tree(start, direction, depth - 1, key)?;
        if !inner.can_extend {
            return Ok((inner, key));
        }

        let edge = match direction {
            Direction::Forward => &inner.plus,
            Direction::Backward => &inner.minus,
        };
        let (outer, key) = self.build_tree(edge, direction, depth - 1, key)?;

        let (key, choice_key) = key.split();
        Ok((inner.merge(outer, direction, choice_key), key))
    }

    fn single_step(&mut self, start: &State, direction: Direction) -> Result<Subtree> {
        let end = leapfrog(self.potential, start, direction.sign() * self.step_size)?;
        let joint = end.log_joint();

        let size = u64::from(self.log_u <= joint);
        // Comparisons with NaN are false, so a NaN joint density diverges as well
        let can_extend = self.log_u < joint + self.max_energy_error;

        let log_ratio = joint - self.initial_joint;
        let accept = if log_ratio.is_finite() {
            log_ratio.exp().min(1.)
        } else {
            0.
        };

        if !can_extend {
            debug!(
                "divergent leapfrog step: joint log density {} below slice {}",
                joint, self.log_u
            );
        }

        Ok(Subtree {
            minus: end.clone(),
            plus: end.clone(),
            draw: end,
            size,
            can_extend,
            diverging: !can_extend,
            accept: AcceptanceStats::single(accept),
        })
    }
}

/// The result of one iteration of NUTS.
#[derive(Debug)]
pub(crate) struct Draw {
    pub(crate) state: State,
    pub(crate) info: SampleInfo,
}

/// Run one NUTS iteration starting at `init`.
///
/// Draws a new momentum and slice variable, then doubles the trajectory in
/// random directions until it diverges, makes a U-turn or reaches
/// `options.maxdepth`. If no extension is ever accepted, the draw is `init`.
pub(crate) fn draw<F, C>(
    potential: &mut Potential<F>,
    init: &State,
    step_size: f64,
    options: &NutsOptions,
    collector: &mut C,
    key: RngKey,
) -> Result<(Draw, RngKey)>
where
    F: CpuLogpFunc,
    C: Collector,
{
    let (key, momentum_key) = key.split();
    let (mut key, slice_key) = key.split();

    let mut start = init.clone();
    start.resample_momentum(momentum_key);
    let initial_joint = start.log_joint();
    // log(u) for u ~ U(0, exp(initial_joint))
    let log_u = slice_key.uniform().ln() + initial_joint;

    let mut builder = TreeBuilder {
        potential,
        collector,
        step_size,
        log_u,
        initial_joint,
        max_energy_error: options.max_energy_error,
    };

    let mut minus = start.clone();
    let mut plus = start.clone();
    let mut sample = start;
    let mut size = 1u64;
    let mut depth = 0u64;
    let mut can_extend = true;
    let mut diverging = false;
    let mut n_steps = 0u64;
    let mut accept = AcceptanceStats::default();

    while can_extend & (depth < options.maxdepth) {
        let (next, direction_key) = key.split();
        let direction = direction_key.direction();
        let edge = match direction {
            Direction::Forward => &plus,
            Direction::Backward => &minus,
        };
        let (tree, next) = builder.build_tree(edge, direction, depth, next)?;
        key = next;

        match direction {
            Direction::Forward => plus = tree.plus,
            Direction::Backward => minus = tree.minus,
        }

        if tree.can_extend {
            let (next, choice_key) = key.split();
            key = next;
            if choice_key.uniform() < (tree.size as f64 / size as f64).min(1.) {
                sample = tree.draw;
            }
        }

        size += tree.size;
        can_extend = tree.can_extend && !State::is_turning(&minus, &plus);
        diverging |= tree.diverging;
        n_steps += tree.accept.count;
        accept = tree.accept;
        depth += 1;
    }

    let reached_maxdepth = can_extend;
    if reached_maxdepth {
        debug!("trajectory reached the maximum depth {}", options.maxdepth);
    }

    let info = SampleInfo {
        depth,
        diverging,
        reached_maxdepth,
        n_steps,
        tree_size: size,
        accept,
    };
    Ok((
        Draw {
            state: sample,
            info,
        },
        key,
    ))
}
