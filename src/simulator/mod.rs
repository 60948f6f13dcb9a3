//! Two-phase kinetic simulator for covalent enzyme inhibition
//!
//! The simulated mechanism has two sequential phases:
//!
//! 1. **Pre-incubation**: enzyme and inhibitor react 1:1 into an irreversible
//!    complex at rate `kinact * I / (I + KI) * E`. No substrate is present.
//! 2. **Incubation**: the mixture is diluted, substrate is added once, and
//!    product forms under competitive-inhibition Michaelis-Menten kinetics
//!    while the remaining free inhibitor keeps inactivating the enzyme,
//!    slowed by substrate protection.
//!
//! Each phase is integrated with fixed-step forward Euler over exactly
//! [PHASE_STEPS] equal sub-intervals, whatever the phase duration. Per-step
//! deltas are clamped to the available concentrations, so every intermediate
//! state stays nonnegative. The discretization error this introduces for fast
//! kinetics is an accepted property of the model, not something the simulator
//! tries to correct adaptively.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::Assay;

/// Number of forward-Euler sub-intervals per phase
pub const PHASE_STEPS: usize = 100;

// ============================================================================
// Candidate parameters
// ============================================================================

/// The inhibitor parameter pair being estimated
///
/// `kinact` is the maximal inactivation rate constant and `KI` the inhibitor
/// concentration at half-maximal inactivation. Both must be nonnegative; the
/// optimizer's box bounds enforce this, not the type itself.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct InhibitionParams {
    kinact: f64,
    ki: f64,
}

impl InhibitionParams {
    /// Constructs a parameter pair
    pub fn new(kinact: f64, ki: f64) -> Self {
        Self { kinact, ki }
    }

    /// Maximal inactivation rate constant
    pub fn kinact(&self) -> f64 {
        self.kinact
    }

    /// Inhibitor concentration at half-maximal inactivation
    pub fn ki(&self) -> f64 {
        self.ki
    }

    /// Convert to a vector of values, ordered (kinact, KI)
    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.kinact, self.ki]
    }

    /// Create from a slice of values, ordered (kinact, KI)
    ///
    /// # Panics
    ///
    /// Panics if the slice holds fewer than two values.
    pub fn from_slice(values: &[f64]) -> Self {
        Self {
            kinact: values[0],
            ki: values[1],
        }
    }
}

impl Default for InhibitionParams {
    /// The conventional starting estimate (1, 1)
    fn default() -> Self {
        Self {
            kinact: 1.0,
            ki: 1.0,
        }
    }
}

impl fmt::Display for InhibitionParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "kinact {:.6}, KI {:.6}", self.kinact, self.ki)
    }
}

// ============================================================================
// Reaction state
// ============================================================================

/// Concentrations tracked through the integration
///
/// Plain accumulator value type; the stepping functions mutate it in place.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReactionState {
    /// Free enzyme concentration
    pub enzyme: f64,
    /// Free inhibitor concentration
    pub inhibitor: f64,
    /// Substrate concentration
    pub substrate: f64,
    /// Product concentration
    pub product: f64,
}

// ============================================================================
// Rate laws
// ============================================================================

/// Enzyme inactivation rate during pre-incubation, `kinact * I/(I + KI) * E`
///
/// Defined as zero when no inhibitor is present, which also covers the 0/0
/// corner at `KI = 0`.
#[inline]
pub fn inactivation_rate(kinact: f64, ki: f64, inhibitor: f64, enzyme: f64) -> f64 {
    if inhibitor == 0.0 {
        return 0.0;
    }
    kinact * inhibitor / (inhibitor + ki) * enzyme
}

/// Enzyme inactivation rate in the presence of substrate
///
/// Substrate competitively protects the enzyme: the apparent KI is scaled by
/// `1 + S/Km`. Zero when no inhibitor is present.
#[inline]
pub fn protected_inactivation_rate(
    kinact: f64,
    ki: f64,
    inhibitor: f64,
    enzyme: f64,
    substrate: f64,
    km: f64,
) -> f64 {
    if inhibitor == 0.0 {
        return 0.0;
    }
    kinact * (inhibitor / (inhibitor + ki * (1.0 + substrate / km))) * enzyme
}

/// Product formation rate under competitive inhibition,
/// `kcat * E * S / (S + Km * (1 + I/KI))`
///
/// The competitive factor is one when no inhibitor is present. For `KI = 0`
/// with inhibitor present the factor diverges and the rate goes to zero,
/// which is the correct physical limit.
#[inline]
pub fn catalytic_rate(
    kcat: f64,
    enzyme: f64,
    substrate: f64,
    inhibitor: f64,
    ki: f64,
    km: f64,
) -> f64 {
    let competition = if inhibitor == 0.0 {
        1.0
    } else {
        1.0 + inhibitor / ki
    };
    kcat * enzyme * substrate / (substrate + km * competition)
}

// ============================================================================
// Endpoint simulation
// ============================================================================

/// One Euler step of the pre-incubation phase
///
/// The enzyme-inhibitor delta is clamped to both available pools; they are
/// consumed 1:1 by irreversible complex formation.
fn pre_incubation_step(state: &mut ReactionState, params: &InhibitionParams, dt: f64) {
    let delta = (inactivation_rate(params.kinact, params.ki, state.inhibitor, state.enzyme) * dt)
        .min(state.enzyme)
        .min(state.inhibitor);
    state.enzyme = (state.enzyme - delta).max(0.0);
    state.inhibitor = (state.inhibitor - delta).max(0.0);
}

/// One Euler step of the incubation phase
///
/// Both rates are evaluated on the same incoming state before either delta
/// is applied.
fn incubation_step(state: &mut ReactionState, params: &InhibitionParams, assay: &Assay, dt: f64) {
    let converted = (catalytic_rate(
        assay.kcat(),
        state.enzyme,
        state.substrate,
        state.inhibitor,
        params.ki,
        assay.km(),
    ) * dt)
        .min(state.substrate);
    let inactivated = (protected_inactivation_rate(
        params.kinact,
        params.ki,
        state.inhibitor,
        state.enzyme,
        state.substrate,
        assay.km(),
    ) * dt)
        .min(state.enzyme)
        .min(state.inhibitor);

    state.substrate = (state.substrate - converted).max(0.0);
    state.product += converted;
    state.enzyme = (state.enzyme - inactivated).max(0.0);
    state.inhibitor = (state.inhibitor - inactivated).max(0.0);
}

/// Dilute enzyme and inhibitor and introduce the substrate, exactly once,
/// between the two phases
fn apply_transition(state: &mut ReactionState, assay: &Assay) {
    state.substrate += assay.added_substrate();
    state.enzyme *= assay.dilution_factor();
    state.inhibitor *= assay.dilution_factor();
}

/// Simulate one observation to its endpoint product concentration
///
/// Integrates the pre-incubation phase from `(E, I, 0, 0)`, applies the
/// dilution transition, integrates the incubation phase, and returns the
/// final product concentration. Pure function of its inputs.
///
/// Nonnegative `kinact`/`KI` are a precondition enforced by the fitting
/// bounds, not checked here.
pub fn simulate_endpoint(
    params: &InhibitionParams,
    assay: &Assay,
    pre_incubation_time: f64,
    incubation_time: f64,
    inhibitor_conc: f64,
) -> f64 {
    let mut state = ReactionState {
        enzyme: assay.enzyme_conc(),
        inhibitor: inhibitor_conc,
        substrate: 0.0,
        product: 0.0,
    };

    let dt = pre_incubation_time / PHASE_STEPS as f64;
    for _ in 0..PHASE_STEPS {
        pre_incubation_step(&mut state, params, dt);
    }

    apply_transition(&mut state, assay);

    let dt = incubation_time / PHASE_STEPS as f64;
    for _ in 0..PHASE_STEPS {
        incubation_step(&mut state, params, assay, dt);
    }

    state.product
}
