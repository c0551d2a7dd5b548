//! Core physics for the point-kinetics reactor model
//!
//! Pure functions over the current state and configuration. Each update is
//! forward Euler with clamping to plausible bounds, so out-of-range inputs
//! degrade gracefully instead of diverging. The stepper in `reactor` calls
//! these in a fixed order once per timestep.

use ndarray::Array1;

use crate::config::ReactorConfig;

/// Number of delayed neutron groups
pub const NUM_DELAYED_GROUPS: usize = 6;

/// Delayed neutron fractions βᵢ per group
///
/// - Group 1: β₁=0.000215, T₁/₂=55.9s
/// - Group 2: β₂=0.001424, T₁/₂=22.7s
/// - Group 3: β₃=0.001274, T₁/₂=6.24s
/// - Group 4: β₄=0.002568, T₁/₂=2.30s
/// - Group 5: β₅=0.000748, T₁/₂=0.61s
/// - Group 6: β₆=0.000273, T₁/₂=0.23s
pub const DELAYED_BETAS: [f64; NUM_DELAYED_GROUPS] =
    [0.000215, 0.001424, 0.001274, 0.002568, 0.000748, 0.000273];

/// Precursor decay constants λᵢ per group [1/s]
pub const DELAYED_LAMBDAS: [f64; NUM_DELAYED_GROUPS] = [0.0124, 0.0305, 0.111, 0.301, 1.14, 3.01];

/// Total delayed fraction Σβᵢ (defines 1 dollar of reactivity)
pub const BETA_EFF: f64 = 0.006502;

/// 1 pcm = 1e-5 Δk/k
pub const PCM: f64 = 1.0e5;

/// keff clamp range
pub const KEFF_MIN: f64 = 0.85;
pub const KEFF_MAX: f64 = 1.15;

/// Below this |ρ| the period is reported as infinite
const REACTIVITY_EPSILON: f64 = 1.0e-6;

/// Startup rate conversion: SUR [DPM] = 26.06 / period [s]
const STARTUP_RATE_CONSTANT: f64 = 26.06;

/// ρ below which the density update switches to the quasi-static branch
const QUASI_STATIC_THRESHOLD: f64 = -0.01;

/// Relaxation rate toward the subcritical equilibrium level [1/s]
const SUBCRITICAL_RELAX_RATE: f64 = 0.5;

/// Per-step cap on |dn/dt| as a fraction of the current density
const MAX_DENSITY_CHANGE_FRACTION: f64 = 0.2;

/// Power clamp as a multiple of nominal full power
const POWER_CLAMP_FACTOR: f64 = 1.2;

// ============================================================================
// Reactivity models
// ============================================================================

/// Control rod worth as a function of insertion [pcm].
///
/// Linear from `rod_max_positive_pcm` (fully withdrawn) down to zero at the
/// critical fraction, then a tanh saturation toward `-rod_max_negative_pcm`
/// fully inserted. Continuous at the critical fraction, monotonically
/// non-increasing over the full travel.
pub fn rod_worth(position_pct: f64, cfg: &ReactorConfig) -> f64 {
    let x = (position_pct / 100.0).clamp(0.0, 1.0);
    let c = cfg.rod_critical_fraction;
    if x <= c {
        cfg.rod_max_positive_pcm * (1.0 - x / c)
    } else {
        let fraction = (x - c) / (1.0 - c);
        -cfg.rod_max_negative_pcm * (2.0 * fraction).tanh()
    }
}

/// Combined fuel (Doppler) and coolant (moderator) feedback [pcm].
pub fn temperature_reactivity(fuel_temp_c: f64, coolant_temp_c: f64, cfg: &ReactorConfig) -> f64 {
    cfg.fuel_temp_coeff_pcm_per_c * (fuel_temp_c - cfg.reference_temp_c)
        + cfg.coolant_temp_coeff_pcm_per_c * (coolant_temp_c - cfg.reference_temp_c)
}

/// Xenon poisoning worth, linear in normalized concentration [pcm].
pub fn xenon_reactivity(xenon_conc: f64, cfg: &ReactorConfig) -> f64 {
    cfg.xenon_max_worth_pcm * xenon_conc
}

// ============================================================================
// Point kinetics
// ============================================================================

/// k-effective from dimensionless reactivity, clamped to [0.85, 1.15].
pub fn keff_from_reactivity(rho: f64) -> f64 {
    (1.0 / (1.0 - rho)).clamp(KEFF_MIN, KEFF_MAX)
}

/// Reactor period [s] by reactivity regime.
///
/// Returns ±infinity for |ρ| below epsilon. The sign of the period matches
/// the sign of the reactivity.
pub fn reactor_period(rho: f64, cfg: &ReactorConfig) -> f64 {
    let lambda = cfg.generation_time_s;
    if rho.abs() < REACTIVITY_EPSILON {
        f64::INFINITY
    } else if rho > BETA_EFF {
        // Prompt-critical regime
        lambda / (rho - BETA_EFF)
    } else if rho > 0.0 {
        BETA_EFF / (rho * lambda)
    } else {
        -lambda / rho.abs()
    }
}

/// Time for the neutron population to change by a factor of 2 [s].
pub fn doubling_time(period_s: f64) -> f64 {
    if period_s.is_finite() {
        period_s * std::f64::consts::LN_2
    } else {
        period_s
    }
}

/// Startup rate [decades per minute], zero when the period is too short to
/// be meaningful or infinite.
pub fn startup_rate(period_s: f64) -> f64 {
    if period_s.abs() > 0.1 {
        STARTUP_RATE_CONSTANT / period_s
    } else {
        0.0
    }
}

/// Reactivity in dollars (1$ = β_eff).
pub fn reactivity_to_dollars(rho: f64) -> f64 {
    rho / BETA_EFF
}

/// Steady-state precursor concentrations for a given density:
/// Cᵢ = βᵢ·n / (λᵢ·Λ)
pub fn equilibrium_precursors(
    neutron_density: f64,
    cfg: &ReactorConfig,
) -> [f64; NUM_DELAYED_GROUPS] {
    let mut precursors = [0.0; NUM_DELAYED_GROUPS];
    for i in 0..NUM_DELAYED_GROUPS {
        precursors[i] =
            DELAYED_BETAS[i] * neutron_density / (DELAYED_LAMBDAS[i] * cfg.generation_time_s);
    }
    precursors
}

/// Advance the neutron density by one step.
///
/// Deep subcritical (ρ < -0.01) the density relaxes toward the source-driven
/// equilibrium level source/(1-keff); the stiff prompt term is not integrated
/// there. Otherwise forward-Euler point kinetics with the per-step rate
/// limiter. Result clamped to [source, 1.0].
pub fn advance_neutron_density(
    neutron_density: f64,
    precursors: &[f64; NUM_DELAYED_GROUPS],
    rho: f64,
    keff: f64,
    cfg: &ReactorConfig,
    dt: f64,
) -> f64 {
    let next = if rho < QUASI_STATIC_THRESHOLD {
        let equilibrium = cfg.source_strength / (1.0 - keff);
        let fraction = (dt * SUBCRITICAL_RELAX_RATE).min(1.0);
        neutron_density + (equilibrium - neutron_density) * fraction
    } else {
        let prompt = (rho - BETA_EFF) / cfg.generation_time_s * neutron_density;
        let delayed: f64 = DELAYED_LAMBDAS
            .iter()
            .zip(precursors.iter())
            .map(|(lambda, c)| lambda * c)
            .sum();
        let source = cfg.source_strength / cfg.generation_time_s;
        let limit = MAX_DENSITY_CHANGE_FRACTION / dt * neutron_density;
        let dndt = (prompt + delayed + source).clamp(-limit, limit);
        neutron_density + dndt * dt
    };
    next.clamp(cfg.source_strength, 1.0)
}

/// Advance all six precursor groups by one step:
/// dCᵢ/dt = (βᵢ/Λ)·n − λᵢ·Cᵢ
pub fn advance_precursors(
    neutron_density: f64,
    precursors: &[f64; NUM_DELAYED_GROUPS],
    cfg: &ReactorConfig,
    dt: f64,
) -> [f64; NUM_DELAYED_GROUPS] {
    let mut next = [0.0; NUM_DELAYED_GROUPS];
    for i in 0..NUM_DELAYED_GROUPS {
        let dcdt = DELAYED_BETAS[i] / cfg.generation_time_s * neutron_density
            - DELAYED_LAMBDAS[i] * precursors[i];
        next[i] = (precursors[i] + dcdt * dt).max(0.0);
    }
    next
}

/// Thermal power [MW] through a first-order lag of the density-derived
/// target, clamped to [0, 1.2 × nominal].
pub fn advance_thermal_power(
    thermal_power_mw: f64,
    neutron_density: f64,
    cfg: &ReactorConfig,
    dt: f64,
) -> f64 {
    let target = neutron_density * cfg.max_power_mw / cfg.reference_density;
    let alpha = (dt / cfg.power_lag_time_constant_s).min(1.0);
    let next = thermal_power_mw + (target - thermal_power_mw) * alpha;
    next.clamp(0.0, POWER_CLAMP_FACTOR * cfg.max_power_mw)
}

// ============================================================================
// Thermal-hydraulics
// ============================================================================

// Effective two-node heat balance constants. These override the nominally
// named capacities and transfer coefficient in the configuration.
const FUEL_HEAT_CAPACITY: f64 = 20.0; // [MW·s/°C]
const COOLANT_HEAT_CAPACITY: f64 = 100.0; // [MW·s/°C]
const HEAT_TRANSFER_COEFF: f64 = 1.2; // [MW/°C]
const REMOVAL_POWER_FRACTION: f64 = 0.85;
const REMOVAL_TEMP_COEFF: f64 = 0.3; // [MW/°C]
const AMBIENT_LOSS_COEFF: f64 = 0.02; // [MW/°C]

/// Advance the two-node (fuel, coolant) heat balance by one step.
///
/// Heat removed from the coolant cannot exceed the heat actually transferred
/// in from the fuel. Fuel clamps to [min, max + margin], coolant to
/// [min, max].
pub fn advance_temperatures(
    power_mw: f64,
    fuel_temp_c: f64,
    coolant_temp_c: f64,
    cfg: &ReactorConfig,
    dt: f64,
) -> (f64, f64) {
    let transfer = HEAT_TRANSFER_COEFF * (fuel_temp_c - coolant_temp_c);
    let removal = (REMOVAL_POWER_FRACTION * power_mw
        + REMOVAL_TEMP_COEFF * (coolant_temp_c - cfg.min_temp_c))
        .min(transfer);
    let ambient = AMBIENT_LOSS_COEFF * (coolant_temp_c - cfg.min_temp_c);

    let fuel_next = fuel_temp_c + dt * (power_mw - transfer) / FUEL_HEAT_CAPACITY;
    let coolant_next = coolant_temp_c + dt * (transfer - removal - ambient) / COOLANT_HEAT_CAPACITY;

    (
        fuel_next.clamp(cfg.min_temp_c, cfg.max_temp_c + cfg.fuel_temp_margin_c),
        coolant_next.clamp(cfg.min_temp_c, cfg.max_temp_c),
    )
}

// ============================================================================
// Xenon dynamics
// ============================================================================

/// Advance the iodine/xenon chain by one step, driven by normalized flux
/// (thermal power over nominal). Both concentrations clamp to [0, 1].
pub fn advance_xenon(
    iodine_conc: f64,
    xenon_conc: f64,
    flux: f64,
    cfg: &ReactorConfig,
    dt: f64,
) -> (f64, f64) {
    let didt = cfg.iodine_yield * flux - cfg.iodine_decay * iodine_conc;
    let xenon_gain = cfg.iodine_decay * iodine_conc + cfg.xenon_direct_yield * flux;
    let xenon_loss = cfg.xenon_decay * xenon_conc + cfg.xenon_burnup * flux * xenon_conc;

    (
        (iodine_conc + didt * dt).clamp(0.0, 1.0),
        (xenon_conc + (xenon_gain - xenon_loss) * dt).clamp(0.0, 1.0),
    )
}

// ============================================================================
// Axial flux profile
// ============================================================================

/// Parabolic axial flux shape scaled by the current neutron density.
pub fn axial_flux_profile(n_points: usize, neutron_density: f64) -> Array1<f64> {
    if n_points < 2 {
        return Array1::from_elem(n_points, neutron_density);
    }
    let half = (n_points as f64 - 1.0) / 2.0;
    Array1::from_shape_fn(n_points, |i| {
        let z = (i as f64 - half) / half;
        (1.0 - z * z).max(0.0) * neutron_density
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn cfg() -> ReactorConfig {
        ReactorConfig::default()
    }

    #[test]
    fn test_rod_worth_continuous_at_critical_fraction() {
        let cfg = cfg();
        let c_pct = cfg.rod_critical_fraction * 100.0;
        let below = rod_worth(c_pct - 1e-9, &cfg);
        let above = rod_worth(c_pct + 1e-9, &cfg);
        assert_abs_diff_eq!(below, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(above, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_rod_worth_monotonically_non_increasing() {
        let cfg = cfg();
        let mut last = f64::INFINITY;
        for i in 0..=1000 {
            let worth = rod_worth(i as f64 / 10.0, &cfg);
            assert!(worth <= last + 1e-9, "worth increased at {}%", i as f64 / 10.0);
            last = worth;
        }
    }

    #[test]
    fn test_rod_worth_endpoints() {
        let cfg = cfg();
        assert_relative_eq!(rod_worth(0.0, &cfg), cfg.rod_max_positive_pcm);
        // tanh(2) of full insertion, not the full asymptotic worth
        let full = rod_worth(100.0, &cfg);
        assert!(full < -4800.0 && full > -cfg.rod_max_negative_pcm);
    }

    #[test]
    fn test_temperature_feedback_negative_above_reference() {
        let cfg = cfg();
        assert!(temperature_reactivity(700.0, 700.0, &cfg) < 0.0);
        assert!(temperature_reactivity(600.0, 600.0, &cfg) > 0.0);
        assert_abs_diff_eq!(
            temperature_reactivity(cfg.reference_temp_c, cfg.reference_temp_c, &cfg),
            0.0
        );
    }

    #[test]
    fn test_keff_clamped() {
        assert_abs_diff_eq!(keff_from_reactivity(0.0), 1.0);
        assert_abs_diff_eq!(keff_from_reactivity(0.9999999), KEFF_MAX);
        assert_abs_diff_eq!(keff_from_reactivity(-10.0), KEFF_MIN);
    }

    #[test]
    fn test_period_regimes() {
        let cfg = cfg();
        assert!(reactor_period(0.0, &cfg).is_infinite());
        // Delayed regime: positive, sign matches reactivity
        assert!(reactor_period(0.001, &cfg) > 0.0);
        // Prompt regime: Λ/(ρ-β)
        let prompt = reactor_period(2.0 * BETA_EFF, &cfg);
        assert_relative_eq!(prompt, cfg.generation_time_s / BETA_EFF, max_relative = 1e-12);
        // Negative reactivity gives a negative period
        assert!(reactor_period(-0.005, &cfg) < 0.0);
    }

    #[test]
    fn test_startup_rate_zero_when_period_infinite_or_short() {
        assert_abs_diff_eq!(startup_rate(f64::INFINITY), 0.0);
        assert_abs_diff_eq!(startup_rate(0.05), 0.0);
        assert_relative_eq!(startup_rate(26.06), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_doubling_time_follows_period() {
        assert!(doubling_time(f64::INFINITY).is_infinite());
        assert_relative_eq!(doubling_time(10.0), 10.0 * std::f64::consts::LN_2);
        assert!(doubling_time(-5.0) < 0.0);
    }

    #[test]
    fn test_precursors_stable_at_equilibrium() {
        let cfg = cfg();
        let n = 0.5;
        let eq = equilibrium_precursors(n, &cfg);
        let next = advance_precursors(n, &eq, &cfg, 0.05);
        for i in 0..NUM_DELAYED_GROUPS {
            assert_relative_eq!(next[i], eq[i], max_relative = 1e-9);
        }
    }

    #[test]
    fn test_density_stable_at_zero_reactivity() {
        let cfg = cfg();
        let n = 0.5;
        let eq = equilibrium_precursors(n, &cfg);
        let keff = keff_from_reactivity(0.0);
        let next = advance_neutron_density(n, &eq, 0.0, keff, &cfg, 0.05);
        // Only the external source drives growth at exact criticality
        assert!(next >= n);
        assert!(next - n < 1e-4);
    }

    #[test]
    fn test_density_clamped_to_source_floor_and_unity() {
        let cfg = cfg();
        let eq = equilibrium_precursors(1.0, &cfg);
        let high = advance_neutron_density(1.0, &eq, 0.05, keff_from_reactivity(0.05), &cfg, 0.05);
        assert!(high <= 1.0);
        let low =
            advance_neutron_density(0.0, &eq, -0.05, keff_from_reactivity(-0.05), &cfg, 0.05);
        assert!(low >= cfg.source_strength);
    }

    #[test]
    fn test_quasi_static_branch_relaxes_toward_equilibrium() {
        let cfg = cfg();
        let rho = -0.05;
        let keff = keff_from_reactivity(rho);
        let equilibrium = cfg.source_strength / (1.0 - keff);
        let precursors = [0.0; NUM_DELAYED_GROUPS];
        let mut n = 0.1;
        for _ in 0..2000 {
            n = advance_neutron_density(n, &precursors, rho, keff, &cfg, 0.05);
        }
        assert_relative_eq!(n, equilibrium, max_relative = 1e-6);
    }

    #[test]
    fn test_power_lag_approaches_target() {
        let cfg = cfg();
        let mut power = 0.0;
        for _ in 0..2000 {
            power = advance_thermal_power(power, cfg.reference_density, &cfg, 0.05);
        }
        assert_relative_eq!(power, cfg.max_power_mw, max_relative = 1e-6);
    }

    #[test]
    fn test_temperatures_stay_in_bounds() {
        let cfg = cfg();
        let mut fuel = cfg.min_temp_c;
        let mut coolant = cfg.min_temp_c;
        for _ in 0..20_000 {
            let (f, c) = advance_temperatures(300.0, fuel, coolant, &cfg, 0.05);
            fuel = f;
            coolant = c;
            assert!(fuel >= cfg.min_temp_c && fuel <= cfg.max_temp_c + cfg.fuel_temp_margin_c);
            assert!(coolant >= cfg.min_temp_c && coolant <= cfg.max_temp_c);
        }
        // Heated well above minimum at sustained power
        assert!(fuel > coolant);
        assert!(coolant > cfg.min_temp_c);
    }

    #[test]
    fn test_xenon_bounded_and_builds_up_under_flux() {
        let cfg = cfg();
        let mut iodine = 0.0;
        let mut xenon = 0.0;
        for _ in 0..100_000 {
            let (i, x) = advance_xenon(iodine, xenon, 1.0, &cfg, 0.05);
            iodine = i;
            xenon = x;
            assert!((0.0..=1.0).contains(&iodine));
            assert!((0.0..=1.0).contains(&xenon));
        }
        assert!(iodine > 0.1);
        assert!(xenon > 0.01);
    }

    #[test]
    fn test_axial_flux_profile_shape() {
        let flux = axial_flux_profile(50, 1.0);
        assert_eq!(flux.len(), 50);
        // Peaked at the center, vanishing at the edges
        let center = flux[25];
        assert!(center > flux[0]);
        assert!(center > flux[49]);
        assert!(flux.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
