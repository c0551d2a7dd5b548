//! Reactor simulation state
//!
//! This module contains the reactor state record and the simulation stepper.
//! All physics calculations are delegated to the `physics` module; this file
//! owns the state, the sub-step ordering, phase classification, trip/alarm
//! evaluation and the bounded history.

use std::collections::VecDeque;
use std::sync::Mutex;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::ReactorConfig;
use crate::physics::{self, NUM_DELAYED_GROUPS};

/// Points in the axial flux profile
const AXIAL_FLUX_POINTS: usize = 50;

/// keff pinned into the freshly reset state; recomputed on the first step
const INITIAL_KEFF: f64 = 0.95;

// Phase classification thresholds
const SHUTDOWN_KEFF: f64 = 0.95;
const CRITICAL_KEFF: f64 = 0.999;
const CRITICAL_POWER_MW: f64 = 1.0;
const AT_POWER_FRACTION: f64 = 0.9;

/// Operating regime of the core, derived from (keff, power) every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Shutdown,
    Subcritical,
    Critical,
    PowerAscension,
    AtPower,
    /// Sticky until an explicit reset
    Scrammed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmSeverity {
    Warning,
    Trip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmKind {
    ShortPeriod,
    HighPower,
    HighTemperature,
    PowerApproach,
    HighStartupRate,
}

/// One alarm occurrence, kept in a bounded ring on the state record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvent {
    pub time_s: f64,
    pub severity: AlarmSeverity,
    pub kind: AlarmKind,
    pub message: String,
}

/// Compact state snapshot retained in the rolling history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub time_s: f64,
    pub thermal_power_mw: f64,
    pub fuel_temp_c: f64,
    pub coolant_temp_c: f64,
    pub keff: f64,
    pub period_s: f64,
    pub rod_position: f64,
    pub xenon_conc: f64,
}

/// Complete reactor state
///
/// Owned exclusively by one `ReactorSimulator` and mutated in place by
/// `step`; commands only adjust rod targets or force the tripped phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorState {
    // Time
    pub time_s: f64,

    // Power and neutronics
    pub neutron_density: f64,
    pub thermal_power_mw: f64,
    pub precursors: [f64; NUM_DELAYED_GROUPS],
    pub keff: f64,
    pub period_s: f64,
    pub doubling_time_s: f64,
    pub startup_rate_dpm: f64,

    // Reactivity components [pcm]
    pub rod_reactivity_pcm: f64,
    pub temp_reactivity_pcm: f64,
    pub xenon_reactivity_pcm: f64,
    pub total_reactivity_pcm: f64,
    pub reactivity_dollars: f64,

    // Temperatures [°C]
    pub fuel_temp_c: f64,
    pub coolant_temp_c: f64,

    // Poisons, normalized [0, 1]
    pub iodine_conc: f64,
    pub xenon_conc: f64,

    // Control rods, % inserted (0 = fully withdrawn, 100 = fully inserted)
    pub rod_position: f64,
    pub target_rod_position: f64,

    pub phase: Phase,
    pub total_energy_mwh: f64,

    // Axial flux distribution
    pub axial_flux: Array1<f64>,

    // Bounded records
    pub history: VecDeque<HistorySample>,
    pub alarms: VecDeque<AlarmEvent>,
}

impl ReactorState {
    /// The documented starting condition: rods nearly full in, source-driven
    /// neutron level, precursors at source equilibrium, cold temperatures.
    pub fn initial(cfg: &ReactorConfig) -> Self {
        let neutron_density = cfg.source_strength / (1.0 - INITIAL_KEFF);
        let thermal_power_mw = neutron_density * cfg.max_power_mw / cfg.reference_density;
        let mut state = Self {
            time_s: 0.0,
            neutron_density,
            thermal_power_mw,
            precursors: physics::equilibrium_precursors(neutron_density, cfg),
            keff: INITIAL_KEFF,
            period_s: f64::INFINITY,
            doubling_time_s: f64::INFINITY,
            startup_rate_dpm: 0.0,
            rod_reactivity_pcm: 0.0,
            temp_reactivity_pcm: 0.0,
            xenon_reactivity_pcm: 0.0,
            total_reactivity_pcm: 0.0,
            reactivity_dollars: 0.0,
            fuel_temp_c: cfg.min_temp_c,
            coolant_temp_c: cfg.min_temp_c,
            iodine_conc: 0.0,
            xenon_conc: 0.0,
            rod_position: cfg.initial_rod_position_pct,
            target_rod_position: cfg.initial_rod_position_pct,
            phase: Phase::Shutdown,
            total_energy_mwh: 0.0,
            axial_flux: physics::axial_flux_profile(AXIAL_FLUX_POINTS, neutron_density),
            history: VecDeque::new(),
            alarms: VecDeque::new(),
        };
        let sample = state.sample();
        state.history.push_back(sample);
        state
    }

    fn sample(&self) -> HistorySample {
        HistorySample {
            time_s: self.time_s,
            thermal_power_mw: self.thermal_power_mw,
            fuel_temp_c: self.fuel_temp_c,
            coolant_temp_c: self.coolant_temp_c,
            keff: self.keff,
            period_s: self.period_s,
            rod_position: self.rod_position,
            xenon_conc: self.xenon_conc,
        }
    }
}

/// Deterministic phase from (keff, power); `Scrammed` is sticky.
fn classify_phase(current: Phase, keff: f64, power_mw: f64, cfg: &ReactorConfig) -> Phase {
    if current == Phase::Scrammed {
        Phase::Scrammed
    } else if keff < SHUTDOWN_KEFF {
        Phase::Shutdown
    } else if keff < CRITICAL_KEFF {
        Phase::Subcritical
    } else if power_mw < CRITICAL_POWER_MW {
        Phase::Critical
    } else if power_mw < AT_POWER_FRACTION * cfg.max_power_mw {
        Phase::PowerAscension
    } else {
        Phase::AtPower
    }
}

/// Force the tripped state: sticky phase, full-insertion demand and an
/// immediate insertion kick before the servo closes the remaining gap.
/// No-op when already tripped.
fn apply_scram(state: &mut ReactorState, cfg: &ReactorConfig) {
    if state.phase == Phase::Scrammed {
        return;
    }
    state.phase = Phase::Scrammed;
    state.target_rod_position = 100.0;
    state.rod_position = (state.rod_position + cfg.scram_insertion_kick_pct).min(100.0);
    log::warn!("SCRAM initiated at t={:.1}s", state.time_s);
}

/// Evaluate trips and warnings in priority order. Any condition may fire
/// independently; trips force a scram through the idempotent path.
fn evaluate_alarms(state: &mut ReactorState, cfg: &ReactorConfig) -> Vec<AlarmEvent> {
    let mut raised = Vec::new();
    let time_s = state.time_s;

    if state.period_s > 0.0 && state.period_s < cfg.period_trip_s {
        apply_scram(state, cfg);
        raised.push(AlarmEvent {
            time_s,
            severity: AlarmSeverity::Trip,
            kind: AlarmKind::ShortPeriod,
            message: format!("TRIP: Short reactor period: {:.1}s", state.period_s),
        });
    }

    if state.thermal_power_mw > cfg.power_trip_mw {
        apply_scram(state, cfg);
        raised.push(AlarmEvent {
            time_s,
            severity: AlarmSeverity::Trip,
            kind: AlarmKind::HighPower,
            message: format!(
                "TRIP: Thermal power {:.0} MW exceeds {:.0} MW limit",
                state.thermal_power_mw, cfg.power_trip_mw
            ),
        });
    }

    if state.fuel_temp_c > cfg.temp_trip_c || state.coolant_temp_c > cfg.temp_trip_c {
        apply_scram(state, cfg);
        let (label, temp) = if state.fuel_temp_c > cfg.temp_trip_c {
            ("Fuel", state.fuel_temp_c)
        } else {
            ("Coolant", state.coolant_temp_c)
        };
        raised.push(AlarmEvent {
            time_s,
            severity: AlarmSeverity::Trip,
            kind: AlarmKind::HighTemperature,
            message: format!(
                "TRIP: {} temperature {:.0}°C exceeds {:.0}°C limit",
                label, temp, cfg.temp_trip_c
            ),
        });
    }

    if state.thermal_power_mw > cfg.power_warning_mw
        && state.thermal_power_mw <= cfg.power_trip_mw
        && state.phase != Phase::Scrammed
    {
        raised.push(AlarmEvent {
            time_s,
            severity: AlarmSeverity::Warning,
            kind: AlarmKind::PowerApproach,
            message: format!(
                "WARNING: Power {:.0} MW approaching trip setpoint",
                state.thermal_power_mw
            ),
        });
    }

    if state.startup_rate_dpm > cfg.startup_rate_warning_dpm && state.phase == Phase::Subcritical {
        raised.push(AlarmEvent {
            time_s,
            severity: AlarmSeverity::Warning,
            kind: AlarmKind::HighStartupRate,
            message: format!("WARNING: High startup rate: {:.1} DPM", state.startup_rate_dpm),
        });
    }

    for alarm in &raised {
        log::warn!("{}", alarm.message);
        state.alarms.push_back(alarm.clone());
    }
    while state.alarms.len() > cfg.max_alarms {
        state.alarms.pop_front();
    }

    raised
}

/// Reactor simulation engine
///
/// Owns the state record; `step` performs one complete deterministic
/// transformation with no internal suspension. Commands between steps are
/// ordinary synchronous mutations.
pub struct ReactorSimulator {
    config: ReactorConfig,
    pub state: Mutex<ReactorState>,
}

impl Default for ReactorSimulator {
    fn default() -> Self {
        Self::new(ReactorConfig::default())
    }
}

impl ReactorSimulator {
    pub fn new(config: ReactorConfig) -> Self {
        let state = Mutex::new(ReactorState::initial(&config));
        Self { config, state }
    }

    pub fn config(&self) -> &ReactorConfig {
        &self.config
    }

    /// Advance the simulation by `dt` seconds (clamped to the configured
    /// maximum step). Returns the alarms newly raised during this step.
    /// A non-positive `dt` is a no-op.
    pub fn step(&self, dt: f64) -> Vec<AlarmEvent> {
        let mut state = self.state.lock().unwrap();
        if dt <= 0.0 {
            return Vec::new();
        }
        let dt = dt.min(self.config.max_dt_s);
        let cfg = &self.config;

        // Rod actuation: rate-limited servo toward the target
        let gap = state.target_rod_position - state.rod_position;
        let max_move = cfg.rod_speed_pct_per_s * dt;
        state.rod_position =
            (state.rod_position + gap.clamp(-max_move, max_move)).clamp(0.0, 100.0);

        // Reactivity balance
        state.rod_reactivity_pcm = physics::rod_worth(state.rod_position, cfg);
        state.temp_reactivity_pcm =
            physics::temperature_reactivity(state.fuel_temp_c, state.coolant_temp_c, cfg);
        state.xenon_reactivity_pcm = physics::xenon_reactivity(state.xenon_conc, cfg);
        state.total_reactivity_pcm =
            state.rod_reactivity_pcm + state.temp_reactivity_pcm + state.xenon_reactivity_pcm;
        let rho = state.total_reactivity_pcm / physics::PCM;

        state.keff = physics::keff_from_reactivity(rho);
        state.period_s = physics::reactor_period(rho, cfg);
        state.doubling_time_s = physics::doubling_time(state.period_s);
        state.startup_rate_dpm = physics::startup_rate(state.period_s);
        state.reactivity_dollars = physics::reactivity_to_dollars(rho);

        // Point kinetics
        let n_prev = state.neutron_density;
        state.neutron_density =
            physics::advance_neutron_density(n_prev, &state.precursors, rho, state.keff, cfg, dt);
        state.precursors = physics::advance_precursors(n_prev, &state.precursors, cfg, dt);
        state.thermal_power_mw =
            physics::advance_thermal_power(state.thermal_power_mw, state.neutron_density, cfg, dt);

        // Thermal-hydraulics
        let (fuel, coolant) = physics::advance_temperatures(
            state.thermal_power_mw,
            state.fuel_temp_c,
            state.coolant_temp_c,
            cfg,
            dt,
        );
        state.fuel_temp_c = fuel;
        state.coolant_temp_c = coolant;

        // Xenon dynamics
        let flux = state.thermal_power_mw / cfg.max_power_mw;
        let (iodine, xenon) =
            physics::advance_xenon(state.iodine_conc, state.xenon_conc, flux, cfg, dt);
        state.iodine_conc = iodine;
        state.xenon_conc = xenon;

        state.axial_flux = physics::axial_flux_profile(AXIAL_FLUX_POINTS, state.neutron_density);

        // Phase, energy, alarms
        state.phase = classify_phase(state.phase, state.keff, state.thermal_power_mw, cfg);
        state.total_energy_mwh += state.thermal_power_mw * dt / 3600.0;
        let raised = evaluate_alarms(&mut state, cfg);

        // Time and history
        state.time_s += dt;
        let sample = state.sample();
        state.history.push_back(sample);
        let horizon = state.time_s - cfg.history_window_s;
        while state.history.front().map_or(false, |s| s.time_s < horizon) {
            state.history.pop_front();
        }

        raised
    }

    /// Initiate emergency SCRAM. Idempotent; the tripped phase is sticky
    /// until `reset`.
    pub fn scram(&self) {
        let mut state = self.state.lock().unwrap();
        apply_scram(&mut state, &self.config);
    }

    /// Demand an absolute rod position [% inserted].
    pub fn move_rods(&self, target_percent: f64) {
        let mut state = self.state.lock().unwrap();
        state.target_rod_position = target_percent.clamp(0.0, 100.0);
    }

    /// Drive the rod target deeper into the core by `delta_percent`.
    pub fn insert_rods(&self, delta_percent: f64) {
        let mut state = self.state.lock().unwrap();
        state.target_rod_position = (state.target_rod_position + delta_percent).clamp(0.0, 100.0);
    }

    /// Pull the rod target out of the core by `delta_percent`.
    pub fn withdraw_rods(&self, delta_percent: f64) {
        let mut state = self.state.lock().unwrap();
        state.target_rod_position = (state.target_rod_position - delta_percent).clamp(0.0, 100.0);
    }

    /// Reset simulation to the initial state
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        *state = ReactorState::initial(&self.config);
        log::info!("Simulation reset");
    }

    /// Get current state snapshot
    pub fn get_state(&self) -> ReactorState {
        self.state.lock().unwrap().clone()
    }
}
