//! Simulator configuration
//!
//! All named physical constants live here and are handed to
//! `ReactorSimulator::new` as one value, so independent simulator instances
//! (parallel test scenarios, side-by-side sessions) cannot interfere through
//! shared globals.

use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulatorError};

/// Named physical constants for the simulated core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactorConfig {
    /// Nominal full power [MW]
    pub max_power_mw: f64,
    /// Neutron density that maps to nominal full power
    pub reference_density: f64,
    /// Normalized neutron source floor
    pub source_strength: f64,
    /// Prompt neutron generation time Λ [s]
    pub generation_time_s: f64,

    // Control rods
    /// Servo rate limit [%/s]
    pub rod_speed_pct_per_s: f64,
    /// Immediate insertion applied when a scram fires [%]
    pub scram_insertion_kick_pct: f64,
    /// Rod position after reset [% inserted]
    pub initial_rod_position_pct: f64,
    /// Normalized insertion at which rod worth crosses zero
    pub rod_critical_fraction: f64,
    /// Worth fully withdrawn [pcm]
    pub rod_max_positive_pcm: f64,
    /// Asymptotic worth fully inserted [pcm]
    pub rod_max_negative_pcm: f64,

    // Reactivity feedback
    /// Fuel (Doppler) coefficient [pcm/°C]
    pub fuel_temp_coeff_pcm_per_c: f64,
    /// Coolant (moderator) coefficient [pcm/°C]
    pub coolant_temp_coeff_pcm_per_c: f64,
    /// Reference operating temperature for feedback [°C]
    pub reference_temp_c: f64,
    /// Worth at xenon concentration 1.0 [pcm]
    pub xenon_max_worth_pcm: f64,

    // Iodine/xenon chain [1/s]
    pub iodine_yield: f64,
    pub iodine_decay: f64,
    pub xenon_decay: f64,
    pub xenon_direct_yield: f64,
    pub xenon_burnup: f64,

    // Thermal-hydraulics
    /// Minimum operating temperature [°C]
    pub min_temp_c: f64,
    /// Coolant temperature ceiling [°C]
    pub max_temp_c: f64,
    /// Extra clamp headroom for fuel above max_temp_c [°C]
    pub fuel_temp_margin_c: f64,
    /// Fuel node heat capacity [MW·s/°C]
    pub fuel_heat_capacity: f64,
    /// Coolant node heat capacity [MW·s/°C]
    pub coolant_heat_capacity: f64,
    /// Fuel→coolant transfer coefficient [MW/°C]
    pub heat_transfer_coeff: f64,
    /// First-order power filter time constant [s]
    pub power_lag_time_constant_s: f64,

    // Stepper
    /// Upper bound on a single integration step [s]
    pub max_dt_s: f64,
    /// History retention window [simulated s]
    pub history_window_s: f64,
    /// Alarm ring capacity
    pub max_alarms: usize,

    // Trip/warning thresholds
    pub period_trip_s: f64,
    pub power_trip_mw: f64,
    pub temp_trip_c: f64,
    pub power_warning_mw: f64,
    pub startup_rate_warning_dpm: f64,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self {
            max_power_mw: 250.0,
            reference_density: 0.9,
            source_strength: 1.0e-9,
            generation_time_s: 1.0e-3,
            rod_speed_pct_per_s: 2.5,
            scram_insertion_kick_pct: 5.0,
            initial_rod_position_pct: 95.0,
            rod_critical_fraction: 0.35,
            rod_max_positive_pcm: 3000.0,
            rod_max_negative_pcm: 5000.0,
            fuel_temp_coeff_pcm_per_c: -1.5,
            coolant_temp_coeff_pcm_per_c: -0.5,
            reference_temp_c: 650.0,
            xenon_max_worth_pcm: -3000.0,
            iodine_yield: 2.87e-5,
            iodine_decay: 2.87e-5,
            xenon_decay: 2.09e-5,
            xenon_direct_yield: 3.0e-6,
            xenon_burnup: 3.5e-5,
            min_temp_c: 270.0,
            max_temp_c: 1000.0,
            fuel_temp_margin_c: 200.0,
            fuel_heat_capacity: 30.0,
            coolant_heat_capacity: 120.0,
            heat_transfer_coeff: 1.0,
            power_lag_time_constant_s: 3.0,
            max_dt_s: 0.05,
            history_window_s: 600.0,
            max_alarms: 10,
            period_trip_s: 10.0,
            power_trip_mw: 300.0,
            temp_trip_c: 750.0,
            power_warning_mw: 255.0,
            startup_rate_warning_dpm: 1.0,
        }
    }
}

impl ReactorConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file(path: &str) -> SimResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the integrator cannot run with.
    pub fn validate(&self) -> SimResult<()> {
        if self.max_power_mw <= 0.0 {
            return Err(SimulatorError::Config(format!(
                "max_power_mw must be positive, got {}",
                self.max_power_mw
            )));
        }
        if self.reference_density <= 0.0 {
            return Err(SimulatorError::Config(format!(
                "reference_density must be positive, got {}",
                self.reference_density
            )));
        }
        if self.generation_time_s <= 0.0 {
            return Err(SimulatorError::Config(format!(
                "generation_time_s must be positive, got {}",
                self.generation_time_s
            )));
        }
        if !(0.0 < self.rod_critical_fraction && self.rod_critical_fraction < 1.0) {
            return Err(SimulatorError::Config(format!(
                "rod_critical_fraction must be in (0, 1), got {}",
                self.rod_critical_fraction
            )));
        }
        if self.max_dt_s <= 0.0 {
            return Err(SimulatorError::Config(format!(
                "max_dt_s must be positive, got {}",
                self.max_dt_s
            )));
        }
        if self.min_temp_c >= self.max_temp_c {
            return Err(SimulatorError::Config(format!(
                "min_temp_c {} must be below max_temp_c {}",
                self.min_temp_c, self.max_temp_c
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        ReactorConfig::default().validate().unwrap();
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = ReactorConfig::default();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2: ReactorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.max_power_mw, cfg2.max_power_mw);
        assert_eq!(cfg.rod_critical_fraction, cfg2.rod_critical_fraction);
        assert_eq!(cfg.max_alarms, cfg2.max_alarms);
    }

    #[test]
    fn test_rejects_inverted_temperature_range() {
        let cfg = ReactorConfig {
            min_temp_c: 1200.0,
            ..ReactorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_generation_time() {
        let cfg = ReactorConfig {
            generation_time_s: 0.0,
            ..ReactorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
