//! Reactor Simulator - Console Driver
//!
//! Drives the physics core in real time: wall-clock deltas times an optional
//! speed multiplier feed a fractional-step accumulator, and whole physics
//! steps are drained from it on every tick. All game/presentation logic
//! stays outside the core; this binary only issues commands and reads state.

use std::time::{Duration, Instant};

use reactor_simulator_lib::ReactorSimulator;

/// Upper bound on physics steps drained per tick
const MAX_STEPS_PER_TICK: usize = 1000;

fn format_period(period_s: f64) -> String {
    if period_s.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.1}s", period_s)
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let speed: f64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1.0);

    let simulator = ReactorSimulator::default();
    let dt = simulator.config().max_dt_s;
    log::info!("Reactor simulator running at {speed}x real time (Ctrl-C to stop)");

    // Scripted operator action: pull rods out toward criticality
    simulator.move_rods(40.0);

    let mut accumulated = 0.0_f64;
    let mut last_tick = Instant::now();
    let mut next_report = 1.0_f64;
    let mut ticker = tokio::time::interval(Duration::from_millis(50));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let delta = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;

                // Accumulate simulated time and drain whole physics steps,
                // so fractional ticks at low speeds are not lost.
                accumulated += delta * speed;
                let steps = ((accumulated / dt).floor() as usize).min(MAX_STEPS_PER_TICK);
                accumulated -= steps as f64 * dt;
                for _ in 0..steps {
                    simulator.step(dt);
                }

                let state = simulator.get_state();
                if state.time_s >= next_report {
                    next_report = state.time_s.floor() + 1.0;
                    log::info!(
                        "t={:6.1}s phase={:?} keff={:.4} period={} power={:.3} MW fuel={:.1}°C rods={:.1}%",
                        state.time_s,
                        state.phase,
                        state.keff,
                        format_period(state.period_s),
                        state.thermal_power_mw,
                        state.fuel_temp_c,
                        state.rod_position,
                    );
                }
            }
            _ = &mut shutdown => break,
        }
    }

    let state = simulator.get_state();
    log::info!(
        "Stopped at t={:.1}s: phase={:?}, total energy {:.4} MWh, {} alarm(s) retained",
        state.time_s,
        state.phase,
        state.total_energy_mwh,
        state.alarms.len(),
    );
}
