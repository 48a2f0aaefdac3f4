#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure growth and confluence integrator.
//!
//! The system never mutates bench state: the bench hands it a value view of
//! one vessel as of the interval start and receives the end-of-interval
//! population and contact pressure back. Everything is integrated across
//! the interval rather than endpoint-sampled so that splitting one call
//! into many smaller calls over the same span converges to the same
//! biology.

const LN_2: f64 = std::f64::consts::LN_2;

/// Value view of one vessel as of the interval start.
#[derive(Clone, Debug, PartialEq)]
pub struct GrowthInputs {
    /// Cell count at the interval start.
    pub population: f64,
    /// Live fraction at the interval start.
    pub viability: f64,
    /// Carrying capacity in cells.
    pub capacity: f64,
    /// Doubling time under ideal conditions, in hours.
    pub doubling_time_h: f64,
    /// Hours elapsed since seeding or the last passage, as of the start.
    pub lag_elapsed_h: f64,
    /// Duration of the lag ramp, in hours.
    pub lag_duration_h: f64,
    /// Viability below which growth gates to zero.
    pub viability_floor: f64,
    /// Combined rate multiplier: run level x per-vessel jitter x edge
    /// penalty.
    pub rate_multiplier: f64,
    /// Lagged contact-pressure signal at the interval start, in `[0, 1]`.
    pub contact_pressure: f64,
    /// Time constant of the contact-pressure relaxation, in hours.
    pub contact_tau_h: f64,
    /// Confluence at which the contact sigmoid is half-maximal.
    pub contact_midpoint: f64,
    /// Steepness of the contact sigmoid.
    pub contact_steepness: f64,
}

/// End-of-interval growth state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrowthOutcome {
    /// Population at the interval end; never below the starting population.
    pub population: f64,
    /// Contact-pressure signal at the interval end.
    pub contact_pressure: f64,
    /// Realized exponential growth rate over the interval, per hour.
    pub realized_rate_per_h: f64,
}

/// Growth and confluence engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct Growth;

impl Growth {
    /// Integrates growth across `[t0, t0 + dt_h)` using start-of-interval
    /// state only.
    #[must_use]
    pub fn integrate(&self, inputs: &GrowthInputs, dt_h: f64) -> GrowthOutcome {
        let confluence = if inputs.capacity > 0.0 {
            inputs.population / inputs.capacity
        } else {
            0.0
        };
        let pressure_target = contact_sigmoid(
            confluence,
            inputs.contact_midpoint,
            inputs.contact_steepness,
        );

        if dt_h <= 0.0 {
            return GrowthOutcome {
                population: inputs.population,
                contact_pressure: inputs.contact_pressure,
                realized_rate_per_h: 0.0,
            };
        }

        // The pressure signal relaxes toward the sigmoid of confluence with
        // time constant tau; closed form keeps the update dt-invariant.
        let decay = (-dt_h / inputs.contact_tau_h).exp();
        let pressure_end =
            (pressure_target + (inputs.contact_pressure - pressure_target) * decay).clamp(0.0, 1.0);
        let pressure_mean = if inputs.contact_tau_h > 0.0 {
            pressure_target
                + (inputs.contact_pressure - pressure_target) * (1.0 - decay) * inputs.contact_tau_h
                    / dt_h
        } else {
            pressure_target
        };

        if inputs.population <= 0.0
            || inputs.viability < inputs.viability_floor
            || inputs.doubling_time_h <= 0.0
        {
            return GrowthOutcome {
                population: inputs.population,
                contact_pressure: pressure_end,
                realized_rate_per_h: 0.0,
            };
        }

        let base_rate = LN_2 / inputs.doubling_time_h * inputs.rate_multiplier.max(0.0);
        let lag_mean = lag_factor_mean(inputs.lag_elapsed_h, inputs.lag_duration_h, dt_h);
        let contact_factor = (1.0 - pressure_mean.clamp(0.0, 1.0)).max(0.0);
        let rate = base_rate * lag_mean * contact_factor;

        // Trapezoidal predictor-corrector on the saturation term: predict
        // the end confluence with the start value, then integrate with the
        // interval average.
        let saturation_start = (1.0 - confluence).max(0.0);
        let predicted = inputs.population * (rate * saturation_start * dt_h).exp();
        let predicted_confluence = if inputs.capacity > 0.0 {
            predicted / inputs.capacity
        } else {
            0.0
        };
        let saturation_mean = (1.0 - 0.5 * (confluence + predicted_confluence)).max(0.0);
        let population = inputs.population * (rate * saturation_mean * dt_h).exp();

        let population = population.max(inputs.population);
        let realized_rate_per_h = (population / inputs.population).ln() / dt_h;

        GrowthOutcome {
            population,
            contact_pressure: pressure_end,
            realized_rate_per_h,
        }
    }
}

/// Mean of the lag ramp over `[elapsed, elapsed + dt)`.
///
/// The ramp rises linearly from zero at seeding to one once the lag
/// duration has passed; integrating it across the interval rather than
/// sampling an endpoint keeps short and long steps consistent.
fn lag_factor_mean(elapsed_h: f64, lag_duration_h: f64, dt_h: f64) -> f64 {
    if lag_duration_h <= 0.0 {
        return 1.0;
    }
    let start = elapsed_h.max(0.0);
    let end = start + dt_h;
    if start >= lag_duration_h {
        return 1.0;
    }
    let ramp_end = end.min(lag_duration_h);
    // Integral of t / lag over the in-ramp part plus the flat part at one.
    let ramp_area = (ramp_end * ramp_end - start * start) / (2.0 * lag_duration_h);
    let flat_area = (end - ramp_end).max(0.0);
    ((ramp_area + flat_area) / dt_h).clamp(0.0, 1.0)
}

fn contact_sigmoid(confluence: f64, midpoint: f64, steepness: f64) -> f64 {
    1.0 / (1.0 + (-(confluence - midpoint) * steepness).exp())
}
