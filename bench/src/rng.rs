//! Partitioned randomness with capability handles.
//!
//! One run seed fans out into four independent ChaCha streams, one per
//! purpose. Each handle exposes only the draws its purpose needs, so a
//! routine holding the assay handle cannot perturb growth biology no matter
//! how often it samples: observational noise and biological noise never
//! share a stream.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal, Normal};

const GROWTH_STREAM: u64 = 1;
const TREATMENT_STREAM: u64 = 2;
const ASSAY_STREAM: u64 = 3;
const OPERATIONS_STREAM: u64 = 4;

/// Fraction of the population a contamination incident kills, lower bound.
const CONTAMINATION_SEVERITY_MIN: f64 = 0.05;
/// Fraction of the population a contamination incident kills, upper bound.
const CONTAMINATION_SEVERITY_MAX: f64 = 0.30;

/// The four per-purpose streams derived from one run seed.
#[derive(Debug)]
pub(crate) struct RngPartition {
    pub(crate) growth: GrowthRng,
    pub(crate) treatment: TreatmentRng,
    pub(crate) assay: AssayRng,
    pub(crate) operations: OperationsRng,
}

impl RngPartition {
    pub(crate) fn from_seed(seed: u64) -> Self {
        Self {
            growth: GrowthRng(stream(seed, GROWTH_STREAM)),
            treatment: TreatmentRng(stream(seed, TREATMENT_STREAM)),
            assay: AssayRng(stream(seed, ASSAY_STREAM)),
            operations: OperationsRng(stream(seed, OPERATIONS_STREAM)),
        }
    }
}

fn stream(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Handle for biological growth variation, drawn once per seeded vessel.
#[derive(Debug)]
pub(crate) struct GrowthRng(ChaCha8Rng);

impl GrowthRng {
    /// Multiplicative growth-rate jitter around one.
    pub(crate) fn jitter_multiplier(&mut self, sd: f64) -> f64 {
        if !(sd > 0.0) || !sd.is_finite() {
            return 1.0;
        }
        let normal = Normal::new(0.0, sd).expect("jitter sd checked finite and positive");
        (1.0 + normal.sample(&mut self.0)).max(0.1)
    }
}

/// Handle for per-cohort treatment response variation.
#[derive(Debug)]
pub(crate) struct TreatmentRng(ChaCha8Rng);

impl TreatmentRng {
    /// Samples a commitment delay from a log-normal whose arithmetic mean
    /// equals `mean_h`.
    pub(crate) fn commitment_delay_h(&mut self, mean_h: f64, sigma: f64) -> f64 {
        if !(mean_h > 0.0) || !mean_h.is_finite() {
            return 0.0;
        }
        if !(sigma > 0.0) || !sigma.is_finite() {
            return mean_h;
        }
        let mu = mean_h.ln() - sigma * sigma / 2.0;
        let delay = LogNormal::new(mu, sigma).expect("log-normal parameters checked finite");
        delay.sample(&mut self.0)
    }
}

/// Handle for assay measurement noise; never touches biology.
#[derive(Debug)]
pub(crate) struct AssayRng(ChaCha8Rng);

impl AssayRng {
    /// The true value perturbed by multiplicative noise with the given
    /// coefficient of variation.
    pub(crate) fn noisy(&mut self, truth: f64, cv: f64) -> f64 {
        if !(cv > 0.0) || !cv.is_finite() {
            return truth;
        }
        let normal = Normal::new(0.0, cv).expect("assay cv checked finite and positive");
        truth * (1.0 + normal.sample(&mut self.0))
    }
}

/// Handle for bench-work mishaps such as contamination.
#[derive(Debug)]
pub(crate) struct OperationsRng(ChaCha8Rng);

impl OperationsRng {
    /// Rolls one feed or washout for contamination; returns the kill
    /// severity when the incident occurs.
    pub(crate) fn contamination(&mut self, risk: f64) -> Option<f64> {
        if !(risk > 0.0) || !risk.is_finite() {
            return None;
        }
        if self.0.gen_bool(risk.min(1.0)) {
            Some(
                self.0
                    .gen_range(CONTAMINATION_SEVERITY_MIN..CONTAMINATION_SEVERITY_MAX),
            )
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RngPartition;

    #[test]
    fn same_seed_reproduces_every_stream() {
        let mut first = RngPartition::from_seed(7);
        let mut second = RngPartition::from_seed(7);
        assert_eq!(
            first.growth.jitter_multiplier(0.03).to_bits(),
            second.growth.jitter_multiplier(0.03).to_bits()
        );
        assert_eq!(
            first.treatment.commitment_delay_h(8.0, 0.4).to_bits(),
            second.treatment.commitment_delay_h(8.0, 0.4).to_bits()
        );
        assert_eq!(
            first.assay.noisy(0.5, 0.04).to_bits(),
            second.assay.noisy(0.5, 0.04).to_bits()
        );
    }

    #[test]
    fn draining_one_stream_leaves_the_others_untouched() {
        let mut drained = RngPartition::from_seed(11);
        let mut pristine = RngPartition::from_seed(11);
        for _ in 0..100 {
            let _ = drained.assay.noisy(1.0, 0.04);
        }
        assert_eq!(
            drained.growth.jitter_multiplier(0.03).to_bits(),
            pristine.growth.jitter_multiplier(0.03).to_bits()
        );
        assert_eq!(
            drained.treatment.commitment_delay_h(8.0, 0.4).to_bits(),
            pristine.treatment.commitment_delay_h(8.0, 0.4).to_bits()
        );
    }

    #[test]
    fn commitment_delay_mean_tracks_the_requested_mean() {
        let mut rng = RngPartition::from_seed(3);
        let samples = 4000;
        let total: f64 = (0..samples)
            .map(|_| rng.treatment.commitment_delay_h(8.0, 0.4))
            .sum();
        let mean = total / f64::from(samples);
        assert!((mean - 8.0).abs() < 0.5, "sampled mean {mean}");
    }

    #[test]
    fn degenerate_parameters_fall_back_deterministically() {
        let mut rng = RngPartition::from_seed(5);
        assert_eq!(rng.growth.jitter_multiplier(0.0), 1.0);
        assert_eq!(rng.treatment.commitment_delay_h(8.0, 0.0), 8.0);
        assert_eq!(rng.assay.noisy(0.5, 0.0), 0.5);
        assert_eq!(rng.operations.contamination(0.0), None);
    }
}
