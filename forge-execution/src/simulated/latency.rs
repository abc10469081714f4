use rand::{Rng, RngCore};
use std::fmt::Debug;

/// Models the round-trip delay between an order leaving the engine and the simulated exchange
/// acting on it, per §4.5. Sampled independently for every command.
pub trait LatencyModel: Debug + Send {
    fn sample_ns(&self, rng: &mut dyn RngCore) -> i64;
}

/// Every command incurs exactly `latency_ns` - useful for deterministic, reproducible tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedLatency {
    pub latency_ns: i64,
}

impl LatencyModel for FixedLatency {
    fn sample_ns(&self, _rng: &mut dyn RngCore) -> i64 {
        self.latency_ns
    }
}

/// Latency is drawn uniformly from `[min_ns, max_ns]`.
#[derive(Debug, Clone, Copy)]
pub struct UniformLatency {
    pub min_ns: i64,
    pub max_ns: i64,
}

impl LatencyModel for UniformLatency {
    fn sample_ns(&self, rng: &mut dyn RngCore) -> i64 {
        if self.min_ns >= self.max_ns {
            return self.min_ns;
        }
        rng.random_range(self.min_ns..=self.max_ns)
    }
}

/// Latency is drawn from a normal distribution, clamped to `>= floor_ns` to keep samples
/// physically meaningful (negative latency makes no sense).
#[derive(Debug, Clone, Copy)]
pub struct NormalLatency {
    pub mean_ns: f64,
    pub std_dev_ns: f64,
    pub floor_ns: i64,
}

impl LatencyModel for NormalLatency {
    fn sample_ns(&self, rng: &mut dyn RngCore) -> i64 {
        // Box-Muller transform - avoids taking a dependency on rand_distr for a single use.
        let u1: f64 = rng.random_range(f64::EPSILON..1.0);
        let u2: f64 = rng.random_range(0.0..1.0);
        let standard_normal = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();

        let sampled = self.mean_ns + standard_normal * self.std_dev_ns;
        (sampled.round() as i64).max(self.floor_ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_fixed_latency_always_returns_same_value() {
        let model = FixedLatency { latency_ns: 500 };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(model.sample_ns(&mut rng), 500);
        assert_eq!(model.sample_ns(&mut rng), 500);
    }

    #[test]
    fn test_uniform_latency_stays_in_range() {
        let model = UniformLatency { min_ns: 100, max_ns: 200 };
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let sample = model.sample_ns(&mut rng);
            assert!((100..=200).contains(&sample), "sample {sample} out of range");
        }
    }

    #[test]
    fn test_normal_latency_respects_floor() {
        let model = NormalLatency { mean_ns: 0.0, std_dev_ns: 1000.0, floor_ns: 0 };
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..100 {
            assert!(model.sample_ns(&mut rng) >= 0);
        }
    }
}
