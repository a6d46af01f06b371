use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::features::FEATURE_COUNT;
use crate::models::RiskCategory;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_SAMPLES: usize = 200;

/// Probability that a sample is high risk.
pub const HIGH_RISK_SHARE: f64 = 0.3;
/// Probability that a sample that is not high risk is moderate.
pub const MODERATE_RISK_SHARE: f64 = 0.6;

/// Value ranges for one latent category. Ranges are half-open `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryProfile {
    pub category: RiskCategory,
    pub cgpa: (f64, f64),
    pub attendance: (f64, f64),
    pub fee_pending_probability: f64,
    pub mood: (f64, f64),
    pub activities: (f64, f64),
    pub joy: (f64, f64),
    pub sadness: (f64, f64),
    pub anger: (f64, f64),
    pub fear: (f64, f64),
}

pub const HIGH_RISK: CategoryProfile = CategoryProfile {
    category: RiskCategory::High,
    cgpa: (4.0, 6.5),
    attendance: (50.0, 75.0),
    fee_pending_probability: 0.6,
    mood: (2.0, 5.0),
    activities: (0.0, 2.0),
    joy: (0.0, 0.3),
    sadness: (0.3, 0.8),
    anger: (0.0, 0.5),
    fear: (0.0, 0.5),
};

pub const MODERATE_RISK: CategoryProfile = CategoryProfile {
    category: RiskCategory::Moderate,
    cgpa: (6.0, 7.5),
    attendance: (70.0, 85.0),
    fee_pending_probability: 0.3,
    mood: (4.0, 7.0),
    activities: (1.0, 4.0),
    joy: (0.2, 0.5),
    sadness: (0.1, 0.4),
    anger: (0.0, 0.3),
    fear: (0.0, 0.3),
};

pub const LOW_RISK: CategoryProfile = CategoryProfile {
    category: RiskCategory::Low,
    cgpa: (7.0, 10.0),
    attendance: (80.0, 100.0),
    fee_pending_probability: 0.1,
    mood: (6.0, 10.0),
    activities: (2.0, 7.0),
    joy: (0.4, 0.9),
    sadness: (0.0, 0.2),
    anger: (0.0, 0.2),
    fear: (0.0, 0.2),
};

impl CategoryProfile {
    pub fn for_category(category: RiskCategory) -> &'static CategoryProfile {
        match category {
            RiskCategory::Low => &LOW_RISK,
            RiskCategory::Moderate => &MODERATE_RISK,
            RiskCategory::High => &HIGH_RISK,
        }
    }

    /// Draw one feature row in [`crate::features::FEATURE_NAMES`] order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> [f64; FEATURE_COUNT] {
        let cgpa = uniform(rng, self.cgpa);
        let attendance = uniform(rng, self.attendance);
        let fee_pending = if rng.gen_bool(self.fee_pending_probability) { 1.0 } else { 0.0 };
        let mood = uniform(rng, self.mood);
        let activities = uniform(rng, self.activities);
        let joy = uniform(rng, self.joy);
        let sadness = uniform(rng, self.sadness);
        let anger = uniform(rng, self.anger);
        let fear = uniform(rng, self.fear);
        let semester = f64::from(rng.gen_range(1u8..=8));

        [
            cgpa, attendance, fee_pending, mood, activities, joy, sadness, anger, fear, semester,
        ]
    }
}

/// Labeled feature rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub samples: Vec<[f64; FEATURE_COUNT]>,
    pub labels: Vec<RiskCategory>,
}

impl TrainingSet {
    pub fn label_indices(&self) -> Vec<usize> {
        self.labels.iter().map(|label| label.index()).collect()
    }

    pub fn class_counts(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }
}

/// Generate `n_samples` rows from a fixed seed.
pub fn generate(seed: u64, n_samples: usize) -> TrainingSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);

    for _ in 0..n_samples {
        let category = draw_category(&mut rng);
        samples.push(CategoryProfile::for_category(category).sample(&mut rng));
        labels.push(category);
    }

    TrainingSet { samples, labels }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    rng.gen_range(lo..hi)
}

fn draw_category<R: Rng + ?Sized>(rng: &mut R) -> RiskCategory {
    if rng.gen::<f64>() < HIGH_RISK_SHARE {
        RiskCategory::High
    } else if rng.gen::<f64>() < MODERATE_RISK_SHARE {
        RiskCategory::Moderate
    } else {
        RiskCategory::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(value: f64, (lo, hi): (f64, f64)) -> bool {
        value >= lo && value < hi
    }

    #[test]
    fn same_seed_same_corpus() {
        assert_eq!(generate(7, 50), generate(7, 50));
        assert_ne!(generate(7, 50), generate(8, 50));
    }

    #[test]
    fn default_corpus_has_every_category() {
        let data = generate(DEFAULT_SEED, DEFAULT_SAMPLES);
        assert_eq!(data.samples.len(), DEFAULT_SAMPLES);
        assert!(data.class_counts().iter().all(|count| *count > 0));
    }

    #[test]
    fn samples_respect_their_profile() {
        let data = generate(DEFAULT_SEED, DEFAULT_SAMPLES);
        for (row, label) in data.samples.iter().zip(&data.labels) {
            let profile = CategoryProfile::for_category(*label);
            assert!(within(row[0], profile.cgpa));
            assert!(within(row[1], profile.attendance));
            assert!(row[2] == 0.0 || row[2] == 1.0);
            assert!(within(row[3], profile.mood));
            assert!(within(row[4], profile.activities));
            assert!(within(row[5], profile.joy));
            assert!(within(row[6], profile.sadness));
            assert!(within(row[7], profile.anger));
            assert!(within(row[8], profile.fear));
            assert!((1.0..=8.0).contains(&row[9]) && row[9].fract() == 0.0);
        }
    }
}
