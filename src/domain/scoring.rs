//! Readiness scoring and baseline arithmetic.
//!
//! Pure functions: handlers gather the submitted metrics and stored
//! baselines, and everything here is deterministic over those inputs plus
//! the configured thresholds. Baseline mutation policy (GREEN-only updates,
//! optimistic writes) lives with the caller.

use crate::config::ScoringConfig;
use crate::domain::{MetricBaseline, ReadinessFlag, ScoreBreakdown};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Scores a completed check against the user's stored baselines.
///
/// A metric only contributes a z-score once its baseline is established:
/// present, at least `min_samples` observations, and a positive std. Until
/// then it scores 0 and does not count toward coverage.
///
/// Risk accumulates only adverse deviations on worse-if-high metrics, so a
/// strong result on one metric never offsets decline on another. High
/// confidence reported alongside already-elevated risk draws a fixed
/// overconfidence penalty.
pub fn score_check(
    config: &ScoringConfig,
    metrics: &BTreeMap<String, f64>,
    confidence: f64,
    baselines: &HashMap<String, MetricBaseline>,
) -> ScoreBreakdown {
    // ---
    let mut z = BTreeMap::new();
    let mut baseline_coverage = 0usize;

    for (name, observation) in metrics {
        // ---
        let deviation = match baselines.get(name) {
            Some(b) if b.sample_count >= config.min_samples && b.std > 0.0 => {
                baseline_coverage += 1;
                (observation - b.mean) / b.std
            }
            _ => 0.0,
        };
        z.insert(name.clone(), deviation);
    }

    let mut risk: f64 = metrics
        .keys()
        .filter(|name| config.worse_if_high.contains(name.as_str()))
        .map(|name| z[name].max(0.0))
        .sum();

    let confidence = confidence.clamp(0.0, 100.0);
    if confidence > config.high_confidence && risk > config.penalty_risk_floor {
        risk += config.overconfidence_penalty;
    }

    let readiness = if risk >= config.red_cutoff {
        ReadinessFlag::Red
    } else if risk >= config.yellow_cutoff {
        ReadinessFlag::Yellow
    } else {
        ReadinessFlag::Green
    };

    let required_coverage = 3.max((metrics.len() as f64 * 0.6).floor() as usize);

    ScoreBreakdown {
        z,
        risk,
        readiness,
        baseline_coverage,
        baseline_pending: baseline_coverage < required_coverage,
    }
}

/// First observation of a metric: wide prior (std = 1.0) so that a single
/// sample can't make subsequent z-scores explode.
pub fn initial_baseline(
    user_id: Uuid,
    metric: &str,
    observation: f64,
    now: DateTime<Utc>,
) -> MetricBaseline {
    // ---
    MetricBaseline {
        user_id,
        metric: metric.to_string(),
        mean: observation,
        std: 1.0,
        sample_count: 1,
        updated_at: now,
    }
}

/// Folds one new observation into a baseline (Welford-style running
/// mean/std). The epsilon floor keeps std from collapsing to zero.
pub fn advance_baseline(
    prior: &MetricBaseline,
    observation: f64,
    epsilon: f64,
    now: DateTime<Utc>,
) -> MetricBaseline {
    // ---
    let n0 = prior.sample_count as f64;
    let n1 = n0 + 1.0;
    let mean1 = prior.mean + (observation - prior.mean) / n1;
    let variance_sum =
        prior.std * prior.std * (n0 - 1.0) + (observation - prior.mean) * (observation - mean1);
    let std1 = (variance_sum / (n1 - 1.0).max(1.0)).sqrt().max(epsilon);

    MetricBaseline {
        user_id: prior.user_id,
        metric: prior.metric.clone(),
        mean: mean1,
        std: std1,
        sample_count: prior.sample_count + 1,
        updated_at: now,
    }
}
