use chrono::{DateTime, Datelike, Duration, Utc};
use std::collections::BTreeMap;

use crate::models::{Application, FinalResult};
use crate::stages;

/// Label used for applications that have no final result yet.
pub const IN_PROGRESS: &str = "in progress";

/// Aggregate snapshot over the whole collection. Every field is a pure
/// derivation; nothing here is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Analytics {
    /// Count per registered stage code, in pipeline order.
    pub stage_counts: Vec<(u8, usize)>,
    /// Count per result label, including the synthetic in-progress bucket.
    pub result_counts: BTreeMap<String, usize>,
    /// Applications created per ISO week, trailing 12 weeks, oldest first.
    pub weekly_created: Vec<(String, usize)>,
    /// (offered + accepted) / all-with-result. 0.0 when nothing resolved.
    pub success_rate: f64,
    /// (all-with-result except ghosted) / all-with-result.
    pub response_rate: f64,
}

pub fn analytics(apps: &[Application], now: DateTime<Utc>) -> Analytics {
    Analytics {
        stage_counts: stage_counts(apps),
        result_counts: result_counts(apps),
        weekly_created: weekly_created(apps, now),
        success_rate: success_rate(apps),
        response_rate: response_rate(apps),
    }
}

pub fn stage_counts(apps: &[Application]) -> Vec<(u8, usize)> {
    stages::STAGES
        .iter()
        .map(|stage| {
            let count = apps.iter().filter(|a| a.current_stage == stage.code).count();
            (stage.code, count)
        })
        .collect()
}

pub fn result_counts(apps: &[Application]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    counts.insert(IN_PROGRESS.to_string(), 0);
    for result in [
        FinalResult::Offered,
        FinalResult::Accepted,
        FinalResult::Rejected,
        FinalResult::Declined,
        FinalResult::Ghosted,
        FinalResult::Withdrawn,
    ] {
        counts.insert(result.to_string(), 0);
    }
    for app in apps {
        let key = match app.final_result {
            Some(result) => result.to_string(),
            None => IN_PROGRESS.to_string(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Creation counts for the trailing 12 ISO weeks (current week last).
/// Keys look like "2025-W23".
pub fn weekly_created(apps: &[Application], now: DateTime<Utc>) -> Vec<(String, usize)> {
    let mut buckets: Vec<(String, usize)> = Vec::with_capacity(12);
    for weeks_back in (0..12).rev() {
        let week = (now - Duration::weeks(weeks_back)).iso_week();
        let key = format!("{}-W{:02}", week.year(), week.week());
        let count = apps
            .iter()
            .filter(|a| {
                let created = a.created_at.iso_week();
                created.year() == week.year() && created.week() == week.week()
            })
            .count();
        buckets.push((key, count));
    }
    buckets
}

pub fn success_rate(apps: &[Application]) -> f64 {
    let resolved = apps.iter().filter(|a| a.final_result.is_some()).count();
    if resolved == 0 {
        return 0.0;
    }
    let won = apps
        .iter()
        .filter(|a| matches!(a.final_result, Some(FinalResult::Offered | FinalResult::Accepted)))
        .count();
    won as f64 / resolved as f64
}

pub fn response_rate(apps: &[Application]) -> f64 {
    let resolved = apps.iter().filter(|a| a.final_result.is_some()).count();
    if resolved == 0 {
        return 0.0;
    }
    let responded = apps
        .iter()
        .filter(|a| a.final_result.is_some() && a.final_result != Some(FinalResult::Ghosted))
        .count();
    responded as f64 / resolved as f64
}
