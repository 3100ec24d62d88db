use serde::Serialize;
use std::collections::BTreeMap;
use voyage_control::{FinalizeReason, VoyageReport};

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub session_count: usize,
    /// Sessions whose task ended without a report.
    pub failed_count: usize,
    pub complete_count: usize,
    pub finalize_reasons: BTreeMap<String, usize>,
    pub unsafe_without_bunker_count: usize,
    pub multi_stop_count: usize,
    pub mean_invocations: f64,
    pub best_single_stop_cost_usd: Option<CostStats>,
}

#[derive(Debug, Serialize)]
pub struct CostStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

pub fn reason_label(reason: FinalizeReason) -> String {
    match reason {
        FinalizeReason::Complete => "complete".to_string(),
        FinalizeReason::Partial => "partial".to_string(),
        FinalizeReason::NothingEligible => "nothing_eligible".to_string(),
        FinalizeReason::IterationCeiling => "iteration_ceiling".to_string(),
        FinalizeReason::NoProgress => "no_progress".to_string(),
        FinalizeReason::StageStuck(stage) => format!("stage_stuck:{stage}"),
        FinalizeReason::CircuitOpen(stage) => format!("circuit_open:{stage}"),
    }
}

fn cost_stats(costs: &[f64]) -> Option<CostStats> {
    if costs.is_empty() {
        return None;
    }
    let mean = costs.iter().sum::<f64>() / costs.len() as f64;
    let min = costs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = costs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(CostStats { mean, min, max })
}

pub fn compute_summary(reports: &[&VoyageReport], failed_count: usize) -> BatchSummary {
    let mut finalize_reasons = BTreeMap::new();
    for report in reports {
        *finalize_reasons
            .entry(reason_label(report.finalize_reason))
            .or_insert(0) += 1;
    }
    let costs: Vec<f64> = reports
        .iter()
        .filter_map(|r| r.bunker.as_ref()?.best_single_stop.as_ref())
        .map(|rec| rec.total_cost_usd)
        .collect();
    let mean_invocations = if reports.is_empty() {
        0.0
    } else {
        reports.iter().map(|r| f64::from(r.invocations)).sum::<f64>() / reports.len() as f64
    };

    BatchSummary {
        session_count: reports.len() + failed_count,
        failed_count,
        complete_count: reports.iter().filter(|r| r.is_complete()).count(),
        finalize_reasons,
        unsafe_without_bunker_count: reports
            .iter()
            .filter(|r| r.rob.as_ref().is_some_and(|rob| !rob.safe_without_bunker))
            .count(),
        multi_stop_count: reports
            .iter()
            .filter(|r| r.bunker.as_ref().is_some_and(|b| b.multi_stop_required))
            .count(),
        mean_invocations,
        best_single_stop_cost_usd: cost_stats(&costs),
    }
}

pub fn print_summary(name: &str, summary: &BatchSummary) {
    println!();
    println!("=== {name}: {} sessions ===", summary.session_count);
    println!(
        "complete: {}  failed: {}  mean invocations: {:.1}",
        summary.complete_count, summary.failed_count, summary.mean_invocations
    );
    for (reason, count) in &summary.finalize_reasons {
        println!("  {reason:<28} {count:>4}");
    }
    println!(
        "unsafe without bunkering: {}  multi-stop required: {}",
        summary.unsafe_without_bunker_count, summary.multi_stop_count
    );
    if let Some(cost) = &summary.best_single_stop_cost_usd {
        println!(
            "best single stop cost (USD): mean {:.0}  min {:.0}  max {:.0}",
            cost.mean, cost.min, cost.max
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_core::{PortCode, SessionId, Stage};

    fn report(reason: FinalizeReason, invocations: u32) -> VoyageReport {
        VoyageReport {
            session_id: SessionId::new(),
            origin: PortCode::new("SGSIN"),
            destination: PortCode::new("AEFJR"),
            finalize_reason: reason,
            summary: String::new(),
            route: None,
            compliance: None,
            weather: None,
            bunker: None,
            rob: None,
            missing: Vec::new(),
            warnings: Vec::new(),
            notices: Vec::new(),
            invocations,
        }
    }

    #[test]
    fn test_summary_counts_reasons_and_failures() {
        let a = report(FinalizeReason::Complete, 4);
        let b = report(FinalizeReason::StageStuck(Stage::Route), 6);
        let summary = compute_summary(&[&a, &b], 1);
        assert_eq!(summary.session_count, 3);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.finalize_reasons.get("complete"), Some(&1));
        assert_eq!(summary.finalize_reasons.get("stage_stuck:route"), Some(&1));
        assert!((summary.mean_invocations - 5.0).abs() < 1e-9);
        assert!(summary.best_single_stop_cost_usd.is_none());
    }

    #[test]
    fn test_empty_batch_has_zero_mean() {
        let summary = compute_summary(&[], 2);
        assert_eq!(summary.session_count, 2);
        assert!(summary.mean_invocations.abs() < 1e-9);
    }
}
