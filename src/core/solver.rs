use serde::Serialize;

use super::engine::project;
use super::types::Assumptions;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolveGoal {
    /// Smallest utilization rate (%) that breaks even by the target month.
    RequiredUtilization,
    /// Smallest flat per-session price, applied uniformly across every
    /// package tier, that breaks even by the target month.
    RequiredSessionPrice,
}

#[derive(Debug, Clone, Copy)]
pub struct SolveConfig {
    pub goal: SolveGoal,
    pub target_break_even_month: u32,
    pub horizon_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub break_even_month: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub goal: SolveGoal,
    pub target_break_even_month: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub achieved_break_even_month: Option<u32>,
    pub iterations: Vec<SolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Bisects over the goal variable for the smallest value whose
/// projection breaks even by `target_break_even_month`. Break-even month
/// is non-increasing in both utilization and price, so a plain bisection
/// over the candidate value is exact here; no sampling noise to absorb.
pub fn solve_goal(assumptions: &Assumptions, config: SolveConfig) -> Result<SolveResult, String> {
    validate_config(config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_meets = meets_target(assumptions, config, config.search_min);
    let high_meets = meets_target(assumptions, config, config.search_max);

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_meets {
        solved_value = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already breaks even at the lower search bound.".to_string();
    } else if !high_meets {
        feasible = false;
        message = "No value within the search bounds breaks even by the target month.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let break_even = evaluate_candidate(assumptions, config, mid);
            iterations.push(SolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_value: mid,
                break_even_month: break_even,
            });

            if break_even.is_some_and(|m| m <= config.target_break_even_month) {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                solved_value = Some(hi);
                break;
            }
        }
        if solved_value.is_none() {
            solved_value = Some(hi);
        }
        feasible = true;
        message = if converged {
            "Solved.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate.".to_string()
        };
    }

    let achieved_break_even_month =
        solved_value.and_then(|value| evaluate_candidate(assumptions, config, value));

    Ok(SolveResult {
        goal: config.goal,
        target_break_even_month: config.target_break_even_month,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        achieved_break_even_month,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn meets_target(assumptions: &Assumptions, config: SolveConfig, value: f64) -> bool {
    evaluate_candidate(assumptions, config, value)
        .is_some_and(|m| m <= config.target_break_even_month)
}

fn evaluate_candidate(assumptions: &Assumptions, config: SolveConfig, value: f64) -> Option<u32> {
    let mut candidate = assumptions.clone();
    match config.goal {
        SolveGoal::RequiredUtilization => {
            candidate.utilization_rate = value.max(0.0);
        }
        SolveGoal::RequiredSessionPrice => {
            let per_session = value.max(0.0);
            candidate.single_session_price = per_session;
            candidate.three_session_package_total = per_session * 3.0;
            candidate.twenty_session_package_total = per_session * 20.0;
            candidate.forty_session_package_total = per_session * 40.0;
        }
    }

    project(&candidate, config.horizon_months).break_even_month
}

fn validate_config(config: SolveConfig) -> Result<(), String> {
    if config.target_break_even_month == 0 {
        return Err("target_break_even_month must be >= 1".to_string());
    }
    if config.horizon_months < config.target_break_even_month {
        return Err("horizon_months must be >= target_break_even_month".to_string());
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err("search bounds must be finite".to_string());
    }
    if config.search_min < 0.0 {
        return Err("search_min must be >= 0".to_string());
    }
    if config.search_max <= config.search_min {
        return Err("search_max must be greater than search_min".to_string());
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err("tolerance must be > 0".to_string());
    }
    if config.max_iterations == 0 {
        return Err("max_iterations must be > 0".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    /// No financing, flat $100/session across all tiers, $1,000/month of
    /// operating costs, five sessions/week of capacity. Monthly revenue
    /// is 5 * 4.33 * (u / 100) * 100 = 21.65 * u, so break-even in
    /// month 1 needs u > 1000 / 21.65 = 46.189...
    fn flat_price_assumptions() -> Assumptions {
        Assumptions {
            chamber_cost: 10_000.0,
            installation_cost: 0.0,
            facility_setup_cost: 0.0,
            training_cost: 0.0,
            single_session_price: 100.0,
            three_session_package_total: 300.0,
            twenty_session_package_total: 2_000.0,
            forty_session_package_total: 4_000.0,
            sessions_per_day: 1,
            operating_days_per_week: 5,
            utilization_rate: 50.0,
            ramp_up_months: 0,
            single_session_mix: 100.0,
            three_session_mix: 0.0,
            twenty_session_mix: 0.0,
            forty_session_mix: 0.0,
            staff_costs: 1_000.0,
            electricity_cost: 0.0,
            oxygen_cost: 0.0,
            maintenance_cost: 0.0,
            insurance_cost: 0.0,
            facility_cost: 0.0,
            marketing_cost: 0.0,
            other_costs: 0.0,
            down_payment: 0.0,
            interest_rate: 0.0,
            loan_term_years: 0,
        }
    }

    #[test]
    fn required_utilization_matches_analytic_threshold() {
        let assumptions = flat_price_assumptions();
        let config = SolveConfig {
            goal: SolveGoal::RequiredUtilization,
            target_break_even_month: 1,
            horizon_months: 12,
            search_min: 0.0,
            search_max: 100.0,
            tolerance: 0.01,
            max_iterations: 40,
        };

        let result = solve_goal(&assumptions, config).expect("must solve");
        assert!(result.feasible);
        assert!(result.converged);
        assert_close(
            result.solved_value.expect("value expected"),
            1_000.0 / 21.65,
            config.tolerance + 0.01,
        );
        assert_eq!(result.achieved_break_even_month, Some(1));
    }

    #[test]
    fn required_session_price_matches_analytic_threshold() {
        let mut assumptions = flat_price_assumptions();
        assumptions.utilization_rate = 100.0;

        let config = SolveConfig {
            goal: SolveGoal::RequiredSessionPrice,
            target_break_even_month: 1,
            horizon_months: 12,
            search_min: 0.0,
            search_max: 500.0,
            tolerance: 0.01,
            max_iterations: 40,
        };

        // 21.65 sessions at full utilization; break-even in month 1
        // needs price > 1000 / 21.65.
        let result = solve_goal(&assumptions, config).expect("must solve");
        assert!(result.feasible);
        assert_close(
            result.solved_value.expect("value expected"),
            1_000.0 / 21.65,
            config.tolerance + 0.01,
        );
    }

    #[test]
    fn reports_infeasible_when_bounds_cannot_break_even() {
        let mut assumptions = flat_price_assumptions();
        assumptions.staff_costs = 1_000_000.0;

        let config = SolveConfig {
            goal: SolveGoal::RequiredUtilization,
            target_break_even_month: 6,
            horizon_months: 12,
            search_min: 0.0,
            search_max: 100.0,
            tolerance: 0.01,
            max_iterations: 40,
        };

        let result = solve_goal(&assumptions, config).expect("must return result");
        assert!(!result.feasible);
        assert!(result.solved_value.is_none());
        assert!(result.achieved_break_even_month.is_none());
    }

    #[test]
    fn lower_bound_that_already_breaks_even_short_circuits() {
        let mut assumptions = flat_price_assumptions();
        assumptions.staff_costs = 0.0;

        let config = SolveConfig {
            goal: SolveGoal::RequiredUtilization,
            target_break_even_month: 1,
            horizon_months: 12,
            search_min: 50.0,
            search_max: 100.0,
            tolerance: 0.01,
            max_iterations: 40,
        };

        let result = solve_goal(&assumptions, config).expect("must solve");
        assert!(result.converged);
        assert_eq!(result.solved_value, Some(50.0));
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn rejects_inverted_search_bounds() {
        let config = SolveConfig {
            goal: SolveGoal::RequiredUtilization,
            target_break_even_month: 6,
            horizon_months: 12,
            search_min: 80.0,
            search_max: 40.0,
            tolerance: 0.01,
            max_iterations: 40,
        };

        let err = solve_goal(&flat_price_assumptions(), config).expect_err("must reject");
        assert!(err.contains("search_max"));
    }

    #[test]
    fn rejects_target_month_beyond_horizon() {
        let config = SolveConfig {
            goal: SolveGoal::RequiredUtilization,
            target_break_even_month: 24,
            horizon_months: 12,
            search_min: 0.0,
            search_max: 100.0,
            tolerance: 0.01,
            max_iterations: 40,
        };

        let err = solve_goal(&flat_price_assumptions(), config).expect_err("must reject");
        assert!(err.contains("horizon_months"));
    }
}
