use serde::Serialize;

/// Everything the projection depends on. Percentages are 0-100, currency
/// amounts are whatever unit the caller displays in. The engine never
/// mutates or validates these; the HTTP boundary rejects non-finite and
/// negative values before an `Assumptions` is built.
#[derive(Debug, Clone)]
pub struct Assumptions {
    pub chamber_cost: f64,
    pub installation_cost: f64,
    pub facility_setup_cost: f64,
    pub training_cost: f64,
    pub single_session_price: f64,
    pub three_session_package_total: f64,
    pub twenty_session_package_total: f64,
    pub forty_session_package_total: f64,
    pub sessions_per_day: u32,
    pub operating_days_per_week: u32,
    pub utilization_rate: f64,
    pub ramp_up_months: u32,
    pub single_session_mix: f64,
    pub three_session_mix: f64,
    pub twenty_session_mix: f64,
    pub forty_session_mix: f64,
    pub staff_costs: f64,
    pub electricity_cost: f64,
    pub oxygen_cost: f64,
    pub maintenance_cost: f64,
    pub insurance_cost: f64,
    pub facility_cost: f64,
    pub marketing_cost: f64,
    pub other_costs: f64,
    pub down_payment: f64,
    pub interest_rate: f64,
    pub loan_term_years: u32,
}

/// Per-session prices for each package tier once the bundle totals are
/// divided out.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagePrices {
    pub single: f64,
    pub three: f64,
    pub twenty: f64,
    pub forty: f64,
}

/// One simulated month. `sessions` is rounded for display only; revenue
/// is computed from the unrounded volume.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecord {
    pub month: u32,
    pub sessions: u32,
    pub revenue: f64,
    pub operating_costs: f64,
    pub loan_payment: f64,
    pub net_profit: f64,
    pub cumulative_profit: f64,
    pub cumulative_cash_flow: f64,
}

/// Full projection output: derived scalars plus the ordered monthly
/// series. `break_even_month` is `None` when cumulative cash flow never
/// turns positive within the horizon.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub total_initial_investment: f64,
    pub monthly_loan_payment: f64,
    pub target_monthly_sessions: f64,
    pub weighted_average_session_price: f64,
    pub monthly_operating_costs: f64,
    pub package_prices: PackagePrices,
    pub months: Vec<MonthlyRecord>,
    pub break_even_month: Option<u32>,
    pub total_revenue: f64,
    pub total_costs: f64,
    pub return_on_investment_percent: f64,
    pub average_monthly_profit: f64,
}
