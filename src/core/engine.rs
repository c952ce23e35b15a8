use super::types::{Assumptions, MonthlyRecord, PackagePrices, Projection};

/// Average weeks per month used to convert weekly capacity into a
/// monthly session target.
const AVERAGE_WEEKS_PER_MONTH: f64 = 4.33;

/// Runs the month-by-month cash-flow projection over `horizon_months`
/// months. Pure and total: any structurally valid assumption set yields
/// a complete `Projection`, never a panic, NaN, or infinity.
pub fn project(assumptions: &Assumptions, horizon_months: u32) -> Projection {
    let total_initial_investment = assumptions.chamber_cost
        + assumptions.installation_cost
        + assumptions.facility_setup_cost
        + assumptions.training_cost;

    // Negative when the down payment exceeds the investment; the payment
    // then comes out negative or zero rather than failing.
    let loan_amount = total_initial_investment - assumptions.down_payment;
    let monthly_loan_payment = amortized_monthly_payment(
        loan_amount,
        assumptions.interest_rate,
        assumptions.loan_term_years,
    );

    let max_weekly_capacity =
        assumptions.sessions_per_day as f64 * assumptions.operating_days_per_week as f64;
    let target_weekly_sessions = max_weekly_capacity * (assumptions.utilization_rate / 100.0);
    let target_monthly_sessions = target_weekly_sessions * AVERAGE_WEEKS_PER_MONTH;

    let package_prices = PackagePrices {
        single: assumptions.single_session_price,
        three: assumptions.three_session_package_total / 3.0,
        twenty: assumptions.twenty_session_package_total / 20.0,
        forty: assumptions.forty_session_package_total / 40.0,
    };

    // Mix percentages are applied literally; callers who want them to
    // sum to 100 must enforce that themselves.
    let weighted_average_session_price = package_prices.single * assumptions.single_session_mix
        / 100.0
        + package_prices.three * assumptions.three_session_mix / 100.0
        + package_prices.twenty * assumptions.twenty_session_mix / 100.0
        + package_prices.forty * assumptions.forty_session_mix / 100.0;

    let monthly_operating_costs = assumptions.staff_costs
        + assumptions.electricity_cost
        + assumptions.oxygen_cost
        + assumptions.maintenance_cost
        + assumptions.insurance_cost
        + assumptions.facility_cost
        + assumptions.marketing_cost
        + assumptions.other_costs;

    let mut months = Vec::with_capacity(horizon_months as usize);
    let mut cumulative_revenue = 0.0;
    let mut cumulative_profit = 0.0;
    // The down payment leaves the door on day one, before any revenue.
    let mut cumulative_cash_flow = -assumptions.down_payment;

    for month in 1..=horizon_months {
        let ramp_up_factor = ramp_up_factor(month, assumptions.ramp_up_months);
        let monthly_sessions = target_monthly_sessions * ramp_up_factor;
        let monthly_revenue = monthly_sessions * weighted_average_session_price;
        let monthly_profit = monthly_revenue - monthly_operating_costs - monthly_loan_payment;

        cumulative_revenue += monthly_revenue;
        cumulative_profit += monthly_profit;
        cumulative_cash_flow += monthly_profit;

        months.push(MonthlyRecord {
            month,
            sessions: monthly_sessions.round() as u32,
            revenue: monthly_revenue,
            operating_costs: monthly_operating_costs,
            loan_payment: monthly_loan_payment,
            net_profit: monthly_profit,
            cumulative_profit,
            cumulative_cash_flow,
        });
    }

    let break_even_month = months
        .iter()
        .find(|m| m.cumulative_cash_flow > 0.0)
        .map(|m| m.month);

    let total_costs = (monthly_operating_costs + monthly_loan_payment) * horizon_months as f64;
    let return_on_investment_percent = if total_initial_investment == 0.0 {
        0.0
    } else {
        cumulative_profit / total_initial_investment * 100.0
    };
    let average_monthly_profit = if horizon_months == 0 {
        0.0
    } else {
        cumulative_profit / horizon_months as f64
    };

    Projection {
        total_initial_investment,
        monthly_loan_payment,
        target_monthly_sessions,
        weighted_average_session_price,
        monthly_operating_costs,
        package_prices,
        months,
        break_even_month,
        total_revenue: cumulative_revenue,
        total_costs,
        return_on_investment_percent,
        average_monthly_profit,
    }
}

/// Fixed-rate annuity payment. A zero-term loan means no financing, so
/// the payment is zero; a zero rate degenerates to straight-line
/// repayment instead of the 0/0 the closed form would produce.
fn amortized_monthly_payment(loan_amount: f64, annual_rate_percent: f64, term_years: u32) -> f64 {
    let total_payments = term_years.saturating_mul(12);
    if total_payments == 0 {
        return 0.0;
    }

    let monthly_rate = annual_rate_percent / 100.0 / 12.0;
    if monthly_rate == 0.0 {
        return loan_amount / total_payments as f64;
    }

    let growth = (1.0 + monthly_rate).powf(f64::from(total_payments));
    if growth.is_infinite() {
        // Terms long enough to overflow the annuity factor collapse to
        // the perpetuity limit.
        return loan_amount * monthly_rate;
    }
    loan_amount * monthly_rate * growth / (growth - 1.0)
}

/// Linear ramp from zero to full target over the first
/// `ramp_up_months` months. A zero ramp means full capacity from
/// month one.
fn ramp_up_factor(month: u32, ramp_up_months: u32) -> f64 {
    if ramp_up_months == 0 || month >= ramp_up_months {
        1.0
    } else {
        month as f64 / ramp_up_months as f64
    }
}
