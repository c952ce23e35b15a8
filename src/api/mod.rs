use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{Assumptions, Projection, SolveConfig, SolveGoal, project, solve_goal};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiSolveGoal {
    #[serde(alias = "requiredUtilization", alias = "utilization")]
    RequiredUtilization,
    #[serde(alias = "requiredSessionPrice", alias = "price")]
    RequiredSessionPrice,
}

impl From<ApiSolveGoal> for SolveGoal {
    fn from(value: ApiSolveGoal) -> Self {
        match value {
            ApiSolveGoal::RequiredUtilization => SolveGoal::RequiredUtilization,
            ApiSolveGoal::RequiredSessionPrice => SolveGoal::RequiredSessionPrice,
        }
    }
}

/// Assumption overrides as the calculator page sends them. Every field
/// is optional; anything omitted falls back to the documented defaults
/// on `Cli`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    projection_months: Option<u32>,

    chamber_cost: Option<f64>,
    installation_cost: Option<f64>,
    facility_setup_cost: Option<f64>,
    training_cost: Option<f64>,

    single_session_price: Option<f64>,
    three_session_package_total: Option<f64>,
    twenty_session_package_total: Option<f64>,
    forty_session_package_total: Option<f64>,

    sessions_per_day: Option<u32>,
    operating_days_per_week: Option<u32>,
    utilization_rate: Option<f64>,
    ramp_up_months: Option<u32>,

    single_session_mix: Option<f64>,
    three_session_mix: Option<f64>,
    twenty_session_mix: Option<f64>,
    forty_session_mix: Option<f64>,

    staff_costs: Option<f64>,
    electricity_cost: Option<f64>,
    oxygen_cost: Option<f64>,
    maintenance_cost: Option<f64>,
    insurance_cost: Option<f64>,
    facility_cost: Option<f64>,
    marketing_cost: Option<f64>,
    other_costs: Option<f64>,

    down_payment: Option<f64>,
    interest_rate: Option<f64>,
    loan_term_years: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    goal: Option<ApiSolveGoal>,
    target_break_even_month: Option<u32>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,

    #[serde(flatten)]
    assumptions: ProjectPayload,
}

/// The default clinic model. The clap attributes double as the
/// documentation for what each knob means and where it starts.
#[derive(Parser, Debug)]
#[command(
    name = "hbot",
    about = "HBOT chamber purchase calculator (revenue, costs, financing, break-even)"
)]
struct Cli {
    #[arg(long, default_value_t = 78_846.45, help = "Chamber purchase cost")]
    chamber_cost: f64,
    #[arg(long, default_value_t = 0.0)]
    installation_cost: f64,
    #[arg(long, default_value_t = 0.0)]
    facility_setup_cost: f64,
    #[arg(long, default_value_t = 0.0)]
    training_cost: f64,
    #[arg(long, default_value_t = 180.0, help = "Walk-in price for one session")]
    single_session_price: f64,
    #[arg(long, default_value_t = 500.0, help = "Bundle total for 3 sessions")]
    three_session_package_total: f64,
    #[arg(long, default_value_t = 3_000.0, help = "Bundle total for 20 sessions")]
    twenty_session_package_total: f64,
    #[arg(long, default_value_t = 5_500.0, help = "Bundle total for 40 sessions")]
    forty_session_package_total: f64,
    #[arg(long, default_value_t = 6)]
    sessions_per_day: u32,
    #[arg(long, default_value_t = 5)]
    operating_days_per_week: u32,
    #[arg(
        long,
        default_value_t = 70.0,
        help = "Share of capacity actually booked, in percent"
    )]
    utilization_rate: f64,
    #[arg(
        long,
        default_value_t = 6,
        help = "Months of linear ramp from zero to full volume"
    )]
    ramp_up_months: u32,
    #[arg(
        long,
        default_value_t = 30.0,
        help = "Share of sessions sold as single sessions, in percent"
    )]
    single_session_mix: f64,
    #[arg(long, default_value_t = 20.0)]
    three_session_mix: f64,
    #[arg(long, default_value_t = 35.0)]
    twenty_session_mix: f64,
    #[arg(long, default_value_t = 15.0)]
    forty_session_mix: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly staff costs")]
    staff_costs: f64,
    #[arg(long, default_value_t = 0.0)]
    electricity_cost: f64,
    #[arg(long, default_value_t = 0.0)]
    oxygen_cost: f64,
    #[arg(long, default_value_t = 0.0)]
    maintenance_cost: f64,
    #[arg(long, default_value_t = 0.0)]
    insurance_cost: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly facility/rent cost")]
    facility_cost: f64,
    #[arg(long, default_value_t = 0.0)]
    marketing_cost: f64,
    #[arg(long, default_value_t = 0.0)]
    other_costs: f64,
    #[arg(long, default_value_t = 45_000.0)]
    down_payment: f64,
    #[arg(long, default_value_t = 5.0, help = "Annual interest rate in percent")]
    interest_rate: f64,
    #[arg(long, default_value_t = 5)]
    loan_term_years: u32,
    #[arg(long, default_value_t = 24, help = "Projection horizon in months")]
    projection_months: u32,
}

#[derive(Debug)]
struct ApiRequest {
    assumptions: Assumptions,
    horizon_months: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    horizon_months: u32,
    #[serde(flatten)]
    projection: Projection,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_assumptions(cli: &Cli) -> Result<Assumptions, String> {
    for (name, value) in [
        ("chamberCost", cli.chamber_cost),
        ("installationCost", cli.installation_cost),
        ("facilitySetupCost", cli.facility_setup_cost),
        ("trainingCost", cli.training_cost),
        ("singleSessionPrice", cli.single_session_price),
        ("threeSessionPackageTotal", cli.three_session_package_total),
        ("twentySessionPackageTotal", cli.twenty_session_package_total),
        ("fortySessionPackageTotal", cli.forty_session_package_total),
        ("utilizationRate", cli.utilization_rate),
        ("singleSessionMix", cli.single_session_mix),
        ("threeSessionMix", cli.three_session_mix),
        ("twentySessionMix", cli.twenty_session_mix),
        ("fortySessionMix", cli.forty_session_mix),
        ("staffCosts", cli.staff_costs),
        ("electricityCost", cli.electricity_cost),
        ("oxygenCost", cli.oxygen_cost),
        ("maintenanceCost", cli.maintenance_cost),
        ("insuranceCost", cli.insurance_cost),
        ("facilityCost", cli.facility_cost),
        ("marketingCost", cli.marketing_cost),
        ("otherCosts", cli.other_costs),
        ("downPayment", cli.down_payment),
        ("interestRate", cli.interest_rate),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be a finite number >= 0"));
        }
    }

    if cli.operating_days_per_week > 7 {
        return Err("operatingDaysPerWeek must be between 0 and 7".to_string());
    }

    Ok(Assumptions {
        chamber_cost: cli.chamber_cost,
        installation_cost: cli.installation_cost,
        facility_setup_cost: cli.facility_setup_cost,
        training_cost: cli.training_cost,
        single_session_price: cli.single_session_price,
        three_session_package_total: cli.three_session_package_total,
        twenty_session_package_total: cli.twenty_session_package_total,
        forty_session_package_total: cli.forty_session_package_total,
        sessions_per_day: cli.sessions_per_day,
        operating_days_per_week: cli.operating_days_per_week,
        utilization_rate: cli.utilization_rate,
        ramp_up_months: cli.ramp_up_months,
        single_session_mix: cli.single_session_mix,
        three_session_mix: cli.three_session_mix,
        twenty_session_mix: cli.twenty_session_mix,
        forty_session_mix: cli.forty_session_mix,
        staff_costs: cli.staff_costs,
        electricity_cost: cli.electricity_cost,
        oxygen_cost: cli.oxygen_cost,
        maintenance_cost: cli.maintenance_cost,
        insurance_cost: cli.insurance_cost,
        facility_cost: cli.facility_cost,
        marketing_cost: cli.marketing_cost,
        other_costs: cli.other_costs,
        down_payment: cli.down_payment,
        interest_rate: cli.interest_rate,
        loan_term_years: cli.loan_term_years,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/solve", axum::routing::post(solve_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Hyperbaric HQ site listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let projection = project(&request.assumptions, request.horizon_months);
    json_response(
        StatusCode::OK,
        ProjectResponse {
            horizon_months: request.horizon_months,
            projection,
        },
    )
}

async fn solve_post_handler(Json(payload): Json<SolvePayload>) -> Response {
    let config_payload = SolveConfigPayload {
        goal: payload.goal,
        target_break_even_month: payload.target_break_even_month,
        search_min: payload.search_min,
        search_max: payload.search_max,
        tolerance: payload.tolerance,
        max_iterations: payload.max_iterations,
    };
    let request = match api_request_from_payload(payload.assumptions) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let config = solve_config_from_payload(config_payload, request.horizon_months);
    match solve_goal(&request.assumptions, config) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

#[derive(Debug, Default)]
struct SolveConfigPayload {
    goal: Option<ApiSolveGoal>,
    target_break_even_month: Option<u32>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

fn solve_config_from_payload(payload: SolveConfigPayload, horizon_months: u32) -> SolveConfig {
    let goal = payload
        .goal
        .map(SolveGoal::from)
        .unwrap_or(SolveGoal::RequiredUtilization);
    let default_search_max = match goal {
        SolveGoal::RequiredUtilization => 200.0,
        SolveGoal::RequiredSessionPrice => 2_000.0,
    };

    SolveConfig {
        goal,
        target_break_even_month: payload.target_break_even_month.unwrap_or(horizon_months),
        horizon_months,
        search_min: payload.search_min.unwrap_or(0.0),
        search_max: payload.search_max.unwrap_or(default_search_max),
        tolerance: payload.tolerance.unwrap_or(0.01),
        max_iterations: payload.max_iterations.unwrap_or(64),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.projection_months {
        cli.projection_months = v;
    }

    if let Some(v) = payload.chamber_cost {
        cli.chamber_cost = v;
    }
    if let Some(v) = payload.installation_cost {
        cli.installation_cost = v;
    }
    if let Some(v) = payload.facility_setup_cost {
        cli.facility_setup_cost = v;
    }
    if let Some(v) = payload.training_cost {
        cli.training_cost = v;
    }

    if let Some(v) = payload.single_session_price {
        cli.single_session_price = v;
    }
    if let Some(v) = payload.three_session_package_total {
        cli.three_session_package_total = v;
    }
    if let Some(v) = payload.twenty_session_package_total {
        cli.twenty_session_package_total = v;
    }
    if let Some(v) = payload.forty_session_package_total {
        cli.forty_session_package_total = v;
    }

    if let Some(v) = payload.sessions_per_day {
        cli.sessions_per_day = v;
    }
    if let Some(v) = payload.operating_days_per_week {
        cli.operating_days_per_week = v;
    }
    if let Some(v) = payload.utilization_rate {
        cli.utilization_rate = v;
    }
    if let Some(v) = payload.ramp_up_months {
        cli.ramp_up_months = v;
    }

    if let Some(v) = payload.single_session_mix {
        cli.single_session_mix = v;
    }
    if let Some(v) = payload.three_session_mix {
        cli.three_session_mix = v;
    }
    if let Some(v) = payload.twenty_session_mix {
        cli.twenty_session_mix = v;
    }
    if let Some(v) = payload.forty_session_mix {
        cli.forty_session_mix = v;
    }

    if let Some(v) = payload.staff_costs {
        cli.staff_costs = v;
    }
    if let Some(v) = payload.electricity_cost {
        cli.electricity_cost = v;
    }
    if let Some(v) = payload.oxygen_cost {
        cli.oxygen_cost = v;
    }
    if let Some(v) = payload.maintenance_cost {
        cli.maintenance_cost = v;
    }
    if let Some(v) = payload.insurance_cost {
        cli.insurance_cost = v;
    }
    if let Some(v) = payload.facility_cost {
        cli.facility_cost = v;
    }
    if let Some(v) = payload.marketing_cost {
        cli.marketing_cost = v;
    }
    if let Some(v) = payload.other_costs {
        cli.other_costs = v;
    }

    if let Some(v) = payload.down_payment {
        cli.down_payment = v;
    }
    if let Some(v) = payload.interest_rate {
        cli.interest_rate = v;
    }
    if let Some(v) = payload.loan_term_years {
        cli.loan_term_years = v;
    }

    if cli.projection_months == 0 {
        return Err("projectionMonths must be >= 1".to_string());
    }

    let assumptions = build_assumptions(&cli)?;
    Ok(ApiRequest {
        assumptions,
        horizon_months: cli.projection_months,
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        chamber_cost: 78_846.45,
        installation_cost: 0.0,
        facility_setup_cost: 0.0,
        training_cost: 0.0,
        single_session_price: 180.0,
        three_session_package_total: 500.0,
        twenty_session_package_total: 3_000.0,
        forty_session_package_total: 5_500.0,
        sessions_per_day: 6,
        operating_days_per_week: 5,
        utilization_rate: 70.0,
        ramp_up_months: 6,
        single_session_mix: 30.0,
        three_session_mix: 20.0,
        twenty_session_mix: 35.0,
        forty_session_mix: 15.0,
        staff_costs: 0.0,
        electricity_cost: 0.0,
        oxygen_cost: 0.0,
        maintenance_cost: 0.0,
        insurance_cost: 0.0,
        facility_cost: 0.0,
        marketing_cost: 0.0,
        other_costs: 0.0,
        down_payment: 45_000.0,
        interest_rate: 5.0,
        loan_term_years: 5,
        projection_months: 24,
    }
}
