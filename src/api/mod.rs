use std::ffi::OsString;
use std::net::SocketAddr;

use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    GoalSolveConfig, GoalSolveResult, GoalType, Inputs, ProjectionError, ProjectionSummary,
    SolveError, YearRecord, project, solve_goal, summarize,
};
use crate::report::{Currency, format_money, render_text};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const AGE_ORDER_ERROR: &str = "Retirement age must be greater than current age.";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliGoal {
    RequiredContribution,
    MaxCosts,
}

impl From<CliGoal> for GoalType {
    fn from(value: CliGoal) -> Self {
        match value {
            CliGoal::RequiredContribution => GoalType::RequiredContribution,
            CliGoal::MaxCosts => GoalType::MaxAnnualCosts,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoal {
    #[serde(alias = "requiredContribution", alias = "required_contribution")]
    RequiredContribution,
    #[serde(
        alias = "maxCosts",
        alias = "max_costs",
        alias = "max-annual-costs",
        alias = "maxAnnualCosts"
    )]
    MaxCosts,
}

impl From<ApiGoal> for CliGoal {
    fn from(value: ApiGoal) -> Self {
        match value {
            ApiGoal::RequiredContribution => CliGoal::RequiredContribution,
            ApiGoal::MaxCosts => CliGoal::MaxCosts,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    current_savings: Option<f64>,
    #[serde(alias = "annualContribution")]
    annual_savings: Option<f64>,
    current_age: Option<i64>,
    retirement_age: Option<i64>,
    expected_return: Option<f64>,
    expected_inflation: Option<f64>,
    expected_costs: Option<f64>,
    currency: Option<Currency>,

    goal: Option<ApiGoal>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Year-by-year retirement savings projection (run `nestegg serve [port]` for the web page)"
)]
struct Cli {
    #[arg(long, default_value_t = 0.0)]
    current_savings: f64,
    #[arg(long, default_value_t = 0.0)]
    annual_contribution: f64,
    #[arg(long)]
    current_age: u32,
    #[arg(long)]
    retirement_age: u32,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Expected annual return in percent, e.g. 5"
    )]
    expected_return: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Expected annual inflation in percent; grows contributions and costs"
    )]
    expected_inflation: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Annual costs withdrawn after retirement, in today's money"
    )]
    expected_costs: f64,
    #[arg(long, value_enum, default_value_t = Currency::Usd)]
    currency: Currency,
    #[arg(long, help = "Print the summary lines without the yearly table")]
    summary_only: bool,
    #[arg(long, help = "Print the projection as JSON")]
    json: bool,
    #[arg(long, value_enum, help = "Solve for a goal instead of printing a projection")]
    solve: Option<CliGoal>,
    #[arg(
        long,
        default_value_t = 1_000_000.0,
        help = "Upper bound of the goal search"
    )]
    search_max: f64,
    #[arg(long, default_value_t = 0.01, help = "Goal search tolerance")]
    tolerance: f64,
    #[arg(long, default_value_t = 100)]
    max_iterations: u32,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Args(#[from] clap::Error),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("failed to encode JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
struct ApiRequest {
    inputs: Inputs,
    currency: Currency,
    goal: GoalSolveConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    currency: Currency,
    summary: ProjectionSummary,
    years: Vec<YearRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    currency: Currency,
    result: GoalSolveResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: &Cli) -> Inputs {
    Inputs {
        current_savings: cli.current_savings,
        annual_contribution: cli.annual_contribution,
        current_age: cli.current_age,
        retirement_age: cli.retirement_age,
        expected_return_percent: cli.expected_return,
        expected_inflation_percent: cli.expected_inflation,
        expected_annual_costs: cli.expected_costs,
    }
}

fn build_goal_config(cli: &Cli) -> Option<GoalSolveConfig> {
    cli.solve.map(|goal| GoalSolveConfig {
        goal_type: goal.into(),
        search_min: 0.0,
        search_max: cli.search_max,
        tolerance: cli.tolerance,
        max_iterations: cli.max_iterations,
    })
}

/// Parses `args` (program name first) and returns the text to print.
pub fn run_cli<I, T>(args: I) -> Result<String, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let inputs = build_inputs(&cli);

    if let Some(config) = build_goal_config(&cli) {
        let result = solve_goal(&inputs, config)?;
        if cli.json {
            let response = SolveResponse {
                currency: cli.currency,
                result,
            };
            return Ok(format!("{}\n", serde_json::to_string_pretty(&response)?));
        }
        return Ok(render_solve_text(&result, cli.currency));
    }

    let records = project(&inputs)?;
    let summary = summarize(&inputs, &records);
    log::debug!(
        "projected {} years from age {} (retirement at {})",
        records.len(),
        inputs.current_age,
        inputs.retirement_age
    );

    if cli.json {
        let response = ProjectResponse {
            currency: cli.currency,
            summary,
            years: records,
        };
        return Ok(format!("{}\n", serde_json::to_string_pretty(&response)?));
    }
    Ok(render_text(&summary, &records, cli.currency, !cli.summary_only))
}

fn render_solve_text(result: &GoalSolveResult, currency: Currency) -> String {
    let label = match result.goal_type {
        GoalType::RequiredContribution => "Required annual contribution",
        GoalType::MaxAnnualCosts => "Maximum sustainable annual costs",
    };
    let mut out = format!("{}\n", result.message);
    if let Some(value) = result.solved_value {
        out.push_str(&format!("{label}: {}\n", format_money(value, currency)));
    }
    if let Some(balance) = result.final_balance {
        out.push_str(&format!(
            "Estimated balance at end of simulation: {}\n",
            format_money(balance, currency)
        ));
    }
    out.push_str(&format!("Iterations: {}\n", result.iterations.len()));
    out
}

fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/solve",
            get(solve_get_handler).post(solve_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("nestegg HTTP API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
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

async fn project_get_handler(payload: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => project_handler_impl(payload),
        Err(rejection) => bad_request(&rejection.body_text()),
    }
}

async fn project_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload),
        Err(rejection) => bad_request(&rejection.body_text()),
    }
}

async fn solve_get_handler(payload: Result<Query<ProjectPayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => solve_handler_impl(payload),
        Err(rejection) => bad_request(&rejection.body_text()),
    }
}

async fn solve_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => solve_handler_impl(payload),
        Err(rejection) => bad_request(&rejection.body_text()),
    }
}

fn bad_request(msg: &str) -> Response {
    log::warn!("rejected request payload: {msg}");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };
    let records = match project(&request.inputs) {
        Ok(records) => records,
        Err(err) => {
            log::warn!("rejected projection request: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let summary = summarize(&request.inputs, &records);
    log::info!(
        "projection: ages {}..={}, depletion {:?}",
        request.inputs.current_age,
        records.last().map_or(request.inputs.current_age, |r| r.age),
        summary.depletion_age
    );
    json_response(
        StatusCode::OK,
        ProjectResponse {
            currency: request.currency,
            summary,
            years: records,
        },
    )
}

fn solve_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return bad_request(&msg),
    };
    match solve_goal(&request.inputs, request.goal) {
        Ok(result) => {
            log::info!(
                "solve {:?}: feasible={} value={:?} after {} iterations",
                result.goal_type,
                result.feasible,
                result.solved_value,
                result.iterations.len()
            );
            json_response(
                StatusCode::OK,
                SolveResponse {
                    currency: request.currency,
                    result,
                },
            )
        }
        Err(err) => {
            log::warn!("rejected solve request: {err}");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
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

fn payload_age(value: i64) -> Result<u32, String> {
    if value < 0 {
        return Err(AGE_ORDER_ERROR.to_string());
    }
    u32::try_from(value).map_err(|_| format!("age {value} is out of range"))
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_savings {
        cli.current_savings = v;
    }
    if let Some(v) = payload.annual_savings {
        cli.annual_contribution = v;
    }
    if let Some(v) = payload.current_age {
        cli.current_age = payload_age(v)?;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = payload_age(v)?;
    }
    if let Some(v) = payload.expected_return {
        cli.expected_return = v;
    }
    if let Some(v) = payload.expected_inflation {
        cli.expected_inflation = v;
    }
    if let Some(v) = payload.expected_costs {
        cli.expected_costs = v;
    }
    if let Some(v) = payload.currency {
        cli.currency = v;
    }

    let goal = payload.goal.map_or(CliGoal::RequiredContribution, CliGoal::from);
    if let Some(v) = payload.search_max {
        cli.search_max = v;
    }
    if let Some(v) = payload.tolerance {
        cli.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        cli.max_iterations = v;
    }

    let inputs = build_inputs(&cli);
    let goal = GoalSolveConfig {
        goal_type: goal.into(),
        search_min: 0.0,
        search_max: cli.search_max,
        tolerance: cli.tolerance,
        max_iterations: cli.max_iterations,
    };
    Ok(ApiRequest {
        inputs,
        currency: cli.currency,
        goal,
    })
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_savings: 50_000.0,
        annual_contribution: 6_000.0,
        current_age: 35,
        retirement_age: 65,
        expected_return: 6.0,
        expected_inflation: 2.5,
        expected_costs: 30_000.0,
        currency: Currency::Usd,
        summary_only: false,
        json: false,
        solve: None,
        search_max: 1_000_000.0,
        tolerance: 0.01,
        max_iterations: 100,
    }
}
