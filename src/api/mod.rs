mod goals;

use axum::{
    Router,
    extract::{
        Json, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    ChartPoint, Inputs, ProjectionResult, ProjectionSummary, WithdrawalMarker, balance_series,
    render_text_report, simulate, summarize, withdrawal_markers,
};

pub use goals::{DEFAULT_GOALS, GoalBook};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MAX_RATE_PERCENT: f64 = 100.0;
const MAX_HORIZON_MONTHS: i64 = 600;
const MAX_INITIAL_BALANCE: i64 = 100_000_000;
const MAX_MONTHLY_AMOUNT: i64 = 10_000_000;
const MAX_GOAL: i64 = 10_000_000;

#[derive(Parser, Debug)]
#[command(
    name = "goalsim",
    about = "Monthly investment projection with goal-triggered withdrawals"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one projection and print the summary
    Project(ProjectArgs),
    /// Serve the web page and the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(
        long,
        default_value_t = 1.0,
        allow_negative_numbers = true,
        help = "Monthly growth rate in percent, e.g. 1"
    )]
    rate: f64,
    #[arg(
        long,
        default_value_t = 120,
        allow_negative_numbers = true,
        help = "Number of months to project"
    )]
    horizon_months: i64,
    #[arg(long, default_value_t = 15_000, allow_negative_numbers = true)]
    initial_balance: i64,
    #[arg(
        long,
        default_value_t = 1_000,
        allow_negative_numbers = true,
        help = "Amount added every month after growth"
    )]
    monthly_contribution: i64,
    #[arg(
        long,
        default_value_t = 5_000,
        allow_negative_numbers = true,
        help = "Amount withdrawn each time a goal is crossed"
    )]
    withdrawal_amount: i64,
    #[arg(
        long = "goal",
        allow_negative_numbers = true,
        help = "Target balance that triggers one withdrawal; repeat for several goals"
    )]
    goals: Vec<i64>,
    #[arg(long, help = "Print the full JSON response instead of the text summary")]
    json: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GoalsField {
    List(Vec<i64>),
    Csv(String),
}

impl GoalsField {
    fn into_goals(self) -> Result<Vec<i64>, String> {
        match self {
            GoalsField::List(goals) => Ok(goals),
            GoalsField::Csv(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    part.parse::<i64>()
                        .map_err(|_| format!("--goal value '{part}' is not a whole number"))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    rate: Option<f64>,
    horizon_months: Option<i64>,
    initial_balance: Option<i64>,
    monthly_contribution: Option<i64>,
    withdrawal_amount: Option<i64>,
    goals: Option<GoalsField>,
}

#[derive(Debug, Deserialize)]
struct AddGoalPayload {
    goal: i64,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: Inputs,
    goals: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    rate_percent: f64,
    horizon_months: u32,
    initial_balance: i64,
    monthly_contribution: i64,
    withdrawal_amount: i64,
    goals: Vec<i64>,
    balance_after: Vec<i64>,
    balance_before: Vec<i64>,
    withdrawal_months: Vec<u32>,
    series: Vec<ChartPoint>,
    markers: Vec<WithdrawalMarker>,
    summary: ProjectionSummary,
}

#[derive(Debug, Serialize)]
struct GoalsResponse {
    goals: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(args: &ProjectArgs) -> Result<Inputs, String> {
    if !args.rate.is_finite() || args.rate < 0.0 {
        return Err("--rate must be >= 0".to_string());
    }

    if args.rate > MAX_RATE_PERCENT {
        return Err(format!("--rate must be <= {MAX_RATE_PERCENT}"));
    }

    if args.horizon_months <= 0 {
        return Err("--horizon-months must be > 0".to_string());
    }

    if args.horizon_months > MAX_HORIZON_MONTHS {
        return Err(format!("--horizon-months must be <= {MAX_HORIZON_MONTHS}"));
    }

    validate_goals(&args.goals)?;

    if args.initial_balance < 0 || args.monthly_contribution < 0 || args.withdrawal_amount < 0 {
        return Err(
            "--initial-balance, --monthly-contribution and --withdrawal-amount must be >= 0"
                .to_string(),
        );
    }

    if args.initial_balance > MAX_INITIAL_BALANCE {
        return Err(format!("--initial-balance must be <= {MAX_INITIAL_BALANCE}"));
    }

    for (name, amount) in [
        ("--monthly-contribution", args.monthly_contribution),
        ("--withdrawal-amount", args.withdrawal_amount),
    ] {
        if amount > MAX_MONTHLY_AMOUNT {
            return Err(format!("{name} must be <= {MAX_MONTHLY_AMOUNT}"));
        }
    }

    if !goal_free_peak_fits(args) {
        return Err(
            "--rate, --horizon-months, --initial-balance and --monthly-contribution grow the balance past the supported maximum"
                .to_string(),
        );
    }

    Ok(Inputs {
        rate_percent: args.rate,
        monthly_contribution: args.monthly_contribution,
        withdrawal_amount: args.withdrawal_amount,
        horizon_months: args.horizon_months as u32,
        initial_balance: args.initial_balance,
    })
}

// Withdrawals only lower the balance and growth is monotone for rate >= 0, so
// the goal-free path bounds every run with the same parameters.
fn goal_free_peak_fits(args: &ProjectArgs) -> bool {
    let growth = 1.0 + args.rate / 100.0;
    let mut balance = args.initial_balance as f64;
    for _ in 0..args.horizon_months {
        balance = (balance * growth + args.monthly_contribution as f64).trunc();
        if !(balance < i64::MAX as f64) {
            return false;
        }
    }
    true
}

fn validate_goals(goals: &[i64]) -> Result<(), String> {
    if goals.iter().any(|&goal| goal <= 0) {
        return Err("every --goal must be > 0".to_string());
    }
    if goals.iter().any(|&goal| goal > MAX_GOAL) {
        return Err(format!("every --goal must be <= {MAX_GOAL}"));
    }
    Ok(())
}

/// Runs the `project` subcommand and returns what should be printed.
pub fn run_projection(args: ProjectArgs) -> Result<String, String> {
    let inputs = build_inputs(&args)?;
    let result = simulate(&inputs, &args.goals).map_err(|e| e.to_string())?;
    let response = build_simulate_response(&inputs, &args.goals, &result);

    if args.json {
        let json = serde_json::to_string_pretty(&response)
            .map_err(|e| format!("failed to serialize projection: {e}"))?;
        Ok(format!("{json}\n"))
    } else {
        Ok(render_text_report(&response.summary))
    }
}

pub fn router(book: GoalBook) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route(
            "/api/goals",
            get(goals_get_handler)
                .post(goals_post_handler)
                .delete(goals_delete_handler),
        )
        .fallback(not_found_handler)
        .with_state(book)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(GoalBook::new());

    let listener = TcpListener::bind(addr).await?;
    info!("projection HTTP API listening on http://{addr}");
    info!("local access: http://127.0.0.1:{port}/");

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

async fn simulate_get_handler(
    State(book): State<GoalBook>,
    payload: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_handler_impl(&book, payload),
        Err(rejection) => error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

async fn simulate_post_handler(
    State(book): State<GoalBook>,
    payload: Result<Json<SimulatePayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_handler_impl(&book, payload),
        Err(rejection) => error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    }
}

fn simulate_handler_impl(book: &GoalBook, payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload, book) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match simulate(&request.inputs, &request.goals) {
        Ok(result) => json_response(
            StatusCode::OK,
            build_simulate_response(&request.inputs, &request.goals, &result),
        ),
        Err(e) => {
            warn!(error = %e, "projection rejected");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string())
        }
    }
}

async fn goals_get_handler(State(book): State<GoalBook>) -> Response {
    json_response(
        StatusCode::OK,
        GoalsResponse {
            goals: book.sorted(),
        },
    )
}

async fn goals_post_handler(
    State(book): State<GoalBook>,
    payload: Result<Json<AddGoalPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, &rejection.body_text());
        }
    };
    if let Err(msg) = validate_goals(&[payload.goal]) {
        return error_response(StatusCode::BAD_REQUEST, &msg);
    }
    book.add(payload.goal);
    info!(goal = payload.goal, "goal added");
    json_response(
        StatusCode::OK,
        GoalsResponse {
            goals: book.sorted(),
        },
    )
}

async fn goals_delete_handler(State(book): State<GoalBook>) -> Response {
    book.clear();
    info!("goals cleared");
    json_response(StatusCode::OK, GoalsResponse { goals: Vec::new() })
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
fn api_request_from_json(json: &str, book: &GoalBook) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload, book)
}

fn api_request_from_payload(
    payload: SimulatePayload,
    book: &GoalBook,
) -> Result<ApiRequest, String> {
    let mut args = default_args_for_api();

    if let Some(v) = payload.rate {
        args.rate = v;
    }
    if let Some(v) = payload.horizon_months {
        args.horizon_months = v;
    }
    if let Some(v) = payload.initial_balance {
        args.initial_balance = v;
    }
    if let Some(v) = payload.monthly_contribution {
        args.monthly_contribution = v;
    }
    if let Some(v) = payload.withdrawal_amount {
        args.withdrawal_amount = v;
    }
    args.goals = match payload.goals {
        Some(field) => field.into_goals()?,
        None => book.snapshot(),
    };

    let inputs = build_inputs(&args)?;
    Ok(ApiRequest {
        inputs,
        goals: args.goals,
    })
}

fn default_args_for_api() -> ProjectArgs {
    ProjectArgs {
        rate: 1.0,
        horizon_months: 120,
        initial_balance: 15_000,
        monthly_contribution: 1_000,
        withdrawal_amount: 5_000,
        goals: DEFAULT_GOALS.to_vec(),
        json: false,
    }
}

fn build_simulate_response(
    inputs: &Inputs,
    goals: &[i64],
    result: &ProjectionResult,
) -> SimulateResponse {
    SimulateResponse {
        rate_percent: inputs.rate_percent,
        horizon_months: inputs.horizon_months,
        initial_balance: inputs.initial_balance,
        monthly_contribution: inputs.monthly_contribution,
        withdrawal_amount: inputs.withdrawal_amount,
        goals: goals.to_vec(),
        balance_after: result.balance_after.clone(),
        balance_before: result.balance_before.clone(),
        withdrawal_months: result.withdrawal_months.clone(),
        series: balance_series(result),
        markers: withdrawal_markers(result),
        summary: summarize(inputs, result),
    }
}
