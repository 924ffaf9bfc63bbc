use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    AccumulationInput, DEFAULT_HORIZON_PERIODS, DrawdownInput, DrawdownResult, GrowthInput,
    PipelineInputs, PipelineRun, Stage, StageResult, cascade_from, run_pipeline,
};

const MAX_HORIZON_YEARS: u32 = 1000;

const DEFAULT_INITIAL_INVESTMENT: f64 = 10_000.0;
const DEFAULT_CONTRIBUTION_YEARS: f64 = 20.0;
const DEFAULT_ANNUAL_RETURN_RATE: f64 = 7.0;
const DEFAULT_YEARLY_CONTRIBUTION: f64 = 6_000.0;
const DEFAULT_NON_CONTRIBUTION_YEARS: f64 = 10.0;
const DEFAULT_NON_CONTRIBUTION_RETURN_RATE: f64 = 7.0;
const DEFAULT_MONTHLY_SPENDING: f64 = 4_000.0;
const DEFAULT_RETIREMENT_RETURN_RATE: f64 = 5.0;
const DEFAULT_INFLATION_RATE: f64 = 3.0;

#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("--horizon-years must be a whole number between 1 and {max}, got {value}")]
    InvalidHorizon { value: f64, max: u32 },
    #[error("Invalid request payload: {0}")]
    InvalidPayload(String),
}

#[derive(Parser, Debug)]
#[command(
    name = "fire-stages",
    about = "Three-stage FIRE projection: accumulate, coast, then draw down"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pipeline once and print the breakdown
    Project(ProjectArgs),
    /// Serve the JSON API
    Serve {
        #[arg(long, env = "FIRE_PORT", default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ProjectArgs {
    #[arg(long, default_value_t = DEFAULT_INITIAL_INVESTMENT, allow_negative_numbers = true)]
    pub initial_investment: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_CONTRIBUTION_YEARS,
        allow_negative_numbers = true,
        help = "Years of contributions; fractions are truncated"
    )]
    pub contribution_years: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_ANNUAL_RETURN_RATE,
        allow_negative_numbers = true,
        help = "Expected annual return while contributing, in percent"
    )]
    pub annual_return_rate: f64,
    #[arg(long, default_value_t = DEFAULT_YEARLY_CONTRIBUTION, allow_negative_numbers = true)]
    pub yearly_contribution: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_NON_CONTRIBUTION_YEARS,
        allow_negative_numbers = true,
        help = "Years of growth after contributions stop"
    )]
    pub non_contribution_years: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_NON_CONTRIBUTION_RETURN_RATE,
        allow_negative_numbers = true,
        help = "Expected annual return without contributions, in percent"
    )]
    pub non_contribution_return_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_MONTHLY_SPENDING,
        allow_negative_numbers = true,
        help = "Retirement spending per month in today's money; annualised x12"
    )]
    pub monthly_spending: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_RETIREMENT_RETURN_RATE,
        allow_negative_numbers = true,
        help = "Expected annual return in retirement, in percent"
    )]
    pub retirement_return_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_INFLATION_RATE,
        allow_negative_numbers = true,
        help = "Expected annual inflation in percent"
    )]
    pub inflation_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_HORIZON_PERIODS,
        help = "Years after which the drawdown simulation stops"
    )]
    pub horizon_years: u32,
    #[arg(long, help = "Print the run as JSON instead of a table")]
    pub json: bool,
}

impl Default for ProjectArgs {
    fn default() -> Self {
        Self {
            initial_investment: DEFAULT_INITIAL_INVESTMENT,
            contribution_years: DEFAULT_CONTRIBUTION_YEARS,
            annual_return_rate: DEFAULT_ANNUAL_RETURN_RATE,
            yearly_contribution: DEFAULT_YEARLY_CONTRIBUTION,
            non_contribution_years: DEFAULT_NON_CONTRIBUTION_YEARS,
            non_contribution_return_rate: DEFAULT_NON_CONTRIBUTION_RETURN_RATE,
            monthly_spending: DEFAULT_MONTHLY_SPENDING,
            retirement_return_rate: DEFAULT_RETIREMENT_RETURN_RATE,
            inflation_rate: DEFAULT_INFLATION_RATE,
            horizon_years: DEFAULT_HORIZON_PERIODS,
            json: false,
        }
    }
}

/// A form value as typed: a JSON number, or text that may not parse.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    fn to_f64(&self) -> f64 {
        match self {
            RawValue::Number(v) => *v,
            RawValue::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStage {
    #[serde(alias = "investment")]
    Accumulation,
    #[serde(alias = "nonContribution", alias = "non-contribution")]
    Growth,
    #[serde(alias = "retirement", alias = "withdrawal")]
    Drawdown,
}

impl From<ApiStage> for Stage {
    fn from(value: ApiStage) -> Self {
        match value {
            ApiStage::Accumulation => Stage::Accumulation,
            ApiStage::Growth => Stage::Growth,
            ApiStage::Drawdown => Stage::Drawdown,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    initial_investment: Option<RawValue>,
    contribution_years: Option<RawValue>,
    annual_return_rate: Option<RawValue>,
    yearly_contribution: Option<RawValue>,

    #[serde(alias = "growthStartingBalance")]
    non_contribution_starting_balance: Option<RawValue>,
    non_contribution_years: Option<RawValue>,
    non_contribution_return_rate: Option<RawValue>,

    #[serde(alias = "drawdownStartingBalance")]
    retirement_starting_balance: Option<RawValue>,
    #[serde(alias = "annualSpending")]
    monthly_spending: Option<RawValue>,
    retirement_return_rate: Option<RawValue>,
    inflation_rate: Option<RawValue>,
    horizon_years: Option<RawValue>,

    changed_stage: Option<ApiStage>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: PipelineInputs,
    changed_stage: Stage,
    growth_starting_override: Option<f64>,
    drawdown_starting_override: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse<'a> {
    changed_stage: Stage,
    inputs: &'a PipelineInputs,
    accumulation: &'a StageResult,
    growth: &'a StageResult,
    drawdown: &'a DrawdownResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Converts form units (percent rates, monthly spending) into stage inputs.
/// Out-of-domain numbers pass through; the stages clear themselves.
pub fn build_inputs(args: &ProjectArgs) -> Result<PipelineInputs, ApiError> {
    if args.horizon_years == 0 || args.horizon_years > MAX_HORIZON_YEARS {
        return Err(ApiError::InvalidHorizon {
            value: f64::from(args.horizon_years),
            max: MAX_HORIZON_YEARS,
        });
    }

    Ok(PipelineInputs {
        accumulation: AccumulationInput::new(
            args.initial_investment,
            args.contribution_years,
            args.annual_return_rate / 100.0,
            args.yearly_contribution,
        ),
        growth: GrowthInput::new(
            0.0,
            args.non_contribution_years,
            args.non_contribution_return_rate / 100.0,
        ),
        drawdown: DrawdownInput::new(
            0.0,
            args.monthly_spending * 12.0,
            args.retirement_return_rate / 100.0,
            args.inflation_rate / 100.0,
        )
        .with_max_periods(args.horizon_years),
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "FIRE projection API listening");
    info!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/healthz", get(health_handler))
        .fallback(not_found_handler)
}

async fn health_handler() -> impl IntoResponse {
    with_cache_control("ok")
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    payload: Result<Query<ProjectPayload>, QueryRejection>,
) -> Response {
    project_handler_impl(
        payload
            .map(|Query(payload)| payload)
            .map_err(|rejection| ApiError::InvalidPayload(rejection.body_text())),
    )
}

async fn project_post_handler(
    payload: Result<Json<ProjectPayload>, JsonRejection>,
) -> Response {
    project_handler_impl(
        payload
            .map(|Json(payload)| payload)
            .map_err(|rejection| ApiError::InvalidPayload(rejection.body_text())),
    )
}

fn project_handler_impl(payload: Result<ProjectPayload, ApiError>) -> Response {
    let request = match payload.and_then(api_request_from_payload) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "rejecting projection request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let run = run_request(&request);
    json_response(
        StatusCode::OK,
        ProjectResponse {
            changed_stage: request.changed_stage,
            inputs: &run.inputs,
            accumulation: &run.accumulation,
            growth: &run.growth,
            drawdown: &run.drawdown,
        },
    )
}

/// Runs the full chain, then re-enters at the changed stage with any manual
/// starting balance the caller typed over the forwarded one.
fn run_request(request: &ApiRequest) -> PipelineRun {
    let baseline = run_pipeline(&request.inputs);
    let mut inputs = baseline.inputs;
    match request.changed_stage {
        Stage::Accumulation => return baseline,
        Stage::Growth => {
            if let Some(balance) = request.growth_starting_override {
                inputs.growth.starting_balance = balance;
            }
        }
        Stage::Drawdown => {
            if let Some(balance) = request.drawdown_starting_override {
                inputs.drawdown.starting_balance = balance;
            }
        }
    }
    cascade_from(request.changed_stage, &inputs, &baseline)
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

// The form sends the horizon as text too, but only whole years are usable.
fn horizon_from_raw(raw: &RawValue) -> Result<u32, ApiError> {
    let value = raw.to_f64();
    if value.is_finite()
        && value.fract() == 0.0
        && (1.0..=f64::from(MAX_HORIZON_YEARS)).contains(&value)
    {
        Ok(value as u32)
    } else {
        Err(ApiError::InvalidHorizon {
            value,
            max: MAX_HORIZON_YEARS,
        })
    }
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, ApiError> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, ApiError> {
    let mut args = ProjectArgs::default();

    if let Some(v) = payload.initial_investment {
        args.initial_investment = v.to_f64();
    }
    if let Some(v) = payload.contribution_years {
        args.contribution_years = v.to_f64();
    }
    if let Some(v) = payload.annual_return_rate {
        args.annual_return_rate = v.to_f64();
    }
    if let Some(v) = payload.yearly_contribution {
        args.yearly_contribution = v.to_f64();
    }

    if let Some(v) = payload.non_contribution_years {
        args.non_contribution_years = v.to_f64();
    }
    if let Some(v) = payload.non_contribution_return_rate {
        args.non_contribution_return_rate = v.to_f64();
    }

    if let Some(v) = payload.monthly_spending {
        args.monthly_spending = v.to_f64();
    }
    if let Some(v) = payload.retirement_return_rate {
        args.retirement_return_rate = v.to_f64();
    }
    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v.to_f64();
    }
    if let Some(v) = payload.horizon_years {
        args.horizon_years = horizon_from_raw(&v)?;
    }

    let inputs = build_inputs(&args)?;
    Ok(ApiRequest {
        inputs,
        changed_stage: payload
            .changed_stage
            .map(Stage::from)
            .unwrap_or(Stage::Accumulation),
        growth_starting_override: payload
            .non_contribution_starting_balance
            .as_ref()
            .map(RawValue::to_f64),
        drawdown_starting_override: payload
            .retirement_starting_balance
            .as_ref()
            .map(RawValue::to_f64),
    })
}
