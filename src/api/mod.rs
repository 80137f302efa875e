use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    BandPoint, BandView, MonthlySummary, PhaseRequest, PhaseType, RawYearlySummary, ViewMode,
    YearlySummary, build_band_series, parse_iso_date, per_phase_series, real_view_available,
    resolve_phase_blocks,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ApiViewMode {
    Nominal,
    Real,
}

impl From<ApiViewMode> for ViewMode {
    fn from(value: ApiViewMode) -> Self {
        match value {
            ApiViewMode::Nominal => ViewMode::Nominal,
            ApiViewMode::Real => ViewMode::Real,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReconstructPayload {
    start_date: Option<String>,
    initial_deposit: Option<f64>,
    inflation_factor_per_year: Option<f64>,
    view: Option<ApiViewMode>,
    phases: Vec<PhasePayload>,
    yearly_summaries: Vec<RawYearlySummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhasePayload {
    phase_type: String,
    duration_months: u32,
}

#[derive(Debug)]
struct ReconstructRequest {
    start_date_iso: String,
    initial_deposit: f64,
    inflation_factor: Option<f64>,
    requested_view: ViewMode,
    phases: Vec<PhaseRequest>,
    summaries: Vec<YearlySummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReconstructResponse {
    real_view_available: bool,
    view: ViewMode,
    blocks: Vec<BlockResponse>,
    phases: Vec<PhaseSeriesResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockResponse {
    label: String,
    phase_type: PhaseType,
    start_offset_months: u32,
    end_offset_months: u32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    months: Vec<MonthlySummary>,
    bands: Vec<BandPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PhaseSeriesResponse {
    phase_name: String,
    months: Vec<MonthlySummary>,
    bands: Vec<BandPoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    println!("glidepath HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/api/reconstruct", post(reconstruct_handler))
        .fallback(not_found_handler)
}

async fn reconstruct_handler(Json(payload): Json<ReconstructPayload>) -> Response {
    match reconstruct_request_from_payload(payload) {
        Ok(request) => json_response(StatusCode::OK, build_reconstruct_response(&request)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

pub fn reconstruct_json(payload_json: &str, view_override: Option<ViewMode>) -> Result<String, String> {
    let payload = serde_json::from_str::<ReconstructPayload>(payload_json)
        .map_err(|e| format!("Invalid reconstruction JSON payload: {e}"))?;
    let mut request = reconstruct_request_from_payload(payload)?;
    if let Some(view) = view_override {
        request.requested_view = view;
    }

    serde_json::to_string_pretty(&build_reconstruct_response(&request))
        .map_err(|e| format!("Failed to serialize response: {e}"))
}

fn reconstruct_request_from_payload(
    payload: ReconstructPayload,
) -> Result<ReconstructRequest, String> {
    if payload.phases.is_empty() {
        return Err("phases must contain at least one entry".to_string());
    }

    let mut phases = Vec::with_capacity(payload.phases.len());
    for (idx, phase) in payload.phases.iter().enumerate() {
        let Some(phase_type) = PhaseType::parse(&phase.phase_type) else {
            return Err(format!(
                "unknown phase type {:?} at position {}; expected DEPOSIT, PASSIVE or WITHDRAW",
                phase.phase_type,
                idx + 1
            ));
        };
        phases.push(PhaseRequest {
            phase_type,
            duration_months: phase.duration_months,
        });
    }
    if phases.iter().map(|p| u64::from(p.duration_months)).sum::<u64>() == 0 {
        return Err("total phase duration must be at least one month".to_string());
    }

    if payload.yearly_summaries.is_empty() {
        return Err("yearlySummaries must contain at least one row".to_string());
    }
    let summaries = payload
        .yearly_summaries
        .iter()
        .map(RawYearlySummary::normalize)
        .collect();

    // Malformed start dates and inflation factors are not rejected
    // here: the core degrades softly (no blocks / nominal-only).
    Ok(ReconstructRequest {
        start_date_iso: payload.start_date.unwrap_or_default(),
        initial_deposit: payload
            .initial_deposit
            .filter(|v| v.is_finite())
            .unwrap_or(0.0),
        inflation_factor: payload.inflation_factor_per_year,
        requested_view: payload
            .view
            .map(ViewMode::from)
            .unwrap_or(ViewMode::Nominal),
        phases,
        summaries,
    })
}

fn build_reconstruct_response(request: &ReconstructRequest) -> ReconstructResponse {
    let start_date = parse_iso_date(&request.start_date_iso);
    let real_available = real_view_available(start_date, request.inflation_factor);
    let view = if real_available {
        request.requested_view
    } else {
        ViewMode::Nominal
    };

    let band_view = match (view, start_date, request.inflation_factor) {
        (ViewMode::Real, Some(start), Some(factor)) => BandView::Real {
            start_year: start.year(),
            start_month: start.month(),
            factor,
        },
        _ => BandView::Nominal,
    };

    let blocks = resolve_phase_blocks(
        &request.phases,
        &request.start_date_iso,
        request.initial_deposit,
        &request.summaries,
    );

    if blocks.is_empty() {
        let phases = per_phase_series(&request.summaries)
            .into_iter()
            .map(|series| PhaseSeriesResponse {
                bands: build_band_series(&series.months, band_view),
                phase_name: series.phase_name,
                months: series.months,
            })
            .collect();
        return ReconstructResponse {
            real_view_available: real_available,
            view,
            blocks: Vec::new(),
            phases,
        };
    }

    let blocks = blocks
        .into_iter()
        .map(|series| BlockResponse {
            label: series.block.label,
            phase_type: series.block.phase_type,
            start_offset_months: series.block.start_offset_months,
            end_offset_months: series.block.end_offset_months,
            start_date: series.block.start_date,
            end_date: series.block.end_date,
            bands: build_band_series(&series.months, band_view),
            months: series.months,
        })
        .collect();

    ReconstructResponse {
        real_view_available: real_available,
        view,
        blocks,
        phases: Vec::new(),
    }
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
