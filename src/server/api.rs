use crate::dashboard::SectionOutcome;
use crate::error::AppError;
use crate::models::{Period, Selection};
use crate::server::AppState;
use crate::services::{log_api_request, ApiPerformanceMetrics};
use axum::{
    extract::{Json, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Query parameters shared by the section endpoints
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SectionQuery {
    /// Sector name from the catalog
    pub sector: String,

    /// Ticker symbols (can be repeated: ticker=1605.T&ticker=5020.T); missing = whole sector
    pub ticker: Option<Vec<String>>,

    /// Period for /returns and /prices: 5d, 1mo, 3mo, 6mo, 1y, 3y, 5y, 10y, 20y
    pub period: Option<String>,

    /// /dashboard: period of the return chart
    pub return_period: Option<String>,

    /// /dashboard: period of the price charts
    pub price_period: Option<String>,

    /// /fundamentals: json (default) or csv
    pub format: Option<String>,
}

fn parse_period(raw: Option<&str>) -> Result<Period, AppError> {
    match raw {
        None => Ok(Period::default()),
        Some(s) => Period::from_str(s).map_err(AppError::InvalidInput),
    }
}

fn resolve_selection(state: &AppState, params: &SectionQuery) -> Result<Selection, AppError> {
    Selection::for_request(state.dashboard.catalog(), &params.sector, params.ticker.as_deref())
}

fn describe(metrics: &mut ApiPerformanceMetrics, selection: &Selection, period: Option<Period>) {
    metrics.sector = selection.sector.clone();
    metrics.ticker_count = selection.tickers.len();
    if let Some(period) = period {
        metrics.period = period.code().to_string();
    }
}

fn finish_metrics(mut metrics: ApiPerformanceMetrics, size: usize, error: Option<String>) {
    metrics.response_size_bytes = size;
    if let Some(error) = error {
        metrics.fail(error);
    }
    metrics.complete();
    log_api_request(&metrics);
}

fn json_response<T: Serialize>(metrics: ApiPerformanceMetrics, status: StatusCode, body: &T) -> Response {
    match serde_json::to_string(body) {
        Ok(json) => {
            let error = (!status.is_success()).then(|| status.to_string());
            finish_metrics(metrics, json.len(), error);
            (status, [(CONTENT_TYPE, "application/json")], json).into_response()
        }
        Err(e) => error_response(metrics, AppError::from(e)),
    }
}

fn error_response(metrics: ApiPerformanceMetrics, error: AppError) -> Response {
    finish_metrics(metrics, 0, Some(error.to_string()));
    error.into_response()
}

fn section_response<T: Serialize>(
    metrics: ApiPerformanceMetrics,
    result: Result<SectionOutcome<T>, AppError>,
) -> Response {
    match result {
        Ok(outcome) => json_response(metrics, outcome.status_code(), &outcome),
        Err(e) => error_response(metrics, e),
    }
}

/// GET /health - service status and cache occupancy
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.dashboard.catalog();
    let cache = state.dashboard.cache().stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0);

    debug!(?cache, "Returning health stats");

    // No api logging for /health (too noisy)
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "sectors": catalog.sector_count(),
            "tickers": catalog.ticker_count(),
            "benchmark": state.dashboard.benchmark_label(),
            "cache": cache,
            "uptime_secs": uptime_secs,
            "current_system_time": Utc::now().to_rfc3339(),
        })),
    )
}

/// GET /sectors - sector catalog with ticker display names
#[instrument(skip(state))]
pub async fn sectors_handler(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.dashboard.catalog();
    info!(sector_count = catalog.sector_count(), "Returning sector catalog");
    Json(catalog.clone())
}

/// GET /dashboard - all four sections
///
/// Examples:
/// - /dashboard?sector=通信
/// - /dashboard?sector=通信&ticker=9432.T&ticker=9433.T&return_period=1y&price_period=3mo
#[instrument(skip(state))]
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Query(params): Query<SectionQuery>,
) -> Response {
    let mut metrics = ApiPerformanceMetrics::new("/dashboard", Utc::now());

    let result = async {
        let return_period = parse_period(params.return_period.as_deref())?;
        let price_period = parse_period(params.price_period.as_deref())?;
        let selection = resolve_selection(&state, &params)?;
        describe(&mut metrics, &selection, Some(return_period));
        Ok::<_, AppError>(state.dashboard.report(selection, return_period, price_period).await)
    }
    .await;

    match result {
        Ok(report) => json_response(metrics, StatusCode::OK, &report),
        Err(e) => error_response(metrics, e),
    }
}

/// GET /returns - return-over-time chart
#[instrument(skip(state))]
pub async fn returns_handler(
    State(state): State<AppState>,
    Query(params): Query<SectionQuery>,
) -> Response {
    let mut metrics = ApiPerformanceMetrics::new("/returns", Utc::now());

    let result = async {
        let period = parse_period(params.period.as_deref())?;
        let selection = resolve_selection(&state, &params)?;
        describe(&mut metrics, &selection, Some(period));
        Ok::<_, AppError>(state.dashboard.return_chart(&selection, period).await)
    }
    .await;

    section_response(metrics, result)
}

/// GET /prices - per-ticker price charts, benchmark first
#[instrument(skip(state))]
pub async fn prices_handler(
    State(state): State<AppState>,
    Query(params): Query<SectionQuery>,
) -> Response {
    let mut metrics = ApiPerformanceMetrics::new("/prices", Utc::now());

    let result = async {
        let period = parse_period(params.period.as_deref())?;
        let selection = resolve_selection(&state, &params)?;
        describe(&mut metrics, &selection, Some(period));
        Ok::<_, AppError>(state.dashboard.price_charts(&selection, period).await)
    }
    .await;

    section_response(metrics, result)
}

/// GET /comparison - cross-period comparison grid
#[instrument(skip(state))]
pub async fn comparison_handler(
    State(state): State<AppState>,
    Query(params): Query<SectionQuery>,
) -> Response {
    let mut metrics = ApiPerformanceMetrics::new("/comparison", Utc::now());

    let result = async {
        let selection = resolve_selection(&state, &params)?;
        describe(&mut metrics, &selection, None);
        Ok::<_, AppError>(state.dashboard.comparison_grid(&selection).await)
    }
    .await;

    section_response(metrics, result)
}

/// GET /fundamentals - shareholder metrics table
///
/// Examples:
/// - /fundamentals?sector=商社
/// - /fundamentals?sector=商社&format=csv
#[instrument(skip(state))]
pub async fn fundamentals_handler(
    State(state): State<AppState>,
    Query(params): Query<SectionQuery>,
) -> Response {
    let mut metrics = ApiPerformanceMetrics::new("/fundamentals", Utc::now());

    let as_csv = match params.format.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("json") => false,
        Some("csv") => true,
        Some(other) => {
            let error = AppError::InvalidInput(format!("Unsupported format '{}', use json or csv", other));
            return error_response(metrics, error);
        }
    };
    if as_csv {
        metrics.response_format = "csv".to_string();
    }

    let result = async {
        let selection = resolve_selection(&state, &params)?;
        describe(&mut metrics, &selection, None);
        Ok::<_, AppError>(state.dashboard.fundamentals_table(&selection).await)
    }
    .await;

    match result {
        Ok(SectionOutcome::Ready(table)) if as_csv => match table.to_csv() {
            Ok(csv_content) => {
                finish_metrics(metrics, csv_content.len(), None);
                (
                    StatusCode::OK,
                    [
                        (CONTENT_TYPE, "text/csv; charset=utf-8"),
                        (CONTENT_DISPOSITION, "attachment; filename=\"fundamentals.csv\""),
                    ],
                    csv_content,
                )
                    .into_response()
            }
            Err(e) => error_response(metrics, AppError::from(e)),
        },
        other => section_response(metrics, other),
    }
}
