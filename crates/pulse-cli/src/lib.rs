use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDateTime};
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use pulse_config::{AppConfig, ConfigError};
use pulse_core::{
    bedtime_chart, genre_chart, parse_timestamp, sleep_chart, spotify_chart, steps_chart,
    weather_chart, AggregateError, ChartError, ChartKind, ChartResult, ChartSeries, ChartSettings,
    CurrentConditions, Granularity, LogSource,
};
use pulse_ingest::{
    load_genres, load_nights, load_snapshot, load_spotify_year, load_steps, load_weather,
};
use serde::{Deserialize, Serialize};

/// Everything a request needs besides its inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardSettings {
    pub charts: ChartSettings,
    pub weather_days_daily: u32,
    pub weather_days_weekly: u32,
    pub weather_days_monthly: u32,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            charts: ChartSettings::default(),
            weather_days_daily: 3,
            weather_days_weekly: 364,
            weather_days_monthly: 365,
        }
    }
}

impl DashboardSettings {
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            charts: cfg.chart_settings()?,
            weather_days_daily: cfg.weather_days(Granularity::Daily),
            weather_days_weekly: cfg.weather_days(Granularity::Weekly),
            weather_days_monthly: cfg.weather_days(Granularity::Monthly),
        })
    }

    pub fn weather_days(&self, granularity: Granularity) -> u32 {
        match granularity {
            Granularity::Daily => self.weather_days_daily,
            Granularity::Weekly => self.weather_days_weekly,
            Granularity::Monthly => self.weather_days_monthly,
        }
    }
}

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    source: Arc<dyn LogSource>,
    settings: DashboardSettings,
}

pub fn build_app(
    source: Arc<dyn LogSource>,
    settings: DashboardSettings,
) -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("pulse-cli");

    let requests_total = meter
        .u64_counter("pulse_requests_total")
        .with_description("Total HTTP requests served")
        .init();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        source,
        settings,
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/current", get(current))
        .route("/api/v1/charts/:chart", get(chart))
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

fn count(state: &AppState, route: &'static str) {
    state
        .requests_total
        .add(1, &[KeyValue::new("route", route)]);
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    count(&state, "healthz");
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

/// `/api/v1/current` body: the snapshot plus derived goal progress
#[derive(Debug, Serialize)]
struct CurrentView {
    #[serde(flatten)]
    conditions: CurrentConditions,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps_percent_of_goal: Option<f64>,
}

async fn current(State(state): State<Arc<AppState>>) -> Response {
    count(&state, "current");
    let Some(conditions) = load_snapshot(state.source.as_ref()).await else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let steps_percent_of_goal = conditions
        .steps_percent_of_goal(state.settings.charts.step_goal_divisor)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "step goal unavailable");
            None
        });
    let view = CurrentView {
        conditions,
        steps_percent_of_goal,
    };
    (StatusCode::OK, Json(view)).into_response()
}

#[derive(Debug, Deserialize)]
struct ChartQuery {
    granularity: Option<String>,
    /// Reference time override, a date or datetime
    at: Option<String>,
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

async fn chart(
    State(state): State<Arc<AppState>>,
    Path(chart): Path<String>,
    Query(q): Query<ChartQuery>,
) -> Response {
    count(&state, "chart");

    let kind: ChartKind = match chart.parse() {
        Ok(kind) => kind,
        Err(e) => return bad_request(e),
    };
    let granularity = match q.granularity.as_deref().map(str::parse::<Granularity>) {
        Some(Ok(g)) => g,
        Some(Err(e)) => return bad_request(e),
        None => Granularity::default(),
    };
    let reference_now = match q.at.as_deref() {
        Some(raw) => match parse_timestamp(raw) {
            Some(at) => at,
            None => return bad_request(format!("unreadable reference time: {raw}")),
        },
        None => Local::now().naive_local(),
    };

    match render_chart(&state, kind, granularity, reference_now).await {
        Ok(series) => (StatusCode::OK, Json(series)).into_response(),
        Err(e) => {
            tracing::error!(chart = ?kind, error = %e, "chart assembly failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Fetch the chart's inputs and run its recipe
pub async fn render_chart(
    state: &AppState,
    kind: ChartKind,
    granularity: Granularity,
    reference_now: NaiveDateTime,
) -> ChartResult<ChartSeries> {
    let settings = &state.settings.charts;
    let source = state.source.as_ref();

    match kind {
        ChartKind::Weather => {
            let days = state.settings.weather_days(granularity);
            let observations =
                load_weather(Arc::clone(&state.source), days, reference_now.date()).await;
            weather_chart(&observations, granularity, settings, reference_now)
        }
        ChartKind::Steps => {
            let records = load_steps(source).await;
            steps_chart(&records, granularity, settings, reference_now)
        }
        ChartKind::Bedtime => {
            let nights = load_nights(source).await;
            bedtime_chart(&nights, granularity, settings, reference_now)
        }
        ChartKind::Sleep => {
            let nights = load_nights(source).await;
            sleep_chart(&nights, granularity, settings, reference_now)
        }
        ChartKind::Spotify => {
            let points = load_spotify_year(source).await;
            spotify_chart(&points, granularity, settings, reference_now)
        }
        ChartKind::Genres => {
            // No tracks at all renders as an empty chart
            match genre_chart(&load_genres(source).await) {
                Err(ChartError::Aggregate(AggregateError::Undefined)) => {
                    Ok(ChartSeries::default())
                }
                result => result,
            }
        }
    }
}
