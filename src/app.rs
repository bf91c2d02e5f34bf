#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]
use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::cache::{DataCache, LoadOutcome};
use crate::config::DashboardConfig;
use crate::graph::{self, GraphOptions};
use crate::render::{Dashboard, INSTRUCTIONS, Notice, render};
use crate::selection::{MAX_SELECTED_COLUMNS, Selection, date_bounds, numeric_columns};

pub struct AppState {
    cache: DataCache,
    graph: GraphOptions,
}

impl AppState {
    pub fn new(config: &DashboardConfig) -> Self {
        AppState {
            cache: DataCache::new(config.data_path.clone(), config.locale),
            graph: GraphOptions {
                width: config.chart_width,
                height: config.chart_height,
            },
        }
    }
}

#[derive(Deserialize)]
struct DatasetQuery {
    time_column: Option<String>,
}

/// What the page needs before the first render, and again whenever the
/// time column changes
#[derive(Serialize)]
struct DatasetResponse {
    status: String,
    source: String,
    rows: usize,
    columns: Vec<String>,
    temporal_candidates: Vec<String>,
    unparsed_candidates: Vec<String>,
    numeric_columns: Vec<String>,
    date_bounds: Option<(NaiveDate, NaiveDate)>,
    max_columns: usize,
    default_selection: Option<Selection>,
    message: Option<String>,
    instructions: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
    notices: Vec<Notice>,
}

/// Builds the dashboard router around shared state
pub fn router(state: Arc<AppState>, static_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/dataset", get(get_dataset))
        .route("/api/render", post(render_dashboard))
        .route("/api/chart.png", post(chart_png))
        .route("/api/correlation.png", post(correlation_png))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

pub async fn run(config: DashboardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(&config));

    // Load up front so the first request does not pay for it
    let warm = Arc::clone(&state);
    let loaded = tokio::task::spawn_blocking(move || warm.cache.get().data().is_some()).await?;
    if loaded {
        info!("loaded {}", config.data_path.display());
    } else {
        warn!(
            "could not load {}, serving instructions only",
            config.data_path.display()
        );
    }

    let app = router(state, &config.static_dir);

    let listener = TcpListener::bind(&config.bind_address).await?;
    println!("Listening on http://{}", config.bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

async fn get_dataset(
    Query(params): Query<DatasetQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let response = match state.cache.get() {
        LoadOutcome::Loaded(data) => {
            let default_selection =
                Selection::default_for_time_column(data, params.time_column.as_deref());
            let time_column = default_selection.time_column.as_deref();
            DatasetResponse {
                status: "ok".to_string(),
                source: data.source.display().to_string(),
                rows: data.table.row_count(),
                columns: data.table.column_names(),
                temporal_candidates: data.temporal_candidates.clone(),
                unparsed_candidates: data.unparsed_candidates.clone(),
                numeric_columns: numeric_columns(&data.table, time_column),
                date_bounds: time_column.and_then(|t| date_bounds(&data.table, t)),
                max_columns: MAX_SELECTED_COLUMNS,
                default_selection: Some(default_selection),
                message: None,
                instructions: None,
            }
        }
        LoadOutcome::Failed { path, message } => DatasetResponse {
            status: "error".to_string(),
            source: path.display().to_string(),
            rows: 0,
            columns: Vec::new(),
            temporal_candidates: Vec::new(),
            unparsed_candidates: Vec::new(),
            numeric_columns: Vec::new(),
            date_bounds: None,
            max_columns: MAX_SELECTED_COLUMNS,
            default_selection: None,
            message: Some(message.clone()),
            instructions: Some(INSTRUCTIONS.to_string()),
        },
    };
    Json(response)
}

async fn render_dashboard(
    State(state): State<Arc<AppState>>,
    Json(selection): Json<Selection>,
) -> Json<Dashboard> {
    Json(render(state.cache.get(), &selection))
}

async fn chart_png(
    State(state): State<Arc<AppState>>,
    Json(selection): Json<Selection>,
) -> Response {
    let dashboard = render(state.cache.get(), &selection);
    let Some(chart) = &dashboard.chart else {
        return unprocessable("no chart for this selection", dashboard.notices);
    };
    png_response(graph::render_chart_png(chart, &state.graph))
}

async fn correlation_png(
    State(state): State<Arc<AppState>>,
    Json(selection): Json<Selection>,
) -> Response {
    let dashboard = render(state.cache.get(), &selection);
    let Some(matrix) = &dashboard.correlation else {
        return unprocessable("select at least two columns", dashboard.notices);
    };
    png_response(graph::render_correlation_png(matrix, &state.graph))
}

fn unprocessable(message: &str, notices: Vec<Notice>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            status: "error".to_string(),
            message: message.to_string(),
            notices,
        }),
    )
        .into_response()
}

fn png_response(result: crate::error::Result<Vec<u8>>) -> Response {
    match result {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], Body::from(png)).into_response(),
        Err(e) => {
            error!("chart rendering failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    status: "error".to_string(),
                    message: e.to_string(),
                    notices: Vec::new(),
                }),
            )
                .into_response()
        }
    }
}
