use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::DashboardConfig;
use crate::downloader::{self, ExportColumns, ExportFormat};
use crate::errors::{DataSourceError, ExportError};
use crate::filter::{FilterField, FilterSpec, selector_value};
use crate::record::ProjectRecord;
use crate::store::RecordStore;
use crate::view::{DashboardView, Direction, FilterOptions, SortKey};

pub struct AppState {
    store: RecordStore,
}

/// Selector values and table options carried in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    country: Option<String>,
    phase: Option<String>,
    owner: Option<String>,
    status: Option<String>,
    sort: Option<String>,
    #[serde(default)]
    desc: bool,
    #[serde(default)]
    derived: bool,
}

impl ViewQuery {
    fn filter(&self) -> FilterSpec {
        let selected = [
            (FilterField::Country, &self.country),
            (FilterField::Phase, &self.phase),
            (FilterField::Owner, &self.owner),
            (FilterField::Status, &self.status),
        ];
        let mut spec = FilterSpec::new();
        for (field, value) in selected {
            spec.set_opt(field, value.as_deref().and_then(selector_value));
        }
        spec
    }

    fn sort(&self) -> Result<Option<SortKey>, ApiError> {
        self.sort
            .as_deref()
            .map(|s| s.parse::<SortKey>())
            .transpose()
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e))
    }

    fn direction(&self) -> Direction {
        if self.desc {
            Direction::Descending
        } else {
            Direction::Ascending
        }
    }

    fn columns(&self) -> ExportColumns {
        if self.derived {
            ExportColumns::WithDerived
        } else {
            ExportColumns::Source
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
    records: Option<usize>,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<DataSourceError> for ApiError {
    fn from(value: DataSourceError) -> Self {
        log::error!("data source unavailable: {value}");
        Self::new(StatusCode::SERVICE_UNAVAILABLE, value.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(value: ExportError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = StatusResponse {
            status: "error".to_string(),
            message: Some(self.message),
            records: None,
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/options", get(get_options))
        .route("/api/export.csv", get(export_csv))
        .route("/api/export.xlsx", get(export_xlsx))
        .route("/api/reload", post(reload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: DashboardConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState {
        store: config.record_store(),
    });

    // Fail fast: a dashboard without data is not served.
    let initial = load_records(&state).await.map_err(|e| e.message)?;
    log::info!(
        "serving {} projects from {} (cache {})",
        initial.len(),
        state.store.source().display(),
        state.store.policy()
    );

    let listener = TcpListener::bind(&config.bind).await?;
    log::info!("Listening on http://{}", config.bind);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn load_records(state: &Arc<AppState>) -> Result<Arc<[ProjectRecord]>, ApiError> {
    let state = Arc::clone(state);
    let loaded = tokio::task::spawn_blocking(move || state.store.records())
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(loaded?)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

async fn build_view(
    state: &Arc<AppState>,
    query: &ViewQuery,
) -> Result<DashboardView, ApiError> {
    let records = load_records(state).await?;
    let mut view = DashboardView::build(&records, &query.filter(), now());
    if let Some(key) = query.sort()? {
        view.rows = view.sorted_rows(key, query.direction());
    }
    Ok(view)
}

async fn get_dashboard(
    Query(query): Query<ViewQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardView>, ApiError> {
    Ok(Json(build_view(&state, &query).await?))
}

async fn get_options(State(state): State<Arc<AppState>>) -> Result<Json<FilterOptions>, ApiError> {
    let records = load_records(&state).await?;
    Ok(Json(FilterOptions::from_records(&records)))
}

async fn export(
    state: Arc<AppState>,
    query: ViewQuery,
    format: ExportFormat,
) -> Result<Response, ApiError> {
    let view = build_view(&state, &query).await?;
    let bytes = downloader::render(&view.rows, format, query.columns())?;
    let file_name = downloader::export_file_name(view.evaluated_at.date(), format);

    let headers = [
        (header::CONTENT_TYPE, format.mime_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn export_csv(
    Query(query): Query<ViewQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    export(state, query, ExportFormat::Csv).await
}

async fn export_xlsx(
    Query(query): Query<ViewQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    export(state, query, ExportFormat::Xlsx).await
}

async fn reload(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    state.store.invalidate();
    let records = load_records(&state).await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
        message: None,
        records: Some(records.len()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_maps_to_filter_and_options() {
        let query = ViewQuery {
            country: Some("France".into()),
            phase: Some("All".into()),
            status: Some("completed".into()),
            sort: Some("progress".into()),
            desc: true,
            ..ViewQuery::default()
        };
        let spec = query.filter();
        assert_eq!(spec.constraint(FilterField::Country), Some("France"));
        assert_eq!(spec.constraint(FilterField::Phase), None);
        assert_eq!(spec.constraint(FilterField::Status), Some("completed"));
        assert!(matches!(query.sort(), Ok(Some(_))));
        assert_eq!(query.direction(), Direction::Descending);
        assert_eq!(query.columns(), ExportColumns::Source);
    }

    #[test]
    fn lowercase_all_is_a_real_value() {
        let query = ViewQuery {
            owner: Some("all".into()),
            country: Some(String::new()),
            ..ViewQuery::default()
        };
        let spec = query.filter();
        assert_eq!(spec.constraint(FilterField::Owner), Some("all"));
        assert_eq!(spec.constraint(FilterField::Country), Some(""));
    }

    #[test]
    fn bad_sort_is_a_client_error() {
        let query = ViewQuery {
            sort: Some("colour".into()),
            ..ViewQuery::default()
        };
        match query.sort() {
            Err(e) => assert_eq!(e.status, StatusCode::BAD_REQUEST),
            Ok(_) => panic!("expected an error"),
        }
    }
}
