#![cfg(feature = "web")]
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use handlebars::{RenderError, TemplateError};
use log::{error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::chart::dashboard_charts;
use crate::config::ServerConfig;
use crate::dashboard::Dashboard;
use crate::downloader::{self, SummaryTable};
use crate::error::{ExportError, LoadError};
use crate::loader;
use crate::summary::Summary;

/// Name of the multipart field carrying the spreadsheet
pub const FILE_FIELD: &str = "file";

pub struct AppState {
    config: ServerConfig,
    dashboard: Dashboard,
}

/// Reasons an upload request can fail
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Could not read the upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("No file was uploaded")]
    MissingFile,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

/// The uploaded file
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct CsvQuery {
    table: SummaryTable,
}

/// Builds the dashboard router
///
/// # Arguments
/// * `config` - Server settings; the body limit and chart sizes are read from it
///
/// # Returns
/// * `Result<Router, TemplateError>` - The router, or an error if the page template is invalid
pub fn router(config: ServerConfig) -> Result<Router, TemplateError> {
    let body_limit = config.max_upload_bytes;
    let state = Arc::new(AppState {
        config,
        dashboard: Dashboard::new()?,
    });

    let api = Router::new()
        .route("/api/summary", post(summary_json))
        .route("/api/charts", post(charts_json))
        .layer(CorsLayer::permissive());

    Ok(Router::new()
        .route("/", get(serve_upload_page))
        .route("/upload", post(upload_dashboard))
        .route("/export/xlsx", post(export_xlsx))
        .route("/export/csv", post(export_csv))
        .merge(api)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state))
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind = config.bind;
    let app = router(config)?;

    let listener = TcpListener::bind(bind).await?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Reads the spreadsheet from the `file` field of a multipart form
async fn read_upload(mut multipart: Multipart) -> Result<Upload, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?.to_vec();
        return Ok(Upload { file_name, bytes });
    }
    Err(UploadError::MissingFile)
}

/// Reads, validates and aggregates one upload
async fn summarize(multipart: Multipart) -> Result<(String, Summary), UploadError> {
    let upload = read_upload(multipart).await?;
    let records = loader::load_upload(&upload.file_name, &upload.bytes).inspect_err(|e| {
        warn!("Rejected upload {:?}: {}", upload.file_name, e);
    })?;
    info!(
        "Loaded {} records from {:?} ({} bytes)",
        records.len(),
        upload.file_name,
        upload.bytes.len()
    );
    Ok((upload.file_name, Summary::from_records(&records)))
}

fn html_page(status: StatusCode, page: Result<String, RenderError>) -> Response {
    match page {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

async fn serve_upload_page(State(state): State<Arc<AppState>>) -> Response {
    html_page(StatusCode::OK, state.dashboard.render_upload_page(None))
}

async fn upload_dashboard(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    match summarize(multipart).await {
        Ok((file_name, summary)) => html_page(
            StatusCode::OK,
            state
                .dashboard
                .render_report(&file_name, &summary, &state.config.chart),
        ),
        Err(e) => html_page(
            e.status(),
            state.dashboard.render_upload_page(Some(&e.to_string())),
        ),
    }
}

async fn summary_json(multipart: Multipart) -> Result<Json<Summary>, UploadError> {
    let (_, summary) = summarize(multipart).await?;
    Ok(Json(summary))
}

async fn charts_json(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Vec<serde_json::Value>>, UploadError> {
    let (_, summary) = summarize(multipart).await?;
    let specs = dashboard_charts(&summary, &state.config.chart)
        .iter()
        .map(|spec| spec.to_vega_lite())
        .collect();
    Ok(Json(specs))
}

/// Export base name: the upload's stem, or "summary" when it has none
fn export_stem(file_name: &str) -> &str {
    std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("summary")
}

fn attachment(file_name: String) -> String {
    format!("attachment; filename=\"{}\"", file_name.replace('"', ""))
}

async fn export_xlsx(multipart: Multipart) -> Result<Response, UploadError> {
    let (file_name, summary) = summarize(multipart).await?;
    let bytes = downloader::to_xlsx(&summary)?;

    let disposition = attachment(format!("{}-summary.xlsx", export_stem(&file_name)));
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn export_csv(
    Query(query): Query<CsvQuery>,
    multipart: Multipart,
) -> Result<Response, UploadError> {
    let (file_name, summary) = summarize(multipart).await?;
    let csv = downloader::to_csv(&summary, query.table)?;

    let disposition = attachment(format!(
        "{}-{}.csv",
        export_stem(&file_name),
        query.table.slug()
    ));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_errors_are_server_errors() {
        let err = UploadError::Export(ExportError::Io(std::io::Error::other("disk full")));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(UploadError::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            UploadError::Load(LoadError::NoRecords).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn load_errors_keep_their_message() {
        let err = UploadError::from(LoadError::MissingColumns(vec!["TOTAL".into()]));
        assert_eq!(err.to_string(), "Missing required column(s): TOTAL");
    }

    #[test]
    fn export_names_follow_the_upload() {
        assert_eq!(export_stem("marks.xlsx"), "marks");
        assert_eq!(export_stem(""), "summary");
        assert_eq!(
            attachment("a\"b.csv".to_string()),
            "attachment; filename=\"ab.csv\""
        );
    }
}
