//! HTTP handlers for the pdfedit server
//!
//! Provides:
//! - Upload form and page listing (HTML)
//! - Page edits as form POSTs that redirect back to the listing
//! - Download of the edited document
//! - Health probe

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use pdfedit_core::{quick_validate, EditError, EditOp, SessionId};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::download::cleanup_body;
use crate::error::ServerError;
use crate::html;
use crate::AppState;

/// Multipart field carrying the uploaded file
const UPLOAD_FIELD: &str = "pdf";

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/upload", post(handle_upload))
        .route("/edit/:id", get(handle_edit))
        .route("/rotate/:id/:page", post(handle_rotate))
        .route("/delete/:id/:page", post(handle_delete))
        .route("/move/:id/:from", post(handle_move))
        .route("/download/:id", get(handle_download))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pdfedit-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: GET /
pub async fn handle_index() -> Html<String> {
    Html(html::index_page())
}

/// Handler: POST /upload
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect, ServerError> {
    let limit = state.max_upload_bytes;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) = upload
        .filter(|(filename, _)| !filename.is_empty())
        .ok_or_else(|| ServerError::InvalidUpload("no file selected".to_string()))?;
    let stem = pdf_stem(&filename)
        .ok_or_else(|| ServerError::InvalidUpload(format!("'{}' is not a .pdf file", filename)))?
        .to_string();
    quick_validate(&data)?;

    debug!("Upload '{}' ({} bytes)", filename, data.len());

    let editor = Arc::clone(&state.editor);
    let id = blocking(move || editor.upload(&data, &stem)).await?;

    info!("Upload '{}' stored as session {}", filename, id);
    Ok(Redirect::to(&edit_url(&id)))
}

/// Handler: GET /edit/:id
pub async fn handle_edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ServerError> {
    let id = SessionId::parse(&id)?;
    let editor = Arc::clone(&state.editor);
    let lookup = id.clone();
    let listing = blocking(move || editor.pages(&lookup)).await?;

    Ok(Html(html::edit_page(&id, &listing)))
}

/// Handler: POST /rotate/:id/:page
pub async fn handle_rotate(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, usize)>,
) -> Result<Redirect, ServerError> {
    mutate(&state, &id, EditOp::Rotate { page }).await
}

/// Handler: POST /delete/:id/:page
pub async fn handle_delete(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, usize)>,
) -> Result<Redirect, ServerError> {
    mutate(&state, &id, EditOp::Delete { page }).await
}

/// Form body of a move
#[derive(Debug, Deserialize)]
pub struct MoveForm {
    pub to: Option<String>,
}

/// Handler: POST /move/:id/:from
///
/// A missing body or an unreadable `to` falls back to `from`, which is a no-op.
pub async fn handle_move(
    State(state): State<AppState>,
    Path((id, from)): Path<(String, usize)>,
    form: Option<Form<MoveForm>>,
) -> Result<Redirect, ServerError> {
    let to = form
        .and_then(|Form(form)| form.to)
        .as_deref()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(from);
    mutate(&state, &id, EditOp::Move { from, to }).await
}

/// Handler: GET /download/:id
pub async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let id = SessionId::parse(&id)?;
    let editor = Arc::clone(&state.editor);
    let lookup = id.clone();
    let export = blocking(move || editor.export(&lookup)).await?;

    info!(
        "Session {}: sending {} ({} bytes)",
        id,
        export.download_name,
        export.bytes.len()
    );

    let disposition = content_disposition(&export.download_name)?;
    let body = cleanup_body(export, Arc::clone(&state.editor), id);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Apply one edit and send the browser back to the listing
async fn mutate(state: &AppState, raw_id: &str, op: EditOp) -> Result<Redirect, ServerError> {
    let id = SessionId::parse(raw_id)?;
    let editor = Arc::clone(&state.editor);
    let target = id.clone();
    blocking(move || editor.apply(&target, op)).await?;

    Ok(Redirect::to(&edit_url(&id)))
}

/// Run a synchronous core call on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T, ServerError>
where
    F: FnOnce() -> Result<T, EditError> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

fn edit_url(id: &SessionId) -> String {
    format!("/edit/{}", id)
}

fn multipart_error(err: MultipartError, limit: usize) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(limit)
    } else {
        ServerError::InvalidUpload(err.body_text())
    }
}

/// Name of an uploaded file without its `.pdf` extension
///
/// Only the last path component counts; the extension match ignores case.
pub fn pdf_stem(filename: &str) -> Option<&str> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let split = name.len().checked_sub(4)?;
    if !name.is_char_boundary(split) || !name[split..].eq_ignore_ascii_case(".pdf") {
        return None;
    }
    let stem = &name[..split];
    (!stem.trim().is_empty()).then_some(stem)
}

/// `attachment` disposition with an ASCII fallback and the UTF-8 name
fn content_disposition(name: &str) -> Result<HeaderValue, ServerError> {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    );
    HeaderValue::from_str(&value)
        .map_err(|e| ServerError::Internal(format!("Invalid Content-Disposition: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_stem() {
        assert_eq!(pdf_stem("report.pdf"), Some("report"));
        assert_eq!(pdf_stem("Scan.PDF"), Some("Scan"));
        assert_eq!(pdf_stem("C:\\Users\\me\\letter.Pdf"), Some("letter"));
        assert_eq!(pdf_stem("../../etc/notes.pdf"), Some("notes"));
        assert_eq!(pdf_stem("archive.pdf.zip"), None);
        assert_eq!(pdf_stem("image.png"), None);
        assert_eq!(pdf_stem(".pdf"), None);
        assert_eq!(pdf_stem("pdf"), None);
    }

    #[test]
    fn test_content_disposition_ascii() {
        let value = content_disposition("report_edited.pdf").unwrap();
        assert_eq!(
            value.to_str().unwrap(),
            "attachment; filename=\"report_edited.pdf\"; filename*=UTF-8''report_edited.pdf"
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition("résumé \"v2\"_edited.pdf").unwrap();
        let text = value.to_str().unwrap();
        assert!(text.contains("filename=\"r_sum_ _v2__edited.pdf\""));
        assert!(text.contains("filename*=UTF-8''r%C3%A9sum%C3%A9%20%22v2%22_edited.pdf"));
    }
}
