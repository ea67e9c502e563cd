// ============================
// filedrop-lib/src/routes.rs
// ============================
//! HTTP router and handlers.
use std::sync::Arc;
use axum::{
    body::Body,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use futures_util::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use filedrop_common::User;
use crate::auth::{CurrentUser, AUTH_COOKIE, BEARER_PREFIX};
use crate::error::AppError;
use crate::files::{FileRegistry, PendingUpload};
use crate::pages;
use crate::storage::BlobStore;
use crate::AppState;

/// Multipart field carrying uploaded files
pub const UPLOAD_FIELD: &str = "files";

/// Username/password form. Extra OAuth2 password-flow fields are ignored.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

/// Create the application router
pub fn create_router<S: BlobStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let upload_limit = state.settings.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/register", get(register_form).post(register::<S>))
        .route("/login", get(login_form))
        .route("/token", post(login_for_access_token::<S>))
        .route(
            "/uploadfile",
            get(upload_form::<S>)
                .post(upload_files::<S>)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/download/{filename}", get(download_file::<S>))
        .route("/delete/{filename}", get(delete_file::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Redirect {
    Redirect::to("/login")
}

async fn register_form() -> impl IntoResponse {
    pages::register_page(None)
}

async fn register<S: BlobStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match state.credentials.register(&form.username, &form.password).await {
        Ok(_) => Redirect::to("/login").into_response(),
        Err(AppError::DuplicateUsername) => {
            pages::register_page(Some("User already exists")).into_response()
        },
        Err(AppError::InvalidInput(msg)) => pages::register_page(Some(msg.as_str())).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn login_form() -> impl IntoResponse {
    pages::login_page(None)
}

/// Build the `Set-Cookie` value carrying a freshly issued token
pub fn auth_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{AUTH_COOKIE}=\"{BEARER_PREFIX}{token}\"; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

async fn login_for_access_token<S: BlobStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let user = match state.credentials.authenticate(&form.username, &form.password).await {
        Ok(user) => user,
        Err(AppError::InvalidCredentials) => {
            return Ok(pages::login_page(Some("Incorrect username or password")).into_response());
        },
        Err(e) => return Err(e),
    };

    let settings = &state.settings;
    let token = state.tokens.issue(&user.username, settings.token_ttl())?;
    let cookie = auth_cookie(&token, settings.token_ttl_secs, settings.secure_cookie);
    tracing::info!(username = %user.username, "issued session token");

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/uploadfile")).into_response())
}

async fn upload_form<S: BlobStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let files = state.files.list(&user).await?;
    Ok(pages::upload_page(&user.username, &files).into_response())
}

/// Keep the multipart status: a body over the upload limit is 413, not 400
fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::InvalidInput(format!("invalid multipart body: {}", e.body_text()))
    }
}

async fn stage_uploads<S: BlobStore>(
    files: &FileRegistry<S>,
    user: &User,
    multipart: &mut Multipart,
    pending: &mut Vec<PendingUpload>,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.map_err(multipart_error);

        pending.push(files.stage(user, &filename, content).await?);
    }
    Ok(())
}

/// All `files` parts of one request are stored together or not at all
async fn upload_files<S: BlobStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut pending = Vec::new();

    if let Err(e) = stage_uploads(&state.files, &user, &mut multipart, &mut pending).await {
        state.files.abandon(pending).await;
        return Err(e);
    }
    if pending.is_empty() {
        return Err(AppError::InvalidInput(format!("no `{UPLOAD_FIELD}` parts in upload")));
    }

    state.files.commit(&user, pending).await?;
    Ok(Redirect::to("/uploadfile"))
}

/// `Content-Disposition` for a download. Non-ASCII names ride in `filename*`.
pub fn attachment_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

async fn download_file<S: BlobStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (record, reader) = state.files.open(&user, &filename).await?;

    let disposition = HeaderValue::from_str(&attachment_disposition(&record.filename))
        .map_err(|e| AppError::Internal(format!("bad content-disposition: {e}")))?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn delete_file<S: BlobStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Path(filename): Path<String>,
) -> Result<Redirect, AppError> {
    state.files.delete(&user, &filename).await?;
    Ok(Redirect::to("/uploadfile"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_cookie_format() {
        assert_eq!(
            auth_cookie("abc.def.ghi", 1800, false),
            "access_token=\"Bearer abc.def.ghi\"; HttpOnly; Path=/; SameSite=Lax; Max-Age=1800"
        );
        assert!(auth_cookie("t", 60, true).ends_with("; Secure"));
    }

    #[test]
    fn test_attachment_disposition() {
        assert_eq!(
            attachment_disposition("report 1.pdf"),
            "attachment; filename=\"report 1.pdf\"; filename*=UTF-8''report%201.pdf"
        );
        let header = attachment_disposition("naïve \"q\".txt");
        assert!(header.starts_with("attachment; filename=\"na_ve _q_.txt\""));
        assert!(header.ends_with("filename*=UTF-8''na%C3%AFve%20%22q%22.txt"));
        assert!(HeaderValue::from_str(&header).is_ok());
    }
}
