use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};

use super::AppError;
use super::pages::{self, Origin};
use crate::context::AppContext;
use crate::pipeline::{
    Failure, FailureKind, convert_submission, render_submission, validate_submission,
};

type Ctx = State<Arc<AppContext>>;

/// The form fields of a submission.
struct Upload {
    file_name: Option<String>,
    bytes: Bytes,
    origin: Origin,
}

/// Read the `file` and `origin` fields. A missing file yields an empty
/// upload, which the workflow rejects as such.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut upload = Upload {
        file_name: None,
        bytes: Bytes::new(),
        origin: Origin::Start,
    };
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                upload.file_name = field.file_name().map(String::from);
                upload.bytes = field.bytes().await?;
            }
            Some("origin") => {
                let value = field.text().await?;
                upload.origin = Origin::from_form(Some(value.trim()));
            }
            _ => {}
        }
    }
    tracing::debug!(
        file = upload.file_name.as_deref().unwrap_or("-"),
        bytes = upload.bytes.len(),
        "upload received"
    );
    Ok(upload)
}

/// Run a workflow on the blocking pool; parsing and rendering are CPU bound.
async fn run<T, F>(ctx: &Arc<AppContext>, bytes: Bytes, workflow: F) -> Result<Result<T, Failure>, AppError>
where
    T: Send + 'static,
    F: FnOnce(&AppContext, &[u8]) -> Result<T, Failure> + Send + 'static,
{
    let ctx = Arc::clone(ctx);
    tokio::task::spawn_blocking(move || workflow(&*ctx, &bytes[..]))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn failure_status(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::Io => StatusCode::BAD_REQUEST,
        FailureKind::StartupResourceMissing => StatusCode::SERVICE_UNAVAILABLE,
        FailureKind::RenderingFailed => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn failure_response(ctx: &AppContext, failure: &Failure, origin: Origin) -> Response {
    (
        failure_status(failure.kind),
        Html(pages::failure_page(failure, origin, ctx.locale)),
    )
        .into_response()
}

/// File name safe for a Content-Disposition header.
fn attachment_name(stem: &str, extension: &str) -> String {
    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = if stem.is_empty() { "invoice".to_string() } else { stem };
    format!("{stem}.{extension}")
}

pub async fn landing(State(ctx): Ctx) -> Html<String> {
    Html(pages::landing_page(ctx.landing_page, ctx.locale))
}

pub async fn service(State(ctx): Ctx) -> Html<String> {
    Html(pages::service_page(ctx.locale))
}

pub async fn labs(State(ctx): Ctx) -> Html<String> {
    Html(pages::labs_page(ctx.locale))
}

pub async fn validate(State(ctx): Ctx, multipart: Multipart) -> Result<Response, AppError> {
    let upload = read_upload(multipart).await?;
    Ok(match run(&ctx, upload.bytes, validate_submission).await? {
        Ok(result) => Html(pages::validation_page(&result, ctx.locale)).into_response(),
        Err(failure) => failure_response(&ctx, &failure, upload.origin),
    })
}

pub async fn report(State(ctx): Ctx, multipart: Multipart) -> Result<Response, AppError> {
    let upload = read_upload(multipart).await?;
    Ok(match run(&ctx, upload.bytes, render_submission).await? {
        Ok(rendered) => {
            let disposition = format!(
                "inline; filename=\"{}\"",
                attachment_name(&rendered.invoice_number, "pdf")
            );
            (
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                rendered.pdf,
            )
                .into_response()
        }
        Err(failure) => failure_response(&ctx, &failure, upload.origin),
    })
}

pub async fn convert(State(ctx): Ctx, multipart: Multipart) -> Result<Response, AppError> {
    let upload = read_upload(multipart).await?;
    Ok(match run(&ctx, upload.bytes, convert_submission).await? {
        Ok(converted) => {
            Html(pages::conversion_page(&converted, upload.origin, ctx.locale)).into_response()
        }
        Err(failure) => failure_response(&ctx, &failure, upload.origin),
    })
}

pub async fn download(State(ctx): Ctx, multipart: Multipart) -> Result<Response, AppError> {
    let upload = read_upload(multipart).await?;
    Ok(match run(&ctx, upload.bytes, convert_submission).await? {
        Ok(converted) => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                attachment_name(&format!("{}-xrechnung", converted.invoice_number), "xml")
            );
            (
                [
                    (header::CONTENT_TYPE, "application/xml; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                converted.ubl,
            )
                .into_response()
        }
        Err(failure) => failure_response(&ctx, &failure, upload.origin),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_names_are_header_safe() {
        assert_eq!(attachment_name("RE-2024/001", "pdf"), "RE-2024_001.pdf");
        assert_eq!(attachment_name("", "xml"), "invoice.xml");
        assert_eq!(attachment_name("a\"b", "xml"), "a_b.xml");
    }

    #[test]
    fn failure_statuses() {
        assert_eq!(failure_status(FailureKind::Io), StatusCode::BAD_REQUEST);
        assert_eq!(
            failure_status(FailureKind::UnknownFormat),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            failure_status(FailureKind::StartupResourceMissing),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
