/// Trash classification endpoint
use crate::error::{AppError, Result};
use crate::metrics::CLASSIFY_REQUESTS_TOTAL;
use crate::AppState;
use actix_multipart::Multipart;
use actix_web::http::header::{self, ContentDisposition};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use tracing::debug;

pub const MISSING_IMAGE: &str = "Missing 'image' file (multipart/form-data).";
const UPLOAD_FIELD: &str = "image";

struct Upload {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Find the `image` file part and buffer it, enforcing the size limit.
///
/// Malformed bodies are treated the same as a missing part.
async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<Option<Upload>> {
    while let Some(item) = multipart.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => {
                debug!(error = %e, "Unreadable multipart body");
                return Ok(None);
            }
        };

        let disposition = field
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| ContentDisposition::from_raw(v).ok());
        let (name, filename) = match &disposition {
            Some(cd) => (cd.get_name(), cd.get_filename()),
            None => (None, None),
        };

        // Only file parts count; a plain text field named `image` does not.
        let filename = match (name, filename) {
            (Some(UPLOAD_FIELD), Some(filename)) => filename.to_string(),
            _ => continue,
        };

        let content_type = field.content_type().map(|m| m.to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    debug!(error = %e, "Upload stream aborted");
                    return Ok(None);
                }
            };
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::BadRequest(format!(
                    "Uploaded image exceeds the {} byte limit.",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(Some(Upload {
            filename,
            content_type,
            bytes,
        }));
    }

    Ok(None)
}

/// Classify an uploaded photo
///
/// POST /api/classify/
pub async fn classify(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_multipart(&req) {
        CLASSIFY_REQUESTS_TOTAL.with_label_values(&["bad_request", ""]).inc();
        return Err(AppError::BadRequest(MISSING_IMAGE.to_string()));
    }

    let multipart = Multipart::new(req.headers(), payload);
    let upload = match read_upload(multipart, state.settings.max_upload_bytes).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            CLASSIFY_REQUESTS_TOTAL.with_label_values(&["bad_request", ""]).inc();
            return Err(AppError::BadRequest(MISSING_IMAGE.to_string()));
        }
        Err(e) => {
            CLASSIFY_REQUESTS_TOTAL.with_label_values(&["bad_request", ""]).inc();
            return Err(e);
        }
    };

    debug!(
        filename = %upload.filename,
        content_type = upload.content_type.as_deref().unwrap_or("unknown"),
        size = upload.bytes.len(),
        "Received upload"
    );

    let classifier = state.classifier.clone();
    let outcome = web::block(move || classifier.classify(&upload.bytes)).await?;

    match outcome {
        Ok(result) => {
            CLASSIFY_REQUESTS_TOTAL
                .with_label_values(&["ok", result.label.as_str()])
                .inc();
            debug!(label = %result.label, confidence = result.confidence, "Image classified");
            Ok(HttpResponse::Ok().json(result))
        }
        Err(e) => {
            CLASSIFY_REQUESTS_TOTAL.with_label_values(&["error", ""]).inc();
            Err(e.into())
        }
    }
}

pub async fn method_not_allowed() -> Result<HttpResponse> {
    Err(AppError::MethodNotAllowed(
        "POST an image file to this endpoint.".to_string(),
    ))
}
