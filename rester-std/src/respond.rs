//! Turning an [`OperationResponse`] into an [`HttpResponse`].
//!
//! The [`Responder`] holds no resources, so it can always build a response,
//! even when acquiring the database failed before any handler ran.

use crate::{
    render::{JsonRenderer, Renderer, Renderers},
    settings::{HttpVersion, Settings},
};
use bytes::Bytes;
use http::{StatusCode, Version};
use rester_core::{Headers, HttpResponse, OperationResponse};

/// Formats operation responses for the transport.
#[derive(Debug, Clone)]
pub struct Responder {
    renderers: Renderers,
    default_format: String,
    version: Version,
}

impl Responder {
    /// Create a responder.
    pub fn new(renderers: Renderers, default_format: impl Into<String>, version: Version) -> Self {
        Self {
            renderers,
            default_format: default_format.into(),
            version,
        }
    }

    /// Create a responder from `application.output` and `http.version`.
    pub fn from_settings(settings: &Settings, renderers: Renderers) -> Self {
        Self::new(
            renderers,
            settings.application().output.clone(),
            settings.http_version().get(),
        )
    }

    /// The format used when nothing was negotiated.
    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    /// Build the transport response.
    ///
    /// `format` is the negotiated format and wins over the default. An unknown
    /// format falls back to the default; a body the chosen renderer rejects is
    /// written as JSON. The status is never changed.
    ///
    /// Statuses that cannot carry content (1xx, 204, 304) get no body and no
    /// entity headers, whatever the operation returned.
    pub fn respond(&self, response: OperationResponse, format: Option<&str>) -> HttpResponse {
        let (status, body) = response.into_parts();
        if forbids_body(status) {
            if !body.is_null() {
                tracing::debug!(status = status.as_u16(), "dropping body of bodiless status");
            }
            return HttpResponse {
                version: self.version,
                status,
                headers: Headers::new(),
                body: Bytes::new(),
            };
        }

        let renderer = self.select(format);

        let (media_type, bytes) = match renderer.map(|r| (r, r.render(&body))) {
            Some((r, Ok(bytes))) => (r.media_type(), bytes),
            Some((r, Err(error))) => {
                tracing::warn!(format = r.format(), %error, "falling back to json");
                (JsonRenderer.media_type(), JsonRenderer::encode(&body))
            }
            None => (JsonRenderer.media_type(), JsonRenderer::encode(&body)),
        };

        let mut headers = Headers::new();
        headers.insert("Content-Type", media_type);
        headers.insert("Content-Length", bytes.len().to_string());

        HttpResponse {
            version: self.version,
            status,
            headers,
            body: bytes,
        }
    }

    fn select(&self, format: Option<&str>) -> Option<&dyn Renderer> {
        if let Some(format) = format {
            if let Some(renderer) = self.renderers.get(format) {
                return Some(renderer);
            }
            tracing::warn!(
                format,
                default = %self.default_format,
                "no renderer for negotiated format"
            );
        }
        self.renderers.get(&self.default_format)
    }
}

fn forbids_body(status: StatusCode) -> bool {
    status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

impl Default for Responder {
    fn default() -> Self {
        Self::new(Renderers::default(), "json", HttpVersion::default().get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_format_is_used_without_negotiation() {
        let out = Responder::default().respond(OperationResponse::ok(json!({"id": 1})), None);

        assert_eq!(out.status, StatusCode::OK);
        assert_eq!(out.headers.get("content-type"), Some("application/json"));
        assert_eq!(out.headers.get("content-length"), Some("8"));
        assert_eq!(out.json().unwrap(), json!({"id": 1}));
    }

    #[test]
    fn negotiated_format_overrides_default() {
        let out = Responder::default().respond(
            OperationResponse::ok(json!([{"id": 1}, {"id": 2}])),
            Some("csv"),
        );
        assert_eq!(out.headers.get("content-type"), Some("text/csv; charset=utf-8"));
        assert_eq!(out.text(), Some("id\n1\n2\n"));
    }

    #[test]
    fn unknown_format_uses_default() {
        let responder = Responder::new(Renderers::default(), "txt", Version::HTTP_10);
        let out = responder.respond(OperationResponse::ok(json!("hi")), Some("yaml"));

        assert_eq!(out.version, Version::HTTP_10);
        assert_eq!(out.text(), Some("hi"));
    }

    #[test]
    fn rejected_body_degrades_to_json_keeping_status() {
        let out = Responder::default().respond(
            OperationResponse::new(StatusCode::BAD_REQUEST, json!("not tabular")),
            Some("csv"),
        );
        assert_eq!(out.status, StatusCode::BAD_REQUEST);
        assert_eq!(out.headers.get("content-type"), Some("application/json"));
        assert_eq!(out.json().unwrap(), json!("not tabular"));
    }

    #[test]
    fn no_content_has_no_body_or_content_type() {
        let out = Responder::default().respond(OperationResponse::no_content(), Some("csv"));

        assert_eq!(out.status, StatusCode::NO_CONTENT);
        assert!(out.body.is_empty());
        assert!(!out.headers.contains("content-type"));
        assert!(!out.headers.contains("content-length"));
    }

    #[test]
    fn not_modified_drops_a_stray_body() {
        let out = Responder::default().respond(
            OperationResponse::new(StatusCode::NOT_MODIFIED, json!({"etag": "x"})),
            None,
        );
        assert!(out.body.is_empty());
        assert!(out.headers.is_empty());
    }
}
