use super::{RenderError, Renderer};
use bytes::Bytes;
use serde_json::Value;

/// Renders bodies as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl JsonRenderer {
    /// Encode without going through the [`Renderer`] error type.
    ///
    /// Serializing a `serde_json::Value` cannot fail, so this is the last resort
    /// when another renderer rejects a body.
    pub fn encode(body: &Value) -> Bytes {
        Bytes::from(body.to_string())
    }
}

impl Renderer for JsonRenderer {
    fn format(&self) -> &'static str {
        "json"
    }

    fn media_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, body: &Value) -> Result<Bytes, RenderError> {
        Ok(Self::encode(body))
    }
}
