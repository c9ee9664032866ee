use super::{RenderError, Renderer};
use bytes::Bytes;
use serde_json::Value;

/// Renders bodies as plain text.
///
/// Strings are written verbatim, `null` as nothing, anything else as pretty JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn format(&self) -> &'static str {
        "txt"
    }

    fn media_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn render(&self, body: &Value) -> Result<Bytes, RenderError> {
        let text = match body {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).map_err(|e| RenderError::Encoding {
                format: "txt",
                message: e.to_string(),
            })?,
        };
        Ok(Bytes::from(text))
    }
}
