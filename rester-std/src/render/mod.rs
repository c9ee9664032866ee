//! Body renderers, selected by output format name.
//!
//! - [`JsonRenderer`] - `json`, the fallback for everything
//! - [`CsvRenderer`] - `csv`, for an object or an array of objects
//! - [`TextRenderer`] - `txt`, plain text

mod delimited;
mod json;
mod text;

pub use self::delimited::CsvRenderer;
pub use self::json::JsonRenderer;
pub use self::text::TextRenderer;

use bytes::Bytes;
use serde_json::Value;
use std::{collections::HashMap, fmt, sync::Arc};
use thiserror::Error;

/// Errors raised while encoding a body.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The body has a shape the renderer cannot express.
    #[error("{format} renderer cannot express {shape}")]
    Unsupported {
        /// Format of the renderer.
        format: &'static str,
        /// Description of the offending value.
        shape: &'static str,
    },

    /// Encoding failed.
    #[error("{format} encoding failed: {message}")]
    Encoding {
        /// Format of the renderer.
        format: &'static str,
        /// Description of the failure.
        message: String,
    },
}

/// Encodes a structured body in one output format.
pub trait Renderer: Send + Sync + 'static {
    /// Format name, matching path extensions and `application.output`.
    fn format(&self) -> &'static str;

    /// Value of the `Content-Type` header.
    fn media_type(&self) -> &'static str;

    /// Encode `body`.
    fn render(&self, body: &Value) -> Result<Bytes, RenderError>;
}

/// Renderers keyed by format name.
#[derive(Clone)]
pub struct Renderers {
    by_format: HashMap<&'static str, Arc<dyn Renderer>>,
}

impl Renderers {
    /// An empty set. JSON is still used as the last resort by the responder.
    pub fn empty() -> Self {
        Self {
            by_format: HashMap::new(),
        }
    }

    /// Register a renderer, replacing any previous one for the same format.
    pub fn register<R: Renderer>(mut self, renderer: R) -> Self {
        self.by_format.insert(renderer.format(), Arc::new(renderer));
        self
    }

    /// The renderer for `format`.
    pub fn get(&self, format: &str) -> Option<&dyn Renderer> {
        self.by_format.get(format).map(|r| &**r)
    }

    /// Whether `format` has a renderer.
    pub fn supports(&self, format: &str) -> bool {
        self.by_format.contains_key(format)
    }
}

impl Default for Renderers {
    fn default() -> Self {
        Self::empty()
            .register(JsonRenderer)
            .register(CsvRenderer::default())
            .register(TextRenderer)
    }
}

impl fmt::Debug for Renderers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.by_format.keys().collect();
        formats.sort();
        f.debug_struct("Renderers").field("formats", &formats).finish()
    }
}

/// Short description of a value's shape, for error messages.
pub(crate) fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
