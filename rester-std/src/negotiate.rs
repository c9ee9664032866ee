//! Path-extension content negotiation.
//!
//! When enabled, a trailing `.ext` on the **last** path segment is stripped
//! and selects the output format for the rest of the request:
//!
//! ```rust,ignore
//! let negotiator = ContentNegotiator::new(true);
//! let out = negotiator.negotiate(vec!["reports".into(), "q3.csv".into()]);
//! assert_eq!(out.path, ["reports", "q3"]);
//! assert_eq!(out.format.as_deref(), Some("csv"));
//! ```
//!
//! A segment made only of an extension (`.json`) leaves an empty segment
//! behind. Downstream code treats it as an empty route name, not an error.

use crate::settings::Settings;

/// Result of negotiating one request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    /// The path with any extension removed from its last segment.
    pub path: Vec<String>,
    /// The format selected by the extension, if any.
    pub format: Option<String>,
}

/// Strips a format extension from the last path segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentNegotiator {
    enabled: bool,
}

impl ContentNegotiator {
    /// Create a negotiator. A disabled negotiator never touches the path.
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Create a negotiator from `application.allow_output_extensions`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.application().allow_output_extensions)
    }

    /// Whether extensions are honoured.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Negotiate `path`, returning the possibly rewritten path and format.
    pub fn negotiate(&self, mut path: Vec<String>) -> Negotiation {
        if !self.enabled {
            return Negotiation { path, format: None };
        }
        let format = path.last_mut().and_then(strip_extension);
        Negotiation { path, format }
    }
}

/// Split `segment` at its final `.`, keeping the base name in place.
fn strip_extension(segment: &mut String) -> Option<String> {
    let dot = segment.rfind('.')?;
    if dot + 1 == segment.len() {
        return None;
    }
    let extension = segment[dot + 1..].to_string();
    segment.truncate(dot);
    Some(extension)
}
