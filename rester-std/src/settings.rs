//! Layered, immutable server configuration.
//!
//! [`Settings`] is assembled once at startup from, in increasing priority:
//!
//! 1. configuration files or inline TOML,
//! 2. environment variables prefixed with `RESTER__` (nested keys use `__`,
//!    e.g. `RESTER__APPLICATION__OUTPUT` maps to `application.output`),
//! 3. explicit overrides.
//!
//! After [`SettingsBuilder::build`] nothing mutates it. The one per-request
//! override, the negotiated output format, lives in the request context.
//!
//! # Keys
//!
//! | Key | Type | Default |
//! |---|---|---|
//! | `application.db` | opaque descriptor | null |
//! | `application.cache` | opaque descriptor | null |
//! | `application.allow_output_extensions` | bool | `false` |
//! | `application.output` | string | `"json"` |
//! | `application.close_on_shutdown` | bool | `true` |
//! | `mode` | string | production |
//! | `http.version` | string | `"1.1"` |
//! | `events`, `filters` | list of `{name = "callback"}` | empty |
//!
//! Each `events`/`filters` table holds exactly one pair, so listed order is
//! binding order: `[{ saved = "audit" }, { saved = "notify" }]`.

use config::{Config, Environment, File, FileFormat};
use http::Version;
use rester_core::Channel;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::{collections::HashMap, fmt, path::PathBuf};
use thiserror::Error;

const ENV_PREFIX: &str = "RESTER";

/// Errors raised while assembling the server at startup.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Loading or deserializing configuration failed.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// `http.version` is not a protocol version the emitter can write.
    #[error("unsupported http.version `{0}`")]
    HttpVersion(String),

    /// A configured hook refers to a callback name nobody registered.
    #[error("no callback named `{callback}` for {channel} `{name}`")]
    UnknownCallback {
        /// Section the entry was listed under.
        channel: Channel,
        /// Event or filter name.
        name: String,
        /// Callback reference that failed to resolve.
        callback: String,
    },

    /// A configured hook refers to a callback of the other channel.
    #[error("callback `{callback}` is a {actual} hook but is listed as {expected} `{name}`")]
    ChannelMismatch {
        /// Section the entry was listed under.
        expected: Channel,
        /// Channel of the registered callback.
        actual: Channel,
        /// Event or filter name.
        name: String,
        /// Callback reference.
        callback: String,
    },

    /// An `events` or `filters` table does not hold exactly one pair.
    #[error("{channel} entry #{index} must hold exactly one pair, found {pairs}")]
    HookEntry {
        /// Section the entry was listed under.
        channel: Channel,
        /// Position of the entry in its section.
        index: usize,
        /// Number of pairs in the entry.
        pairs: usize,
    },

    /// The dispatcher was built without a default handler.
    #[error("dispatcher has no default handler")]
    MissingHandler,
}

/// Runtime mode. Only `"development"` enables trace disclosure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum RuntimeMode {
    /// Traces are attached to 500 responses.
    Development,
    /// Anything other than `"development"`.
    #[default]
    Production,
}

impl RuntimeMode {
    /// Whether this is development mode.
    pub fn is_development(self) -> bool {
        self == RuntimeMode::Development
    }
}

impl From<String> for RuntimeMode {
    fn from(value: String) -> Self {
        if value == "development" {
            RuntimeMode::Development
        } else {
            RuntimeMode::Production
        }
    }
}

/// Protocol version written on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct HttpVersion(Version);

impl HttpVersion {
    /// The underlying `http` version.
    pub fn get(self) -> Version {
        self.0
    }
}

impl Default for HttpVersion {
    fn default() -> Self {
        Self(Version::HTTP_11)
    }
}

impl TryFrom<String> for HttpVersion {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let version = match value.trim() {
            "1.0" => Version::HTTP_10,
            "1.1" => Version::HTTP_11,
            "2" | "2.0" => Version::HTTP_2,
            "3" | "3.0" => Version::HTTP_3,
            other => return Err(SettingsError::HttpVersion(other.to_string())),
        };
        Ok(Self(version))
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self.0 {
            Version::HTTP_10 => "1.0",
            Version::HTTP_2 => "2",
            Version::HTTP_3 => "3",
            _ => "1.1",
        };
        f.write_str(text)
    }
}

/// The `application.*` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    /// Database connection descriptor, passed verbatim to the resource provider.
    pub db: Value,
    /// Cache connection descriptor, passed verbatim to the resource provider.
    pub cache: Value,
    /// Whether a trailing `.ext` on the last path segment selects the output format.
    pub allow_output_extensions: bool,
    /// Default output format.
    pub output: String,
    /// Whether the shared database is closed at shutdown.
    pub close_on_shutdown: bool,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            db: Value::Null,
            cache: Value::Null,
            allow_output_extensions: false,
            output: "json".to_string(),
            close_on_shutdown: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct HttpSection {
    version: HttpVersion,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Layout {
    application: ApplicationSettings,
    mode: RuntimeMode,
    http: HttpSection,
    events: Vec<HashMap<String, String>>,
    filters: Vec<HashMap<String, String>>,
}

impl Layout {
    fn check_hook_entries(&self) -> Result<(), SettingsError> {
        let sections = [
            (Channel::Event, &self.events),
            (Channel::Filter, &self.filters),
        ];
        for (channel, section) in sections {
            let malformed = section.iter().enumerate().find(|(_, t)| t.len() != 1);
            if let Some((index, table)) = malformed {
                return Err(SettingsError::HookEntry {
                    channel,
                    index,
                    pairs: table.len(),
                });
            }
        }
        Ok(())
    }
}

/// Immutable server configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    raw: Config,
    layout: Layout,
}

impl Settings {
    /// Start assembling settings.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Settings with every key at its default, ignoring the environment.
    pub fn defaults() -> Self {
        Self {
            raw: Config::default(),
            layout: Layout::default(),
        }
    }

    /// Read any key by its dotted path.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, SettingsError> {
        Ok(self.raw.get::<T>(key)?)
    }

    /// The `application.*` section.
    pub fn application(&self) -> &ApplicationSettings {
        &self.layout.application
    }

    /// The runtime mode.
    pub fn mode(&self) -> RuntimeMode {
        self.layout.mode
    }

    /// The protocol version for status lines.
    pub fn http_version(&self) -> HttpVersion {
        self.layout.http.version
    }

    /// Configured `(name, callback)` pairs of a channel, in listed order.
    pub fn hook_entries(&self, channel: Channel) -> Vec<(String, String)> {
        let section = match channel {
            Channel::Event => &self.layout.events,
            Channel::Filter => &self.layout.filters,
        };
        section
            .iter()
            .flatten()
            .map(|(name, callback)| (name.clone(), callback.clone()))
            .collect()
    }
}

enum Source {
    File(PathBuf),
    Toml(String),
}

/// Builder for [`Settings`].
pub struct SettingsBuilder {
    sources: Vec<Source>,
    overrides: Vec<(String, config::Value)>,
    env_prefix: Option<String>,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            overrides: Vec::new(),
            env_prefix: Some(ENV_PREFIX.to_string()),
        }
    }
}

impl SettingsBuilder {
    /// Add a required configuration file. The format is taken from its extension.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::File(path.into()));
        self
    }

    /// Add inline TOML.
    pub fn toml(mut self, content: impl Into<String>) -> Self {
        self.sources.push(Source::Toml(content.into()));
        self
    }

    /// Override one dotted key. Overrides win over every source.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<config::Value>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Read environment overrides with a different prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Ignore the environment entirely.
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Load every source and validate the typed sections.
    pub fn build(self) -> Result<Settings, SettingsError> {
        let mut builder = Config::builder();
        for source in self.sources {
            builder = match source {
                Source::File(path) => builder.add_source(File::from(path).required(true)),
                Source::Toml(content) => {
                    builder.add_source(File::from_str(&content, FileFormat::Toml))
                }
            };
        }
        if let Some(prefix) = self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(&prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }
        for (key, value) in self.overrides {
            builder = builder.set_override(key, value)?;
        }

        let raw = builder.build()?;
        let layout = raw.clone().try_deserialize::<Layout>()?;
        layout.check_hook_entries()?;
        tracing::debug!(
            mode = ?layout.mode,
            output = %layout.application.output,
            http = %layout.http.version,
            "settings loaded"
        );
        Ok(Settings { raw, layout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_keys_are_absent() {
        let settings = Settings::builder().without_env().build().unwrap();

        assert_eq!(settings.mode(), RuntimeMode::Production);
        assert_eq!(settings.application().output, "json");
        assert!(!settings.application().allow_output_extensions);
        assert!(settings.application().close_on_shutdown);
        assert_eq!(settings.http_version().get(), Version::HTTP_11);
    }

    #[test]
    fn toml_and_overrides_layer() {
        let settings = Settings::builder()
            .without_env()
            .toml(
                r#"
                mode = "development"

                [application]
                output = "csv"
                allow_output_extensions = true
                db = { dsn = "postgres://localhost/app" }

                [http]
                version = "1.0"
                "#,
            )
            .set("application.output", "txt")
            .build()
            .unwrap();

        assert!(settings.mode().is_development());
        assert_eq!(settings.application().output, "txt");
        assert!(settings.application().allow_output_extensions);
        assert_eq!(settings.application().db["dsn"], "postgres://localhost/app");
        assert_eq!(settings.http_version().to_string(), "1.0");
        assert_eq!(settings.get::<String>("application.output").unwrap(), "txt");
    }

    #[test]
    fn unknown_modes_are_production() {
        let settings = Settings::builder()
            .without_env()
            .set("mode", "staging")
            .build()
            .unwrap();
        assert_eq!(settings.mode(), RuntimeMode::Production);
    }

    #[test]
    fn invalid_http_version_is_rejected() {
        let result = Settings::builder()
            .without_env()
            .set("http.version", "0.9")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn hook_entries_keep_listed_order() {
        let settings = Settings::builder()
            .without_env()
            .toml(
                r#"
                events = [{ saved = "audit" }, { saved = "notify" }]
                filters = [{ body = "redact" }]
                "#,
            )
            .build()
            .unwrap();

        assert_eq!(
            settings.hook_entries(Channel::Event),
            vec![
                ("saved".to_string(), "audit".to_string()),
                ("saved".to_string(), "notify".to_string()),
            ]
        );
        assert_eq!(
            settings.hook_entries(Channel::Filter),
            vec![("body".to_string(), "redact".to_string())]
        );
    }

    #[test]
    fn multi_pair_hook_tables_are_rejected() {
        let result = Settings::builder()
            .without_env()
            .toml(r#"events = [{ zeta = "a", alpha = "b" }]"#)
            .build();

        assert!(matches!(
            result,
            Err(SettingsError::HookEntry {
                channel: Channel::Event,
                index: 0,
                pairs: 2,
            })
        ));
    }
}
