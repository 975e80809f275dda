//! Server settings loaded via OrthoConfig, plus the validated server config.

use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_API_BASE: &str = "http://localhost:5000";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Raw settings from CLI flags, `CERTVERIFY_*` variables, and config files.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CERTVERIFY")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Base URL of the registry's record API.
    pub api_base: Option<String>,
    /// Per-request timeout for registry calls, in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// JSON fixture replacing the registry API when set.
    pub records_path: Option<PathBuf>,
}

/// Settings that failed validation.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid bind address {value:?}: {source}")]
    BindAddr {
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("invalid registry API base {value:?}: {source}")]
    ApiBase {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request timeout must be positive")]
    ZeroTimeout,
}

/// Where certificate records are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    Registry { api_base: Url, timeout: Duration },
    Fixture(PathBuf),
}

impl RecordSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Registry { .. } => "registry",
            Self::Fixture(_) => "fixture",
        }
    }
}

impl AppSettings {
    /// Configured bind address, falling back to all interfaces on 8080.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value is not `host:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR).trim();
        raw.parse().map_err(|source| SettingsError::BindAddr {
            value: raw.to_owned(),
            source,
        })
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::ApiBase`] when the value is not an absolute URL.
    pub fn api_base(&self) -> Result<Url, SettingsError> {
        let raw = self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE).trim();
        Url::parse(raw).map_err(|source| SettingsError::ApiBase {
            value: raw.to_owned(),
            source,
        })
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::ZeroTimeout`] for a zero timeout.
    pub fn request_timeout(&self) -> Result<Duration, SettingsError> {
        match self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS) {
            0 => Err(SettingsError::ZeroTimeout),
            ms => Ok(Duration::from_millis(ms)),
        }
    }

    pub fn records_path(&self) -> Option<&Path> {
        self.records_path.as_deref()
    }

    /// A fixture path wins over the registry API.
    ///
    /// # Errors
    ///
    /// Propagates registry setting validation errors.
    pub fn record_source(&self) -> Result<RecordSource, SettingsError> {
        if let Some(path) = self.records_path() {
            return Ok(RecordSource::Fixture(path.to_path_buf()));
        }
        Ok(RecordSource::Registry {
            api_base: self.api_base()?,
            timeout: self.request_timeout()?,
        })
    }
}

/// Validated configuration for creating the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) records: RecordSource,
}

impl ServerConfig {
    /// # Errors
    ///
    /// Returns the first setting that fails validation.
    pub fn from_settings(settings: &AppSettings) -> Result<Self, SettingsError> {
        Ok(Self {
            bind_addr: settings.bind_addr()?,
            records: settings.record_source()?,
        })
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[must_use]
    pub fn records(&self) -> &RecordSource {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    const VARS: [&str; 4] = [
        "CERTVERIFY_BIND_ADDR",
        "CERTVERIFY_API_BASE",
        "CERTVERIFY_REQUEST_TIMEOUT_MS",
        "CERTVERIFY_RECORDS_PATH",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("certverify")]).expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default bind"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(
            settings.record_source().expect("default source"),
            RecordSource::Registry {
                api_base: Url::parse("http://localhost:5000").expect("url"),
                timeout: Duration::from_secs(10),
            }
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("CERTVERIFY_BIND_ADDR", Some("127.0.0.1:9090".to_owned())),
            ("CERTVERIFY_API_BASE", Some("https://registry.example.test/".to_owned())),
            ("CERTVERIFY_REQUEST_TIMEOUT_MS", Some("2500".to_owned())),
            ("CERTVERIFY_RECORDS_PATH", None),
        ]);

        let config = ServerConfig::from_settings(&load_from_empty_args()).expect("valid config");
        assert_eq!(config.bind_addr().port(), 9090);
        assert_eq!(
            config.records(),
            &RecordSource::Registry {
                api_base: Url::parse("https://registry.example.test/").expect("url"),
                timeout: Duration::from_millis(2500),
            }
        );
    }

    #[rstest]
    fn fixture_path_replaces_the_registry() {
        let _guard = lock_env([
            ("CERTVERIFY_BIND_ADDR", None),
            ("CERTVERIFY_API_BASE", Some("not a url".to_owned())),
            ("CERTVERIFY_REQUEST_TIMEOUT_MS", None),
            ("CERTVERIFY_RECORDS_PATH", Some("/tmp/records.json".to_owned())),
        ]);

        let source = load_from_empty_args().record_source().expect("fixture source");
        assert_eq!(source, RecordSource::Fixture(PathBuf::from("/tmp/records.json")));
        assert_eq!(source.label(), "fixture");
    }

    #[rstest]
    #[case(AppSettings { bind_addr: Some("localhost".into()), ..AppSettings::default() })]
    #[case(AppSettings { api_base: Some("/relative".into()), ..AppSettings::default() })]
    #[case(AppSettings { request_timeout_ms: Some(0), ..AppSettings::default() })]
    fn invalid_settings_are_rejected(#[case] settings: AppSettings) {
        assert!(ServerConfig::from_settings(&settings).is_err());
    }
}
