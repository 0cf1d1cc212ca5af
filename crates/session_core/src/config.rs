use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use serde::Deserialize;
use url::Url;

use crate::{
    controller::ResolverFailurePolicy,
    error::ConfigError,
    resolver::{CannedResolver, MissingQueryBackend, QueryResolver},
    transport::HttpQueryResolver,
};

pub const SETTINGS_FILE: &str = "float_chat.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    #[default]
    Canned,
    Http,
    Unavailable,
}

impl FromStr for ResolverKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "canned" | "stub" => Ok(ResolverKind::Canned),
            "http" => Ok(ResolverKind::Http),
            "unavailable" | "offline" => Ok(ResolverKind::Unavailable),
            _ => Err(ConfigError::InvalidValue {
                key: "resolver",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub resolver: ResolverKind,
    pub response_latency_ms: u64,
    pub rng_seed: Option<u64>,
    pub backend_url: Option<String>,
    pub request_timeout_secs: u64,
    pub failure_policy: ResolverFailurePolicy,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            resolver: ResolverKind::Canned,
            response_latency_ms: 1500,
            rng_seed: None,
            backend_url: None,
            request_timeout_secs: 30,
            failure_policy: ResolverFailurePolicy::Notice,
        }
    }
}

impl ChatSettings {
    pub fn response_latency(&self) -> Duration {
        Duration::from_millis(self.response_latency_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backend_endpoint(&self) -> Result<Url, ConfigError> {
        let raw = self
            .backend_url
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or(ConfigError::MissingBackendUrl)?;
        let url = Url::parse(raw).map_err(|source| ConfigError::InvalidBackendUrl {
            url: raw.to_string(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(raw.to_string()));
        }
        Ok(url)
    }

    pub fn build_resolver(&self) -> Result<Arc<dyn QueryResolver>, ConfigError> {
        let resolver: Arc<dyn QueryResolver> = match self.resolver {
            ResolverKind::Canned => match self.rng_seed {
                Some(seed) => Arc::new(CannedResolver::with_seed(self.response_latency(), seed)),
                None => Arc::new(CannedResolver::new(self.response_latency())),
            },
            ResolverKind::Http => {
                let endpoint = self.backend_endpoint()?;
                tracing::info!(%endpoint, "using http query backend");
                Arc::new(
                    HttpQueryResolver::new(endpoint, self.request_timeout())
                        .map_err(|err| ConfigError::HttpClient(err.to_string()))?,
                )
            }
            ResolverKind::Unavailable => Arc::new(MissingQueryBackend),
        };
        Ok(resolver)
    }
}

/// Defaults, then the settings file, then environment overrides.
///
/// An explicit `path` must exist; without one, `float_chat.toml` in the working
/// directory is read when present.
pub fn load_settings(path: Option<&Path>) -> Result<ChatSettings, ConfigError> {
    let mut settings = match path {
        Some(path) => read_settings_file(path)?,
        None => match read_settings_file(Path::new(SETTINGS_FILE)) {
            Ok(settings) => settings,
            Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                ChatSettings::default()
            }
            Err(err) => return Err(err),
        },
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<ChatSettings, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: PathBuf::from(path),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: PathBuf::from(path),
        source,
    })
}

fn lookup_last(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|key| lookup(key)).last()
}

fn parse_number<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

pub(crate) fn apply_env_overrides(
    settings: &mut ChatSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup_last(&lookup, &["FLOAT_CHAT_RESOLVER", "APP__RESOLVER"]) {
        settings.resolver = v.parse()?;
    }
    if let Some(v) = lookup_last(&lookup, &["FLOAT_CHAT_LATENCY_MS", "APP__RESPONSE_LATENCY_MS"]) {
        settings.response_latency_ms = parse_number("response_latency_ms", v)?;
    }
    if let Some(v) = lookup_last(&lookup, &["FLOAT_CHAT_SEED", "APP__RNG_SEED"]) {
        settings.rng_seed = Some(parse_number("rng_seed", v)?);
    }
    if let Some(v) = lookup_last(&lookup, &["FLOAT_CHAT_BACKEND_URL", "APP__BACKEND_URL"]) {
        settings.backend_url = Some(v);
    }
    if let Some(v) = lookup_last(
        &lookup,
        &["FLOAT_CHAT_REQUEST_TIMEOUT_SECS", "APP__REQUEST_TIMEOUT_SECS"],
    ) {
        settings.request_timeout_secs = parse_number("request_timeout_secs", v)?;
    }
    if let Some(v) = lookup_last(&lookup, &["FLOAT_CHAT_FAILURE_POLICY", "APP__FAILURE_POLICY"]) {
        settings.failure_policy = v.parse()?;
    }
    Ok(())
}
