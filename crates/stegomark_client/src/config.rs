use std::time::Duration;

use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

pub const ENV_API_URL: &str = "STEGOMARK_API_URL";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "STEGOMARK_CONNECT_TIMEOUT_SECS";
pub const ENV_JOB_TIMEOUT_SECS: &str = "STEGOMARK_JOB_TIMEOUT_SECS";
pub const ENV_VIDEO_JOB_TIMEOUT_SECS: &str = "STEGOMARK_VIDEO_JOB_TIMEOUT_SECS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid api url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("invalid value {value:?} for {key}: expected whole seconds")]
    InvalidSeconds { key: &'static str, value: String },
}

/// Client-wide settings, built once at startup and shared read-only.
///
/// Job ceilings are wall-clock limits on a whole job (request, upload and
/// the entire event stream); `None` disables the ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
    connect_timeout: Duration,
    image_job_timeout: Option<Duration>,
    video_job_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout: Duration::from_secs(10),
            image_job_timeout: Some(Duration::from_secs(60)),
            video_job_timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            ..Self::default()
        })
    }

    /// Defaults overridden by the `STEGOMARK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(ENV_API_URL) {
            Some(url) if !url.trim().is_empty() => Self::new(url.trim())?,
            _ => Self::default(),
        };
        if let Some(secs) = read_seconds(&lookup, ENV_CONNECT_TIMEOUT_SECS)? {
            config.connect_timeout = secs;
        }
        if let Some(secs) = read_seconds(&lookup, ENV_JOB_TIMEOUT_SECS)? {
            config.image_job_timeout = Some(secs);
        }
        if let Some(secs) = read_seconds(&lookup, ENV_VIDEO_JOB_TIMEOUT_SECS)? {
            config.video_job_timeout = Some(secs);
        }
        Ok(config)
    }

    pub fn with_base_url(self, base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            ..self
        })
    }

    pub fn with_connect_timeout(self, connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..self
        }
    }

    pub fn with_image_job_timeout(self, image_job_timeout: Option<Duration>) -> Self {
        Self {
            image_job_timeout,
            ..self
        }
    }

    pub fn with_video_job_timeout(self, video_job_timeout: Option<Duration>) -> Self {
        Self {
            video_job_timeout,
            ..self
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Ceiling for a job; long-running jobs (video) use the video ceiling.
    pub fn job_timeout(&self, long_running: bool) -> Option<Duration> {
        if long_running {
            self.video_job_timeout
        } else {
            self.image_job_timeout
        }
    }

    /// Absolute URL of an API endpoint such as `/api/video/embed`.
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ConfigError::InvalidUrl {
                url: path.to_string(),
                message: err.to_string(),
            })
    }
}

/// Parses [`DEFAULT_API_URL`], a constant covered by `defaults_point_at_local_server`;
/// the `expect` cannot fire at runtime.
fn default_base_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default api url")
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidUrl {
        url: raw.to_string(),
        message,
    };
    // A trailing slash makes `join` append to the path instead of replacing its last segment.
    let normalized = format!("{}/", raw.trim().trim_end_matches('/'));
    let url = Url::parse(&normalized).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(url)
}

fn read_seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u64>()
        .map(|secs| Some(Duration::from_secs(secs)))
        .map_err(|_| ConfigError::InvalidSeconds { key, value: raw })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{ClientConfig, ConfigError, ENV_API_URL, ENV_VIDEO_JOB_TIMEOUT_SECS};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_local_server() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url().as_str(), "http://localhost:8000/");
        assert_eq!(config.job_timeout(false), Some(Duration::from_secs(60)));
        assert_eq!(config.job_timeout(true), Some(Duration::from_secs(300)));
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let config = ClientConfig::new("https://media.example.com/stego").unwrap();
        assert_eq!(
            config.endpoint("/api/video/embed").unwrap().as_str(),
            "https://media.example.com/stego/api/video/embed"
        );
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_API_URL, "http://10.0.0.5:9000"),
            (ENV_VIDEO_JOB_TIMEOUT_SECS, "900"),
        ]))
        .unwrap();
        assert_eq!(config.base_url().as_str(), "http://10.0.0.5:9000/");
        assert_eq!(config.job_timeout(true), Some(Duration::from_secs(900)));
        assert_eq!(config.job_timeout(false), Some(Duration::from_secs(60)));
    }

    #[test]
    fn bad_env_values_are_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_VIDEO_JOB_TIMEOUT_SECS, "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidSeconds {
                key: ENV_VIDEO_JOB_TIMEOUT_SECS,
                value: "soon".to_string()
            }
        );
        assert!(ClientConfig::new("ftp://example.com").is_err());
    }
}
