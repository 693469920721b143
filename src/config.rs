use std::{str::FromStr, time::Duration};

use reqwest::Url;

/// Captured when the crate is built, used when `BACKEND_URL` is not set at
/// runtime.
const BUILD_BACKEND_URL: Option<&str> = option_env!("BACKEND_URL");

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_TOAST_SUCCESS: Duration = Duration::from_millis(2000);
const DEFAULT_TOAST_ERROR: Duration = Duration::from_millis(4000);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`BACKEND_URL` is not set")]
    MissingBackendUrl,
    #[error("`BACKEND_URL` is not a valid base URL: {0}")]
    InvalidBackendUrl(String),
    #[error("`{key}` has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

/// What a failed poll does to the displayed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollFailure {
    /// Reset the list to empty.
    #[default]
    Clear,
    /// Leave the last successful snapshot on screen.
    Keep,
}

impl FromStr for PollFailure {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Ok(Self::Clear),
            "keep" => Ok(Self::Keep),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: Url,
    pub poll_interval: Duration,
    pub poll_failure: PollFailure,
    pub toast_success: Duration,
    pub toast_error: Duration,
}

impl Config {
    /// Reads the configuration from the process environment, after loading a
    /// `.env` file if there is one.
    pub fn from_env() -> Result<Self, Error> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Error> {
        let backend_url = lookup("BACKEND_URL")
            .or_else(|| BUILD_BACKEND_URL.map(ToOwned::to_owned))
            .filter(|url| !url.trim().is_empty())
            .ok_or(Error::MissingBackendUrl)?;
        let backend_url = parse_base_url(&backend_url)?;

        let poll_interval = match lookup("POLL_INTERVAL_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(Error::Invalid {
                        key: "POLL_INTERVAL_SECS",
                        value,
                    });
                }
            },
            None => DEFAULT_POLL_INTERVAL,
        };

        let poll_failure = match lookup("POLL_FAILURE") {
            Some(value) => value
                .parse()
                .map_err(|()| Error::Invalid { key: "POLL_FAILURE", value })?,
            None => PollFailure::default(),
        };

        let toast_success =
            millis(&lookup, "TOAST_SUCCESS_MS", DEFAULT_TOAST_SUCCESS)?;
        let toast_error =
            millis(&lookup, "TOAST_ERROR_MS", DEFAULT_TOAST_ERROR)?;

        Ok(Self {
            backend_url,
            poll_interval,
            poll_failure,
            toast_success,
            toast_error,
        })
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, Error> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };

    value
        .trim()
        .parse()
        .map(Duration::from_millis)
        .map_err(|_| Error::Invalid { key, value })
}

// `Url::join` drops the last path segment unless it ends with a slash, which
// would break backends mounted under a prefix.
fn parse_base_url(raw: &str) -> Result<Url, Error> {
    let raw = raw.trim();
    let mut url = Url::parse(raw)
        .map_err(|error| Error::InvalidBackendUrl(error.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(Error::InvalidBackendUrl(raw.to_owned()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
