use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;

const DEFAULT_ROSTER_URL: &str = "https://absensi.connectis.my.id/api/siswa";

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote endpoint listing the people to recognize.
    pub roster_url: String,
    /// Local wall-clock time of the daily roster sync.
    pub sync_time: NaiveTime,
    /// Address the HTTP API listens on.
    pub bind_addr: SocketAddr,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Maximum signature distance for a positive match.
    pub match_tolerance: f32,
    /// Timeout for fetching the roster listing.
    pub roster_timeout: Duration,
    /// Timeout for each roster photo download.
    pub photo_timeout: Duration,
    /// Maximum accepted upload body size in bytes.
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from `ABSENSI_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            roster_url: std::env::var("ABSENSI_ROSTER_URL")
                .unwrap_or_else(|_| DEFAULT_ROSTER_URL.to_string()),
            sync_time: env_parse("ABSENSI_SYNC_TIME", parse_sync_time, default_sync_time()),
            bind_addr: env_parse(
                "ABSENSI_BIND_ADDR",
                SocketAddr::from_str,
                SocketAddr::from(([0, 0, 0, 0], 5000)),
            ),
            model_dir: std::env::var("ABSENSI_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| absensi_core::default_model_dir()),
            match_tolerance: env_parse(
                "ABSENSI_MATCH_TOLERANCE",
                f32::from_str,
                absensi_core::DEFAULT_TOLERANCE,
            ),
            roster_timeout: Duration::from_secs(env_parse(
                "ABSENSI_ROSTER_TIMEOUT_SECS",
                u64::from_str,
                30,
            )),
            photo_timeout: Duration::from_secs(env_parse(
                "ABSENSI_PHOTO_TIMEOUT_SECS",
                u64::from_str,
                10,
            )),
            max_upload_bytes: env_parse("ABSENSI_MAX_UPLOAD_BYTES", usize::from_str, 16 * 1024 * 1024),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn scrfd_model_path(&self) -> String {
        self.model_dir
            .join("det_10g.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the ArcFace recognition model.
    pub fn arcface_model_path(&self) -> String {
        self.model_dir
            .join("w600k_r50.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

/// Parse a 24-hour `HH:MM` time of day.
pub fn parse_sync_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
}

fn default_sync_time() -> NaiveTime {
    NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Read `key` and parse it; unset or unparsable values fall back to `default`.
fn env_parse<T, E: fmt::Display>(key: &str, parse: impl Fn(&str) -> Result<T, E>, default: T) -> T {
    parse_var(key, |k| std::env::var(k).ok(), parse, default)
}

fn parse_var<T, E: fmt::Display>(
    key: &str,
    lookup: impl Fn(&str) -> Option<String>,
    parse: impl Fn(&str) -> Result<T, E>,
    default: T,
) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match parse(&raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "invalid value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync_time() {
        assert_eq!(parse_sync_time("01:00").unwrap(), NaiveTime::from_hms_opt(1, 0, 0).unwrap());
        assert_eq!(parse_sync_time(" 23:59 ").unwrap(), NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert!(parse_sync_time("24:00").is_err());
        assert!(parse_sync_time("1 am").is_err());
    }

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_parse_var_falls_back_on_garbage() {
        let env = vars(&[("ABSENSI_MATCH_TOLERANCE", "not-a-number")]);
        assert_eq!(parse_var("ABSENSI_MATCH_TOLERANCE", &env, f32::from_str, 1.1), 1.1);

        let env = vars(&[("ABSENSI_MATCH_TOLERANCE", "0.6")]);
        assert_eq!(parse_var("ABSENSI_MATCH_TOLERANCE", &env, f32::from_str, 1.1), 0.6);
    }

    #[test]
    fn test_parse_var_unset_uses_default() {
        let env = vars(&[("ABSENSI_SYNC_TIME", "02:30")]);
        assert_eq!(parse_var("ABSENSI_PHOTO_TIMEOUT_SECS", &env, u64::from_str, 10), 10);
        assert_eq!(
            parse_var("ABSENSI_SYNC_TIME", &env, parse_sync_time, default_sync_time()),
            NaiveTime::from_hms_opt(2, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_model_paths() {
        let config = Config {
            model_dir: PathBuf::from("/opt/models"),
            ..Config::from_env()
        };
        assert_eq!(config.scrfd_model_path(), "/opt/models/det_10g.onnx");
        assert_eq!(config.arcface_model_path(), "/opt/models/w600k_r50.onnx");
    }
}
