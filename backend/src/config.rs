//! Application settings loaded via OrthoConfig.
//!
//! Every field can come from a CLI flag, a `PRAMANA_*` environment variable,
//! or a configuration file. Unset fields fall back to the defaults exposed by
//! the accessor methods.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::outbound::storage::S3Settings;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REGION: &str = "auto";
const DEFAULT_SCAN_WORKERS: usize = 16;
const DEFAULT_STATS_SCAN_CAP: usize = 500;
const DEFAULT_DATA_RIGHTS_SCAN_CAP: usize = 1000;
const DEFAULT_DAY_SCAN_CAP: usize = 10_000;
const DEFAULT_MAX_RANGE_DAYS: u32 = 366;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: usize = 60;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

/// Process-wide configuration for the API server.
#[derive(Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PRAMANA")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// Custom S3-compatible endpoint (R2, MinIO, B2); AWS when unset.
    pub storage_endpoint_url: Option<String>,
    pub storage_access_key_id: Option<String>,
    pub storage_secret_access_key: Option<String>,
    pub storage_bucket_name: Option<String>,
    pub storage_region: Option<String>,
    /// Concurrent downloads allowed across all scans.
    pub scan_workers: Option<usize>,
    /// Files read for one user's statistics.
    pub stats_scan_cap: Option<usize>,
    /// Files matched by one deletion or anonymisation request.
    pub data_rights_scan_cap: Option<usize>,
    /// Keys listed under one day prefix.
    pub day_scan_cap: Option<usize>,
    /// Longest chart range, in days.
    pub max_range_days: Option<u32>,
    pub rate_limit_max_requests: Option<usize>,
    pub rate_limit_window_seconds: Option<u64>,
    /// Comma-separated `token=user_id` pairs accepted as bearer tokens.
    pub auth_tokens: Option<String>,
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("AppSettings")
            .field("bind_addr", &self.bind_addr)
            .field("storage_endpoint_url", &self.storage_endpoint_url)
            .field("storage_access_key_id", &self.storage_access_key_id)
            .field(
                "storage_secret_access_key",
                &redacted(&self.storage_secret_access_key),
            )
            .field("storage_bucket_name", &self.storage_bucket_name)
            .field("storage_region", &self.storage_region)
            .field("scan_workers", &self.scan_workers)
            .field("stats_scan_cap", &self.stats_scan_cap)
            .field("data_rights_scan_cap", &self.data_rights_scan_cap)
            .field("day_scan_cap", &self.day_scan_cap)
            .field("max_range_days", &self.max_range_days)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_seconds", &self.rate_limit_window_seconds)
            .field("auth_tokens", &redacted(&self.auth_tokens))
            .finish()
    }
}

impl AppSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
    }

    /// Bucket connection details, or `None` when the bucket or credentials
    /// are missing and the server should fall back to in-memory storage.
    pub fn s3_settings(&self) -> Option<S3Settings> {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };
        Some(S3Settings {
            bucket: non_blank(&self.storage_bucket_name)?,
            access_key_id: non_blank(&self.storage_access_key_id)?,
            secret_access_key: non_blank(&self.storage_secret_access_key)?,
            region: non_blank(&self.storage_region).unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            endpoint: non_blank(&self.storage_endpoint_url),
        })
    }

    pub fn scan_workers(&self) -> usize {
        self.scan_workers.unwrap_or(DEFAULT_SCAN_WORKERS)
    }

    pub fn stats_scan_cap(&self) -> usize {
        self.stats_scan_cap.unwrap_or(DEFAULT_STATS_SCAN_CAP)
    }

    pub fn data_rights_scan_cap(&self) -> usize {
        self.data_rights_scan_cap
            .unwrap_or(DEFAULT_DATA_RIGHTS_SCAN_CAP)
    }

    pub fn day_scan_cap(&self) -> usize {
        self.day_scan_cap.unwrap_or(DEFAULT_DAY_SCAN_CAP)
    }

    pub fn max_range_days(&self) -> u32 {
        self.max_range_days.unwrap_or(DEFAULT_MAX_RANGE_DAYS)
    }

    pub fn rate_limit_max_requests(&self) -> usize {
        self.rate_limit_max_requests
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(
            self.rate_limit_window_seconds
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECONDS),
        )
    }

    pub fn auth_tokens(&self) -> &str {
        self.auth_tokens.as_deref().unwrap_or_default()
    }
}
