use pdf_regions::BoundsPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 25;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Server settings, read from `PDF_REGIONS_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PDF_REGIONS_ADDR`
    pub addr: SocketAddr,
    /// `PDF_REGIONS_UPLOAD_DIR`, where exports are written and served from
    pub upload_dir: PathBuf,
    /// `PDF_REGIONS_MAX_UPLOAD_MB`
    pub max_upload_mb: usize,
    /// `PDF_REGIONS_BOUNDS`, `clamp` or `reject`
    pub bounds: BoundsPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            bounds: BoundsPolicy::Clamp,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset or blank variables keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = var("PDF_REGIONS_ADDR") {
            config.addr = value.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidValue {
                    name: "PDF_REGIONS_ADDR",
                    value: value.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(value) = var("PDF_REGIONS_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(value);
        }
        if let Some(value) = var("PDF_REGIONS_MAX_UPLOAD_MB") {
            config.max_upload_mb =
                value.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::InvalidValue {
                        name: "PDF_REGIONS_MAX_UPLOAD_MB",
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?;
        }
        if let Some(value) = var("PDF_REGIONS_BOUNDS") {
            config.bounds = value.parse().map_err(|reason| ConfigError::InvalidValue {
                name: "PDF_REGIONS_BOUNDS",
                value: value.clone(),
                reason,
            })?;
        }

        Ok(config)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
