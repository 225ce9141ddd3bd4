//! Configuration management for Slasherz Server

use serde::Deserialize;
use thiserror::Error;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub datapack: DatapackConfig,
    pub storage: StorageConfig,
    pub access: AccessConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatapackConfig {
    /// Directory holding `datapack.json` and `version.json`
    pub dir: PathBuf,
    /// External BLAKE2b command; `None` hashes in-process only
    pub hasher_command: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: ImageBackend,
    pub image_dir: PathBuf,
    pub s3: Option<S3Config>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageBackend {
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: Option<String>,
    /// Key prefix for card images
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Addresses allowed to call administrative endpoints
    pub allowed_ips: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: "sqlite:./slasherz.db".to_string(),
            },
            datapack: DatapackConfig {
                dir: PathBuf::from("./data"),
                hasher_command: Some("b2sum".to_string()),
            },
            storage: StorageConfig {
                backend: ImageBackend::Local,
                image_dir: PathBuf::from("./data/images"),
                s3: None,
            },
            access: AccessConfig {
                allowed_ips: vec!["127.0.0.1".to_string()],
            },
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set when IMAGE_BACKEND=s3")]
    MissingS3Var(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let backend = match var_or("IMAGE_BACKEND", "local").as_str() {
            "s3" => ImageBackend::S3,
            _ => ImageBackend::Local,
        };

        // S3 credentials are only required when images live in a bucket
        let s3 = match backend {
            ImageBackend::S3 => {
                let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingS3Var(name));
                Some(S3Config {
                    endpoint: required("S3_ENDPOINT")?,
                    bucket: required("S3_BUCKET")?,
                    access_key: required("S3_ACCESS_KEY")?,
                    secret_key: required("S3_SECRET_KEY")?,
                    region: lookup("S3_REGION"),
                    prefix: var_or("S3_PREFIX", "cards/"),
                })
            }
            ImageBackend::Local => None,
        };

        Ok(Config {
            server: ServerConfig {
                host: var_or("SERVER_HOST", "0.0.0.0"),
                port: var_or("SERVER_PORT", "8000").parse().unwrap_or(8000),
            },
            database: DatabaseConfig {
                url: var_or("DATABASE_URL", "sqlite:./slasherz.db"),
            },
            datapack: DatapackConfig {
                dir: PathBuf::from(var_or("DATAPACK_DIR", "./data")),
                hasher_command: match lookup("HASHER_COMMAND") {
                    Some(cmd) if cmd.trim().is_empty() => None,
                    Some(cmd) => Some(cmd),
                    None => Some("b2sum".to_string()),
                },
            },
            storage: StorageConfig {
                backend,
                image_dir: PathBuf::from(var_or("IMAGE_DIR", "./data/images")),
                s3,
            },
            access: AccessConfig {
                allowed_ips: parse_ip_list(&var_or("ALLOWED_IPS", "127.0.0.1")),
            },
        })
    }
}

/// Split a comma separated address list, dropping blanks
pub fn parse_ip_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .collect()
}
