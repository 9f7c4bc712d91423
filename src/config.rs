use clap::Parser;
use std::{env, fmt};
use thiserror::Error;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub access_key: String,
    pub secret_key: String,
    pub bucket_name: String,
    pub endpoint_url: String,
    pub region: String,
    pub force_path_style: bool,
    pub listing_concurrency: usize,
    pub enrich_listing: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Music streaming proxy over S3-compatible storage")]
pub struct Args {
    /// Host to bind to (overrides MUSIC_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides MUSIC_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Storage access key id (overrides ACCESS_KEY)
    #[arg(long)]
    pub access_key: Option<String>,

    /// Storage secret access key (overrides SECRET_KEY)
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Bucket holding the tracks (overrides BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,

    /// S3-compatible endpoint URL (overrides ENDPOINT_URL)
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Signing region (overrides MUSIC_STORE_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long)]
    pub force_path_style: bool,

    /// Parallel metadata requests while building /list (overrides MUSIC_STORE_LISTING_CONCURRENCY)
    #[arg(long)]
    pub listing_concurrency: Option<usize>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value `{value}` for {name}")]
    Invalid { name: &'static str, value: String },
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self, ConfigError> {
        Self::resolve(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge CLI args over values from `lookup`; every missing required value
    /// is reported at once.
    pub fn resolve(
        args: Args,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let required = |arg: Option<String>, name: &'static str, missing: &mut Vec<&'static str>| {
            let value = arg.or_else(|| lookup(name)).filter(|v| !v.is_empty());
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };

        let mut missing = Vec::new();
        let access_key = required(args.access_key, "ACCESS_KEY", &mut missing);
        let secret_key = required(args.secret_key, "SECRET_KEY", &mut missing);
        let bucket_name = required(args.bucket, "BUCKET_NAME", &mut missing);
        let endpoint_url = required(args.endpoint_url, "ENDPOINT_URL", &mut missing);
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let port = match args.port {
            Some(port) => port,
            None => parse_or("MUSIC_STORE_PORT", lookup("MUSIC_STORE_PORT"), 3000)?,
        };
        let listing_concurrency = match args.listing_concurrency {
            Some(n) => n,
            None => parse_or(
                "MUSIC_STORE_LISTING_CONCURRENCY",
                lookup("MUSIC_STORE_LISTING_CONCURRENCY"),
                8,
            )?,
        };
        if listing_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "MUSIC_STORE_LISTING_CONCURRENCY",
                value: "0".into(),
            });
        }

        Ok(Self {
            host: args
                .host
                .or_else(|| lookup("MUSIC_STORE_HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port,
            access_key,
            secret_key,
            bucket_name,
            endpoint_url,
            region: args
                .region
                .or_else(|| lookup("MUSIC_STORE_REGION"))
                .unwrap_or_else(|| "auto".into()),
            force_path_style: args.force_path_style
                || parse_or(
                    "MUSIC_STORE_FORCE_PATH_STYLE",
                    lookup("MUSIC_STORE_FORCE_PATH_STYLE"),
                    false,
                )?,
            listing_concurrency,
            enrich_listing: parse_or(
                "MUSIC_STORE_ENRICH_LISTING",
                lookup("MUSIC_STORE_ENRICH_LISTING"),
                true,
            )?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Credentials stay out of logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("force_path_style", &self.force_path_style)
            .field("listing_concurrency", &self.listing_concurrency)
            .field("enrich_listing", &self.enrich_listing)
            .finish()
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
