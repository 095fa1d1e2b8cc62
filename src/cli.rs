//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use clap::Parser;
use tracing::error;
use url::Url;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "creatorgate",
    about = "Auth gateway and API proxy for the creator community platform"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Base URL of the backend API (e.g., "https://api.example.com/v1")
    #[arg(long, env = "API_URL")]
    pub api_url: String,

    /// Public origin of this gateway (e.g., "https://app.example.com"). HTTPS enables Secure cookies
    #[arg(long, env = "PUBLIC_ORIGIN", default_value = "http://localhost:3000")]
    pub origin: String,

    /// Path of the sign-in page
    #[arg(long, default_value = "/sign-in", value_parser = validate_path)]
    pub sign_in_path: String,

    /// Path users land on after signing in
    #[arg(long, default_value = "/dashboard", value_parser = validate_path)]
    pub dashboard_path: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_path(s: &str) -> Result<String, String> {
    if !s.starts_with('/') {
        return Err(format!("Path must start with '/': {}", s));
    }

    if s.starts_with("//") {
        return Err(format!("Path must not start with '//': {}", s));
    }

    if s.chars().any(|c| !c.is_ascii() || c.is_whitespace()) {
        return Err(format!("Path contains invalid characters: {}", s));
    }

    Ok(s.to_string())
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Parse and validate the backend API URL.
/// Returns None and logs an error if validation fails.
pub fn validate_api_url(api_url: &str) -> Option<Url> {
    let url = match Url::parse(api_url) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %api_url, error = %e, "Invalid api-url");
            return None;
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        error!(url = %api_url, "api-url must use http or https");
        return None;
    }

    Some(url)
}

/// Parse and validate the public origin.
/// Returns None and logs an error if validation fails.
pub fn validate_origin(origin: &str) -> Option<Url> {
    let url = match Url::parse(origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %origin, error = %e, "Invalid origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_local = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));

    if !is_https && !is_local {
        error!("origin must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    api_url: Url,
    origin: &Url,
    sign_in_path: String,
    dashboard_path: String,
) -> ServerConfig {
    ServerConfig {
        api_url,
        secure_cookies: origin.scheme() == "https",
        sign_in_path,
        dashboard_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("/sign-in").is_ok());
        assert!(validate_path("sign-in").is_err());
        assert!(validate_path("//evil.example").is_err());
        assert!(validate_path("/a b").is_err());
    }

    #[test]
    fn test_validate_api_url() {
        assert!(validate_api_url("https://api.example.com/v1").is_some());
        assert!(validate_api_url("ftp://api.example.com").is_none());
        assert!(validate_api_url("not a url").is_none());
    }

    #[test]
    fn test_validate_origin() {
        assert!(validate_origin("https://app.example.com").is_some());
        assert!(validate_origin("http://localhost:3000").is_some());
        assert!(validate_origin("http://app.example.com").is_none());
    }

    #[test]
    fn test_build_config_secure_cookies() {
        let api = Url::parse("http://localhost:4000").unwrap();

        let https = Url::parse("https://app.example.com").unwrap();
        let config = build_config(api.clone(), &https, "/sign-in".into(), "/dashboard".into());
        assert!(config.secure_cookies);

        let http = Url::parse("http://localhost:3000").unwrap();
        let config = build_config(api, &http, "/sign-in".into(), "/dashboard".into());
        assert!(!config.secure_cookies);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "creatorgate",
            "--api-url",
            "http://localhost:4000",
            "--port",
            "8080",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.port, 8080);
        assert_eq!(args.api_url, "http://localhost:4000");
        assert!(matches!(args.log_format, LogFormat::Json));
    }
}
