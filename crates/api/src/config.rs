//! Application configuration loaded from environment variables.

use std::time::Duration;

use checkout::GatewayConfig;
use secrecy::SecretString;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `GATEWAY_URL` — payment provider invoice endpoint
/// - `GATEWAY_TOKEN` — shared-secret header value (no default)
/// - `GATEWAY_CURRENCY` — ISO 4217 numeric code (default: `980`)
/// - `GATEWAY_TIMEOUT_SECS` — outbound request bound (default: `10`)
/// - `CHECKOUT_REDIRECT_URL` — where the provider sends the buyer back
/// - `PAYMENT_WEBHOOK_URL` — where the provider delivers notifications
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub gateway: GatewayConfig,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: env_or("RUST_LOG", "info"),
            gateway: GatewayConfig {
                endpoint: env_or(
                    "GATEWAY_URL",
                    "https://api.monobank.ua/api/merchant/invoice/create",
                ),
                token: SecretString::from(env_or("GATEWAY_TOKEN", "")),
                currency_code: std::env::var("GATEWAY_CURRENCY")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(980),
                redirect_url: env_or(
                    "CHECKOUT_REDIRECT_URL",
                    "http://localhost:3000/checkout/success",
                ),
                webhook_url: env_or(
                    "PAYMENT_WEBHOOK_URL",
                    "http://localhost:3000/orders/webhook",
                ),
                timeout: Duration::from_secs(
                    std::env::var("GATEWAY_TIMEOUT_SECS")
                        .ok()
                        .and_then(|t| t.parse().ok())
                        .unwrap_or(10),
                ),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            gateway: GatewayConfig {
                endpoint: "https://api.monobank.ua/api/merchant/invoice/create".to_string(),
                token: SecretString::from(String::new()),
                currency_code: 980,
                redirect_url: "http://localhost:3000/checkout/success".to_string(),
                webhook_url: "http://localhost:3000/orders/webhook".to_string(),
                timeout: Duration::from_secs(10),
            },
        }
    }
}
