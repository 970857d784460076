//! Application configuration module
//! Loads settings from the environment (and `.env`), validated once at start-up

use std::env;
use std::fmt;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
    pub aws: AwsConfig,
    pub payment: PaymentConfig,
}

/// Webhook HTTP listener
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

/// Payment gateway (Stripe) connection settings
#[derive(Clone)]
pub struct GatewayConfig {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub webhook_tolerance_secs: u64,
    pub return_url: String,
}

/// Datastore and queue settings
#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub dynamodb_endpoint_url: Option<String>,
    pub sqs_endpoint_url: Option<String>,
    pub operation_timeout_secs: u64,
    pub orders_table: String,
    pub payments_table: String,
    pub payment_events_queue_url: Option<String>,
}

/// Business defaults applied when building payments
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub default_currency: String,
    pub checkout_base_url: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            gateway: GatewayConfig::from_env()?,
            aws: AwsConfig::from_env()?,
            payment: PaymentConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.logging.validate()?;
        self.gateway.validate()?;
        self.aws.validate()?;
        self.payment.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("SERVER_PORT", "8080")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "json".to_string())
                .to_lowercase()
                .as_str()
            {
                "plain" | "pretty" | "text" => LogFormat::Plain,
                _ => LogFormat::Json,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_key = env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVariable("STRIPE_SECRET_KEY".to_string()))?;

        Ok(GatewayConfig {
            secret_key,
            webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            base_url: env::var("STRIPE_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: parse_var("STRIPE_TIMEOUT_SECS", "30")?,
            webhook_tolerance_secs: parse_var("STRIPE_WEBHOOK_TOLERANCE_SECS", "300")?,
            return_url: env::var("PAYMENT_RETURN_URL")
                .unwrap_or_else(|_| "https://localhost/payment-return".to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingVariable("STRIPE_SECRET_KEY".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "STRIPE_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("STRIPE_TIMEOUT_SECS".to_string()));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("secret_key", &"<redacted>")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .field("return_url", &self.return_url)
            .finish()
    }
}

impl AwsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(AwsConfig {
            region: optional_var("AWS_REGION"),
            dynamodb_endpoint_url: optional_var("DYNAMODB_ENDPOINT_URL"),
            sqs_endpoint_url: optional_var("SQS_ENDPOINT_URL"),
            operation_timeout_secs: parse_var("AWS_OPERATION_TIMEOUT_SECS", "10")?,
            orders_table: env::var("ORDERS_TABLE").unwrap_or_else(|_| "Pedidos".to_string()),
            payments_table: env::var("PAYMENTS_TABLE")
                .unwrap_or_else(|_| "Pagamentos".to_string()),
            payment_events_queue_url: optional_var("PAYMENT_EVENTS_QUEUE_URL"),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orders_table.trim().is_empty() {
            return Err(ConfigError::InvalidValue("ORDERS_TABLE".to_string()));
        }

        if self.payments_table.trim().is_empty() {
            return Err(ConfigError::InvalidValue("PAYMENTS_TABLE".to_string()));
        }

        if self.operation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "AWS_OPERATION_TIMEOUT_SECS".to_string(),
            ));
        }

        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl PaymentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(PaymentConfig {
            default_currency: env::var("PAYMENT_DEFAULT_CURRENCY")
                .unwrap_or_else(|_| "brl".to_string())
                .to_lowercase(),
            checkout_base_url: env::var("PAYMENT_CHECKOUT_BASE_URL")
                .unwrap_or_else(|_| "https://checkout.stripe.com/pay".to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_currency.len() != 3 {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_DEFAULT_CURRENCY must be a 3-letter ISO code".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            default_currency: "brl".to_string(),
            checkout_base_url: "https://checkout.stripe.com/pay".to_string(),
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn gateway_config() -> GatewayConfig {
        GatewayConfig {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: Some("whsec_abc".to_string()),
            base_url: "https://api.stripe.com".to_string(),
            timeout_secs: 30,
            webhook_tolerance_secs: 300,
            return_url: "https://localhost/payment-return".to_string(),
        }
    }

    #[test]
    fn test_server_config_validation() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
        };

        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_port_validation() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 0,
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gateway_debug_redacts_secrets() {
        let rendered = format!("{:?}", gateway_config());
        assert!(!rendered.contains("sk_test_123"));
        assert!(!rendered.contains("whsec_abc"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_gateway_rejects_bad_base_url() {
        let mut config = gateway_config();
        config.base_url = "api.stripe.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_missing_secret_key_is_fatal() {
        env::remove_var("STRIPE_SECRET_KEY");
        let err = GatewayConfig::from_env().expect_err("secret key is required");
        assert!(matches!(err, ConfigError::MissingVariable(ref v) if v == "STRIPE_SECRET_KEY"));
    }

    #[test]
    #[serial]
    fn test_gateway_defaults_from_env() {
        env::set_var("STRIPE_SECRET_KEY", "sk_test_env");
        env::remove_var("STRIPE_BASE_URL");
        env::remove_var("STRIPE_TIMEOUT_SECS");
        env::remove_var("STRIPE_WEBHOOK_SECRET");

        let config = GatewayConfig::from_env().expect("config");
        assert_eq!(config.secret_key, "sk_test_env");
        assert_eq!(config.base_url, "https://api.stripe.com");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.webhook_tolerance_secs, 300);
        assert!(config.webhook_secret.is_none());

        env::remove_var("STRIPE_SECRET_KEY");
    }

    #[test]
    #[serial]
    fn test_aws_and_payment_defaults() {
        for var in [
            "ORDERS_TABLE",
            "PAYMENTS_TABLE",
            "AWS_OPERATION_TIMEOUT_SECS",
            "PAYMENT_DEFAULT_CURRENCY",
            "PAYMENT_CHECKOUT_BASE_URL",
        ] {
            env::remove_var(var);
        }

        let aws = AwsConfig::from_env().expect("aws config");
        assert_eq!(aws.orders_table, "Pedidos");
        assert_eq!(aws.payments_table, "Pagamentos");
        assert_eq!(aws.operation_timeout(), Duration::from_secs(10));

        let payment = PaymentConfig::from_env().expect("payment config");
        assert_eq!(payment.default_currency, "brl");
        assert_eq!(payment.checkout_base_url, "https://checkout.stripe.com/pay");
        assert!(payment.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_invalid_numeric_value_is_reported() {
        env::set_var("AWS_OPERATION_TIMEOUT_SECS", "ten");
        let err = AwsConfig::from_env().expect_err("non-numeric timeout");
        assert!(matches!(err, ConfigError::InvalidValue(ref v) if v == "AWS_OPERATION_TIMEOUT_SECS"));
        env::remove_var("AWS_OPERATION_TIMEOUT_SECS");
    }
}
