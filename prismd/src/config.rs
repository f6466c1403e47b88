//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use prism_domain::{Address, BasisPoints};
use prism_engine::{ClaimValidator, Engine, FeeRates, FeeSchedule};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Fee schedule parameters
    pub fees: FeeConfig,

    /// Visibility of `Invalid` projections on the discovery API
    pub invalid_visibility: InvalidVisibility,

    /// Verification standards the mint validator accepts
    pub accepted_standards: Vec<String>,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Fee schedule parameters.
#[derive(Debug, Clone)]
pub struct FeeConfig {
    /// Default maker rate in basis points
    pub maker_fee_bp: u32,
    /// Default taker rate in basis points
    pub taker_fee_bp: u32,
    /// Flat per-order creation fee
    pub creation_fee: Decimal,
    /// Address accruing protocol fees
    pub fee_collector: String,
}

/// Deployment policy for projections resolved `Invalid`.
///
/// Protocol-wise both are legal; which one a deployment runs is an
/// operator decision, not engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidVisibility {
    /// Invalid projections answer not-found
    Hidden,
    /// Invalid projections are served, tagged with their validity
    Tagged,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Ok(Self {
            api: Self::load_api_config()?,
            fees: Self::load_fee_config()?,
            invalid_visibility: Self::load_invalid_visibility()?,
            accepted_standards: Self::load_accepted_standards(),
            environment: Self::load_environment()?,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            fees: FeeConfig {
                maker_fee_bp: 0,
                taker_fee_bp: 0,
                creation_fee: Decimal::ZERO,
                fee_collector: "0x000000000000000000000000000000000000fee5".to_string(),
            },
            invalid_visibility: InvalidVisibility::Hidden,
            accepted_standards: vec!["erc1155".to_string()],
            environment: Environment::Test,
        }
    }

    /// Build the engine this configuration describes.
    pub fn build_engine(&self) -> DaemonResult<Engine> {
        let collector = Address::new(&self.fees.fee_collector)?;
        let rates = FeeRates {
            maker_bp: BasisPoints::new(self.fees.maker_fee_bp)?,
            taker_bp: BasisPoints::new(self.fees.taker_fee_bp)?,
        };
        let schedule = FeeSchedule::new(rates, self.fees.creation_fee, collector);
        let validator = ClaimValidator::new(self.accepted_standards.iter().cloned());
        Ok(Engine::new(schedule, Box::new(validator)))
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("PRISM_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid PRISM_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_api_config() -> DaemonResult<ApiConfig> {
        let host = env::var("PRISM_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port_str = env::var("PRISM_API_PORT").unwrap_or_else(|_| "8080".to_string());

        let port = port_str
            .parse::<u16>()
            .map_err(|_| DaemonError::Config(format!("Invalid PRISM_API_PORT: {}", port_str)))?;

        Ok(ApiConfig { host, port })
    }

    fn load_fee_config() -> DaemonResult<FeeConfig> {
        let maker_fee_bp = Self::load_u32_env("PRISM_MAKER_FEE_BP", 0)?;
        let taker_fee_bp = Self::load_u32_env("PRISM_TAKER_FEE_BP", 0)?;
        let creation_fee = Self::load_decimal_env("PRISM_CREATION_FEE", Decimal::ZERO)?;
        let fee_collector = env::var("PRISM_FEE_COLLECTOR")
            .unwrap_or_else(|_| "0x0000000000000000000000000000000000000000".to_string());

        Ok(FeeConfig {
            maker_fee_bp,
            taker_fee_bp,
            creation_fee,
            fee_collector,
        })
    }

    fn load_invalid_visibility() -> DaemonResult<InvalidVisibility> {
        let value = env::var("PRISM_INVALID_VISIBILITY").unwrap_or_else(|_| "hidden".to_string());

        match value.to_lowercase().as_str() {
            "hidden" => Ok(InvalidVisibility::Hidden),
            "tagged" => Ok(InvalidVisibility::Tagged),
            other => Err(DaemonError::Config(format!(
                "Invalid PRISM_INVALID_VISIBILITY: {}. Expected: hidden, tagged",
                other
            ))),
        }
    }

    fn load_accepted_standards() -> Vec<String> {
        env::var("PRISM_ACCEPTED_STANDARDS")
            .unwrap_or_else(|_| "erc1155".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn load_u32_env(key: &str, default: u32) -> DaemonResult<u32> {
        match env::var(key) {
            Ok(val) => val
                .parse::<u32>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }

    fn load_decimal_env(key: &str, default: Decimal) -> DaemonResult<Decimal> {
        match env::var(key) {
            Ok(val) => Decimal::from_str(&val)
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            fees: FeeConfig {
                maker_fee_bp: 0,
                taker_fee_bp: 0,
                creation_fee: Decimal::ZERO,
                fee_collector: "0x0000000000000000000000000000000000000000".to_string(),
            },
            invalid_visibility: InvalidVisibility::Hidden,
            accepted_standards: vec!["erc1155".to_string()],
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
