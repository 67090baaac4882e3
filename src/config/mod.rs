use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the marketplace data layer
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the SQL-over-ledger gateway
    pub gateway_url: String,
    /// Bearer token for the gateway's relay endpoints
    pub api_key: String,
    /// Wallet address the gateway signs write transactions with
    pub signer_address: String,
    /// Chain the tables live on
    pub chain_id: u64,
    /// Table index minted when the freelancers table was created
    pub freelancers_table_id: u64,
    /// Table index minted when the projects table was created
    pub projects_table_id: u64,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Parse environment variables into Config struct
        let config = envy::from_env::<Config>()?;

        Ok(config)
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    // Ensure .env file is loaded
    dotenv().ok();

    // Load the configuration
    let config = Config::load()?;

    Ok(config)
}
