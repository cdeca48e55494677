use crate::database::error::DatabaseError;
use sqlx::{FromRow, PgPool};

const CHAIN_COLUMNS: &str = "chain_id, name, display_name, custody_network, usdc_address, \
     usdt_address, explorer_url, min_confirmations, is_active, created_at";

/// A chain the platform accepts deposits and withdrawals on
#[derive(Debug, Clone, FromRow)]
pub struct SupportedChain {
    pub chain_id: i64,
    pub name: String,
    pub display_name: String,
    pub custody_network: String,
    pub usdc_address: String,
    pub usdt_address: String,
    pub explorer_url: String,
    pub min_confirmations: i32,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl SupportedChain {
    /// Contract address for a supported stablecoin on this chain, if the
    /// token is configured here.
    pub fn token_address(&self, symbol: &str) -> Option<&str> {
        let address = match symbol.to_ascii_uppercase().as_str() {
            "USDC" => self.usdc_address.as_str(),
            "USDT" => self.usdt_address.as_str(),
            _ => return None,
        };
        if address.is_empty() {
            None
        } else {
            Some(address)
        }
    }

    /// Reverse lookup: which supported token a contract address belongs to
    /// on this chain. Case-insensitive to cover EVM checksum casing.
    pub fn token_symbol_for_contract(&self, contract_address: &str) -> Option<&'static str> {
        if !self.usdc_address.is_empty() && self.usdc_address.eq_ignore_ascii_case(contract_address)
        {
            Some("USDC")
        } else if !self.usdt_address.is_empty()
            && self.usdt_address.eq_ignore_ascii_case(contract_address)
        {
            Some("USDT")
        } else {
            None
        }
    }
}

/// Repository for the chain directory
pub struct ChainRepository {
    pool: PgPool,
}

impl ChainRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<SupportedChain>, DatabaseError> {
        sqlx::query_as::<_, SupportedChain>(&format!(
            "SELECT {CHAIN_COLUMNS} FROM supported_chains WHERE name = $1 AND is_active",
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_id(
        &self,
        chain_id: i64,
    ) -> Result<Option<SupportedChain>, DatabaseError> {
        sqlx::query_as::<_, SupportedChain>(&format!(
            "SELECT {CHAIN_COLUMNS} FROM supported_chains WHERE chain_id = $1",
        ))
        .bind(chain_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn list_active(&self) -> Result<Vec<SupportedChain>, DatabaseError> {
        sqlx::query_as::<_, SupportedChain>(&format!(
            "SELECT {CHAIN_COLUMNS} FROM supported_chains WHERE is_active ORDER BY chain_id",
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> SupportedChain {
        SupportedChain {
            chain_id: 1,
            name: "ethereum".to_string(),
            display_name: "Ethereum".to_string(),
            custody_network: "EthereumMainnet".to_string(),
            usdc_address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
            usdt_address: String::new(),
            explorer_url: "https://etherscan.io".to_string(),
            min_confirmations: 12,
            is_active: true,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_token_address_lookup() {
        let chain = chain();
        assert!(chain.token_address("USDC").is_some());
        assert!(chain.token_address("usdc").is_some());
        // configured chain without a USDT contract
        assert!(chain.token_address("USDT").is_none());
        assert!(chain.token_address("DAI").is_none());
    }
}
