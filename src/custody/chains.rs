use regex::Regex;
use std::sync::OnceLock;

use super::types::TransferKind;

/// Address family a chain belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFamily {
    Evm,
    Tron,
}

/// Static mapping from our chain names to custody network identifiers.
///
/// The database chain directory carries the operational settings (token
/// contracts, confirmation thresholds); this table carries what the custody
/// API itself needs and what address shape to enforce.
#[derive(Debug, Clone, Copy)]
pub struct ChainInfo {
    pub chain_id: i64,
    pub name: &'static str,
    pub custody_network: &'static str,
    pub family: ChainFamily,
}

const CHAINS: &[ChainInfo] = &[
    ChainInfo {
        chain_id: 1,
        name: "ethereum",
        custody_network: "EthereumMainnet",
        family: ChainFamily::Evm,
    },
    ChainInfo {
        chain_id: 11_155_111,
        name: "ethereum-sepolia",
        custody_network: "EthereumSepolia",
        family: ChainFamily::Evm,
    },
    ChainInfo {
        chain_id: 728_126_428,
        name: "tron",
        custody_network: "Tron",
        family: ChainFamily::Tron,
    },
    ChainInfo {
        chain_id: 3_448_148_188,
        name: "tron-nile",
        custody_network: "TronNile",
        family: ChainFamily::Tron,
    },
];

pub fn chain_info(name: &str) -> Option<&'static ChainInfo> {
    CHAINS.iter().find(|c| c.name == name)
}

pub fn chain_info_by_id(chain_id: i64) -> Option<&'static ChainInfo> {
    CHAINS.iter().find(|c| c.chain_id == chain_id)
}

impl ChainInfo {
    pub fn transfer_kind(&self) -> TransferKind {
        match self.family {
            ChainFamily::Evm => TransferKind::Erc20,
            ChainFamily::Tron => TransferKind::Trc20,
        }
    }

    /// Whether `address` is well-formed for this chain's address family.
    pub fn is_valid_address(&self, address: &str) -> bool {
        static EVM_RE: OnceLock<Regex> = OnceLock::new();
        static TRON_RE: OnceLock<Regex> = OnceLock::new();

        match self.family {
            ChainFamily::Evm => EVM_RE
                .get_or_init(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap())
                .is_match(address),
            ChainFamily::Tron => TRON_RE
                .get_or_init(|| Regex::new(r"^T[a-zA-Z0-9]{33}$").unwrap())
                .is_match(address),
        }
    }
}

/// The stablecoins the platform accepts, with their base-unit decimals
pub const SUPPORTED_TOKENS: &[(&str, u32)] = &[("USDC", 6), ("USDT", 6)];

/// Base-unit decimals for a supported stablecoin. Unknown tokens get no
/// default: conversion must fail closed rather than guess a precision.
pub fn token_decimals(symbol: &str) -> Option<u32> {
    let upper = symbol.to_ascii_uppercase();
    SUPPORTED_TOKENS
        .iter()
        .find(|(s, _)| *s == upper)
        .map(|(_, d)| *d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_lookup() {
        let eth = chain_info("ethereum").unwrap();
        assert_eq!(eth.chain_id, 1);
        assert_eq!(eth.custody_network, "EthereumMainnet");
        assert_eq!(eth.transfer_kind(), TransferKind::Erc20);

        let tron = chain_info_by_id(728_126_428).unwrap();
        assert_eq!(tron.name, "tron");
        assert_eq!(tron.transfer_kind(), TransferKind::Trc20);

        assert!(chain_info("dogecoin").is_none());
    }

    #[test]
    fn test_evm_address_validation() {
        let eth = chain_info("ethereum").unwrap();
        assert!(eth.is_valid_address("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb7"));
        assert!(!eth.is_valid_address("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb")); // 39 chars
        assert!(!eth.is_valid_address("742d35Cc6634C0532925a3b844Bc9e7595f0bEb7aa"));
        assert!(!eth.is_valid_address("TJRabPrwbZy45sbavfcjinPJC18kjpRTv8"));
    }

    #[test]
    fn test_tron_address_validation() {
        let tron = chain_info("tron").unwrap();
        assert!(tron.is_valid_address("TJRabPrwbZy45sbavfcjinPJC18kjpRTv8"));
        assert!(!tron.is_valid_address("JRabPrwbZy45sbavfcjinPJC18kjpRTv8T"));
        assert!(!tron.is_valid_address("0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb7"));
    }

    #[test]
    fn test_token_decimals_fail_closed() {
        assert_eq!(token_decimals("USDC"), Some(6));
        assert_eq!(token_decimals("usdt"), Some(6));
        assert_eq!(token_decimals("SHIB"), None);
    }
}
