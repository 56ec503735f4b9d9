//! Supported-currency registry, built from configuration.

use crate::config::AppConfig;
use crate::core::error::{CoreError, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Currency {
    Fiat {
        code: String,
        name: String,
        issuing_country: String,
    },
    Crypto {
        code: String,
        name: String,
        algorithm: String,
    },
}

impl Currency {
    pub fn code(&self) -> &str {
        match self {
            Currency::Fiat { code, .. } | Currency::Crypto { code, .. } => code,
        }
    }

    pub fn display_info(&self) -> String {
        match self {
            Currency::Fiat {
                code,
                name,
                issuing_country,
            } => format!("[FIAT] {code} - {name} (Issuing: {issuing_country})"),
            Currency::Crypto {
                code,
                name,
                algorithm,
            } => format!("[CRYPTO] {code} - {name} (Algo: {algorithm})"),
        }
    }
}

fn fiat_details(code: &str) -> (&'static str, &'static str) {
    match code {
        "USD" => ("US Dollar", "United States"),
        "EUR" => ("Euro", "Eurozone"),
        "GBP" => ("Pound Sterling", "United Kingdom"),
        "RUB" => ("Russian Ruble", "Russia"),
        "JPY" => ("Japanese Yen", "Japan"),
        "CNY" => ("Chinese Yuan", "China"),
        "CHF" => ("Swiss Franc", "Switzerland"),
        "CAD" => ("Canadian Dollar", "Canada"),
        "AUD" => ("Australian Dollar", "Australia"),
        _ => ("Unknown Fiat", "Unknown"),
    }
}

fn crypto_details(code: &str) -> (&'static str, &'static str) {
    match code {
        "BTC" => ("Bitcoin", "SHA-256"),
        "ETH" => ("Ethereum", "Ethash"),
        "SOL" => ("Solana", "PoH"),
        "BNB" => ("BNB", "BFT"),
        "XRP" => ("XRP", "RPCA"),
        "ADA" => ("Cardano", "Ouroboros"),
        "DOGE" => ("Dogecoin", "Scrypt"),
        "DOT" => ("Polkadot", "NPoS"),
        "LTC" => ("Litecoin", "Scrypt"),
        _ => ("Unknown Crypto", "Unknown"),
    }
}

/// All currency codes the application knows about. Lookups are
/// case-insensitive; unknown codes fail with `CurrencyNotFound` before any
/// I/O happens downstream.
#[derive(Debug, Clone, Default)]
pub struct CurrencyRegistry {
    currencies: BTreeMap<String, Currency>,
}

impl CurrencyRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut currencies = BTreeMap::new();

        let mut fiat_codes: Vec<String> = config.fiat_currencies.clone();
        if !fiat_codes.contains(&config.base_currency) {
            fiat_codes.push(config.base_currency.clone());
        }

        for code in fiat_codes {
            let code = code.to_uppercase();
            let (name, issuing_country) = fiat_details(&code);
            currencies.insert(
                code.clone(),
                Currency::Fiat {
                    code,
                    name: name.to_string(),
                    issuing_country: issuing_country.to_string(),
                },
            );
        }

        for code in &config.crypto_currencies {
            let code = code.to_uppercase();
            let (name, algorithm) = crypto_details(&code);
            currencies.insert(
                code.clone(),
                Currency::Crypto {
                    code,
                    name: name.to_string(),
                    algorithm: algorithm.to_string(),
                },
            );
        }

        Self { currencies }
    }

    pub fn get(&self, code: &str) -> Result<&Currency> {
        self.currencies
            .get(&code.to_uppercase())
            .ok_or_else(|| CoreError::CurrencyNotFound {
                code: code.to_uppercase(),
            })
    }

    pub fn all(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.values()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> CurrencyRegistry {
        CurrencyRegistry::from_config(&AppConfig::default())
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = test_registry();
        assert_eq!(registry.get("btc").unwrap().code(), "BTC");
        assert_eq!(registry.get("Usd").unwrap().code(), "USD");
    }

    #[test]
    fn test_unknown_code_fails() {
        let registry = test_registry();
        let err = registry.get("ZZZ").unwrap_err();
        assert!(matches!(
            err,
            CoreError::CurrencyNotFound { code } if code == "ZZZ"
        ));
    }

    #[test]
    fn test_base_currency_is_always_registered() {
        let mut config = AppConfig::default();
        config.fiat_currencies = vec!["EUR".to_string()];
        let registry = CurrencyRegistry::from_config(&config);
        assert!(registry.get("USD").is_ok());
    }

    #[test]
    fn test_display_info() {
        let registry = test_registry();
        let info = registry.get("BTC").unwrap().display_info();
        assert!(info.starts_with("[CRYPTO] BTC"));
        assert!(info.contains("SHA-256"));
    }
}
