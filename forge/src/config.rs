use forge_execution::AccountType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration surface named in §6. `serde`-derived throughout so a host can load it from
/// JSON, matching `jackbot/src/strategy/config.rs`'s config-struct idiom.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradingNodeConfig {
    pub trader_id: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub cache_database: CacheDatabaseConfig,
    pub exec_engine: ExecEngineConfig,
    pub timeouts: TimeoutsConfig,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheDatabaseConfig {
    InMemory,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ExecEngineConfig {
    pub reconciliation_lookback_mins: i64,
    pub allow_cash_positions: bool,
}

impl Default for ExecEngineConfig {
    fn default() -> Self {
        Self { reconciliation_lookback_mins: 60, allow_cash_positions: false }
    }
}

/// Shutdown/reconnection timeouts, each in seconds, per §5's "Cancellation" section.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TimeoutsConfig {
    pub connection: u64,
    pub reconciliation: u64,
    pub portfolio: u64,
    pub disconnection: u64,
    pub post_stop: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self { connection: 10, reconciliation: 10, portfolio: 10, disconnection: 10, post_stop: 5 }
    }
}

/// OMS mode: one netted position per instrument, or many concurrent hedged positions.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize, Serialize)]
pub enum OmsType {
    Netting,
    Hedging,
}

/// Per-venue configuration for a [`crate::backtest::BacktestEngine`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VenueConfig {
    pub name: String,
    pub oms_type: OmsType,
    pub account_type: AccountType,
    /// `None` indicates a multi-asset wallet rather than a single-currency account.
    pub base_currency: Option<String>,
    pub starting_balances: Vec<(String, Decimal)>,
    pub default_leverage: Decimal,
    pub leverages: HashMap<String, Decimal>,
    pub is_frozen_account: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BacktestEngineConfig {
    pub trader_id: String,
    pub exec_engine: ExecEngineConfig,
    pub venues: Vec<VenueConfig>,
}

/// Per-strategy configuration: the `order_id_tag` scoping its [`forge_strategy::OrderFactory`]
/// plus arbitrary user-defined fields, per §6.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StrategyConfig {
    pub order_id_tag: String,
    #[serde(default)]
    pub user_fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LiveRiskEngineConfig {
    pub qsize: usize,
    #[serde(default)]
    pub bypass: bool,
    #[serde(default)]
    pub instrument_limits: HashMap<String, InstrumentLimitConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct InstrumentLimitConfig {
    pub max_quantity: Decimal,
    pub max_notional: Decimal,
    pub price_band_pct: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_config_roundtrips_through_json() {
        let config = StrategyConfig { order_id_tag: "AUD/USD-001".to_string(), user_fields: HashMap::new() };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: StrategyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_exec_engine_config_default() {
        let config = ExecEngineConfig::default();
        assert_eq!(config.reconciliation_lookback_mins, 60);
        assert!(!config.allow_cash_positions);
    }

    #[test]
    fn test_live_risk_engine_config_deserializes_with_defaults() {
        let json = r#"{"qsize": 1024}"#;
        let config: LiveRiskEngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.qsize, 1024);
        assert!(!config.bypass);
        assert!(config.instrument_limits.is_empty());
    }
}
