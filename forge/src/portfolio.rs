use forge_execution::Cache;
use rust_decimal::Decimal;

/// A point-in-time read of account equity, margin headroom and position PnL, computed from the
/// [`Cache`]. Grounded on the legacy `barter::portfolio::MetaPortfolio`'s equity bookkeeping
/// (`current_cash + unrealised PnL`), adapted to read from the kernel's `Cache` rather than a
/// separate repository since `Account`/`Position` already live there, per §2's "Account PnL,
/// unrealized/realized positions, margin and equity" responsibility.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PortfolioSnapshot {
    pub balance_total: Decimal,
    pub balance_free: Decimal,
    pub margin_used: Decimal,
    pub margin_available: Decimal,
    pub pnl_unrealised: Decimal,
    pub pnl_realised_open: Decimal,
    pub open_position_count: usize,
}

impl PortfolioSnapshot {
    /// Equity is free cash plus every open position's unrealised PnL - the account's `total`
    /// balance already reflects every closed trade's realised PnL via `Balance::settle`.
    pub fn equity(&self) -> Decimal {
        self.balance_total + self.pnl_unrealised
    }
}

/// Stateless facade computing [`PortfolioSnapshot`]s from a [`Cache`]; holds no state of its
/// own since the Cache is the single owner of account/position truth, per §5's "Shared resource
/// policy".
#[derive(Debug, Default)]
pub struct Portfolio;

impl Portfolio {
    pub fn new() -> Self {
        Self
    }

    pub fn snapshot(&self, cache: &Cache) -> PortfolioSnapshot {
        let Some(account) = cache.account() else {
            return PortfolioSnapshot::default();
        };

        let (balance_total, balance_free) = account
            .balances
            .iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(total, free), entry| {
                (total + entry.balance.total, free + entry.balance.free)
            });

        let mut pnl_unrealised = Decimal::ZERO;
        let mut pnl_realised_open = Decimal::ZERO;
        let mut open_position_count = 0usize;

        for position in cache.positions_open() {
            pnl_unrealised += position.pnl_unrealised;
            pnl_realised_open += position.pnl_realised;
            open_position_count += 1;
        }

        PortfolioSnapshot {
            balance_total,
            balance_free,
            margin_used: account.margin.used,
            margin_available: account.margin.available,
            pnl_unrealised,
            pnl_realised_open,
            open_position_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_execution::{Account, AccountType, AssetBalance, Balance, Margin};
    use rust_decimal_macros::dec;

    fn cache_with_account(total: Decimal, free: Decimal) -> Cache {
        let mut cache = Cache::new();
        cache.update_account(Account::new(
            AccountType::Margin,
            vec![AssetBalance::new("USD".into(), Balance::new(total, free), chrono::Utc::now())],
            Margin::new(dec!(0), dec!(0), dec!(1)),
        ));
        cache
    }

    #[test]
    fn test_snapshot_with_no_account_is_default() {
        let portfolio = Portfolio::new();
        let snapshot = portfolio.snapshot(&Cache::new());
        assert_eq!(snapshot, PortfolioSnapshot::default());
    }

    #[test]
    fn test_equity_adds_unrealised_pnl_to_balance() {
        let cache = cache_with_account(dec!(10_000), dec!(9_000));
        let portfolio = Portfolio::new();
        let snapshot = portfolio.snapshot(&cache);

        assert_eq!(snapshot.balance_total, dec!(10_000));
        assert_eq!(snapshot.equity(), dec!(10_000));
        assert_eq!(snapshot.open_position_count, 0);
    }
}
