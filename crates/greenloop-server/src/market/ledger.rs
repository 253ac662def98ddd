//! Wallets, vouchers and coin exchange.

use tracing::{info, instrument, warn};

use greenloop_core::rewards;

use super::{Market, MarketError, Result, Subscription};
use crate::storage::{PurchasedVoucher, Wallet, WalletTransaction};

impl Market {
    pub async fn wallet(&self, user_id: &str) -> Result<Wallet> {
        self.require_user(user_id).await?;
        Ok(self.db.get_wallet(user_id).await?)
    }

    /// Ledger entries, newest first.
    pub async fn transactions(&self, user_id: &str) -> Result<Vec<WalletTransaction>> {
        self.require_user(user_id).await?;
        Ok(self.db.list_transactions(user_id).await?)
    }

    pub async fn purchased_vouchers(&self, user_id: &str) -> Result<Vec<PurchasedVoucher>> {
        self.require_user(user_id).await?;
        Ok(self.db.list_purchased_vouchers(user_id).await?)
    }

    /// Buy a catalog voucher by title.
    #[instrument(skip(self))]
    pub async fn purchase_voucher(
        &self,
        user_id: &str,
        title: &str,
    ) -> Result<(Wallet, PurchasedVoucher)> {
        self.require_user(user_id).await?;
        let voucher = rewards::find_voucher(title)
            .ok_or_else(|| MarketError::NotFound(format!("Voucher {title}")))?;

        let (wallet, purchased) = self
            .db
            .purchase_voucher(user_id, voucher)
            .await
            .map_err(|e| {
                warn!(user_id, title, error = %e, "Voucher purchase refused");
                MarketError::from(e)
            })?;
        info!(
            user_id,
            title,
            coin_cost = voucher.coin_cost,
            coin_balance = wallet.coin_balance,
            "Voucher purchased"
        );

        #[cfg(feature = "metrics")]
        self.metrics.record_purchase(title);
        self.wallets.publish(user_id, wallet.clone()).await;
        Ok((wallet, purchased))
    }

    /// Convert coins to cash. Returns the new wallet and the cash credited.
    #[instrument(skip(self))]
    pub async fn exchange(&self, user_id: &str, coins: i64) -> Result<(Wallet, i64)> {
        self.require_user(user_id).await?;
        let (wallet, quote) = self
            .db
            .exchange_coins(user_id, &self.policy, coins)
            .await
            .map_err(|e| {
                warn!(user_id, coins, error = %e, "Exchange refused");
                MarketError::from(e)
            })?;
        info!(
            user_id,
            coins,
            cash_credited = quote.cash_credited,
            "Coins exchanged"
        );

        #[cfg(feature = "metrics")]
        self.metrics.record_exchange(quote.coins_debited);
        self.wallets.publish(user_id, wallet.clone()).await;
        Ok((wallet, quote.cash_credited))
    }

    /// Whether the user's balances match their ledger.
    pub async fn verify_ledger(&self, user_id: &str) -> Result<bool> {
        Ok(self.db.verify_ledger(user_id).await?)
    }

    /// Live view of the user's balances.
    pub async fn watch_wallet(&self, user_id: &str) -> Result<Subscription<Wallet>> {
        self.require_user(user_id).await?;
        let rx = self.wallets.subscribe(user_id).await;
        let initial = self.db.get_wallet(user_id).await?;
        Ok(Subscription::new(initial, rx))
    }
}
