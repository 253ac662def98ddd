//! Reward ledger queries.
//!
//! Every balance change is written together with its log entry in one
//! transaction, so `coin_balance` always equals the sum of `coins_delta`.

use sqlx::SqliteConnection;

use greenloop_core::db::{DatabaseError, unix_timestamp};
use greenloop_core::{ExchangeQuote, RewardError, RewardPolicy, Voucher, rewards};

use super::db::MarketDatabase;
use super::models::{PurchasedVoucher, TransactionKind, Wallet, WalletTransaction};

/// A ledger write that was refused or failed.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Rejected(#[from] RewardError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e.into())
    }
}

struct LedgerEntry<'a> {
    user_id: &'a str,
    kind: TransactionKind,
    coins_delta: i64,
    cash_delta: i64,
    related_booking_id: Option<&'a str>,
    waste_type: Option<&'a str>,
    voucher_title: Option<&'a str>,
}

/// Create the wallet row if missing. Also takes the write lock for the
/// surrounding transaction.
async fn ensure_wallet(conn: &mut SqliteConnection, user_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO wallets (user_id, updated_at) VALUES (?, ?)")
        .bind(user_id)
        .bind(unix_timestamp())
        .execute(conn)
        .await?;
    Ok(())
}

async fn fetch_wallet(conn: &mut SqliteConnection, user_id: &str) -> Result<Wallet, sqlx::Error> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(conn)
        .await
}

/// Append a log entry. Returns `false` if a uniqueness rule (one award per
/// booking) swallowed it.
async fn append_entry(
    conn: &mut SqliteConnection,
    entry: &LedgerEntry<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO wallet_transactions (user_id, kind, coins_delta, cash_delta, related_booking_id, waste_type, voucher_title, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(entry.user_id)
    .bind(entry.kind.as_str())
    .bind(entry.coins_delta)
    .bind(entry.cash_delta)
    .bind(entry.related_booking_id)
    .bind(entry.waste_type)
    .bind(entry.voucher_title)
    .bind(unix_timestamp())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn adjust_balances(
    conn: &mut SqliteConnection,
    user_id: &str,
    coins_delta: i64,
    cash_delta: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE wallets SET coin_balance = coin_balance + ?, cash_balance = cash_balance + ?, updated_at = ? WHERE user_id = ?",
    )
    .bind(coins_delta)
    .bind(cash_delta)
    .bind(unix_timestamp())
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Credit `coins` for `booking_id` unless that booking was already awarded.
///
/// Runs on the caller's connection so it can share a transaction with the
/// booking status write.
pub(super) async fn credit_award(
    conn: &mut SqliteConnection,
    user_id: &str,
    booking_id: &str,
    waste_type: &str,
    coins: i64,
) -> Result<bool, DatabaseError> {
    ensure_wallet(&mut *conn, user_id).await?;

    let inserted = append_entry(
        &mut *conn,
        &LedgerEntry {
            user_id,
            kind: TransactionKind::Award,
            coins_delta: coins,
            cash_delta: 0,
            related_booking_id: Some(booking_id),
            waste_type: Some(waste_type),
            voucher_title: None,
        },
    )
    .await?;

    if inserted {
        adjust_balances(conn, user_id, coins, 0).await?;
    }
    Ok(inserted)
}

impl MarketDatabase {
    /// Current balances. A user that was never credited has an all-zero
    /// wallet.
    pub async fn get_wallet(&self, user_id: &str) -> Result<Wallet, DatabaseError> {
        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(wallet.unwrap_or_else(|| Wallet::empty(user_id.to_string())))
    }

    /// Award coins for a booking, at most once per booking id.
    ///
    /// Returns whether coins were credited by this call.
    pub async fn award_coins(
        &self,
        user_id: &str,
        booking_id: &str,
        waste_type: &str,
        coins: i64,
    ) -> Result<bool, DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let credited = credit_award(&mut tx, user_id, booking_id, waste_type, coins).await?;
        tx.commit().await?;
        Ok(credited)
    }

    /// Debit a voucher's cost and record it under the user, replacing an
    /// earlier purchase of the same title.
    pub async fn purchase_voucher(
        &self,
        user_id: &str,
        voucher: &Voucher,
    ) -> Result<(Wallet, PurchasedVoucher), LedgerError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        ensure_wallet(&mut tx, user_id).await?;
        let wallet = fetch_wallet(&mut tx, user_id).await?;
        rewards::check_purchase(wallet.coin_balance, voucher.coin_cost)?;

        adjust_balances(&mut tx, user_id, -voucher.coin_cost, 0).await?;
        append_entry(
            &mut tx,
            &LedgerEntry {
                user_id,
                kind: TransactionKind::VoucherPurchase,
                coins_delta: -voucher.coin_cost,
                cash_delta: 0,
                related_booking_id: None,
                waste_type: None,
                voucher_title: Some(voucher.title),
            },
        )
        .await?;

        sqlx::query(
            "INSERT INTO purchased_vouchers (user_id, title, description, coin_cost, brand, purchased_at) VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id, title) DO UPDATE SET description = excluded.description, coin_cost = excluded.coin_cost, brand = excluded.brand, purchased_at = excluded.purchased_at",
        )
        .bind(user_id)
        .bind(voucher.title)
        .bind(voucher.description)
        .bind(voucher.coin_cost)
        .bind(voucher.brand)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let wallet = fetch_wallet(&mut tx, user_id).await?;
        let purchased = sqlx::query_as::<_, PurchasedVoucher>(
            "SELECT * FROM purchased_vouchers WHERE user_id = ? AND title = ?",
        )
        .bind(user_id)
        .bind(voucher.title)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((wallet, purchased))
    }

    /// Convert `coins` into cash at the policy's rate.
    pub async fn exchange_coins(
        &self,
        user_id: &str,
        policy: &RewardPolicy,
        coins: i64,
    ) -> Result<(Wallet, ExchangeQuote), LedgerError> {
        let mut tx = self.pool().begin().await?;

        ensure_wallet(&mut tx, user_id).await?;
        let wallet = fetch_wallet(&mut tx, user_id).await?;
        let quote = policy.quote_exchange(coins, wallet.coin_balance)?;

        adjust_balances(&mut tx, user_id, -quote.coins_debited, quote.cash_credited).await?;
        append_entry(
            &mut tx,
            &LedgerEntry {
                user_id,
                kind: TransactionKind::Exchange,
                coins_delta: -quote.coins_debited,
                cash_delta: quote.cash_credited,
                related_booking_id: None,
                waste_type: None,
                voucher_title: None,
            },
        )
        .await?;

        let wallet = fetch_wallet(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok((wallet, quote))
    }

    /// Ledger entries of a user, newest first.
    pub async fn list_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<WalletTransaction>, DatabaseError> {
        let entries = sqlx::query_as::<_, WalletTransaction>(
            "SELECT * FROM wallet_transactions WHERE user_id = ? ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Vouchers a user holds, most recently purchased first.
    pub async fn list_purchased_vouchers(
        &self,
        user_id: &str,
    ) -> Result<Vec<PurchasedVoucher>, DatabaseError> {
        let vouchers = sqlx::query_as::<_, PurchasedVoucher>(
            "SELECT * FROM purchased_vouchers WHERE user_id = ? ORDER BY purchased_at DESC, title",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(vouchers)
    }

    /// Whether both balances equal the sums of their logged deltas.
    pub async fn verify_ledger(&self, user_id: &str) -> Result<bool, DatabaseError> {
        let wallet = self.get_wallet(user_id).await?;
        let (coins, cash): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(coins_delta), 0), COALESCE(SUM(cash_delta), 0) FROM wallet_transactions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok(wallet.coin_balance == coins && wallet.cash_balance == cash)
    }

    /// Total coins ever awarded to a user.
    pub async fn coins_earned(&self, user_id: &str) -> Result<i64, DatabaseError> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(coins_delta), 0) FROM wallet_transactions WHERE user_id = ? AND kind = ?",
        )
        .bind(user_id)
        .bind(TransactionKind::Award.as_str())
        .fetch_one(self.pool())
        .await?;

        Ok(total)
    }
}
