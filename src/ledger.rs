//! Stock ledger helpers. The `stock_transactions` table is the source of
//! truth; the totals cached on `items` are a read optimization and are
//! re-synced every time the ledger is consulted.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct StockTotals {
    pub total_in: Decimal,
    pub total_out: Decimal,
}

impl StockTotals {
    pub fn current(&self) -> Decimal {
        self.total_in - self.total_out
    }
}

pub async fn aggregate_stock(
    conn: &mut PgConnection,
    item_id: Uuid,
) -> Result<StockTotals, sqlx::Error> {
    sqlx::query_as::<_, StockTotals>(
        r#"
        SELECT
            COALESCE(SUM(quantity) FILTER (WHERE txn_type = 'IN'), 0) AS total_in,
            COALESCE(SUM(quantity) FILTER (WHERE txn_type = 'OUT'), 0) AS total_out
        FROM stock_transactions
        WHERE item_id = $1
        "#,
    )
    .bind(item_id)
    .fetch_one(conn)
    .await
}

/// Re-derives an item's stock from the ledger, writes the cached totals back
/// onto the item row, and returns the current quantity. Run inside the same
/// transaction as any debit that depends on the answer.
pub async fn current_stock_for_item(
    conn: &mut PgConnection,
    item_id: Uuid,
) -> Result<Decimal, sqlx::Error> {
    let totals = aggregate_stock(&mut *conn, item_id).await?;
    let current = totals.current();

    sqlx::query(
        r#"
        UPDATE items
        SET total_in_stock = $1, total_out_stock = $2, current_stock = $3, updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(totals.total_in)
    .bind(totals.total_out)
    .bind(current)
    .bind(item_id)
    .execute(conn)
    .await?;

    Ok(current)
}

#[derive(Debug, PartialEq, Eq)]
pub enum LowStockAction {
    /// Crossed at or below the threshold and not yet alerted.
    Notify,
    /// Back above the threshold; re-arm the alert.
    ClearFlag,
}

pub fn low_stock_transition(
    current: Decimal,
    threshold: Decimal,
    already_notified: bool,
) -> Option<LowStockAction> {
    if current <= threshold && !already_notified {
        Some(LowStockAction::Notify)
    } else if current > threshold && already_notified {
        Some(LowStockAction::ClearFlag)
    } else {
        None
    }
}

/// Post-commit low-stock pass for one item: re-reads the cached current
/// stock, alerts once when it crosses at or below the threshold, and re-arms
/// the flag once it recovers. Failures are logged, never propagated.
pub async fn run_low_stock_check(state: &crate::AppState, item_id: Uuid) {
    let item = match sqlx::query_as::<_, crate::models::Item>("SELECT * FROM items WHERE id = $1")
        .bind(item_id)
        .fetch_optional(&state.db)
        .await
    {
        Ok(Some(item)) => item,
        Ok(None) => return,
        Err(e) => {
            log::error!("low stock check failed to load item {item_id}: {e}");
            return;
        }
    };

    let threshold = state.config.notifications.low_stock_threshold;
    match low_stock_transition(item.current_stock, threshold, item.low_stock_notified) {
        Some(LowStockAction::Notify) => {
            state
                .notifier
                .low_stock(&state.db, &item, item.current_stock)
                .await;
            set_low_stock_flag(state, item_id, true).await;
        }
        Some(LowStockAction::ClearFlag) => set_low_stock_flag(state, item_id, false).await,
        None => {}
    }
}

async fn set_low_stock_flag(state: &crate::AppState, item_id: Uuid, notified: bool) {
    if let Err(e) = sqlx::query("UPDATE items SET low_stock_notified = $1 WHERE id = $2")
        .bind(notified)
        .bind(item_id)
        .execute(&state.db)
        .await
    {
        log::error!("failed to update low_stock_notified for item {item_id}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn totals_derive_current() {
        let totals = StockTotals {
            total_in: dec(12),
            total_out: dec(5),
        };
        assert_eq!(totals.current(), dec(7));
    }

    #[test]
    fn notifies_once_on_crossing_down() {
        assert_eq!(
            low_stock_transition(dec(3), dec(5), false),
            Some(LowStockAction::Notify)
        );
        // Already alerted: stay quiet while below threshold
        assert_eq!(low_stock_transition(dec(2), dec(5), true), None);
    }

    #[test]
    fn boundary_counts_as_low() {
        assert_eq!(
            low_stock_transition(dec(5), dec(5), false),
            Some(LowStockAction::Notify)
        );
    }

    #[test]
    fn clears_flag_on_recovery() {
        assert_eq!(
            low_stock_transition(dec(9), dec(5), true),
            Some(LowStockAction::ClearFlag)
        );
        assert_eq!(low_stock_transition(dec(9), dec(5), false), None);
    }
}
