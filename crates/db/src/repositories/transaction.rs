//! Ledger transaction repository.

use std::sync::Arc;

use async_trait::async_trait;
use payout_core::domain::{LedgerTransaction, TransactionState};
use payout_core::store::{StoreResult, TransactionStore};
use payout_shared::types::{LedgerTransactionId, PayoutAccountId, PayoutId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

use super::{corrupt, db_err, raw_ids, utc};
use crate::entities::transactions;

/// Reads unpaid transactions and detaches them from failed payouts.
#[derive(Debug)]
pub struct TransactionRepository<C = DatabaseConnection> {
    db: Arc<C>,
}

impl TransactionRepository {
    /// Creates a new transaction repository on the connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db: Arc::new(db) }
    }
}

impl<C: ConnectionTrait + TransactionTrait> TransactionRepository<C> {
    /// Creates a repository running every statement on `db`, such as a
    /// lock lease's open transaction.
    #[must_use]
    pub const fn on(db: Arc<C>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl<C> TransactionStore for TransactionRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + 'static,
{
    async fn get_unpaid_transactions(
        &self,
        payout_account_id: PayoutAccountId,
    ) -> StoreResult<Vec<LedgerTransaction>> {
        transactions::Entity::find()
            .filter(transactions::Column::PayoutAccountId.eq(payout_account_id.into_inner()))
            .filter(
                Condition::any()
                    .add(transactions::Column::State.is_null())
                    .add(transactions::Column::State.eq(TransactionState::Active.as_str())),
            )
            .filter(transactions::Column::PayoutId.is_null())
            .filter(transactions::Column::TransferId.is_null())
            .order_by_asc(transactions::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(into_transaction)
            .collect()
    }

    async fn detach_transactions(
        &self,
        ids: &[LedgerTransactionId],
        payout_id: PayoutId,
    ) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = transactions::Entity::update_many()
            .col_expr(transactions::Column::PayoutId, Expr::value(Option::<i64>::None))
            .filter(transactions::Column::Id.is_in(raw_ids(ids)))
            .filter(transactions::Column::PayoutId.eq(payout_id.into_inner()))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }
}

fn into_transaction(model: transactions::Model) -> StoreResult<LedgerTransaction> {
    Ok(LedgerTransaction {
        id: LedgerTransactionId::new(model.id),
        payout_account_id: PayoutAccountId::new(model.payout_account_id),
        amount: model.amount,
        state: model
            .state
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(corrupt)?,
        payout_id: model.payout_id.map(PayoutId::new),
        transfer_id: model.transfer_id,
        created_at: utc(model.created_at),
    })
}
