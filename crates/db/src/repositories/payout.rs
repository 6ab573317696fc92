//! Payout repository.
//!
//! Payout creation and transaction reservation commit together: the
//! reserved rows are locked, checked and stamped inside one storage
//! transaction so a concurrent reservation can never double-attach. When
//! the repository runs on a row-lock lease, that transaction is a savepoint
//! inside the lease and commits with it.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use payout_core::domain::{NewPayout, Payout, PayoutPatch, PayoutQuery, PayoutStatus};
use payout_core::store::{PayoutStore, StoreError, StoreResult};
use payout_shared::types::{LedgerTransactionId, PayoutAccountId, PayoutId, PayoutMethodId};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use super::{corrupt, db_err, raw_ids, utc};
use crate::entities::{payouts, transactions};

/// Payout records and their transaction reservations.
#[derive(Debug, Clone)]
pub struct PayoutRepository<C = DatabaseConnection> {
    db: Arc<C>,
}

impl PayoutRepository {
    /// Creates a new payout repository on the connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db: Arc::new(db) }
    }
}

impl<C: ConnectionTrait + TransactionTrait> PayoutRepository<C> {
    /// Creates a repository running every statement on `db`, such as a
    /// lock lease's open transaction.
    #[must_use]
    pub const fn on(db: Arc<C>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl<C> PayoutStore for PayoutRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + 'static,
{
    async fn create_payout_and_attach(&self, new: NewPayout) -> StoreResult<Payout> {
        let ids = raw_ids(&new.transaction_ids);
        let wanted: BTreeSet<i64> = ids.iter().copied().collect();

        let txn = self.db.as_ref().begin().await.map_err(db_err)?;

        let locked = transactions::Entity::find()
            .filter(transactions::Column::Id.is_in(ids.clone()))
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(db_err)?;

        let found: BTreeSet<i64> = locked.iter().map(|t| t.id).collect();
        if let Some(missing) = wanted.difference(&found).next() {
            return Err(StoreError::not_found("transaction", *missing));
        }
        if let Some(taken) = locked.iter().find(|t| t.payout_id.is_some()) {
            return Err(StoreError::Conflict(format!(
                "transaction {} is already attached to a payout",
                taken.id
            )));
        }

        let now = Utc::now().into();
        let model = payouts::ActiveModel {
            payout_account_id: Set(new.payout_account_id.into_inner()),
            amount: Set(new.amount),
            fee: Set(new.fee),
            currency: Set(new.currency),
            status: Set(PayoutStatus::New.as_str().to_string()),
            idempotency_key: Set(new.idempotency_key),
            payout_method_id: Set(new.payout_method_id.into_inner()),
            transaction_ids: Set(serde_json::json!(ids)),
            error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let attached = transactions::Entity::update_many()
            .col_expr(transactions::Column::PayoutId, Expr::value(model.id))
            .filter(transactions::Column::Id.is_in(ids))
            .filter(transactions::Column::PayoutId.is_null())
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let expected = u64::try_from(wanted.len()).unwrap_or(u64::MAX);
        if attached.rows_affected != expected {
            return Err(StoreError::Conflict(format!(
                "attached {} of {} transactions",
                attached.rows_affected,
                wanted.len()
            )));
        }

        txn.commit().await.map_err(db_err)?;

        debug!(
            payout_id = model.id,
            transactions = wanted.len(),
            "Payout created and transactions attached"
        );
        into_payout(model)
    }

    async fn get_payout(&self, id: PayoutId) -> StoreResult<Option<Payout>> {
        payouts::Entity::find_by_id(id.into_inner())
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(into_payout)
            .transpose()
    }

    async fn update_payout(&self, id: PayoutId, patch: PayoutPatch) -> StoreResult<Payout> {
        let existing = payouts::Entity::find_by_id(id.into_inner())
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::not_found("payout", id))?;

        let mut model = existing.into_active_model();
        if let Some(status) = patch.status {
            model.status = Set(status.as_str().to_string());
        }
        if let Some(error) = patch.error {
            model.error = Set(Some(error));
        }
        model.updated_at = Set(Utc::now().into());

        let updated = model.update(self.db.as_ref()).await.map_err(db_err)?;
        into_payout(updated)
    }

    async fn list_payouts(&self, query: &PayoutQuery) -> StoreResult<Vec<Payout>> {
        let mut select = payouts::Entity::find();

        if let Some(account) = query.payout_account_id {
            select = select.filter(payouts::Column::PayoutAccountId.eq(account.into_inner()));
        }
        if !query.statuses.is_empty() {
            select = select.filter(
                payouts::Column::Status.is_in(query.statuses.iter().map(|s| s.as_str())),
            );
        }
        if let Some(after) = query.created_after {
            select = select.filter(payouts::Column::CreatedAt.gt(after));
        }
        if let Some(before) = query.created_before {
            select = select.filter(payouts::Column::CreatedAt.lt(before));
        }

        select
            .order_by_desc(payouts::Column::Id)
            .offset(query.offset)
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(into_payout)
            .collect()
    }
}

fn into_payout(model: payouts::Model) -> StoreResult<Payout> {
    let transaction_ids: Vec<LedgerTransactionId> =
        serde_json::from_value(model.transaction_ids).map_err(corrupt)?;

    Ok(Payout {
        id: PayoutId::new(model.id),
        payout_account_id: PayoutAccountId::new(model.payout_account_id),
        amount: model.amount,
        fee: model.fee,
        currency: model.currency,
        status: model.status.parse().map_err(corrupt)?,
        idempotency_key: model.idempotency_key,
        payout_method_id: PayoutMethodId::new(model.payout_method_id),
        transaction_ids,
        error: model.error,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}
