//! Top-up transfer repository.

use async_trait::async_trait;
use chrono::Utc;
use payout_core::domain::{NewTopUpTransfer, TopUpTransfer};
use payout_core::store::{StoreError, StoreResult, TopUpTransferStore};
use payout_shared::types::{PayoutId, TopUpTransferId};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};

use super::{db_err, utc};
use crate::entities::topup_transfers;

/// Platform-to-sub-account transfers that funded payouts.
#[derive(Debug, Clone)]
pub struct TopUpTransferRepository {
    db: DatabaseConnection,
}

impl TopUpTransferRepository {
    /// Creates a new top-up transfer repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TopUpTransferStore for TopUpTransferRepository {
    async fn create_topup_transfer(&self, transfer: NewTopUpTransfer) -> StoreResult<TopUpTransfer> {
        let now = Utc::now().into();
        let model = topup_transfers::ActiveModel {
            payout_id: Set(transfer.payout_id.into_inner()),
            amount: Set(transfer.amount),
            currency: Set(transfer.currency),
            source_account_id: Set(transfer.source_account_id),
            destination_account_id: Set(transfer.destination_account_id),
            idempotency_key: Set(transfer.idempotency_key),
            external_transfer_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(into_transfer(model))
    }

    async fn mark_topup_transfer_submitted(
        &self,
        id: TopUpTransferId,
        external_transfer_id: &str,
    ) -> StoreResult<TopUpTransfer> {
        let existing = topup_transfers::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::not_found("topup_transfer", id))?;

        let mut model = existing.into_active_model();
        model.external_transfer_id = Set(Some(external_transfer_id.to_string()));
        model.updated_at = Set(Utc::now().into());

        let updated = model.update(&self.db).await.map_err(db_err)?;
        Ok(into_transfer(updated))
    }
}

fn into_transfer(model: topup_transfers::Model) -> TopUpTransfer {
    TopUpTransfer {
        id: TopUpTransferId::new(model.id),
        payout_id: PayoutId::new(model.payout_id),
        amount: model.amount,
        currency: model.currency,
        source_account_id: model.source_account_id,
        destination_account_id: model.destination_account_id,
        idempotency_key: model.idempotency_key,
        external_transfer_id: model.external_transfer_id,
        created_at: utc(model.created_at),
    }
}
