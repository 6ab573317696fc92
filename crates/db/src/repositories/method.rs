//! Payout method and card repository.

use async_trait::async_trait;
use payout_core::domain::{PayoutCard, PayoutMethod};
use payout_core::store::{PayoutMethodStore, StoreResult};
use payout_shared::types::{PayoutAccountId, PayoutMethodId};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use super::{corrupt, db_err, raw_ids, utc};
use crate::entities::{payout_cards, payout_methods};

/// Read-only access to payout methods and card records.
#[derive(Debug, Clone)]
pub struct PayoutMethodRepository {
    db: DatabaseConnection,
}

impl PayoutMethodRepository {
    /// Creates a new payout method repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PayoutMethodStore for PayoutMethodRepository {
    async fn list_payout_methods(
        &self,
        payout_account_id: PayoutAccountId,
    ) -> StoreResult<Vec<PayoutMethod>> {
        payout_methods::Entity::find()
            .filter(payout_methods::Column::PayoutAccountId.eq(payout_account_id.into_inner()))
            .filter(payout_methods::Column::DeletedAt.is_null())
            .order_by_asc(payout_methods::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(into_method)
            .collect()
    }

    async fn list_payout_cards(&self, ids: &[PayoutMethodId]) -> StoreResult<Vec<PayoutCard>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cards = payout_cards::Entity::find()
            .filter(payout_cards::Column::Id.is_in(raw_ids(ids)))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(cards
            .into_iter()
            .map(|m| PayoutCard {
                id: PayoutMethodId::new(m.id),
                external_card_id: m.external_card_id,
                last4: m.last4,
                brand: m.brand,
                exp_month: m.exp_month,
                exp_year: m.exp_year,
                fingerprint: m.fingerprint,
                created_at: utc(m.created_at),
            })
            .collect())
    }
}

fn into_method(model: payout_methods::Model) -> StoreResult<PayoutMethod> {
    Ok(PayoutMethod {
        id: PayoutMethodId::new(model.id),
        payout_account_id: PayoutAccountId::new(model.payout_account_id),
        method_type: model.method_type.parse().map_err(corrupt)?,
        is_default: model.is_default,
        currency: model.currency,
        country: model.country,
        created_at: utc(model.created_at),
        deleted_at: model.deleted_at.map(utc),
    })
}
