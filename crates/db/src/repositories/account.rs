//! Payout account repository.

use async_trait::async_trait;
use payout_core::domain::{PayoutAccount, PgpSubAccount};
use payout_core::store::{PayoutAccountStore, StoreResult};
use payout_shared::types::{PayoutAccountId, PgpSubAccountId};
use sea_orm::{DatabaseConnection, EntityTrait};

use super::{corrupt, db_err, utc};
use crate::entities::{payout_accounts, pgp_sub_accounts};

/// Read-only access to payout accounts and their PSP sub-accounts.
#[derive(Debug, Clone)]
pub struct PayoutAccountRepository {
    db: DatabaseConnection,
}

impl PayoutAccountRepository {
    /// Creates a new payout account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PayoutAccountStore for PayoutAccountRepository {
    async fn get_payout_account(&self, id: PayoutAccountId) -> StoreResult<Option<PayoutAccount>> {
        payout_accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(into_account)
            .transpose()
    }

    async fn get_pgp_sub_account(&self, id: PgpSubAccountId) -> StoreResult<Option<PgpSubAccount>> {
        let model = pgp_sub_accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(|m| PgpSubAccount {
            id: PgpSubAccountId::new(m.id),
            external_account_id: m.external_account_id,
            country: m.country,
            verification_disabled_reason: m.verification_disabled_reason,
            created_at: utc(m.created_at),
        }))
    }
}

fn into_account(model: payout_accounts::Model) -> StoreResult<PayoutAccount> {
    Ok(PayoutAccount {
        id: PayoutAccountId::new(model.id),
        entity: model.entity.parse().map_err(corrupt)?,
        pgp_sub_account_id: model.pgp_sub_account_id.map(PgpSubAccountId::new),
        pgp_provider: model
            .pgp_provider
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(corrupt)?,
        created_at: utc(model.created_at),
    })
}
