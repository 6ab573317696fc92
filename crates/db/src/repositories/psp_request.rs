//! PSP payout request audit repository.

use async_trait::async_trait;
use chrono::Utc;
use payout_core::domain::{
    NewPspPayoutRequest, PayoutStatus, PspPayoutRequest, PspPayoutRequestPatch,
};
use payout_core::store::{PspPayoutRequestStore, StoreError, StoreResult};
use payout_shared::types::{PayoutId, PspPayoutRequestId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

use super::{corrupt, db_err, raw_ids, utc};
use crate::entities::psp_payout_requests;

/// Audit rows for provider payout submissions.
#[derive(Debug, Clone)]
pub struct PspPayoutRequestRepository {
    db: DatabaseConnection,
}

impl PspPayoutRequestRepository {
    /// Creates a new PSP payout request repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PspPayoutRequestStore for PspPayoutRequestRepository {
    async fn create_psp_payout_request(
        &self,
        request: NewPspPayoutRequest,
    ) -> StoreResult<PspPayoutRequest> {
        let now = Utc::now().into();
        let model = psp_payout_requests::ActiveModel {
            payout_id: Set(request.payout_id.into_inner()),
            idempotency_key: Set(request.idempotency_key),
            psp_payout_id: Set(None),
            status: Set(PayoutStatus::New.as_str().to_string()),
            request: Set(request.request),
            response: Set(None),
            received_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        into_request(model)
    }

    async fn update_psp_payout_request(
        &self,
        id: PspPayoutRequestId,
        patch: PspPayoutRequestPatch,
    ) -> StoreResult<PspPayoutRequest> {
        let existing = psp_payout_requests::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::not_found("psp_payout_request", id))?;

        let now = Utc::now().into();
        let mut model = existing.into_active_model();
        model.status = Set(patch.status.as_str().to_string());
        if let Some(psp_payout_id) = patch.psp_payout_id {
            model.psp_payout_id = Set(Some(psp_payout_id));
        }
        model.response = Set(patch.response);
        model.received_at = Set(Some(now));
        model.updated_at = Set(now);

        let updated = model.update(&self.db).await.map_err(db_err)?;
        into_request(updated)
    }

    async fn list_psp_payout_requests(
        &self,
        payout_ids: &[PayoutId],
    ) -> StoreResult<Vec<PspPayoutRequest>> {
        if payout_ids.is_empty() {
            return Ok(Vec::new());
        }

        psp_payout_requests::Entity::find()
            .filter(psp_payout_requests::Column::PayoutId.is_in(raw_ids(payout_ids)))
            .order_by_desc(psp_payout_requests::Column::PayoutId)
            .order_by_desc(psp_payout_requests::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(into_request)
            .collect()
    }
}

fn into_request(model: psp_payout_requests::Model) -> StoreResult<PspPayoutRequest> {
    Ok(PspPayoutRequest {
        id: PspPayoutRequestId::new(model.id),
        payout_id: PayoutId::new(model.payout_id),
        idempotency_key: model.idempotency_key,
        psp_payout_id: model.psp_payout_id,
        status: model.status.parse().map_err(corrupt)?,
        request: model.request,
        response: model.response,
        received_at: model.received_at.map(utc),
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}
