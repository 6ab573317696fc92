//! `SeaORM` Entity for payouts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payouts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub payout_account_id: i64,
    pub amount: i64,
    pub fee: i64,
    pub currency: String,
    pub status: String,
    pub idempotency_key: String,
    pub payout_method_id: i64,
    /// JSON array of reserved transaction ids, in reservation order.
    pub transaction_ids: Json,
    pub error: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::psp_payout_requests::Entity")]
    PspPayoutRequests,
    #[sea_orm(has_many = "super::topup_transfers::Entity")]
    TopupTransfers,
}

impl Related<super::psp_payout_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PspPayoutRequests.def()
    }
}

impl Related<super::topup_transfers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TopupTransfers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
