//! `SeaORM` Entity for payout_methods table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payout_methods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub payout_account_id: i64,
    #[sea_orm(column_name = "type")]
    pub method_type: String,
    pub is_default: bool,
    pub currency: String,
    pub country: String,
    pub created_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payout_accounts::Entity",
        from = "Column::PayoutAccountId",
        to = "super::payout_accounts::Column::Id"
    )]
    PayoutAccounts,
    #[sea_orm(has_one = "super::payout_cards::Entity")]
    PayoutCards,
}

impl Related<super::payout_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayoutAccounts.def()
    }
}

impl Related<super::payout_cards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayoutCards.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
