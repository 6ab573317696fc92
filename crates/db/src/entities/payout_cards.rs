//! `SeaORM` Entity for payout_cards table.
//!
//! Shares its primary key with the owning payout method.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payout_cards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub external_card_id: String,
    pub last4: String,
    pub brand: String,
    pub exp_month: i32,
    pub exp_year: i32,
    pub fingerprint: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payout_methods::Entity",
        from = "Column::Id",
        to = "super::payout_methods::Column::Id"
    )]
    PayoutMethods,
}

impl Related<super::payout_methods::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayoutMethods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
