//! `SeaORM` Entity for payout_accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payout_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub entity: String,
    pub pgp_sub_account_id: Option<i64>,
    pub pgp_provider: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pgp_sub_accounts::Entity",
        from = "Column::PgpSubAccountId",
        to = "super::pgp_sub_accounts::Column::Id"
    )]
    PgpSubAccounts,
    #[sea_orm(has_many = "super::payout_methods::Entity")]
    PayoutMethods,
}

impl Related<super::pgp_sub_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PgpSubAccounts.def()
    }
}

impl Related<super::payout_methods::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayoutMethods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
