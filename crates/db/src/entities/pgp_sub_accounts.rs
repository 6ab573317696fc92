//! `SeaORM` Entity for pgp_sub_accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "pgp_sub_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub external_account_id: String,
    pub country: String,
    pub verification_disabled_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
