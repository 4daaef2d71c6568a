use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only record of a privileged action.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub actor_id: String,
    /// `user`, `api_key` or `internal`.
    pub actor_type: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// `success` or `failure`.
    pub outcome: String,
    pub correlation_id: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub detail: Option<Json>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
