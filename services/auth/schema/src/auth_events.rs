use sea_orm::entity::prelude::*;

/// Append-only audit record written for every authentication attempt.
/// IP and user-agent are stored as salted hashes, never raw.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// `request_code` / `verify_code` / `logout`.
    pub event_type: String,
    /// `success` / `failure` / `blocked`.
    pub outcome: String,
    pub email: Option<String>,
    pub actor_user_id: Option<Uuid>,
    pub ip_hash: Option<String>,
    pub user_agent_hash: Option<String>,
    pub risk_score: i32,
    pub meta: Option<Json>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
