//! Postgres repositories over the sea-orm entities.

use std::sync::Arc;

use anyhow::Context;
use brannboll_auth_schema::{allowed_emails, auth_events, otp_codes, sessions, users};
use brannboll_auth_types::role::UserRole;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use crate::domain::repository::{
    AllowlistRepository, AuditRepository, OtpRepository, SessionRepository, UserRepository,
};
use crate::domain::types::{AuthEvent, AuthUser, FailureCounts, OtpCode, Session};
use crate::error::AuthServiceError;

fn user_from_model(model: users::Model) -> Result<AuthUser, AuthServiceError> {
    let role = UserRole::from_str_value(&model.role)
        .ok_or_else(|| anyhow::anyhow!("unknown role {:?} for user {}", model.role, model.id))?;
    Ok(AuthUser {
        id: model.id,
        email: model.email,
        name: model.name,
        role,
    })
}

impl From<otp_codes::Model> for OtpCode {
    fn from(model: otp_codes::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            code_hash: model.code_hash,
            attempt_count: model.attempt_count,
            expires_at: model.expires_at,
            consumed_at: model.consumed_at,
            created_at: model.created_at,
        }
    }
}

impl From<sessions::Model> for Session {
    fn from(model: sessions::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            expires_at: model.expires_at,
            revoked_at: model.revoked_at,
            ip_hash: model.ip_hash,
            user_agent_hash: model.user_agent_hash,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone)]
pub struct DbAllowlistRepository {
    db: Arc<DatabaseConnection>,
}

impl DbAllowlistRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl AllowlistRepository for DbAllowlistRepository {
    async fn is_active(&self, email: &str) -> Result<bool, AuthServiceError> {
        let entry = allowed_emails::Entity::find()
            .filter(allowed_emails::Column::Email.eq(email))
            .filter(allowed_emails::Column::Active.eq(true))
            .one(&*self.db)
            .await
            .context("failed to query allow-list")?;
        Ok(entry.is_some())
    }
}

#[derive(Clone)]
pub struct DbUserRepository {
    db: Arc<DatabaseConnection>,
}

impl DbUserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl UserRepository for DbUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .context("failed to find user by id")?;
        model.map(user_from_model).transpose()
    }

    async fn find_or_create_member(&self, email: &str) -> Result<AuthUser, AuthServiceError> {
        if let Some(model) = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .context("failed to find user by email")?
        {
            return user_from_model(model);
        }

        let insert = users::Entity::insert(users::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_owned()),
            name: Set(None),
            role: Set(UserRole::Member.as_str().to_owned()),
            created_at: Set(Utc::now()),
        })
        .on_conflict(
            OnConflict::column(users::Column::Email)
                .do_nothing()
                .to_owned(),
        )
        .exec(&*self.db)
        .await;

        match insert {
            Ok(_) => {}
            // Concurrent first login won the race; fall through to re-find.
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(anyhow::Error::from(e).context("failed to create user").into()),
        }

        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .context("failed to re-find user after insert")?
            .ok_or_else(|| anyhow::anyhow!("user row missing after upsert for {email}"))?;
        user_from_model(model)
    }
}

#[derive(Clone)]
pub struct DbOtpRepository {
    db: Arc<DatabaseConnection>,
}

impl DbOtpRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl OtpRepository for DbOtpRepository {
    async fn issue(&self, code: OtpCode) -> Result<(), AuthServiceError> {
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                Box::pin(async move {
                    otp_codes::Entity::update_many()
                        .col_expr(otp_codes::Column::ConsumedAt, Expr::value(code.created_at))
                        .filter(otp_codes::Column::Email.eq(code.email.clone()))
                        .filter(otp_codes::Column::ConsumedAt.is_null())
                        .exec(txn)
                        .await?;

                    otp_codes::Entity::insert(otp_codes::ActiveModel {
                        id: Set(code.id),
                        email: Set(code.email),
                        code_hash: Set(code.code_hash),
                        attempt_count: Set(code.attempt_count),
                        expires_at: Set(code.expires_at),
                        consumed_at: Set(code.consumed_at),
                        created_at: Set(code.created_at),
                    })
                    .exec(txn)
                    .await?;

                    Ok(())
                })
            })
            .await
            .context("failed to issue one-time code")?;
        Ok(())
    }

    async fn find_latest_unconsumed(
        &self,
        email: &str,
    ) -> Result<Option<OtpCode>, AuthServiceError> {
        let model = otp_codes::Entity::find()
            .filter(otp_codes::Column::Email.eq(email))
            .filter(otp_codes::Column::ConsumedAt.is_null())
            .order_by_desc(otp_codes::Column::CreatedAt)
            .one(&*self.db)
            .await
            .context("failed to find one-time code")?;
        Ok(model.map(OtpCode::from))
    }

    async fn record_failed_attempt(&self, id: Uuid) -> Result<(), AuthServiceError> {
        otp_codes::Entity::update_many()
            .col_expr(
                otp_codes::Column::AttemptCount,
                Expr::col(otp_codes::Column::AttemptCount).add(1),
            )
            .filter(otp_codes::Column::Id.eq(id))
            .exec(&*self.db)
            .await
            .context("failed to record failed attempt")?;
        Ok(())
    }

    async fn consume(&self, id: Uuid) -> Result<(), AuthServiceError> {
        otp_codes::Entity::update_many()
            .col_expr(otp_codes::Column::ConsumedAt, Expr::value(Utc::now()))
            .filter(otp_codes::Column::Id.eq(id))
            .filter(otp_codes::Column::ConsumedAt.is_null())
            .exec(&*self.db)
            .await
            .context("failed to consume one-time code")?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct DbSessionRepository {
    db: Arc<DatabaseConnection>,
}

impl DbSessionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl SessionRepository for DbSessionRepository {
    async fn create(&self, session: Session) -> Result<(), AuthServiceError> {
        sessions::Entity::insert(sessions::ActiveModel {
            id: Set(session.id),
            user_id: Set(session.user_id),
            expires_at: Set(session.expires_at),
            revoked_at: Set(session.revoked_at),
            ip_hash: Set(session.ip_hash),
            user_agent_hash: Set(session.user_agent_hash),
            created_at: Set(session.created_at),
        })
        .exec(&*self.db)
        .await
        .context("failed to create session")?;
        Ok(())
    }

    async fn find_valid(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Session>, AuthServiceError> {
        let model = sessions::Entity::find_by_id(id)
            .filter(sessions::Column::UserId.eq(user_id))
            .filter(sessions::Column::RevokedAt.is_null())
            .filter(sessions::Column::ExpiresAt.gt(Utc::now()))
            .one(&*self.db)
            .await
            .context("failed to find session")?;
        Ok(model.map(Session::from))
    }

    async fn revoke(&self, id: Uuid) -> Result<(), AuthServiceError> {
        sessions::Entity::update_many()
            .col_expr(sessions::Column::RevokedAt, Expr::value(Utc::now()))
            .filter(sessions::Column::Id.eq(id))
            .filter(sessions::Column::RevokedAt.is_null())
            .exec(&*self.db)
            .await
            .context("failed to revoke session")?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct DbAuditRepository {
    db: Arc<DatabaseConnection>,
}

impl DbAuditRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl AuditRepository for DbAuditRepository {
    async fn append(&self, event: AuthEvent) -> Result<(), AuthServiceError> {
        auth_events::Entity::insert(auth_events::ActiveModel {
            id: Set(event.id),
            event_type: Set(event.event_type.as_str().to_owned()),
            outcome: Set(event.outcome.as_str().to_owned()),
            email: Set(event.email),
            actor_user_id: Set(event.actor_user_id),
            ip_hash: Set(event.ip_hash),
            user_agent_hash: Set(event.user_agent_hash),
            risk_score: Set(event.risk_score),
            meta: Set(event.meta),
            created_at: Set(event.created_at),
        })
        .exec(&*self.db)
        .await
        .context("failed to append audit event")?;
        Ok(())
    }

    async fn count_failures_since(
        &self,
        email: &str,
        ip_hash: &str,
        user_agent_hash: &str,
        since: DateTime<Utc>,
    ) -> Result<FailureCounts, AuthServiceError> {
        // Only genuine failures feed the risk score. Blocked rows are the
        // risk engine's own output; counting them would make every block
        // raise the next score.
        let recent = || {
            auth_events::Entity::find()
                .filter(auth_events::Column::Outcome.eq("failure"))
                .filter(auth_events::Column::CreatedAt.gte(since))
        };

        let (by_email, by_ip, by_user_agent) = tokio::join!(
            recent()
                .filter(auth_events::Column::Email.eq(email))
                .count(&*self.db),
            recent()
                .filter(auth_events::Column::IpHash.eq(ip_hash))
                .count(&*self.db),
            recent()
                .filter(auth_events::Column::UserAgentHash.eq(user_agent_hash))
                .count(&*self.db),
        );

        Ok(FailureCounts {
            by_email: by_email.context("failed to count failures by email")?,
            by_ip: by_ip.context("failed to count failures by ip")?,
            by_user_agent: by_user_agent.context("failed to count failures by user agent")?,
        })
    }
}
