use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuthEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuthEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuthEvents::EventType).string().not_null())
                    .col(ColumnDef::new(AuthEvents::Outcome).string().not_null())
                    .col(ColumnDef::new(AuthEvents::Email).string())
                    .col(ColumnDef::new(AuthEvents::ActorUserId).uuid())
                    .col(ColumnDef::new(AuthEvents::IpHash).string())
                    .col(ColumnDef::new(AuthEvents::UserAgentHash).string())
                    .col(
                        ColumnDef::new(AuthEvents::RiskScore)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AuthEvents::Meta).json_binary())
                    .col(
                        ColumnDef::new(AuthEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // The risk engine counts recent failures by email, IP hash and UA hash.
        manager
            .create_index(
                Index::create()
                    .table(AuthEvents::Table)
                    .col(AuthEvents::Email)
                    .col(AuthEvents::CreatedAt)
                    .name("idx_auth_events_email_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AuthEvents::Table)
                    .col(AuthEvents::IpHash)
                    .col(AuthEvents::CreatedAt)
                    .name("idx_auth_events_ip_hash_created_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AuthEvents::Table)
                    .col(AuthEvents::UserAgentHash)
                    .col(AuthEvents::CreatedAt)
                    .name("idx_auth_events_user_agent_hash_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthEvents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AuthEvents {
    Table,
    Id,
    EventType,
    Outcome,
    Email,
    ActorUserId,
    IpHash,
    UserAgentHash,
    RiskScore,
    Meta,
    CreatedAt,
}
