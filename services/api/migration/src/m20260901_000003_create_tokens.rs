use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tokens::Hash)
                            .binary()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tokens::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Tokens::Expiry)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Tokens::Scope).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("tokens_user_id_fkey")
                            .from(Tokens::Table, Tokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Tokens::Table)
                    .col(Tokens::UserId)
                    .col(Tokens::Scope)
                    .name("idx_tokens_user_id_scope")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tokens::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Tokens {
    Table,
    Hash,
    UserId,
    Expiry,
    Scope,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
