use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const SEEDED: &[&str] = &["movies:read", "movies:write"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Permissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Permissions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Permissions::Code)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UsersPermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsersPermissions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsersPermissions::PermissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(UsersPermissions::UserId)
                            .col(UsersPermissions::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("users_permissions_user_id_fkey")
                            .from(UsersPermissions::Table, UsersPermissions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("users_permissions_permission_id_fkey")
                            .from(UsersPermissions::Table, UsersPermissions::PermissionId)
                            .to(Permissions::Table, Permissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        let mut seed = Query::insert();
        seed.into_table(Permissions::Table)
            .columns([Permissions::Code])
            .on_conflict(OnConflict::column(Permissions::Code).do_nothing().to_owned());
        for code in SEEDED {
            seed.values_panic([(*code).into()]);
        }
        manager.exec_stmt(seed).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsersPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Permissions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Permissions {
    Table,
    Id,
    Code,
}

#[derive(Iden)]
enum UsersPermissions {
    Table,
    UserId,
    PermissionId,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
