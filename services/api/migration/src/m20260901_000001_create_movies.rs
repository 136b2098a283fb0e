use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Movies::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Movies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Movies::Title).text().not_null())
                    .col(
                        ColumnDef::new(Movies::Year)
                            .integer()
                            .not_null()
                            .check(Expr::col(Movies::Year).gte(1888)),
                    )
                    .col(
                        ColumnDef::new(Movies::Runtime)
                            .integer()
                            .not_null()
                            .check(Expr::col(Movies::Runtime).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Movies::Genres)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Movies::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS movies_title_idx ON movies USING GIN (to_tsvector('simple', title))",
        )
        .await?;
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS movies_genres_idx ON movies USING GIN (genres)",
        )
        .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Movies::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Movies {
    Table,
    Id,
    CreatedAt,
    Title,
    Year,
    Runtime,
    Genres,
    Version,
}
