pub use sea_orm_migration::prelude::*;

mod m20260901_000001_create_movies;
mod m20260901_000002_create_users;
mod m20260901_000003_create_tokens;
mod m20260901_000004_create_permissions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260901_000001_create_movies::Migration),
            Box::new(m20260901_000002_create_users::Migration),
            Box::new(m20260901_000003_create_tokens::Migration),
            Box::new(m20260901_000004_create_permissions::Migration),
        ]
    }
}
