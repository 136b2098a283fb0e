use sea_orm::entity::prelude::*;

/// Account record. `email` is unique case-insensitively (index on `lower(email)`).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub created_at: DateTimeUtc,
    pub name: String,
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub activated: bool,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tokens::Entity")]
    Tokens,
    #[sea_orm(has_many = "super::users_permissions::Entity")]
    UsersPermissions,
}

impl Related<super::tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tokens.def()
    }
}

impl Related<super::permissions::Entity> for Entity {
    fn to() -> RelationDef {
        super::users_permissions::Relation::Permissions.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::users_permissions::Relation::Users.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
