//! sea-orm entities for the movie API tables.

pub mod movies;
pub mod permissions;
pub mod tokens;
pub mod users;
pub mod users_permissions;
