//! Domain types shared across the Moviego workspace.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; never depend on `infra/` from here.

pub mod movie;
pub mod pagination;
pub mod permission;
pub mod token;
pub mod user;
pub mod validator;
