pub mod db;
pub mod mail;
pub mod memory;
pub mod store;
