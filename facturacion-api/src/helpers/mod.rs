pub mod auth;
pub mod database;
pub mod export;
pub mod validation;
