pub mod admin;
pub mod auth;
pub mod editor;
pub mod public;
