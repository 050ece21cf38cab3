pub mod api;
pub mod config;
pub mod conversation;
pub mod crypto;
pub mod db;
pub mod error;
