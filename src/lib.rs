pub mod api_connection;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod editor;
pub mod layout;
pub mod persistence;
pub mod schedule;
pub mod session;
