//! Inkwell blogging server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod account;
pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod notifications;
pub mod posts;
pub mod routes;
pub mod state;
