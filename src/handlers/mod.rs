//! HTTP handlers
//!
//! Thin adapters: extract, call one service, serialize.

pub mod admin;
pub mod events;
pub mod health;
pub mod stream;
pub mod users;
