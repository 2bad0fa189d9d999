//! Pulse Feed - a trending headline client
//!
//! This crate fetches trending headlines and a local weather snapshot from the
//! Pulse backend and renders them as a filterable, theme-aware card feed.

pub mod api;
pub mod card;
pub mod config;
pub mod error;
pub mod feed;
pub mod notifications;
pub mod prefs;
pub mod routes;
pub mod weather;
