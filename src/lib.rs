//! Order orchestration service.
//!
//! Durable orders in a relational store, a read-through cache in front of
//! it, lifecycle events appended to a keyed log, and a live change feed
//! fanned out to any number of watchers.

pub mod api;
pub mod cache;
pub mod change_feed;
pub mod config;
pub mod domain;
pub mod health;
pub mod messaging;
pub mod metrics;
pub mod orchestrator;
pub mod persistence;
pub mod utils;
