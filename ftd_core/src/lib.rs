//! Idempotent configuration of Cisco FTD devices through the FDM REST API.
//!
//! Tasks in a YAML file run [`modules`] against one authenticated [`connection::Connection`].
//! Writes are skipped when the device already holds an equal object, as decided by
//! [`compare::requires_update`].
pub mod auth;
pub mod compare;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod logger;
pub mod model;
pub mod modules;
pub mod pageable;
pub mod resource;
pub mod retry;
pub mod task;

#[macro_use]
extern crate log;
