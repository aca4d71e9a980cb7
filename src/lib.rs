//! Command-line client for Taskdeck.
//!
//! [`api::HttpRecordStore`] connects the core gateways to the remote record
//! service; [`config`] resolves where that service is and how to reach it.

pub mod api;
pub mod config;
pub mod console;
