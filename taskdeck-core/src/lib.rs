//! Core library for Taskdeck.
//!
//! This crate holds the domain models, the picklist mapping between UI tokens
//! and backend labels, the record gateway over a [`store::RecordStore`], the
//! kanban board controller and the summary metrics. It knows nothing about
//! HTTP; the binary crate supplies a store that talks to the backend.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskdeck_core::models::*;
//! use taskdeck_core::store::InMemoryStore;
//! use taskdeck_core::{PicklistMode, Services};
//!
//! # tokio_test::block_on(async {
//! let services = Services::new(Arc::new(InMemoryStore::new()), PicklistMode::Lenient);
//! let projects = services.projects.list().await?;
//! # Ok::<(), taskdeck_core::Error>(())
//! # });
//! ```

pub mod board;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod models;
pub mod notify;
pub mod picklist;
pub mod record;
pub mod services;
pub mod store;
pub mod validation;

// Re-export commonly used types at crate root
pub use board::{BoardController, LoadState, Transition};
pub use error::{Error, Result};
pub use gateway::{BoardEntity, Entity, Gateway};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use picklist::{Picklist, PicklistMode};
pub use services::Services;
