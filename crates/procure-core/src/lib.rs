//! Core types, collaborator traits and the lifecycle engine for procurement
//! solicitations.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::SolicitationStore`]; callers drive the
//! [`engine::LifecycleEngine`] with a plain [`identity::Actor`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod audit;
pub mod catalog;
pub mod command;
pub mod diff;
pub mod engine;
pub mod environment;
pub mod error;
pub mod identity;
pub mod solicitation;
pub mod status;
pub mod store;

pub use engine::LifecycleEngine;
pub use error::{Error, ErrorKind, Result};
