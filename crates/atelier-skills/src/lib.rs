//! # atelier-skills
//!
//! Skill schema, permission model, loader, registry, and ranker.
//!
//! Skills are JSON definitions discovered from three source tiers:
//! compiled-in core definitions, an optional on-disk core override used
//! during development, and a user-managed community directory. Tiers merge
//! by skill id with `embedded < disk < community` precedence.
//!
//! ## Module Overview
//!
//! - [`types`] — skill schema and executor descriptors
//! - [`permissions`] — base vs. elevated capability classification
//! - [`loader`] — tier traversal, validation, atomic snapshot swap
//! - [`watch`] — debounced hot reload of the on-disk tiers
//! - [`registry`] — loader + ranker façade with fuzzy search
//! - [`ranker`] — category / match / frecency scoring
//! - [`embedded`] — the shipped core skill set
//! - [`stores`] — traits for the usage and trust persistence collaborators
//!
//! ## Crate Position
//!
//! Standalone (no atelier crate dependencies).
//! Depended on by: atelier-drivers, atelier-executor, atelier-storage,
//! atelier.

#![deny(unsafe_code)]

pub mod constants;
pub mod embedded;
pub mod errors;
pub mod loader;
pub mod permissions;
pub mod ranker;
pub mod registry;
pub mod stores;
pub mod types;
pub mod watch;
