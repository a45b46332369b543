//! Statline: a self-hosted player statistics API.
//!
//! Rating reports are served as JSON or a compact binary encoding, with a
//! per-format TTL cache in front of the computation and an ordered
//! serialization fallback chain behind the codecs.
//!
//! Layering, outermost first:
//!
//! - [`infra`]: HTTP surface, filesystem persistence, telemetry
//! - [`application`]: dataset orchestration and rating computation
//! - [`respond`]: fallback-coordinated response production
//! - [`cache`]: format-aware TTL snapshot cache
//! - [`wire`]: messages, conversion, codecs, negotiation
//! - [`domain`]: the entities everything above agrees on

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod respond;
pub mod wire;
