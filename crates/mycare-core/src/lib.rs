//! MyCare Core - Domain logic for the share-access client
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `ShareInfo`, `ShareSession`, validated newtypes
//! - **Use cases** - `ShareAccessFlow`, the email → OTP → files wizard
//! - **Port definitions** - Traits for adapters: `IShareLinkApi`, `IUrlOpener`
//! - **Configuration** - YAML-backed client settings
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
