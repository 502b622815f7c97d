//! Shopfront Core - Shared domain types.
//!
//! This crate provides the types shared by every Shopfront component:
//! - `storefront` - Cart, pricing, catalog cache and checkout services
//! - `cli` - Command-line client over the same services
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no persistence. Products are read-only snapshots of what the
//! remote backend returned; carts and orders reference them by id.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, money, products, cart lines, addresses and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
