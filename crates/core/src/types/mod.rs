//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for the storefront domain.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod id;
pub mod money;
pub mod order;
pub mod status;

pub use address::{Address, AddressField};
pub use cart::CartLine;
pub use catalog::{Category, Customer, CustomerDraft, Page, PaymentMethod, Product};
pub use id::*;
pub use money::Money;
pub use order::Order;
pub use status::OrderStatus;
