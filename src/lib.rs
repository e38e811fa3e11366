//! Storefront backend: catalogue, orders and admin sessions behind a
//! read-through response cache with write-path invalidation.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
