//! Application services layer.

pub mod admin;
pub mod categories;
pub mod dashboard;
pub mod error;
pub mod orders;
pub mod pagination;
pub mod payload;
pub mod products;
pub mod repos;
pub mod storage;
pub mod views;
