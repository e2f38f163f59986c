//! swapboard - compose, validate and publish marketplace posts
//!
//! Drafts are edited step by step (basic info, specifications or pricing,
//! trade preferences, location, review), persisted between steps, and
//! submitted to the marketplace backend once complete.

pub mod api;
pub mod catalog;
pub mod config;
pub mod draft;
pub mod logging;
pub mod rest;
pub mod schema;
pub mod submission;
pub mod wizard;
