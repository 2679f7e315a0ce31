//! Earth Engine access layer.
//!
//! The external imagery service is reached through two typed seams,
//! [`catalog::ImageryCatalog`] and [`catalog::SpatialReducer`], so everything
//! above this crate's REST adapter is testable without network access. The
//! production adapter, [`client::GeeClient`], holds an explicit authenticated
//! session created by a fallible `connect()` - there is no ambient global
//! service state.

pub mod catalog;
pub mod climate;
pub mod client;
pub mod config;
pub mod error;
pub mod expr;
pub mod imagery;
pub mod indices;

pub use catalog::{ImageSearch, ImageryCatalog, RenderedImagery, SpatialReducer};
pub use client::GeeClient;
pub use config::GeeConfig;
pub use error::{GeeError, Result};
