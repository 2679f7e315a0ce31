//! Core types for the Ganges river monitoring toolkit.
//!
//! Date-interval generation, region geometry, and the record types shared
//! between the Earth Engine access layer and the batch collector.

pub mod geometry;
pub mod interval;
pub mod record;
