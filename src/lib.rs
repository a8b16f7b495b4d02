//! Point-in-time pixel sampling over satellite imagery archives.
//!
//! Given a location and a period, the [`orchestrator`] discovers candidate
//! scenes in a [`catalog`], [`select`]s one per time bucket, samples them in
//! concurrent batches through a [`sampler`], and keeps the samples whose
//! [`quality`] flags allow it.

pub mod band_values;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod orchestrator;
pub mod quality;
pub mod sampler;
pub mod select;
pub mod service;
pub mod source;
