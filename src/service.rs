//! Remote image services.
//!
//! One ArcGIS-style image server backs both the scene catalog (`query`)
//! and pixel sampling (`getSamples`, `identify`). Wire shapes are decoded
//! in [`wire`] and never leak past this module.

mod image_server;
mod wire;

pub use image_server::ImageServer;
