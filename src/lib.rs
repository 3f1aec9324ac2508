//! Vegetation masks from Sentinel-2 scenes.
//!
//! Each tile's red, near-infrared and blue bands (plus the optional QA60
//! band) are read from a directory, clouds are masked, NDVI is computed and
//! thresholded, and the resulting mask is written as GeoTIFF, GeoJSON and
//! ESRI Shapefile.

pub mod batch;
pub mod config;
pub mod export;
pub mod model;
pub mod preprocessing;
pub mod readers;
pub mod sat_bands;
pub mod tile;
