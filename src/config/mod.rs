//! # Configuration Module
//!
//! Gateway connection settings and the per-operation settings bundles.

pub mod config;
pub mod settings;

pub use config::GatewayConfig;
pub use settings::{
    BackgroundSpec, EnhancementSettings, ExportSettings, OutputFormat, ResolutionTier,
};
