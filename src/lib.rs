//! # Prices Predictor - House-Price Data Preparation
//!
//! Turns a compressed archive of raw house-sale records into train/test
//! fragments ready for a regression model. A run ingests the archive, handles
//! missing values, engineers features and splits the rows, with every stage
//! driven by an explicit strategy descriptor.
//!
//! ## Quick Start
//!
//! ```no_run
//! use prices_predictor::dataset::ColumnSelector;
//! use prices_predictor::features::FeaturePolicy;
//! use prices_predictor::missing::MissingValuePolicy;
//! use prices_predictor::pipeline::{Pipeline, PipelineParams, TracingObserver};
//! use prices_predictor::split::SplitPolicy;
//! use std::path::Path;
//!
//! let params = PipelineParams {
//!     missing_policy: MissingValuePolicy::default(),
//!     feature_policy: FeaturePolicy::LogTransform,
//!     feature_columns: ColumnSelector::new(["Gr Liv Area", "SalePrice"]),
//!     target_column: "SalePrice".to_owned(),
//!     split_policy: SplitPolicy::default(),
//! };
//!
//! let output = Pipeline::default().run(Path::new("data/archive.zip"), &params, &mut TracingObserver)?;
//! println!("{} training rows", output.split.x_train.height());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`ingest`]: archive extraction and data file discovery
//! - [`missing`]: missing-value policies (drop or fill)
//! - [`features`]: log transform, scaling and one-hot encoding
//! - [`split`]: seeded train/test partition
//! - [`pipeline`]: the orchestrating state machine and its reports
//! - [`config`]: JSON configuration naming strategies and parameters
//! - [`training`]: linear regression on a finished split
//! - [`analysis`]: per-column dataset profile
//! - [`error`]: stage error taxonomy
//!
//! ## Data Model
//!
//! Datasets are Polars `DataFrame`s. Every stage takes a frame by reference
//! and returns a new one, so the caller's data is never modified.

#![warn(clippy::all, rust_2018_idioms)]

pub mod analysis;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod ingest;
pub mod logging;
pub mod missing;
pub mod pipeline;
pub mod split;
pub mod training;
