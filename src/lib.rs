//! RuSweepVis: measurement sweep post-processing and auto-plotting
//!
//! A Rust library for working with multi-dimensional measurement sweep
//! datasets from physics experiments. RuSweepVis loads runs from NetCDF
//! run files, relabels and rescales axes and data variables through a
//! small persisted parameter registry, applies user-selected transforms,
//! and auto-selects a plotting layout from the dimensionality and count
//! of the loaded datasets.
//!
//! ## Key Features
//!
//! - **Auto-Layout Plotting**: line plots, pseudocolor meshes or subplot
//!   grids chosen from the shape of the loaded data
//! - **Parameter Registry**: persisted verbose names, units and linear
//!   rescales applied uniformly across runs
//! - **Processing Functions**: transpose, normalize, selection, axis
//!   adjustments, offsets and correlation products
//! - **Subset Protocol**: carve new collections out of a loaded one by
//!   position, range, position list or variable name
//! - **NetCDF Run Files**: read and write labeled sweep data with full
//!   attribute round-trips
//!
//! ## Module Organization
//!
//! The library is organized into logical modules:
//!
//! - [`dataset`]: labeled dataset model (coordinates, variables, attributes)
//! - [`parameters`]: persisted parameter registry for labels and rescaling
//! - [`output`]: dataset assembly, reformatting and subsetting
//! - [`layout`]: the auto-layout decision engine and plan execution
//! - [`processing`]: collection transforms and the step pipeline
//! - [`render`]: abstract plotting backend interface
//! - [`run_io`]: NetCDF run-file loading and saving
//! - [`config`]: persisted plot configuration
//! - [`store`]: flat JSON backing stores
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ru_sweep_vis::prelude::*;
//! use std::path::Path;
//!
//! let store_dir = Path::new("./stores");
//! let mut registry = ParameterRegistry::open(store_dir).unwrap();
//! let config = PlotConfig::load(store_dir).unwrap();
//!
//! // Load two runs, keep one variable of each, relabel and rescale
//! let loader = NetCdfRunLoader::new("./data");
//! let mut output = SweepOutput::assemble(
//!     &loader,
//!     vec![DataInput::Run(12), DataInput::Run(14)],
//!     Some(KeyFilter::One("conductance".to_string())),
//! )
//! .unwrap();
//! output.reformat(&mut registry).unwrap();
//!
//! // Decide the layout and draw it
//! let mut renderer = TextRenderer::new();
//! let plots = autoplot(&output, &mut registry, &config, &mut renderer).unwrap();
//! println!("{} figure(s)", plots.figures.len());
//! ```

// Core modules
pub mod config;
pub mod dataset;
pub mod errors;
pub mod layout;
pub mod output;
pub mod parallel;
pub mod parameters;
pub mod processing;
pub mod render;
pub mod run_io;
pub mod store;

// CLI surface, shared with the binary
pub mod cli;

// Direct re-exports for the public API
pub use config::*;
pub use dataset::*;
pub use errors::*;
pub use layout::*;
pub use output::*;
pub use parallel::*;
pub use parameters::*;
pub use processing::*;
pub use render::*;
pub use run_io::*;
pub use store::*;

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::PlotConfig;
    pub use crate::dataset::{AttrMap, Coordinate, DataVariable, Dataset};
    pub use crate::errors::{Result, SweepVisError};
    pub use crate::layout::{autoplot, plan_layout, GridShape, LayoutPlan, PlotKind};
    pub use crate::output::{DataInput, KeyFilter, SubsetIndex, SweepOutput};
    pub use crate::parallel::ParallelConfig;
    pub use crate::parameters::{Parameter, ParameterRegistry, ParameterSpec};
    pub use crate::processing::{Pipeline, SelectSpec};
    pub use crate::render::{Renderer, TextRenderer};
    pub use crate::run_io::{NetCdfRunLoader, NetCdfRunWriter, RunLoader};
}
