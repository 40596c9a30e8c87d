#![deny(clippy::correctness)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::style,
    clippy::pedantic,
    clippy::nursery,
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![doc = include_str!("../README.md")]

mod error;
pub mod grid;
pub mod noise;
pub mod params;
pub mod shapes;
mod synthesizer;

pub use error::{Result, SynthError};
pub use noise::NoiseSpec;
pub use params::{ParamValue, Params, Precedence};
pub use shapes::ShapeFn;
pub use synthesizer::{LabeledSeries, ToySeries};

/// The version of the crate.
pub const VERSION: &str = "0.1.0";
