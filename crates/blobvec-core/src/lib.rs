#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![cfg_attr(feature = "nightly-simd", feature(portable_simd))]

pub mod config;
pub mod distance;
pub mod error;

pub use config::{HnswConfig, IvfFlatConfig};
pub use error::{Error, Result};
