//! # spectra1d - localized 1-D spectra over N-dimensional sample volumes
//!
//! Computes one-dimensional real↔complex spectra along axis 0 (the depth
//! axis) of every line of a volume, reusing one cached transform plan per
//! worker, and selects for each output location the neighboring lines that
//! feed a local spectral estimate.
//!
//! ## Building blocks
//!
//! - [`plan::PlanCache`]: lazily builds and reuses a [`plan::LinePlan`]
//!   (transform tables plus input/output buffers) keyed by transform length
//!   and direction.
//! - [`transform::ForwardTransform1d`] / [`transform::InverseTransform1d`]:
//!   run a plan over every line in a region, in full-matrix or
//!   conjugate-symmetric half-matrix layout.
//! - [`support_window::SupportWindowSelector`]: per output coordinate, the
//!   ordered, boundary-clipped list of line coordinates to average over.
//! - [`gain::TimeGainCompensation`]: piecewise-linear depth gain.
//! - [`scheduler::RegionScheduler`]: splits an output volume into slabs and
//!   runs one invocation per slab, each with its own worker context.
//!
//! ## Cargo Features
//!
//! - `std` (default): `std::error::Error`, environment configuration and
//!   CPU detection
//! - `parallel`: dispatch slabs across Rayon worker threads
//! - `verbose-logging`: emit plan and scheduling diagnostics through `log`
//!
//! ## Example
//!
//! ```
//! use spectra1d::plan::SpectrumLayout;
//! use spectra1d::transform::{ForwardTransform1d, InverseTransform1d};
//! use spectra1d::volume::{Region, Volume};
//!
//! let region = Region::from_size([16, 3]);
//! let samples: Vec<f64> = (0..48).map(|i| (i as f64 * 0.3).sin()).collect();
//! let input = Volume::from_vec(region, samples.clone()).unwrap();
//!
//! let forward = ForwardTransform1d::<f64>::new(SpectrumLayout::HalfMatrix);
//! let mut cache = forward.new_cache();
//! let spectra = forward.transform(&mut cache, &input).unwrap();
//! assert_eq!(spectra.region().size, [9, 3]);
//!
//! let inverse = InverseTransform1d::<f64>::new(SpectrumLayout::HalfMatrix);
//! let restored = inverse.transform(&mut cache, &spectra).unwrap();
//! for (a, b) in restored.as_slice().iter().zip(samples.iter()) {
//!     assert!((a - b).abs() < 1e-9);
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

/// Debug-level diagnostics, compiled out without `verbose-logging`.
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            log::debug!($($arg)*);
        }
    };
}

/// Trace-level diagnostics, compiled out without `verbose-logging`.
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            log::trace!($($arg)*);
        }
    };
}

pub mod error;
pub mod fft;
pub mod gain;
pub mod num;
pub mod plan;
pub mod rfft;
pub mod scheduler;
pub mod support_window;
pub mod transform;
pub mod volume;

pub use error::{ErrorKind, SpectraError};
pub use gain::TimeGainCompensation;
pub use num::{Complex, Complex32, Complex64, Float};
pub use plan::{Direction, LinePlan, PlanCache, SpectrumLayout};
pub use scheduler::{RegionScheduler, WorkerArena};
pub use support_window::{SideLineValue, SupportWindow, SupportWindowConfig, SupportWindowSelector};
pub use transform::{ForwardTransform1d, InverseTransform1d, FFT1D_SIZE_KEY};
pub use volume::{MetaValue, Region, Volume, VolumeInfo, VolumeSlab};
