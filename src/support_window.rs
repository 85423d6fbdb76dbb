//! Support windows for local spectral estimates.
//!
//! For every output location the selector lists the neighboring lines whose
//! spectra a downstream stage averages. All lines of a window start at the
//! same axis-0 index, chosen so a window of `fft1d_size` samples fits inside
//! the volume, and spread along axis 1 by a per-location half-width read
//! from a side-line map.

use alloc::vec::Vec;

use crate::error::SpectraError;
use crate::scheduler::{RegionScheduler, WorkerArena};
use crate::transform::FFT1D_SIZE_KEY;
use crate::volume::{MetaValue, Region, Volume, VolumeInfo, VolumeSlab};

/// Ordered line coordinates feeding one local estimate. Entries of
/// neighboring windows overlap and their order is significant.
pub type SupportWindow<const D: usize> = Vec<[isize; D]>;

/// Pixel types accepted in a side-line map.
pub trait SideLineValue: Copy + Send + Sync {
    /// Half-width in lines, truncated toward zero.
    fn half_width(self) -> isize;
}

macro_rules! impl_side_line_unsigned {
    ($($t:ty),*) => {
        $(impl SideLineValue for $t {
            /// Saturates at `isize::MAX`.
            #[inline]
            fn half_width(self) -> isize {
                isize::try_from(self).unwrap_or(isize::MAX)
            }
        })*
    };
}

macro_rules! impl_side_line_signed {
    ($($t:ty),*) => {
        $(impl SideLineValue for $t {
            /// Saturates at the `isize` range.
            #[inline]
            fn half_width(self) -> isize {
                isize::try_from(self).unwrap_or(if self < 0 { isize::MIN } else { isize::MAX })
            }
        })*
    };
}

macro_rules! impl_side_line_float {
    ($($t:ty),*) => {
        $(impl SideLineValue for $t {
            /// Saturates at the `isize` range; NaN maps to zero.
            #[inline]
            fn half_width(self) -> isize {
                self as isize
            }
        })*
    };
}

impl_side_line_unsigned!(u8, u16, u32, u64, usize);
impl_side_line_signed!(i8, i16, i32, i64, isize);
impl_side_line_float!(f32, f64);

/// Static selector settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportWindowConfig {
    /// Transform window length along axis 0.
    pub fft1d_size: usize,
    /// Downsampling stride along axis 0.
    pub step: usize,
}

impl Default for SupportWindowConfig {
    fn default() -> Self {
        Self {
            fft1d_size: 32,
            step: 1,
        }
    }
}

/// Computes a [`SupportWindow`] for every output location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportWindowSelector<const D: usize> {
    config: SupportWindowConfig,
}

impl<const D: usize> SupportWindowSelector<D> {
    const AXES: () = assert!(D >= 2, "support windows need at least two axes");

    pub fn new(config: SupportWindowConfig) -> Result<Self, SpectraError> {
        #[allow(clippy::let_unit_value)]
        let () = Self::AXES;
        if config.fft1d_size == 0 {
            return Err(SpectraError::InvalidConfig("fft1d_size must be positive"));
        }
        if config.step == 0 {
            return Err(SpectraError::InvalidConfig("step must be positive"));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> SupportWindowConfig {
        self.config
    }

    /// Geometry of the output for a side-line map with geometry `input`:
    /// axis 0 shrinks and its spacing grows by `step`.
    pub fn output_information(&self, input: &VolumeInfo<D>) -> VolumeInfo<D> {
        let mut info = *input;
        info.region.size[0] /= self.config.step;
        info.spacing[0] *= self.config.step as f64;
        info
    }

    /// Fail when the input is too short along axis 0 to hold one window.
    pub fn check_input(&self, largest: &Region<D>) -> Result<(), SpectraError> {
        if largest.size[0] < self.config.fft1d_size {
            debug_log!(
                "support window of {} lines does not fit an axis-0 extent of {}",
                self.config.fft1d_size,
                largest.size[0]
            );
            return Err(SpectraError::InsufficientLength {
                axis: 0,
                required: self.config.fft1d_size,
                available: largest.size[0],
            });
        }
        Ok(())
    }

    /// Input index sampled for output index `out`.
    pub fn input_index(&self, largest: &Region<D>, out: &[isize; D]) -> [isize; D] {
        let mut idx = *out;
        let start = largest.index[0];
        idx[0] = start + (out[0] - start) * self.config.step as isize;
        idx
    }

    /// Window for input index `idx` with side-line half-width `half_width`.
    ///
    /// `largest` must already have passed [`check_input`](Self::check_input);
    /// a region shorter than `fft1d_size` along axis 0 yields an axis-0
    /// start below `largest.index[0]`.
    pub fn window_at(
        &self,
        largest: &Region<D>,
        idx: &[isize; D],
        half_width: isize,
    ) -> SupportWindow<D> {
        let mut window = Vec::new();
        self.window_into(largest, idx, half_width, &mut window);
        window
    }

    /// Like [`window_at`](Self::window_at) but reuses `window`'s storage.
    pub fn window_into(
        &self,
        largest: &Region<D>,
        idx: &[isize; D],
        half_width: isize,
        window: &mut SupportWindow<D>,
    ) {
        window.clear();
        let fft_size = self.config.fft1d_size as isize;
        let lo0 = largest.index[0];
        let hi0 = largest.upper(0);
        let mut start0 = idx[0] - fft_size / 2;
        if start0 < lo0 {
            start0 = lo0;
        }
        if start0 + fft_size > hi0 {
            start0 = hi0 - fft_size;
        }
        let lo1 = largest.index[1];
        let hi1 = largest.upper(1);
        let first = idx[1].saturating_sub(half_width).max(lo1);
        let last = idx[1].saturating_add(half_width).min(hi1);
        let mut line = *idx;
        line[0] = start0;
        for a1 in first..last {
            line[1] = a1;
            window.push(line);
        }
    }

    /// Fill the windows of `slab` from `side_lines`. Preconditions are
    /// checked before any pixel of the slab is written.
    pub fn generate_region<S: SideLineValue>(
        &self,
        side_lines: &Volume<S, D>,
        slab: &mut VolumeSlab<'_, SupportWindow<D>, D>,
    ) -> Result<(), SpectraError> {
        let largest = side_lines.region();
        self.check_input(&largest)?;
        let expected = self.output_information(&side_lines.info()).region;
        if !expected.contains_region(&slab.region()) {
            return Err(SpectraError::RegionOutsideVolume);
        }
        for (out, window) in slab.pixels_mut() {
            let idx = self.input_index(&largest, &out);
            let half_width = side_lines
                .get(&idx)
                .map(|v| v.half_width())
                .ok_or(SpectraError::RegionOutsideVolume)?;
            self.window_into(&largest, &idx, half_width, window);
        }
        Ok(())
    }

    /// Compute windows for the whole output in the calling thread.
    pub fn select<S: SideLineValue>(
        &self,
        side_lines: &Volume<S, D>,
    ) -> Result<Volume<SupportWindow<D>, D>, SpectraError> {
        let mut output = self.allocate_output(side_lines)?;
        let region = output.region();
        let mut slab = output.slab_mut(region)?;
        self.generate_region(side_lines, &mut slab)?;
        Ok(output)
    }

    /// Compute windows with `scheduler`, one slab per arena slot. The arena
    /// carries no state for this stage.
    pub fn select_with<S: SideLineValue>(
        &self,
        scheduler: &RegionScheduler,
        side_lines: &Volume<S, D>,
    ) -> Result<Volume<SupportWindow<D>, D>, SpectraError> {
        let mut output = self.allocate_output(side_lines)?;
        let mut arena = WorkerArena::new(scheduler.workers(), || ());
        scheduler.dispatch(&mut output, &mut arena, |_, slab| {
            self.generate_region(side_lines, slab)
        })?;
        Ok(output)
    }

    fn allocate_output<S: SideLineValue>(
        &self,
        side_lines: &Volume<S, D>,
    ) -> Result<Volume<SupportWindow<D>, D>, SpectraError> {
        self.check_input(&side_lines.region())?;
        let info = self.output_information(&side_lines.info());
        let mut output = Volume::from_info(info, Vec::new())?;
        output
            .metadata_mut()
            .insert(FFT1D_SIZE_KEY, MetaValue::Size(self.config.fft1d_size));
        Ok(output)
    }
}
