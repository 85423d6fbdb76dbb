//! Line-wise forward and inverse transforms along axis 0.
//!
//! Both transforms check their preconditions once per region, fetch a plan
//! from the caller's [`PlanCache`] and then run it over every line of the
//! region. The plan is only rebuilt when the line length or direction
//! differs from the previous call on the same cache.

use core::marker::PhantomData;

use crate::error::SpectraError;
use crate::num::{Complex, Float};
use crate::plan::{Direction, PlanCache, SpectrumLayout};
use crate::scheduler::{RegionScheduler, WorkerArena};
use crate::volume::{MetaValue, Region, Volume, VolumeInfo, VolumeSlab};

/// Metadata key recording the real transform length of a spectral volume.
pub const FFT1D_SIZE_KEY: &str = "FFT1DSize";

fn check_layout<T: Float>(
    cache: &PlanCache<T>,
    layout: SpectrumLayout,
) -> Result<(), SpectraError> {
    if cache.layout() != layout {
        return Err(SpectraError::InvalidConfig(
            "plan cache layout differs from the transform layout",
        ));
    }
    Ok(())
}

/// The slab must cover `expected_len` samples along axis 0 and its lines
/// must exist in `input`.
fn check_slab<const D: usize>(
    input: &Region<D>,
    slab: &Region<D>,
    expected_len: usize,
) -> Result<(), SpectraError> {
    if slab.size[0] != expected_len || slab.index[0] != input.index[0] {
        return Err(SpectraError::MismatchedGeometry);
    }
    let mut lines = *slab;
    lines.size[0] = input.size[0];
    if !input.contains_region(&lines) {
        return Err(SpectraError::RegionOutsideVolume);
    }
    Ok(())
}

/// Real lines to spectra.
#[derive(Debug, Clone, Copy)]
pub struct ForwardTransform1d<T: Float> {
    layout: SpectrumLayout,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Float> Default for ForwardTransform1d<T> {
    fn default() -> Self {
        Self::new(SpectrumLayout::default())
    }
}

impl<T: Float> ForwardTransform1d<T> {
    pub fn new(layout: SpectrumLayout) -> Self {
        Self {
            layout,
            _marker: PhantomData,
        }
    }

    pub fn layout(&self) -> SpectrumLayout {
        self.layout
    }

    /// An empty cache matching this transform's layout.
    pub fn new_cache(&self) -> PlanCache<T> {
        PlanCache::new(self.layout)
    }

    pub fn output_information<const D: usize>(&self, input: &VolumeInfo<D>) -> VolumeInfo<D> {
        let mut info = *input;
        info.region.size[0] = self.layout.spectrum_len(input.region.size[0]);
        info
    }

    /// The input must hold at least one sample per line.
    pub fn check_input<const D: usize>(&self, input: &Region<D>) -> Result<(), SpectraError> {
        if D == 0 || input.size[0] == 0 {
            debug_log!("forward transform rejected an empty axis 0");
            return Err(SpectraError::InsufficientLength {
                axis: 0,
                required: 1,
                available: 0,
            });
        }
        Ok(())
    }

    /// Transform the input lines under `slab` into `slab`.
    pub fn generate_region<const D: usize>(
        &self,
        cache: &mut PlanCache<T>,
        input: &Volume<T, D>,
        slab: &mut VolumeSlab<'_, Complex<T>, D>,
    ) -> Result<(), SpectraError> {
        let largest = input.region();
        self.check_input(&largest)?;
        check_layout(cache, self.layout)?;
        let n = largest.size[0];
        check_slab(&largest, &slab.region(), self.layout.spectrum_len(n))?;
        let plan = cache.get_or_build(n, Direction::Forward)?;
        for (idx, out) in slab.lines_mut() {
            let line = input.line_at(&idx).ok_or(SpectraError::RegionOutsideVolume)?;
            out.copy_from_slice(plan.forward_line(line)?);
        }
        Ok(())
    }

    fn allocate_output<const D: usize>(
        &self,
        input: &Volume<T, D>,
    ) -> Result<Volume<Complex<T>, D>, SpectraError> {
        self.check_input(&input.region())?;
        let mut output = Volume::from_info(self.output_information(&input.info()), Complex::zero())?;
        output
            .metadata_mut()
            .insert(FFT1D_SIZE_KEY, MetaValue::Size(input.region().size[0]));
        Ok(output)
    }

    /// Transform every line of `input` on the calling thread.
    pub fn transform<const D: usize>(
        &self,
        cache: &mut PlanCache<T>,
        input: &Volume<T, D>,
    ) -> Result<Volume<Complex<T>, D>, SpectraError> {
        check_layout(cache, self.layout)?;
        let mut output = self.allocate_output(input)?;
        let region = output.region();
        let mut slab = output.slab_mut(region)?;
        self.generate_region(cache, input, &mut slab)?;
        Ok(output)
    }

    /// Transform every line of `input`, one slab per worker. Each slab uses
    /// the arena slot it was dispatched with.
    pub fn transform_parallel<const D: usize>(
        &self,
        scheduler: &RegionScheduler,
        arena: &mut WorkerArena<PlanCache<T>>,
        input: &Volume<T, D>,
    ) -> Result<Volume<Complex<T>, D>, SpectraError> {
        let mut output = self.allocate_output(input)?;
        scheduler.dispatch(&mut output, arena, |cache, slab| {
            self.generate_region(cache, input, slab)
        })?;
        Ok(output)
    }
}

/// Spectra back to real lines.
#[derive(Debug, Clone, Copy)]
pub struct InverseTransform1d<T: Float> {
    layout: SpectrumLayout,
    output_len: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Float> Default for InverseTransform1d<T> {
    fn default() -> Self {
        Self::new(SpectrumLayout::default())
    }
}

impl<T: Float> InverseTransform1d<T> {
    pub fn new(layout: SpectrumLayout) -> Self {
        Self {
            layout,
            output_len: None,
            _marker: PhantomData,
        }
    }

    /// Fix the real line length instead of deriving it from the spectrum
    /// length. Needed to recover odd-length lines from a half spectrum.
    pub fn with_output_len(mut self, len: usize) -> Result<Self, SpectraError> {
        if len == 0 {
            return Err(SpectraError::InvalidConfig("output length must be positive"));
        }
        self.output_len = Some(len);
        Ok(self)
    }

    pub fn layout(&self) -> SpectrumLayout {
        self.layout
    }

    pub fn output_len(&self) -> Option<usize> {
        self.output_len
    }

    pub fn new_cache(&self) -> PlanCache<T> {
        PlanCache::new(self.layout)
    }

    /// Real line length produced from `bins` spectrum bins.
    pub fn real_len(&self, bins: usize) -> usize {
        self.output_len
            .unwrap_or_else(|| self.layout.default_real_len(bins))
    }

    pub fn output_information<const D: usize>(&self, input: &VolumeInfo<D>) -> VolumeInfo<D> {
        let mut info = *input;
        info.region.size[0] = self.real_len(input.region.size[0]);
        info
    }

    /// The input must hold every bin the real line length needs.
    pub fn check_input<const D: usize>(&self, input: &Region<D>) -> Result<(), SpectraError> {
        let bins = if D == 0 { 0 } else { input.size[0] };
        let n = self.real_len(bins);
        let required = match (n, self.layout) {
            (0, SpectrumLayout::HalfMatrix) => 2,
            (0, SpectrumLayout::FullMatrix) => 1,
            (n, layout) => layout.spectrum_len(n),
        };
        if bins < required {
            debug_log!(
                "inverse transform needs {} bins along axis 0, got {}",
                required,
                bins
            );
            return Err(SpectraError::InsufficientLength {
                axis: 0,
                required,
                available: bins,
            });
        }
        Ok(())
    }

    pub fn generate_region<const D: usize>(
        &self,
        cache: &mut PlanCache<T>,
        input: &Volume<Complex<T>, D>,
        slab: &mut VolumeSlab<'_, T, D>,
    ) -> Result<(), SpectraError> {
        let largest = input.region();
        self.check_input(&largest)?;
        check_layout(cache, self.layout)?;
        let n = self.real_len(largest.size[0]);
        check_slab(&largest, &slab.region(), n)?;
        let plan = cache.get_or_build(n, Direction::Inverse)?;
        for (idx, out) in slab.lines_mut() {
            let line = input.line_at(&idx).ok_or(SpectraError::RegionOutsideVolume)?;
            out.copy_from_slice(plan.inverse_line(line)?);
        }
        Ok(())
    }

    fn allocate_output<const D: usize>(
        &self,
        input: &Volume<Complex<T>, D>,
    ) -> Result<Volume<T, D>, SpectraError> {
        self.check_input(&input.region())?;
        let info = self.output_information(&input.info());
        let n = info.region.size[0];
        let mut output = Volume::from_info(info, T::zero())?;
        output
            .metadata_mut()
            .insert(FFT1D_SIZE_KEY, MetaValue::Size(n));
        Ok(output)
    }

    pub fn transform<const D: usize>(
        &self,
        cache: &mut PlanCache<T>,
        input: &Volume<Complex<T>, D>,
    ) -> Result<Volume<T, D>, SpectraError> {
        check_layout(cache, self.layout)?;
        let mut output = self.allocate_output(input)?;
        let region = output.region();
        let mut slab = output.slab_mut(region)?;
        self.generate_region(cache, input, &mut slab)?;
        Ok(output)
    }

    pub fn transform_parallel<const D: usize>(
        &self,
        scheduler: &RegionScheduler,
        arena: &mut WorkerArena<PlanCache<T>>,
        input: &Volume<Complex<T>, D>,
    ) -> Result<Volume<T, D>, SpectraError> {
        let mut output = self.allocate_output(input)?;
        scheduler.dispatch(&mut output, arena, |cache, slab| {
            self.generate_region(cache, input, slab)
        })?;
        Ok(output)
    }
}
