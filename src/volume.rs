//! N-dimensional sample volumes stored with axis 0 varying fastest.
//!
//! Every line along axis 0 is a contiguous slice of the backing buffer, and
//! a block of the volume that spans the full extent of all axes but the last
//! is contiguous too. [`Volume::slabs_mut`] relies on the latter to hand out
//! disjoint mutable views to concurrent workers.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::error::SpectraError;

/// A rectangular block of indices: a start index and a size per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region<const D: usize> {
    pub index: [isize; D],
    pub size: [usize; D],
}

impl<const D: usize> Region<D> {
    pub fn new(index: [isize; D], size: [usize; D]) -> Self {
        Self { index, size }
    }

    /// A region starting at the origin index.
    pub fn from_size(size: [usize; D]) -> Self {
        Self {
            index: [0; D],
            size,
        }
    }

    pub fn num_pixels(&self) -> usize {
        self.size.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.num_pixels() == 0
    }

    /// One past the last valid index along `axis`.
    pub fn upper(&self, axis: usize) -> isize {
        self.index[axis] + self.size[axis] as isize
    }

    pub fn contains(&self, idx: &[isize; D]) -> bool {
        (0..D).all(|axis| idx[axis] >= self.index[axis] && idx[axis] < self.upper(axis))
    }

    pub fn contains_region(&self, other: &Region<D>) -> bool {
        if other.is_empty() {
            return true;
        }
        (0..D).all(|axis| {
            other.index[axis] >= self.index[axis] && other.upper(axis) <= self.upper(axis)
        })
    }

    /// Linear offset of `idx` inside the region, axis 0 fastest.
    pub fn offset_of(&self, idx: &[isize; D]) -> Option<usize> {
        if !self.contains(idx) {
            return None;
        }
        let mut offset = 0usize;
        let mut stride = 1usize;
        for axis in 0..D {
            offset += (idx[axis] - self.index[axis]) as usize * stride;
            stride *= self.size[axis];
        }
        Some(offset)
    }

    /// Inverse of [`offset_of`](Region::offset_of) for offsets inside the
    /// region.
    pub fn index_at(&self, mut offset: usize) -> [isize; D] {
        let mut idx = self.index;
        for axis in 0..D {
            let extent = self.size[axis].max(1);
            idx[axis] += (offset % extent) as isize;
            offset /= extent;
        }
        idx
    }

    /// All indices of the region in memory order.
    pub fn indices(&self) -> impl Iterator<Item = [isize; D]> + '_ {
        (0..self.num_pixels()).map(move |offset| self.index_at(offset))
    }

    /// Number of axis-0 lines in the region.
    pub fn line_count(&self) -> usize {
        self.size.iter().skip(1).product()
    }

    /// Split into at most `pieces` contiguous regions along the last axis.
    /// Sizes differ by at most one and empty pieces are omitted.
    pub fn split_last_axis(&self, pieces: usize) -> Vec<Region<D>> {
        if D == 0 || self.is_empty() {
            return alloc::vec![*self];
        }
        let last = D - 1;
        let extent = self.size[last];
        let pieces = pieces.clamp(1, extent);
        let base = extent / pieces;
        let extra = extent % pieces;
        let mut out = Vec::with_capacity(pieces);
        let mut start = self.index[last];
        for piece in 0..pieces {
            let len = base + usize::from(piece < extra);
            let mut region = *self;
            region.index[last] = start;
            region.size[last] = len;
            out.push(region);
            start += len as isize;
        }
        out
    }
}

/// Geometry of a volume without its pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeInfo<const D: usize> {
    pub region: Region<D>,
    pub origin: [f64; D],
    pub spacing: [f64; D],
}

impl<const D: usize> VolumeInfo<D> {
    pub fn new(region: Region<D>) -> Self {
        Self {
            region,
            origin: [0.0; D],
            spacing: [1.0; D],
        }
    }
}

/// Values stored in a [`MetaDataDictionary`].
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Size(usize),
    Float(f64),
    Text(String),
}

/// String-keyed annotations carried alongside a volume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaDataDictionary {
    entries: HashMap<String, MetaValue>,
}

impl MetaDataDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: MetaValue) -> Option<MetaValue> {
        self.entries.insert(String::from(key), value)
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.get(key)
    }

    /// Convenience accessor for [`MetaValue::Size`] entries.
    pub fn get_size(&self, key: &str) -> Option<usize> {
        match self.entries.get(key) {
            Some(MetaValue::Size(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A dense N-dimensional grid of pixels of type `P`.
#[derive(Debug, Clone)]
pub struct Volume<P, const D: usize> {
    region: Region<D>,
    origin: [f64; D],
    spacing: [f64; D],
    data: Vec<P>,
    metadata: MetaDataDictionary,
}

fn try_allocate<P: Clone>(len: usize, fill: P) -> Result<Vec<P>, SpectraError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| SpectraError::Allocation { elements: len })?;
    data.resize(len, fill);
    Ok(data)
}

impl<P: Clone, const D: usize> Volume<P, D> {
    /// Allocate a volume covering `region` with every pixel set to `fill`.
    pub fn new(region: Region<D>, fill: P) -> Result<Self, SpectraError> {
        Self::from_info(VolumeInfo::new(region), fill)
    }

    pub fn from_info(info: VolumeInfo<D>, fill: P) -> Result<Self, SpectraError> {
        let data = try_allocate(info.region.num_pixels(), fill)?;
        Ok(Self {
            region: info.region,
            origin: info.origin,
            spacing: info.spacing,
            data,
            metadata: MetaDataDictionary::new(),
        })
    }
}

impl<P, const D: usize> Volume<P, D> {
    /// Wrap existing pixels laid out axis 0 fastest.
    pub fn from_vec(region: Region<D>, data: Vec<P>) -> Result<Self, SpectraError> {
        if data.len() != region.num_pixels() {
            return Err(SpectraError::MismatchedGeometry);
        }
        Ok(Self {
            region,
            origin: [0.0; D],
            spacing: [1.0; D],
            data,
            metadata: MetaDataDictionary::new(),
        })
    }

    pub fn with_origin(mut self, origin: [f64; D]) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_spacing(mut self, spacing: [f64; D]) -> Self {
        self.spacing = spacing;
        self
    }

    /// The largest possible region of the volume.
    pub fn region(&self) -> Region<D> {
        self.region
    }

    pub fn origin(&self) -> [f64; D] {
        self.origin
    }

    pub fn spacing(&self) -> [f64; D] {
        self.spacing
    }

    pub fn info(&self) -> VolumeInfo<D> {
        VolumeInfo {
            region: self.region,
            origin: self.origin,
            spacing: self.spacing,
        }
    }

    pub fn get(&self, idx: &[isize; D]) -> Option<&P> {
        self.region.offset_of(idx).map(|o| &self.data[o])
    }

    pub fn get_mut(&mut self, idx: &[isize; D]) -> Option<&mut P> {
        self.region.offset_of(idx).map(move |o| &mut self.data[o])
    }

    /// The full axis-0 line through `idx`. The axis-0 component of `idx` is
    /// ignored.
    pub fn line_at(&self, idx: &[isize; D]) -> Option<&[P]> {
        if D == 0 {
            return None;
        }
        let mut start = *idx;
        start[0] = self.region.index[0];
        let width = self.region.size[0];
        if width == 0 {
            return (1..D)
                .all(|axis| idx[axis] >= self.region.index[axis] && idx[axis] < self.region.upper(axis))
                .then_some(&self.data[..0]);
        }
        let offset = self.region.offset_of(&start)?;
        Some(&self.data[offset..offset + width])
    }

    pub fn as_slice(&self) -> &[P] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [P] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<P> {
        self.data
    }

    pub fn metadata(&self) -> &MetaDataDictionary {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetaDataDictionary {
        &mut self.metadata
    }

    /// Physical position of an index, ignoring axis direction cosines.
    pub fn index_to_physical(&self, idx: &[isize; D]) -> [f64; D] {
        let mut point = self.origin;
        for axis in 0..D {
            point[axis] += idx[axis] as f64 * self.spacing[axis];
        }
        point
    }

    /// Mutable view of a block that spans the whole volume along every axis
    /// except the last.
    pub fn slab_mut(&mut self, region: Region<D>) -> Result<VolumeSlab<'_, P, D>, SpectraError> {
        if !self.region.contains_region(&region) {
            return Err(SpectraError::RegionOutsideVolume);
        }
        if region.is_empty() {
            return Ok(VolumeSlab {
                region,
                data: &mut self.data[..0],
            });
        }
        let spans = (0..D.saturating_sub(1)).all(|axis| {
            region.index[axis] == self.region.index[axis] && region.size[axis] == self.region.size[axis]
        });
        if !spans {
            return Err(SpectraError::MismatchedGeometry);
        }
        let start = self
            .region
            .offset_of(&region.index)
            .ok_or(SpectraError::RegionOutsideVolume)?;
        let len = region.num_pixels();
        Ok(VolumeSlab {
            region,
            data: &mut self.data[start..start + len],
        })
    }

    /// Split the volume into at most `pieces` disjoint slabs along the last
    /// axis.
    pub fn slabs_mut(&mut self, pieces: usize) -> Vec<VolumeSlab<'_, P, D>> {
        let regions = self.region.split_last_axis(pieces);
        let mut slabs = Vec::with_capacity(regions.len());
        let mut rest: &mut [P] = &mut self.data;
        for region in regions {
            let (head, tail) = rest.split_at_mut(region.num_pixels());
            slabs.push(VolumeSlab { region, data: head });
            rest = tail;
        }
        slabs
    }
}

/// Mutable, contiguous view of part of a [`Volume`].
#[derive(Debug)]
pub struct VolumeSlab<'a, P, const D: usize> {
    region: Region<D>,
    data: &'a mut [P],
}

impl<'a, P, const D: usize> VolumeSlab<'a, P, D> {
    pub fn region(&self) -> Region<D> {
        self.region
    }

    pub fn as_slice(&self) -> &[P] {
        self.data
    }

    /// Axis-0 lines of the slab paired with the index of their first pixel.
    pub fn lines_mut(&mut self) -> impl Iterator<Item = ([isize; D], &mut [P])> + '_ {
        let region = self.region;
        let width = region.size.first().copied().unwrap_or(1).max(1);
        self.data
            .chunks_mut(width)
            .enumerate()
            .map(move |(line, chunk)| (region.index_at(line * width), chunk))
    }

    /// Every pixel of the slab paired with its index.
    pub fn pixels_mut(&mut self) -> impl Iterator<Item = ([isize; D], &mut P)> + '_ {
        let region = self.region;
        self.data
            .iter_mut()
            .enumerate()
            .map(move |(offset, px)| (region.index_at(offset), px))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_offsets_roundtrip_axis0_fastest() {
        let region = Region::new([2, -1, 5], [3, 4, 2]);
        assert_eq!(region.offset_of(&[2, -1, 5]), Some(0));
        assert_eq!(region.offset_of(&[3, -1, 5]), Some(1));
        assert_eq!(region.offset_of(&[2, 0, 5]), Some(3));
        assert_eq!(region.offset_of(&[2, -1, 6]), Some(12));
        assert_eq!(region.offset_of(&[5, -1, 5]), None);
        for (offset, idx) in region.indices().enumerate() {
            assert_eq!(region.offset_of(&idx), Some(offset));
        }
        assert_eq!(region.line_count(), 8);
    }

    #[test]
    fn test_split_last_axis_balanced() {
        let region = Region::new([0, 10], [4, 7]);
        let parts = region.split_last_axis(3);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.iter().map(|r| r.size[1]).collect::<Vec<_>>(), vec![3, 2, 2]);
        assert_eq!(parts[1].index[1], 13);
        assert_eq!(parts[2].upper(1), 17);
        assert_eq!(region.split_last_axis(100).len(), 7);
        assert_eq!(region.split_last_axis(0).len(), 1);
    }

    #[test]
    fn test_from_vec_checks_length() {
        let region = Region::from_size([4, 2]);
        assert_eq!(
            Volume::from_vec(region, vec![0.0f32; 7]).err().map(|e| e.kind()),
            Some(crate::error::ErrorKind::Precondition)
        );
    }

    #[test]
    fn test_line_at_is_contiguous() {
        let region = Region::from_size([4, 3]);
        let vol = Volume::from_vec(region, (0..12).collect::<Vec<u32>>()).unwrap();
        assert_eq!(vol.line_at(&[0, 1]), Some(&[4u32, 5, 6, 7][..]));
        assert_eq!(vol.line_at(&[3, 2]), Some(&[8u32, 9, 10, 11][..]));
        assert_eq!(vol.line_at(&[0, 3]), None);
    }

    #[test]
    fn test_slabs_cover_volume_once() {
        let region = Region::from_size([2, 3, 5]);
        let mut vol = Volume::new(region, 0u8).unwrap();
        {
            let mut slabs = vol.slabs_mut(2);
            assert_eq!(slabs.len(), 2);
            for slab in slabs.iter_mut() {
                for (_, px) in slab.pixels_mut() {
                    *px += 1;
                }
            }
        }
        assert!(vol.as_slice().iter().all(|&v| v == 1));
    }

    #[test]
    fn test_slab_mut_requires_full_leading_axes() {
        let mut vol = Volume::new(Region::from_size([4, 4]), 0i32).unwrap();
        assert!(vol.slab_mut(Region::new([0, 1], [4, 2])).is_ok());
        assert_eq!(
            vol.slab_mut(Region::new([1, 1], [3, 2])).err(),
            Some(SpectraError::MismatchedGeometry)
        );
        assert_eq!(
            vol.slab_mut(Region::new([0, 3], [4, 2])).err(),
            Some(SpectraError::RegionOutsideVolume)
        );
    }

    #[test]
    fn test_lines_mut_report_line_starts() {
        let mut vol = Volume::new(Region::new([5, 2], [3, 2]), 0i64).unwrap();
        let mut slab = vol.slab_mut(Region::new([5, 3], [3, 1])).unwrap();
        let starts: Vec<_> = slab.lines_mut().map(|(idx, line)| (idx, line.len())).collect();
        assert_eq!(starts, vec![([5, 3], 3)]);
    }

    #[test]
    fn test_physical_points_and_metadata() {
        let vol = Volume::new(Region::from_size([2, 2]), 0.0f64)
            .unwrap()
            .with_origin([1.0, -2.0])
            .with_spacing([0.5, 3.0]);
        assert_eq!(vol.index_to_physical(&[2, 1]), [2.0, 1.0]);
        let mut meta = MetaDataDictionary::new();
        meta.insert("FFT1DSize", MetaValue::Size(64));
        meta.insert("Units", MetaValue::Text(String::from("mm")));
        assert_eq!(meta.get_size("FFT1DSize"), Some(64));
        assert_eq!(meta.get_size("Units"), None);
        assert_eq!(meta.len(), 2);
    }
}
