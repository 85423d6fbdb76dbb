//! Error types shared by the transform engine, the support-window selector
//! and the region scheduler.

use core::fmt;

use crate::fft::FftError;

/// Broad class of a [`SpectraError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Static configuration rejected at construction.
    Configuration,
    /// An invocation's inputs do not satisfy its preconditions. Raised before
    /// any output is written.
    Precondition,
    /// Buffer or plan allocation failed.
    Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectraError {
    /// A configuration value is out of range (zero step, zero window length,
    /// malformed gain curve).
    InvalidConfig(&'static str),
    /// The extent of `axis` is smaller than the length the operation needs.
    InsufficientLength {
        axis: usize,
        required: usize,
        available: usize,
    },
    /// A line handed to a plan is shorter than the plan length.
    LineTooShort { required: usize, available: usize },
    /// A forward line was handed to an inverse plan or the other way round.
    DirectionMismatch,
    /// Transforms of length zero cannot be planned.
    EmptyTransform,
    /// A requested region is not contained in the volume.
    RegionOutsideVolume,
    /// Two volumes that must share a geometry do not.
    MismatchedGeometry,
    /// Reserving `elements` buffer entries failed.
    Allocation { elements: usize },
    /// The FFT backend rejected a request.
    Fft(FftError),
}

impl SpectraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpectraError::InvalidConfig(_) => ErrorKind::Configuration,
            SpectraError::Allocation { .. } => ErrorKind::Resource,
            SpectraError::InsufficientLength { .. }
            | SpectraError::LineTooShort { .. }
            | SpectraError::DirectionMismatch
            | SpectraError::EmptyTransform
            | SpectraError::RegionOutsideVolume
            | SpectraError::MismatchedGeometry
            | SpectraError::Fft(_) => ErrorKind::Precondition,
        }
    }
}

impl From<FftError> for SpectraError {
    fn from(err: FftError) -> Self {
        match err {
            FftError::Allocation(elements) => SpectraError::Allocation { elements },
            FftError::EmptyInput => SpectraError::EmptyTransform,
            other => SpectraError::Fft(other),
        }
    }
}

impl fmt::Display for SpectraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectraError::InvalidConfig(what) => write!(f, "invalid configuration: {what}"),
            SpectraError::InsufficientLength {
                axis,
                required,
                available,
            } => write!(
                f,
                "insufficient size along axis {axis}: need {required}, have {available}"
            ),
            SpectraError::LineTooShort {
                required,
                available,
            } => write!(
                f,
                "line of {available} samples is shorter than the planned length {required}"
            ),
            SpectraError::DirectionMismatch => {
                f.write_str("line direction does not match the plan direction")
            }
            SpectraError::EmptyTransform => f.write_str("transform length must be non-zero"),
            SpectraError::RegionOutsideVolume => {
                f.write_str("requested region lies outside the volume")
            }
            SpectraError::MismatchedGeometry => f.write_str("volume geometries do not match"),
            SpectraError::Allocation { elements } => {
                write!(f, "failed to allocate a buffer of {elements} elements")
            }
            SpectraError::Fft(err) => write!(f, "fft backend error: {err:?}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SpectraError {}
