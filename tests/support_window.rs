// Test intent: verifies support window selection behavior including edge cases.
use proptest::prelude::*;
use spectra1d::scheduler::RegionScheduler;
use spectra1d::support_window::{SupportWindow, SupportWindowConfig, SupportWindowSelector};
use spectra1d::transform::FFT1D_SIZE_KEY;
use spectra1d::volume::{Region, Volume};
use spectra1d::ErrorKind;

fn side_lines(size: [usize; 2], value: u16) -> Volume<u16, 2> {
    Volume::new(Region::from_size(size), value).expect("Invariant: operation should succeed")
}

fn selector(fft1d_size: usize, step: usize) -> SupportWindowSelector<2> {
    SupportWindowSelector::new(SupportWindowConfig { fft1d_size, step })
        .expect("Invariant: operation should succeed")
}

#[test]
fn interior_window_has_2h_lines() {
    let map = side_lines([64, 12], 2);
    let out = selector(32, 1)
        .select(&map)
        .expect("Invariant: operation should succeed");
    let window = out
        .get(&[40, 6])
        .expect("Invariant: operation should succeed");
    let axis1: Vec<isize> = window.iter().map(|c| c[1]).collect();
    assert_eq!(axis1, vec![4, 5, 6, 7]);
    assert!(window.iter().all(|c| c[0] == 24));
}

#[test]
fn boundary_window_is_clipped() {
    let map = side_lines([40, 8], 5);
    let out = selector(32, 1)
        .select(&map)
        .expect("Invariant: operation should succeed");
    let window = out
        .get(&[20, 0])
        .expect("Invariant: operation should succeed");
    assert!(window.iter().all(|c| c[1] >= 0));
    assert!(window.len() < 10);
    assert_eq!(window.len(), 5);
}

fn axis1_at<S: spectra1d::SideLineValue>(map: &Volume<S, 2>, idx: [isize; 2]) -> Vec<isize> {
    let out = selector(8, 1)
        .select(map)
        .expect("Invariant: operation should succeed");
    out.get(&idx)
        .expect("Invariant: operation should succeed")
        .iter()
        .map(|c| c[1])
        .collect()
}

#[test]
fn huge_unsigned_half_width_spans_all_lines() {
    for value in [u64::MAX, 1u64 << 63] {
        let map = Volume::new(Region::from_size([8, 5]), value)
            .expect("Invariant: operation should succeed");
        assert_eq!(axis1_at(&map, [4, 2]), vec![0, 1, 2, 3, 4]);
    }
}

#[test]
fn huge_float_half_width_spans_all_lines() {
    for value in [1e30f64, f64::INFINITY, f64::MAX] {
        let map = Volume::new(Region::from_size([8, 5]), value)
            .expect("Invariant: operation should succeed");
        assert_eq!(axis1_at(&map, [4, 2]), vec![0, 1, 2, 3, 4]);
    }
    let map = Volume::new(Region::from_size([8, 5]), 1e30f32)
        .expect("Invariant: operation should succeed");
    assert_eq!(axis1_at(&map, [0, 4]), vec![0, 1, 2, 3, 4]);
}

#[test]
fn negative_or_nan_half_width_gives_empty_window() {
    for value in [-1i32, -3, i32::MIN] {
        let map = Volume::new(Region::from_size([8, 5]), value)
            .expect("Invariant: operation should succeed");
        assert!(axis1_at(&map, [4, 2]).is_empty());
    }
    let map = Volume::new(Region::from_size([8, 5]), i64::MIN)
        .expect("Invariant: operation should succeed");
    assert!(axis1_at(&map, [4, 0]).is_empty());
    for value in [f64::NAN, f64::NEG_INFINITY, -0.5] {
        let map = Volume::new(Region::from_size([8, 5]), value)
            .expect("Invariant: operation should succeed");
        assert!(axis1_at(&map, [4, 2]).is_empty());
    }
}

#[test]
fn windows_stay_inside_input() {
    let mut map = side_lines([48, 7], 0);
    for (i, v) in map.as_mut_slice().iter_mut().enumerate() {
        *v = (i % 6) as u16;
    }
    let largest = map.region();
    let out = selector(16, 3)
        .select(&map)
        .expect("Invariant: operation should succeed");
    for window in out.as_slice() {
        for coord in window {
            assert!(largest.contains(coord), "{coord:?} outside {largest:?}");
        }
        assert!(window.windows(2).all(|w| w[0][1] < w[1][1]));
    }
}

#[test]
fn downsampling_scales_axis0() {
    let map = Volume::new(Region::from_size([100, 4]), 1.0f32)
        .expect("Invariant: operation should succeed")
        .with_spacing([0.3, 1.5]);
    let out = selector(32, 2)
        .select(&map)
        .expect("Invariant: operation should succeed");
    assert_eq!(out.region().size, [50, 4]);
    assert_eq!(out.spacing(), [0.6, 1.5]);
    assert_eq!(out.metadata().get_size(FFT1D_SIZE_KEY), Some(32));
    // Output line 10 samples input line 20.
    let window = out
        .get(&[10, 1])
        .expect("Invariant: operation should succeed");
    assert!(window.iter().all(|c| c[0] == 4));
}

#[test]
fn short_input_fails_before_writing() {
    let map = side_lines([31, 4], 1);
    let sel = selector(32, 1);
    let err = sel.select(&map).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);

    let sentinel: SupportWindow<2> = vec![[-7, -7]];
    let mut out = Volume::new(Region::from_size([31, 4]), sentinel.clone())
        .expect("Invariant: operation should succeed");
    let region = out.region();
    {
        let mut slab = out
            .slab_mut(region)
            .expect("Invariant: operation should succeed");
        assert!(sel.generate_region(&map, &mut slab).is_err());
    }
    assert!(out.as_slice().iter().all(|w| *w == sentinel));
}

#[test]
fn scheduled_selection_matches_serial() {
    let mut map = side_lines([64, 9], 0);
    for (i, v) in map.as_mut_slice().iter_mut().enumerate() {
        *v = ((i * 13) % 5) as u16;
    }
    let sel = selector(32, 2);
    let serial = sel.select(&map).expect("Invariant: operation should succeed");
    let scheduled = sel
        .select_with(&RegionScheduler::new(4), &map)
        .expect("Invariant: operation should succeed");
    assert_eq!(serial.as_slice(), scheduled.as_slice());
}

#[test]
fn three_dimensional_windows_keep_outer_axes() {
    let map = Volume::new(Region::new([0, 0, 5], [32, 3, 2]), 1u8)
        .expect("Invariant: operation should succeed");
    let sel = SupportWindowSelector::<3>::new(SupportWindowConfig::default())
        .expect("Invariant: operation should succeed");
    let out = sel.select(&map).expect("Invariant: operation should succeed");
    let window = out
        .get(&[3, 2, 6])
        .expect("Invariant: operation should succeed");
    assert_eq!(window, &vec![[0, 1, 6], [0, 2, 6]]);
}

proptest! {
    #[test]
    fn prop_window_length_bounded(c1 in 0isize..20, h in 0u32..12, extent in 1usize..20) {
        let largest = Region::from_size([32, extent]);
        let c1 = c1.min(extent as isize - 1);
        let window = selector(32, 1).window_at(&largest, &[16, c1], h as isize);
        prop_assert!(window.len() <= 2 * h as usize);
        prop_assert!(window.iter().all(|c| c[0] == 0 && largest.contains(c)));
    }
}
