//! Demonstrates enabling verbose logging for spectra1d.
use spectra1d::plan::SpectrumLayout;
use spectra1d::transform::ForwardTransform1d;
use spectra1d::volume::{Region, Volume};

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();

    let fwd = ForwardTransform1d::<f32>::new(SpectrumLayout::HalfMatrix);
    let mut cache = fwd.new_cache();
    // Two lengths so the log shows a build, a reuse and a rebuild.
    for len in [16usize, 16, 24] {
        let input = Volume::new(Region::from_size([len, 4]), 1.0f32).unwrap();
        fwd.transform(&mut cache, &input).unwrap();
    }
}
