//! End-to-end run: gain, forward spectra and support windows on a synthetic
//! two-dimensional acquisition.
use spectra1d::gain::TimeGainCompensation;
use spectra1d::plan::SpectrumLayout;
use spectra1d::scheduler::{RegionScheduler, WorkerArena};
use spectra1d::support_window::{SupportWindowConfig, SupportWindowSelector};
use spectra1d::transform::{ForwardTransform1d, FFT1D_SIZE_KEY};
use spectra1d::volume::{Region, Volume};

/// Samples along the depth axis.
const DEPTH: usize = 128;
/// Number of acquired lines.
const LINES: usize = 16;
/// Sample spacing along depth in millimetres.
const DEPTH_SPACING: f64 = 0.05;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::try_init();

    let data: Vec<f64> = (0..DEPTH * LINES)
        .map(|i| {
            let depth = (i % DEPTH) as f64;
            (depth * 0.4).sin() * (-depth / 64.0).exp()
        })
        .collect();
    let rf = Volume::from_vec(Region::from_size([DEPTH, LINES]), data)?
        .with_spacing([DEPTH_SPACING, 0.3]);

    let scheduler = RegionScheduler::from_env();
    let tgc = TimeGainCompensation::new(vec![(0.0, 1.0), (6.4, 8.0)])?;
    let compensated = tgc.apply_with(&scheduler, &rf)?;

    let fwd = ForwardTransform1d::<f64>::new(SpectrumLayout::HalfMatrix);
    let mut arena = WorkerArena::new(scheduler.workers(), || fwd.new_cache());
    let spectra = fwd.transform_parallel(&scheduler, &mut arena, &compensated)?;
    println!(
        "spectra: {:?} bins x {} lines, {} = {:?}",
        spectra.region().size[0],
        spectra.region().size[1],
        FFT1D_SIZE_KEY,
        spectra.metadata().get_size(FFT1D_SIZE_KEY)
    );

    let side_lines = Volume::new(Region::from_size([DEPTH, LINES]), 2u8)?;
    let selector = SupportWindowSelector::new(SupportWindowConfig {
        fft1d_size: 32,
        step: 4,
    })?;
    let windows = selector.select_with(&scheduler, &side_lines)?;
    println!("windows: {:?}", windows.region().size);
    for idx in [[0isize, 0], [10, 7], [31, 15]] {
        if let Some(window) = windows.get(&idx) {
            println!("  {idx:?} -> {window:?}");
        }
    }
    Ok(())
}
