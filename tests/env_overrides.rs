// Test intent: verifies worker count overrides behavior including edge cases.
use spectra1d::scheduler::{set_worker_threads, worker_threads, RegionScheduler};

#[test]
fn programmatic_override_wins_and_resets() {
    set_worker_threads(3);
    assert_eq!(worker_threads(), 3);
    assert_eq!(RegionScheduler::from_env().workers(), 3);
    set_worker_threads(0);
    assert!(worker_threads() >= 1);
}
