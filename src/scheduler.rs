// ABOUTME: Periodic-task scheduler backing `always` blocks

use std::sync::Arc;
use std::time::Duration;

/// Abstracts the passage of time between iterations of an `always` worker
/// so a test harness can drive one without waiting on a wall clock.
pub trait Clock: Send + Sync {
    fn sleep(&self, seconds: f64);
}

/// The real clock used outside of tests.
#[derive(Debug, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn sleep(&self, seconds: f64) {
        if seconds > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(seconds));
        }
    }
}

/// Spawns a daemon worker that calls `tick` and then `clock.sleep(interval)`,
/// forever. The worker is never joined or cancelled — it is expected to
/// live until process exit, matching an `always` block's semantics. No
/// queue is shared between workers; each runs its own independent loop.
pub fn schedule<F>(interval: f64, clock: Arc<dyn Clock>, mut tick: F)
where
    F: FnMut() + Send + 'static,
{
    std::thread::spawn(move || loop {
        tick();
        clock.sleep(interval);
    });
}
