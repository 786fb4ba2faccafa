use log::debug;
use std::thread;
use std::time::{Duration, Instant};

/// Drift-compensated fixed-period loop
///
/// Each tick runs the cycle, measures how long it took and sleeps for the
/// remainder of the interval. A cycle that overruns the interval is followed
/// immediately by the next one; missed ticks are never caught up.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler with a fixed period
    ///
    /// # Arguments
    ///
    /// * `interval` - Target time between cycle starts (e.g., Duration::from_secs(15))
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::time::Duration;
    /// use storage_exporter::collectors::Scheduler;
    ///
    /// let scheduler = Scheduler::new(Duration::from_secs(15));
    /// scheduler.run(|| println!("cycle"));
    /// ```
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep owed after a cycle that took `elapsed`, never negative
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.interval.saturating_sub(elapsed)
    }

    /// Run one cycle and the sleep that follows it
    ///
    /// Returns the time slept.
    pub fn tick<F: FnMut()>(&self, cycle: &mut F) -> Duration {
        let start = Instant::now();
        cycle();
        let elapsed = start.elapsed();

        let sleep = self.remaining(elapsed);
        debug!(
            "Cycle took {:.3}s, adjusted poll time {:.3}s",
            elapsed.as_secs_f64(),
            sleep.as_secs_f64()
        );
        if !sleep.is_zero() {
            thread::sleep(sleep);
        }
        sleep
    }

    /// Run `cycle` forever on this thread
    pub fn run<F: FnMut()>(&self, mut cycle: F) -> ! {
        loop {
            self.tick(&mut cycle);
        }
    }
}
