//! Per-macro timed loop.
//!
//! While its flag is on, a scheduler sleeps a jittered interval and then emits
//! one input event. While the flag is off it parks on the status table instead of
//! polling. Both waits race the engine's cancellation token, so shutdown never
//! waits out a delay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::status::{StatusTable, wait_enabled};
use crate::config::MacroDefinition;
use crate::input::InputInjector;

/// Delay before the next emission: `interval_ms` plus a uniform offset in
/// `[-variance_ms, +variance_ms]`, never shorter than 1ms.
pub fn jittered_delay<R: Rng>(interval_ms: u64, variance_ms: u64, rng: &mut R) -> Duration {
    let interval = i64::try_from(interval_ms).unwrap_or(i64::MAX);
    let variance = i64::try_from(variance_ms).unwrap_or(i64::MAX);
    let jitter = if variance == 0 {
        0
    } else {
        rng.random_range(-variance..=variance)
    };
    let delay_ms = interval.saturating_add(jitter).max(1);
    Duration::from_millis(delay_ms.unsigned_abs())
}

/// One macro's loop, bound to its slot in the status table.
pub(crate) struct MacroScheduler {
    index: usize,
    definition: MacroDefinition,
    table: Arc<StatusTable>,
    injector: Arc<dyn InputInjector>,
    cancel: CancellationToken,
    rng: StdRng,
}

impl MacroScheduler {
    pub(crate) fn new(
        index: usize,
        definition: MacroDefinition,
        table: Arc<StatusTable>,
        injector: Arc<dyn InputInjector>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            index,
            definition,
            table,
            injector,
            cancel,
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Spawn the loop on the current Tokio runtime.
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let index = self.index;
        info!(
            target: "macrobuddy::scheduler",
            index,
            action = %self.definition.action.label(),
            interval_ms = self.definition.interval_ms,
            variance_ms = self.definition.variance_ms,
            hotkey = %self.definition.toggle_hotkey,
            "Scheduler started"
        );

        let mut flags = self.table.subscribe();
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                alive = wait_enabled(&mut flags, index) => {
                    if !alive {
                        break;
                    }
                }
            }

            let delay = jittered_delay(
                self.definition.interval_ms,
                self.definition.variance_ms,
                &mut self.rng,
            );
            trace!(
                target: "macrobuddy::scheduler",
                index,
                delay_ms = delay.as_millis() as u64,
                "Sleeping"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = sleep(delay) => {}
            }

            // The flag may have flipped during the sleep.
            if self.table.is_enabled(index) != Some(true) {
                continue;
            }

            match self.injector.emit(&self.definition.action) {
                Ok(()) => debug!(
                    target: "macrobuddy::scheduler",
                    index,
                    action = %self.definition.action.label(),
                    delay_ms = delay.as_millis() as u64,
                    "Emitted"
                ),
                Err(e) => warn!(
                    target: "macrobuddy::scheduler",
                    index,
                    error = %e,
                    "Input emission failed"
                ),
            }
        }

        info!(target: "macrobuddy::scheduler", index, "Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MacroAction, ToggleHotkey};
    use crate::error::InjectionError;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        emitted: Mutex<Vec<Instant>>,
        fail: bool,
    }

    impl InputInjector for Recorder {
        fn emit(&self, _action: &MacroAction) -> Result<(), InjectionError> {
            self.emitted.lock().unwrap().push(Instant::now());
            if self.fail {
                Err(InjectionError::Unavailable("test".into()))
            } else {
                Ok(())
            }
        }
    }

    fn definition(interval_ms: u64, variance_ms: u64) -> MacroDefinition {
        MacroDefinition {
            action: MacroAction::Keyboard { key: "q".into() },
            interval_ms,
            variance_ms,
            toggle_hotkey: ToggleHotkey::F1,
            enabled_by_default: true,
        }
    }

    #[test]
    fn delay_without_variance_is_exact() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(jittered_delay(250, 0, &mut rng), Duration::from_millis(250));
    }

    #[test]
    fn delay_never_reaches_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let d = jittered_delay(100, 100, &mut rng);
            assert!(d >= Duration::from_millis(1) && d <= Duration::from_millis(200));
        }
    }

    #[test]
    fn delay_is_uniform_over_the_window() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples = 40_000;
        let mut buckets = [0usize; 4];
        let mut sum = 0u128;
        for _ in 0..samples {
            let ms = jittered_delay(1000, 200, &mut rng).as_millis();
            assert!((800..=1200).contains(&ms), "delay {ms} out of range");
            sum += ms;
            let bucket = ((ms - 800) / 100).min(3) as usize;
            buckets[bucket] += 1;
        }
        let mean = sum as f64 / samples as f64;
        assert!((mean - 1000.0).abs() < 5.0, "mean {mean}");
        for count in buckets {
            let share = count as f64 / samples as f64;
            assert!((share - 0.25).abs() < 0.02, "bucket share {share}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gaps_stay_inside_the_jitter_window() {
        let table = Arc::new(StatusTable::new(vec![true]));
        let recorder = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();
        let handle = MacroScheduler::new(
            0,
            definition(1000, 200),
            table,
            recorder.clone(),
            cancel.clone(),
        )
        .spawn();

        sleep(Duration::from_secs(60)).await;
        cancel.cancel();
        handle.await.unwrap();

        let emitted = recorder.emitted.lock().unwrap();
        assert!(emitted.len() >= 45, "only {} emissions", emitted.len());
        for pair in emitted.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(
                gap >= Duration::from_millis(800) && gap <= Duration::from_millis(1200),
                "gap {gap:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_macro_never_emits_and_resumes_when_enabled() {
        let table = Arc::new(StatusTable::new(vec![false]));
        let recorder = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();
        let handle = MacroScheduler::new(
            0,
            definition(100, 0),
            table.clone(),
            recorder.clone(),
            cancel.clone(),
        )
        .spawn();

        sleep(Duration::from_secs(5)).await;
        assert!(recorder.emitted.lock().unwrap().is_empty());

        table.flip(0);
        sleep(Duration::from_millis(1050)).await;
        let count = recorder.emitted.lock().unwrap().len();
        assert!((9..=11).contains(&count), "{count} emissions");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_mid_sleep_suppresses_the_pending_emission() {
        let table = Arc::new(StatusTable::new(vec![true]));
        let recorder = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();
        let handle = MacroScheduler::new(
            0,
            definition(1000, 0),
            table.clone(),
            recorder.clone(),
            cancel.clone(),
        )
        .spawn();

        sleep(Duration::from_millis(500)).await;
        table.flip(0);
        sleep(Duration::from_secs(3)).await;
        assert!(recorder.emitted.lock().unwrap().is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_long_sleep() {
        let table = Arc::new(StatusTable::new(vec![true]));
        let cancel = CancellationToken::new();
        let handle = MacroScheduler::new(
            0,
            definition(5000, 0),
            table,
            Arc::new(Recorder::default()),
            cancel.clone(),
        )
        .spawn();

        sleep(Duration::from_millis(10)).await;
        let started = Instant::now();
        cancel.cancel();
        handle.await.unwrap();
        assert!(Instant::now() - started < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn injection_failures_do_not_stop_the_loop() {
        let table = Arc::new(StatusTable::new(vec![true]));
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let cancel = CancellationToken::new();
        let handle = MacroScheduler::new(
            0,
            definition(100, 0),
            table,
            recorder.clone(),
            cancel.clone(),
        )
        .spawn();

        sleep(Duration::from_millis(550)).await;
        assert_eq!(recorder.emitted.lock().unwrap().len(), 5);
        cancel.cancel();
        handle.await.unwrap();
    }
}
