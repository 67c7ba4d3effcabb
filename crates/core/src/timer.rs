//! One-shot timers and alarms
//!
//! Each scheduled timer is an independent tokio task: sleep, announce through
//! the speech output, finish. There is no cancellation; a pending timer lives
//! until it fires or the scheduler is dropped. Callers that are about to drop
//! the scheduler can block on `wait_idle` so pending timers still announce.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AssistantError;
use crate::speech::SpeechOutput;

/// A scheduled, not yet fired, timer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerHandle {
    pub fire_time: DateTime<Local>,
    pub label: Option<String>,
}

/// "Timer finished" or "Timer '<label>' finished"
pub fn finished_message(label: Option<&str>) -> String {
    match label {
        Some(label) => format!("Timer '{}' finished", label),
        None => "Timer finished".to_string(),
    }
}

pub struct TimerScheduler {
    runtime: Runtime,
    speaker: Arc<dyn SpeechOutput>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TimerScheduler {
    pub fn new(speaker: Arc<dyn SpeechOutput>) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("dadu-timer")
            .enable_time()
            .build()
            .context("Failed to create timer runtime")?;

        Ok(Self {
            runtime,
            speaker,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Fire after `delay`
    pub fn schedule_after(&self, delay: Duration, label: Option<String>) -> TimerHandle {
        let now = Local::now();
        let fire_time = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        let handle = TimerHandle {
            fire_time,
            label: label.clone(),
        };

        let speaker = Arc::clone(&self.speaker);
        debug!(?delay, ?label, "timer scheduled");

        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            let message = finished_message(label.as_deref());
            info!("{}", message);

            // A panicking speaker only takes this task down
            let announce = tokio::task::spawn_blocking(move || speaker.say(&message));
            if let Err(e) = announce.await {
                warn!("timer announcement failed: {}", e);
            }
        });

        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(task);
        }

        handle
    }

    /// Timers scheduled but not yet announced
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .map(|tasks| tasks.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    /// Block until every timer scheduled so far has announced.
    ///
    /// Must not be called from inside the timer runtime.
    pub fn wait_idle(&self) {
        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => return,
        };
        if tasks.is_empty() {
            return;
        }
        debug!(count = tasks.len(), "waiting for pending timers");
        self.runtime.block_on(async {
            for task in tasks {
                if let Err(e) = task.await {
                    warn!("timer task failed: {}", e);
                }
            }
        });
    }

    /// Fire at a wall-clock time. A target at or before now schedules nothing.
    pub fn schedule_at(
        &self,
        at: DateTime<Local>,
        label: Option<String>,
    ) -> Result<TimerHandle, AssistantError> {
        let delay = (at - Local::now())
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or(AssistantError::PastTime)?;

        let mut handle = self.schedule_after(delay, label);
        handle.fire_time = at;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Instant;

    struct ChannelSpeaker(Mutex<mpsc::Sender<String>>);

    impl SpeechOutput for ChannelSpeaker {
        fn say(&self, text: &str) {
            if let Ok(tx) = self.0.lock() {
                let _ = tx.send(text.to_string());
            }
        }
    }

    struct PanickingSpeaker;

    impl SpeechOutput for PanickingSpeaker {
        fn say(&self, _text: &str) {
            panic!("audio device unplugged");
        }
    }

    fn scheduler() -> (TimerScheduler, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel();
        let speaker = Arc::new(ChannelSpeaker(Mutex::new(tx)));
        (TimerScheduler::new(speaker).unwrap(), rx)
    }

    #[test]
    fn test_messages() {
        assert_eq!(finished_message(None), "Timer finished");
        assert_eq!(finished_message(Some("tea")), "Timer 'tea' finished");
    }

    #[test]
    fn test_handle_serializes() {
        let (timers, _rx) = scheduler();
        let handle = timers.schedule_after(Duration::from_secs(60), Some("tea".to_string()));
        let json = serde_json::to_value(&handle).unwrap();
        assert_eq!(json["label"], "tea");
        assert!(json["fire_time"].is_string());
    }

    #[test]
    fn test_past_time_schedules_nothing() {
        let (timers, rx) = scheduler();
        let err = timers
            .schedule_at(Local::now() - chrono::Duration::seconds(1), None)
            .unwrap_err();
        assert_eq!(err, AssistantError::PastTime);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_fires_once_after_delay() {
        let (timers, rx) = scheduler();
        let start = Instant::now();
        let handle = timers.schedule_after(Duration::from_millis(300), Some("eggs".to_string()));
        assert_eq!(handle.label.as_deref(), Some("eggs"));

        let message = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let elapsed = start.elapsed();
        assert_eq!(message, "Timer 'eggs' finished");
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(1300));
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn test_schedule_at_future() {
        let (timers, rx) = scheduler();
        let start = Instant::now();
        let at = Local::now() + chrono::Duration::milliseconds(400);
        let handle = timers.schedule_at(at, None).unwrap();
        assert_eq!(handle.fire_time, at);

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "Timer finished");
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(350));
        assert!(elapsed < Duration::from_millis(1400));
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn test_wait_idle_lets_pending_timer_announce() {
        let (timers, rx) = scheduler();
        timers.schedule_after(Duration::from_millis(300), None);
        assert_eq!(timers.pending(), 1);

        timers.wait_idle();
        assert_eq!(timers.pending(), 0);
        assert_eq!(rx.try_recv().unwrap(), "Timer finished");
    }

    #[test]
    fn test_wait_idle_without_timers_returns() {
        let (timers, rx) = scheduler();
        timers.wait_idle();
        assert_eq!(timers.pending(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_independent_timers() {
        let (timers, rx) = scheduler();
        timers.schedule_after(Duration::from_millis(250), Some("b".to_string()));
        timers.schedule_after(Duration::from_millis(50), Some("a".to_string()));

        let mut got = vec![
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        ];
        got.sort();
        assert_eq!(got, vec!["Timer 'a' finished", "Timer 'b' finished"]);
    }

    #[test]
    fn test_speaker_panic_is_contained() {
        let timers = TimerScheduler::new(Arc::new(PanickingSpeaker)).unwrap();
        timers.schedule_after(Duration::from_millis(10), None);
        std::thread::sleep(Duration::from_millis(200));

        // Still usable afterwards
        let handle = timers.schedule_after(Duration::from_secs(60), None);
        assert!(handle.fire_time > Local::now());
    }
}
