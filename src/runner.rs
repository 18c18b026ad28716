//! Background organizing runs: a single run on a worker thread, or a
//! repeating auto-run that stops when its cancellation token is triggered.
//!
//! Progress travels to the caller as [`RunEvent`]s over a channel so an
//! interactive front-end never blocks on the filesystem.

use crate::config::OrganizerConfig;
use crate::file_organizer::{
    OrganizeError, OrganizeResult, Outcome, RunOptions, organize_with_progress,
};
use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How often a waiting auto-run checks for cancellation.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum number of events that may queue up before the worker blocks.
pub const EVENT_CHANNEL_CAPACITY: usize = 4_096;

/// Cooperative stop signal shared between a caller and a worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the worker to stop at its next check.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Everything a worker needs to organize a folder.
#[derive(Debug, Clone)]
pub struct OrganizeJob {
    pub folder: PathBuf,
    pub config: Arc<OrganizerConfig>,
    pub options: RunOptions,
    /// Forward per-file outcomes as `RunEvent::Progress`.
    pub report_progress: bool,
}

/// Messages sent from a worker to its caller.
#[derive(Debug)]
pub enum RunEvent {
    /// A run cycle began.
    Started { cycle: u64, at: DateTime<Local> },
    /// A file was processed (only when progress reporting is enabled).
    Progress(Outcome),
    /// A run cycle completed.
    Finished { cycle: u64, result: OrganizeResult },
    /// A run cycle could not start; an auto-run continues with the next cycle.
    Failed { cycle: u64, error: OrganizeError },
    /// Waiting for the next cycle; `until` is `None` when the next run lies
    /// beyond the representable calendar range.
    Waiting { until: Option<DateTime<Local>> },
    /// The auto-run noticed cancellation and ended.
    Stopped,
}

/// Handle to a running or completed worker.
pub struct RunHandle {
    events: Receiver<RunEvent>,
    cancel: CancellationToken,
    thread: Option<thread::JoinHandle<()>>,
}

impl RunHandle {
    /// Receiver for events from the worker. It disconnects when the worker exits.
    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(thread::JoinHandle::is_finished)
    }

    /// Waits for the worker thread to exit.
    pub fn join(mut self) {
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            tracing::error!("organizer worker panicked");
        }
    }
}

/// Runs the job once on a background thread.
///
/// # Errors
///
/// Returns an error if the worker thread cannot be spawned.
pub fn spawn_once(job: OrganizeJob) -> io::Result<RunHandle> {
    spawn_worker("foldersort-run", move |tx, _cancel| {
        run_cycle(&job, 1, &tx);
    })
}

/// Runs the job now and then again every `interval` until cancelled.
///
/// While waiting, the token is checked every [`POLL_INTERVAL`], so a stop
/// request takes effect within about a second. A run already in progress
/// always completes first.
///
/// # Errors
///
/// Returns an error if the worker thread cannot be spawned.
pub fn spawn_auto(job: OrganizeJob, interval: Duration) -> io::Result<RunHandle> {
    spawn_worker("foldersort-auto", move |tx, cancel| {
        info!(
            folder = %job.folder.display(),
            interval_secs = interval.as_secs(),
            "auto-run started"
        );

        let mut cycle: u64 = 0;
        while !cancel.is_cancelled() {
            cycle += 1;
            if !run_cycle(&job, cycle, &tx) {
                debug!("event receiver dropped, ending auto-run");
                break;
            }

            let until = next_run_at(interval);
            if tx.send(RunEvent::Waiting { until }).is_err() {
                break;
            }
            wait_for(interval, &cancel);
        }

        info!(cycles = cycle, "auto-run stopped");
        let _ = tx.send(RunEvent::Stopped);
    })
}

fn spawn_worker<F>(name: &str, body: F) -> io::Result<RunHandle>
where
    F: FnOnce(Sender<RunEvent>, CancellationToken) + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded::<RunEvent>(EVENT_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();

    let thread = thread::Builder::new()
        .name(name.into())
        .spawn(move || body(tx, worker_cancel))?;

    Ok(RunHandle {
        events: rx,
        cancel,
        thread: Some(thread),
    })
}

/// Executes one cycle. Returns `false` once the receiver has gone away.
fn run_cycle(job: &OrganizeJob, cycle: u64, tx: &Sender<RunEvent>) -> bool {
    if tx
        .send(RunEvent::Started {
            cycle,
            at: Local::now(),
        })
        .is_err()
    {
        return false;
    }

    let result = organize_with_progress(&job.folder, &job.config, job.options, |outcome| {
        if job.report_progress && outcome.describe(&job.folder).is_some() {
            let _ = tx.send(RunEvent::Progress(outcome));
        }
    });

    let event = match result {
        Ok(result) => RunEvent::Finished { cycle, result },
        Err(error) => RunEvent::Failed { cycle, error },
    };
    tx.send(event).is_ok()
}

fn next_run_at(interval: Duration) -> Option<DateTime<Local>> {
    let delta = chrono::Duration::from_std(interval).ok()?;
    Local::now().checked_add_signed(delta)
}

/// Sleeps for `total`, waking every [`POLL_INTERVAL`] to check `cancel`.
///
/// A `total` too large for an [`Instant`] waits until cancelled.
fn wait_for(total: Duration, cancel: &CancellationToken) {
    let deadline = Instant::now().checked_add(total);
    while !cancel.is_cancelled() {
        let step = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                POLL_INTERVAL.min(deadline - now)
            }
            None => POLL_INTERVAL,
        };
        thread::sleep(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOptions;
    use std::fs;
    use tempfile::TempDir;

    const RECV_TIMEOUT: Duration = Duration::from_secs(10);

    fn job_for(folder: &std::path::Path, dry_run: bool, report_progress: bool) -> OrganizeJob {
        OrganizeJob {
            folder: folder.to_path_buf(),
            config: Arc::new(OrganizerConfig::resolve(
                vec![("Images", vec![".jpg"])],
                ConfigOptions::default(),
            )),
            options: RunOptions {
                recursive: false,
                dry_run,
            },
            report_progress,
        }
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_spawn_once_reports_progress_and_result() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a.jpg"), "x").unwrap();
        fs::write(temp_dir.path().join("b.txt"), "x").unwrap();

        let handle = spawn_once(job_for(temp_dir.path(), false, true)).unwrap();
        let events: Vec<RunEvent> = handle.events().iter().collect();
        handle.join();

        assert!(matches!(events.first(), Some(RunEvent::Started { cycle: 1, .. })));
        let progress = events
            .iter()
            .filter(|e| matches!(e, RunEvent::Progress(Outcome::Moved { .. })))
            .count();
        assert_eq!(progress, 1);

        match events.last() {
            Some(RunEvent::Finished { result, .. }) => {
                assert_eq!(result.moved.get("Images"), Some(&1));
                assert_eq!(result.skipped_unmapped, 1);
            }
            other => panic!("expected Finished, got {:?}", other),
        }
        assert!(temp_dir.path().join("Images/a.jpg").exists());
    }

    #[test]
    fn test_spawn_once_without_progress_sends_only_result() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a.jpg"), "x").unwrap();

        let handle = spawn_once(job_for(temp_dir.path(), true, false)).unwrap();
        let events: Vec<RunEvent> = handle.events().iter().collect();
        handle.join();

        assert_eq!(events.len(), 2);
        assert!(!events.iter().any(|e| matches!(e, RunEvent::Progress(_))));
        assert!(temp_dir.path().join("a.jpg").exists());
    }

    #[test]
    fn test_spawn_once_invalid_folder_reports_failure() {
        let handle = spawn_once(job_for(
            std::path::Path::new("/non/existent/path"),
            false,
            false,
        ))
        .unwrap();
        let events: Vec<RunEvent> = handle.events().iter().collect();
        handle.join();

        assert!(matches!(
            events.last(),
            Some(RunEvent::Failed {
                error: OrganizeError::InvalidFolder(_),
                ..
            })
        ));
    }

    #[test]
    fn test_auto_run_stops_within_poll_interval() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let handle = spawn_auto(
            job_for(temp_dir.path(), true, false),
            Duration::from_secs(3600),
        )
        .unwrap();

        loop {
            match handle.events().recv_timeout(RECV_TIMEOUT) {
                Ok(RunEvent::Waiting { .. }) => break,
                Ok(_) => continue,
                Err(e) => panic!("auto-run never started waiting: {e}"),
            }
        }

        let cancelled_at = Instant::now();
        handle.cancel();
        loop {
            match handle.events().recv_timeout(RECV_TIMEOUT) {
                Ok(RunEvent::Stopped) => break,
                Ok(RunEvent::Started { .. }) => panic!("no new cycle after cancellation"),
                Ok(_) => continue,
                Err(e) => panic!("auto-run did not stop: {e}"),
            }
        }
        assert!(cancelled_at.elapsed() < POLL_INTERVAL * 3);
        handle.join();
    }

    #[test]
    fn test_auto_run_repeats_cycles() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a.jpg"), "x").unwrap();

        let handle = spawn_auto(
            job_for(temp_dir.path(), false, false),
            Duration::from_millis(10),
        )
        .unwrap();

        let mut finished = Vec::new();
        while finished.len() < 2 {
            match handle.events().recv_timeout(RECV_TIMEOUT) {
                Ok(RunEvent::Finished { cycle, result }) => finished.push((cycle, result)),
                Ok(_) => continue,
                Err(e) => panic!("auto-run stalled: {e}"),
            }
        }
        handle.cancel();
        handle.join();

        assert_eq!(finished[0].0, 1);
        assert_eq!(finished[0].1.total_moved(), 1);
        assert_eq!(finished[1].0, 2);
        assert_eq!(finished[1].1.total_moved(), 0);
    }

    #[test]
    fn test_auto_run_with_huge_interval_waits_and_stops() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let handle = spawn_auto(
            job_for(temp_dir.path(), true, false),
            Duration::from_secs(u64::MAX),
        )
        .unwrap();

        loop {
            match handle.events().recv_timeout(RECV_TIMEOUT) {
                Ok(RunEvent::Waiting { until }) => {
                    assert_eq!(until, None);
                    break;
                }
                Ok(_) => continue,
                Err(e) => panic!("auto-run never started waiting: {e}"),
            }
        }

        handle.cancel();
        loop {
            match handle.events().recv_timeout(RECV_TIMEOUT) {
                Ok(RunEvent::Stopped) => break,
                Ok(_) => continue,
                Err(e) => panic!("auto-run did not stop: {e}"),
            }
        }
        handle.join();
    }

    #[test]
    fn test_next_run_at_out_of_range() {
        assert!(next_run_at(Duration::from_secs(60)).is_some());
        assert_eq!(next_run_at(Duration::from_secs(1_000_000_000_000 * 60)), None);
    }
}
