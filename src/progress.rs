use std::{
    ops::Range,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, PoisonError,
    },
    time::{Duration, Instant},
};

use crate::migrate::MigrationState;

#[derive(Debug, Clone, Default)]
pub struct ProgressStats {
    pub step: usize,
    pub num_steps: usize,
    pub bytes: usize,
    pub read: Duration,
    pub write: Duration,
}

/// An operator facing migration event.
///
/// Events carry no correctness semantics.
#[derive(Debug)]
pub enum ProgressEvent<'a> {
    /// The migration has entered a new state.
    StateChanged(MigrationState),
    /// An array copy has started.
    ArrayStarted {
        index: usize,
        num_arrays: usize,
        name: &'a str,
        shape: &'a [u64],
        size_bytes: Option<u64>,
    },
    /// A window along the leading axis of an array has been copied.
    WindowCopied {
        name: &'a str,
        window: Range<u64>,
        stats: ProgressStats,
    },
    /// All windows of an array have been copied.
    ArrayFinished { name: &'a str, stats: ProgressStats },
}

/// Tracks the window progress and read/write durations of a single array copy.
pub struct Progress<'a> {
    name: &'a str,
    progress_callback: &'a ProgressCallback<'a>,
    step: AtomicUsize,
    num_steps: usize,
    bytes: AtomicUsize,
    duration_read: Mutex<Duration>,
    duration_write: Mutex<Duration>,
}

impl<'a> Progress<'a> {
    pub fn new(name: &'a str, num_steps: usize, progress_callback: &'a ProgressCallback) -> Self {
        Self {
            name,
            progress_callback,
            step: AtomicUsize::new(0),
            num_steps,
            bytes: AtomicUsize::new(0),
            duration_read: Mutex::new(Duration::ZERO),
            duration_write: Mutex::new(Duration::ZERO),
        }
    }

    pub fn read<F: FnOnce() -> T, T>(&self, f: F) -> T {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        *self
            .duration_read
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += elapsed;
        result
    }

    pub fn write<F: FnOnce() -> T, T>(&self, f: F) -> T {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        *self
            .duration_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += elapsed;
        result
    }

    pub fn stats(&self) -> ProgressStats {
        ProgressStats {
            step: self.step.load(Ordering::SeqCst),
            num_steps: self.num_steps,
            bytes: self.bytes.load(Ordering::SeqCst),
            read: *self
                .duration_read
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            write: *self
                .duration_write
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Mark `window` (holding `bytes` bytes) as copied.
    pub fn next(&self, window: Range<u64>, bytes: usize) {
        self.bytes.fetch_add(bytes, Ordering::SeqCst);
        self.step.fetch_add(1, Ordering::SeqCst);
        self.progress_callback.update(ProgressEvent::WindowCopied {
            name: self.name,
            window,
            stats: self.stats(),
        });
    }

    pub fn finish(&self) -> ProgressStats {
        let stats = self.stats();
        self.progress_callback.update(ProgressEvent::ArrayFinished {
            name: self.name,
            stats: stats.clone(),
        });
        stats
    }
}

pub struct ProgressCallback<'a> {
    callback: &'a (dyn Fn(ProgressEvent) + Send + Sync),
}

impl<'a> ProgressCallback<'a> {
    pub fn new(callback: &'a (dyn Fn(ProgressEvent) + Send + Sync)) -> Self {
        Self { callback }
    }

    pub fn update(&self, event: ProgressEvent) {
        (self.callback)(event);
    }
}

fn ignore_progress(_event: ProgressEvent) {}

impl Default for ProgressCallback<'_> {
    fn default() -> Self {
        Self {
            callback: &ignore_progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_events() {
        let events = Mutex::new(Vec::new());
        let update = |event: ProgressEvent| {
            if let ProgressEvent::WindowCopied { window, stats, .. } = event {
                events.lock().unwrap().push((window, stats.step, stats.bytes));
            }
        };
        let callback = ProgressCallback::new(&update);
        let progress = Progress::new("a", 2, &callback);
        assert_eq!(progress.read(|| 1 + 1), 2);
        progress.write(|| ());
        progress.next(0..5, 40);
        progress.next(5..7, 16);
        let stats = progress.finish();
        assert_eq!(stats.step, 2);
        assert_eq!(stats.num_steps, 2);
        assert_eq!(stats.bytes, 56);
        assert_eq!(
            events.into_inner().unwrap(),
            vec![(0..5, 1, 40), (5..7, 2, 56)]
        );
    }
}
