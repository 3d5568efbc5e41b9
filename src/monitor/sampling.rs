use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};

/// Deepest stack the monitor will ever request from the host
pub const MAX_TRACE_DEPTH: usize = 128;

/// Shared sampling state consulted on every contention event.
///
/// All fields are independent atomics. A rate change racing with a sampling
/// decision may admit or reject one event incorrectly, which is tolerated.
#[derive(Debug)]
pub struct SamplingController {
    enabled: AtomicBool,
    rate: AtomicI32,
    counter: AtomicU64,
    depth: AtomicUsize,
}

impl SamplingController {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_stack_trace_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// A positive rate enables the monitor and samples one event in `rate`.
    /// Zero or negative disables it and keeps the previous rate.
    pub fn set_sample_rate(&self, rate: i32) {
        if rate > 0 {
            self.enabled.store(true, Ordering::Relaxed);
            self.rate.store(rate, Ordering::Relaxed);
        } else {
            self.enabled.store(false, Ordering::Relaxed);
        }
    }

    /// Clamped to `[0, MAX_TRACE_DEPTH]`
    pub fn set_stack_trace_depth(&self, depth: i32) {
        let depth = usize::try_from(depth).unwrap_or(0).min(MAX_TRACE_DEPTH);
        self.depth.store(depth, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn sample_rate(&self) -> i32 {
        self.rate.load(Ordering::Relaxed)
    }

    pub fn stack_trace_depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Number of sampling decisions taken, disabled ones included
    pub fn decisions(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Admits every `rate`-th event, counting from the first one. The
    /// counter advances on every call, so a disabled stretch keeps the phase.
    pub fn should_sample(&self) -> bool {
        let previous = self.counter.fetch_add(1, Ordering::Relaxed);
        if !self.is_enabled() {
            return false;
        }

        let rate = self.rate.load(Ordering::Relaxed);
        if rate <= 0 {
            return false;
        }
        previous % u64::from(rate.unsigned_abs()) == 0
    }
}

impl Default for SamplingController {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            rate: AtomicI32::new(1),
            counter: AtomicU64::new(0),
            depth: AtomicUsize::new(0),
        }
    }
}
