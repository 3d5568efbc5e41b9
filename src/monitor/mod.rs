//! Sampling lock-contention monitor
//!
//! [`ContentionMonitor::on_contended_entered`] is called by the host every
//! time a thread acquires a monitor after waiting for it. Admitted events are
//! tallied per type, optionally annotated with a bounded stack, and handed to
//! the [`Sink`] as one JSON record each.

pub mod metrics;
pub mod record;
pub mod sampling;
pub mod stack;
pub mod tally;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::host::{HostIntrospection, HostString};
use crate::sink::Sink;

pub use metrics::{MetricsSnapshot, MonitorMetrics};
pub use record::{ContentionEventRecord, StackFrameDescriptor};
pub use sampling::{MAX_TRACE_DEPTH, SamplingController};
pub use stack::{CapturedStack, FrameResolver, capture_stack};
pub use tally::ContentionTally;

/// What happened to a single contention event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Rejected by the sampling controller
    NotSampled,
    /// The contended object's type could not be resolved
    Unresolved,
    /// A record was handed to the sink
    Emitted { count: u64 },
    /// The record could not be serialized
    Dropped,
}

pub struct ContentionMonitor<H, S> {
    host: H,
    sink: S,
    sampling: Arc<SamplingController>,
    tally: ContentionTally,
    metrics: MonitorMetrics,
}

impl<H, S> ContentionMonitor<H, S>
where
    H: HostIntrospection,
    S: Sink,
{
    pub fn new(host: H, sink: S, sampling: Arc<SamplingController>) -> Self {
        Self {
            host,
            sink,
            sampling,
            tally: ContentionTally::new(),
            metrics: MonitorMetrics::new(),
        }
    }

    pub fn on_contended_entered(&self, thread: &H::Thread, object: &H::Object) -> EventOutcome {
        self.metrics.record_event();
        if !self.sampling.should_sample() {
            return EventOutcome::NotSampled;
        }
        self.metrics.record_sampled();

        let class_name = match self.host.object_class_name(object) {
            Ok(name) => name,
            Err(error) => {
                debug!(%error, "unable to resolve contended object type");
                self.metrics.record_unresolved();
                return EventOutcome::Unresolved;
            }
        };
        let count = self.tally.record_contention(&class_name);

        let stack_trace = self.stack_trace(thread);
        let thread_name = self.thread_name(thread);
        let os_thread_id = self.os_thread_id(thread);

        let record = ContentionEventRecord::assemble(
            class_name,
            count,
            stack_trace,
            thread_name,
            os_thread_id,
        );
        match record.to_payload() {
            Ok(payload) => {
                self.sink.send_to_server(payload);
                self.metrics.record_emitted();
                EventOutcome::Emitted { count }
            }
            Err(error) => {
                warn!(%error, class = %record.class_name, "failed to serialize contention record");
                self.metrics.record_dropped();
                EventOutcome::Dropped
            }
        }
    }

    fn stack_trace(&self, thread: &H::Thread) -> Option<Vec<StackFrameDescriptor>> {
        let depth = self.sampling.stack_trace_depth();
        if depth == 0 {
            return None;
        }
        let captured = capture_stack(&self.host, thread, depth);
        let truncated = captured.as_ref().is_some_and(|stack| stack.truncated);
        self.metrics
            .record_stack_attempt(captured.is_some(), truncated);
        if captured.is_none() || truncated {
            self.metrics.record_soft_failure();
        }
        captured.map(|stack| stack.frames)
    }

    fn thread_name(&self, thread: &H::Thread) -> Option<String> {
        match self.host.thread_info(thread) {
            Ok(info) => Some(HostString::new(&self.host, info.name).as_str().to_owned()),
            Err(error) => {
                debug!(%error, "unable to retrieve thread info");
                self.metrics.record_soft_failure();
                None
            }
        }
    }

    fn os_thread_id(&self, thread: &H::Thread) -> Option<i64> {
        match self.host.os_thread_id(thread) {
            Ok(id) => Some(id),
            Err(error) => {
                debug!(%error, "unable to retrieve OS thread id");
                self.metrics.record_soft_failure();
                None
            }
        }
    }

    pub fn sampling(&self) -> &Arc<SamplingController> {
        &self.sampling
    }

    pub fn tally(&self) -> &ContentionTally {
        &self.tally
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
