//! Bounded stack capture for sampled contention events
//!
//! Frames are pulled from the host once, then resolved lazily one at a time.
//! Resolution stops at the first frame the host cannot describe; whatever was
//! resolved before it is kept.

use std::iter::FusedIterator;

use tracing::debug;

use super::record::StackFrameDescriptor;
use super::sampling::MAX_TRACE_DEPTH;
use crate::host::{HostError, HostIntrospection, HostString, MethodName};

/// Frames resolved for one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedStack {
    pub frames: Vec<StackFrameDescriptor>,
    /// Resolution stopped early on a host failure
    pub truncated: bool,
}

/// Resolves raw host frames into descriptors, fusing on the first failure
pub struct FrameResolver<'h, H: HostIntrospection + ?Sized> {
    host: &'h H,
    methods: std::vec::IntoIter<H::Method>,
    failure: Option<HostError>,
}

impl<'h, H: HostIntrospection + ?Sized> FrameResolver<'h, H> {
    pub fn new(host: &'h H, methods: Vec<H::Method>) -> Self {
        Self {
            host,
            methods: methods.into_iter(),
            failure: None,
        }
    }

    /// The error that ended resolution, if any
    pub fn failure(&self) -> Option<&HostError> {
        self.failure.as_ref()
    }
}

impl<H: HostIntrospection + ?Sized> Iterator for FrameResolver<'_, H> {
    type Item = StackFrameDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failure.is_some() {
            return None;
        }
        let method = self.methods.next()?;
        match resolve_frame(self.host, &method) {
            Ok(frame) => Some(frame),
            Err(error) => {
                self.failure = Some(error);
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failure.is_some() {
            (0, Some(0))
        } else {
            (0, Some(self.methods.len()))
        }
    }
}

impl<H: HostIntrospection + ?Sized> FusedIterator for FrameResolver<'_, H> {}

fn resolve_frame<H: HostIntrospection + ?Sized>(
    host: &H,
    method: &H::Method,
) -> Result<StackFrameDescriptor, HostError> {
    let MethodName { name, signature } = host.method_name(method)?;
    let name = HostString::new(host, name);
    let signature = HostString::new(host, signature);

    let class = host.method_declaring_class(method)?;
    let class_signature = HostString::new(host, host.class_signature(&class)?);

    Ok(StackFrameDescriptor::new(
        class_signature.as_str(),
        name.as_str(),
        signature.as_str(),
    ))
}

/// Capture up to `max_depth` frames of `thread`.
///
/// Returns `None` without touching the host when `max_depth` is zero, and
/// `None` when the host fails or no frame could be resolved.
pub fn capture_stack<H: HostIntrospection + ?Sized>(
    host: &H,
    thread: &H::Thread,
    max_depth: usize,
) -> Option<CapturedStack> {
    if max_depth == 0 {
        return None;
    }
    let max_depth = max_depth.min(MAX_TRACE_DEPTH);

    let mut methods = match host.stack_trace(thread, 0, max_depth) {
        Ok(methods) if !methods.is_empty() => methods,
        Ok(_) => return None,
        Err(error) => {
            debug!(%error, "unable to retrieve stack trace");
            return None;
        }
    };
    methods.truncate(max_depth);

    let mut resolver = FrameResolver::new(host, methods);
    let frames: Vec<_> = resolver.by_ref().collect();
    let truncated = match resolver.failure() {
        Some(error) => {
            debug!(%error, resolved = frames.len(), "stack trace truncated");
            true
        }
        None => false,
    };

    if frames.is_empty() {
        return None;
    }
    Some(CapturedStack { frames, truncated })
}
