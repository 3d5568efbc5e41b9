//! Host runtime introspection boundary
//!
//! The monitor never talks to a runtime directly. Everything it needs to know
//! about the contended object and the contending thread is requested through
//! [`HostIntrospection`], so the same core can run inside a real agent or
//! against the deterministic [`crate::replay::ScriptedHost`].

use thiserror::Error;

/// Failure of a single introspection call
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("host call `{call}` failed with error code {code}")]
    Call { call: &'static str, code: i32 },
    #[error("host does not support `{0}`")]
    Unsupported(&'static str),
    #[error("stale or unknown handle passed to `{0}`")]
    InvalidHandle(&'static str),
}

impl HostError {
    pub fn call(call: &'static str, code: i32) -> Self {
        Self::Call { call, code }
    }
}

/// Name and signature of a method, both owned by the host
pub struct MethodName<B> {
    pub name: B,
    pub signature: B,
}

/// Thread metadata returned by [`HostIntrospection::thread_info`]
pub struct ThreadInfo<B> {
    pub name: B,
}

/// Capabilities the contention monitor needs from the host runtime.
///
/// Handle types are opaque to the monitor. String results come back as
/// host-owned [`HostIntrospection::Buffer`]s which must be handed back through
/// [`HostIntrospection::deallocate`]; wrap them in [`HostString`] to get that
/// for free on every exit path.
pub trait HostIntrospection: Send + Sync {
    type Thread;
    type Object;
    type Method;
    type Class;
    type Buffer: AsRef<str>;

    /// Fully qualified runtime type name of `object`, e.g. `java.lang.Object`
    fn object_class_name(&self, object: &Self::Object) -> Result<String, HostError>;

    /// Up to `max_depth` frames of `thread`, innermost first, starting at
    /// `start_depth`
    fn stack_trace(
        &self,
        thread: &Self::Thread,
        start_depth: usize,
        max_depth: usize,
    ) -> Result<Vec<Self::Method>, HostError>;

    fn method_name(&self, method: &Self::Method) -> Result<MethodName<Self::Buffer>, HostError>;

    fn method_declaring_class(&self, method: &Self::Method) -> Result<Self::Class, HostError>;

    fn class_signature(&self, class: &Self::Class) -> Result<Self::Buffer, HostError>;

    fn thread_info(&self, thread: &Self::Thread) -> Result<ThreadInfo<Self::Buffer>, HostError>;

    /// OS level id of `thread`. Hosts that expose this through an extension
    /// mechanism resolve the extension once, up front, and report
    /// [`HostError::Unsupported`] when it is missing.
    fn os_thread_id(&self, thread: &Self::Thread) -> Result<i64, HostError>;

    /// Release a buffer previously returned by this host
    fn deallocate(&self, buffer: Self::Buffer) -> Result<(), HostError>;
}

/// Host-owned string that is released back to its host when dropped
pub struct HostString<'h, H: HostIntrospection + ?Sized> {
    host: &'h H,
    buffer: Option<H::Buffer>,
}

impl<'h, H: HostIntrospection + ?Sized> HostString<'h, H> {
    pub fn new(host: &'h H, buffer: H::Buffer) -> Self {
        Self {
            host,
            buffer: Some(buffer),
        }
    }

    pub fn as_str(&self) -> &str {
        self.buffer.as_ref().map_or("", |buffer| buffer.as_ref())
    }
}

impl<H: HostIntrospection + ?Sized> Drop for HostString<'_, H> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take()
            && let Err(error) = self.host.deallocate(buffer)
        {
            tracing::debug!(%error, "unable to release host buffer");
        }
    }
}
