//! Scripted host runtime
//!
//! [`ScriptedHost`] answers introspection calls from a [`Scenario`]: a fixed
//! set of objects, threads with their stacks, and a list of contention events
//! to replay. Failures can be injected per object, per thread and per frame.
//! The host counts every call it serves and every buffer it hands out, so
//! callers can check that buffers come back.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::host::{HostError, HostIntrospection, MethodName, ThreadInfo};

/// Error code reported for injected failures
const INJECTED_FAILURE: i32 = 112;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("event {event} references unknown thread {thread}")]
    UnknownThread { event: usize, thread: usize },
    #[error("event {event} references unknown object {object}")]
    UnknownObject { event: usize, object: usize },
}

/// Which step of frame resolution should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFailure {
    MethodName,
    DeclaringClass,
    ClassSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpec {
    pub class: String,
    pub method: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<FrameFailure>,
}

impl FrameSpec {
    pub fn new(
        class: impl Into<String>,
        method: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
            signature: signature.into(),
            fail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_thread_id: Option<i64>,
    #[serde(default)]
    pub frames: Vec<FrameSpec>,
    #[serde(default)]
    pub fail_stack_trace: bool,
    #[serde(default)]
    pub fail_thread_info: bool,
}

impl ThreadSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            os_thread_id: None,
            frames: Vec::new(),
            fail_stack_trace: false,
            fail_thread_info: false,
        }
    }

    pub fn with_os_thread_id(mut self, id: i64) -> Self {
        self.os_thread_id = Some(id);
        self
    }

    pub fn with_frames(mut self, frames: Vec<FrameSpec>) -> Self {
        self.frames = frames;
        self
    }

    pub fn failing_stack_trace(mut self) -> Self {
        self.fail_stack_trace = true;
        self
    }

    pub fn failing_thread_info(mut self) -> Self {
        self.fail_thread_info = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub class: String,
    #[serde(default)]
    pub fail: bool,
}

impl ObjectSpec {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

/// One contention event: `thread` entered the monitor of `object`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpec {
    pub thread: usize,
    pub object: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub threads: Vec<ThreadSpec>,
    #[serde(default)]
    pub events: Vec<EventSpec>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let source = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source)
    }

    pub fn from_json(source: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn with_object(mut self, object: ObjectSpec) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_thread(mut self, thread: ThreadSpec) -> Self {
        self.threads.push(thread);
        self
    }

    pub fn with_event(mut self, thread: usize, object: usize) -> Self {
        self.events.push(EventSpec { thread, object });
        self
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        for (event, spec) in self.events.iter().enumerate() {
            if spec.thread >= self.threads.len() {
                return Err(ScenarioError::UnknownThread {
                    event,
                    thread: spec.thread,
                });
            }
            if spec.object >= self.objects.len() {
                return Err(ScenarioError::UnknownObject {
                    event,
                    object: spec.object,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadRef(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef {
    thread: usize,
    frame: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassRef {
    thread: usize,
    frame: usize,
}

/// String lent out by the scripted host
#[derive(Debug)]
pub struct ScriptedBuffer(String);

impl AsRef<str> for ScriptedBuffer {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct ScriptedHost {
    scenario: Scenario,
    calls: AtomicUsize,
    outstanding: AtomicUsize,
}

impl ScriptedHost {
    pub fn new(scenario: Scenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        Ok(Self {
            scenario,
            calls: AtomicUsize::new(0),
            outstanding: AtomicUsize::new(0),
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Events to replay, in scenario order
    pub fn events(&self) -> impl Iterator<Item = (ThreadRef, ObjectRef)> + '_ {
        self.scenario
            .events
            .iter()
            .map(|event| (ThreadRef(event.thread), ObjectRef(event.object)))
    }

    /// Introspection calls served so far, deallocations excluded
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Buffers handed out and not yet returned
    pub fn outstanding_buffers(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }

    fn call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn lend(&self, value: &str) -> ScriptedBuffer {
        self.outstanding.fetch_add(1, Ordering::Relaxed);
        ScriptedBuffer(value.to_owned())
    }

    fn thread(&self, thread: &ThreadRef, call: &'static str) -> Result<&ThreadSpec, HostError> {
        self.scenario
            .threads
            .get(thread.0)
            .ok_or(HostError::InvalidHandle(call))
    }

    fn frame(
        &self,
        thread: usize,
        frame: usize,
        call: &'static str,
    ) -> Result<&FrameSpec, HostError> {
        self.scenario
            .threads
            .get(thread)
            .and_then(|spec| spec.frames.get(frame))
            .ok_or(HostError::InvalidHandle(call))
    }
}

impl HostIntrospection for ScriptedHost {
    type Thread = ThreadRef;
    type Object = ObjectRef;
    type Method = MethodRef;
    type Class = ClassRef;
    type Buffer = ScriptedBuffer;

    fn object_class_name(&self, object: &ObjectRef) -> Result<String, HostError> {
        self.call();
        let spec = self
            .scenario
            .objects
            .get(object.0)
            .ok_or(HostError::InvalidHandle("GetObjectClass"))?;
        if spec.fail {
            return Err(HostError::call("GetObjectClass", INJECTED_FAILURE));
        }
        Ok(spec.class.clone())
    }

    fn stack_trace(
        &self,
        thread: &ThreadRef,
        start_depth: usize,
        max_depth: usize,
    ) -> Result<Vec<MethodRef>, HostError> {
        self.call();
        let spec = self.thread(thread, "GetStackTrace")?;
        if spec.fail_stack_trace {
            return Err(HostError::call("GetStackTrace", INJECTED_FAILURE));
        }
        let available = spec.frames.len();
        let start = start_depth.min(available);
        let end = start.saturating_add(max_depth).min(available);
        Ok((start..end)
            .map(|frame| MethodRef {
                thread: thread.0,
                frame,
            })
            .collect())
    }

    fn method_name(&self, method: &MethodRef) -> Result<MethodName<ScriptedBuffer>, HostError> {
        self.call();
        let frame = self.frame(method.thread, method.frame, "GetMethodName")?;
        if frame.fail == Some(FrameFailure::MethodName) {
            return Err(HostError::call("GetMethodName", INJECTED_FAILURE));
        }
        Ok(MethodName {
            name: self.lend(&frame.method),
            signature: self.lend(&frame.signature),
        })
    }

    fn method_declaring_class(&self, method: &MethodRef) -> Result<ClassRef, HostError> {
        self.call();
        let frame = self.frame(method.thread, method.frame, "GetMethodDeclaringClass")?;
        if frame.fail == Some(FrameFailure::DeclaringClass) {
            return Err(HostError::call("GetMethodDeclaringClass", INJECTED_FAILURE));
        }
        Ok(ClassRef {
            thread: method.thread,
            frame: method.frame,
        })
    }

    fn class_signature(&self, class: &ClassRef) -> Result<ScriptedBuffer, HostError> {
        self.call();
        let frame = self.frame(class.thread, class.frame, "GetClassSignature")?;
        if frame.fail == Some(FrameFailure::ClassSignature) {
            return Err(HostError::call("GetClassSignature", INJECTED_FAILURE));
        }
        Ok(self.lend(&frame.class))
    }

    fn thread_info(&self, thread: &ThreadRef) -> Result<ThreadInfo<ScriptedBuffer>, HostError> {
        self.call();
        let spec = self.thread(thread, "GetThreadInfo")?;
        if spec.fail_thread_info {
            return Err(HostError::call("GetThreadInfo", INJECTED_FAILURE));
        }
        Ok(ThreadInfo {
            name: self.lend(&spec.name),
        })
    }

    fn os_thread_id(&self, thread: &ThreadRef) -> Result<i64, HostError> {
        self.call();
        self.thread(thread, "GetOSThreadID")?
            .os_thread_id
            .ok_or(HostError::Unsupported("GetOSThreadID"))
    }

    fn deallocate(&self, buffer: ScriptedBuffer) -> Result<(), HostError> {
        drop(buffer);
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }
}
