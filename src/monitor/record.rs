//! Contention event records and their wire form

use serde::{Deserialize, Serialize};

/// One resolved call-stack level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrameDescriptor {
    #[serde(rename = "class")]
    pub declaring_class: String,
    #[serde(rename = "method")]
    pub method_name: String,
    pub signature: String,
}

impl StackFrameDescriptor {
    pub fn new(
        declaring_class: impl Into<String>,
        method_name: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            method_name: method_name.into(),
            signature: signature.into(),
        }
    }
}

/// Everything known about one sampled contention event.
///
/// Optional fields stay `None` when the host could not provide them and are
/// left out of the serialized form entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentionEventRecord {
    #[serde(rename = "Class")]
    pub class_name: String,
    #[serde(rename = "numTypeContentions")]
    pub occurrence_count: u64,
    #[serde(
        rename = "stackTrace",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stack_trace: Option<Vec<StackFrameDescriptor>>,
    #[serde(
        rename = "threadName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub thread_name: Option<String>,
    #[serde(rename = "threadID", default, skip_serializing_if = "Option::is_none")]
    pub os_thread_id: Option<i64>,
}

impl ContentionEventRecord {
    pub fn assemble(
        class_name: impl Into<String>,
        occurrence_count: u64,
        stack_trace: Option<Vec<StackFrameDescriptor>>,
        thread_name: Option<String>,
        os_thread_id: Option<i64>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            occurrence_count,
            stack_trace,
            thread_name,
            os_thread_id,
        }
    }

    /// Compact JSON, the payload handed to the sink
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
