use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Status payload handed to progress callbacks.
///
/// Serializes as `{"thread_status": {"0": "..."}}`; the locator always
/// reports on slot 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub thread_status: BTreeMap<u32, String>,
}

impl ProgressReport {
    pub fn status(message: impl Into<String>) -> Self {
        let mut thread_status = BTreeMap::new();
        thread_status.insert(0, message.into());
        Self { thread_status }
    }

    pub fn message(&self) -> Option<&str> {
        self.thread_status.get(&0).map(String::as_str)
    }
}

pub type ProgressCallback<'a> = &'a mut dyn FnMut(&ProgressReport);
