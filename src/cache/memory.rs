//! In-process cell backend.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use super::CellBackend;
use crate::dialog::ContentKey;
use crate::error::WorkflowError;

#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<ContentKey, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CellBackend for MemoryBackend {
    fn write(&self, key: &ContentKey, value: &str, _ttl: Duration) -> Result<(), WorkflowError> {
        self.values.lock().insert(key.clone(), value.to_string());
        Ok(())
    }

    fn read(&self, key: &ContentKey) -> Result<Option<String>, WorkflowError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn remove(&self, key: &ContentKey) -> Result<(), WorkflowError> {
        self.values.lock().remove(key);
        Ok(())
    }
}
