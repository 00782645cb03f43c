use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct JobProgress {
    pub total_files: u64,
    pub processed_files: u64,
    pub total_bytes: u64,
    pub processed_bytes: u64,
    pub current_item: Option<String>,
    pub estimated_seconds_remaining: Option<u64>,
}

impl JobProgress {
    pub fn new(total_files: u64, processed_files: u64, total_bytes: u64, processed_bytes: u64) -> Self {
        Self {
            total_files,
            processed_files,
            total_bytes,
            processed_bytes,
            current_item: None,
            estimated_seconds_remaining: None,
        }
    }

    pub fn with_current_item(mut self, item: impl Into<String>) -> Self {
        self.current_item = Some(item.into());
        self
    }

    pub fn with_estimate(mut self, seconds: u64) -> Self {
        self.estimated_seconds_remaining = Some(seconds);
        self
    }

    /// Both fractions lie in [0,1]. A zero total only admits zero processed.
    pub fn is_within_bounds(&self) -> bool {
        self.processed_files <= self.total_files && self.processed_bytes <= self.total_bytes
    }

    pub fn clamped(mut self) -> Self {
        self.processed_files = self.processed_files.min(self.total_files);
        self.processed_bytes = self.processed_bytes.min(self.total_bytes);
        self
    }
}
