use thiserror::Error;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("total upload size {total} bytes exceeds maximum {limit} bytes")]
pub struct TooLarge {
    pub total: u64,
    pub limit: u64,
}

/// Ceiling on the combined size of one upload batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimit {
    max_bytes: u64,
}

impl UploadLimit {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn check_total(&self, total: u64) -> Result<(), TooLarge> {
        if total > self.max_bytes {
            return Err(TooLarge { total, limit: self.max_bytes });
        }
        Ok(())
    }
}

impl Default for UploadLimit {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}
