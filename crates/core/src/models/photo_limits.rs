//! Per-group photo submission limits

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hard ceiling on any configured file size (10 MiB)
pub const MAXIMUM_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
/// Hard ceiling on any configured long edge (8K)
pub const MAXIMUM_RESOLUTION_PIXELS: u32 = 7680;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoLimits {
    max_submissions_per_member: u32,
    max_file_size_bytes: u64,
    max_long_edge_pixels: u32,
}

impl PhotoLimits {
    pub fn new(
        max_submissions_per_member: u32,
        max_file_size_bytes: u64,
        max_long_edge_pixels: u32,
    ) -> Result<Self> {
        if max_submissions_per_member == 0 {
            return Err(Error::validation(
                "members must be able to submit at least one photo",
            ));
        }

        if max_file_size_bytes == 0 || max_file_size_bytes > MAXIMUM_FILE_SIZE_BYTES {
            return Err(Error::validation(format!(
                "file size limit must be between 1 and {MAXIMUM_FILE_SIZE_BYTES} bytes"
            )));
        }

        if max_long_edge_pixels == 0 || max_long_edge_pixels > MAXIMUM_RESOLUTION_PIXELS {
            return Err(Error::validation(format!(
                "resolution limit must be between 1 and {MAXIMUM_RESOLUTION_PIXELS} pixels"
            )));
        }

        Ok(Self {
            max_submissions_per_member,
            max_file_size_bytes,
            max_long_edge_pixels,
        })
    }

    pub fn max_submissions_per_member(&self) -> u32 {
        self.max_submissions_per_member
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    pub fn max_long_edge_pixels(&self) -> u32 {
        self.max_long_edge_pixels
    }
}

impl Default for PhotoLimits {
    fn default() -> Self {
        Self {
            max_submissions_per_member: 1,
            max_file_size_bytes: MAXIMUM_FILE_SIZE_BYTES,
            max_long_edge_pixels: MAXIMUM_RESOLUTION_PIXELS,
        }
    }
}
