//! Configuration types for StripeIO
//!
//! This module defines configuration structures shared across components.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Erasure coding configuration
///
/// A block is split into `data_parts` equally sized parts, from which
/// `code_parts` parity parts are computed. Any `data_parts` of the
/// `data_parts + code_parts` total suffice for reconstruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErasureConfig {
    /// Number of data parts (k)
    pub data_parts: u8,
    /// Number of code (parity) parts (m)
    pub code_parts: u8,
}

impl ErasureConfig {
    /// Create a new erasure config
    #[must_use]
    pub const fn new(data_parts: u8, code_parts: u8) -> Self {
        Self {
            data_parts,
            code_parts,
        }
    }

    /// 4 data parts + 2 code parts
    pub const EC_4_2: Self = Self::new(4, 2);

    /// 8 data parts + 4 code parts
    pub const EC_8_4: Self = Self::new(8, 4);

    /// Total number of parts (k + m)
    #[must_use]
    pub fn total_parts(&self) -> u16 {
        u16::from(self.data_parts) + u16::from(self.code_parts)
    }

    /// Storage efficiency (k / (k + m))
    #[must_use]
    pub fn efficiency(&self) -> f64 {
        f64::from(self.data_parts) / f64::from(self.total_parts())
    }

    /// Check that the configuration describes a usable code
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if either count is zero.
    pub fn validate(&self) -> Result<()> {
        if self.data_parts == 0 {
            return Err(Error::invalid_argument("data_parts must be > 0"));
        }
        if self.code_parts == 0 {
            return Err(Error::invalid_argument("code_parts must be > 0"));
        }
        Ok(())
    }
}

impl Default for ErasureConfig {
    fn default() -> Self {
        Self::EC_4_2
    }
}
