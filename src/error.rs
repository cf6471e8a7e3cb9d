/*
 * This file is part of Energyfan.
 *
 * Copyright (C) 2025 Energyfan contributors
 *
 * Energyfan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Energyfan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Energyfan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Unified error handling for Energyfan
//!
//! One error type shared by the device channel, the supervisor, the
//! configuration layer and both front ends.

use std::io;
use std::path::PathBuf;

/// Result type alias using FanError
pub type Result<T> = std::result::Result<T, FanError>;

/// Unified error type for all Energyfan operations
#[derive(thiserror::Error, Debug)]
pub enum FanError {
    // ============================================================================
    // Device Channel Errors
    // ============================================================================
    #[error("Failed to open {path}: {source}")]
    DeviceOpen {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Device request {request} failed: {reason}")]
    DeviceIo {
        request: &'static str,
        reason: String,
    },

    #[error("Fan state unknown, no mode change attempted: {0}")]
    StateUnknown(#[source] Box<FanError>),

    #[error("Operation cancelled")]
    Cancelled,

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FanError {
    /// Create a device I/O error for the named request
    pub fn device_io(request: &'static str, reason: impl Into<String>) -> Self {
        Self::DeviceIo {
            request,
            reason: reason.into(),
        }
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid config value error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Failures of a single exchange that the confirm-loop retries
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DeviceOpen { .. } | Self::DeviceIo { .. })
    }
}
