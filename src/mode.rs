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

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Raw code the driver reports while the fan runs in fast mode
pub const RAW_FAST_REPORTED: u32 = 3;

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    Normal,
    Fast,
}

impl FanMode {
    /// Value carried by a write-mode request
    pub fn to_raw(self) -> u32 {
        match self {
            FanMode::Normal => 0,
            FanMode::Fast => 1,
        }
    }

    /// Decode a read-mode response. Only the fast code is recognised,
    /// everything else reads as normal.
    pub fn from_raw(raw: u32) -> Self {
        if raw == RAW_FAST_REPORTED {
            FanMode::Fast
        } else {
            FanMode::Normal
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanMode::Normal => f.write_str("NORMAL"),
            FanMode::Fast => f.write_str("FAST"),
        }
    }
}

/// A request to bring the fan to `target` and, for fast mode, keep it there.
/// `duration` of `None` holds until cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldRequest {
    target: FanMode,
    duration: Option<Duration>,
}

impl HoldRequest {
    pub fn new(target: FanMode, duration: Option<Duration>) -> Self {
        Self { target, duration }
    }

    pub fn fast(duration: Option<Duration>) -> Self {
        Self::new(FanMode::Fast, duration)
    }

    pub fn normal() -> Self {
        Self::new(FanMode::Normal, None)
    }

    /// Build from a command-line second count; negative means unbounded
    pub fn from_secs(target: FanMode, secs: i64) -> Self {
        let duration = u64::try_from(secs).ok().map(Duration::from_secs);
        Self::new(target, duration)
    }

    pub fn target(&self) -> FanMode {
        self.target
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}
