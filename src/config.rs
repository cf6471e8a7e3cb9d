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

use std::env;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::DEFAULT_DEVICE_PATH;
use crate::error::{FanError, Result};
use crate::supervisor::{
    SupervisorConfig, DEFAULT_MAX_CONFIRM_ATTEMPTS, DEFAULT_RETRY_INTERVAL, DEFAULT_TICK,
};
use crate::clock::DEFAULT_SLEEP_SLICE;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Control node of the fan driver
    pub device_path: PathBuf,
    pub retry_interval_ms: u64,
    pub tick_ms: u64,
    /// `null` retries a confirm-loop forever
    pub max_confirm_attempts: Option<u32>,
    /// Granularity at which sleeps notice cancellation
    pub sleep_slice_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
            retry_interval_ms: DEFAULT_RETRY_INTERVAL.as_millis() as u64,
            tick_ms: DEFAULT_TICK.as_millis() as u64,
            max_confirm_attempts: Some(DEFAULT_MAX_CONFIRM_ATTEMPTS),
            sleep_slice_ms: DEFAULT_SLEEP_SLICE.as_millis() as u64,
        }
    }
}

impl Settings {
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            tick: Duration::from_millis(self.tick_ms),
            max_confirm_attempts: self.max_confirm_attempts,
        }
    }

    pub fn sleep_slice(&self) -> Duration {
        Duration::from_millis(self.sleep_slice_ms)
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("energyfan").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("energyfan")
            .join("config.json");
    }
    PathBuf::from("/etc/energyfan/config.json")
}

pub fn validate_settings(s: &Settings) -> Result<()> {
    if s.device_path.as_os_str().is_empty() {
        return Err(FanError::invalid_config("device_path", "must not be empty"));
    }
    if s.retry_interval_ms == 0 {
        return Err(FanError::invalid_config("retry_interval_ms", "must be greater than zero"));
    }
    if s.tick_ms == 0 {
        return Err(FanError::invalid_config("tick_ms", "must be greater than zero"));
    }
    if s.sleep_slice_ms == 0 {
        return Err(FanError::invalid_config("sleep_slice_ms", "must be greater than zero"));
    }
    if s.sleep_slice_ms > s.tick_ms {
        return Err(FanError::invalid_config("sleep_slice_ms", "must not exceed tick_ms"));
    }
    if s.max_confirm_attempts == Some(0) {
        return Err(FanError::invalid_config(
            "max_confirm_attempts",
            "must be at least 1, or null for no limit",
        ));
    }
    Ok(())
}

/// Load settings from `path`. A missing file gives the defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no settings at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        Err(e) => return Err(e.into()),
    };
    let settings: Settings = serde_json::from_str(&data)?;
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&config_path())
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    validate_settings(settings)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    let perms = fs::Permissions::from_mode(0o644);
    let _ = fs::set_permissions(path, perms);
    Ok(())
}
