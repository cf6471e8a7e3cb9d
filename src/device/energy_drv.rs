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

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::protocol::{self, IOCTL_READ_MODE, IOCTL_WRITE_MODE};
use super::DeviceChannel;
use crate::error::{FanError, Result};
use crate::mode::FanMode;

pub const DEFAULT_DEVICE_PATH: &str = "/dev/EnergyDrv";

/// Control device node of the vendor fan driver.
///
/// A handle is opened for each exchange and closed when the `File` drops,
/// so nothing stays open between calls or after a failed request.
#[derive(Debug, Clone)]
pub struct EnergyDrv {
    path: PathBuf,
}

impl EnergyDrv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self, write: bool) -> Result<File> {
        OpenOptions::new()
            .read(!write)
            .write(write)
            .open(&self.path)
            .map_err(|source| FanError::DeviceOpen {
                path: self.path.clone(),
                source,
            })
    }

    fn control(file: &File, request: &'static str, code: u32, buf: &mut [u8]) -> Result<()> {
        // SAFETY: `buf` is a live, exclusively borrowed buffer sized for the
        // request layout the driver expects for `code`.
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), code as _, buf.as_mut_ptr()) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            return Err(FanError::device_io(request, err.to_string()));
        }
        Ok(())
    }
}

impl Default for EnergyDrv {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_PATH)
    }
}

impl DeviceChannel for EnergyDrv {
    fn set_mode(&self, mode: FanMode) -> Result<()> {
        let file = self.open(true)?;
        let mut buf = protocol::encode_write_mode(mode);
        Self::control(&file, "write-mode", IOCTL_WRITE_MODE, &mut buf)?;
        debug!("write-mode {} accepted by {}", mode, self.path.display());
        Ok(())
    }

    fn read_mode(&self) -> Result<FanMode> {
        let file = self.open(false)?;
        // The driver answers in place, overwriting the request word.
        let mut buf = protocol::encode_read_mode();
        Self::control(&file, "read-mode", IOCTL_READ_MODE, &mut buf)?;
        let raw = protocol::decode_read_mode_raw(&buf)?;
        debug!("read-mode returned raw code {} from {}", raw, self.path.display());
        Ok(FanMode::from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_path() {
        assert_eq!(EnergyDrv::default().path(), Path::new("/dev/EnergyDrv"));
    }

    #[test]
    fn test_missing_node_is_open_failure() {
        let dir = TempDir::new().unwrap();
        let drv = EnergyDrv::new(dir.path().join("EnergyDrv"));

        let err = drv.read_mode().unwrap_err();
        assert!(matches!(err, FanError::DeviceOpen { .. }));
        let err = drv.set_mode(FanMode::Fast).unwrap_err();
        assert!(matches!(err, FanError::DeviceOpen { .. }));
    }

    #[test]
    fn test_regular_file_rejects_control_requests() {
        // A plain file opens fine but has no ioctl handler (ENOTTY).
        let file = NamedTempFile::new().unwrap();
        let drv = EnergyDrv::new(file.path());

        let err = drv.read_mode().unwrap_err();
        assert!(matches!(err, FanError::DeviceIo { request: "read-mode", .. }));
        let err = drv.set_mode(FanMode::Normal).unwrap_err();
        assert!(matches!(err, FanError::DeviceIo { request: "write-mode", .. }));
    }

    #[test]
    fn test_open_failure_names_path() {
        let drv = EnergyDrv::new("/nonexistent/energyfan/EnergyDrv");
        let msg = drv.read_mode().unwrap_err().to_string();
        assert!(msg.contains("/nonexistent/energyfan/EnergyDrv"));
    }
}
