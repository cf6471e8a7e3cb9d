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

//! Device channel to the fan control driver.
//!
//! The supervisor only ever talks to a [`DeviceChannel`]. [`EnergyDrv`] is the
//! real driver node, [`SimulatedDevice`] an in-memory stand-in used for dry
//! runs and tests.

pub mod protocol;
mod energy_drv;
mod simulated;

pub use energy_drv::{EnergyDrv, DEFAULT_DEVICE_PATH};
pub use simulated::{DeviceOp, SimulatedDevice};

use crate::error::Result;
use crate::mode::FanMode;

/// The two exchanges the fan driver supports. Implementations must not keep
/// a handle open between calls.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceChannel: Send + Sync {
    /// Issue a write-mode request. Success only means the driver accepted it.
    fn set_mode(&self, mode: FanMode) -> Result<()>;

    /// Issue a read-mode request and decode the reported mode.
    fn read_mode(&self) -> Result<FanMode>;
}

impl DeviceChannel for Box<dyn DeviceChannel> {
    fn set_mode(&self, mode: FanMode) -> Result<()> {
        (**self).set_mode(mode)
    }

    fn read_mode(&self) -> Result<FanMode> {
        (**self).read_mode()
    }
}
