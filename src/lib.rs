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


//! Energyfan - laptop fan mode switcher for the EnergyDrv driver
//!
//! The driver exposes two fan modes. This library talks to its control node,
//! confirms every mode change by reading it back, and supervises timed fast
//! mode holds that always end with the fan back in normal mode.

pub mod app;
pub mod cancel;
pub mod cli;
pub mod clock;
pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod events;
pub mod logger;
pub mod mode;
pub mod supervisor;
pub mod toggle;
pub mod ui;
pub mod worker;

#[cfg(test)]
pub mod test_utils;
