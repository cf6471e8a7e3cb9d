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

//! Turning a front-end command into a request for the supervisor.
//!
//! Nothing is planned without a known starting state: if the initial read
//! fails the command is abandoned before any write.

use std::time::Duration;

use tracing::debug;

use crate::device::DeviceChannel;
use crate::error::{FanError, Result};
use crate::mode::{FanMode, HoldRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCommand {
    Normal,
    Fast,
    Toggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    /// Fan is normal: start a fast-mode hold
    HoldFast,
    /// Fan is fast: converge back to normal
    RestoreNormal,
}

pub fn decide(current: FanMode) -> ToggleAction {
    match current {
        FanMode::Normal => ToggleAction::HoldFast,
        FanMode::Fast => ToggleAction::RestoreNormal,
    }
}

/// Read the starting state. Any failure becomes `StateUnknown`.
pub fn read_initial_mode<D: DeviceChannel + ?Sized>(device: &D) -> Result<FanMode> {
    device
        .read_mode()
        .map_err(|e| FanError::StateUnknown(Box::new(e)))
}

pub fn plan(command: ModeCommand, current: FanMode, duration: Option<Duration>) -> HoldRequest {
    let request = match command {
        ModeCommand::Normal => HoldRequest::normal(),
        ModeCommand::Fast => HoldRequest::fast(duration),
        ModeCommand::Toggle => match decide(current) {
            ToggleAction::HoldFast => HoldRequest::fast(duration),
            ToggleAction::RestoreNormal => HoldRequest::normal(),
        },
    };
    debug!("{:?} with fan at {} planned as {:?}", command, current, request);
    request
}

/// Read the starting state and plan `command` against it
pub fn prepare<D: DeviceChannel + ?Sized>(
    device: &D,
    command: ModeCommand,
    duration: Option<Duration>,
) -> Result<(FanMode, HoldRequest)> {
    let current = read_initial_mode(device)?;
    Ok((current, plan(command, current, duration)))
}
