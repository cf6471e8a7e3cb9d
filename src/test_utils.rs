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


//! Shared fixtures for unit tests

use std::sync::Arc;
use std::time::Duration;

use crate::clock::{ManualClock, SystemClock};
use crate::device::SimulatedDevice;
use crate::mode::FanMode;
use crate::supervisor::{Supervisor, SupervisorConfig};

/// Short intervals so threaded tests finish in milliseconds
pub fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        retry_interval: Duration::from_millis(5),
        tick: Duration::from_millis(20),
        max_confirm_attempts: Some(5),
    }
}

/// Supervisor on real time with [`fast_config`], for worker and front end tests
pub fn threaded_supervisor(
    initial: FanMode,
) -> (Arc<SimulatedDevice>, Arc<Supervisor<SimulatedDevice, SystemClock>>) {
    let dev = Arc::new(SimulatedDevice::new(initial));
    let sup = Supervisor::new(
        dev.clone(),
        SystemClock::with_slice(Duration::from_millis(2)),
        fast_config(),
    );
    (dev, Arc::new(sup))
}

/// Supervisor on virtual time with the default intervals
pub fn manual_supervisor(
    initial: FanMode,
) -> (Arc<SimulatedDevice>, Supervisor<SimulatedDevice, ManualClock>) {
    let dev = Arc::new(SimulatedDevice::new(initial));
    let sup = Supervisor::new(dev.clone(), ManualClock::new(), SupervisorConfig::default());
    (dev, sup)
}
