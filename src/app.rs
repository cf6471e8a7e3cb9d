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

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::device::DeviceChannel;
use crate::error::{FanError, Result};
use crate::mode::{FanMode, HoldRequest};
use crate::supervisor::{HoldReport, HoldState, Supervisor};
use crate::toggle::{self, ToggleAction};
use crate::worker::HoldWorker;

/// State of the terminal UI.
///
/// The device is only read while no hold worker is running; during a hold
/// the worker owns the device and the UI shows the supervisor state instead.
pub struct App<D, C> {
    supervisor: Arc<Supervisor<D, C>>,
    worker: Option<HoldWorker>,
    /// Length of holds started by `toggle`; `None` holds until stopped
    pub hold_duration: Option<Duration>,
    pub mode: Option<FanMode>,
    pub status: String,
    pub last_refresh: Instant,
    pub refresh_interval: Duration,
    pub should_quit: bool,
}

impl<D, C> App<D, C>
where
    D: DeviceChannel + 'static,
    C: Clock + 'static,
{
    pub fn new(supervisor: Arc<Supervisor<D, C>>) -> Self {
        Self {
            supervisor,
            worker: None,
            hold_duration: None,
            mode: None,
            status: "Checking fan status...".to_string(),
            last_refresh: Instant::now(),
            refresh_interval: Duration::from_millis(1000),
            should_quit: false,
        }
    }

    pub fn with_hold_duration(mut self, duration: Option<Duration>) -> Self {
        self.hold_duration = duration;
        self
    }

    pub fn is_holding(&self) -> bool {
        self.worker.is_some()
    }

    /// Supervisor state while a hold is running
    pub fn hold_state(&self) -> Option<HoldState> {
        self.worker.as_ref().map(|_| self.supervisor.state())
    }

    fn set_mode_status(&mut self, mode: FanMode) {
        self.mode = Some(mode);
        self.status = format!("Fan mode: {}", mode);
    }

    fn finish_hold(&mut self, result: Result<Option<HoldReport>>) {
        match result {
            Ok(report) => {
                if let Some(r) = report {
                    info!("hold ended: {:?}", r.outcome);
                }
                self.set_mode_status(FanMode::Normal);
            }
            Err(e) => {
                warn!("hold failed: {}", e);
                self.mode = None;
                self.status = format!("Failed to restore {} mode: {}", FanMode::Normal, e);
            }
        }
    }

    /// Re-read the device, or collect a hold that ended on its own
    pub fn refresh(&mut self) {
        self.last_refresh = Instant::now();

        if let Some(worker) = self.worker.take() {
            if worker.is_finished() {
                self.finish_hold(worker.join());
            } else {
                self.worker = Some(worker);
                return;
            }
        }

        match self.supervisor.device().read_mode() {
            Ok(mode) => self.set_mode_status(mode),
            Err(e) => {
                warn!("state refresh failed: {}", e);
                self.mode = None;
                self.status = "Unknown fan state.".to_string();
            }
        }
    }

    /// Start a fast hold from normal mode, otherwise go back to normal
    pub fn toggle(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.finish_hold(worker.stop());
            return;
        }

        let current = match toggle::read_initial_mode(self.supervisor.device().as_ref()) {
            Ok(mode) => mode,
            Err(e) => {
                warn!("{}", e);
                self.mode = None;
                self.status = "Error reading fan state.".to_string();
                return;
            }
        };

        match toggle::decide(current) {
            ToggleAction::HoldFast => {
                match HoldWorker::spawn(self.supervisor.clone(), HoldRequest::fast(self.hold_duration)) {
                    Ok(worker) => {
                        self.worker = Some(worker);
                        self.mode = Some(FanMode::Fast);
                        self.status = format!("Fan mode: {} (holding)", FanMode::Fast);
                    }
                    Err(e) => self.status = format!("Failed to set {} mode: {}", FanMode::Fast, e),
                }
            }
            ToggleAction::RestoreNormal => {
                match self.supervisor.set_and_confirm(FanMode::Normal, &CancelToken::new()) {
                    Ok(()) => self.set_mode_status(FanMode::Normal),
                    Err(e) => self.status = format!("Failed to set {} mode: {}", FanMode::Normal, e),
                }
            }
        }
    }

    /// Stop any hold (restoring normal mode) and leave
    pub fn quit(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.finish_hold(worker.stop());
        }
        self.should_quit = true;
    }

    /// Leave on SIGINT/SIGTERM: stop any hold within one tick, then write
    /// normal mode once whatever state the fan is in
    pub fn interrupt(&mut self) {
        if let Some(worker) = self.worker.take() {
            match worker.stop_within(self.supervisor.config().tick) {
                Err(FanError::Cancelled) => {}
                result => self.finish_hold(result),
            }
        }
        match self.supervisor.device().set_mode(FanMode::Normal) {
            Ok(()) => self.set_mode_status(FanMode::Normal),
            Err(e) => {
                warn!("restoring normal mode on interrupt failed: {}", e);
                self.status = format!("Failed to restore {} mode: {}", FanMode::Normal, e);
            }
        }
        self.should_quit = true;
    }
}
