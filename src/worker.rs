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
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::device::DeviceChannel;
use crate::error::{FanError, Result};
use crate::mode::HoldRequest;
use crate::supervisor::{HoldReport, Supervisor};

type HoldResult = Result<Option<HoldReport>>;

/// A supervisor request running on its own thread.
///
/// While a worker is alive it is the only user of the device. Dropping it
/// cancels the request and waits for normal mode to be restored.
pub struct HoldWorker {
    request: HoldRequest,
    cancel: CancelToken,
    abort: CancelToken,
    handle: Option<JoinHandle<HoldResult>>,
}

const STOP_POLL: Duration = Duration::from_millis(10);

impl HoldWorker {
    pub fn spawn<D, C>(supervisor: Arc<Supervisor<D, C>>, request: HoldRequest) -> Result<Self>
    where
        D: DeviceChannel + 'static,
        C: Clock + 'static,
    {
        Self::spawn_with(supervisor, request, || {})
    }

    /// Like [`HoldWorker::spawn`], calling `on_finish` on the worker thread
    /// once the request is over.
    pub fn spawn_with<D, C, F>(
        supervisor: Arc<Supervisor<D, C>>,
        request: HoldRequest,
        on_finish: F,
    ) -> Result<Self>
    where
        D: DeviceChannel + 'static,
        C: Clock + 'static,
        F: FnOnce() + Send + 'static,
    {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let abort = supervisor.abort_token();
        let handle = thread::Builder::new()
            .name("fan-hold".to_string())
            .spawn(move || {
                debug!("hold worker started: {:?}", request);
                let result = supervisor.run(request, &token);
                if let Err(e) = &result {
                    warn!("hold worker finished with error: {}", e);
                }
                on_finish();
                result
            })?;

        Ok(Self {
            request,
            cancel,
            abort,
            handle: Some(handle),
        })
    }

    pub fn request(&self) -> HoldRequest {
        self.request
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the request to end on its own
    pub fn join(mut self) -> HoldResult {
        Self::join_handle(self.handle.take())
    }

    /// Cancel the request and wait until normal mode has been restored
    pub fn stop(self) -> HoldResult {
        self.cancel();
        self.join()
    }

    /// Like [`HoldWorker::stop`], but gives the restore only `grace` to
    /// confirm normal mode. After that the restore is aborted and the result
    /// is `Cancelled`.
    pub fn stop_within(self, grace: Duration) -> HoldResult {
        self.cancel();
        let deadline = Instant::now() + grace;
        while !self.is_finished() && Instant::now() < deadline {
            thread::sleep(STOP_POLL.min(grace));
        }
        if !self.is_finished() {
            warn!("restore still running after {:?}, aborting it", grace);
            self.abort.cancel();
        }
        self.join()
    }

    fn join_handle(handle: Option<JoinHandle<HoldResult>>) -> HoldResult {
        match handle {
            Some(h) => h
                .join()
                .unwrap_or_else(|_| Err(FanError::device_io("hold", "hold worker panicked"))),
            None => Ok(None),
        }
    }
}

impl Drop for HoldWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cancel.cancel();
            if let Err(e) = Self::join_handle(Some(handle)) {
                warn!("hold worker dropped with error: {}", e);
            }
        }
    }
}
