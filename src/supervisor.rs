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

//! Mode supervisor
//!
//! Drives the fan toward a target mode and keeps fast mode asserted for the
//! length of a hold. The driver may accept a write without applying it, and
//! other processes may change the mode at any time, so every change is
//! confirmed by reading it back and fast mode is re-checked once per tick.
//!
//! A hold always ends by bringing the fan back to normal mode, whether it
//! expired, was cancelled, or failed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::device::DeviceChannel;
use crate::error::{FanError, Result};
use crate::mode::{FanMode, HoldRequest};

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_CONFIRM_ATTEMPTS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Pause between confirm-loop attempts
    pub retry_interval: Duration,
    /// Interval between fast-mode checks during a hold
    pub tick: Duration,
    /// Write/read attempts before a confirm-loop gives up. `None` retries forever.
    pub max_confirm_attempts: Option<u32>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            tick: DEFAULT_TICK,
            max_confirm_attempts: Some(DEFAULT_MAX_CONFIRM_ATTEMPTS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldState {
    Idle,
    AssertingFast,
    HoldingFast,
    RestoringNormal,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    /// The requested duration ran out
    Expired,
    /// The cancel token fired before the duration ran out
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldReport {
    pub outcome: HoldOutcome,
    /// Full ticks slept while holding
    pub ticks: u32,
    /// Ticks at which fast mode had to be asserted again
    pub reasserts: u32,
    /// Clock time from the start of the hold until normal mode was confirmed
    pub held_for: Duration,
}

pub struct Supervisor<D, C> {
    device: Arc<D>,
    clock: C,
    config: SupervisorConfig,
    state: Mutex<HoldState>,
    /// Fired to give up on a restore that is still looping
    abort: CancelToken,
}

impl<D: DeviceChannel, C: Clock> Supervisor<D, C> {
    pub fn new(device: Arc<D>, clock: C, config: SupervisorConfig) -> Self {
        Self {
            device,
            clock,
            config,
            state: Mutex::new(HoldState::Idle),
            abort: CancelToken::new(),
        }
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Token that stops the normal-mode restore at the end of a hold.
    ///
    /// Only an interrupt that must not wait for the restore any longer
    /// fires it. Once fired, every later restore gives up at once.
    pub fn abort_token(&self) -> CancelToken {
        self.abort.clone()
    }

    /// State of the current (or last) hold
    pub fn state(&self) -> HoldState {
        match self.state.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn enter(&self, next: HoldState) {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        info!("hold: {:?} -> {:?}", *guard, next);
        *guard = next;
    }

    /// Write `target` and read it back until the device reports it.
    ///
    /// Failed exchanges are retried like unconfirmed ones. Gives up with
    /// `DeviceIo` once the attempt limit is reached and with `Cancelled`
    /// when `cancel` fires.
    pub fn set_and_confirm(&self, target: FanMode, cancel: &CancelToken) -> Result<()> {
        let mut attempts: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(FanError::Cancelled);
            }
            attempts += 1;

            match self.device.set_mode(target) {
                Ok(()) => match self.device.read_mode() {
                    Ok(mode) if mode == target => {
                        debug!("{} confirmed after {} attempt(s)", target, attempts);
                        return Ok(());
                    }
                    Ok(mode) => {
                        debug!("{} not applied yet, device reports {} (attempt {})", target, mode, attempts);
                    }
                    Err(e) if e.is_retryable() => warn!("read-back after writing {} failed: {}", target, e),
                    Err(e) => return Err(e),
                },
                Err(e) if e.is_retryable() => warn!("writing {} failed: {}", target, e),
                Err(e) => return Err(e),
            }

            if let Some(max) = self.config.max_confirm_attempts {
                if attempts >= max {
                    return Err(FanError::device_io(
                        "write-mode",
                        format!("{} mode not confirmed after {} attempts", target, attempts),
                    ));
                }
            }

            if !self.clock.sleep(self.config.retry_interval, cancel) {
                return Err(FanError::Cancelled);
            }
        }
    }

    /// Hold fast mode for `duration` (forever when `None`) or until `cancel`
    /// fires, then restore normal mode.
    ///
    /// Restoration runs on every exit path and ignores `cancel`; only the
    /// [`abort token`](Self::abort_token) stops it. If it fails,
    /// that error is returned in preference to any earlier one.
    pub fn hold_fast(&self, duration: Option<Duration>, cancel: &CancelToken) -> Result<HoldReport> {
        let start = self.clock.now();
        let mut report = HoldReport {
            outcome: HoldOutcome::Expired,
            ticks: 0,
            reasserts: 0,
            held_for: Duration::ZERO,
        };

        self.enter(HoldState::AssertingFast);
        let held = self.hold_loop(start, duration, cancel, &mut report);

        self.enter(HoldState::RestoringNormal);
        let restored = self.set_and_confirm(FanMode::Normal, &self.abort);
        report.held_for = self.clock.now().saturating_sub(start);
        self.enter(HoldState::Done);

        match (held, restored) {
            (Ok(outcome), Ok(())) => {
                report.outcome = outcome;
                info!(
                    "hold ended ({:?}) after {:?}, {} tick(s), {} re-assert(s)",
                    outcome, report.held_for, report.ticks, report.reasserts
                );
                Ok(report)
            }
            (held, Err(e)) => {
                if let Err(first) = held {
                    warn!("hold failed before restoring: {}", first);
                }
                error!("could not restore {} mode: {}", FanMode::Normal, e);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    fn hold_loop(
        &self,
        start: Duration,
        duration: Option<Duration>,
        cancel: &CancelToken,
        report: &mut HoldReport,
    ) -> Result<HoldOutcome> {
        match self.set_and_confirm(FanMode::Fast, cancel) {
            Ok(()) => {}
            Err(FanError::Cancelled) => return Ok(HoldOutcome::Cancelled),
            Err(e) => return Err(e),
        }
        self.enter(HoldState::HoldingFast);

        loop {
            if cancel.is_cancelled() {
                return Ok(HoldOutcome::Cancelled);
            }

            if let Some(limit) = duration {
                let elapsed = self.clock.now().saturating_sub(start);
                let remaining = limit.saturating_sub(elapsed);
                if remaining <= self.config.tick {
                    debug!("final sleep of {:?}", remaining);
                    return Ok(if self.clock.sleep(remaining, cancel) {
                        HoldOutcome::Expired
                    } else {
                        HoldOutcome::Cancelled
                    });
                }
            }

            if !self.clock.sleep(self.config.tick, cancel) {
                return Ok(HoldOutcome::Cancelled);
            }
            report.ticks += 1;

            match self.device.read_mode() {
                Ok(FanMode::Fast) => {
                    debug!("tick {}: still {}", report.ticks, FanMode::Fast);
                    continue;
                }
                Ok(mode) => warn!("tick {}: fan drifted to {}, re-asserting {}", report.ticks, mode, FanMode::Fast),
                Err(e) if e.is_retryable() => warn!("tick {}: state check failed: {}", report.ticks, e),
                Err(e) => return Err(e),
            }

            report.reasserts += 1;
            match self.set_and_confirm(FanMode::Fast, cancel) {
                Ok(()) => {}
                Err(FanError::Cancelled) => return Ok(HoldOutcome::Cancelled),
                Err(e) => return Err(e),
            }
        }
    }

    /// Carry out a request: hold for fast mode, a single confirm-loop for normal.
    /// Returns the hold report when a hold ran.
    pub fn run(&self, request: HoldRequest, cancel: &CancelToken) -> Result<Option<HoldReport>> {
        match request.target() {
            FanMode::Fast => self.hold_fast(request.duration(), cancel).map(Some),
            FanMode::Normal => self.set_and_confirm(FanMode::Normal, cancel).map(|()| None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::device::{DeviceOp, MockDeviceChannel, SimulatedDevice};
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn supervisor(dev: &Arc<SimulatedDevice>) -> Supervisor<SimulatedDevice, ManualClock> {
        Supervisor::new(dev.clone(), ManualClock::new(), SupervisorConfig::default())
    }

    #[test]
    fn test_confirm_first_try() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        let sup = supervisor(&dev);
        sup.set_and_confirm(FanMode::Fast, &CancelToken::new()).unwrap();
        assert_eq!(dev.ops(), vec![DeviceOp::Write(FanMode::Fast), DeviceOp::Read]);
        assert!(sup.clock().sleeps().is_empty());
    }

    #[test]
    fn test_confirm_retries_after_retry_interval() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        dev.drop_next_writes(2);
        let sup = supervisor(&dev);
        sup.set_and_confirm(FanMode::Fast, &CancelToken::new()).unwrap();
        assert_eq!(dev.write_count(), 3);
        assert_eq!(dev.read_count(), 3);
        assert_eq!(sup.clock().sleeps(), vec![DEFAULT_RETRY_INTERVAL; 2]);
    }

    #[test]
    fn test_confirm_retries_through_write_failures() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        dev.set_fail_writes(true);
        let config = SupervisorConfig { max_confirm_attempts: Some(3), ..Default::default() };
        let sup = Supervisor::new(dev.clone(), ManualClock::new(), config);

        let err = sup.set_and_confirm(FanMode::Fast, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, FanError::DeviceIo { .. }));
        assert!(err.to_string().contains("not confirmed after 3 attempts"));
        // No read-back after a rejected write
        assert_eq!(dev.write_count(), 3);
        assert_eq!(dev.read_count(), 0);
    }

    #[test]
    fn test_confirm_gives_up_on_stuck_device() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        dev.drop_next_writes(u32::MAX);
        let sup = supervisor(&dev);
        let err = sup.set_and_confirm(FanMode::Fast, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, FanError::DeviceIo { .. }));
        assert_eq!(dev.write_count(), DEFAULT_MAX_CONFIRM_ATTEMPTS as usize);
    }

    #[test]
    fn test_confirm_unbounded_stops_on_cancel() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        dev.drop_next_writes(u32::MAX);
        let config = SupervisorConfig { max_confirm_attempts: None, ..Default::default() };
        let sup = Supervisor::new(dev.clone(), ManualClock::new(), config);
        let token = CancelToken::new();
        sup.clock().cancel_at(Duration::from_millis(1050), token.clone());

        let err = sup.set_and_confirm(FanMode::Fast, &token).unwrap_err();
        assert!(matches!(err, FanError::Cancelled));
        assert_eq!(dev.write_count(), 11);
    }

    #[test]
    fn test_confirm_already_cancelled_issues_nothing() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        let sup = supervisor(&dev);
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            sup.set_and_confirm(FanMode::Fast, &token),
            Err(FanError::Cancelled)
        ));
        assert!(dev.ops().is_empty());
    }

    #[test]
    fn test_confirm_with_mock_sequence() {
        let mut mock = MockDeviceChannel::new();
        let mut seq = Sequence::new();
        mock.expect_set_mode()
            .with(eq(FanMode::Fast))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_read_mode()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(FanMode::Normal));
        mock.expect_set_mode()
            .with(eq(FanMode::Fast))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_read_mode()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(FanMode::Fast));

        let sup = Supervisor::new(Arc::new(mock), ManualClock::new(), SupervisorConfig::default());
        sup.set_and_confirm(FanMode::Fast, &CancelToken::new()).unwrap();
    }

    #[test]
    fn test_non_device_error_is_not_retried() {
        let mut mock = MockDeviceChannel::new();
        mock.expect_set_mode()
            .times(1)
            .returning(|_| Err(FanError::config("bad channel")));
        mock.expect_read_mode().never();
        let sup = Supervisor::new(Arc::new(mock), ManualClock::new(), SupervisorConfig::default());
        assert!(matches!(
            sup.set_and_confirm(FanMode::Fast, &CancelToken::new()),
            Err(FanError::Config(_))
        ));
    }

    #[test]
    fn test_hold_state_transitions_end_in_done() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        let sup = supervisor(&dev);
        assert_eq!(sup.state(), HoldState::Idle);
        sup.hold_fast(Some(Duration::from_millis(1500)), &CancelToken::new()).unwrap();
        assert_eq!(sup.state(), HoldState::Done);
        assert_eq!(dev.mode(), FanMode::Normal);
    }

    #[test]
    fn test_hold_partial_sleep_uses_remainder() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        let sup = supervisor(&dev);
        let report = sup.hold_fast(Some(Duration::from_millis(2300)), &CancelToken::new()).unwrap();
        assert_eq!(report.ticks, 2);
        assert_eq!(
            sup.clock().sleeps(),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(1000),
                Duration::from_millis(300)
            ]
        );
        assert_eq!(report.held_for, Duration::from_millis(2300));
        assert_eq!(report.outcome, HoldOutcome::Expired);
    }

    #[test]
    fn test_hold_reasserts_after_drift() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        // read 1 confirms fast, read 2 is the first tick check
        dev.drift_at_read(2, FanMode::Normal);
        let sup = supervisor(&dev);
        let report = sup.hold_fast(Some(Duration::from_millis(3000)), &CancelToken::new()).unwrap();
        assert_eq!(report.ticks, 2);
        assert_eq!(report.reasserts, 1);
        assert_eq!(
            dev.writes(),
            vec![FanMode::Fast, FanMode::Fast, FanMode::Normal]
        );
        assert_eq!(dev.mode(), FanMode::Normal);
    }

    #[test]
    fn test_hold_reasserts_after_failed_check() {
        let mut mock = MockDeviceChannel::new();
        let mut reads = 0;
        mock.expect_set_mode().returning(|_| Ok(()));
        mock.expect_read_mode().returning(move || {
            reads += 1;
            match reads {
                1 => Ok(FanMode::Fast),
                2 => Err(FanError::device_io("read-mode", "busy")),
                3 => Ok(FanMode::Fast),
                _ => Ok(FanMode::Normal),
            }
        });
        let sup = Supervisor::new(Arc::new(mock), ManualClock::new(), SupervisorConfig::default());
        let report = sup.hold_fast(Some(Duration::from_millis(2000)), &CancelToken::new()).unwrap();
        assert_eq!(report.ticks, 1);
        assert_eq!(report.reasserts, 1);
    }

    #[test]
    fn test_hold_restores_even_when_fast_never_confirms() {
        let mut mock = MockDeviceChannel::new();
        mock.expect_set_mode().returning(|_| Ok(()));
        mock.expect_read_mode().returning(|| Ok(FanMode::Normal));
        let config = SupervisorConfig { max_confirm_attempts: Some(2), ..Default::default() };
        let sup = Supervisor::new(Arc::new(mock), ManualClock::new(), config);

        let err = sup.hold_fast(None, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, FanError::DeviceIo { .. }));
        assert_eq!(sup.state(), HoldState::Done);
    }

    #[test]
    fn test_hold_surfaces_restore_failure() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        let config = SupervisorConfig { max_confirm_attempts: Some(2), ..Default::default() };
        let sup = Supervisor::new(dev.clone(), ManualClock::new(), config);
        // fast confirms, then every later read still says fast
        dev.drift_at_read(2, FanMode::Fast);
        dev.drift_at_read(3, FanMode::Fast);
        let err = sup.hold_fast(Some(Duration::ZERO), &CancelToken::new()).unwrap_err();
        assert!(err.to_string().contains("NORMAL mode not confirmed"));
    }

    #[test]
    fn test_run_normal_request() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Fast));
        let sup = supervisor(&dev);
        let report = sup.run(HoldRequest::normal(), &CancelToken::new()).unwrap();
        assert!(report.is_none());
        assert_eq!(dev.ops(), vec![DeviceOp::Write(FanMode::Normal), DeviceOp::Read]);
    }

    #[test]
    fn test_run_fast_request_holds() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        let sup = supervisor(&dev);
        let report = sup
            .run(HoldRequest::fast(Some(Duration::from_millis(500))), &CancelToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(report.outcome, HoldOutcome::Expired);
        assert_eq!(dev.mode(), FanMode::Normal);
    }

    #[test]
    fn test_aborted_restore_gives_up() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        let sup = supervisor(&dev);
        sup.abort_token().cancel();

        let err = sup.hold_fast(Some(Duration::ZERO), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, FanError::Cancelled));
        assert_eq!(dev.ops(), vec![DeviceOp::Write(FanMode::Fast), DeviceOp::Read]);
        assert_eq!(sup.state(), HoldState::Done);
    }

    #[test]
    fn test_hold_measures_from_its_own_start() {
        let dev = Arc::new(SimulatedDevice::new(FanMode::Normal));
        let sup = supervisor(&dev);
        sup.clock().advance(Duration::from_secs(30));

        let report = sup.hold_fast(Some(Duration::from_millis(2000)), &CancelToken::new()).unwrap();
        assert_eq!(report.ticks, 1);
        assert_eq!(report.held_for, Duration::from_millis(2000));
        assert_eq!(sup.clock().now(), Duration::from_secs(32));
    }
}
