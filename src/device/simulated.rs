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

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::DeviceChannel;
use crate::error::{FanError, Result};
use crate::mode::FanMode;

/// One request issued to a [`SimulatedDevice`], recorded whether or not it succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOp {
    Write(FanMode),
    Read,
}

#[derive(Debug)]
struct SimState {
    mode: FanMode,
    dropped_writes: u32,
    fail_reads: bool,
    fail_writes: bool,
    // (1-based read number, mode another party sets just before it)
    drifts: Vec<(usize, FanMode)>,
    reads: usize,
    ops: Vec<DeviceOp>,
}

/// In-memory fan driver.
///
/// Behaves like a well-mannered driver by default. Faults can be scripted:
/// writes that are accepted but never applied, failing requests, and mode
/// changes made behind the supervisor's back.
#[derive(Debug)]
pub struct SimulatedDevice {
    state: Mutex<SimState>,
}

impl SimulatedDevice {
    pub fn new(initial: FanMode) -> Self {
        Self {
            state: Mutex::new(SimState {
                mode: initial,
                dropped_writes: 0,
                fail_reads: false,
                fail_writes: false,
                drifts: Vec::new(),
                reads: 0,
                ops: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Accept the next `n` writes without applying them
    pub fn drop_next_writes(&self, n: u32) {
        self.lock().dropped_writes = n;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Switch to `mode` right before the `read_no`-th read (counting from 1)
    pub fn drift_at_read(&self, read_no: usize, mode: FanMode) {
        self.lock().drifts.push((read_no, mode));
    }

    /// Change the mode as another process would
    pub fn set_external_mode(&self, mode: FanMode) {
        self.lock().mode = mode;
    }

    pub fn mode(&self) -> FanMode {
        self.lock().mode
    }

    pub fn ops(&self) -> Vec<DeviceOp> {
        self.lock().ops.clone()
    }

    pub fn writes(&self) -> Vec<FanMode> {
        self.lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                DeviceOp::Write(m) => Some(*m),
                DeviceOp::Read => None,
            })
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.writes().len()
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    pub fn clear_ops(&self) {
        let mut st = self.lock();
        st.ops.clear();
        st.reads = 0;
    }
}

impl DeviceChannel for SimulatedDevice {
    fn set_mode(&self, mode: FanMode) -> Result<()> {
        let mut st = self.lock();
        st.ops.push(DeviceOp::Write(mode));
        if st.fail_writes {
            return Err(FanError::device_io("write-mode", "simulated write failure"));
        }
        if st.dropped_writes > 0 {
            st.dropped_writes -= 1;
            debug!("simulated driver dropped write {}", mode);
            return Ok(());
        }
        st.mode = mode;
        Ok(())
    }

    fn read_mode(&self) -> Result<FanMode> {
        let mut st = self.lock();
        st.ops.push(DeviceOp::Read);
        st.reads += 1;
        let read_no = st.reads;
        if let Some(pos) = st.drifts.iter().position(|(n, _)| *n == read_no) {
            let (_, drifted) = st.drifts.remove(pos);
            st.mode = drifted;
        }
        if st.fail_reads {
            return Err(FanError::device_io("read-mode", "simulated read failure"));
        }
        Ok(st.mode)
    }
}
