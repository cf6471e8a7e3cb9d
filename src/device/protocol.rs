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

//! Fixed-layout request buffers of the fan driver.
//!
//! Every field is a host-order `u32`. A write-mode request is
//! `[6, 1, mode]`, a read-mode request is `[14]` and its response a single
//! word holding the raw mode code.

use crate::error::{FanError, Result};
use crate::mode::FanMode;

/// Control code for the write-mode exchange
pub const IOCTL_WRITE_MODE: u32 = 0x831020C0;
/// Control code for the read-mode exchange
pub const IOCTL_READ_MODE: u32 = 0x831020C4;

pub const WRITE_MODE_REQUEST_ID: u32 = 6;
pub const WRITE_MODE_SUBCODE: u32 = 1;
pub const READ_MODE_REQUEST_ID: u32 = 14;

pub const WRITE_MODE_LEN: usize = 12;
pub const READ_MODE_LEN: usize = 4;

const WORD: usize = std::mem::size_of::<u32>();

pub fn encode_write_mode(mode: FanMode) -> [u8; WRITE_MODE_LEN] {
    let words = [WRITE_MODE_REQUEST_ID, WRITE_MODE_SUBCODE, mode.to_raw()];
    let mut buf = [0u8; WRITE_MODE_LEN];
    for (chunk, word) in buf.chunks_exact_mut(WORD).zip(words) {
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    buf
}

pub fn encode_read_mode() -> [u8; READ_MODE_LEN] {
    READ_MODE_REQUEST_ID.to_ne_bytes()
}

/// Raw mode code from a read-mode response
pub fn decode_read_mode_raw(buf: &[u8]) -> Result<u32> {
    let word: [u8; WORD] = buf
        .get(..WORD)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| {
            FanError::device_io(
                "read-mode",
                format!("short response ({} bytes, expected {})", buf.len(), READ_MODE_LEN),
            )
        })?;
    Ok(u32::from_ne_bytes(word))
}

pub fn decode_read_mode(buf: &[u8]) -> Result<FanMode> {
    decode_read_mode_raw(buf).map(FanMode::from_raw)
}
