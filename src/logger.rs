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

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ENERGYFAN_LOG";

/// Filter directive: `ENERGYFAN_LOG` if set, else `debug` when verbose, else `warn`
pub fn log_level(verbose: bool) -> String {
    std::env::var(LOG_ENV).unwrap_or_else(|_| {
        if verbose { "debug" } else { "warn" }.to_string()
    })
}

/// Diagnostics go to stderr so they never mix with user-facing output.
pub fn init_logging(verbose: bool) {
    let level = log_level(verbose);
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter)
        .try_init();
}
