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

//! Command Line Interface

use std::path::PathBuf;
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{self, Settings};
use crate::error::Result;
use crate::toggle::ModeCommand;

#[derive(Parser, Debug)]
#[command(name = "energyfan")]
#[command(version)]
#[command(about = "Switch the laptop fan between normal and fast mode")]
#[command(long_about = "Switch the laptop fan between normal and fast mode

Fast mode is held in the background and checked once per tick; when the
hold ends (duration elapsed, Enter pressed, or interrupted) the fan is
brought back to normal mode before exiting.

EXAMPLES:
    energyfan                          Toggle: hold fast if normal, else restore normal
    energyfan --mode fast --duration 300
    energyfan --mode normal
    energyfan tui                      Interactive terminal UI
    energyfan --simulate --mode fast   Dry run against an in-memory driver

ENVIRONMENT VARIABLES:
    ENERGYFAN_LOG=debug    Diagnostic log filter (stderr)

FILES:
    ~/.config/energyfan/config.json    Device path, tick and retry settings")]
pub struct Cli {
    /// Target fan mode
    #[arg(long, value_enum, default_value_t = ModeArg::Toggle)]
    pub mode: ModeArg,

    /// Seconds to keep fast mode; negative holds until interrupted
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub duration: i64,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Driver control node, overrides the settings file
    #[arg(long, value_name = "PATH")]
    pub device: Option<PathBuf>,

    /// Use an in-memory driver instead of the real device
    #[arg(long)]
    pub simulate: bool,

    /// Debug diagnostics on stderr
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Interactive terminal UI with a toggle key
    Tui,

    /// Settings file management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print the settings file location
    Path,
    /// Print the effective settings as JSON
    Show,
    /// Write the default settings if no file exists yet
    Init,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Normal,
    Fast,
    Toggle,
}

impl From<ModeArg> for ModeCommand {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Normal => ModeCommand::Normal,
            ModeArg::Fast => ModeCommand::Fast,
            ModeArg::Toggle => ModeCommand::Toggle,
        }
    }
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config::config_path)
    }

    /// Settings from the file with command-line overrides applied
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = config::load_settings_from(&self.config_path())?;
        if let Some(device) = &self.device {
            settings.device_path = device.clone();
        }
        config::validate_settings(&settings)?;
        Ok(settings)
    }
}
