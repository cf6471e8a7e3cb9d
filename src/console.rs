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

//! Console front end: one command, then wait for Enter or an interrupt.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::device::DeviceChannel;
use crate::error::{FanError, Result};
use crate::mode::FanMode;
use crate::supervisor::{HoldReport, Supervisor};
use crate::toggle::{self, ModeCommand};
use crate::worker::HoldWorker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleEvent {
    /// Enter pressed
    Enter,
    /// Standard input reached end of file
    InputClosed,
    /// SIGINT or SIGTERM
    Interrupt,
    /// The hold worker ended on its own
    HoldFinished,
}

/// Forward lines from stdin as `Enter` events on a background thread
pub fn spawn_stdin_reader(tx: Sender<ConsoleEvent>) -> Result<()> {
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            let mut line = String::new();
            let event = match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => ConsoleEvent::InputClosed,
                Ok(_) => ConsoleEvent::Enter,
            };
            let _ = tx.send(event);
        })?;
    Ok(())
}

fn describe(report: Option<HoldReport>) -> String {
    match report {
        Some(r) => format!(
            "Fast mode held for {:.1}s ({:?}); fan restored to {}.",
            r.held_for.as_secs_f64(),
            r.outcome,
            FanMode::Normal
        ),
        None => format!("Fan is in {} mode.", FanMode::Normal),
    }
}

/// Run one console command.
///
/// The request runs on a [`HoldWorker`] so the main thread keeps listening.
/// `events` delivers Enter, end of input and interrupts; `tx` is handed to
/// the worker so it can announce that it finished. Enter stops a hold, and
/// both Enter and end of input then wait for the worker to finish. An
/// interrupt gives the worker one supervisor tick to restore normal mode,
/// then writes normal mode once more and returns.
pub fn run<D, C, W>(
    supervisor: Arc<Supervisor<D, C>>,
    command: ModeCommand,
    duration: Option<Duration>,
    events: &Receiver<ConsoleEvent>,
    tx: Sender<ConsoleEvent>,
    out: &mut W,
) -> Result<()>
where
    D: DeviceChannel + 'static,
    C: Clock + 'static,
    W: Write,
{
    let (current, request) = toggle::prepare(supervisor.device().as_ref(), command, duration)?;
    debug!("current mode {}, request {:?}", current, request);
    let target = request.target();

    if command == ModeCommand::Toggle {
        writeln!(out, "{} mode on", target)?;
    } else {
        writeln!(out, "Setting fan to {} mode.", target)?;
    }
    if let (FanMode::Fast, Some(d)) = (target, request.duration()) {
        writeln!(out, "Keeping fast mode for {} seconds...", d.as_secs())?;
    }

    let notify = tx.clone();
    let mut worker = Some(HoldWorker::spawn_with(supervisor.clone(), request, move || {
        let _ = notify.send(ConsoleEvent::HoldFinished);
    })?);
    let mut failure: Option<FanError> = None;

    writeln!(out, "Press Enter to exit...")?;
    out.flush()?;

    // Set once the user is done; the loop then only waits for the worker
    let mut leaving = false;
    loop {
        let event = events.recv().unwrap_or(ConsoleEvent::InputClosed);
        debug!("console event {:?}", event);
        match event {
            ConsoleEvent::Enter | ConsoleEvent::InputClosed => {
                if event == ConsoleEvent::Enter && target == FanMode::Fast {
                    if let Some(w) = &worker {
                        w.cancel();
                    }
                }
                leaving = true;
                if worker.is_none() {
                    break;
                }
            }
            ConsoleEvent::Interrupt => {
                writeln!(out, "\nInterrupt received, restoring normal fan mode...")?;
                if let Some(w) = worker.take() {
                    match w.stop_within(supervisor.config().tick) {
                        Err(FanError::Cancelled) => {}
                        result => report(out, target, result, &mut failure)?,
                    }
                }
                if let Err(e) = supervisor.device().set_mode(FanMode::Normal) {
                    warn!("restoring normal mode on interrupt failed: {}", e);
                    writeln!(out, "Failed to restore normal mode: {}", e)?;
                    failure = Some(e);
                }
                break;
            }
            ConsoleEvent::HoldFinished => {
                if let Some(w) = worker.take() {
                    report(out, target, w.join(), &mut failure)?;
                }
                if leaving {
                    break;
                }
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn report<W: Write>(
    out: &mut W,
    target: FanMode,
    result: Result<Option<HoldReport>>,
    failure: &mut Option<FanError>,
) -> Result<()> {
    match result {
        Ok(r) => writeln!(out, "{}", describe(r))?,
        Err(e) => {
            match target {
                FanMode::Fast => writeln!(out, "Fast mode hold failed: {}", e)?,
                FanMode::Normal => writeln!(out, "Failed to set fan to normal mode: {}", e)?,
            }
            *failure = Some(e);
        }
    }
    Ok(())
}
