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


use std::io::{self, stdout};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{debug, info, warn};

use energyfan::app::App;
use energyfan::cli::{Cli, Commands, ConfigCommands};
use energyfan::clock::SystemClock;
use energyfan::config::{self, Settings};
use energyfan::console::{self, ConsoleEvent};
use energyfan::device::{DeviceChannel, EnergyDrv, SimulatedDevice};
use energyfan::error::FanError;
use energyfan::events::handle_key_event;
use energyfan::logger;
use energyfan::mode::{FanMode, HoldRequest};
use energyfan::supervisor::Supervisor;
use energyfan::ui::ui;

type FanSupervisor = Supervisor<Box<dyn DeviceChannel>, SystemClock>;

fn main() {
    let cli = Cli::parse();
    logger::init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Commands::Config(cmd)) = &cli.command {
        return run_config(&cli, cmd);
    }

    let settings = cli.settings()?;
    debug!("settings: {:?}", settings);

    if !cli.simulate && unsafe { libc::geteuid() } != 0 {
        eprintln!("Warning: not running as root; access to {} may be denied.", settings.device_path.display());
    }

    let device: Box<dyn DeviceChannel> = if cli.simulate {
        info!("using simulated driver");
        Box::new(SimulatedDevice::new(FanMode::Normal))
    } else {
        Box::new(EnergyDrv::new(settings.device_path.clone()))
    };
    let supervisor = Arc::new(Supervisor::new(
        Arc::new(device),
        SystemClock::with_slice(settings.sleep_slice()),
        settings.supervisor_config(),
    ));

    let (tx, rx) = mpsc::channel();
    let interrupt = tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = interrupt.send(ConsoleEvent::Interrupt);
    }) {
        warn!("Failed to set signal handler: {}. Interrupts will not restore normal mode.", e);
    }

    let hold = HoldRequest::from_secs(FanMode::Fast, cli.duration);
    if cli.command == Some(Commands::Tui) {
        return run_tui(supervisor, hold.duration(), &rx);
    }

    console::spawn_stdin_reader(tx.clone())?;
    let mut out = stdout();
    match console::run(supervisor, cli.mode.into(), hold.duration(), &rx, tx, &mut out) {
        Ok(()) => Ok(()),
        Err(FanError::StateUnknown(source)) => {
            eprintln!(
                "Failed to open {} or read the fan state: {}",
                settings.device_path.display(),
                source
            );
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn run_config(cli: &Cli, cmd: &ConfigCommands) -> anyhow::Result<()> {
    let path = cli.config_path();
    match cmd {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Show => println!("{}", serde_json::to_string_pretty(&cli.settings()?)?),
        ConfigCommands::Init => {
            if path.exists() {
                println!("Settings already exist at {}", path.display());
            } else {
                config::save_settings_to(&path, &Settings::default())?;
                println!("Wrote default settings to {}", path.display());
            }
        }
    }
    Ok(())
}

fn run_tui(
    supervisor: Arc<FanSupervisor>,
    hold_duration: Option<Duration>,
    interrupts: &Receiver<ConsoleEvent>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(supervisor).with_hold_duration(hold_duration);
    let res = run_app(&mut terminal, &mut app, interrupts);

    // Stops any hold before the terminal is handed back
    app.quit();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<Box<dyn DeviceChannel>, SystemClock>,
    interrupts: &Receiver<ConsoleEvent>,
) -> anyhow::Result<()> {
    app.refresh();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = app
            .refresh_interval
            .saturating_sub(app.last_refresh.elapsed())
            .min(Duration::from_millis(250));
        if event::poll(timeout).unwrap_or(false) {
            if let Event::Key(key_event) = event::read()? {
                if handle_key_event(app, key_event)? {
                    return Ok(());
                }
            }
        }

        if interrupts.try_recv() == Ok(ConsoleEvent::Interrupt) {
            info!("interrupt received, leaving UI");
            app.interrupt();
            return Ok(());
        }

        if app.last_refresh.elapsed() >= app.refresh_interval {
            app.refresh();
        }
    }
}
