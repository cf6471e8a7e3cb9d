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

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::App;
use crate::clock::Clock;
use crate::device::DeviceChannel;

/// Handle one key press. Returns `true` when the UI should exit.
pub fn handle_key_event<D, C>(app: &mut App<D, C>, key_event: KeyEvent) -> anyhow::Result<bool>
where
    D: DeviceChannel + 'static,
    C: Clock + 'static,
{
    let KeyEvent { code, modifiers, kind, .. } = key_event;
    if kind != KeyEventKind::Press {
        return Ok(false);
    }

    // Raw mode turns Ctrl+C into a key press instead of SIGINT
    if modifiers.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        app.interrupt();
        return Ok(true);
    }

    match code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.quit();
            return Ok(true);
        }
        KeyCode::Char('t') | KeyCode::Enter | KeyCode::Char(' ') => app.toggle(),
        KeyCode::Char('r') => app.refresh(),
        _ => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::device::SimulatedDevice;
    use crate::mode::FanMode;
    use crate::test_utils::manual_supervisor;
    use crossterm::event::KeyEventState;
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn setup(initial: FanMode) -> (Arc<SimulatedDevice>, App<SimulatedDevice, ManualClock>) {
        let (dev, sup) = manual_supervisor(initial);
        (dev, App::new(Arc::new(sup)))
    }

    #[test]
    fn test_quit_keys() {
        let (_dev, mut app) = setup(FanMode::Normal);
        assert!(handle_key_event(&mut app, key(KeyCode::Char('q'))).unwrap());
        assert!(app.should_quit);

        let (_dev, mut app) = setup(FanMode::Normal);
        assert!(handle_key_event(&mut app, key(KeyCode::Esc)).unwrap());

        let (dev, mut app) = setup(FanMode::Fast);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(handle_key_event(&mut app, ctrl_c).unwrap());
        assert_eq!(dev.mode(), FanMode::Normal);
    }

    #[test]
    fn test_refresh_key() {
        let (_dev, mut app) = setup(FanMode::Fast);
        assert!(!handle_key_event(&mut app, key(KeyCode::Char('r'))).unwrap());
        assert_eq!(app.mode, Some(FanMode::Fast));
    }

    #[test]
    fn test_toggle_key_from_fast() {
        let (dev, mut app) = setup(FanMode::Fast);
        assert!(!handle_key_event(&mut app, key(KeyCode::Char('t'))).unwrap());
        assert_eq!(dev.mode(), FanMode::Normal);
    }

    #[test]
    fn test_release_events_ignored() {
        let (dev, mut app) = setup(FanMode::Fast);
        let release = KeyEvent {
            code: KeyCode::Char('t'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert!(!handle_key_event(&mut app, release).unwrap());
        assert!(dev.ops().is_empty());
    }

    #[test]
    fn test_unbound_key_does_nothing() {
        let (dev, mut app) = setup(FanMode::Normal);
        assert!(!handle_key_event(&mut app, key(KeyCode::Char('x'))).unwrap());
        assert!(dev.ops().is_empty());
    }
}
