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

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use crate::app::App;
use crate::clock::Clock;
use crate::device::DeviceChannel;
use crate::mode::FanMode;

fn mode_color(mode: Option<FanMode>) -> Color {
    match mode {
        Some(FanMode::Fast) => Color::Red,
        Some(FanMode::Normal) => Color::Green,
        None => Color::Yellow,
    }
}

pub fn ui<D, C>(f: &mut Frame, app: &App<D, C>)
where
    D: DeviceChannel + 'static,
    C: Clock + 'static,
{
    let area = centered_rect(60, 50, f.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Fan Controller ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(inner);

    let status = Paragraph::new(app.status.as_str())
        .alignment(Alignment::Center)
        .style(Style::default().fg(mode_color(app.mode)).add_modifier(Modifier::BOLD));
    f.render_widget(status, rows[0]);

    if let Some(state) = app.hold_state() {
        let hold = Paragraph::new(format!("Hold: {:?}", state))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(hold, rows[1]);
    }

    let toggle_label = if app.is_holding() { "stop hold" } else { "toggle fan mode" };
    let hints = Paragraph::new(format!("[t] {}   [r] refresh   [q] quit", toggle_label))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(hints, rows[3]);
}

/// Rectangle of `percent_x` by `percent_y` centred in `r`
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
