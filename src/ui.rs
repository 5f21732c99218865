use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use embedded_io::Write;
use log::warn;
use ratatui::{prelude::*, widgets::*};

use crate::{
    host::{HostSession, SessionError},
    joint::{JOINTS, Role},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Pose,
    /// Keystrokes go to the state name field.
    Naming,
}

/// Pose editor state: the host session plus what the screen needs.
pub struct App<W> {
    pub session: HostSession<W>,
    pub mode: Mode,
    pub status: String,
}

impl<W: Write> App<W> {
    pub fn new(session: HostSession<W>) -> Self {
        let status = if session.link().is_connected() {
            "Connected".to_string()
        } else {
            "Serial port not connected, commands will not be sent".to_string()
        };
        Self {
            session,
            mode: Mode::Pose,
            status,
        }
    }

    /// Applies one key press. Returns `true` when the editor should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Naming => self.handle_name_key(key),
            Mode::Pose => return self.handle_pose_key(key),
        }
        false
    }

    fn handle_name_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.mode = Mode::Pose,
            KeyCode::Backspace => {
                self.session.state_name_mut().pop();
            }
            KeyCode::Char(c) => self.session.state_name_mut().push(c),
            _ => {}
        }
    }

    fn handle_pose_key(&mut self, key: KeyEvent) -> bool {
        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            10
        } else {
            1
        };
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.session.select_previous(),
            KeyCode::Down => self.session.select_next(),
            KeyCode::Left => self.session.adjust(-step),
            KeyCode::Right => self.session.adjust(step),
            KeyCode::Char('n') => {
                self.mode = Mode::Naming;
                self.status = "Type a state name, Enter to finish".to_string();
            }
            KeyCode::Char('u') => {
                let result = self.session.send_pose();
                self.report(result, "Pose sent");
            }
            KeyCode::Char('t') => {
                self.session.stand();
                self.status = "Stand pose set, press u to send".to_string();
            }
            KeyCode::Char('w') => {
                let result = self.session.wave();
                self.report(result, "Wave sent");
            }
            KeyCode::Char('s') => {
                let result = self.session.save_state();
                let message = format!("State '{}' saved", self.session.state_name().trim());
                self.report(result, &message);
            }
            KeyCode::Char('l') => {
                let result = self.session.load_state();
                let message = format!("State '{}' loaded", self.session.state_name().trim());
                self.report(result, &message);
            }
            _ => {}
        }
        false
    }

    fn report(&mut self, result: Result<(), SessionError>, success: &str) {
        self.status = match result {
            Ok(()) => success.to_string(),
            Err(e) => {
                warn!("{}", e);
                format!("Error: {e}")
            }
        };
    }
}

pub fn ui<W: Write>(f: &mut Frame, app: &App<W>) {
    let [table_area, side_area] =
        Layout::horizontal([Constraint::Min(40), Constraint::Length(28)]).areas(f.area());
    let [states_area, name_area, status_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(4),
    ])
    .areas(side_area);

    render_joints(f, app, table_area);
    render_states(f, app, states_area);
    render_name(f, app, name_area);

    let status = Paragraph::new(app.status.as_str())
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Status").borders(Borders::ALL));
    f.render_widget(status, status_area);
}

fn render_joints<W: Write>(f: &mut Frame, app: &App<W>, area: Rect) {
    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("Joint"),
        Cell::from("Angle"),
        Cell::from(""),
    ])
    .style(Style::default().fg(Color::Yellow).bold());

    let pose = app.session.pose();
    let rows: Vec<Row> = JOINTS
        .iter()
        .zip(pose.angles())
        .enumerate()
        .map(|(index, (joint, &angle))| {
            let bar = "#".repeat(angle as usize / 10);
            let row = Row::new(vec![
                Cell::from(index.to_string()),
                Cell::from(joint.name),
                Cell::from(format!("{angle:>3}")),
                Cell::from(bar).style(match joint.role {
                    Role::Hip => Style::default().fg(Color::Green),
                    Role::Ankle => Style::default().fg(Color::Magenta),
                }),
            ]);
            if index == app.session.selected() {
                row.style(Style::default().bg(Color::DarkGray).fg(Color::White))
            } else {
                row
            }
        })
        .collect();

    let table = Table::new(
        rows,
        vec![
            Constraint::Length(2),  // index
            Constraint::Length(18), // joint
            Constraint::Length(6),  // angle
            Constraint::Length(19), // bar
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title("Pose (↑↓ select, ←→ ±1, shift ±10, u send, t stand, w wave, q quit)")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
    .style(Style::default().fg(Color::White));

    f.render_widget(table, area);
}

fn render_states<W: Write>(f: &mut Frame, app: &App<W>, area: Rect) {
    let items: Vec<ListItem> = app
        .session
        .store()
        .names()
        .map(|name| ListItem::new(name.to_string()))
        .collect();
    let list = List::new(items).block(
        Block::default()
            .title("States (s save, l load)")
            .borders(Borders::ALL),
    );
    f.render_widget(list, area);
}

fn render_name<W: Write>(f: &mut Frame, app: &App<W>, area: Rect) {
    let style = match app.mode {
        Mode::Naming => Style::default().fg(Color::Yellow),
        Mode::Pose => Style::default(),
    };
    let name = Paragraph::new(app.session.state_name()).style(style).block(
        Block::default()
            .title("State name (n edit)")
            .borders(Borders::ALL),
    );
    f.render_widget(name, area);
}
