use crate::tui::app::{App, AuthField, CustomModal, EditModal, Focus, Modal, Screen};
use dosmart_core::board::Bucket;
use dosmart_core::config::Theme;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

pub fn accent_color(theme: Theme) -> Color {
    theme.accent_index().map_or(Color::Cyan, Color::Indexed)
}

pub fn draw(frame: &mut Frame, app: &App, accent: Color) {
    match app.screen {
        Screen::Login | Screen::Signup => draw_auth_screen(frame, app, accent),
        Screen::Board => draw_board_screen(frame, app, accent),
    }

    if let Some(modal) = &app.modal {
        draw_modal(frame, modal, accent);
    }

    if let Some(error) = &app.error_message {
        draw_error_popup(frame, error);
    }
}

fn draw_auth_screen(frame: &mut Frame, app: &App, accent: Color) {
    let title = match app.screen {
        Screen::Signup => " Do Smart - Sign up ",
        _ => " Do Smart - Log in ",
    };
    let area = centered_rect(60, 50, frame.area());
    let auth_block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(accent));
    frame.render_widget(auth_block.clone(), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(auth_block.inner(area));

    let field_style = |field: AuthField| {
        if app.auth_field == field {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
    };

    frame.render_widget(
        Paragraph::new(format!("Username: {}", app.username_input))
            .style(field_style(AuthField::Username)),
        rows[0],
    );
    frame.render_widget(
        Paragraph::new(format!("Password: {}", "*".repeat(app.password_input.chars().count())))
            .style(field_style(AuthField::Password)),
        rows[1],
    );

    if app.session().is_busy() {
        frame.render_widget(
            Paragraph::new("Working...").style(Style::default().fg(accent)),
            rows[2],
        );
    }

    let submit = match app.screen {
        Screen::Signup => "Enter: sign up   F2: switch to log in",
        _ => "Enter: log in   F2: switch to sign up",
    };
    let instructions = Paragraph::new(vec![
        Line::from("Tab: switch field"),
        Line::from(submit),
        Line::from("Esc: quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .alignment(Alignment::Center);
    frame.render_widget(instructions, rows[4]);

    let (row, len) = match app.auth_field {
        AuthField::Username => (rows[0], app.username_input.chars().count()),
        AuthField::Password => (rows[1], app.password_input.chars().count()),
    };
    frame.set_cursor_position((cursor_x(row, 10, len), row.y));
}

/// Column after `len` typed characters, kept inside `area`.
fn cursor_x(area: Rect, offset: u16, len: usize) -> u16 {
    let len = u16::try_from(len).unwrap_or(u16::MAX);
    area.x
        .saturating_add(offset)
        .saturating_add(len)
        .min(area.right().saturating_sub(1))
}

fn draw_board_screen(frame: &mut Frame, app: &App, accent: Color) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let user = app.session().state().username.clone().unwrap_or_default();
    let mut header = vec![
        Span::styled(" Do Smart ", Style::default().fg(accent).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {user}")),
    ];
    if app.is_loading() {
        header.push(Span::styled("  loading...", Style::default().fg(Color::DarkGray)));
    }
    frame.render_widget(Paragraph::new(Line::from(header)), chunks[0]);

    let input_style = if app.focus == Focus::Input {
        Style::default().fg(accent)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(app.quick_input.as_str()).block(
        Block::default()
            .title(" New task ")
            .borders(Borders::ALL)
            .border_style(input_style),
    );
    frame.render_widget(input, chunks[1]);
    if app.focus == Focus::Input && app.modal.is_none() {
        frame.set_cursor_position((
            cursor_x(chunks[1], 1, app.quick_input.chars().count()),
            chunks[1].y + 1,
        ));
    }

    draw_columns(frame, app, chunks[2], accent);

    let help = if app.carrying.is_some() {
        "←/→ choose bucket  Space drop  Esc cancel"
    } else {
        "Tab focus  ←/→/↑/↓ select  Space pick up  c custom  e edit  d delete  r reload  L logout  q quit"
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );
}

fn draw_columns(frame: &mut Frame, app: &App, area: Rect, accent: Color) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(area);
    let board = app.board();
    let carried = app.carrying.as_ref().map(|(id, _)| id.as_str());

    for bucket in Bucket::ALL {
        let tasks = board.column(bucket);
        let items: Vec<ListItem> = tasks
            .iter()
            .map(|task| {
                let marker = if carried == Some(task.id.as_str()) { "» " } else { "" };
                ListItem::new(vec![
                    Line::from(Span::styled(
                        format!("{marker}{}", task.title),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        format!("due {}", task.deadline),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();

        let selected = app.focus == Focus::Buckets && app.selected_bucket == bucket;
        let border_style = if selected {
            Style::default().fg(accent)
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" {} ({}) ", bucket.title(), tasks.len()))
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .highlight_style(Style::default().bg(Color::DarkGray));

        let mut state = ListState::default();
        if selected && !tasks.is_empty() {
            state.select(Some(app.selected_index.min(tasks.len() - 1)));
        }
        frame.render_stateful_widget(list, columns[bucket.index()], &mut state);
    }
}

fn draw_modal(frame: &mut Frame, modal: &Modal, accent: Color) {
    let (title, lines) = match modal {
        Modal::Custom(custom) => (" Custom task ", custom_lines(custom)),
        Modal::Edit(edit) => (" Edit task ", edit_lines(edit)),
    };
    let area = centered_rect(60, 50, frame.area());
    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(accent)),
        );
    frame.render_widget(Clear, area);
    frame.render_widget(body, area);
}

fn field_line(label: &str, value: String, focused: bool) -> Line<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(format!("{label}: "), style),
        Span::raw(value),
    ])
}

fn custom_lines(custom: &CustomModal) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = CustomModal::LABELS
        .into_iter()
        .zip(custom.values())
        .enumerate()
        .map(|(index, (label, value))| field_line(label, value.to_string(), index == custom.field))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab next field  Enter create  Esc cancel",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

fn edit_lines(edit: &EditModal) -> Vec<Line<'static>> {
    let values = [
        edit.form.title.clone(),
        edit.form.description.clone(),
        format!("< {} >", edit.form.status.label()),
        edit.form.deadline.clone(),
    ];
    let mut lines: Vec<Line<'static>> = EditModal::LABELS
        .into_iter()
        .zip(values)
        .enumerate()
        .map(|(index, (label, value))| field_line(label, value, index == edit.field))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab next field  ←/→ status  Enter save  Esc cancel",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

fn draw_error_popup(frame: &mut Frame, error: &str) {
    let area = centered_rect(60, 20, frame.area());

    let popup_block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .style(Style::default().fg(Color::Red));

    let error_text = Paragraph::new(error)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White))
        .block(popup_block);

    frame.render_widget(Clear, area);
    frame.render_widget(error_text, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}
