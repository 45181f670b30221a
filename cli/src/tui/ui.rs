use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders, Paragraph, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::tui::app::{App, AuthField, AuthMode, InputMode, Screen};

pub fn draw(f: &mut Frame, app: &mut App) {
    match app.screen {
        Screen::Login => draw_login(f, app),
        Screen::Tasks => draw_tasks(f, app),
    }
}

fn draw_tasks(f: &mut Frame, app: &mut App) {
    let size = f.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Stats cards
            Constraint::Length(3), // Input
            Constraint::Min(1),    // List
            Constraint::Length(1), // Footer/Help
        ])
        .split(size);

    let email = app
        .service
        .session()
        .map(|s| s.email.clone())
        .unwrap_or_default();
    let header = Paragraph::new(format!("SUPERTODO — {}", email))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
    f.render_widget(header, main_chunks[0]);

    draw_stats(f, app, main_chunks[1]);
    draw_input(f, app, main_chunks[2]);
    draw_task_list(f, app, main_chunks[3]);

    let help = match app.input_mode {
        InputMode::Normal => {
            "j/k: Navigate | Space: Done | s: Star | a: Add | e: Edit | d: Delete | r: Refresh | L: Logout | q: Quit"
        }
        InputMode::Adding | InputMode::Editing => "Enter: Save | Esc: Cancel",
    };
    let footer = Paragraph::new(help)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(footer, main_chunks[4]);
}

fn draw_stats(f: &mut Frame, app: &App, area: Rect) {
    let stats = app.service.stats();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(34),
            Constraint::Percentage(33),
        ])
        .split(area);

    draw_stat_card(f, chunks[0], "Total", stats.total, Color::Blue);
    draw_stat_card(f, chunks[1], "Completed", stats.completed, Color::Green);
    draw_stat_card(f, chunks[2], "Important", stats.important, Color::Yellow);
}

fn draw_stat_card(f: &mut Frame, area: Rect, title: &str, value: usize, color: Color) {
    let card = Paragraph::new(value.to_string())
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(format!(" {} ", title))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
    f.render_widget(card, area);
}

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let (title, text, style) = match app.input_mode {
        InputMode::Adding => (
            " Add task ",
            app.input.clone(),
            Style::default().fg(Color::White),
        ),
        InputMode::Editing => (
            " Edit task ",
            app.input.clone(),
            Style::default().fg(Color::White),
        ),
        InputMode::Normal => (
            " New task ",
            "press a to add a task...".to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    };

    let border_style = match app.input_mode {
        InputMode::Normal => Style::default().fg(Color::DarkGray),
        _ => Style::default().fg(Color::Cyan),
    };

    let input = Paragraph::new(text).style(style).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border_style),
    );
    f.render_widget(input, area);

    if !matches!(app.input_mode, InputMode::Normal) {
        let prefix: String = app.input.chars().take(app.cursor_position).collect();
        let x = area.x + 1 + prefix.as_str().width() as u16;
        f.set_cursor_position((x, area.y + 1));
    }
}

fn draw_task_list(f: &mut Frame, app: &mut App, area: Rect) {
    if app.service.tasks().is_empty() {
        let empty = Paragraph::new("No tasks yet — press a to add one.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title(" Tasks ")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            );
        f.render_widget(empty, area);
        return;
    }

    let rows: Vec<Row> = app
        .service
        .tasks()
        .iter()
        .map(|task| {
            let status_icon = if task.completed { "✔" } else { "☐" };
            let star = if task.important {
                Span::styled("★", Style::default().fg(Color::Yellow))
            } else {
                Span::raw(" ")
            };
            let created = DateTime::<Local>::from(task.created_at)
                .format("%m-%d")
                .to_string();
            let attachment = if task.image_url.is_some() { "img" } else { "" };

            let text_style = if task.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };

            Row::new(vec![
                Span::raw(status_icon),
                star,
                Span::raw(created),
                Span::raw(attachment),
                Span::styled(task.text.clone(), text_style),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),  // Status
            Constraint::Length(3),  // Important
            Constraint::Length(6),  // Created
            Constraint::Length(4),  // Attachment
            Constraint::Min(10),    // Text
        ],
    )
    .header(Row::new(vec!["St", "★", "Date", "Img", "Task"]).style(Style::default().fg(Color::Yellow)))
    .block(
        Block::default()
            .title(" Tasks ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    )
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn draw_login(f: &mut Frame, app: &App) {
    let size = f.area();
    let area = centered_rect(60, 70, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Banner
            Constraint::Length(3), // Email
            Constraint::Length(3), // Password
            Constraint::Length(3), // Confirm (sign-up only)
            Constraint::Length(3), // Error / notice
            Constraint::Length(1), // Help
            Constraint::Min(0),
        ])
        .split(area);

    let banner = match app.auth_mode {
        AuthMode::SignIn => "SUPERTODO — Sign in",
        AuthMode::SignUp => "SUPERTODO — Sign up",
    };
    let header = Paragraph::new(banner)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
    f.render_widget(header, chunks[0]);

    draw_auth_field(
        f,
        chunks[1],
        "Email",
        &app.email,
        app.auth_field == AuthField::Email,
    );

    let masked = "•".repeat(app.password.chars().count());
    draw_auth_field(
        f,
        chunks[2],
        "Password",
        &masked,
        app.auth_field == AuthField::Password,
    );

    if app.auth_mode == AuthMode::SignUp {
        let masked = "•".repeat(app.confirm.chars().count());
        draw_auth_field(
            f,
            chunks[3],
            "Confirm password",
            &masked,
            app.auth_field == AuthField::Confirm,
        );
    }

    // Auth failures show inline, right under the form.
    if let Some(error) = &app.auth_error {
        let message = Paragraph::new(error.as_str())
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center);
        f.render_widget(message, chunks[4]);
    } else if let Some(notice) = &app.auth_notice {
        let message = Paragraph::new(notice.as_str())
            .style(Style::default().fg(Color::Green))
            .alignment(Alignment::Center);
        f.render_widget(message, chunks[4]);
    }

    let help = match app.auth_mode {
        AuthMode::SignIn => "Tab: Next field | Enter: Sign in | Ctrl+t: Create account | Esc: Quit",
        AuthMode::SignUp => "Tab: Next field | Enter: Sign up | Ctrl+t: Back to sign-in | Esc: Quit",
    };
    let footer = Paragraph::new(help)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(footer, chunks[5]);
}

fn draw_auth_field(f: &mut Frame, area: Rect, title: &str, value: &str, active: bool) {
    let border_style = if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let field = Paragraph::new(value.to_string()).block(
        Block::default()
            .title(format!(" {} ", title))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border_style),
    );
    f.render_widget(field, area);

    if active {
        let x = area.x + 1 + value.width() as u16;
        f.set_cursor_position((x, area.y + 1));
    }
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
