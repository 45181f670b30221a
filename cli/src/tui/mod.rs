pub mod app;
pub mod ui;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use supertodo_core::{RestBackend, SessionFile, TodoService};
use tokio::runtime::Handle;

use crate::tui::app::{App, InputMode, Screen};

pub fn run(
    service: TodoService<RestBackend>,
    session_file: SessionFile,
    handle: Handle,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(service, session_file, handle);
    app.bootstrap();
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    <B as Backend>::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // Remote changes land between keystrokes.
        app.pump_feed();

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                match app.screen {
                    Screen::Login => match key.code {
                        KeyCode::Esc => return Ok(()),
                        KeyCode::Enter => app.submit_auth(),
                        KeyCode::Tab => app.next_auth_field(),
                        KeyCode::BackTab => app.previous_auth_field(),
                        KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                            app.toggle_auth_mode()
                        }
                        KeyCode::Char(c) => app.auth_input_char(c),
                        KeyCode::Backspace => app.auth_backspace(),
                        _ => {}
                    },
                    Screen::Tasks => match app.input_mode {
                        InputMode::Normal => match key.code {
                            KeyCode::Char('q') => return Ok(()),
                            KeyCode::Down | KeyCode::Char('j') => app.next(),
                            KeyCode::Up | KeyCode::Char('k') => app.previous(),
                            KeyCode::Char(' ') | KeyCode::Enter => app.toggle_status(),
                            KeyCode::Char('s') => app.toggle_important(),
                            KeyCode::Char('d') | KeyCode::Delete => app.delete_task(),
                            KeyCode::Char('a') => app.enter_add_mode(),
                            KeyCode::Char('e') => app.enter_edit_mode(),
                            KeyCode::Char('r') => app.refresh(),
                            KeyCode::Char('L') => app.logout(),
                            _ => {}
                        },
                        InputMode::Adding | InputMode::Editing => match key.code {
                            KeyCode::Enter => app.submit_input(),
                            KeyCode::Esc => app.exit_input_mode(),
                            KeyCode::Char(c) => app.input_char(c),
                            KeyCode::Backspace => app.delete_char(),
                            KeyCode::Left => app.move_cursor_left(),
                            KeyCode::Right => app.move_cursor_right(),
                            _ => {}
                        },
                    },
                }
            }
        }
    }
}
