use ratatui::widgets::TableState;
use supertodo_core::{
    ActionOutcome, RestBackend, SessionFile, TaskId, TodoService,
};
use tokio::runtime::Handle;

pub enum Screen {
    Login,
    Tasks,
}

pub enum InputMode {
    Normal,
    Adding,
    Editing,
}

#[derive(Clone, Copy, PartialEq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

#[derive(Clone, Copy, PartialEq)]
pub enum AuthField {
    Email,
    Password,
    Confirm,
}

pub struct App {
    pub service: TodoService<RestBackend>,
    pub session_file: SessionFile,
    pub handle: Handle,

    pub screen: Screen,
    pub state: TableState,
    pub input: String,
    pub input_mode: InputMode,
    pub cursor_position: usize,
    pub editing: Option<TaskId>,

    // Login / sign-up form
    pub auth_mode: AuthMode,
    pub auth_field: AuthField,
    pub email: String,
    pub password: String,
    pub confirm: String,
    pub auth_error: Option<String>,
    pub auth_notice: Option<String>,
}

impl App {
    pub fn new(
        service: TodoService<RestBackend>,
        session_file: SessionFile,
        handle: Handle,
    ) -> App {
        App {
            service,
            session_file,
            handle,
            screen: Screen::Login,
            state: TableState::default(),
            input: String::new(),
            input_mode: InputMode::Normal,
            cursor_position: 0,
            editing: None,
            auth_mode: AuthMode::SignIn,
            auth_field: AuthField::Email,
            email: String::new(),
            password: String::new(),
            confirm: String::new(),
            auth_error: None,
            auth_notice: None,
        }
    }

    /// Restores a persisted session once; the result decides which
    /// screen comes up first.
    pub fn bootstrap(&mut self) {
        let saved = match self.session_file.load() {
            Ok(saved) => saved,
            Err(err) => {
                log::warn!("could not read session file: {}", err);
                None
            }
        };
        self.handle.block_on(self.service.restore_session(saved));
        if self.service.is_signed_in() {
            self.handle.block_on(self.service.subscribe_feed());
            self.screen = Screen::Tasks;
            if !self.service.tasks().is_empty() {
                self.state.select(Some(0));
            }
        }
    }

    fn selected_task_id(&self) -> Option<TaskId> {
        let i = self.state.selected()?;
        self.service.tasks().get(i).map(|t| t.id)
    }

    pub fn next(&mut self) {
        let len = self.service.tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.service.tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn toggle_status(&mut self) {
        if let Some(id) = self.selected_task_id() {
            let outcome = self.handle.block_on(self.service.toggle_completed(id));
            if outcome == ActionOutcome::NeedsLogin {
                self.to_login();
            }
        }
    }

    pub fn toggle_important(&mut self) {
        if let Some(id) = self.selected_task_id() {
            let outcome = self.handle.block_on(self.service.toggle_important(id));
            if outcome == ActionOutcome::NeedsLogin {
                self.to_login();
            }
        }
    }

    pub fn delete_task(&mut self) {
        if let Some(i) = self.state.selected() {
            if let Some(id) = self.service.tasks().get(i).map(|t| t.id) {
                let outcome = self.handle.block_on(self.service.delete(id));
                if outcome == ActionOutcome::NeedsLogin {
                    self.to_login();
                    return;
                }
            }
            self.clamp_selection(i);
        }
    }

    pub fn refresh(&mut self) {
        self.handle.block_on(self.service.refresh());
        if let Some(i) = self.state.selected() {
            self.clamp_selection(i);
        }
    }

    /// Applies whatever the change feed delivered since the last tick.
    pub fn pump_feed(&mut self) {
        self.service.pump_feed();
        match self.state.selected() {
            Some(i) => self.clamp_selection(i),
            None => {
                if !self.service.tasks().is_empty() {
                    self.state.select(Some(0));
                }
            }
        }
    }

    fn clamp_selection(&mut self, i: usize) {
        let len = self.service.tasks().len();
        if len == 0 {
            self.state.select(None);
        } else if i >= len {
            self.state.select(Some(len - 1));
        } else {
            self.state.select(Some(i));
        }
    }

    pub fn enter_add_mode(&mut self) {
        self.input_mode = InputMode::Adding;
        self.input.clear();
        self.cursor_position = 0;
    }

    pub fn enter_edit_mode(&mut self) {
        if let Some(id) = self.selected_task_id() {
            if let Some(task) = self.service.get(id) {
                self.input = task.text.clone();
                self.cursor_position = self.input.chars().count();
                self.editing = Some(id);
                self.input_mode = InputMode::Editing;
            }
        }
    }

    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        self.editing = None;
    }

    pub fn input_char(&mut self, c: char) {
        let byte_index = self
            .input
            .chars()
            .take(self.cursor_position)
            .map(|c| c.len_utf8())
            .sum();
        self.input.insert(byte_index, c);
        self.cursor_position += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            let byte_index: usize = self
                .input
                .chars()
                .take(self.cursor_position - 1)
                .map(|c| c.len_utf8())
                .sum();
            self.input.remove(byte_index);
            self.cursor_position -= 1;
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input.chars().count() {
            self.cursor_position += 1;
        }
    }

    pub fn submit_input(&mut self) {
        if self.input.trim().is_empty() {
            self.exit_input_mode();
            return;
        }

        let text = self.input.clone();
        let outcome = match self.input_mode {
            InputMode::Adding => self.handle.block_on(self.service.add_task(&text, None)),
            InputMode::Editing => match self.editing {
                Some(id) => self.handle.block_on(self.service.edit_text(id, &text)),
                None => ActionOutcome::Done,
            },
            InputMode::Normal => ActionOutcome::Done,
        };

        self.input.clear();
        self.cursor_position = 0;
        self.exit_input_mode();

        if outcome == ActionOutcome::NeedsLogin {
            self.to_login();
            return;
        }
        if self.state.selected().is_none() && !self.service.tasks().is_empty() {
            self.state.select(Some(0));
        }
    }

    pub fn logout(&mut self) {
        self.handle.block_on(self.service.sign_out());
        if let Err(err) = self.session_file.clear() {
            log::warn!("could not clear session file: {}", err);
        }
        self.state.select(None);
        self.to_login();
    }

    fn to_login(&mut self) {
        self.screen = Screen::Login;
        self.auth_error = None;
        self.auth_notice = None;
    }

    // Login / sign-up form handling. The form keeps no cursor; typing
    // appends to the active field.

    fn active_field_mut(&mut self) -> &mut String {
        match self.auth_field {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
            AuthField::Confirm => &mut self.confirm,
        }
    }

    pub fn auth_input_char(&mut self, c: char) {
        self.active_field_mut().push(c);
    }

    pub fn auth_backspace(&mut self) {
        self.active_field_mut().pop();
    }

    pub fn next_auth_field(&mut self) {
        self.auth_field = match (self.auth_field, self.auth_mode) {
            (AuthField::Email, _) => AuthField::Password,
            (AuthField::Password, AuthMode::SignUp) => AuthField::Confirm,
            (AuthField::Password, AuthMode::SignIn) => AuthField::Email,
            (AuthField::Confirm, _) => AuthField::Email,
        };
    }

    pub fn previous_auth_field(&mut self) {
        self.auth_field = match (self.auth_field, self.auth_mode) {
            (AuthField::Email, AuthMode::SignUp) => AuthField::Confirm,
            (AuthField::Email, AuthMode::SignIn) => AuthField::Password,
            (AuthField::Password, _) => AuthField::Email,
            (AuthField::Confirm, _) => AuthField::Password,
        };
    }

    pub fn toggle_auth_mode(&mut self) {
        self.auth_mode = match self.auth_mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.auth_field = AuthField::Email;
        self.auth_error = None;
        self.auth_notice = None;
    }

    pub fn submit_auth(&mut self) {
        self.auth_error = None;
        self.auth_notice = None;

        let email = self.email.trim().to_string();
        if email.is_empty() || self.password.is_empty() {
            self.auth_error = Some("Email and password are required".to_string());
            return;
        }

        match self.auth_mode {
            AuthMode::SignUp => {
                if self.password != self.confirm {
                    self.auth_error = Some("Passwords do not match".to_string());
                    return;
                }
                let password = self.password.clone();
                match self.handle.block_on(self.service.sign_up(&email, &password)) {
                    Ok(()) => {
                        self.auth_notice = Some(
                            "Account created. Check your email to confirm, then sign in."
                                .to_string(),
                        );
                        self.auth_mode = AuthMode::SignIn;
                        self.auth_field = AuthField::Email;
                        self.password.clear();
                        self.confirm.clear();
                    }
                    Err(err) => self.auth_error = Some(err.to_string()),
                }
            }
            AuthMode::SignIn => {
                let password = self.password.clone();
                match self.handle.block_on(self.service.sign_in(&email, &password)) {
                    Ok(()) => {
                        if let Some(session) = self.service.session() {
                            if let Err(err) = self.session_file.save(session) {
                                log::warn!("could not persist session: {}", err);
                            }
                        }
                        self.handle.block_on(self.service.subscribe_feed());
                        self.password.clear();
                        self.confirm.clear();
                        self.screen = Screen::Tasks;
                        if !self.service.tasks().is_empty() {
                            self.state.select(Some(0));
                        }
                    }
                    Err(err) => self.auth_error = Some(err.to_string()),
                }
            }
        }
    }
}
