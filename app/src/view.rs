//! Todo List View: pure rendering of [`AppState`] and user intents.
//!
//! [`render`] turns the whole state into a [`Screen`]; front-ends draw the
//! screen and translate user input into [`Intent`]s.

use crate::app::{AppAction, AppState};
use crate::login::{LoginAction, LoginFormState};
use crate::todos::TodoListAction;
use firetodo_backend::TodoId;
use std::fmt;

/// Shown while the session is loading.
pub const LOADING_MESSAGE: &str = "Loading...";
/// Shown instead of rows when the list is empty.
pub const EMPTY_MESSAGE: &str = "No todos yet. Add one above!";
/// Placeholder of the add-form input.
pub const ADD_PLACEHOLDER: &str = "Add a new todo...";

/// Sign-in/sign-up form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginView {
    /// Email field
    pub email: String,
    /// Password field, masked
    pub masked_password: String,
    /// Auth-service rejection
    pub error: Option<String>,
    /// A request is in flight
    pub pending: bool,
}

impl From<&LoginFormState> for LoginView {
    fn from(form: &LoginFormState) -> Self {
        Self {
            email: form.email.clone(),
            masked_password: "*".repeat(form.password.chars().count()),
            error: form.error.clone(),
            pending: form.pending,
        }
    }
}

/// Signed-in account box with the sign-out control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountView {
    /// Email of the signed-in user
    pub email: String,
}

/// Add form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddFormView {
    /// Current input
    pub input: String,
    /// Placeholder shown when the input is empty
    pub placeholder: &'static str,
}

/// Row state: display mode or edit mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowMode {
    /// Text with edit, toggle and delete controls
    Display {
        /// Todo text
        text: String,
        /// Completion flag
        completed: bool,
    },
    /// Editable text with save and cancel controls
    Editing {
        /// Draft text
        draft: String,
    },
}

/// One todo row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    /// Todo id
    pub id: TodoId,
    /// Display or edit mode
    pub mode: RowMode,
}

/// Everything a front-end draws.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    /// Waiting for the first identity
    Loading,
    /// No identity: only the login form
    SignedOut {
        /// Login form
        login: LoginView,
    },
    /// Signed in: account box and the todo list
    SignedIn {
        /// Account box
        account: AccountView,
        /// Add form
        add_form: AddFormView,
        /// Page-level error banner
        error: Option<String>,
        /// One row per todo, in snapshot order
        rows: Vec<Row>,
        /// Shown when there are no rows
        empty_message: Option<&'static str>,
    },
}

impl Screen {
    /// Rows of a signed-in screen, empty otherwise.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        match self {
            Self::SignedIn { rows, .. } => rows.as_slice(),
            Self::Loading | Self::SignedOut { .. } => &[],
        }
    }
}

/// Render the whole app state.
#[must_use]
pub fn render(state: &AppState) -> Screen {
    if state.session.is_loading {
        return Screen::Loading;
    }
    let Some(user) = &state.session.user else {
        return Screen::SignedOut {
            login: LoginView::from(&state.login),
        };
    };

    let todos = &state.todos;
    let rows: Vec<Row> = todos
        .todos
        .iter()
        .map(|todo| Row {
            id: todo.id.clone(),
            mode: match &todos.draft {
                Some(draft) if draft.target == todo.id => RowMode::Editing {
                    draft: draft.text.clone(),
                },
                _ => RowMode::Display {
                    text: todo.text.clone(),
                    completed: todo.completed,
                },
            },
        })
        .collect();
    let empty_message = (rows.is_empty() && !todos.is_loading).then_some(EMPTY_MESSAGE);

    Screen::SignedIn {
        account: AccountView {
            email: user.email.clone(),
        },
        add_form: AddFormView {
            input: todos.input.clone(),
            placeholder: ADD_PLACEHOLDER,
        },
        error: todos.error.clone(),
        rows,
        empty_message,
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => writeln!(f, "{LOADING_MESSAGE}"),
            Self::SignedOut { login } => {
                writeln!(f, "== Sign in ==")?;
                if let Some(error) = &login.error {
                    writeln!(f, "! {error}")?;
                }
                writeln!(f, "Email:    {}", login.email)?;
                writeln!(f, "Password: {}", login.masked_password)?;
                if login.pending {
                    writeln!(f, "(working...)")?;
                }
                Ok(())
            },
            Self::SignedIn {
                account,
                add_form,
                error,
                rows,
                empty_message,
            } => {
                writeln!(f, "Logged in as: {}", account.email)?;
                writeln!(f, "== Todo List ==")?;
                if let Some(error) = error {
                    writeln!(f, "! {error}")?;
                }
                if add_form.input.is_empty() {
                    writeln!(f, "New: ({})", add_form.placeholder)?;
                } else {
                    writeln!(f, "New: {}", add_form.input)?;
                }
                for (index, row) in rows.iter().enumerate() {
                    let number = index + 1;
                    match &row.mode {
                        RowMode::Display { text, completed } => {
                            let mark = if *completed { 'x' } else { ' ' };
                            writeln!(f, "{number:>3}. [{mark}] {text}")?;
                        },
                        RowMode::Editing { draft } => {
                            writeln!(f, "{number:>3}. [edit] {draft}")?;
                        },
                    }
                }
                if let Some(message) = empty_message {
                    writeln!(f, "{message}")?;
                }
                Ok(())
            },
        }
    }
}

/// User intents a front-end can dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Type into the email field
    EditEmail(String),
    /// Type into the password field
    EditPassword(String),
    /// Press "Sign In"
    SignIn,
    /// Press "Sign Up"
    SignUp,
    /// Press "Sign Out"
    SignOut,
    /// Type into the add form
    EditInput(String),
    /// Submit the add form
    SubmitAdd,
    /// Press the toggle control of a row
    Toggle(TodoId),
    /// Press the edit control of a row
    BeginEdit(TodoId),
    /// Type into the edit draft
    EditDraft(String),
    /// Press "Save" on the row in edit mode
    SaveEdit,
    /// Press "Cancel" on the row in edit mode
    CancelEdit,
    /// Press the delete control of a row
    Delete(TodoId),
}

impl Intent {
    /// The action this intent dispatches in `state`.
    ///
    /// Returns `None` when the intent has no target (saving with no row in
    /// edit mode).
    #[must_use]
    pub fn into_action(self, state: &AppState) -> Option<AppAction> {
        let action = match self {
            Self::EditEmail(email) => AppAction::Login(LoginAction::EmailChanged(email)),
            Self::EditPassword(password) => {
                AppAction::Login(LoginAction::PasswordChanged(password))
            },
            Self::SignIn => AppAction::Login(LoginAction::SignIn),
            Self::SignUp => AppAction::Login(LoginAction::SignUp),
            Self::SignOut => AppAction::Login(LoginAction::SignOut),
            Self::EditInput(input) => AppAction::Todos(TodoListAction::InputChanged(input)),
            Self::SubmitAdd => AppAction::Todos(TodoListAction::Add {
                text: state.todos.input.clone(),
            }),
            Self::Toggle(id) => AppAction::Todos(TodoListAction::Toggle(id)),
            Self::BeginEdit(id) => AppAction::Todos(TodoListAction::BeginEdit(id)),
            Self::EditDraft(text) => AppAction::Todos(TodoListAction::DraftChanged(text)),
            Self::SaveEdit => {
                let draft = state.todos.draft.as_ref()?;
                AppAction::Todos(TodoListAction::SaveEdit {
                    id: draft.target.clone(),
                    text: draft.text.clone(),
                })
            },
            Self::CancelEdit => AppAction::Todos(TodoListAction::CancelEdit),
            Self::Delete(id) => AppAction::Todos(TodoListAction::Remove(id)),
        };
        Some(action)
    }
}
