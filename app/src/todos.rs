//! Todo List Store: live mirror of the signed-in user's todos.
//!
//! While an identity is present a live query over that user's documents is
//! running under [`LIVE_QUERY`]; every delivery replaces the list. The
//! mutations (add, toggle, save edit, remove) are fire-and-forget: they never
//! touch the list directly and report failure only through the shared error
//! slot. The list always shows the last snapshot, never a local guess.

use crate::environment::AppEnvironment;
use firetodo_backend::{
    BackendClient, BackendError, NewTodo, Todo, TodoId, TodoPatch, TodoQuery, UserId,
};
use firetodo_core::{SmallVec, effect::Effect, effect::EffectId, reducer::Reducer, smallvec};
use futures::{Stream, StreamExt};

/// Id of the live-query subscription.
pub const LIVE_QUERY: EffectId = EffectId::new("todos.live_query");

/// The single row being edited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditDraft {
    /// Row in edit mode
    pub target: TodoId,
    /// Text being edited
    pub text: String,
}

/// Todo list state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoListState {
    /// Identity the live query is filtered by
    pub owner: Option<UserId>,
    /// Last delivered snapshot
    pub todos: Vec<Todo>,
    /// Add-form input
    pub input: String,
    /// Edit draft, at most one
    pub draft: Option<EditDraft>,
    /// Page-level error banner
    pub error: Option<String>,
    /// Waiting for the first snapshot of the current owner
    pub is_loading: bool,
}

impl TodoListState {
    /// Look up a todo of the current snapshot.
    #[must_use]
    pub fn get(&self, id: &TodoId) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == *id)
    }

    /// Returns `true` if `id` is the row in edit mode.
    #[must_use]
    pub fn is_editing(&self, id: &TodoId) -> bool {
        self.draft.as_ref().is_some_and(|draft| draft.target == *id)
    }
}

/// Backend write issued by a mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// Document created from the add form
    Add,
    /// Completion flipped
    Toggle(TodoId),
    /// Text replaced from the edit draft
    Edit(TodoId),
    /// Document deleted
    Delete(TodoId),
}

impl Mutation {
    /// Prefix of the error banner when this mutation fails.
    #[must_use]
    pub const fn error_prefix(&self) -> &'static str {
        match self {
            Self::Add => "Error adding todo: ",
            Self::Toggle(_) | Self::Edit(_) => "Error updating todo: ",
            Self::Delete(_) => "Error deleting todo: ",
        }
    }
}

/// Prefix of the error banner when the live query fails.
pub const FETCH_ERROR_PREFIX: &str = "Error fetching todos: ";

/// Todo list actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TodoListAction {
    /// The session identity changed
    IdentityChanged(Option<UserId>),
    /// The live query for `owner` delivered a snapshot
    SnapshotReceived {
        /// Identity the query was started for
        owner: UserId,
        /// Full ordered result
        todos: Vec<Todo>,
    },
    /// The live query for `owner` could not be set up or failed
    SubscriptionFailed {
        /// Identity the query was started for
        owner: UserId,
        /// Backend message
        message: String,
    },
    /// Add-form input edited
    InputChanged(String),
    /// Create a todo with `text`
    Add {
        /// Text as typed; stored untrimmed
        text: String,
    },
    /// Flip a todo's completion flag
    Toggle(TodoId),
    /// Put a row in edit mode
    BeginEdit(TodoId),
    /// Edit-draft text edited
    DraftChanged(String),
    /// Leave edit mode without saving
    CancelEdit,
    /// Save `text` (trimmed) as the text of `id`
    SaveEdit {
        /// Edited row
        id: TodoId,
        /// New text
        text: String,
    },
    /// Delete a todo
    Remove(TodoId),
    /// A backend write succeeded
    MutationSucceeded(Mutation),
    /// A backend write failed
    MutationFailed {
        /// Failed write
        mutation: Mutation,
        /// Backend message
        message: String,
    },
}

/// Live query for `owner`, as todo list actions.
fn live_query(
    backend: BackendClient,
    owner: UserId,
) -> impl Stream<Item = TodoListAction> + Send + 'static {
    async_stream::stream! {
        match backend.documents().subscribe(TodoQuery::owned_by(owner.clone())).await {
            Ok(subscription) => {
                let snapshots = subscription.into_stream();
                futures::pin_mut!(snapshots);
                while let Some(snapshot) = snapshots.next().await {
                    match snapshot {
                        Ok(todos) => {
                            yield TodoListAction::SnapshotReceived {
                                owner: owner.clone(),
                                todos,
                            };
                        },
                        Err(error) => {
                            yield TodoListAction::SubscriptionFailed {
                                owner: owner.clone(),
                                message: error.to_string(),
                            };
                            break;
                        },
                    }
                }
            },
            Err(error) => {
                yield TodoListAction::SubscriptionFailed {
                    owner,
                    message: error.to_string(),
                };
            },
        }
    }
}

/// Run `write` against the backend and report the outcome of `mutation`.
fn mutation_effect<F>(mutation: Mutation, write: F) -> Effect<TodoListAction>
where
    F: std::future::Future<Output = firetodo_backend::Result<()>> + Send + 'static,
{
    Effect::future(async move {
        Some(match write.await {
            Ok(()) => TodoListAction::MutationSucceeded(mutation),
            Err(error) => {
                tracing::warn!(?mutation, error = %error, "todo write failed");
                TodoListAction::MutationFailed {
                    mutation,
                    message: error.to_string(),
                }
            },
        })
    })
}

/// Reducer for the todo list.
#[derive(Clone, Copy, Debug, Default)]
pub struct TodoListReducer;

impl TodoListReducer {
    fn identity_changed(
        state: &mut TodoListState,
        owner: Option<UserId>,
        env: &AppEnvironment,
    ) -> SmallVec<[Effect<TodoListAction>; 4]> {
        if state.owner == owner {
            return SmallVec::new();
        }

        state.todos.clear();
        state.draft = None;
        state.is_loading = owner.is_some();
        state.owner.clone_from(&owner);

        match owner {
            Some(owner) => {
                tracing::debug!(%owner, "starting live query");
                smallvec![
                    Effect::Cancel(LIVE_QUERY),
                    Effect::stream(live_query(env.backend.clone(), owner)).cancellable(LIVE_QUERY),
                ]
            },
            None => {
                tracing::debug!("stopping live query");
                smallvec![Effect::Cancel(LIVE_QUERY)]
            },
        }
    }

    /// Drop the draft once its row is gone from the snapshot.
    fn prune_draft(state: &mut TodoListState) {
        if let Some(draft) = &state.draft {
            if state.get(&draft.target).is_none() {
                state.draft = None;
            }
        }
    }
}

impl Reducer for TodoListReducer {
    type State = TodoListState;
    type Action = TodoListAction;
    type Environment = AppEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Live query ==========
            TodoListAction::IdentityChanged(owner) => Self::identity_changed(state, owner, env),

            TodoListAction::SnapshotReceived { owner, todos } => {
                if state.owner.as_ref() != Some(&owner) {
                    return SmallVec::new();
                }
                state.todos = todos;
                state.is_loading = false;
                Self::prune_draft(state);
                SmallVec::new()
            },

            TodoListAction::SubscriptionFailed { owner, message } => {
                if state.owner.as_ref() != Some(&owner) {
                    return SmallVec::new();
                }
                state.todos.clear();
                state.draft = None;
                state.is_loading = false;
                state.error = Some(format!("{FETCH_ERROR_PREFIX}{message}"));
                SmallVec::new()
            },

            // ========== Local edits ==========
            TodoListAction::InputChanged(input) => {
                state.input = input;
                SmallVec::new()
            },

            TodoListAction::BeginEdit(id) => {
                if let Some(todo) = state.get(&id) {
                    state.draft = Some(EditDraft {
                        target: id,
                        text: todo.text.clone(),
                    });
                }
                SmallVec::new()
            },

            TodoListAction::DraftChanged(text) => {
                if let Some(draft) = state.draft.as_mut() {
                    draft.text = text;
                }
                SmallVec::new()
            },

            TodoListAction::CancelEdit => {
                state.draft = None;
                SmallVec::new()
            },

            // ========== Mutations ==========
            TodoListAction::Add { text } => {
                let Some(owner) = state.owner.clone() else {
                    return SmallVec::new();
                };
                if text.trim().is_empty() {
                    return SmallVec::new();
                }
                let backend = env.backend.clone();
                smallvec![mutation_effect(Mutation::Add, async move {
                    backend
                        .documents()
                        .create(NewTodo::new(text, owner))
                        .await
                        .map(|id| tracing::debug!(%id, "todo added"))
                })]
            },

            TodoListAction::Toggle(id) => {
                if state.owner.is_none() {
                    return SmallVec::new();
                }
                let Some(completed) = state.get(&id).map(|todo| todo.completed) else {
                    let path = env.backend.documents().document_path(&id);
                    let missing = BackendError::no_document_to_update(&path);
                    state.error = Some(format!(
                        "{}{missing}",
                        Mutation::Toggle(id).error_prefix()
                    ));
                    return SmallVec::new();
                };
                let backend = env.backend.clone();
                smallvec![mutation_effect(Mutation::Toggle(id.clone()), async move {
                    backend
                        .documents()
                        .update(&id, TodoPatch::completed(!completed))
                        .await
                })]
            },

            TodoListAction::SaveEdit { id, text } => {
                if state.owner.is_none() {
                    return SmallVec::new();
                }
                let text = text.trim();
                if text.is_empty() {
                    return SmallVec::new();
                }
                let backend = env.backend.clone();
                let patch = TodoPatch::text(text);
                smallvec![mutation_effect(Mutation::Edit(id.clone()), async move {
                    backend.documents().update(&id, patch).await
                })]
            },

            TodoListAction::Remove(id) => {
                if state.owner.is_none() {
                    return SmallVec::new();
                }
                let backend = env.backend.clone();
                smallvec![mutation_effect(Mutation::Delete(id.clone()), async move {
                    backend.documents().delete(&id).await
                })]
            },

            // ========== Outcomes ==========
            TodoListAction::MutationSucceeded(mutation) => {
                state.error = None;
                match mutation {
                    Mutation::Add => state.input.clear(),
                    Mutation::Edit(id) => {
                        if state.is_editing(&id) {
                            state.draft = None;
                        }
                    },
                    Mutation::Toggle(_) | Mutation::Delete(_) => {},
                }
                SmallVec::new()
            },

            TodoListAction::MutationFailed { mutation, message } => {
                state.error = Some(format!("{}{message}", mutation.error_prefix()));
                SmallVec::new()
            },
        }
    }
}
