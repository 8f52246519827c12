//! Whitespace-only input never reaches the backend.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use firetodo_app::AppEnvironment;
use firetodo_app::todos::{EditDraft, TodoListAction, TodoListReducer, TodoListState};
use firetodo_backend::{BackendClient, Todo, TodoId, UserId};
use firetodo_core::reducer::Reducer;
use firetodo_testing::test_clock;
use proptest::prelude::*;
use std::sync::Arc;

fn env() -> AppEnvironment {
    AppEnvironment::new(BackendClient::in_memory(Arc::new(test_clock())).0)
}

fn signed_in() -> TodoListState {
    TodoListState {
        owner: Some(UserId::new("alice")),
        todos: vec![Todo {
            id: TodoId::new("1"),
            text: "Buy milk".into(),
            completed: false,
            owner: UserId::new("alice"),
            created_at: None,
            last_modified_at: None,
        }],
        ..TodoListState::default()
    }
}

fn whitespace() -> impl Strategy<Value = String> {
    proptest::collection::vec(prop_oneof![Just(' '), Just('\t'), Just('\n'), Just('\r')], 0..16)
        .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn blank_add_has_no_effect(text in whitespace()) {
        let mut state = signed_in();
        let before = state.clone();
        let effects = TodoListReducer.reduce(&mut state, TodoListAction::Add { text }, &env());

        prop_assert!(effects.is_empty());
        prop_assert_eq!(state, before);
    }

    #[test]
    fn blank_save_keeps_draft(text in whitespace()) {
        let mut state = TodoListState {
            draft: Some(EditDraft { target: TodoId::new("1"), text: text.clone() }),
            ..signed_in()
        };
        let effects = TodoListReducer.reduce(
            &mut state,
            TodoListAction::SaveEdit { id: TodoId::new("1"), text: text.clone() },
            &env(),
        );

        prop_assert!(effects.is_empty());
        prop_assert_eq!(state.draft.map(|d| d.text), Some(text));
    }
}
