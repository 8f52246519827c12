//! Session Store: the current authenticated identity.
//!
//! `Start` subscribes to the auth service's identity stream for the lifetime
//! of the app. Each emission replaces the session wholesale. There is no
//! retry: the auth service's own reconnection is relied upon.

use crate::environment::AppEnvironment;
use firetodo_backend::User;
use firetodo_core::{SmallVec, effect::Effect, effect::EffectId, reducer::Reducer, smallvec};
use futures::StreamExt;

/// Id of the identity-stream subscription.
pub const IDENTITY_SUBSCRIPTION: EffectId = EffectId::new("session.identity");

/// Current session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    /// Signed-in user
    pub user: Option<User>,
    /// `true` until the auth service reports the first identity
    pub is_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }
}

impl SessionState {
    /// Returns `true` if a user is signed in.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

/// Session actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Subscribe to the identity stream
    Start,
    /// The auth service reported an identity (or none)
    IdentityChanged(Option<User>),
    /// Tear down the identity subscription
    Stop,
}

/// Reducer for the session.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionReducer;

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = AppEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SessionAction::Start => {
                let backend = env.backend.clone();
                let identities = async_stream::stream! {
                    let changes = backend.auth().identity_changes().into_stream();
                    futures::pin_mut!(changes);
                    while let Some(user) = changes.next().await {
                        yield SessionAction::IdentityChanged(user);
                    }
                };
                smallvec![
                    Effect::Cancel(IDENTITY_SUBSCRIPTION),
                    Effect::stream(identities).cancellable(IDENTITY_SUBSCRIPTION),
                ]
            },

            SessionAction::IdentityChanged(user) => {
                tracing::debug!(uid = ?user.as_ref().map(|u| u.uid.as_str()), "identity changed");
                *state = SessionState {
                    user,
                    is_loading: false,
                };
                SmallVec::new()
            },

            SessionAction::Stop => smallvec![Effect::Cancel(IDENTITY_SUBSCRIPTION)],
        }
    }
}
