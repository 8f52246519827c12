//! Login Form: email/password sign-in, sign-up and sign-out.
//!
//! Credentials are forwarded to the auth service as typed. The form does no
//! validation of its own; the service's message is shown verbatim on
//! rejection. The session itself only changes through the identity stream.

use crate::environment::AppEnvironment;
use firetodo_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};

/// Form state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginFormState {
    /// Email field
    pub email: String,
    /// Password field
    pub password: String,
    /// Last auth-service rejection
    pub error: Option<String>,
    /// A request is in flight
    pub pending: bool,
}

/// Form actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginAction {
    /// Email field edited
    EmailChanged(String),
    /// Password field edited
    PasswordChanged(String),
    /// Submit as sign-in
    SignIn,
    /// Submit as sign-up
    SignUp,
    /// Sign the current user out
    SignOut,
    /// Sign-in or sign-up accepted
    Succeeded,
    /// Sign-out completed
    SignedOut,
    /// The auth service rejected the request
    Failed {
        /// Service message, verbatim
        message: String,
    },
}

#[derive(Clone, Copy)]
enum Credentials {
    SignIn,
    SignUp,
}

/// Reducer for the login form.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoginReducer;

impl LoginReducer {
    fn submit(
        state: &mut LoginFormState,
        kind: Credentials,
        env: &AppEnvironment,
    ) -> SmallVec<[Effect<LoginAction>; 4]> {
        if state.pending {
            return SmallVec::new();
        }
        state.pending = true;

        let backend = env.backend.clone();
        let email = state.email.clone();
        let password = state.password.clone();
        smallvec![Effect::future(async move {
            let result = match kind {
                Credentials::SignIn => backend.auth().sign_in(&email, &password).await,
                Credentials::SignUp => backend.auth().sign_up(&email, &password).await,
            };
            Some(match result {
                Ok(_) => LoginAction::Succeeded,
                Err(error) => {
                    tracing::warn!(error = %error, "authentication rejected");
                    LoginAction::Failed {
                        message: error.to_string(),
                    }
                },
            })
        })]
    }
}

impl Reducer for LoginReducer {
    type State = LoginFormState;
    type Action = LoginAction;
    type Environment = AppEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            LoginAction::EmailChanged(email) => {
                state.email = email;
                SmallVec::new()
            },
            LoginAction::PasswordChanged(password) => {
                state.password = password;
                SmallVec::new()
            },

            LoginAction::SignIn => Self::submit(state, Credentials::SignIn, env),
            LoginAction::SignUp => Self::submit(state, Credentials::SignUp, env),

            LoginAction::SignOut => {
                let backend = env.backend.clone();
                smallvec![Effect::future(async move {
                    Some(match backend.auth().sign_out().await {
                        Ok(()) => LoginAction::SignedOut,
                        Err(error) => LoginAction::Failed {
                            message: error.to_string(),
                        },
                    })
                })]
            },

            LoginAction::Succeeded => {
                *state = LoginFormState::default();
                SmallVec::new()
            },
            LoginAction::SignedOut => {
                state.pending = false;
                SmallVec::new()
            },
            LoginAction::Failed { message } => {
                state.error = Some(message);
                state.pending = false;
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firetodo_backend::BackendClient;
    use firetodo_testing::{ReducerTest, assertions, test_clock};
    use std::sync::Arc;

    fn env() -> AppEnvironment {
        AppEnvironment::new(BackendClient::in_memory(Arc::new(test_clock())).0)
    }

    fn filled() -> LoginFormState {
        LoginFormState {
            email: "a@x.com".into(),
            password: "secret1".into(),
            ..LoginFormState::default()
        }
    }

    #[test]
    fn fields_track_input() {
        ReducerTest::new(LoginReducer)
            .with_env(env())
            .given_state(LoginFormState::default())
            .when_action(LoginAction::EmailChanged("a@x.com".into()))
            .when_action(LoginAction::PasswordChanged("secret1".into()))
            .then_state(|state| assert_eq!(*state, filled()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn submit_issues_one_request() {
        ReducerTest::new(LoginReducer)
            .with_env(env())
            .given_state(filled())
            .when_action(LoginAction::SignUp)
            .then_state(|state| assert!(state.pending))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn second_submit_while_pending_is_ignored() {
        ReducerTest::new(LoginReducer)
            .with_env(env())
            .given_state(filled())
            .when_action(LoginAction::SignIn)
            .when_action(LoginAction::SignIn)
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn success_clears_form() {
        ReducerTest::new(LoginReducer)
            .with_env(env())
            .given_state(LoginFormState {
                error: Some("old".into()),
                pending: true,
                ..filled()
            })
            .when_action(LoginAction::Succeeded)
            .then_state(|state| assert_eq!(*state, LoginFormState::default()))
            .run();
    }

    #[test]
    fn failure_keeps_fields_and_shows_message() {
        ReducerTest::new(LoginReducer)
            .with_env(env())
            .given_state(LoginFormState {
                pending: true,
                ..filled()
            })
            .when_action(LoginAction::Failed {
                message: "Firebase: Error (auth/invalid-credential).".into(),
            })
            .then_state(|state| {
                assert_eq!(state.email, "a@x.com");
                assert_eq!(
                    state.error.as_deref(),
                    Some("Firebase: Error (auth/invalid-credential).")
                );
                assert!(!state.pending);
            })
            .run();
    }

    #[test]
    fn sign_out_issues_request() {
        ReducerTest::new(LoginReducer)
            .with_env(env())
            .given_state(LoginFormState::default())
            .when_action(LoginAction::SignOut)
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }
}
