use super::{AuthSession, FirebaseBackend, Inner, auth_error, wire};
use crate::error::Result;
use crate::model::User;
use crate::providers::{AuthProvider, BoxFuture};
use crate::subscription::Subscription;
use std::time::{Duration, Instant};

/// Id tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the service omits or garbles `expiresIn`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

fn expiry(expires_in: &str) -> Instant {
    let lifetime = expires_in
        .parse::<u64>()
        .map_or(DEFAULT_TOKEN_LIFETIME, Duration::from_secs);
    Instant::now() + lifetime
}

impl Inner {
    async fn password_request(&self, endpoint: &str, email: &str, password: &str) -> Result<User> {
        let url = format!(
            "{}/accounts:{endpoint}",
            self.config.auth_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&wire::PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let error = auth_error(response).await;
            tracing::warn!(endpoint, error = %error, "auth request rejected");
            return Err(error);
        }

        let body: wire::PasswordResponse = response.json().await?;
        let user = User::new(
            body.local_id,
            if body.email.is_empty() { email.to_string() } else { body.email },
        );
        *self.session() = Some(AuthSession {
            user: user.clone(),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry(&body.expires_in),
        });
        self.identity.send_replace(Some(user.clone()));
        tracing::debug!(uid = %user.uid, endpoint, "signed in");
        Ok(user)
    }

    /// Id token of the signed-in user, refreshed when close to expiry.
    ///
    /// `None` when signed out: requests go out unauthenticated and the
    /// project's security rules decide.
    pub(super) async fn bearer_token(&self) -> Result<Option<String>> {
        let session = self.session().clone();
        let Some(session) = session else {
            return Ok(None);
        };
        if session.expires_at > Instant::now() + REFRESH_MARGIN {
            return Ok(Some(session.id_token));
        }

        let url = format!("{}/token", self.config.token_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&wire::RefreshRequest {
                grant_type: "refresh_token",
                refresh_token: &session.refresh_token,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            let error = auth_error(response).await;
            tracing::warn!(error = %error, "id token refresh failed");
            return Err(error);
        }

        let body: wire::RefreshResponse = response.json().await?;
        let mut current = self.session();
        // Keep a sign-out or account switch that happened during the refresh
        if let Some(active) = current.as_mut().filter(|s| s.user.uid == session.user.uid) {
            active.id_token.clone_from(&body.id_token);
            active.refresh_token = body.refresh_token;
            active.expires_at = expiry(&body.expires_in);
        }
        tracing::debug!(uid = %session.user.uid, "id token refreshed");
        Ok(Some(body.id_token))
    }
}

impl AuthProvider for FirebaseBackend {
    fn identity_changes(&self) -> Subscription<Option<User>> {
        Subscription::new(self.inner.identity.subscribe())
    }

    fn current_user(&self) -> Option<User> {
        self.inner.identity.borrow().clone()
    }

    fn sign_in<'a>(&'a self, email: &'a str, password: &'a str) -> BoxFuture<'a, Result<User>> {
        Box::pin(self.inner.password_request("signInWithPassword", email, password))
    }

    fn sign_up<'a>(&'a self, email: &'a str, password: &'a str) -> BoxFuture<'a, Result<User>> {
        Box::pin(self.inner.password_request("signUp", email, password))
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.inner.session().take();
            self.inner.identity.send_replace(None);
            tracing::debug!("signed out");
            Ok(())
        })
    }
}
