use crate::{
    config::Env,
    error::{AppError, AppResult},
    identity::IdentityStore,
    models::User,
};
use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "photo_sid";

/// SessionToken
///
/// Opaque, unguessable handle handed to the client. It carries no data of its own;
/// the user it maps to is only known server-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    fn generate() -> Self {
        // Two v4 UUIDs: 244 random bits.
        Self(format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionToken {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// SessionAuthority
///
/// Maps session tokens to user ids for the lifetime of the process. One instance is
/// built at startup and shared through `AppState`.
///
/// Per connection the state machine is `Anonymous -> Authenticated -> Anonymous`:
/// `login` issues a token, `logout` (or expiry) invalidates it, and `resolve` is the
/// side-effect-free lookup every protected operation starts with.
pub struct SessionAuthority {
    sessions: RwLock<HashMap<SessionToken, SessionEntry>>,
    ttl: Duration,
}

/// SessionState
///
/// The concrete type used to share the session authority across the application state.
pub type SessionState = Arc<SessionAuthority>;

impl SessionAuthority {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::days(1)),
        }
    }

    /// login
    ///
    /// Checks the credentials through the identity store and, on success, binds a fresh
    /// token to the user. Fails with `Auth` when no user matches both fields.
    pub async fn login(
        &self,
        identity: &IdentityStore<'_>,
        login_name: &str,
        password: &str,
    ) -> AppResult<(SessionToken, User)> {
        let user = identity.check_credentials(login_name, password).await?;
        let token = self.issue(user.id);
        tracing::info!(user_id = %user.id, "session established");
        Ok((token, user))
    }

    /// issue
    ///
    /// Binds a new token to `user_id` without a credential check. Expired entries are
    /// evicted on the way in.
    pub fn issue(&self, user_id: Uuid) -> SessionToken {
        let token = SessionToken::generate();
        let now = Utc::now();
        let entry = SessionEntry {
            user_id,
            // Absurd TTLs saturate instead of overflowing.
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let mut sessions = self.sessions.write();
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions.insert(token.clone(), entry);
        token
    }

    /// logout
    ///
    /// Invalidates the token. Fails with `Auth` when there is no active session for it.
    pub fn logout(&self, token: Option<&SessionToken>) -> AppResult<()> {
        let token = token.ok_or_else(|| AppError::auth("User is not logged in"))?;
        match self.sessions.write().remove(token) {
            Some(entry) if entry.expires_at > Utc::now() => {
                tracing::info!(user_id = %entry.user_id, "session ended");
                Ok(())
            }
            _ => Err(AppError::auth("User is not logged in")),
        }
    }

    /// resolve
    ///
    /// Returns the user bound to the token, or `None` for unknown and expired tokens.
    /// Does not mutate the session table.
    pub fn resolve(&self, token: &SessionToken) -> Option<Uuid> {
        let sessions = self.sessions.read();
        sessions
            .get(token)
            .filter(|entry| entry.expires_at > Utc::now())
            .map(|entry| entry.user_id)
    }

    /// prune_expired
    ///
    /// Drops expired entries; returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }
}

// --- Cookie Transport ---

/// token_from_headers
///
/// Extracts the session token from the `Cookie` header, if present.
pub fn token_from_headers(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| SessionToken::from(value))
}

fn cookie_attributes(env: &Env) -> &'static str {
    match env {
        // Frontend is served from another site in production.
        Env::Production => "HttpOnly; Secure; SameSite=None; Path=/",
        Env::Local => "HttpOnly; SameSite=Lax; Path=/",
    }
}

/// session_cookie
///
/// `Set-Cookie` value establishing the session.
pub fn session_cookie(token: &SessionToken, env: &Env) -> AppResult<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; {}",
        SESSION_COOKIE,
        token.as_str(),
        cookie_attributes(env)
    ))
    .map_err(|e| AppError::internal(format!("invalid session cookie: {e}")))
}

/// clearing_cookie
///
/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn clearing_cookie(env: &Env) -> HeaderValue {
    match env {
        Env::Production => HeaderValue::from_static(
            "photo_sid=; Max-Age=0; HttpOnly; Secure; SameSite=None; Path=/",
        ),
        Env::Local => HeaderValue::from_static("photo_sid=; Max-Age=0; HttpOnly; SameSite=Lax; Path=/"),
    }
}
