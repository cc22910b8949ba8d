use crate::{
    error::{AppError, AppResult},
    models::{RegisterUserRequest, User},
    repository::Repository,
};
use uuid::Uuid;

/// CredentialVerifier
///
/// The single seam through which a presented password is checked against the stored
/// credential. Swapping in a hashing scheme only means providing another implementation.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, stored: &str, presented: &str) -> bool;
}

/// PlaintextCredentials
///
/// Verbatim equality. Stored passwords are not hashed; this is a known weakness kept
/// for compatibility with existing accounts.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextCredentials;

impl CredentialVerifier for PlaintextCredentials {
    fn verify(&self, stored: &str, presented: &str) -> bool {
        stored == presented
    }
}

/// IdentityStore
///
/// Registration and lookup of `User` records, plus the credential check used by login.
/// Borrowed over the shared repository; cheap to build per request.
pub struct IdentityStore<'a> {
    repo: &'a dyn Repository,
    verifier: &'a dyn CredentialVerifier,
}

static PLAINTEXT: PlaintextCredentials = PlaintextCredentials;

impl<'a> IdentityStore<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self {
            repo,
            verifier: &PLAINTEXT,
        }
    }

    pub fn with_verifier(repo: &'a dyn Repository, verifier: &'a dyn CredentialVerifier) -> Self {
        Self { repo, verifier }
    }

    /// register
    ///
    /// Creates a user. `login_name`, `password`, `first_name` and `last_name` are required;
    /// the optional profile fields default to empty. Fails with `Conflict` when the
    /// login name is already taken (exact, case-sensitive match).
    pub async fn register(&self, req: RegisterUserRequest) -> AppResult<User> {
        if req.login_name.is_empty()
            || req.password.is_empty()
            || req.first_name.is_empty()
            || req.last_name.is_empty()
        {
            return Err(AppError::validation(
                "Missing required fields: login_name, password, first_name, and last_name are required.",
            ));
        }

        if self.repo.get_user_by_login(&req.login_name).await?.is_some() {
            return Err(AppError::conflict(format!(
                "User with login_name \"{}\" already exists.",
                req.login_name
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            login_name: req.login_name,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            location: req.location.unwrap_or_default(),
            description: req.description.unwrap_or_default(),
            occupation: req.occupation.unwrap_or_default(),
        };

        let created = self.repo.insert_user(user).await?;
        tracing::info!(user_id = %created.id, login_name = %created.login_name, "user registered");
        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        self.repo.get_user(id).await
    }

    pub async fn find_by_login_name(&self, login_name: &str) -> AppResult<Option<User>> {
        self.repo.get_user_by_login(login_name).await
    }

    /// check_credentials
    ///
    /// Returns the user whose login name and password both match, else `Auth`.
    /// Unknown names and wrong passwords produce the same error.
    pub async fn check_credentials(&self, login_name: &str, password: &str) -> AppResult<User> {
        match self.repo.get_user_by_login(login_name).await? {
            Some(user) if self.verifier.verify(&user.password, password) => Ok(user),
            _ => {
                tracing::warn!(login_name = %login_name, "rejected credentials");
                Err(AppError::auth("Invalid login name or password"))
            }
        }
    }
}
