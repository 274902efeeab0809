//! Bearer-token persistence and the login/register/logout flows that use it.

use crate::api::{ApiError, AuthUser};
use crate::core::backend::Backend;
use keyring::Entry;
use std::fmt;
use std::sync::{Arc, Mutex};

const KEYRING_SERVICE: &str = "chatpdf";

pub type TokenStoreError = Box<dyn std::error::Error + Send + Sync>;

/// Where the backend's access token lives between runs.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str) -> Result<(), TokenStoreError>;
    fn clear(&self) -> Result<(), TokenStoreError>;
}

pub type SharedTokenStore = Arc<dyn TokenStore>;

/// A keyring failure, flagged recoverable when the platform backend was
/// only temporarily unavailable (locked keychain, no session bus yet).
#[derive(Clone, Debug)]
pub struct KeyringFailure {
    recoverable: bool,
    source: Arc<keyring::Error>,
}

impl KeyringFailure {
    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }
}

impl From<keyring::Error> for KeyringFailure {
    fn from(err: keyring::Error) -> Self {
        let recoverable = matches!(
            err,
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_)
        );
        Self {
            recoverable,
            source: Arc::new(err),
        }
    }
}

impl fmt::Display for KeyringFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for KeyringFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

#[derive(Clone, Debug)]
enum CachedToken {
    Present(String),
    Missing,
    Error(KeyringFailure),
}

/// Token store backed by the system keyring, one entry per backend origin.
pub struct KeyringTokenStore {
    account: String,
    cache: Mutex<Option<CachedToken>>,
}

impl KeyringTokenStore {
    pub fn new(backend_origin: &str) -> Self {
        Self {
            account: backend_origin.trim_end_matches('/').to_string(),
            cache: Mutex::new(None),
        }
    }

    fn entry(&self) -> Result<Entry, KeyringFailure> {
        Entry::new(KEYRING_SERVICE, &self.account).map_err(KeyringFailure::from)
    }

    fn remember(&self, value: CachedToken) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(value);
        }
    }

    fn lookup(&self) -> CachedToken {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(err) => return CachedToken::Error(err),
        };
        match entry.get_password() {
            Ok(token) => CachedToken::Present(token),
            Err(keyring::Error::NoEntry) => CachedToken::Missing,
            Err(err) => CachedToken::Error(KeyringFailure::from(err)),
        }
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Option<String> {
        let cached = self.cache.lock().ok().and_then(|cache| cache.clone());
        let value = match cached {
            Some(value) => value,
            None => {
                let value = self.lookup();
                // Recoverable failures are retried on the next lookup.
                let cacheable = match &value {
                    CachedToken::Error(err) => !err.is_recoverable(),
                    _ => true,
                };
                if cacheable {
                    self.remember(value.clone());
                }
                value
            }
        };
        match value {
            CachedToken::Present(token) => Some(token),
            CachedToken::Missing => None,
            CachedToken::Error(err) => {
                tracing::warn!(error = %err, "keyring lookup failed; continuing without a token");
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        self.entry()?.set_password(token)?;
        self.remember(CachedToken::Present(token.to_string()));
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                self.remember(CachedToken::Missing);
                Ok(())
            }
            Err(err) => Err(Box::new(err)),
        }
    }
}

/// Process-local token store; used when the keyring is disabled and in tests.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.lock().ok().and_then(|token| token.clone())
    }

    fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_string());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum AuthError {
    Api(ApiError),
    Store(TokenStoreError),
    MissingInput(&'static str),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Api(err) => write!(f, "{}", err.describe("Authentication failed")),
            AuthError::Store(err) => write!(f, "Failed to store access token: {err}"),
            AuthError::MissingInput(what) => write!(f, "Please enter {what}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Api(err) => Some(err),
            AuthError::Store(err) => Some(err.as_ref()),
            AuthError::MissingInput(_) => None,
        }
    }
}

fn check_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::MissingInput("an email address"));
    }
    if password.is_empty() {
        return Err(AuthError::MissingInput("a password"));
    }
    Ok(())
}

pub async fn login(
    backend: &dyn Backend,
    store: &dyn TokenStore,
    email: &str,
    password: &str,
) -> Result<AuthUser, AuthError> {
    check_credentials(email, password)?;
    let response = backend
        .login(email.trim(), password)
        .await
        .map_err(AuthError::Api)?;
    store
        .set(&response.access_token)
        .map_err(AuthError::Store)?;
    tracing::info!(user = %response.user.email, "logged in");
    Ok(response.user)
}

pub async fn register(
    backend: &dyn Backend,
    store: &dyn TokenStore,
    email: &str,
    password: &str,
) -> Result<AuthUser, AuthError> {
    check_credentials(email, password)?;
    let response = backend
        .register(email.trim(), password)
        .await
        .map_err(AuthError::Api)?;
    store
        .set(&response.access_token)
        .map_err(AuthError::Store)?;
    tracing::info!(user = %response.user.email, "registered");
    Ok(response.user)
}

pub fn logout(store: &dyn TokenStore) -> Result<(), AuthError> {
    store.clear().map_err(AuthError::Store)
}
