use std::fmt;

use shared::domain::Role;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub role: Role,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, role: Role) -> Self {
        Self {
            access_token: access_token.into(),
            role,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Holds the credential for the lifetime of one signed-in session.
#[derive(Debug, Default)]
pub struct CredentialStore {
    inner: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            inner: RwLock::new(Some(credential)),
        }
    }

    pub async fn set(&self, credential: Credential) {
        info!(role = ?credential.role, "auth: credential stored");
        *self.inner.write().await = Some(credential);
    }

    pub async fn clear(&self) {
        if self.inner.write().await.take().is_some() {
            info!("auth: credential cleared");
        }
    }

    pub async fn bearer(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|credential| credential.access_token.clone())
    }

    pub async fn role(&self) -> Option<Role> {
        self.inner.read().await.as_ref().map(|credential| credential.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", Credential::new("secret-token", Role::User));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("User"));
    }

    #[tokio::test]
    async fn store_set_and_clear() {
        let store = CredentialStore::new();
        assert_eq!(store.bearer().await, None);

        store.set(Credential::new("t-1", Role::Admin)).await;
        assert_eq!(store.bearer().await.as_deref(), Some("t-1"));
        assert_eq!(store.role().await, Some(Role::Admin));

        store.clear().await;
        assert_eq!(store.bearer().await, None);
        assert_eq!(store.role().await, None);
    }
}
