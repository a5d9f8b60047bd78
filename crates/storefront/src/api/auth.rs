//! Fixed-credential [`AuthProvider`] for tools and service accounts.

use secrecy::{ExposeSecret, SecretString};

use buildmart_core::{AuthProvider, User};

/// Always signed in as one user with one token.
pub struct StaticTokenAuth {
    token: Option<SecretString>,
    user: Option<User>,
}

impl StaticTokenAuth {
    #[must_use]
    pub const fn new(token: Option<SecretString>, user: Option<User>) -> Self {
        Self { token, user }
    }

    /// No token and no user.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self::new(None, None)
    }
}

impl AuthProvider for StaticTokenAuth {
    fn token(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|token| token.expose_secret().to_string())
    }

    fn current_user(&self) -> Option<User> {
        self.user.clone()
    }
}

impl std::fmt::Debug for StaticTokenAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenAuth")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .finish()
    }
}
