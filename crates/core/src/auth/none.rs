use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that accepts all requests.
///
/// The caller is identified by the upstream `x-user-email` header when
/// present, otherwise anonymous. Must be explicitly configured.
pub struct NoneAuthenticator;

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoneAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(match request.user_email() {
            Some(email) => Identity::for_email(email, self.method_name()),
            None => Identity::anonymous(),
        })
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
