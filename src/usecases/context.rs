/// Explicit session identity passed into every chat-core operation.
/// Nothing in the core reads identity or credentials ambiently; the token
/// comes from an external identity provider and is treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: String,
    pub access_token: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }
}
