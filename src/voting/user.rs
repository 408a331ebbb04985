use serde::Serialize;
use super::id::Id;

/// A registered account as known to the store. Credentials live with the identity provider.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct User {
    pub id: Id,
    pub display_name: String,
}

impl User {
    pub fn new(id: Id, display_name: impl Into<String>) -> User {
        User { id, display_name: display_name.into() }
    }
}
