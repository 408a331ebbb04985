use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a poll, vote or user.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub Uuid);

impl Id {
    pub const fn nil() -> Id {
        Id(Uuid::nil())
    }

    pub fn new() -> Id {
        Id(Uuid::new_v4())
    }

    /// Parses an identifier supplied by a caller. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Option<Id> {
        Uuid::parse_str(raw.trim()).ok().map(Id)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for Id {
    fn from(value: Uuid) -> Self {
        Id(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_padded_uuid() {
        let id = Id::new();
        assert_eq!(Id::parse(&format!("  {id} ")), Some(id));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Id::parse("not-a-poll"), None);
        assert_eq!(Id::parse(""), None);
    }
}
