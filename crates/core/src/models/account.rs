use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-defined bucket of holdings ("swing trades", "long hold", …).
///
/// `id` is stable for the account's lifetime and is the key into the
/// holdings map. Array position in the accounts list is the display order,
/// controlled by the user via move-up/move-down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
}

impl Account {
    /// Create an account with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }

    /// The account set seeded on first run, before the user creates any.
    pub fn default_set() -> Vec<Account> {
        [
            ("swing", "Swing"),
            ("long", "Long Hold"),
            ("steady", "Steady"),
            ("exit", "Closing Out"),
        ]
        .into_iter()
        .map(|(id, name)| Account {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
    }
}
