use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity handed out by the remote source; never interpreted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(u64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: Company,
}

impl UserRecord {
    /// Phone number without the extension suffix (`1-770-736-8031 x56442`).
    pub fn phone_display(&self) -> &str {
        self.phone.split(' ').next().unwrap_or_default()
    }
}
