use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Visitor,
    Banned,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Visitor => "visitor",
            Role::Banned => "banned",
        }
    }

    /// Unknown stored values are treated as the least privileged role.
    pub fn parse(raw: &str) -> Role {
        match raw {
            "admin" => Role::Admin,
            "banned" => Role::Banned,
            _ => Role::Visitor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub country: Option<String>,
    pub picture_url: Option<String>,
    pub role: String,
    pub is_verified: bool,
    pub last_login: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_and_unknown() {
        for role in [Role::Admin, Role::Visitor, Role::Banned] {
            assert_eq!(Role::parse(role.as_str()), role);
        }
        assert_eq!(Role::parse("superuser"), Role::Visitor);
    }
}
