use std::fmt;

use crate::model::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("please enter a username")]
    MissingUsername,
    #[error("unknown user '{0}'")]
    UnknownUser(String),
}

/// The identity performing a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Actor {
            name: name.into(),
            role,
        }
    }

    /// Resolve one of the two built-in accounts.
    pub fn login(username: &str) -> Result<Actor, LoginError> {
        match username.trim() {
            "" => Err(LoginError::MissingUsername),
            "admin" => Ok(Actor::new("admin", Role::Admin)),
            "user" => Ok(Actor::new("user", Role::User)),
            other => Err(LoginError::UnknownUser(other.to_string())),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Gate for edits to an existing task. Locked tasks reject everyone,
/// admins included, until unlocked.
pub fn can_mutate(role: Role, task: &Task) -> bool {
    role == Role::Admin && !task.locked
}

/// Gate for structural edits that don't target a single existing task
/// (adding a main task, toggling a lock).
pub fn can_administer(role: Role) -> bool {
    role == Role::Admin
}
