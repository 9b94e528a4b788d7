use crate::domain::value_objects::{Role, UserId};
use crate::ports::member_directory::{MemberDirectory as MemberDirectoryTrait, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Mock implementation of MemberDirectory
///
/// Supports stateful testing by storing user IDs with their roles.
pub struct MemberDirectory {
    users: Mutex<HashMap<UserId, Role>>,
}

impl MemberDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Add a user for testing purposes
    pub fn add_user(&self, user_id: UserId, role: Role) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, role);
    }
}

impl Default for MemberDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemberDirectoryTrait for MemberDirectory {
    async fn user_exists(&self, user_id: UserId) -> Result<bool> {
        Ok(self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&user_id))
    }

    async fn get_role(&self, user_id: UserId) -> Result<Option<Role>> {
        Ok(self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .copied())
    }
}
