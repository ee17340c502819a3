//! Admin user table: the loaded rows plus at most one edit in progress.

use crate::error::ValidationError;
use crate::model::{Role, User, UserUpdate};
use crate::validation::{self, EditDraft};

#[derive(Debug, Default)]
pub struct UserTable {
    users: Vec<User>,
    editing: Option<(i64, EditDraft)>,
}

impl UserTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn replace(&mut self, users: Vec<User>) {
        self.users = users;
    }

    /// Rows matching `query` on username/email (case-insensitive) or id.
    /// A blank query matches everything; otherwise the query is not trimmed.
    pub fn filtered(&self, query: &str) -> Vec<&User> {
        if query.trim().is_empty() {
            return self.users.iter().collect();
        }
        let q = query.to_lowercase();
        self.users
            .iter()
            .filter(|u| {
                u.username.to_lowercase().contains(&q)
                    || u.email_or_empty().to_lowercase().contains(&q)
                    || u.id.to_string().contains(&q)
            })
            .collect()
    }

    pub fn editing(&self) -> Option<(i64, &EditDraft)> {
        self.editing.as_ref().map(|(id, d)| (*id, d))
    }

    /// Start editing a row. Any draft already open is discarded.
    pub fn start_edit(&mut self, id: i64) -> Result<&EditDraft, ValidationError> {
        let user = self
            .users
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| ValidationError::new(format!("No such user: {}", id)))?;
        let draft = EditDraft::from_user(user);
        let (_, draft) = self.editing.insert((id, draft));
        Ok(&*draft)
    }

    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), ValidationError> {
        let (_, draft) = self
            .editing
            .as_mut()
            .ok_or_else(|| ValidationError::new("No edit in progress"))?;
        match field {
            "username" => draft.username = value.to_string(),
            "email" => draft.email = value.to_string(),
            "password" => draft.password = value.to_string(),
            "role" => {
                draft.role = Role::from_str(value)
                    .ok_or_else(|| ValidationError::new("Role must be user or admin"))?;
            }
            other => {
                return Err(ValidationError::new(format!(
                    "Unknown field: {}. Use username, email, password or role",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Validated update for the open draft, with the id it applies to
    pub fn pending_update(
        &self,
        acting_is_admin: bool,
    ) -> Result<(i64, UserUpdate), ValidationError> {
        let (id, draft) = self
            .editing
            .as_ref()
            .ok_or_else(|| ValidationError::new("No edit in progress"))?;
        let update = validation::build_update(draft, acting_is_admin)?;
        Ok((*id, update))
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }
}
