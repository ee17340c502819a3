//! Form validation. Everything here runs before any request is built.

use crate::error::ValidationError;
use crate::model::{NewUser, RegistrationForm, Role, User, UserUpdate};

pub const MIN_PASSWORD_LEN: usize = 6;

pub const MSG_LOGIN_REQUIRED: &str = "Enter username and password";
pub const MSG_USERNAME_REQUIRED: &str = "Enter a username";
pub const MSG_EMAIL_REQUIRED: &str = "Enter an email";
pub const MSG_EMAIL_INVALID: &str = "Enter a valid email";
pub const MSG_PASSWORD_REQUIRED: &str = "Enter a password";
pub const MSG_PASSWORD_SHORT: &str = "Password must be at least 6 characters";
pub const MSG_PASSWORD_MISMATCH: &str = "Passwords do not match";
pub const MSG_FIELDS_REQUIRED: &str = "Fill in all required fields";

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn too_short(password: &str) -> bool {
    password.chars().count() < MIN_PASSWORD_LEN
}

pub fn validate_login(username: &str, password: &str) -> Result<(), ValidationError> {
    if is_blank(username) || is_blank(password) {
        return Err(ValidationError::new(MSG_LOGIN_REQUIRED));
    }
    Ok(())
}

/// Check a registration form and build the request body.
/// Only the first failing rule is reported.
pub fn validate_registration(form: &RegistrationForm) -> Result<NewUser, ValidationError> {
    let rules: [(bool, &str); 6] = [
        (is_blank(&form.username), MSG_USERNAME_REQUIRED),
        (is_blank(&form.email), MSG_EMAIL_REQUIRED),
        (!form.email.contains('@'), MSG_EMAIL_INVALID),
        (is_blank(&form.password), MSG_PASSWORD_REQUIRED),
        (too_short(&form.password), MSG_PASSWORD_SHORT),
        (form.password != form.confirm_password, MSG_PASSWORD_MISMATCH),
    ];
    if let Some((_, message)) = rules.iter().find(|(failed, _)| *failed) {
        return Err(ValidationError::new(*message));
    }

    Ok(NewUser {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password.clone(),
    })
}

/// In-progress edit of one user row
#[derive(Debug, Clone, PartialEq)]
pub struct EditDraft {
    pub username: String,
    pub email: String,
    /// Blank means "keep the current password"
    pub password: String,
    pub role: Role,
}

impl EditDraft {
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email_or_empty().to_string(),
            password: String::new(),
            role: user.role,
        }
    }
}

/// Validate a draft and turn it into the PUT body.
/// `role` is only sent when the acting session is an admin.
pub fn build_update(
    draft: &EditDraft,
    acting_is_admin: bool,
) -> Result<UserUpdate, ValidationError> {
    if is_blank(&draft.username) || is_blank(&draft.email) {
        return Err(ValidationError::new(MSG_FIELDS_REQUIRED));
    }

    let password = if is_blank(&draft.password) {
        None
    } else if too_short(&draft.password) {
        return Err(ValidationError::new(MSG_PASSWORD_SHORT));
    } else {
        Some(draft.password.clone())
    };

    Ok(UserUpdate {
        username: Some(draft.username.clone()),
        email: Some(draft.email.clone()),
        password,
        role: acting_is_admin.then_some(draft.role),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(username: &str, email: &str, password: &str, confirm: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    fn draft(password: &str) -> EditDraft {
        EditDraft {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: password.to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_login_rejects_blank() {
        for (u, p) in [("", "secret1"), ("alice", ""), ("   ", "secret1"), ("alice", " \t ")] {
            let err = validate_login(u, p).unwrap_err();
            assert_eq!(err.message, MSG_LOGIN_REQUIRED);
        }
        assert!(validate_login("alice", "secret1").is_ok());
    }

    #[test]
    fn test_registration_precedence() {
        let cases = [
            (form("", "", "", "x"), MSG_USERNAME_REQUIRED),
            (form("bob", " ", "", "x"), MSG_EMAIL_REQUIRED),
            (form("bob", "bob.example.com", "", "x"), MSG_EMAIL_INVALID),
            (form("bob", "bob@example.com", "  ", "x"), MSG_PASSWORD_REQUIRED),
            (form("bob", "bob@example.com", "abc", "xyz"), MSG_PASSWORD_SHORT),
            (form("bob", "bob@example.com", "secret1", "secret2"), MSG_PASSWORD_MISMATCH),
        ];
        for (input, expected) in cases {
            assert_eq!(validate_registration(&input).unwrap_err().message, expected);
        }
    }

    #[test]
    fn test_registration_short_password_with_matching_confirmation() {
        let err = validate_registration(&form("bob", "bob@example.com", "abc", "abc")).unwrap_err();
        assert_eq!(err.message, MSG_PASSWORD_SHORT);
    }

    #[test]
    fn test_registration_trims_identity_not_password() {
        let input = form("  bob ", " bob@example.com ", " pass12", " pass12");
        let body = validate_registration(&input).unwrap();
        assert_eq!(body.username, "bob");
        assert_eq!(body.email, "bob@example.com");
        assert_eq!(body.password, " pass12");
    }

    #[test]
    fn test_update_blank_password_omitted() {
        let update = build_update(&draft("   "), true).unwrap();
        assert!(update.password.is_none());
        let body = serde_json::to_value(&update).unwrap();
        assert!(body.get("password").is_none());
    }

    #[test]
    fn test_update_short_password_blocks() {
        let err = build_update(&draft("12345"), true).unwrap_err();
        assert_eq!(err.message, MSG_PASSWORD_SHORT);
        let update = build_update(&draft("123456"), true).unwrap();
        assert_eq!(update.password.as_deref(), Some("123456"));
    }

    #[test]
    fn test_update_required_fields() {
        let mut d = draft("");
        d.email = " ".to_string();
        assert_eq!(build_update(&d, true).unwrap_err().message, MSG_FIELDS_REQUIRED);
        d.email = "a@b".to_string();
        d.username = String::new();
        assert_eq!(build_update(&d, true).unwrap_err().message, MSG_FIELDS_REQUIRED);
    }

    #[test]
    fn test_update_role_only_for_admin() {
        assert_eq!(build_update(&draft(""), true).unwrap().role, Some(Role::Admin));
        assert_eq!(build_update(&draft(""), false).unwrap().role, None);
    }
}
