//! User actions, end to end: gating, validation, the request, and the
//! resulting state change. Every failure comes back as an `Error` for the
//! caller to print.

use crate::api::Api;
use crate::error::{Error, Result};
use crate::model::{Credentials, HealthStatus, RegistrationForm, User};
use crate::table::UserTable;
use crate::transport::Transport;
use crate::validation::{self, EditDraft};
use serde_json::Value;

pub const MSG_ADMIN_ONLY: &str = "Only an administrator can view and edit users.";
pub const MSG_LOGIN_FIRST: &str = "Log in first";
pub const MSG_REGISTERED: &str = "Registration successful! You can now log in.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Home,
    About,
    Gallery,
    Support,
    Users,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Home, Tab::About, Tab::Gallery, Tab::Support, Tab::Users];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "home" | "main" => Some(Self::Home),
            "about" => Some(Self::About),
            "gallery" => Some(Self::Gallery),
            "support" => Some(Self::Support),
            "users" => Some(Self::Users),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::About => "about",
            Self::Gallery => "gallery",
            Self::Support => "support",
            Self::Users => "users",
        }
    }

    /// Static body for the informational tabs
    pub fn text(&self, user: &User) -> String {
        match self {
            Self::Home => format!("Welcome, {}! You are logged in.", user.username),
            Self::About => "This is a demo site shown after login.".to_string(),
            Self::Gallery => "Your gallery could be here.".to_string(),
            Self::Support => "For support, contact the administrator.".to_string(),
            Self::Users => String::new(),
        }
    }
}

pub struct App<T: Transport> {
    api: Api<T>,
    table: UserTable,
    tab: Tab,
}

impl<T: Transport> App<T> {
    pub fn new(api: Api<T>) -> Self {
        Self {
            api,
            table: UserTable::new(),
            tab: Tab::default(),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.api.sessions().current()
    }

    pub fn is_admin(&self) -> bool {
        self.api.sessions().is_admin()
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn table(&self) -> &UserTable {
        &self.table
    }

    fn require_login(&self) -> Result<User> {
        self.current_user().ok_or_else(|| Error::validation(MSG_LOGIN_FIRST))
    }

    fn require_admin(&self) -> Result<User> {
        let user = self.require_login()?;
        if !user.is_admin() {
            return Err(Error::validation(MSG_ADMIN_ONLY));
        }
        Ok(user)
    }

    /// Admin gate on its own, for callers that ask before acting
    pub fn check_admin(&self) -> Result<()> {
        self.require_admin().map(|_| ())
    }

    fn require_logged_out(&self) -> Result<()> {
        match self.current_user() {
            Some(user) => Err(Error::validation(format!(
                "Already logged in as {}",
                user.username
            ))),
            None => Ok(()),
        }
    }

    pub fn health(&self) -> Result<HealthStatus> {
        self.api.health()
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<User> {
        self.require_logged_out()?;
        validation::validate_login(username, password)?;
        let user = self.api.login(&Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        self.tab = Tab::Home;
        Ok(user)
    }

    pub fn register(&mut self, form: &RegistrationForm) -> Result<()> {
        self.require_logged_out()?;
        let new_user = validation::validate_registration(form)?;
        self.api.register(&new_user)
    }

    /// Clear the session and any admin state; fine to call when logged out
    pub fn logout(&mut self) -> Result<()> {
        self.table = UserTable::new();
        self.tab = Tab::Home;
        self.api
            .sessions()
            .logout()
            .map_err(|e| Error::Storage(e.to_string()))
    }

    /// Switch tabs. Entering the users tab loads the table for admins.
    pub fn open_tab(&mut self, tab: Tab) -> Result<()> {
        let user = self.require_login()?;
        self.tab = tab;
        if tab == Tab::Users && user.is_admin() {
            self.reload_users()?;
        }
        Ok(())
    }

    pub fn reload_users(&mut self) -> Result<&[User]> {
        self.require_admin()?;
        let users = self.api.list_users()?;
        self.table.replace(users);
        Ok(self.table.users())
    }

    pub fn search(&self, query: &str) -> Result<Vec<User>> {
        self.require_admin()?;
        self.api.search_users(query)
    }

    pub fn start_edit(&mut self, id: i64) -> Result<&EditDraft> {
        self.require_admin()?;
        Ok(self.table.start_edit(id)?)
    }

    pub fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        Ok(self.table.set_field(field, value)?)
    }

    pub fn cancel_edit(&mut self) {
        self.table.cancel_edit();
    }

    /// Validate and send the open draft. The draft is kept on failure.
    pub fn save_edit(&mut self) -> Result<i64> {
        let acting = self.require_admin()?;
        let (id, update) = self.table.pending_update(acting.is_admin())?;
        self.api.update_user(id, &update)?;
        self.table.cancel_edit();
        Ok(id)
    }

    /// Delete a row; an open draft for that row goes with it
    pub fn delete_user(&mut self, id: i64) -> Result<()> {
        self.require_admin()?;
        self.api.delete_user(id)?;
        if self.table.editing().is_some_and(|(editing, _)| editing == id) {
            self.table.cancel_edit();
        }
        Ok(())
    }

    pub fn stats(&self) -> Result<Value> {
        if !self.api.sessions().is_authenticated() {
            return Err(Error::validation(MSG_LOGIN_FIRST));
        }
        self.api.stats()
    }
}
