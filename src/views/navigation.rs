//! Navigation chrome
//!
//! Shown on every page. Authenticated sessions get the protected links and
//! the user menu; everyone else gets the login button.

use serde::Serialize;
use tokio_stream::{Stream, StreamExt};

use crate::auth::{Access, Session, SessionWatcher, gate};

pub const BRAND: &str = "RelayForge";

/// A link in the chrome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

impl NavLink {
    fn new(label: &str, href: &str) -> Self {
        Self {
            label: label.to_string(),
            href: href.to_string(),
        }
    }
}

/// A state-changing entry, submitted with `method` rather than followed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavAction {
    pub label: String,
    pub href: String,
    pub method: String,
}

/// Right-hand side of the chrome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountArea {
    LoginButton {
        label: String,
        href: String,
    },
    UserMenu {
        username: String,
        avatar_url: String,
        items: Vec<NavLink>,
        logout: NavAction,
    },
}

/// View model of the navigation chrome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationModel {
    pub brand: String,
    pub links: Vec<NavLink>,
    pub account: AccountArea,
}

impl NavigationModel {
    pub fn from_session(session: &Session) -> Self {
        let mut links = vec![NavLink::new("Home", "/")];

        let account = match gate::access(session) {
            Access::Granted { identity } => {
                links.push(NavLink::new("Workflows", "/workflows"));
                links.push(NavLink::new("Runners", "/runners"));
                AccountArea::UserMenu {
                    username: identity.username,
                    avatar_url: identity.avatar_url,
                    items: vec![NavLink::new("Profile", "/profile")],
                    logout: NavAction {
                        label: "Logout".to_string(),
                        href: "/logout".to_string(),
                        method: "POST".to_string(),
                    },
                }
            }
            Access::Denied => AccountArea::LoginButton {
                label: "Login with GitHub".to_string(),
                href: "/login".to_string(),
            },
        };

        Self {
            brand: BRAND.to_string(),
            links,
            account,
        }
    }

    pub fn shows_login(&self) -> bool {
        matches!(self.account, AccountArea::LoginButton { .. })
    }
}

/// Re-render the chrome on every session change
///
/// Starts with the current session.
pub fn follow(watcher: SessionWatcher) -> impl Stream<Item = NavigationModel> {
    watcher
        .into_stream()
        .map(|session| NavigationModel::from_session(&session))
}
