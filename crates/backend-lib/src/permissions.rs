// ============================
// crates/backend-lib/src/permissions.rs
// ============================
//! Path-prefix permission classification.
//!
//! Matching is plain string prefix, not path-segment aware: the prefix
//! `/admin` also covers `/admin2` and `/administrator`. Configure prefixes
//! with a trailing slash where that matters.
use serde::{Deserialize, Serialize};

/// Access tier a path prefix belongs to
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Admin,
    User,
    Public,
}

/// Outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Admin, user and public path prefixes
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PermissionTable {
    pub admin_paths: Vec<String>,
    pub user_paths: Vec<String>,
    pub public_paths: Vec<String>,
    /// Allow `/` regardless of the prefix lists
    pub root_is_public: bool,
}

impl Default for PermissionTable {
    fn default() -> Self {
        let owned = |paths: &[&str]| paths.iter().map(|p| (*p).to_string()).collect();
        Self {
            admin_paths: owned(&["/admin"]),
            user_paths: owned(&["/profiles", "/data"]),
            public_paths: owned(&[
                "/login",
                "/register",
                "/favicon.ico",
                "/style",
                "/img",
                "/js",
                "/robots.txt",
                "/sitemap_index.xml",
            ]),
            root_is_public: true,
        }
    }
}

impl PermissionTable {
    /// A table with no prefixes at all; every path except a public root is denied
    pub fn empty() -> Self {
        Self {
            admin_paths: Vec::new(),
            user_paths: Vec::new(),
            public_paths: Vec::new(),
            root_is_public: true,
        }
    }

    pub fn paths(&self, tier: Tier) -> &[String] {
        match tier {
            Tier::Admin => &self.admin_paths,
            Tier::User => &self.user_paths,
            Tier::Public => &self.public_paths,
        }
    }

    fn paths_mut(&mut self, tier: Tier) -> &mut Vec<String> {
        match tier {
            Tier::Admin => &mut self.admin_paths,
            Tier::User => &mut self.user_paths,
            Tier::Public => &mut self.public_paths,
        }
    }

    /// Append a prefix to a tier
    pub fn add_path(&mut self, tier: Tier, prefix: impl Into<String>) {
        self.paths_mut(tier).push(prefix.into());
    }

    /// Replace all prefixes of a tier
    pub fn set_paths(&mut self, tier: Tier, prefixes: Vec<String>) {
        *self.paths_mut(tier) = prefixes;
    }

    /// Drop every admin and user prefix
    pub fn reset(&mut self) {
        self.admin_paths.clear();
        self.user_paths.clear();
    }

    /// Decide whether a caller may access `path`.
    ///
    /// Admin prefixes are checked first and are authoritative, then user
    /// prefixes, then public prefixes. Anything unmatched is denied.
    pub fn decide(&self, path: &str, is_logged_in: bool, is_admin: bool) -> Decision {
        if self.root_is_public && path == "/" {
            return Decision::Allow;
        }

        let matches = |tier| self.paths(tier).iter().any(|p| path.starts_with(p.as_str()));

        let allowed = if matches(Tier::Admin) {
            is_logged_in && is_admin
        } else if matches(Tier::User) {
            is_logged_in
        } else {
            matches(Tier::Public)
        };

        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}
