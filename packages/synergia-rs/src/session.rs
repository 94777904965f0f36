//! Cookie accumulation and the established session.

use std::collections::BTreeMap;

/// Additive cookie store threaded through the login steps.
///
/// Every step merges the cookies the server set; a same-name cookie
/// overwrites the previous value. The set starts empty for each logical
/// login and is never shared between concurrent logins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSet {
    cookies: BTreeMap<String, String>,
}

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge new cookies into the set, overwriting on name collision.
    pub fn merge(&mut self, new_cookies: &[(String, String)]) {
        for (name, value) in new_cookies {
            self.cookies.insert(name.clone(), value.clone());
        }
    }

    /// Render the set as a `Cookie` header value.
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn contains_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.cookies.contains_key(*name))
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Authenticated cookie set proving a successful login.
///
/// Read-only once established: the concurrent data retrievals all borrow
/// the same session and none of them mutate it. Discarded at the end of
/// the request; sessions are never persisted or pooled.
#[derive(Debug, Clone)]
pub struct Session {
    cookies: CookieSet,
}

impl Session {
    pub(crate) fn new(cookies: CookieSet) -> Self {
        Self { cookies }
    }

    pub fn cookies(&self) -> &CookieSet {
        &self.cookies
    }
}
