//! Navigation targets, login redirects and the route table.

use url::form_urlencoded;

/// Default login surface.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Query parameter carrying the original destination.
const REDIRECT_PARAM: &str = "redirect";

/// A navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub full_path: String,
    pub requires_auth: bool,
}

/// Redirect to the login surface, remembering where the user was going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    pub return_to: Option<String>,
}

impl Redirect {
    pub fn to_login(login_path: &str, return_to: &str) -> Self {
        Self {
            path: login_path.to_string(),
            return_to: Some(return_to.to_string()),
        }
    }

    /// Path plus the encoded `redirect` query parameter.
    pub fn location(&self) -> String {
        match &self.return_to {
            Some(return_to) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(REDIRECT_PARAM, return_to)
                    .finish();
                format!("{}?{}", self.path, query)
            }
            None => self.path.clone(),
        }
    }
}

/// Host navigation surface.
pub trait Navigator: Send + Sync {
    /// The route currently displayed (or being navigated to).
    fn current_route(&self) -> Option<RouteTarget>;

    fn redirect(&self, redirect: Redirect);
}

/// Decides which paths require an authenticated session.
#[derive(Debug, Clone)]
pub struct RouteTable {
    protected_prefixes: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(["/app"])
    }
}

impl RouteTable {
    pub fn new<I, S>(protected_prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protected_prefixes: protected_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn requires_auth(&self, full_path: &str) -> bool {
        let path = full_path
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default();

        self.protected_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn resolve(&self, full_path: &str) -> RouteTarget {
        RouteTarget {
            full_path: full_path.to_string(),
            requires_auth: self.requires_auth(full_path),
        }
    }
}
