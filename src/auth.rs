// ============================================================================
// Caller identity from reverse-proxy headers
// ============================================================================
//
// The forward-auth proxy in front of the intern host authenticates the user
// and injects Remote-User / Remote-Name / Remote-Email / Remote-Groups.
//
// SECURITY: these headers are trusted unconditionally. The intern host MUST
// only be reachable through that proxy, and the proxy MUST strip any
// client-supplied Remote-* headers. Nothing here re-validates them.
//
// ============================================================================

use axum::http::HeaderMap;
use serde::Serialize;

pub const REMOTE_USER_HEADER: &str = "remote-user";
pub const REMOTE_NAME_HEADER: &str = "remote-name";
pub const REMOTE_EMAIL_HEADER: &str = "remote-email";
pub const REMOTE_GROUPS_HEADER: &str = "remote-groups";

/// Group whose members may manage devices
pub const SUDOERS_GROUP: &str = "sudoers";

/// Identity of the caller for the lifetime of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthInfo {
    pub username: String,
    pub name: String,
    pub email: String,
    pub groups: Vec<String>,
}

impl AuthInfo {
    /// Identity reported when no caller was published for the request
    pub fn anonymous() -> Self {
        Self {
            username: "unknown".to_string(),
            name: "Unknown User".to_string(),
            email: String::new(),
            groups: Vec::new(),
        }
    }

    /// Simulated caller used in development when the proxy is absent
    pub fn development() -> Self {
        Self {
            username: "dev_user".to_string(),
            name: "Development User (Simulated)".to_string(),
            email: "dev_user@example.com".to_string(),
            groups: parse_groups("users,sudoers"),
        }
    }

    /// Build the identity from proxy headers; `None` without a `Remote-User`
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let username = header_str(headers, REMOTE_USER_HEADER)?;
        if username.is_empty() {
            return None;
        }

        Some(Self {
            username: username.to_string(),
            name: header_str(headers, REMOTE_NAME_HEADER)
                .unwrap_or_default()
                .to_string(),
            email: header_str(headers, REMOTE_EMAIL_HEADER)
                .unwrap_or_default()
                .to_string(),
            groups: parse_groups(header_str(headers, REMOTE_GROUPS_HEADER).unwrap_or_default()),
        })
    }

    pub fn is_anonymous(&self) -> bool {
        self.username == "unknown" && self.groups.is_empty()
    }

    pub fn is_sudoer(&self) -> bool {
        self.in_group(SUDOERS_GROUP)
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Split a comma-separated group list. Entries are trimmed and empty ones
/// dropped, so `""` yields no groups.
pub fn parse_groups(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_from_headers_full_identity() {
        let map = headers(&[
            ("remote-user", "alice"),
            ("remote-name", "Alice Example"),
            ("remote-email", "alice@example.com"),
            ("remote-groups", " users , sudoers "),
        ]);

        let info = AuthInfo::from_headers(&map).unwrap();
        assert_eq!(info.username, "alice");
        assert_eq!(info.name, "Alice Example");
        assert_eq!(info.email, "alice@example.com");
        assert_eq!(info.groups, vec!["users", "sudoers"]);
        assert!(info.is_sudoer());
    }

    #[test]
    fn test_absent_groups_header_yields_empty_list() {
        let info = AuthInfo::from_headers(&headers(&[("remote-user", "bob")])).unwrap();
        assert!(info.groups.is_empty());
        assert!(!info.is_sudoer());

        let info = AuthInfo::from_headers(&headers(&[("remote-user", "bob"), ("remote-groups", "")]))
            .unwrap();
        assert!(info.groups.is_empty());
    }

    #[test]
    fn test_missing_user_publishes_nothing() {
        assert!(AuthInfo::from_headers(&HeaderMap::new()).is_none());
        assert!(AuthInfo::from_headers(&headers(&[("remote-user", "  ")])).is_none());
        assert!(AuthInfo::from_headers(&headers(&[("remote-groups", "sudoers")])).is_none());
    }

    #[test]
    fn test_parse_groups_drops_empty_entries() {
        assert_eq!(parse_groups("a,,b, ,c"), vec!["a", "b", "c"]);
        assert!(parse_groups(" , ").is_empty());
    }

    #[test]
    fn test_anonymous_identity() {
        let anon = AuthInfo::anonymous();
        assert_eq!(anon.username, "unknown");
        assert!(anon.groups.is_empty());
        assert!(anon.is_anonymous());
        assert!(!AuthInfo::development().is_anonymous());
        assert!(AuthInfo::development().is_sudoer());
    }
}
