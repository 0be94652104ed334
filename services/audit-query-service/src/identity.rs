//! Trusted-header identity extraction (spec §6 "Authentication is
//! external"). The service never authenticates a request itself; it
//! trusts `X-Remote-*` headers populated by an upstream front-door and
//! resolves scope from two specific extra keys.

use actix_web::HttpRequest;
use std::collections::HashMap;
use telemetry_models::scope::{Scope, ScopeType};

const USER_HEADER: &str = "x-remote-user";
const UID_HEADER: &str = "x-remote-uid";
const GROUP_HEADER: &str = "x-remote-group";
const EXTRA_PREFIX: &str = "x-remote-extra-";

const SCOPE_TYPE_EXTRA: &str = "parent-type";
const SCOPE_NAME_EXTRA: &str = "parent-name";

#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub username: String,
    pub uid: String,
    pub groups: Vec<String>,
    pub extra: HashMap<String, Vec<String>>,
}

impl Identity {
    pub fn from_request(req: &HttpRequest) -> Self {
        let mut groups = Vec::new();
        let mut extra: HashMap<String, Vec<String>> = HashMap::new();
        let mut username = String::new();
        let mut uid = String::new();

        for (name, value) in req.headers() {
            let name = name.as_str().to_ascii_lowercase();
            let Ok(value) = value.to_str() else { continue };

            if name == USER_HEADER {
                username = value.to_string();
            } else if name == UID_HEADER {
                uid = value.to_string();
            } else if name == GROUP_HEADER {
                groups.push(value.to_string());
            } else if let Some(key) = name.strip_prefix(EXTRA_PREFIX) {
                extra.entry(key.to_string()).or_default().push(value.to_string());
            }
        }

        Self { username, uid, groups, extra }
    }

    fn extra_first(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    /// Resolve scope from the `parent-type`/`parent-name` extras. Defaults
    /// to Platform scope when either is absent or unparsable (spec §4.9).
    pub fn scope(&self) -> Scope {
        let scope_type = self
            .extra_first(SCOPE_TYPE_EXTRA)
            .and_then(|s| s.parse::<ScopeType>().ok());
        let scope_name = self.extra_first(SCOPE_NAME_EXTRA).map(str::to_string);

        match (scope_type, scope_name) {
            (Some(scope_type), Some(scope_name)) if !scope_name.is_empty() => Scope { scope_type, scope_name },
            _ => Scope::platform(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn defaults_to_platform_scope_when_extras_absent() {
        let req = TestRequest::default().to_http_request();
        let identity = Identity::from_request(&req);
        assert!(identity.scope().is_platform());
    }

    #[test]
    fn resolves_tenant_scope_from_extras() {
        let req = TestRequest::default()
            .insert_header(("X-Remote-User", "alice"))
            .insert_header(("X-Remote-Uid", "u1"))
            .insert_header(("X-Remote-Extra-parent-type", "Organization"))
            .insert_header(("X-Remote-Extra-parent-name", "acme"))
            .to_http_request();
        let identity = Identity::from_request(&req);
        let scope = identity.scope();
        assert_eq!(scope.scope_type, ScopeType::Organization);
        assert_eq!(scope.scope_name, "acme");
        assert_eq!(identity.username, "alice");
    }

    #[test]
    fn collects_repeating_group_headers() {
        let req = TestRequest::default()
            .insert_header(("X-Remote-Group", "system:authenticated"))
            .insert_header(("X-Remote-Group", "system:masters"))
            .to_http_request();
        let identity = Identity::from_request(&req);
        assert_eq!(identity.groups.len(), 2);
    }
}
