use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Tenancy boundary a request is authorised against (spec §3, glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
pub enum ScopeType {
    Organization,
    Project,
    User,
    Platform,
}

/// A resolved scope: the type plus the tenant identifier it is scoped to.
/// `Platform` scope carries no meaningful `name` and adds no predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub scope_type: ScopeType,
    pub scope_name: String,
}

impl Scope {
    pub fn platform() -> Self {
        Self {
            scope_type: ScopeType::Platform,
            scope_name: String::new(),
        }
    }

    pub fn is_platform(&self) -> bool {
        matches!(self.scope_type, ScopeType::Platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_scope_has_no_name() {
        let s = Scope::platform();
        assert!(s.is_platform());
        assert_eq!(s.scope_name, "");
    }
}
