//! Role and permission catalog.
//!
//! The catalog is fixed at compile time: three roles with strictly
//! increasing priority, each mapped to the set of actions it may perform.
//! The database `permission_types` table is seeded from here at startup
//! (see [`crate::manager::UserManager::ensure_permission_types_seeded`])
//! and is never mutated at runtime.

pub const VIEW_PROFILE: &str = "view profile";
pub const VIEW_ALL_PROFILES: &str = "view all profiles";
pub const ASSIGN_ADMINISTRATOR: &str = "assign administrator";
pub const CREATE_TRANSFER: &str = "create transfer";
pub const CREATE_ACCOUNT: &str = "create account";

/// The three-tier role model. Priority orders roles for authorization:
/// when a user holds several available grants, the highest-priority one
/// decides what they may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Moderator,
    Administrator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Client, Role::Moderator, Role::Administrator];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Moderator => "moderator",
            Role::Administrator => "administrator",
        }
    }

    pub fn priority(self) -> i64 {
        match self {
            Role::Client => 0,
            Role::Moderator => 1,
            Role::Administrator => 2,
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "client" => Some(Role::Client),
            "moderator" => Some(Role::Moderator),
            "administrator" => Some(Role::Administrator),
            _ => None,
        }
    }
}

/// A catalog entry: a role and the actions it allows.
#[derive(Debug, Clone, Copy)]
pub struct Permission {
    pub role: Role,
    pub actions: &'static [&'static str],
}

impl Permission {
    pub fn allows(&self, action: &str) -> bool {
        self.actions.contains(&action)
    }
}

static CATALOG: [Permission; 3] = [
    Permission {
        role: Role::Client,
        actions: &[CREATE_TRANSFER, CREATE_ACCOUNT, VIEW_PROFILE],
    },
    Permission {
        role: Role::Moderator,
        actions: &[CREATE_TRANSFER, CREATE_ACCOUNT, VIEW_PROFILE, VIEW_ALL_PROFILES],
    },
    Permission {
        role: Role::Administrator,
        actions: &[
            CREATE_TRANSFER,
            CREATE_ACCOUNT,
            VIEW_PROFILE,
            VIEW_ALL_PROFILES,
            ASSIGN_ADMINISTRATOR,
        ],
    },
];

/// The full catalog, in priority order.
pub fn catalog() -> &'static [Permission] {
    &CATALOG
}

/// Looks up a catalog entry by stored role name.
pub fn resolve(role: &str) -> Option<&'static Permission> {
    CATALOG.iter().find(|permission| permission.role.as_str() == role)
}

/// True when `role` exists in the catalog and allows `action`.
pub fn is_action_allowed(role: &str, action: &str) -> bool {
    resolve(role).is_some_and(|permission| permission.allows(action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_strictly_increase() {
        assert!(Role::Client.priority() < Role::Moderator.priority());
        assert!(Role::Moderator.priority() < Role::Administrator.priority());
    }

    #[test]
    fn client_actions() {
        assert!(is_action_allowed("client", CREATE_TRANSFER));
        assert!(is_action_allowed("client", CREATE_ACCOUNT));
        assert!(is_action_allowed("client", VIEW_PROFILE));
        assert!(!is_action_allowed("client", VIEW_ALL_PROFILES));
        assert!(!is_action_allowed("client", ASSIGN_ADMINISTRATOR));
    }

    #[test]
    fn moderator_adds_view_all_profiles() {
        assert!(is_action_allowed("moderator", VIEW_ALL_PROFILES));
        assert!(!is_action_allowed("moderator", ASSIGN_ADMINISTRATOR));
    }

    #[test]
    fn administrator_allows_everything() {
        let admin = resolve("administrator").expect("catalog entry");
        for permission in catalog() {
            for action in permission.actions {
                assert!(admin.allows(action));
            }
        }
    }

    #[test]
    fn unknown_role_allows_nothing() {
        assert!(resolve("root").is_none());
        assert!(!is_action_allowed("root", VIEW_PROFILE));
    }

    #[test]
    fn role_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }
}
