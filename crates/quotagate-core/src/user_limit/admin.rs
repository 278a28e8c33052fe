//! Admin role bypass evaluation.

use std::collections::HashMap;

/// Configuration key holding comma-separated admin role names.
pub const ADMIN_ROLE_NAMES_KEY: &str = "ADMIN_ROLE_NAMES";

/// Normalized admin role names from the stored configuration value.
pub fn parse_admin_role_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Whether any of `user_roles` resolves to a configured admin role name.
///
/// Role names compare case-insensitively after trimming. An empty admin
/// list never grants bypass.
pub fn roles_grant_bypass(
    admin_names: &[String],
    user_roles: &[String],
    role_id_to_name: &HashMap<String, String>,
) -> bool {
    if admin_names.is_empty() {
        return false;
    }
    user_roles.iter().any(|role_id| {
        role_id_to_name
            .get(role_id)
            .map(|name| name.trim().to_lowercase())
            .is_some_and(|name| admin_names.contains(&name))
    })
}
