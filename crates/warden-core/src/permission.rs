//! Permission strings, wildcard matching, and the permission registry.
//!
//! Permissions are colon-delimited `section:action` strings. Stored
//! grants may use `*` as a wildcard: `users:*` covers every action in
//! the `users` section, `*:*` covers everything. Matching is pure and
//! store-independent so it can be tested in isolation.

/// Role level reserved for superadmins.
pub const SUPERADMIN_LEVEL: u32 = 999;

/// Admin sections and the actions available in each. The flat
/// `section:action` product of this table is the full permission space.
pub const PERMISSION_REGISTRY: &[(&str, &[&str])] = &[
    (
        "users",
        &[
            "read",
            "edit",
            "block",
            "delete",
            "sync",
            "promo_group",
            "balance",
            "subscription",
            "send_offer",
            "referral",
        ],
    ),
    ("tickets", &["read", "reply", "close", "settings"]),
    ("stats", &["read", "export"]),
    ("broadcasts", &["read", "create", "edit", "delete", "send"]),
    ("tariffs", &["read", "create", "edit", "delete"]),
    ("promocodes", &["read", "create", "edit", "delete", "stats"]),
    ("promo_groups", &["read", "create", "edit", "delete"]),
    ("promo_offers", &["read", "create", "edit", "send"]),
    ("campaigns", &["read", "create", "edit", "delete", "stats"]),
    ("partners", &["read", "edit", "approve", "revoke", "settings"]),
    ("withdrawals", &["read", "approve", "reject"]),
    ("payments", &["read", "edit", "export"]),
    ("payment_methods", &["read", "edit"]),
    ("servers", &["read", "edit"]),
    ("traffic", &["read", "export"]),
    ("settings", &["read", "edit"]),
    ("roles", &["read", "create", "edit", "delete", "assign"]),
    ("audit_log", &["read", "export"]),
    ("channels", &["read", "edit"]),
    ("ban_system", &["read", "edit", "ban", "unban"]),
    ("apps", &["read", "edit"]),
    ("email_templates", &["read", "edit"]),
    ("updates", &["read", "manage"]),
];

/// Flat list of every concrete permission: `["users:read", ...]`.
pub fn all_permissions() -> Vec<String> {
    PERMISSION_REGISTRY
        .iter()
        .flat_map(|(section, actions)| {
            actions
                .iter()
                .map(move |action| format!("{section}:{action}"))
        })
        .collect()
}

/// Check whether the stored grant `pattern` covers `required`.
///
/// Semantics are deliberately narrow: matching is case-sensitive, `*`
/// is the only metacharacter and matches any run of characters
/// (including `:`), and everything else must match literally. There is
/// no `?` and there are no character classes.
pub fn permission_matches(pattern: &str, required: &str) -> bool {
    glob_match(pattern.as_bytes(), required.as_bytes())
}

/// Check whether an ABAC policy's `resource` (section pattern) and
/// `actions` (action patterns) apply to `required`.
///
/// `required` must be `section:action`; anything without a colon never
/// matches.
pub fn policy_applies(resource: &str, actions: &[String], required: &str) -> bool {
    let Some((section, action)) = required.split_once(':') else {
        return false;
    };

    if !glob_match(resource.as_bytes(), section.as_bytes()) {
        return false;
    }

    actions
        .iter()
        .any(|pattern| glob_match(pattern.as_bytes(), action.as_bytes()))
}

/// Iterative `*`-only glob match with backtracking to the most recent
/// star. Linear in `text` for any fixed pattern.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_t = 0usize;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some(s) = star {
            // Let the last star absorb one more character and retry.
            p = s + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}
