//! Engine configuration.

use warden_core::models::user::User;

/// Configuration for the permission engine.
///
/// The admin lists form the legacy escape hatch: identities listed
/// here bypass RBAC/ABAC entirely so operators keep access while the
/// role tables are empty or broken. Checked first in every evaluation.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Telegram IDs granted unconditional admin access.
    pub admin_telegram_ids: Vec<i64>,
    /// Email addresses granted unconditional admin access. Matched
    /// case-insensitively and only against verified emails.
    pub admin_emails: Vec<String>,
}

impl EngineConfig {
    /// Check whether the user matches the static admin allow-list.
    pub fn is_legacy_admin(&self, user: &User) -> bool {
        if let Some(telegram_id) = user.telegram_id
            && self.admin_telegram_ids.contains(&telegram_id)
        {
            return true;
        }

        if user.email_verified
            && let Some(email) = &user.email
        {
            return self
                .admin_emails
                .iter()
                .any(|admin| admin.eq_ignore_ascii_case(email));
        }

        false
    }
}
