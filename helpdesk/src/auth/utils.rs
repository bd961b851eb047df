//! Display name and admin status derivations. Pure, never fail.

use crate::api::models::users::{CurrentUser, Permissions};
use crate::db::models::users::{EnhancedUser, UserProfile};
use crate::types::UserId;

/// Profile name if it has non-whitespace content, else email if non-empty, else the id.
fn fallback_name(display_name: Option<&str>, email: Option<&str>, id: &UserId) -> String {
    if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    if let Some(email) = email.filter(|e| !e.is_empty()) {
        return email.to_string();
    }
    id.to_string()
}

pub fn has_display_name(profile: Option<&UserProfile>) -> bool {
    profile
        .and_then(|p| p.display_name.as_deref())
        .is_some_and(|name| !name.trim().is_empty())
}

pub fn full_name(user: &CurrentUser, profile: Option<&UserProfile>) -> String {
    fallback_name(profile.and_then(|p| p.display_name.as_deref()), user.email.as_deref(), &user.id)
}

pub fn first_name(user: &CurrentUser, profile: Option<&UserProfile>) -> String {
    let name = full_name(user, profile);
    name.split(' ').next().unwrap_or_default().to_string()
}

pub fn display_name_from_enhanced(user: &EnhancedUser) -> String {
    fallback_name(user.display_name.as_deref(), user.email.as_deref(), &user.id)
}

pub fn is_admin_user(user: Option<&EnhancedUser>) -> bool {
    user.is_some_and(|u| u.permissions == Some(Permissions::Admin))
}

pub fn is_admin(profile: Option<&UserProfile>) -> bool {
    profile.is_some_and(|p| p.permissions == Permissions::Admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(email: Option<&str>) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: email.map(str::to_string),
        }
    }

    fn profile(id: UserId, display_name: Option<&str>, permissions: Permissions) -> UserProfile {
        UserProfile {
            id,
            display_name: display_name.map(str::to_string),
            permissions,
            access: None,
            last_mailbox_slug: None,
            inviter_user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_name_prefers_trimmed_profile_name() {
        let u = user(Some("jane@example.com"));
        let p = profile(u.id, Some("  Jane Doe  "), Permissions::Member);
        assert_eq!(full_name(&u, Some(&p)), "Jane Doe");
        assert_eq!(first_name(&u, Some(&p)), "Jane");
    }

    #[test]
    fn test_full_name_falls_back_to_email() {
        let u = user(Some("jane@example.com"));
        let blank = profile(u.id, Some("   "), Permissions::Member);
        let empty = profile(u.id, Some(""), Permissions::Member);
        assert_eq!(full_name(&u, Some(&blank)), "jane@example.com");
        assert_eq!(full_name(&u, Some(&empty)), "jane@example.com");
        assert_eq!(full_name(&u, None), "jane@example.com");
    }

    #[test]
    fn test_full_name_falls_back_to_id() {
        let u = user(None);
        assert_eq!(full_name(&u, None), u.id.to_string());

        let empty_email = user(Some(""));
        assert_eq!(full_name(&empty_email, None), empty_email.id.to_string());
    }

    #[test]
    fn test_has_display_name() {
        let id = Uuid::new_v4();
        assert!(has_display_name(Some(&profile(id, Some("Jane"), Permissions::Member))));
        assert!(!has_display_name(Some(&profile(id, Some(" "), Permissions::Member))));
        assert!(!has_display_name(Some(&profile(id, None, Permissions::Member))));
        assert!(!has_display_name(None));
    }

    #[test]
    fn test_display_name_from_enhanced() {
        let mut enhanced = EnhancedUser {
            id: Uuid::new_v4(),
            email: Some("a@example.com".to_string()),
            display_name: Some("Alice".to_string()),
            permissions: None,
            access: None,
        };
        assert_eq!(display_name_from_enhanced(&enhanced), "Alice");

        enhanced.display_name = None;
        assert_eq!(display_name_from_enhanced(&enhanced), "a@example.com");

        enhanced.email = None;
        assert_eq!(display_name_from_enhanced(&enhanced), enhanced.id.to_string());
    }

    #[test]
    fn test_admin_checks() {
        let id = Uuid::new_v4();
        assert!(is_admin(Some(&profile(id, None, Permissions::Admin))));
        assert!(!is_admin(Some(&profile(id, None, Permissions::Member))));
        assert!(!is_admin(None));

        let mut enhanced = EnhancedUser {
            id,
            email: None,
            display_name: None,
            permissions: Some(Permissions::Admin),
            access: None,
        };
        assert!(is_admin_user(Some(&enhanced)));
        enhanced.permissions = None;
        assert!(!is_admin_user(Some(&enhanced)));
        assert!(!is_admin_user(None));
    }
}
