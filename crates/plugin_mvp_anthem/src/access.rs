//! Template access evaluation.

use crate::config::MvpTemplate;
use anthem_event_system::{PermissionOracle, PlayerId};

/// Decides whether a player may use a template, right now.
///
/// An empty permission list means the template is open to everyone.
/// Otherwise entries are walked in order: a non-negative integer literal
/// is an identity grant and must match the player exactly; anything else
/// is a named permission checked against the oracle. Blank entries are
/// skipped. The first matching entry authorizes; no match denies.
///
/// Pure with respect to (player, template, oracle); callers may invoke it
/// freely during a single resolution.
pub fn is_authorized(
    oracle: &dyn PermissionOracle,
    player: PlayerId,
    template: &MvpTemplate,
) -> bool {
    if template.permissions.is_empty() {
        return true;
    }

    for entry in &template.permissions {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        if let Ok(identity) = entry.parse::<u64>() {
            if player.as_u64() == identity {
                return true;
            }
            continue;
        }

        if oracle.has_permission(player, entry) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FixedGrants {
        grants: HashSet<(u64, String)>,
    }

    impl FixedGrants {
        fn new(grants: &[(u64, &str)]) -> Self {
            Self {
                grants: grants.iter().map(|(id, p)| (*id, p.to_string())).collect(),
            }
        }
    }

    impl PermissionOracle for FixedGrants {
        fn has_permission(&self, player: PlayerId, permission: &str) -> bool {
            self.grants.contains(&(player.as_u64(), permission.to_string()))
        }
    }

    fn template(permissions: &[&str]) -> MvpTemplate {
        MvpTemplate {
            display_key: "t.name".into(),
            sound: "t.mp3".into(),
            allow_preview: true,
            show_chat: true,
            show_center_text: true,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn empty_permission_list_is_open_to_everyone() {
        let oracle = FixedGrants::new(&[]);
        assert!(is_authorized(&oracle, PlayerId(1), &template(&[])));
        assert!(is_authorized(&oracle, PlayerId(u64::MAX), &template(&[])));
    }

    #[test]
    fn identity_literal_matches_regardless_of_other_entries() {
        let oracle = FixedGrants::new(&[]);
        let t = template(&["admin", "76561198000000001", "vip"]);
        assert!(is_authorized(&oracle, PlayerId(76561198000000001), &t));
        assert!(!is_authorized(&oracle, PlayerId(76561198000000002), &t));
    }

    #[test]
    fn named_permission_consults_the_oracle() {
        let oracle = FixedGrants::new(&[(5, "admin")]);
        let t = template(&["admin"]);
        assert!(is_authorized(&oracle, PlayerId(5), &t));
        assert!(!is_authorized(&oracle, PlayerId(6), &t));
    }

    #[test]
    fn blank_entries_are_skipped_not_wildcards() {
        let oracle = FixedGrants::new(&[]);
        let t = template(&["", "   "]);
        assert!(!is_authorized(&oracle, PlayerId(1), &t));

        let oracle = FixedGrants::new(&[(1, "vip")]);
        let t = template(&["", "vip"]);
        assert!(is_authorized(&oracle, PlayerId(1), &t));
    }

    #[test]
    fn negative_or_malformed_numbers_are_treated_as_names() {
        // "-5" fails u64 parsing, so it is a (never-granted) named
        // permission rather than an identity.
        let oracle = FixedGrants::new(&[]);
        let t = template(&["-5"]);
        assert!(!is_authorized(&oracle, PlayerId(5), &t));

        let oracle = FixedGrants::new(&[(5, "-5")]);
        assert!(is_authorized(&oracle, PlayerId(5), &t));
    }

    #[test]
    fn no_matching_entry_denies() {
        let oracle = FixedGrants::new(&[(1, "vip")]);
        let t = template(&["admin", "42"]);
        assert!(!is_authorized(&oracle, PlayerId(1), &t));
    }
}
