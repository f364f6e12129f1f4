//! Effective-selection resolution.
//!
//! Given the configuration, a player and their persisted preference, this
//! decides which template (if any) applies at this moment. Authorization
//! is always evaluated at use time: a selection made yesterday is worth
//! nothing if the permission was revoked since.

use crate::access::is_authorized;
use crate::config::{AnthemConfig, MvpTemplate};
use anthem_event_system::{PermissionOracle, PlayerId};
use crate::preferences::PlayerPreference;
use rand::Rng;

/// Outcome of a resolution: the template that applies and the sound to
/// play for it. `sound` may be empty, meaning chat/center-text only.
#[derive(Debug)]
pub struct Resolution<'a> {
    pub name: String,
    pub sound: String,
    pub template: &'a MvpTemplate,
    /// Whether the template came out of the random path. Random picks are
    /// one-round suggestions and must not be written into the sound cache.
    pub via_random: bool,
}

/// Templates the player is authorized to use right now, in configuration
/// iteration order.
pub fn accessible<'a>(
    config: &'a AnthemConfig,
    oracle: &dyn PermissionOracle,
    player: PlayerId,
) -> Vec<(&'a str, &'a MvpTemplate)> {
    config
        .templates()
        .filter(|(_, _, template)| is_authorized(oracle, player, template))
        .map(|(_, name, template)| (name, template))
        .collect()
}

/// Uniform pick over the currently authorized set. Never selects from the
/// unfiltered configuration.
pub fn pick_random<'a>(
    config: &'a AnthemConfig,
    oracle: &dyn PermissionOracle,
    player: PlayerId,
) -> Option<(&'a str, &'a MvpTemplate)> {
    pick_random_with(config, oracle, player, &mut rand::thread_rng())
}

pub fn pick_random_with<'a, R: Rng + ?Sized>(
    config: &'a AnthemConfig,
    oracle: &dyn PermissionOracle,
    player: PlayerId,
    rng: &mut R,
) -> Option<(&'a str, &'a MvpTemplate)> {
    let candidates = accessible(config, oracle, player);
    if candidates.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..candidates.len());
    Some(candidates[index])
}

/// Resolves the effective (name, sound, template) for a player.
///
/// Random preferences re-roll on every call so permission changes show up
/// immediately and repeat MVPs can vary. Explicit selections fail closed:
/// a name that is gone from configuration or no longer authorized yields
/// `None`, never a substitute.
pub fn resolve_effective<'a>(
    config: &'a AnthemConfig,
    oracle: &dyn PermissionOracle,
    player: PlayerId,
    preference: &PlayerPreference,
) -> Option<Resolution<'a>> {
    if preference.wants_random {
        let (name, template) = pick_random(config, oracle, player)?;
        return Some(Resolution {
            name: name.to_string(),
            sound: template.sound.clone(),
            template,
            via_random: true,
        });
    }

    let selected = preference.selected.trim();
    if selected.is_empty() {
        return None;
    }

    let template = config.find_template(selected)?;
    if !is_authorized(oracle, player, template) {
        return None;
    }

    // The cache wins when present; otherwise fall back to the template's
    // own sound, which may itself be empty (visual-only template).
    let sound = if preference.sound_cache.trim().is_empty() {
        template.sound.clone()
    } else {
        preference.sound_cache.clone()
    };

    Some(Resolution {
        name: selected.to_string(),
        sound,
        template,
        via_random: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
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

    fn template(sound: &str, permissions: &[&str]) -> MvpTemplate {
        MvpTemplate {
            display_key: "t.name".into(),
            sound: sound.into(),
            allow_preview: true,
            show_chat: true,
            show_center_text: true,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn config_with(templates: &[(&str, &str, &[&str])]) -> AnthemConfig {
        let mut public = BTreeMap::new();
        for (name, sound, perms) in templates {
            public.insert(name.to_string(), template(sound, perms));
        }
        let mut mvps = BTreeMap::new();
        mvps.insert("public".to_string(), public);
        AnthemConfig {
            mvps,
            ..AnthemConfig::default()
        }
    }

    fn pref(player: PlayerId, selected: &str, cache: &str, wants_random: bool) -> PlayerPreference {
        PlayerPreference {
            selected: selected.into(),
            sound_cache: cache.into(),
            wants_random,
            ..PlayerPreference::new(player)
        }
    }

    #[test]
    fn random_never_picks_a_gated_template() {
        let config = config_with(&[
            ("mvp_1", "a.mp3", &[]),
            ("mvp_2", "b.mp3", &["admin"]),
        ]);
        let oracle = FixedGrants::new(&[]);
        let player = PlayerId(7);

        for _ in 0..1000 {
            let resolution =
                resolve_effective(&config, &oracle, player, &pref(player, "", "", true)).unwrap();
            assert_eq!(resolution.name, "mvp_1");
            assert!(resolution.via_random);
        }
    }

    #[test]
    fn random_with_no_accessible_templates_is_none() {
        let config = config_with(&[("mvp_2", "b.mp3", &["admin"])]);
        let oracle = FixedGrants::new(&[]);
        let player = PlayerId(7);
        assert!(resolve_effective(&config, &oracle, player, &pref(player, "", "", true)).is_none());
    }

    #[test]
    fn random_reaches_every_accessible_template() {
        let config = config_with(&[
            ("mvp_1", "a.mp3", &[]),
            ("mvp_2", "b.mp3", &[]),
            ("mvp_3", "c.mp3", &["admin"]),
        ]);
        let oracle = FixedGrants::new(&[]);
        let player = PlayerId(7);

        let mut seen = HashSet::new();
        for _ in 0..500 {
            let (name, _) = pick_random(&config, &oracle, player).unwrap();
            seen.insert(name.to_string());
        }
        assert_eq!(seen.len(), 2);
        assert!(seen.contains("mvp_1") && seen.contains("mvp_2"));
    }

    #[test]
    fn empty_selection_never_falls_back_to_a_default() {
        let config = config_with(&[("mvp_1", "a.mp3", &[])]);
        let oracle = FixedGrants::new(&[]);
        let player = PlayerId(7);
        assert!(resolve_effective(&config, &oracle, player, &pref(player, "", "", false)).is_none());
        assert!(
            resolve_effective(&config, &oracle, player, &pref(player, "   ", "", false)).is_none()
        );
    }

    #[test]
    fn removed_template_resolves_to_absence() {
        let config = config_with(&[("mvp_1", "a.mp3", &[])]);
        let oracle = FixedGrants::new(&[]);
        let player = PlayerId(7);
        let preference = pref(player, "mvp_gone", "stale.mp3", false);
        assert!(resolve_effective(&config, &oracle, player, &preference).is_none());
    }

    #[test]
    fn revoked_access_fails_closed() {
        let config = config_with(&[
            ("mvp_1", "a.mp3", &[]),
            ("mvp_2", "b.mp3", &["admin"]),
        ]);
        let oracle = FixedGrants::new(&[]);
        let player = PlayerId(7);
        // Selected while the player still had "admin"; it is gone now.
        let preference = pref(player, "mvp_2", "b.mp3", false);
        assert!(resolve_effective(&config, &oracle, player, &preference).is_none());
    }

    #[test]
    fn cache_is_preferred_over_template_sound() {
        let config = config_with(&[("mvp_1", "a.mp3", &[])]);
        let oracle = FixedGrants::new(&[]);
        let player = PlayerId(7);

        let resolution =
            resolve_effective(&config, &oracle, player, &pref(player, "mvp_1", "cached.mp3", false))
                .unwrap();
        assert_eq!(resolution.sound, "cached.mp3");
    }

    #[test]
    fn blank_cache_falls_back_to_template_sound() {
        let config = config_with(&[("mvp_1", "a.mp3", &[])]);
        let oracle = FixedGrants::new(&[]);
        let player = PlayerId(7);

        let resolution =
            resolve_effective(&config, &oracle, player, &pref(player, "mvp_1", "", false)).unwrap();
        assert_eq!(resolution.sound, "a.mp3");
        assert!(!resolution.via_random);
    }

    #[test]
    fn both_blank_yields_a_visual_only_resolution() {
        let config = config_with(&[("mvp_silent", "", &[])]);
        let oracle = FixedGrants::new(&[]);
        let player = PlayerId(7);

        let resolution =
            resolve_effective(&config, &oracle, player, &pref(player, "mvp_silent", "", false))
                .unwrap();
        assert!(resolution.sound.is_empty());
    }

    #[test]
    fn identity_gated_template_resolves_for_that_identity() {
        let config = config_with(&[("mvp_own", "own.mp3", &["42"])]);
        let oracle = FixedGrants::new(&[]);

        let owner = PlayerId(42);
        let resolution =
            resolve_effective(&config, &oracle, owner, &pref(owner, "mvp_own", "", false));
        assert!(resolution.is_some());

        let other = PlayerId(43);
        assert!(resolve_effective(&config, &oracle, other, &pref(other, "mvp_own", "", false))
            .is_none());
    }
}
