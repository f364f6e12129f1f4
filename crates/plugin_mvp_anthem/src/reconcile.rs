//! Preference reconciliation on connect and round-MVP events.
//!
//! A record moves `Unseen -> FirstConnectPending -> Reconciled`, with
//! `Reconciled` re-entered on every later connect. Both entry points are
//! idempotent and report whether anything actually changed so the caller
//! saves at most once per event and never writes redundantly.

use crate::config::AnthemConfig;
use crate::preferences::{clamp_volume, PlayerPreference};
use crate::resolve::{pick_random, Resolution};
use anthem_event_system::PermissionOracle;

/// Reconciles a freshly loaded record when its player connects. Returns
/// whether the record changed and must be saved.
pub fn reconcile_on_connect(
    config: &AnthemConfig,
    oracle: &dyn PermissionOracle,
    preference: &mut PlayerPreference,
) -> bool {
    if !preference.had_first_connect {
        preference.had_first_connect = true;
        preference.volume = clamp_volume(config.settings.default_volume);

        // One-time concrete assignment so players who never open the menu
        // still get an effect. This is not a standing random flag.
        if config.settings.give_random_on_first_join {
            if let Some((name, template)) = pick_random(config, oracle, preference.player) {
                preference.selected = name.to_string();
                preference.sound_cache = template.sound.clone();
            }
        }
        return true;
    }

    let mut changed = false;

    let clamped = clamp_volume(preference.volume);
    if preference.volume != clamped {
        preference.volume = clamped;
        changed = true;
    }

    // Repair cookies written before a configuration change: a selection
    // without a cached sound gets the sound re-derived when possible.
    if preference.sound_cache.trim().is_empty() && !preference.selected.trim().is_empty() {
        if let Some(template) = config.find_template(preference.selected.trim()) {
            if !template.sound.trim().is_empty() {
                preference.sound_cache = template.sound.clone();
                changed = true;
            }
        }
    }

    changed
}

/// Lazy cache repair after a round-MVP resolution. The sound that just
/// resolved is persisted as the new cache when the record had none, but
/// never for random resolutions, whose pick is one-round only. Returns
/// whether the record changed.
pub fn repair_sound_cache(preference: &mut PlayerPreference, resolution: &Resolution<'_>) -> bool {
    if preference.wants_random || resolution.via_random {
        return false;
    }
    if !preference.sound_cache.trim().is_empty() || resolution.sound.trim().is_empty() {
        return false;
    }
    preference.sound_cache = resolution.sound.clone();
    true
}
