//! Per-player persisted preference record.
//!
//! One record per player per session, loaded from the host's cookie
//! capability on demand and written back explicitly after every mutation.
//! Missing keys default; nothing here is fatal.

use anthem_event_system::{CookieStore, PlayerId};
use std::sync::Arc;

pub const COOKIE_SELECTED: &str = "mvp_anthem.mvp_name";
pub const COOKIE_SOUND_CACHE: &str = "mvp_anthem.sound_path";
pub const COOKIE_VOLUME: &str = "mvp_anthem.volume";
pub const COOKIE_FIRST_CONNECT: &str = "mvp_anthem.had_first_connect";
pub const COOKIE_WANTS_RANDOM: &str = "mvp_anthem.has_random_mvp";

pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}

/// A player's persisted anthem choice plus derived cache and onboarding
/// state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPreference {
    pub player: PlayerId,
    /// Selected template name; empty means no selection.
    pub selected: String,
    /// Denormalized copy of the selected template's sound. A cache only:
    /// it can go stale when configuration changes and is never treated as
    /// authoritative.
    pub sound_cache: String,
    pub volume: f32,
    pub had_first_connect: bool,
    /// When set, `selected` is only a cached suggestion; the effective
    /// template is re-rolled at every resolution.
    pub wants_random: bool,
}

impl PlayerPreference {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            selected: String::new(),
            sound_cache: String::new(),
            volume: 0.0,
            had_first_connect: false,
            wants_random: false,
        }
    }

    /// Whether the player has any effective selection, concrete or random.
    pub fn has_selection(&self) -> bool {
        self.wants_random || !self.selected.trim().is_empty()
    }
}

/// Typed view over the host cookie capability for this plugin's keys.
#[derive(Clone)]
pub struct PreferenceStore {
    cookies: Arc<dyn CookieStore>,
}

impl PreferenceStore {
    pub fn new(cookies: Arc<dyn CookieStore>) -> Self {
        Self { cookies }
    }

    /// Loads a player's record, defaulting every missing field.
    pub fn load(&self, player: PlayerId) -> PlayerPreference {
        self.cookies.load(player);
        PlayerPreference {
            player,
            selected: self
                .cookies
                .get_string(player, COOKIE_SELECTED)
                .unwrap_or_default(),
            sound_cache: self
                .cookies
                .get_string(player, COOKIE_SOUND_CACHE)
                .unwrap_or_default(),
            volume: self.cookies.get_f32(player, COOKIE_VOLUME).unwrap_or_default(),
            had_first_connect: self
                .cookies
                .get_bool(player, COOKIE_FIRST_CONNECT)
                .unwrap_or_default(),
            wants_random: self
                .cookies
                .get_bool(player, COOKIE_WANTS_RANDOM)
                .unwrap_or_default(),
        }
    }

    /// Writes every field and asks the host to flush. Volume is clamped
    /// on the way out so out-of-range values never reach storage.
    pub fn save(&self, preference: &PlayerPreference) {
        let player = preference.player;
        self.cookies.set_string(player, COOKIE_SELECTED, &preference.selected);
        self.cookies
            .set_string(player, COOKIE_SOUND_CACHE, &preference.sound_cache);
        self.cookies
            .set_f32(player, COOKIE_VOLUME, clamp_volume(preference.volume));
        self.cookies
            .set_bool(player, COOKIE_FIRST_CONNECT, preference.had_first_connect);
        self.cookies
            .set_bool(player, COOKIE_WANTS_RANDOM, preference.wants_random);
        self.cookies.save(player);
    }
}
