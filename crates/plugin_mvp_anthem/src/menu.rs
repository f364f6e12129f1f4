//! Menu screens for anthem selection, preview, removal and volume.
//!
//! Screens are built fresh on every open so they always reflect the
//! player's current permissions and stored preference. Click handlers
//! mutate through [`PreferenceStore`](crate::preferences::PreferenceStore)
//! and reopen the main screen on the next tick, after the host has torn
//! the clicked menu down.

use crate::access::is_authorized;
use crate::resolve::{accessible, pick_random};
use crate::runtime::AnthemRuntime;
use anthem_event_system::{MenuOption, MenuSpec, PlayerId};
use std::sync::Arc;

const FALLBACK_VOLUME_STEPS: &[u32] = &[0, 10, 20, 40, 60, 80, 100];

/// Entry point for the chat command and for post-click reopens.
pub fn open_main_menu(runtime: &Arc<AnthemRuntime>, player: PlayerId) {
    if !runtime.players.is_valid(player) {
        return;
    }
    let menu = build_main_menu(runtime, player);
    runtime.menus.open_menu(player, menu);
}

fn reopen_main_next_tick(runtime: &Arc<AnthemRuntime>, player: PlayerId) {
    let runtime_for_tick = Arc::clone(runtime);
    runtime.scheduler.next_tick(Box::new(move || {
        open_main_menu(&runtime_for_tick, player);
    }));
}

fn menu_shell(runtime: &AnthemRuntime, title: String, options: Vec<MenuOption>) -> MenuSpec {
    MenuSpec {
        title,
        freeze_player: runtime.config.menu.freeze_player,
        enable_sounds: runtime.config.menu.enable_sounds,
        options,
    }
}

/// Localized description of the player's current choice, re-checked
/// against configuration and permissions so a stale cookie never shows
/// as active.
fn current_selection_label(runtime: &AnthemRuntime, player: PlayerId) -> String {
    let preference = runtime.prefs.load(player);
    if preference.wants_random {
        return runtime.translator.text(player, "mvp.menu.random", &[]);
    }
    let selected = preference.selected.trim();
    if !selected.is_empty() {
        if let Some(template) = runtime.config.find_template(selected) {
            if is_authorized(runtime.permissions.as_ref(), player, template) {
                return runtime.translator.text(player, &template.display_key, &[]);
            }
        }
    }
    runtime.translator.text(player, "mvp.menu.none", &[])
}

fn build_main_menu(runtime: &Arc<AnthemRuntime>, player: PlayerId) -> MenuSpec {
    let preference = runtime.prefs.load(player);
    let current = current_selection_label(runtime, player);
    let volume_percent = closest_step(
        &normalize_volume_steps(&runtime.config.menu.volume_steps),
        preference.volume,
    );

    let mut options = vec![
        MenuOption::text(runtime.translator.text(player, "mvp.menu.current", &[&current])),
        MenuOption::text(runtime.translator.text(
            player,
            "mvp.menu.volume_current",
            &[&volume_percent.to_string()],
        )),
    ];

    {
        let select_label = label(runtime, player, "mvp.menu.select");
        let runtime = Arc::clone(runtime);
        options.push(MenuOption::submenu(select_label, move |player| {
            build_select_menu(&runtime, player)
        }));
    }
    {
        let volume_label = label(runtime, player, "mvp.menu.volume");
        let runtime = Arc::clone(runtime);
        options.push(MenuOption::submenu(volume_label, move |player| {
            build_volume_menu(&runtime, player)
        }));
    }
    if preference.has_selection() {
        let remove_label = label(runtime, player, "mvp.menu.remove");
        let runtime = Arc::clone(runtime);
        options.push(MenuOption::submenu(remove_label, move |player| {
            build_confirm_remove_menu(&runtime, player)
        }));
    }

    menu_shell(runtime, label(runtime, player, "mvp.menu.title"), options)
}

fn label(runtime: &AnthemRuntime, player: PlayerId, key: &str) -> String {
    runtime.translator.text(player, key, &[])
}

fn build_select_menu(runtime: &Arc<AnthemRuntime>, player: PlayerId) -> MenuSpec {
    let reachable = accessible(&runtime.config, runtime.permissions.as_ref(), player);
    let mut options = Vec::new();

    // Standing random choice, re-rolled at every round MVP.
    let random_row = {
        let runtime_for_click = Arc::clone(runtime);
        MenuOption::button(label(runtime, player, "mvp.menu.random"), move |player| {
            select_random(&runtime_for_click, player);
        })
    };
    options.push(if reachable.is_empty() {
        random_row.disabled()
    } else {
        random_row
    });

    for (category, templates) in &runtime.config.mvps {
        let any_accessible = templates
            .values()
            .any(|template| is_authorized(runtime.permissions.as_ref(), player, template));
        if !any_accessible {
            continue;
        }
        let runtime_for_sub = Arc::clone(runtime);
        let category = category.clone();
        options.push(MenuOption::submenu(
            runtime.translator.text(player, &category, &[]),
            move |player| build_category_menu(&runtime_for_sub, category.clone(), player),
        ));
    }

    menu_shell(runtime, label(runtime, player, "mvp.menu.select.title"), options)
}

fn build_category_menu(
    runtime: &Arc<AnthemRuntime>,
    category: String,
    player: PlayerId,
) -> MenuSpec {
    let mut options = Vec::new();

    if let Some(templates) = runtime.config.mvps.get(&category) {
        for (name, template) in templates {
            if !is_authorized(runtime.permissions.as_ref(), player, template) {
                continue;
            }
            let runtime_for_sub = Arc::clone(runtime);
            let name = name.clone();
            options.push(MenuOption::submenu(
                runtime.translator.text(player, &template.display_key, &[]),
                move |player| build_actions_menu(&runtime_for_sub, name.clone(), player),
            ));
        }
    }

    menu_shell(runtime, runtime.translator.text(player, &category, &[]), options)
}

fn build_actions_menu(runtime: &Arc<AnthemRuntime>, name: String, player: PlayerId) -> MenuSpec {
    let Some(template) = runtime.config.find_template(&name) else {
        // Configuration changed between screens; show nothing actionable.
        return menu_shell(runtime, label(runtime, player, "mvp.menu.select.title"), vec![]);
    };
    let title = runtime.translator.text(player, &template.display_key, &[]);
    let mut options = Vec::new();

    {
        let runtime_for_click = Arc::clone(runtime);
        let name = name.clone();
        options.push(MenuOption::button(
            label(runtime, player, "mvp.menu.select_this"),
            move |player| select_template(&runtime_for_click, player, &name),
        ));
    }

    if template.allow_preview && !template.sound.trim().is_empty() {
        let runtime_for_click = Arc::clone(runtime);
        let sound = template.sound.clone();
        options.push(
            MenuOption::button(label(runtime, player, "mvp.menu.preview"), move |player| {
                let volume = runtime_for_click.prefs.load(player).volume;
                runtime_for_click.playback.play_preview(player, &sound, volume);
            })
            .keep_open(),
        );
    }

    menu_shell(runtime, title, options)
}

fn build_volume_menu(runtime: &Arc<AnthemRuntime>, player: PlayerId) -> MenuSpec {
    let steps = normalize_volume_steps(&runtime.config.menu.volume_steps);
    let mut options = Vec::new();

    for step in steps {
        let runtime_for_click = Arc::clone(runtime);
        options.push(MenuOption::button(
            runtime
                .translator
                .text(player, "mvp.menu.volume_item", &[&step.to_string()]),
            move |player| set_volume(&runtime_for_click, player, step),
        ));
    }

    menu_shell(runtime, label(runtime, player, "mvp.menu.volume.title"), options)
}

fn build_confirm_remove_menu(runtime: &Arc<AnthemRuntime>, player: PlayerId) -> MenuSpec {
    let yes = {
        let runtime_for_click = Arc::clone(runtime);
        MenuOption::button(label(runtime, player, "mvp.remove.yes"), move |player| {
            remove_selection(&runtime_for_click, player);
        })
    };
    let no = {
        let runtime_for_click = Arc::clone(runtime);
        MenuOption::button(label(runtime, player, "mvp.remove.no"), move |player| {
            reopen_main_next_tick(&runtime_for_click, player);
        })
    };

    menu_shell(runtime, label(runtime, player, "mvp.remove.title"), vec![yes, no])
}

// ----------------------------------------------------------------------------
// Click handlers
// ----------------------------------------------------------------------------

fn select_template(runtime: &Arc<AnthemRuntime>, player: PlayerId, name: &str) {
    // Re-check at click time; the screen may be stale.
    let Some(template) = runtime.config.find_template(name) else {
        return;
    };
    if !is_authorized(runtime.permissions.as_ref(), player, template) {
        return;
    }

    let mut preference = runtime.prefs.load(player);
    preference.selected = name.to_string();
    preference.sound_cache = template.sound.clone();
    preference.wants_random = false;
    runtime.prefs.save(&preference);

    let display = runtime.translator.text(player, &template.display_key, &[]);
    runtime.send_prefixed_chat(player, "mvp.selected", vec![display]);
    reopen_main_next_tick(runtime, player);
}

fn select_random(runtime: &Arc<AnthemRuntime>, player: PlayerId) {
    let Some((name, template)) =
        pick_random(&runtime.config, runtime.permissions.as_ref(), player)
    else {
        return;
    };

    // The pick is stored only as a suggestion; resolution re-rolls while
    // the random flag is set.
    let mut preference = runtime.prefs.load(player);
    preference.wants_random = true;
    preference.selected = name.to_string();
    preference.sound_cache = template.sound.clone();
    runtime.prefs.save(&preference);

    runtime.send_prefixed_chat(player, "mvp.random_selected", vec![]);
    reopen_main_next_tick(runtime, player);
}

fn remove_selection(runtime: &Arc<AnthemRuntime>, player: PlayerId) {
    let mut preference = runtime.prefs.load(player);
    preference.selected = String::new();
    preference.sound_cache = String::new();
    preference.wants_random = false;
    runtime.prefs.save(&preference);

    runtime.send_prefixed_chat(player, "mvp.removed", vec![]);
    reopen_main_next_tick(runtime, player);
}

fn set_volume(runtime: &Arc<AnthemRuntime>, player: PlayerId, step: u32) {
    let mut preference = runtime.prefs.load(player);
    preference.volume = step as f32 / 100.0;
    runtime.prefs.save(&preference);

    runtime.send_prefixed_chat(player, "mvp.volume_set", vec![step.to_string()]);
    reopen_main_next_tick(runtime, player);
}

// ----------------------------------------------------------------------------
// Volume steps
// ----------------------------------------------------------------------------

/// Sorted, deduplicated, in-range volume percentages. An empty or fully
/// invalid configured list falls back to the fixed ladder.
pub fn normalize_volume_steps(configured: &[u32]) -> Vec<u32> {
    let mut steps: Vec<u32> = configured.iter().copied().filter(|step| *step <= 100).collect();
    steps.sort_unstable();
    steps.dedup();
    if steps.is_empty() {
        steps = FALLBACK_VOLUME_STEPS.to_vec();
    }
    steps
}

/// Snaps a stored volume fraction to the closest selectable percentage.
pub fn closest_step(steps: &[u32], volume: f32) -> u32 {
    let percent = crate::preferences::clamp_volume(volume) * 100.0;
    steps
        .iter()
        .copied()
        .min_by(|a, b| {
            let da = (*a as f32 - percent).abs();
            let db = (*b as f32 - percent).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_sorts_dedupes_and_bounds() {
        assert_eq!(normalize_volume_steps(&[80, 20, 20, 150, 0]), vec![0, 20, 80]);
    }

    #[test]
    fn invalid_step_lists_fall_back_to_the_ladder() {
        assert_eq!(normalize_volume_steps(&[]), FALLBACK_VOLUME_STEPS);
        assert_eq!(normalize_volume_steps(&[101, 400]), FALLBACK_VOLUME_STEPS);
    }

    #[test]
    fn snapping_picks_the_nearest_percentage() {
        let steps = [0, 10, 20, 40, 60, 80, 100];
        assert_eq!(closest_step(&steps, 0.0), 0);
        assert_eq!(closest_step(&steps, 0.24), 20);
        assert_eq!(closest_step(&steps, 0.31), 40);
        assert_eq!(closest_step(&steps, 0.99), 100);
        // Out-of-range stored values clamp before snapping.
        assert_eq!(closest_step(&steps, 7.0), 100);
        assert_eq!(closest_step(&steps, -3.0), 0);
    }

    #[test]
    fn snapping_empty_steps_is_silent() {
        assert_eq!(closest_step(&[], 0.5), 0);
    }
}
