//! Deck presets.
//!
//! Two presets ship built in and always exist after a merge; user edits to
//! them are kept. User presets get a slug id derived from their name.

use crate::assignment::{Assignment, SuitAssignment};
use crate::types::{Focus, JokerSlot, JokerSlots};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

pub const STANDARD_PRESET_ID: &str = "standard";
pub const CRUSH_CORE_PRESET_ID: &str = "crush-core";

/// A named suit assignment plus joker slots
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeckPreset {
    pub id: String,
    pub name: String,
    pub suits: SuitAssignment,
    pub joker_slots: JokerSlots,
}

impl DeckPreset {
    pub fn is_builtin(&self) -> bool {
        is_builtin_id(&self.id)
    }

    /// Read one saved preset, filling gaps from `template`
    fn from_saved(value: &Value, template: Option<&DeckPreset>) -> Option<DeckPreset> {
        let obj = value.as_object()?;
        let id = obj.get("id")?.as_str()?.trim();
        if id.is_empty() {
            return None;
        }

        let default_suits = template.map(|t| t.suits.clone()).unwrap_or_default();
        let default_slots = template.map(|t| t.joker_slots).unwrap_or_default();
        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| template.map(|t| t.name.clone()))
            .unwrap_or_else(|| id.to_string());

        Some(DeckPreset {
            id: id.to_string(),
            name,
            suits: obj
                .get("suits")
                .map(|v| SuitAssignment::from_value(v, &default_suits))
                .unwrap_or(default_suits),
            joker_slots: obj
                .get("jokerSlots")
                .map(|v| JokerSlots::from_value(v, default_slots))
                .unwrap_or(default_slots),
        })
    }
}

pub fn is_builtin_id(id: &str) -> bool {
    id == STANDARD_PRESET_ID || id == CRUSH_CORE_PRESET_ID
}

/// The built-in preset templates, in display order
pub fn builtin_presets() -> Vec<DeckPreset> {
    vec![
        DeckPreset {
            id: STANDARD_PRESET_ID.into(),
            name: "Standard".into(),
            suits: SuitAssignment::standard(),
            joker_slots: JokerSlots::new(JokerSlot::Random, JokerSlot::Empty),
        },
        DeckPreset {
            id: CRUSH_CORE_PRESET_ID.into(),
            name: "Crush Core".into(),
            suits: SuitAssignment {
                spades: Assignment::Focus(Focus::Core),
                hearts: Assignment::concrete("Russian Twists", 1),
                diamonds: Assignment::concrete("Leg Lifts", 1),
                clubs: Assignment::concrete("Scissor Kicks", 1),
            },
            joker_slots: JokerSlots::new(JokerSlot::Random, JokerSlot::Random),
        },
    ]
}

pub fn builtin_preset(id: &str) -> Option<DeckPreset> {
    builtin_presets().into_iter().find(|p| p.id == id)
}

/// Reconcile saved presets with the built-ins
///
/// Built-ins come first, with any saved edits applied; user presets follow
/// in saved order. Entries without an id are dropped and repeated ids keep
/// their first occurrence.
pub fn merge_deck_presets(saved: &Value) -> Vec<DeckPreset> {
    let builtins = builtin_presets();
    let items = saved.as_array().map(Vec::as_slice).unwrap_or(&[]);

    let mut seen = HashSet::new();
    let mut saved_builtins = Vec::new();
    let mut custom = Vec::new();
    for item in items {
        let template_id = item.get("id").and_then(|v| v.as_str()).map(str::trim);
        let template = template_id.and_then(|id| builtins.iter().find(|b| b.id == id));
        let Some(preset) = DeckPreset::from_saved(item, template) else {
            tracing::warn!("Skipping saved preset without an id");
            continue;
        };
        if !seen.insert(preset.id.clone()) {
            continue;
        }
        if preset.is_builtin() {
            saved_builtins.push(preset);
        } else {
            custom.push(preset);
        }
    }

    let mut merged: Vec<DeckPreset> = builtins
        .into_iter()
        .map(|builtin| {
            saved_builtins
                .iter()
                .find(|p| p.id == builtin.id)
                .cloned()
                .unwrap_or(builtin)
        })
        .collect();
    merged.extend(custom);
    merged
}

/// Lowercase, dash-separated slug of a preset name
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "preset".to_string()
    } else {
        slug
    }
}

/// Slug for `name` that no preset in `presets` uses (`slug`, `slug-2`, ...)
pub fn unique_preset_id(name: &str, presets: &[DeckPreset]) -> String {
    let base = slugify(name);
    let taken: HashSet<&str> = presets.iter().map(|p| p.id.as_str()).collect();
    if !taken.contains(base.as_str()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}

/// Create a user preset; returns its id, or `None` for an empty name
pub fn create_preset(
    presets: &mut Vec<DeckPreset>,
    name: &str,
    suits: SuitAssignment,
    joker_slots: JokerSlots,
) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let id = unique_preset_id(name, presets);
    presets.push(DeckPreset {
        id: id.clone(),
        name: name.to_string(),
        suits,
        joker_slots,
    });
    tracing::info!("Created preset {}", id);
    Some(id)
}

/// Delete a user preset; built-ins cannot be deleted
pub fn delete_preset(presets: &mut Vec<DeckPreset>, id: &str) -> bool {
    if is_builtin_id(id) {
        return false;
    }
    let before = presets.len();
    presets.retain(|p| p.id != id);
    presets.len() != before
}

/// Restore a built-in preset to its template
pub fn reset_builtin(presets: &mut [DeckPreset], id: &str) -> bool {
    let Some(template) = builtin_preset(id) else {
        return false;
    };
    match presets.iter_mut().find(|p| p.id == id) {
        Some(slot) => {
            *slot = template;
            true
        }
        None => false,
    }
}

pub fn find_preset<'a>(presets: &'a [DeckPreset], id: &str) -> Option<&'a DeckPreset> {
    presets.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_empty_gives_builtins() {
        let merged = merge_deck_presets(&json!(null));
        assert_eq!(merged, builtin_presets());
    }

    #[test]
    fn test_merge_restores_missing_builtin_and_keeps_edits() {
        let saved = json!([
            {"id": "mine", "name": "Mine", "suits": {"♠": "Lunges (2x)"}, "jokerSlots": {"1": "none", "2": "none"}},
            {"id": "standard", "name": "My Standard", "suits": {"♥": "Dips"}},
            {"name": "no id"},
            {"id": "mine", "name": "Duplicate"}
        ]);
        let merged = merge_deck_presets(&saved);

        let ids: Vec<&str> = merged.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["standard", "crush-core", "mine"]);

        let standard = &merged[0];
        assert_eq!(standard.name, "My Standard");
        assert_eq!(standard.suits.hearts, Assignment::concrete("Dips", 1));
        assert_eq!(standard.suits.spades, Assignment::concrete("Sit-ups", 1));
        assert_eq!(standard.joker_slots, builtin_presets()[0].joker_slots);

        assert_eq!(merged[1], builtin_presets()[1]);

        let mine = &merged[2];
        assert_eq!(mine.name, "Mine");
        assert_eq!(mine.suits.spades, Assignment::concrete("Lunges", 2));
        assert_eq!(mine.joker_slots.joker_count(), 0);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let saved = json!([{"id": "mine", "name": "Mine"}, {"id": "crush-core", "name": "Core!"}]);
        let once = merge_deck_presets(&saved);
        let twice = merge_deck_presets(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Leg Day!! "), "leg-day");
        assert_eq!(slugify("Core & Cardio"), "core-cardio");
        assert_eq!(slugify("***"), "preset");
    }

    #[test]
    fn test_create_preset_disambiguates() {
        let mut presets = builtin_presets();
        let suits = SuitAssignment::standard();
        let slots = JokerSlots::default();

        assert_eq!(create_preset(&mut presets, "Standard", suits.clone(), slots), Some("standard-2".into()));
        assert_eq!(create_preset(&mut presets, "standard", suits.clone(), slots), Some("standard-3".into()));
        assert_eq!(create_preset(&mut presets, "Leg Day", suits.clone(), slots), Some("leg-day".into()));
        assert_eq!(create_preset(&mut presets, "   ", suits, slots), None);
        assert_eq!(presets.len(), 5);
    }

    #[test]
    fn test_delete_and_reset() {
        let mut presets = builtin_presets();
        create_preset(&mut presets, "Mine", SuitAssignment::standard(), JokerSlots::default());

        assert!(!delete_preset(&mut presets, STANDARD_PRESET_ID));
        assert!(delete_preset(&mut presets, "mine"));
        assert!(!delete_preset(&mut presets, "mine"));

        presets[0].name = "Edited".into();
        assert!(reset_builtin(&mut presets, STANDARD_PRESET_ID));
        assert_eq!(presets[0], builtin_presets()[0]);
        assert!(!reset_builtin(&mut presets, "mine"));
    }
}
