//! Prop categories derived from resolved prop names.
//!
//! Categories come from an ordered table of name prefixes. The longest matching prefix wins and
//! ties go to the earlier row. Names matching no row land in [`OTHER_PROPS`].

use std::collections::BTreeMap;

use derive_more::Display;
use stage_codec::Vec4;
use stage_dict::HashDictionary;

use crate::types::GeomProp;

/// Category of props that match no rule
pub const OTHER_PROPS: &str = "Other Props";

/// Category of a prop and whether it belongs to the mini variant of its mission
#[derive(Display, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[display("{name}")]
pub struct CategoryInfo {
    pub name: &'static str,
    pub is_mini: bool,
}

impl CategoryInfo {
    pub const DEFAULT: CategoryInfo = CategoryInfo {
        name: OTHER_PROPS,
        is_mini: false,
    };

    pub fn is_default(&self) -> bool {
        self.name == OTHER_PROPS
    }
}

/// `(prefix, category, is_mini)` rows
pub const RULES: &[(&str, &str, bool)] = &[
    // Race
    ("PRP_RES_01_MINI_RACE_HOME_", "RACE", true),
    ("PRP_RES_02_MINI_RACE_HOME_", "RACE", true),
    ("PRP_RES_03_MINI_RACE_HOME_", "RACE", true),
    ("PRP_RES_04_MINI_RACE_HOME_", "RACE", true),
    ("PRP_MINI_RACE_HOME_", "RACE", true),
    ("PRP_RES_01_MINI_RACE_BASE_", "RACE", true),
    ("PRP_RES_02_MINI_RACE_BASE_", "RACE", true),
    ("PRP_RES_03_MINI_RACE_BASE_", "RACE", true),
    ("PRP_RES_04_MINI_RACE_BASE_", "RACE", true),
    ("PRP_MINI_RACE_BASE_", "RACE", true),
    ("PRP_MINI_RACE_GOAL_", "RACE", true),
    ("PRP_MINI_RACE_TGT_", "RACE", true),
    ("PRP_MINI_RACE_A", "RACE", true),
    ("PRP_MINI_RACE_B", "RACE", true),
    ("PRP_RES_01_RACE_HOME_", "RACE", false),
    ("PRP_RES_02_RACE_HOME_", "RACE", false),
    ("PRP_RES_03_RACE_HOME_", "RACE", false),
    ("PRP_RES_04_RACE_HOME_", "RACE", false),
    ("PRP_RACE_HOME_", "RACE", false),
    ("PRP_RES_01_RACE_BASE_", "RACE", false),
    ("PRP_RES_02_RACE_BASE_", "RACE", false),
    ("PRP_RES_03_RACE_BASE_", "RACE", false),
    ("PRP_RES_04_RACE_BASE_", "RACE", false),
    ("PRP_RACE_BASE_", "RACE", false),
    ("PRP_RACE_TGT_", "RACE", false),
    ("PRP_RACE_A", "RACE", false),
    ("PRP_RACE_B", "RACE", false),
    ("PRP_RACE_", "RACE", false),

    // Bomb
    ("PRP_RES_MINI_BOMB_", "BOMB", true),
    ("PRP_MINI_BOMB_SITE_", "BOMB", true),
    ("PRP_MINI_BOMB_TERMINAL_", "BOMB", true),
    ("PRP_MINI_BOMB_", "BOMB", true),
    ("PRP_RES_BOMB_", "BOMB", false),
    ("PRP_BOMB_SITE_", "BOMB", false),
    ("PRP_BOMB_TGT_", "BOMB", false),
    ("PRP_BOMB_TERMINAL_", "BOMB", false),
    ("PRP_BOMB_", "BOMB", false),

    // Team sneaking
    ("PRP_MINI_TEAM_SNEAKING_GOAL_", "TSNE", true),
    ("PRP_MINI_TEAM_SNEAKING_TGT_", "TSNE", true),
    ("PRP_MINI_TEAM_SNEAKING_", "TSNE", true),
    ("PRP_TEAM_SNEAKING_GOAL_", "TSNE", false),
    ("PRP_TEAM_SNEAKING_TGT_", "TSNE", false),
    ("PRP_TEAM_SNEAKING_", "TSNE", false),

    // Stealth deathmatch
    ("PRP_SDM_CIRCLE_", "SDM", false),
    ("PRP_MINI_SDM_", "SDM", true),
    ("PRP_SDM_", "SDM", false),

    // Solo capture
    ("PRP_MINI_SCAP_TERMINAL", "SCAP", true),
    ("PRP_MINI_SCAP_", "SCAP", true),
    ("PRP_SCAP_TGT_", "SCAP", false),
    ("PRP_SCAP_TERMINAL", "SCAP", false),
    ("PRP_SCAP_", "SCAP", false),

    // Rugby, listed under CAP
    ("PRP_RES_MINI_RUGBY_", "CAP", true),
    ("PRP_MINI_CAP_TERMINAL_", "CAP", true),
    ("PRP_MINI_RUGBY_", "CAP", true),
    ("PRP_RES_RUGBY_", "CAP", false),
    ("PRP_RUGBY_GOAL_", "CAP", false),
    ("PRP_RUGBY_TGT_", "CAP", false),
    ("PRP_CAP_TERMINAL_", "CAP", false),
    ("PRP_RUGBY_", "CAP", false),

    // Team deathmatch
    ("PRP_RES_MINI_TEAM_DEATHMATCH_", "TDM", true),
    ("PRP_MINI_TEAM_DEATHMATCH_", "TDM", true),
    ("PRP_RES_TEAM_DEATHMATCH_", "TDM", false),
    ("PRP_TEAM_DEATHMATCH_", "TDM", false),

    // Deathmatch
    ("PRP_MINI_DM_TERMINAL", "DM", true),
    ("PRP_MINI_DEATHMATCH_", "DM", true),
    ("PRP_DM_TERMINAL", "DM", false),
    ("PRP_DEATHMATCH_", "DM", false),

    // Rescue
    ("PRP_MINI_RESCUE_", "RES", true),
    ("PRP_MINI_RES_A", "RES", true),
    ("PRP_MINI_RES_B", "RES", true),
    ("PRP_RESCUE_", "RES", false),
    ("PRP_RES_GOAL_", "RES", false),
    ("PRP_RES_A", "RES", false),
    ("PRP_RES_B", "RES", false),
    ("PRP_RES_TGT_00", "RES", false),
    ("PRP_RES_TGT_01", "RES", true),

    // Training
    ("PRP_TRAINING_", "TRAIN", false),
    ("PRP_DOLL_", "TRAIN", false),
    ("PRP_SLEEP_", "TRAIN", false),
    ("PRP_CLAYMORE_", "TRAIN", false),
    ("PRP_RES_TRAINING_", "TRAIN", false),
    ("PRP_MINI_TRAINING_", "TRAIN", true),
    ("PRP_RES_MINI_TRAINING_", "TRAIN", true),

    // Explosive barrels
    ("PRP_EXP_BARREL_", "Explosive Barrel", false),

    // Sneaking
    ("PRP_SNEAKING_", "SNE", false),
    ("PRP_MINI_SNEAKING_", "SNE", true),

    // Combat training
    ("PRP_CBTRAIN_", "CBTRAIN", false),
    ("PRP_RES_CBTRAIN_", "CBTRAIN", false),
    ("PRP_COMBAT_TRAINING_", "CBTRAIN", false),
    ("PRP_RES_COMBAT_TRAINING_", "CBTRAIN", false),
    ("PRP_MINI_COMBAT_TRAINING_", "CBTRAIN", true),
    ("PRP_RES_MINI_COMBAT_TRAINING_", "CBTRAIN", true),

    // Cardboard boxes
    ("PRP_CBOX_", "CBOX", false),
    ("PRP_MINI_CBOX_", "CBOX", true),

    // Base
    ("PRP_RES_01_MINI_BASE_HOME_", "BASE", true),
    ("PRP_RES_02_MINI_BASE_HOME_", "BASE", true),
    ("PRP_RES_03_MINI_BASE_HOME_", "BASE", true),
    ("PRP_RES_04_MINI_BASE_HOME_", "BASE", true),
    ("PRP_MINI_BASE_HOME_", "BASE", true),
    ("PRP_RES_01_MINI_BASE_", "BASE", true),
    ("PRP_RES_02_MINI_BASE_", "BASE", true),
    ("PRP_RES_03_MINI_BASE_", "BASE", true),
    ("PRP_RES_04_MINI_BASE_", "BASE", true),
    ("PRP_MINI_BASE_A", "BASE", true),
    ("PRP_MINI_BASE_B", "BASE", true),
    ("PRP_MINI_BASE_", "BASE", true),
    ("PRP_RES_01_BASE_HOME_", "BASE", false),
    ("PRP_RES_02_BASE_HOME_", "BASE", false),
    ("PRP_RES_03_BASE_HOME_", "BASE", false),
    ("PRP_RES_04_BASE_HOME_", "BASE", false),
    ("PRP_BASE_HOME_", "BASE", false),
    ("PRP_RES_01_BASE_", "BASE", false),
    ("PRP_RES_02_BASE_", "BASE", false),
    ("PRP_RES_03_BASE_", "BASE", false),
    ("PRP_RES_04_BASE_", "BASE", false),
    ("PRP_BASE_A", "BASE", false),
    ("PRP_BASE_B", "BASE", false),
    ("PRP_BASE_", "BASE", false),
];

/// Category of a resolved prop name
pub fn classify(name: &str) -> CategoryInfo {
    classify_with(RULES, name)
}

/// Category of `name` against an arbitrary rule table
pub fn classify_with(rules: &[(&'static str, &'static str, bool)], name: &str) -> CategoryInfo {
    let mut best: Option<&(&'static str, &'static str, bool)> = None;
    for rule in rules {
        let longer = best.map_or(true, |b| rule.0.len() > b.0.len());
        if longer && name.starts_with(rule.0) {
            best = Some(rule);
        }
    }

    best.map_or(CategoryInfo::DEFAULT, |&(_, name, is_mini)| CategoryInfo { name, is_mini })
}

/// A live prop listed under a category
#[derive(Debug, Clone, PartialEq)]
pub struct PropEntry {
    /// Index into the prop table of the geometry
    pub index: usize,
    pub name: String,
    pub position: Vec4,
}

/// Props of one category, split into the main and mini variants
///
/// [`OTHER_PROPS`] has no mini variant and keeps everything in `main`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropCategory {
    pub name: String,
    pub main: Vec<PropEntry>,
    pub mini: Vec<PropEntry>,
}

/// Group live props by category
///
/// Props are sorted by resolved name, categories by name with [`OTHER_PROPS`] last. When a
/// filter is given only props whose name contains it, ignoring case, are listed.
pub fn categorize(
    props: &[GeomProp],
    dictionary: &HashDictionary,
    filter: Option<&str>,
) -> Vec<PropCategory> {
    let filter = filter.map(str::to_lowercase).filter(|f| !f.is_empty());

    let mut entries = props
        .iter()
        .enumerate()
        .filter(|(_, prop)| !prop.is_sentinel())
        .map(|(index, prop)| PropEntry {
            index,
            name: dictionary.resolve(prop.hash).into_owned(),
            position: prop.position,
        })
        .filter(|entry| {
            filter
                .as_deref()
                .map_or(true, |f| entry.name.to_lowercase().contains(f))
        })
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut categories = BTreeMap::<&str, PropCategory>::new();
    let mut other = PropCategory {
        name: OTHER_PROPS.to_owned(),
        ..Default::default()
    };

    for entry in entries {
        let info = classify(&entry.name);
        if info.is_default() {
            other.main.push(entry);
            continue;
        }

        let category = categories
            .entry(info.name)
            .or_insert_with(|| PropCategory {
                name: info.name.to_owned(),
                ..Default::default()
            });
        if info.is_mini {
            category.mini.push(entry);
        } else {
            category.main.push(entry);
        }
    }

    let mut result = categories.into_values().collect::<Vec<_>>();
    if !other.main.is_empty() {
        result.push(other);
    }
    result
}
