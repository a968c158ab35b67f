//! Static monster data: the overworld hunting pool and the Abyss floor ladder.

use super::monsters::{DropEntry, Element, MonsterDefinition, MonsterGroup};

// ============================================================================
// Drop tables
// ============================================================================

const SLIME_DROPS: &[DropEntry] = &[
    DropEntry { item: "Slime Condensate", min: 1, max: 3, chance: 80.0 },
    DropEntry { item: "Slime Secretions", min: 1, max: 2, chance: 30.0 },
    DropEntry { item: "Slime Concentrate", min: 1, max: 1, chance: 8.0 },
];

const HILICHURL_DROPS: &[DropEntry] = &[
    DropEntry { item: "Damaged Mask", min: 1, max: 3, chance: 75.0 },
    DropEntry { item: "Stained Mask", min: 1, max: 2, chance: 25.0 },
    DropEntry { item: "Firm Arrowhead", min: 1, max: 2, chance: 35.0 },
    DropEntry { item: "Ominous Mask", min: 1, max: 1, chance: 5.0 },
];

const BEAST_DROPS: &[DropEntry] = &[
    DropEntry { item: "Raw Meat", min: 1, max: 3, chance: 90.0 },
    DropEntry { item: "Fowl", min: 1, max: 2, chance: 40.0 },
    DropEntry { item: "Beast Fang", min: 1, max: 1, chance: 15.0 },
];

const ELEMENTAL_DROPS: &[DropEntry] = &[
    DropEntry { item: "Whopperflower Nectar", min: 1, max: 2, chance: 60.0 },
    DropEntry { item: "Shimmering Nectar", min: 1, max: 1, chance: 20.0 },
    DropEntry { item: "Energy Nectar", min: 1, max: 1, chance: 6.0 },
];

const CONSTRUCT_DROPS: &[DropEntry] = &[
    DropEntry { item: "Chaos Device", min: 1, max: 2, chance: 70.0 },
    DropEntry { item: "Chaos Circuit", min: 1, max: 1, chance: 25.0 },
    DropEntry { item: "Chaos Core", min: 1, max: 1, chance: 7.0 },
];

const ABYSSAL_DROPS: &[DropEntry] = &[
    DropEntry { item: "Dead Ley Line Branch", min: 1, max: 3, chance: 65.0 },
    DropEntry { item: "Dead Ley Line Leaves", min: 1, max: 2, chance: 30.0 },
    DropEntry { item: "Ley Line Sprout", min: 1, max: 1, chance: 10.0 },
    DropEntry { item: "Abyssal Shard", min: 1, max: 1, chance: 4.0 },
];

// ============================================================================
// Overworld monsters
// ============================================================================

pub static WORLD_MONSTERS: &[MonsterDefinition] = &[
    MonsterDefinition {
        name: "Hydro Slime",
        group: MonsterGroup::Slime,
        element: Element::Hydro,
        base_hp: 10.0,
        base_atk: 4.0,
        crit_chance: 5.0,
        crit_value: 1.5,
        def_chance: 5.0,
        def_value: 1.0,
        min_level: 1,
        drops: SLIME_DROPS,
        image: "monsters/hydro_slime.png",
    },
    MonsterDefinition {
        name: "Pyro Slime",
        group: MonsterGroup::Slime,
        element: Element::Pyro,
        base_hp: 11.0,
        base_atk: 4.0,
        crit_chance: 5.0,
        crit_value: 1.5,
        def_chance: 5.0,
        def_value: 1.0,
        min_level: 1,
        drops: SLIME_DROPS,
        image: "monsters/pyro_slime.png",
    },
    MonsterDefinition {
        name: "Hilichurl",
        group: MonsterGroup::Hilichurl,
        element: Element::Physical,
        base_hp: 14.0,
        base_atk: 5.0,
        crit_chance: 10.0,
        crit_value: 1.5,
        def_chance: 10.0,
        def_value: 1.0,
        min_level: 1,
        drops: HILICHURL_DROPS,
        image: "monsters/hilichurl.png",
    },
    MonsterDefinition {
        name: "Boar",
        group: MonsterGroup::Beast,
        element: Element::Physical,
        base_hp: 12.0,
        base_atk: 5.0,
        crit_chance: 8.0,
        crit_value: 1.6,
        def_chance: 5.0,
        def_value: 1.0,
        min_level: 1,
        drops: BEAST_DROPS,
        image: "monsters/boar.png",
    },
    MonsterDefinition {
        name: "Cryo Slime",
        group: MonsterGroup::Slime,
        element: Element::Cryo,
        base_hp: 13.0,
        base_atk: 5.0,
        crit_chance: 5.0,
        crit_value: 1.5,
        def_chance: 10.0,
        def_value: 2.0,
        min_level: 3,
        drops: SLIME_DROPS,
        image: "monsters/cryo_slime.png",
    },
    MonsterDefinition {
        name: "Hilichurl Shooter",
        group: MonsterGroup::Hilichurl,
        element: Element::Physical,
        base_hp: 12.0,
        base_atk: 7.0,
        crit_chance: 15.0,
        crit_value: 1.7,
        def_chance: 5.0,
        def_value: 1.0,
        min_level: 3,
        drops: HILICHURL_DROPS,
        image: "monsters/hilichurl_shooter.png",
    },
    MonsterDefinition {
        name: "Electro Slime",
        group: MonsterGroup::Slime,
        element: Element::Electro,
        base_hp: 14.0,
        base_atk: 6.0,
        crit_chance: 5.0,
        crit_value: 1.5,
        def_chance: 10.0,
        def_value: 2.0,
        min_level: 5,
        drops: SLIME_DROPS,
        image: "monsters/electro_slime.png",
    },
    MonsterDefinition {
        name: "Anemo Specter",
        group: MonsterGroup::Elemental,
        element: Element::Anemo,
        base_hp: 16.0,
        base_atk: 6.0,
        crit_chance: 10.0,
        crit_value: 1.5,
        def_chance: 5.0,
        def_value: 2.0,
        min_level: 5,
        drops: ELEMENTAL_DROPS,
        image: "monsters/anemo_specter.png",
    },
    MonsterDefinition {
        name: "Snowboar",
        group: MonsterGroup::Beast,
        element: Element::Cryo,
        base_hp: 20.0,
        base_atk: 7.0,
        crit_chance: 10.0,
        crit_value: 1.6,
        def_chance: 15.0,
        def_value: 3.0,
        min_level: 8,
        drops: BEAST_DROPS,
        image: "monsters/snowboar.png",
    },
    MonsterDefinition {
        name: "Mitachurl",
        group: MonsterGroup::Hilichurl,
        element: Element::Geo,
        base_hp: 30.0,
        base_atk: 8.0,
        crit_chance: 10.0,
        crit_value: 1.8,
        def_chance: 25.0,
        def_value: 4.0,
        min_level: 10,
        drops: HILICHURL_DROPS,
        image: "monsters/mitachurl.png",
    },
    MonsterDefinition {
        name: "Pyro Whopperflower",
        group: MonsterGroup::Elemental,
        element: Element::Pyro,
        base_hp: 22.0,
        base_atk: 9.0,
        crit_chance: 20.0,
        crit_value: 1.5,
        def_chance: 10.0,
        def_value: 2.0,
        min_level: 12,
        drops: ELEMENTAL_DROPS,
        image: "monsters/pyro_whopperflower.png",
    },
    MonsterDefinition {
        name: "Electro Cicin",
        group: MonsterGroup::Elemental,
        element: Element::Electro,
        base_hp: 18.0,
        base_atk: 10.0,
        crit_chance: 15.0,
        crit_value: 1.5,
        def_chance: 5.0,
        def_value: 1.0,
        min_level: 15,
        drops: ELEMENTAL_DROPS,
        image: "monsters/electro_cicin.png",
    },
    MonsterDefinition {
        name: "Ruin Guard",
        group: MonsterGroup::Construct,
        element: Element::Physical,
        base_hp: 45.0,
        base_atk: 11.0,
        crit_chance: 10.0,
        crit_value: 2.0,
        def_chance: 35.0,
        def_value: 6.0,
        min_level: 20,
        drops: CONSTRUCT_DROPS,
        image: "monsters/ruin_guard.png",
    },
    MonsterDefinition {
        name: "Ruin Hunter",
        group: MonsterGroup::Construct,
        element: Element::Anemo,
        base_hp: 40.0,
        base_atk: 13.0,
        crit_chance: 15.0,
        crit_value: 1.8,
        def_chance: 30.0,
        def_value: 5.0,
        min_level: 25,
        drops: CONSTRUCT_DROPS,
        image: "monsters/ruin_hunter.png",
    },
];

// ============================================================================
// Abyss
// ============================================================================

pub static ABYSS_MONSTERS: &[MonsterDefinition] = &[
    MonsterDefinition {
        name: "Abyss Mage (Pyro)",
        group: MonsterGroup::Abyssal,
        element: Element::Pyro,
        base_hp: 24.0,
        base_atk: 8.0,
        crit_chance: 10.0,
        crit_value: 1.5,
        def_chance: 15.0,
        def_value: 2.0,
        min_level: 1,
        drops: ABYSSAL_DROPS,
        image: "monsters/abyss_mage_pyro.png",
    },
    MonsterDefinition {
        name: "Abyss Mage (Cryo)",
        group: MonsterGroup::Abyssal,
        element: Element::Cryo,
        base_hp: 24.0,
        base_atk: 8.0,
        crit_chance: 10.0,
        crit_value: 1.5,
        def_chance: 15.0,
        def_value: 2.0,
        min_level: 1,
        drops: ABYSSAL_DROPS,
        image: "monsters/abyss_mage_cryo.png",
    },
    MonsterDefinition {
        name: "Abyss Mage (Electro)",
        group: MonsterGroup::Abyssal,
        element: Element::Electro,
        base_hp: 24.0,
        base_atk: 9.0,
        crit_chance: 10.0,
        crit_value: 1.5,
        def_chance: 15.0,
        def_value: 2.0,
        min_level: 1,
        drops: ABYSSAL_DROPS,
        image: "monsters/abyss_mage_electro.png",
    },
    MonsterDefinition {
        name: "Abyss Herald",
        group: MonsterGroup::Abyssal,
        element: Element::Hydro,
        base_hp: 60.0,
        base_atk: 12.0,
        crit_chance: 20.0,
        crit_value: 1.8,
        def_chance: 25.0,
        def_value: 5.0,
        min_level: 1,
        drops: ABYSSAL_DROPS,
        image: "monsters/abyss_herald.png",
    },
    MonsterDefinition {
        name: "Abyss Lector",
        group: MonsterGroup::Abyssal,
        element: Element::Anemo,
        base_hp: 55.0,
        base_atk: 13.0,
        crit_chance: 20.0,
        crit_value: 1.8,
        def_chance: 20.0,
        def_value: 4.0,
        min_level: 1,
        drops: ABYSSAL_DROPS,
        image: "monsters/abyss_lector.png",
    },
];

/// Number of floors in the Abyss ladder.
pub const ABYSS_FLOORS: u32 = 12;

/// One Abyss floor: its fixed level and the monsters fought in order.
#[derive(Debug, Clone)]
pub struct AbyssFloor {
    pub floor: u32,
    pub level: u32,
    pub monsters: Vec<&'static MonsterDefinition>,
}

impl AbyssFloor {
    /// Boss floors pay out the shared prize pool.
    pub fn is_boss_floor(&self) -> bool {
        self.floor % 5 == 0
    }
}

/// Floor `n` (1-based) of the Abyss. Floors past the ladder do not exist.
pub fn abyss_floor(n: u32) -> Option<AbyssFloor> {
    if n == 0 || n > ABYSS_FLOORS {
        return None;
    }
    // Mages rotate by floor; one more mage every four floors.
    let mages = &ABYSS_MONSTERS[..3];
    let mage_count = 2 + (n - 1) / 4;
    let mut monsters: Vec<&'static MonsterDefinition> = (0..mage_count)
        .map(|i| &mages[((n + i) % mages.len() as u32) as usize])
        .collect();
    if n % 5 == 0 {
        monsters.push(&ABYSS_MONSTERS[3]);
    }
    if n >= 11 {
        monsters.push(&ABYSS_MONSTERS[4]);
    }
    Some(AbyssFloor {
        floor: n,
        level: 5 + n * 3,
        monsters,
    })
}

/// Every overworld monster available at `level`.
pub fn world_pool(level: i64) -> Vec<&'static MonsterDefinition> {
    WORLD_MONSTERS
        .iter()
        .filter(|m| m.stats_at(level).is_some())
        .collect()
}

/// Look up any catalog monster by exact name.
pub fn find_monster(name: &str) -> Option<&'static MonsterDefinition> {
    WORLD_MONSTERS
        .iter()
        .chain(ABYSS_MONSTERS.iter())
        .find(|m| m.name == name)
}
