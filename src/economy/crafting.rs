//! Crafting and cooking recipes, plus the food that cooking produces.

use super::cooldown::Action;
use crate::game::loot::DropResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Station {
    Forge,
    Kitchen,
}

impl Station {
    /// Cooldown key charged when a recipe at this station is made.
    pub fn action(self) -> Action {
        match self {
            Station::Forge => Action::Craft,
            Station::Kitchen => Action::Cook,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recipe {
    pub name: &'static str,
    pub station: Station,
    pub inputs: &'static [(&'static str, u32)],
    pub output: (&'static str, u32),
}

impl Recipe {
    pub fn inputs(&self) -> Vec<DropResult> {
        self.inputs
            .iter()
            .map(|(item, qty)| DropResult::new(*item, *qty))
            .collect()
    }

    pub fn output(&self) -> DropResult {
        DropResult::new(self.output.0, self.output.1)
    }
}

pub static RECIPES: &[Recipe] = &[
    Recipe {
        name: "Sweet Madame",
        station: Station::Kitchen,
        inputs: &[("Sweet Flower", 2), ("Mint", 1)],
        output: ("Sweet Madame", 1),
    },
    Recipe {
        name: "Mint Salad",
        station: Station::Kitchen,
        inputs: &[("Mint", 3)],
        output: ("Mint Salad", 1),
    },
    Recipe {
        name: "Mondstadt Hash Brown",
        station: Station::Kitchen,
        inputs: &[("Mint", 2), ("Wolfhook", 2), ("Cecilia", 1)],
        output: ("Mondstadt Hash Brown", 1),
    },
    Recipe {
        name: "Mystic Enhancement Ore",
        station: Station::Forge,
        inputs: &[("Crystal Chunk", 1), ("Iron Chunk", 2)],
        output: ("Mystic Enhancement Ore", 1),
    },
    Recipe {
        name: "Magical Crystal Chunk",
        station: Station::Forge,
        inputs: &[("Crystal Chunk", 3), ("Noctilucous Jade", 1)],
        output: ("Magical Crystal Chunk", 1),
    },
    Recipe {
        name: "Silver Sword",
        station: Station::Forge,
        inputs: &[("Iron Chunk", 5), ("Crystal Chunk", 2)],
        output: ("Silver Sword", 1),
    },
];

/// Case-insensitive recipe lookup.
pub fn find_recipe(name: &str) -> Option<&'static Recipe> {
    let name = name.trim();
    RECIPES.iter().find(|r| r.name.eq_ignore_ascii_case(name))
}

pub fn recipes_at(station: Station) -> impl Iterator<Item = &'static Recipe> {
    RECIPES.iter().filter(move |r| r.station == station)
}

/// Fraction of max HP restored by eating `item`, if it is food.
pub fn food_heal_ratio(item: &str) -> Option<f64> {
    match item {
        "Mint Salad" => Some(0.10),
        "Sweet Madame" => Some(0.20),
        "Mondstadt Hash Brown" => Some(0.30),
        _ => None,
    }
}
