//! Static game content: shop items, monsters and explorable locations.

use rand::Rng;

use crate::game::types::{Attribute, EvolutionPath};

/// Chance that a mutation item awakens its path on a single use.
pub const MUTATION_CHANCE: f64 = 0.3;

/// One declared effect of an item. An item carries any combination of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemEffect {
    Hunger(u32),
    Health(u32),
    Energy(u32),
    Mood(u32),
    Boost(Attribute, u32),
    Experience(u32),
    Mutation { path: EvolutionPath, chance: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: u32,
    pub effects: &'static [ItemEffect],
}

pub const ITEMS: &[ItemDef] = &[
    ItemDef {
        id: "bread",
        name: "Bread",
        description: "Plain bread for a hungry dragonling",
        price: 5,
        effects: &[ItemEffect::Hunger(10)],
    },
    ItemDef {
        id: "meat",
        name: "Meat",
        description: "Fresh meat, builds strength",
        price: 15,
        effects: &[ItemEffect::Hunger(25), ItemEffect::Boost(Attribute::Strength, 1)],
    },
    ItemDef {
        id: "mead",
        name: "Mead",
        description: "Sweet mead that lifts the mood",
        price: 20,
        effects: &[ItemEffect::Mood(15)],
    },
    ItemDef {
        id: "magic_potion",
        name: "Magic Potion",
        description: "Restores energy and sharpens the mind",
        price: 50,
        effects: &[
            ItemEffect::Energy(30),
            ItemEffect::Boost(Attribute::Intelligence, 2),
        ],
    },
    ItemDef {
        id: "healing_herb",
        name: "Healing Herb",
        description: "Mends the dragon's wounds",
        price: 30,
        effects: &[ItemEffect::Health(40)],
    },
    ItemDef {
        id: "ancient_crystal",
        name: "Ancient Crystal",
        description: "A rare crystal that speeds up growth",
        price: 100,
        effects: &[ItemEffect::Experience(50)],
    },
    ItemDef {
        id: "fire_stone",
        name: "Fire Stone",
        description: "May awaken the power of flame",
        price: 200,
        effects: &[ItemEffect::Mutation {
            path: EvolutionPath::Fire,
            chance: MUTATION_CHANCE,
        }],
    },
    ItemDef {
        id: "wisdom_tome",
        name: "Tome of Wisdom",
        description: "An ancient book of magic",
        price: 150,
        effects: &[ItemEffect::Mutation {
            path: EvolutionPath::Wisdom,
            chance: MUTATION_CHANCE,
        }],
    },
    ItemDef {
        id: "shadow_cloak",
        name: "Shadow Cloak",
        description: "A cloak woven from dark magic",
        price: 180,
        effects: &[ItemEffect::Mutation {
            path: EvolutionPath::Shadow,
            chance: MUTATION_CHANCE,
        }],
    },
];

/// Items that can be found while exploring or questing.
pub const FORAGE_ITEMS: &[&str] = &["healing_herb", "magic_potion"];

pub fn item(id: &str) -> Option<&'static ItemDef> {
    ITEMS.iter().find(|item| item.id.eq_ignore_ascii_case(id))
}

/// Catalog items at or below `max_price`, in catalog order.
pub fn items_up_to(max_price: u32) -> impl Iterator<Item = &'static ItemDef> {
    ITEMS.iter().filter(move |item| item.price <= max_price)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Monster {
    pub id: &'static str,
    pub name: &'static str,
    pub health: u32,
    pub attack: u32,
    pub gold: u32,
    pub exp: u32,
}

pub const MONSTERS: &[Monster] = &[
    Monster {
        id: "forest_wolf",
        name: "Forest Wolf",
        health: 30,
        attack: 8,
        gold: 15,
        exp: 10,
    },
    Monster {
        id: "goblin_raider",
        name: "Goblin Raider",
        health: 45,
        attack: 12,
        gold: 25,
        exp: 20,
    },
    Monster {
        id: "dark_mage",
        name: "Dark Mage",
        health: 60,
        attack: 15,
        gold: 40,
        exp: 35,
    },
    Monster {
        id: "ancient_golem",
        name: "Ancient Golem",
        health: 100,
        attack: 20,
        gold: 70,
        exp: 50,
    },
];

pub fn monster(id: &str) -> Option<&'static Monster> {
    MONSTERS.iter().find(|m| m.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encounter {
    Monster,
    Treasure,
    Herbs,
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Forest,
    Ruins,
}

impl Location {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forest" | "woods" => Some(Location::Forest),
            "ruins" => Some(Location::Ruins),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Location::Forest => "forest",
            Location::Ruins => "ruins",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Location::Forest => "Dark Forest",
            Location::Ruins => "Ancient Ruins",
        }
    }

    /// Weighted encounter table.
    fn encounters(&self) -> &'static [(Encounter, u32)] {
        match self {
            Location::Forest => &[
                (Encounter::Monster, 40),
                (Encounter::Treasure, 25),
                (Encounter::Herbs, 25),
                (Encounter::Nothing, 10),
            ],
            Location::Ruins => &[
                (Encounter::Monster, 35),
                (Encounter::Treasure, 40),
                (Encounter::Herbs, 10),
                (Encounter::Nothing, 15),
            ],
        }
    }

    pub fn monsters(&self) -> &'static [Monster] {
        match self {
            Location::Forest => MONSTERS,
            Location::Ruins => &MONSTERS[2..],
        }
    }

    pub fn roll_encounter<R: Rng + ?Sized>(&self, rng: &mut R) -> Encounter {
        let table = self.encounters();
        let total: u32 = table.iter().map(|(_, w)| w).sum();
        let mut roll = rng.gen_range(0..total);
        for (encounter, weight) in table {
            if roll < *weight {
                return *encounter;
            }
            roll -= weight;
        }
        Encounter::Nothing
    }

    pub fn roll_monster<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static Monster {
        let pool = self.monsters();
        &pool[rng.gen_range(0..pool.len())]
    }
}
