// Room inventory: categories, their fixed nightly rates and the units seeded at startup

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("Unknown room category: {0}")]
    UnknownCategory(String),
}

// Room categories, each bound to a flat nightly rate in minor currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Standard,
    Deluxe,
    Suite,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Standard, Category::Deluxe, Category::Suite];

    pub fn nightly_rate(&self) -> i64 {
        match self {
            Category::Standard => 1000,
            Category::Deluxe => 2000,
            Category::Suite => 5000,
        }
    }

    // Name used in persisted unit records
    pub fn name(&self) -> &'static str {
        match self {
            Category::Standard => "STANDARD",
            Category::Deluxe => "DELUXE",
            Category::Suite => "SUITE",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CatalogError::UnknownCategory(s.to_string()))
    }
}

// A bookable room. `bookable` is only ever flipped by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: u32,
    pub category: Category,
    pub bookable: bool,
}

impl Unit {
    pub fn new(id: u32, category: Category) -> Self {
        Self {
            id,
            category,
            bookable: true,
        }
    }

    pub fn rate(&self) -> i64 {
        self.category.nightly_rate()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Room {} [{}] - {}/night - {}",
            self.id,
            self.category,
            self.rate(),
            if self.bookable { "Available" } else { "Booked" }
        )
    }
}

// Inventory entry used to seed an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSeed {
    pub id: u32,
    pub category: Category,
}

impl From<UnitSeed> for Unit {
    fn from(seed: UnitSeed) -> Self {
        Unit::new(seed.id, seed.category)
    }
}

// Two standard rooms, two deluxe rooms and one suite, numbered 1 to 5
pub fn default_catalog() -> Vec<UnitSeed> {
    let categories = [
        Category::Standard,
        Category::Standard,
        Category::Deluxe,
        Category::Deluxe,
        Category::Suite,
    ];

    categories
        .into_iter()
        .zip(1u32..)
        .map(|(category, id)| UnitSeed { id, category })
        .collect()
}
