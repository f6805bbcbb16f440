//! Resource stock value types shared by the catalog and the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut};

/// The three stockpiled resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Wood,
    Stone,
    Metal,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [ResourceType::Wood, ResourceType::Stone, ResourceType::Metal];
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Wood => write!(f, "wood"),
            ResourceType::Stone => write!(f, "stone"),
            ResourceType::Metal => write!(f, "metal"),
        }
    }
}

/// A bundle of wood, stone, and metal.
///
/// Stocks are real-valued: accrual produces fractional amounts between ticks.
/// Values are kept non-negative by the saturating operations; exceeding a
/// storage cap is prevented with [`Resources::capped`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub wood: f64,
    pub stone: f64,
    pub metal: f64,
}

impl Resources {
    pub const ZERO: Resources = Resources {
        wood: 0.0,
        stone: 0.0,
        metal: 0.0,
    };

    pub const fn new(wood: f64, stone: f64, metal: f64) -> Self {
        Self { wood, stone, metal }
    }

    pub fn total(&self) -> f64 {
        self.wood + self.stone + self.metal
    }

    /// True when every component of `cost` is covered.
    pub fn covers(&self, cost: &Resources) -> bool {
        self.wood >= cost.wood && self.stone >= cost.stone && self.metal >= cost.metal
    }

    /// Component-wise subtraction, clamped at zero.
    pub fn saturating_sub(&self, other: &Resources) -> Resources {
        Resources {
            wood: (self.wood - other.wood).max(0.0),
            stone: (self.stone - other.stone).max(0.0),
            metal: (self.metal - other.metal).max(0.0),
        }
    }

    /// Each component clamped to `[0, cap]`.
    pub fn capped(&self, cap: f64) -> Resources {
        Resources {
            wood: self.wood.clamp(0.0, cap),
            stone: self.stone.clamp(0.0, cap),
            metal: self.metal.clamp(0.0, cap),
        }
    }

    pub fn scaled(&self, factor: f64) -> Resources {
        Resources {
            wood: self.wood * factor,
            stone: self.stone * factor,
            metal: self.metal * factor,
        }
    }
}

impl Index<ResourceType> for Resources {
    type Output = f64;

    fn index(&self, resource: ResourceType) -> &f64 {
        match resource {
            ResourceType::Wood => &self.wood,
            ResourceType::Stone => &self.stone,
            ResourceType::Metal => &self.metal,
        }
    }
}

impl IndexMut<ResourceType> for Resources {
    fn index_mut(&mut self, resource: ResourceType) -> &mut f64 {
        match resource {
            ResourceType::Wood => &mut self.wood,
            ResourceType::Stone => &mut self.stone,
            ResourceType::Metal => &mut self.metal,
        }
    }
}

impl Add for Resources {
    type Output = Resources;

    fn add(self, other: Resources) -> Resources {
        Resources {
            wood: self.wood + other.wood,
            stone: self.stone + other.stone,
            metal: self.metal + other.metal,
        }
    }
}

impl AddAssign for Resources {
    fn add_assign(&mut self, other: Resources) {
        self.wood += other.wood;
        self.stone += other.stone;
        self.metal += other.metal;
    }
}

impl fmt::Display for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.0} wood / {:.0} stone / {:.0} metal",
            self.wood, self.stone, self.metal
        )
    }
}
