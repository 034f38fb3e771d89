//! Bandwidth governor: a per-session capacity budget for dispatch cost.
//!
//! `set` replaces the level and opens a fresh window; `charge` fails instead of
//! truncating when a dispatch would push the window past capacity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::syntax::{Family, Level, Statement};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BandwidthError {
    /// The charge would push consumption past the current level's capacity.
    #[error("bandwidth exceeded at level {level}: {consumed} + {cost} > capacity {capacity}")]
    Exceeded { level: Level, capacity: u32, consumed: u32, cost: u32 },

    /// The statement declared a minimum level the session is not at.
    #[error("statement needs bandwidth level {required}, session is at {current}")]
    LevelTooLow { required: Level, current: Level },
}

/// Units of capacity per level. Must be strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacities {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl Default for Capacities {
    fn default() -> Self {
        Self { low: 3, medium: 6, high: 12 }
    }
}

impl Capacities {
    pub fn for_level(&self, level: Level) -> u32 {
        match level {
            Level::Low => self.low,
            Level::Medium => self.medium,
            Level::High => self.high,
        }
    }

    pub fn is_monotonic(&self) -> bool {
        self.low < self.medium && self.medium < self.high
    }
}

/// Per-family dispatch cost. Families without an entry cost `default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostTable {
    #[serde(default = "default_cost")]
    pub default: u32,
    #[serde(default)]
    pub families: BTreeMap<Family, u32>,
}

fn default_cost() -> u32 {
    1
}

impl Default for CostTable {
    fn default() -> Self {
        let mut families = BTreeMap::new();
        families.insert(Family::Archive, 2);
        families.insert(Family::Companion, 3);
        Self { default: default_cost(), families }
    }
}

impl CostTable {
    pub fn cost_of(&self, statement: &Statement) -> u32 {
        self.families.get(&statement.family).copied().unwrap_or(self.default)
    }
}

/// Current level and consumption within the window opened by the last `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BandwidthState {
    pub current: Level,
    pub consumed: u32,
}

#[derive(Debug, Clone)]
pub struct BandwidthGovernor {
    capacities: Capacities,
    costs: CostTable,
    initial: Level,
    state: BandwidthState,
}

impl BandwidthGovernor {
    pub fn new(capacities: Capacities, costs: CostTable, initial: Level) -> Self {
        Self { capacities, costs, initial, state: BandwidthState { current: initial, consumed: 0 } }
    }

    pub fn state(&self) -> BandwidthState {
        self.state
    }

    pub fn capacity(&self) -> u32 {
        self.capacities.for_level(self.state.current)
    }

    /// Units left in the current window.
    pub fn remaining(&self) -> u32 {
        self.capacity().saturating_sub(self.state.consumed)
    }

    pub fn cost_of(&self, statement: &Statement) -> u32 {
        self.costs.cost_of(statement)
    }

    /// Replace the level and reset consumption.
    pub fn set(&mut self, level: Level) {
        self.state = BandwidthState { current: level, consumed: 0 };
        debug!(level = %level, capacity = self.capacity(), "bandwidth window opened");
    }

    /// Reject statements that declare a higher minimum level than the current one.
    pub fn admit(&self, statement: &Statement) -> Result<(), BandwidthError> {
        match statement.bandwidth {
            Some(required) if required > self.state.current => {
                Err(BandwidthError::LevelTooLow { required, current: self.state.current })
            }
            _ => Ok(()),
        }
    }

    /// Consume `cost` units. Leaves state untouched on failure.
    pub fn charge(&mut self, cost: u32) -> Result<(), BandwidthError> {
        let capacity = self.capacity();
        let next = self.state.consumed.saturating_add(cost);
        if next > capacity {
            return Err(BandwidthError::Exceeded {
                level: self.state.current,
                capacity,
                consumed: self.state.consumed,
                cost,
            });
        }
        self.state.consumed = next;
        Ok(())
    }

    /// Return to the configured initial level with an empty window.
    pub fn reset(&mut self) {
        self.set(self.initial);
    }
}
