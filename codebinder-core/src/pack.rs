//! Greedy size-constrained packing of units into successive bins.

use tracing::{debug, info};

use crate::contract::{Bin, Unit};

/// Packing parameters: the byte budget and the fixed preamble cost every
/// artifact carries (title, timestamp, category banner).
#[derive(Debug, Clone)]
pub struct PackParams {
    /// Maximum artifact size in bytes. `None` or zero disables splitting.
    pub budget: Option<u64>,
    /// Cost seeded into every open bin for the fixed header preamble.
    pub header_cost: u64,
}

impl Default for PackParams {
    fn default() -> Self {
        Self {
            budget: None,
            header_cost: 1024 * 1024,
        }
    }
}

/// Assign an ordered sequence of units of one category to successive bins so
/// that every bin's estimate stays within the budget.
///
/// Arrival order is preserved exactly, within and across bins; a unit is
/// never skipped, reordered, or split. A single unit whose cost alone
/// exceeds the budget occupies a bin by itself and is allowed to exceed it.
/// An empty input yields no bins. Without a positive budget all units land
/// in one bin.
pub fn pack(units: Vec<Unit>, params: &PackParams) -> Vec<Bin> {
    if units.is_empty() {
        return Vec::new();
    }

    let budget = match params.budget {
        Some(b) if b > 0 => b,
        _ => {
            debug!(units = units.len(), "No budget set, using a single bin");
            let estimated_bytes = params.header_cost + units.iter().map(|u| u.cost).sum::<u64>();
            return vec![Bin {
                number: 1,
                units,
                estimated_bytes,
            }];
        }
    };

    let mut bins: Vec<Bin> = Vec::new();
    let mut current = Bin {
        number: 1,
        units: Vec::new(),
        estimated_bytes: params.header_cost,
    };

    for unit in units {
        if current.estimated_bytes + unit.cost > budget && !current.units.is_empty() {
            debug!(
                bin = current.number,
                estimated = current.estimated_bytes,
                "Closing bin at budget boundary"
            );
            let next_number = current.number + 1;
            bins.push(current);
            current = Bin {
                number: next_number,
                units: Vec::new(),
                estimated_bytes: params.header_cost,
            };
        }
        current.estimated_bytes += unit.cost;
        current.units.push(unit);
    }

    if !current.units.is_empty() {
        bins.push(current);
    }

    info!(bins = bins.len(), budget, "Packing complete");
    bins
}
