//! 4-connected A* over the walkability grid, returning only the next step
//! toward a destination (the store never exposes a full path).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use goap_types::Position;

use crate::walkability::WalkabilityGrid;

#[derive(Eq, PartialEq)]
struct OpenEntry {
    cost_plus_heuristic: u64,
    position: Position,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the smallest estimate
        // first.
        other
            .cost_plus_heuristic
            .cmp(&self.cost_plus_heuristic)
            .then_with(|| {
                (other.position.x, other.position.y).cmp(&(self.position.x, self.position.y))
            })
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the next step on a shortest 4-connected path from `from` toward
/// `to`.
///
/// Returns `None` if `to` is unreachable (including when `from` or `to` is
/// not walkable). When `from == to`, returns `Some(from)` if `from` is
/// walkable, `None` otherwise — the implementer's-choice edge case
/// documented in `DESIGN.md`.
#[must_use]
pub fn find_next_step(grid: &WalkabilityGrid, from: Position, to: Position) -> Option<Position> {
    if from == to {
        return grid.is_walkable(from.x, from.y).then_some(from);
    }
    if !grid.is_walkable(from.x, from.y) || !grid.is_walkable(to.x, to.y) {
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut best_cost: HashMap<Position, u64> = HashMap::new();

    best_cost.insert(from, 0);
    open.push(OpenEntry {
        cost_plus_heuristic: from.manhattan_distance(to),
        position: from,
    });

    while let Some(OpenEntry { position: current, .. }) = open.pop() {
        if current == to {
            return reconstruct_first_step(&came_from, from, to);
        }

        let current_cost = *best_cost.get(&current).unwrap_or(&u64::MAX);

        for neighbor in current.neighbors() {
            if !grid.is_walkable(neighbor.x, neighbor.y) {
                continue;
            }
            let tentative_cost = current_cost.saturating_add(1);
            let better = best_cost
                .get(&neighbor)
                .is_none_or(|&known| tentative_cost < known);
            if better {
                best_cost.insert(neighbor, tentative_cost);
                came_from.insert(neighbor, current);
                open.push(OpenEntry {
                    cost_plus_heuristic: tentative_cost.saturating_add(neighbor.manhattan_distance(to)),
                    position: neighbor,
                });
            }
        }
    }

    None
}

fn reconstruct_first_step(
    came_from: &HashMap<Position, Position>,
    from: Position,
    to: Position,
) -> Option<Position> {
    let mut current = to;
    let mut prev = *came_from.get(&current)?;
    while prev != from {
        current = prev;
        prev = *came_from.get(&current)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_step_returns_from_when_walkable() {
        let grid = WalkabilityGrid::all_walkable(3, 3);
        let p = Position::new(1, 1);
        assert_eq!(find_next_step(&grid, p, p), Some(p));
    }

    #[test]
    fn identity_step_is_none_when_unwalkable() {
        let grid = WalkabilityGrid::from_override(2, 2, vec![false, true, true, true]);
        let grid = grid.unwrap_or_else(|| WalkabilityGrid::all_walkable(2, 2));
        assert_eq!(find_next_step(&grid, Position::new(0, 0), Position::new(0, 0)), None);
    }

    #[test]
    fn open_field_steps_directly_toward_goal() {
        let grid = WalkabilityGrid::all_walkable(5, 5);
        let step = find_next_step(&grid, Position::new(0, 0), Position::new(3, 0));
        assert_eq!(step, Some(Position::new(1, 0)));
    }

    #[test]
    fn blocked_straight_line_routes_around() {
        // Wall at x=1 except an opening at y=2.
        let width = 3;
        let height = 5;
        let mut cells = vec![true; (width * height) as usize];
        for y in 0..height {
            if y != 2 {
                let idx = 1 * height + y;
                #[allow(clippy::cast_sign_loss)]
                let idx = idx as usize;
                cells[idx] = false;
            }
        }
        let grid = WalkabilityGrid::from_override(width, height, cells);
        let grid = grid.unwrap_or_else(|| WalkabilityGrid::all_walkable(width, height));
        let step = find_next_step(&grid, Position::new(0, 0), Position::new(2, 0));
        assert!(step.is_some());
        assert_ne!(step, Some(Position::new(1, 0)));
    }

    #[test]
    fn unreachable_goal_returns_none() {
        let width = 3;
        let height = 3;
        let mut cells = vec![true; (width * height) as usize];
        for y in 0..height {
            let idx = (1 * height + y) as usize;
            cells[idx] = false;
        }
        let grid = WalkabilityGrid::from_override(width, height, cells);
        let grid = grid.unwrap_or_else(|| WalkabilityGrid::all_walkable(width, height));
        let step = find_next_step(&grid, Position::new(0, 0), Position::new(2, 0));
        assert_eq!(step, None);
    }
}
