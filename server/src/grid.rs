//! Toroidal grid geometry: coordinate wrapping and random cell placement.

use rand::Rng;
use shared::{Coord, COLS, MAX_PLACEMENT_TRIES, ROWS};
use std::collections::HashSet;

/// Moves `coord` one step along `dir`, wrapping at every edge. The grid has
/// no walls, so this never fails.
pub fn wrap(coord: Coord, dir: Coord) -> Coord {
    Coord {
        x: (coord.x + dir.x).rem_euclid(COLS),
        y: (coord.y + dir.y).rem_euclid(ROWS),
    }
}

/// Moves `coord` by `distance` cells along `dir` with toroidal wrap.
pub fn wrap_by(coord: Coord, dir: Coord, distance: i32) -> Coord {
    Coord {
        x: (coord.x + dir.x * distance).rem_euclid(COLS),
        y: (coord.y + dir.y * distance).rem_euclid(ROWS),
    }
}

/// Draws uniformly random cells until one is not in `occupied`, bounded at
/// `MAX_PLACEMENT_TRIES` attempts. Past the bound the last draw is accepted
/// even if occupied, trading a rare visual overlap for guaranteed
/// termination on a nearly full board.
pub fn find_unoccupied_cell<R: Rng>(rng: &mut R, occupied: &HashSet<Coord>) -> Coord {
    let mut cell = random_cell(rng);
    let mut tries = 1;
    while occupied.contains(&cell) && tries < MAX_PLACEMENT_TRIES {
        cell = random_cell(rng);
        tries += 1;
    }
    cell
}

fn random_cell<R: Rng>(rng: &mut R) -> Coord {
    Coord {
        x: rng.gen_range(0..COLS),
        y: rng.gen_range(0..ROWS),
    }
}
