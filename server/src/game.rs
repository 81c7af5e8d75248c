//! Authoritative match simulation: one call to [`advance_tick`] moves a
//! room's state forward by exactly one tick.

use crate::grid::{find_unoccupied_cell, wrap, wrap_by};
use rand::Rng;
use shared::{Coord, GameState, Snake, APPLE_COUNT, NO_WINNER, TELEPORT_DISTANCE};
use std::collections::HashSet;

/// Builds the fixed initial layout: two three-segment snakes facing each
/// other across the arena, `APPLE_COUNT` apples and one teleport perk on
/// freshly drawn unoccupied cells.
pub fn new_game_state<R: Rng>(rng: &mut R) -> GameState {
    let mut state = GameState {
        snakes: [
            Snake::new(
                vec![Coord::new(10, 20), Coord::new(9, 20), Coord::new(8, 20)],
                Coord::new(1, 0),
            ),
            Snake::new(
                vec![Coord::new(30, 20), Coord::new(31, 20), Coord::new(32, 20)],
                Coord::new(-1, 0),
            ),
        ],
        apples: Vec::new(),
        teleport_perks: Vec::new(),
        tick: 0,
    };

    for _ in 0..APPLE_COUNT {
        spawn_apple(&mut state, rng);
    }
    spawn_perk(&mut state, rng);
    state
}

/// Spawns one apple, avoiding snake bodies and existing apples.
pub fn spawn_apple<R: Rng>(state: &mut GameState, rng: &mut R) {
    let mut occupied: HashSet<Coord> = body_cells(state);
    occupied.extend(state.apples.iter().copied());
    let cell = find_unoccupied_cell(rng, &occupied);
    state.apples.push(cell);
}

/// Spawns one teleport perk, avoiding snake bodies, apples and other perks.
pub fn spawn_perk<R: Rng>(state: &mut GameState, rng: &mut R) {
    let mut occupied: HashSet<Coord> = body_cells(state);
    occupied.extend(state.apples.iter().copied());
    occupied.extend(state.teleport_perks.iter().copied());
    let cell = find_unoccupied_cell(rng, &occupied);
    state.teleport_perks.push(cell);
}

fn body_cells(state: &GameState) -> HashSet<Coord> {
    state
        .snakes
        .iter()
        .flat_map(|s| s.body.iter().copied())
        .collect()
}

/// Advances the match by one tick. The step order is the contract: intents,
/// head projection, head-to-head, body collisions, movement and apples,
/// perks, tick counter.
pub fn advance_tick<R: Rng>(state: &mut GameState, rng: &mut R) {
    // 1. Commit pending headings; an exact reversal is dropped and the last
    // valid heading persists.
    for snake in state.snakes.iter_mut().filter(|s| s.alive) {
        if !snake.next_dir.is_reverse_of(&snake.dir) {
            snake.dir = snake.next_dir;
        }
    }

    // 2. Candidate heads for living snakes.
    let new_heads: Vec<Option<Coord>> = state
        .snakes
        .iter()
        .map(|s| s.alive.then(|| wrap(s.head(), s.dir)))
        .collect();

    // 3. Head-to-head: both die the same tick, no winner from a mutual
    // crash. Checked before body collisions so it is never miscredited.
    if let (Some(a), Some(b)) = (new_heads[0], new_heads[1]) {
        if a == b {
            state.snakes[0].alive = false;
            state.snakes[1].alive = false;
        }
    }

    // 4. Body collisions, judged simultaneously against the pre-tick bodies.
    // Tails are excluded because they vacate their cell this same tick.
    // Deaths are committed only after both snakes are judged, so the
    // outcome does not depend on player index order.
    let mut died = [false; 2];
    for p in 0..2 {
        let head = match new_heads[p] {
            Some(h) if state.snakes[p].alive => h,
            _ => continue,
        };
        let opp = 1 - p;
        if hits_body_except_tail(&state.snakes[p].body, head)
            || (state.snakes[opp].alive && hits_body_except_tail(&state.snakes[opp].body, head))
        {
            died[p] = true;
        }
    }
    for p in 0..2 {
        if died[p] {
            state.snakes[p].alive = false;
        }
    }

    // 5. Advance survivors. Eating an apple keeps the tail (net growth of
    // one) and respawns a replacement immediately.
    for p in 0..2 {
        let head = match new_heads[p] {
            Some(h) if state.snakes[p].alive => h,
            _ => continue,
        };
        state.snakes[p].body.insert(0, head);

        if let Some(idx) = state.apples.iter().position(|a| *a == head) {
            state.apples.remove(idx);
            state.snakes[p].score += 1;
            spawn_apple(state, rng);
        } else {
            state.snakes[p].body.pop();
        }
    }

    // 6. Teleport perk pickup.
    for p in 0..2 {
        if !state.snakes[p].alive {
            continue;
        }
        let head = state.snakes[p].head();
        if let Some(idx) = state.teleport_perks.iter().position(|t| *t == head) {
            state.teleport_perks.remove(idx);
            state.snakes[p].teleport_charges += 1;
            spawn_perk(state, rng);
        }
    }

    // 7.
    state.tick += 1;
}

fn hits_body_except_tail(body: &[Coord], head: Coord) -> bool {
    body[..body.len().saturating_sub(1)].contains(&head)
}

/// Consumes one charge and shifts every segment `TELEPORT_DISTANCE` cells
/// along the current heading with toroidal wrap. Deliberately performs no
/// collision check: teleporting onto an occupied cell is legal.
/// Caller guarantees the snake is alive and has a charge.
pub fn apply_teleport(snake: &mut Snake) {
    snake.teleport_charges -= 1;
    for seg in &mut snake.body {
        *seg = wrap_by(*seg, snake.dir, TELEPORT_DISTANCE);
    }
}

/// `Some((winner, scores))` once at most one snake is alive. The winner is
/// a player index, or `NO_WINNER` when both died the same tick.
pub fn match_outcome(state: &GameState) -> Option<(i32, Vec<u32>)> {
    if state.alive_count() >= 2 {
        return None;
    }
    let winner = state
        .snakes
        .iter()
        .position(|s| s.alive)
        .map(|i| i as i32)
        .unwrap_or(NO_WINNER);
    Some((winner, state.snakes.iter().map(|s| s.score).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{COLS, ROWS};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1234)
    }

    /// A deterministic state with pickups parked far away from row 20 so
    /// movement tests are not perturbed by accidental eating.
    fn quiet_state() -> GameState {
        GameState {
            snakes: [
                Snake::new(
                    vec![Coord::new(10, 20), Coord::new(9, 20), Coord::new(8, 20)],
                    Coord::new(1, 0),
                ),
                Snake::new(
                    vec![Coord::new(30, 20), Coord::new(31, 20), Coord::new(32, 20)],
                    Coord::new(-1, 0),
                ),
            ],
            apples: vec![Coord::new(0, 0), Coord::new(39, 39)],
            teleport_perks: vec![Coord::new(0, 39)],
            tick: 0,
        }
    }

    #[test]
    fn initial_layout_matches_contract() {
        let state = new_game_state(&mut rng());

        assert_eq!(state.snakes[0].body[0], Coord::new(10, 20));
        assert_eq!(state.snakes[0].dir, Coord::new(1, 0));
        assert_eq!(state.snakes[1].body[0], Coord::new(30, 20));
        assert_eq!(state.snakes[1].dir, Coord::new(-1, 0));
        assert_eq!(state.apples.len(), APPLE_COUNT);
        assert_eq!(state.teleport_perks.len(), 1);
        assert_eq!(state.tick, 0);

        // Pickups never start on top of a snake or each other.
        let bodies = body_cells(&state);
        for apple in &state.apples {
            assert!(!bodies.contains(apple));
        }
        for perk in &state.teleport_perks {
            assert!(!bodies.contains(perk));
            assert!(!state.apples.contains(perk));
        }
    }

    #[test]
    fn snake_moves_one_cell_per_tick() {
        let mut state = quiet_state();
        advance_tick(&mut state, &mut rng());

        assert_eq!(state.snakes[0].head(), Coord::new(11, 20));
        assert_eq!(state.snakes[0].body.len(), 3);
        assert_eq!(state.snakes[1].head(), Coord::new(29, 20));
        assert_eq!(state.tick, 1);
    }

    #[test]
    fn movement_wraps_at_the_edge() {
        let mut state = quiet_state();
        state.snakes[0].body = vec![Coord::new(39, 10), Coord::new(38, 10), Coord::new(37, 10)];

        advance_tick(&mut state, &mut rng());
        assert_eq!(state.snakes[0].head(), Coord::new(0, 10));
        assert!(state.snakes[0].alive);
    }

    #[test]
    fn reversal_intent_is_dropped() {
        let mut state = quiet_state();
        state.snakes[0].next_dir = Coord::new(-1, 0);

        advance_tick(&mut state, &mut rng());

        // Heading unchanged, snake kept moving right.
        assert_eq!(state.snakes[0].dir, Coord::new(1, 0));
        assert_eq!(state.snakes[0].head(), Coord::new(11, 20));
    }

    #[test]
    fn perpendicular_turn_is_applied() {
        let mut state = quiet_state();
        state.snakes[0].next_dir = Coord::new(0, 1);

        advance_tick(&mut state, &mut rng());
        assert_eq!(state.snakes[0].dir, Coord::new(0, 1));
        assert_eq!(state.snakes[0].head(), Coord::new(10, 21));
    }

    #[test]
    fn head_to_head_kills_both() {
        let mut state = quiet_state();
        // One cell apart, moving toward each other: both project onto (20,20).
        state.snakes[0].body = vec![Coord::new(19, 20), Coord::new(18, 20), Coord::new(17, 20)];
        state.snakes[1].body = vec![Coord::new(21, 20), Coord::new(22, 20), Coord::new(23, 20)];

        advance_tick(&mut state, &mut rng());

        assert!(!state.snakes[0].alive);
        assert!(!state.snakes[1].alive);
        assert_eq!(match_outcome(&state), Some((NO_WINNER, vec![0, 0])));
    }

    #[test]
    fn hitting_opponent_body_kills_only_the_mover() {
        let mut state = quiet_state();
        // Snake 0's candidate head lands on snake 1's second segment.
        state.snakes[0].body = vec![Coord::new(30, 21), Coord::new(30, 22), Coord::new(30, 23)];
        state.snakes[0].dir = Coord::new(0, -1);
        state.snakes[0].next_dir = Coord::new(0, -1);
        state.snakes[1].body = vec![Coord::new(29, 20), Coord::new(30, 20), Coord::new(31, 20)];

        advance_tick(&mut state, &mut rng());

        assert!(!state.snakes[0].alive);
        assert!(state.snakes[1].alive);
        let (winner, _) = match_outcome(&state).expect("match should be over");
        assert_eq!(winner, 1);
    }

    #[test]
    fn opponent_tail_cell_is_safe() {
        let mut state = quiet_state();
        // Snake 0 aims at snake 1's tail, which vacates this same tick.
        state.snakes[0].body = vec![Coord::new(32, 21), Coord::new(32, 22), Coord::new(32, 23)];
        state.snakes[0].dir = Coord::new(0, -1);
        state.snakes[0].next_dir = Coord::new(0, -1);
        state.snakes[1].body = vec![Coord::new(30, 20), Coord::new(31, 20), Coord::new(32, 20)];

        advance_tick(&mut state, &mut rng());

        assert!(state.snakes[0].alive);
        assert!(state.snakes[1].alive);
        assert_eq!(state.snakes[0].head(), Coord::new(32, 20));
    }

    #[test]
    fn self_collision_kills() {
        let mut state = quiet_state();
        // A hook shape: turning right at (10,20) runs into the snake's own
        // fourth segment at (11,20), well clear of the excluded tail.
        state.snakes[0].body = vec![
            Coord::new(10, 20),
            Coord::new(10, 21),
            Coord::new(11, 21),
            Coord::new(11, 20),
            Coord::new(12, 20),
            Coord::new(13, 20),
        ];
        state.snakes[0].dir = Coord::new(0, -1);
        state.snakes[0].next_dir = Coord::new(1, 0);

        advance_tick(&mut state, &mut rng());
        assert!(!state.snakes[0].alive);
    }

    #[test]
    fn eating_an_apple_grows_and_scores() {
        let mut state = quiet_state();
        state.apples = vec![Coord::new(11, 20), Coord::new(0, 0)];

        advance_tick(&mut state, &mut rng());

        let snake = &state.snakes[0];
        assert_eq!(snake.score, 1);
        assert_eq!(snake.body.len(), 4);
        assert_eq!(snake.head(), Coord::new(11, 20));
        // The eaten apple is replaced immediately; the count is invariant
        // and the replacement avoids the snake that just grew over the cell.
        assert_eq!(state.apples.len(), APPLE_COUNT);
        assert!(!state.apples.contains(&Coord::new(11, 20)));
    }

    #[test]
    fn non_eating_tick_keeps_length_and_score() {
        let mut state = quiet_state();
        advance_tick(&mut state, &mut rng());

        assert_eq!(state.snakes[0].score, 0);
        assert_eq!(state.snakes[0].body.len(), 3);
        assert_eq!(state.apples.len(), APPLE_COUNT);
    }

    #[test]
    fn apple_count_invariant_over_many_ticks() {
        let mut state = new_game_state(&mut rng());
        let mut r = rng();
        for _ in 0..50 {
            if state.alive_count() < 2 {
                break;
            }
            advance_tick(&mut state, &mut r);
            assert_eq!(state.apples.len(), APPLE_COUNT);
            assert_eq!(state.teleport_perks.len(), 1);
        }
    }

    #[test]
    fn perk_pickup_grants_a_charge_and_respawns() {
        let mut state = quiet_state();
        state.teleport_perks = vec![Coord::new(11, 20)];

        advance_tick(&mut state, &mut rng());

        assert_eq!(state.snakes[0].teleport_charges, 1);
        assert_eq!(state.teleport_perks.len(), 1);
        assert_ne!(state.teleport_perks[0], Coord::new(11, 20));
    }

    #[test]
    fn teleport_translates_whole_body_and_spends_a_charge() {
        let mut state = quiet_state();
        state.snakes[0].teleport_charges = 2;
        let before = state.snakes[0].body.clone();

        apply_teleport(&mut state.snakes[0]);

        let snake = &state.snakes[0];
        assert_eq!(snake.teleport_charges, 1);
        assert_eq!(snake.body.len(), before.len());
        for (seg, old) in snake.body.iter().zip(&before) {
            assert_eq!(seg.x, (old.x + TELEPORT_DISTANCE).rem_euclid(COLS));
            assert_eq!(seg.y, old.y.rem_euclid(ROWS));
        }
    }

    #[test]
    fn teleport_ignores_collisions() {
        let mut state = quiet_state();
        state.snakes[0].teleport_charges = 1;
        // Park the opponent exactly where the teleport lands the head.
        state.snakes[1].body = vec![Coord::new(15, 20), Coord::new(15, 21), Coord::new(15, 22)];

        apply_teleport(&mut state.snakes[0]);

        assert_eq!(state.snakes[0].head(), Coord::new(15, 20));
        assert!(state.snakes[0].alive);
        assert!(state.snakes[1].alive);
    }

    #[test]
    fn outcome_is_none_while_both_live() {
        let state = quiet_state();
        assert_eq!(match_outcome(&state), None);
    }

    #[test]
    fn sole_survivor_wins_with_scores_reported() {
        let mut state = quiet_state();
        state.snakes[0].alive = false;
        state.snakes[0].score = 2;
        state.snakes[1].score = 5;

        assert_eq!(match_outcome(&state), Some((1, vec![2, 5])));
    }
}
