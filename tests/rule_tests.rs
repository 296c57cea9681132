use proptest::prelude::*;
use rule184_traffic::simulation::{
    advance, next_cell, offset_index, pattern, step_lane, Advance, BoundaryMode, Direction, RULE_184,
};

fn cells(bits: &[u8]) -> Vec<bool> {
    bits.iter().map(|&b| b == 1).collect()
}

/// Rule 184 as printed in its usual truth table, pattern 7 first
#[test]
fn test_rule_table_matches_rule_184() {
    let outputs: Vec<u8> = (0..8).map(|p| u8::from(RULE_184[p])).collect();
    assert_eq!(outputs, vec![0, 0, 0, 1, 1, 1, 0, 1]);

    let number: u32 = (0..8).map(|p| u32::from(RULE_184[p]) << p).sum();
    assert_eq!(number, 184);
}

#[test]
fn test_pattern_packs_neighbourhood() {
    assert_eq!(pattern(false, false, false), 0);
    assert_eq!(pattern(false, true, false), 2);
    assert_eq!(pattern(true, false, true), 5);
    assert_eq!(pattern(true, true, true), 7);
}

#[test]
fn test_next_cell_semantics() {
    // Vehicle with space ahead leaves its cell
    assert!(!next_cell(false, true, false));
    // Vehicle blocked ahead stays
    assert!(next_cell(false, true, true));
    // Empty cell fills from behind
    assert!(next_cell(true, false, false));
    assert!(next_cell(true, false, true));
    // Empty cell with nothing behind stays empty
    assert!(!next_cell(false, false, true));
}

#[test]
fn test_step_lane_moves_into_empty_space() {
    let lane = cells(&[1, 0, 0, 1, 0, 0, 0, 0, 0, 0]);
    let next = step_lane(&lane, Direction::LeftToRight, BoundaryMode::Toroid);
    assert_eq!(next, cells(&[0, 1, 0, 0, 1, 0, 0, 0, 0, 0]));
}

#[test]
fn test_step_lane_queue_moves_front_first() {
    let lane = cells(&[1, 1, 1, 0, 0, 0]);
    let next = step_lane(&lane, Direction::LeftToRight, BoundaryMode::Null);
    assert_eq!(next, cells(&[1, 1, 0, 1, 0, 0]));
}

#[test]
fn test_step_lane_reverse_direction() {
    let lane = cells(&[0, 0, 1, 0, 0, 1]);
    let next = step_lane(&lane, Direction::RightToLeft, BoundaryMode::Toroid);
    assert_eq!(next, cells(&[0, 1, 0, 0, 1, 0]));

    let vertical = step_lane(&lane, Direction::BottomToTop, BoundaryMode::Toroid);
    assert_eq!(vertical, next);
}

#[test]
fn test_toroid_wraps_last_cell() {
    let lane = cells(&[0, 0, 0, 0, 1]);
    let next = step_lane(&lane, Direction::LeftToRight, BoundaryMode::Toroid);
    assert_eq!(next, cells(&[1, 0, 0, 0, 0]));
}

#[test]
fn test_null_boundary_drops_exiting_vehicle() {
    let lane = cells(&[0, 0, 0, 0, 1]);
    let next = step_lane(&lane, Direction::LeftToRight, BoundaryMode::Null);
    assert_eq!(next, cells(&[0, 0, 0, 0, 0]));

    let reverse = cells(&[1, 0, 0, 0, 0]);
    let next = step_lane(&reverse, Direction::RightToLeft, BoundaryMode::Null);
    assert_eq!(next, cells(&[0, 0, 0, 0, 0]));
}

#[test]
fn test_offset_index() {
    assert_eq!(offset_index(0, -1, 5, BoundaryMode::Toroid), Some(4));
    assert_eq!(offset_index(4, 1, 5, BoundaryMode::Toroid), Some(0));
    assert_eq!(offset_index(4, 1, 5, BoundaryMode::Null), None);
    assert_eq!(offset_index(0, -1, 5, BoundaryMode::Null), None);
    assert_eq!(offset_index(2, 1, 5, BoundaryMode::Null), Some(3));
    assert_eq!(offset_index(0, 1, 0, BoundaryMode::Toroid), None);
}

#[test]
fn test_advance_outcomes() {
    let lane = cells(&[1, 1, 0, 0, 1]);
    assert_eq!(advance(&lane, 0, Direction::LeftToRight, BoundaryMode::Null), Advance::Blocked);
    assert_eq!(advance(&lane, 1, Direction::LeftToRight, BoundaryMode::Null), Advance::Moved(2));
    assert_eq!(advance(&lane, 4, Direction::LeftToRight, BoundaryMode::Null), Advance::Exited);
    // On a ring the last vehicle is blocked by the first
    assert_eq!(advance(&lane, 4, Direction::LeftToRight, BoundaryMode::Toroid), Advance::Blocked);
    assert_eq!(advance(&lane, 0, Direction::RightToLeft, BoundaryMode::Null), Advance::Exited);
}

fn arb_lane() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..64)
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::LeftToRight),
        Just(Direction::RightToLeft),
        Just(Direction::TopToBottom),
        Just(Direction::BottomToTop),
    ]
}

proptest! {
    #[test]
    fn toroid_conserves_vehicles(lane in arb_lane(), direction in arb_direction()) {
        let next = step_lane(&lane, direction, BoundaryMode::Toroid);
        prop_assert_eq!(
            next.iter().filter(|c| **c).count(),
            lane.iter().filter(|c| **c).count()
        );
    }

    #[test]
    fn null_never_gains_vehicles(lane in arb_lane(), direction in arb_direction()) {
        let before = lane.iter().filter(|c| **c).count();
        let after = step_lane(&lane, direction, BoundaryMode::Null).iter().filter(|c| **c).count();
        prop_assert!(after <= before);
        prop_assert!(before - after <= 1);
    }

    #[test]
    fn reverse_lane_mirrors_forward(lane in arb_lane(), toroid in any::<bool>()) {
        let boundary = if toroid { BoundaryMode::Toroid } else { BoundaryMode::Null };
        let mut reversed = lane.clone();
        reversed.reverse();

        let mut mirrored = step_lane(&reversed, Direction::RightToLeft, boundary);
        mirrored.reverse();
        prop_assert_eq!(mirrored, step_lane(&lane, Direction::LeftToRight, boundary));
    }

    #[test]
    fn advance_agrees_with_step_lane(lane in arb_lane(), direction in arb_direction(), toroid in any::<bool>()) {
        let boundary = if toroid { BoundaryMode::Toroid } else { BoundaryMode::Null };
        let next = step_lane(&lane, direction, boundary);
        let mut rebuilt = vec![false; lane.len()];
        for (i, occupied) in lane.iter().enumerate() {
            if !occupied {
                continue;
            }
            match advance(&lane, i, direction, boundary) {
                Advance::Blocked => rebuilt[i] = true,
                Advance::Moved(j) => rebuilt[j] = true,
                Advance::Exited => {}
            }
        }
        prop_assert_eq!(rebuilt, next);
    }
}
