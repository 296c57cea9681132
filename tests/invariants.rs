use proptest::prelude::*;
use rule184_traffic::simulation::{
    BoundaryMode, LaneFill, LaneId, RoadId, SimParams, Simulation, Topology, VehicleStatus,
};
use std::collections::{HashMap, HashSet};

fn arb_boundary() -> impl Strategy<Value = BoundaryMode> {
    prop_oneof![Just(BoundaryMode::Toroid), Just(BoundaryMode::Null)]
}

fn arb_topology() -> impl Strategy<Value = Topology> {
    (0usize..4, 12usize..40).prop_map(|(preset, length)| match preset {
        0 => Topology::single_lane(length, LaneFill::Density(0.4)),
        1 => Topology::double_lane(length),
        2 => Topology::two_way(length),
        _ => Topology::crossroads(length, length),
    })
}

/// Busy parameters so every event path is exercised
fn busy_params() -> SimParams {
    SimParams {
        breakdown_prob: 0.2,
        repair_prob: 0.5,
        repair_countdown: 3,
        lane_change_prob: 0.3,
        turn_prob: 0.5,
        insertion_prob: 0.8,
        insertion_damping: 1.0,
        exit_survival_prob: 0.3,
        ..SimParams::default()
    }
}

fn assert_unique_cells(sim: &Simulation) -> Result<(), TestCaseError> {
    let mut seen = HashSet::new();
    for v in sim.vehicles() {
        prop_assert!(seen.insert((v.road, v.lane, v.position)), "two vehicles at {:?}", v);
        prop_assert!(v.status != VehicleStatus::Removed);
    }
    let mut occupied = 0;
    for (road, spec) in sim.topology().roads.iter().enumerate() {
        for lane in 0..spec.lanes.len() {
            let cells = sim.lane_occupancy(RoadId(road), LaneId(lane)).unwrap();
            prop_assert_eq!(cells.len(), spec.length);
            occupied += cells.iter().filter(|c| **c).count();
        }
    }
    prop_assert_eq!(occupied, sim.vehicle_count());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn cells_never_shared(seed in any::<u64>(), topology in arb_topology(), boundary in arb_boundary()) {
        let mut sim = Simulation::with_params(topology, boundary, busy_params(), Some(seed)).unwrap();
        for _ in 0..60 {
            sim.step().unwrap();
            assert_unique_cells(&sim)?;
        }
    }

    #[test]
    fn toroid_conserves_vehicles(seed in any::<u64>(), length in 8usize..40) {
        let mut params = SimParams::default();
        params.breakdown_prob = 0.0;
        params.lane_change_prob = 0.5;
        let mut sim = Simulation::with_params(Topology::two_way(length), BoundaryMode::Toroid, params, Some(seed)).unwrap();
        let count = sim.vehicle_count();
        for _ in 0..80 {
            sim.step().unwrap();
            prop_assert_eq!(sim.vehicle_count(), count);
        }
    }

    #[test]
    fn toroid_crossroads_never_gains(seed in any::<u64>()) {
        let mut sim = Simulation::with_params(Topology::crossroads(30, 30), BoundaryMode::Toroid, busy_params(), Some(seed)).unwrap();
        let mut count = sim.vehicle_count();
        for _ in 0..60 {
            sim.step().unwrap();
            prop_assert!(sim.vehicle_count() <= count);
            count = sim.vehicle_count();
        }
    }

    #[test]
    fn repair_countdown_ticks_down(seed in any::<u64>(), boundary in arb_boundary()) {
        let mut sim = Simulation::with_params(Topology::crossroads(30, 30), boundary, busy_params(), Some(seed)).unwrap();
        for _ in 0..60 {
            let before: HashMap<_, _> = sim.snapshot().vehicles.into_iter().map(|v| (v.id, v)).collect();
            sim.step().unwrap();
            for after in sim.snapshot().vehicles {
                let Some(prev) = before.get(&after.id) else { continue };
                if prev.status == VehicleStatus::Broken && after.status == VehicleStatus::Broken {
                    prop_assert_eq!(after.repair_countdown + 1, prev.repair_countdown);
                    prop_assert_eq!(after.cell(), prev.cell());
                }
            }
        }
    }

    #[test]
    fn caps_hold_after_every_step(seed in any::<u64>(), boundary in arb_boundary()) {
        let mut sim = Simulation::with_params(Topology::crossroads(30, 30), boundary, busy_params(), Some(seed)).unwrap();
        for _ in 0..60 {
            sim.step().unwrap();
            for (road, spec) in sim.topology().roads.iter().enumerate() {
                if let Some(cap) = spec.max_vehicles {
                    prop_assert!(sim.road_population(RoadId(road)) <= cap);
                }
            }
        }
    }
}
