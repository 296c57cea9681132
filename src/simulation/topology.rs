//! Road layout of a simulation run
//!
//! One parameterized description covers every layout the engine runs: a
//! single lane, a two-lane road, two opposing two-lane roads and the
//! four-road crossroads with its turn table.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;

use super::error::{SimError, SimResult};
use super::types::{Direction, LaneId, RoadId};

/// How a lane is populated when the simulation is built or reset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LaneFill {
    Empty,
    /// Exactly this many vehicles, evenly spaced, kept off the intersection
    Count(usize),
    /// Each cell independently occupied with this probability
    Density(f64),
    /// Explicit occupancy, one entry per cell
    Cells(Vec<bool>),
}

/// A one-way road made of parallel lanes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSpec {
    pub name: String,
    pub direction: Direction,
    pub length: usize,
    /// One entry per lane
    pub lanes: Vec<LaneFill>,
    /// Population cap across all lanes of the road
    pub max_vehicles: Option<usize>,
}

impl RoadSpec {
    pub fn new(name: impl Into<String>, direction: Direction, length: usize, lanes: Vec<LaneFill>) -> Self {
        Self {
            name: name.into(),
            direction,
            length,
            lanes,
            max_vehicles: None,
        }
    }

    pub fn with_max_vehicles(mut self, max_vehicles: usize) -> Self {
        self.max_vehicles = Some(max_vehicles);
        self
    }

    /// Cell where boundary insertion happens
    pub fn entry_index(&self) -> usize {
        if self.direction.is_forward() {
            0
        } else {
            self.length.saturating_sub(1)
        }
    }

    /// Population limit, the cell count when no cap is configured
    pub fn capacity(&self) -> usize {
        self.max_vehicles
            .unwrap_or(self.length * self.lanes.len())
    }
}

/// One entry of the turn table: vehicles on `from` may turn onto `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRule {
    pub from_road: RoadId,
    pub from_lane: LaneId,
    pub to_road: RoadId,
    pub to_lane: LaneId,
}

impl TurnRule {
    pub fn new(from: (usize, usize), to: (usize, usize)) -> Self {
        Self {
            from_road: RoadId(from.0),
            from_lane: LaneId(from.1),
            to_road: RoadId(to.0),
            to_lane: LaneId(to.1),
        }
    }
}

/// The shared crossing of several roads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionSpec {
    /// Footprint of the crossing in display units
    pub size: usize,
    /// Size of one cell in display units
    pub cell_size: usize,
    /// Roads that pass through the crossing; each is centred at `length / 2`
    pub roads: Vec<RoadId>,
    pub turns: Vec<TurnRule>,
}

impl IntersectionSpec {
    /// Cells either side of the centre where turns are considered
    pub fn detection_range(&self) -> usize {
        self.size / self.cell_size.max(1) / 2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub roads: Vec<RoadSpec>,
    pub intersection: Option<IntersectionSpec>,
}

impl Topology {
    /// One lane travelling left to right
    pub fn single_lane(length: usize, fill: LaneFill) -> Self {
        Self {
            roads: vec![RoadSpec::new("lane", Direction::LeftToRight, length, vec![fill])],
            intersection: None,
        }
    }

    /// Two parallel lanes travelling left to right
    pub fn double_lane(length: usize) -> Self {
        Self {
            roads: vec![RoadSpec::new(
                "road",
                Direction::LeftToRight,
                length,
                vec![LaneFill::Density(0.3), LaneFill::Density(0.3)],
            )],
            intersection: None,
        }
    }

    /// Two opposing roads of two lanes each
    pub fn two_way(length: usize) -> Self {
        Self {
            roads: vec![
                RoadSpec::new(
                    "westbound",
                    Direction::RightToLeft,
                    length,
                    vec![LaneFill::Density(0.25), LaneFill::Density(0.25)],
                ),
                RoadSpec::new(
                    "eastbound",
                    Direction::LeftToRight,
                    length,
                    vec![LaneFill::Density(0.25), LaneFill::Density(0.25)],
                ),
            ],
            intersection: None,
        }
    }

    /// Four two-lane roads crossing at their midpoints.
    ///
    /// Road 0 runs east to west, road 1 west to east, road 2 north to south
    /// and road 3 south to north. Each road turns from one lane into a
    /// distinct lane of the next road.
    pub fn crossroads(horizontal: usize, vertical: usize) -> Self {
        let road = |name: &str, direction, length| {
            RoadSpec::new(name, direction, length, vec![LaneFill::Count(8), LaneFill::Count(7)])
                .with_max_vehicles(15)
        };
        Self {
            roads: vec![
                road("east-west", Direction::RightToLeft, horizontal),
                road("west-east", Direction::LeftToRight, horizontal),
                road("north-south", Direction::TopToBottom, vertical),
                road("south-north", Direction::BottomToTop, vertical),
            ],
            intersection: Some(IntersectionSpec {
                size: 90,
                cell_size: 20,
                roads: (0..4).map(RoadId).collect(),
                turns: vec![
                    TurnRule::new((0, 0), (3, 1)),
                    TurnRule::new((1, 1), (2, 0)),
                    TurnRule::new((2, 0), (0, 0)),
                    TurnRule::new((3, 1), (1, 1)),
                ],
            }),
        }
    }

    pub fn road(&self, road: RoadId) -> Option<&RoadSpec> {
        self.roads.get(road.0)
    }

    pub fn has_lane(&self, road: RoadId, lane: LaneId) -> bool {
        self.road(road).is_some_and(|r| lane.0 < r.lanes.len())
    }

    pub fn total_cells(&self) -> usize {
        self.roads.iter().map(|r| r.length * r.lanes.len()).sum()
    }

    /// Cells kept clear when placing `Count` vehicles
    pub fn footprint(&self, road: RoadId) -> Option<RangeInclusive<usize>> {
        let intersection = self.intersection.as_ref()?;
        if !intersection.roads.contains(&road) {
            return None;
        }
        let center = self.road(road)?.length / 2;
        Some(center.saturating_sub(1)..=center + 1)
    }

    /// Reject layouts the engine cannot run
    pub fn validate(&self) -> SimResult<()> {
        if self.roads.is_empty() {
            return Err(invalid("topology has no roads"));
        }
        for (index, road) in self.roads.iter().enumerate() {
            if road.length == 0 {
                return Err(invalid(format!("road {} ('{}') has length 0", index, road.name)));
            }
            if road.lanes.is_empty() {
                return Err(invalid(format!("road {} ('{}') has no lanes", index, road.name)));
            }
            if road.max_vehicles == Some(0) {
                return Err(invalid(format!("road {} ('{}') caps its population at 0", index, road.name)));
            }
            for (lane, fill) in road.lanes.iter().enumerate() {
                match fill {
                    LaneFill::Empty => {}
                    LaneFill::Count(n) if *n > road.length => {
                        return Err(invalid(format!(
                            "road {} lane {} asks for {} vehicles in {} cells",
                            index, lane, n, road.length
                        )));
                    }
                    LaneFill::Count(_) => {}
                    LaneFill::Density(p) if !(p.is_finite() && (0.0..=1.0).contains(p)) => {
                        return Err(invalid(format!("road {} lane {} has density {}", index, lane, p)));
                    }
                    LaneFill::Density(_) => {}
                    LaneFill::Cells(cells) if cells.len() != road.length => {
                        return Err(invalid(format!(
                            "road {} lane {} lists {} cells for a lane of length {}",
                            index,
                            lane,
                            cells.len(),
                            road.length
                        )));
                    }
                    LaneFill::Cells(_) => {}
                }
            }
        }
        if let Some(intersection) = &self.intersection {
            self.validate_intersection(intersection)?;
        }
        Ok(())
    }

    fn validate_intersection(&self, intersection: &IntersectionSpec) -> SimResult<()> {
        if intersection.cell_size == 0 {
            return Err(invalid("intersection cell size is 0"));
        }
        for road in &intersection.roads {
            if self.road(*road).is_none() {
                return Err(invalid(format!("intersection references unknown road {}", road.0)));
            }
        }
        let mut sources = HashSet::new();
        for turn in &intersection.turns {
            for (road, lane) in [(turn.from_road, turn.from_lane), (turn.to_road, turn.to_lane)] {
                if self.road(road).is_none() {
                    return Err(invalid(format!("turn table references unknown road {}", road.0)));
                }
                if !self.has_lane(road, lane) {
                    return Err(invalid(format!(
                        "turn table references unknown lane {} of road {}",
                        lane.0, road.0
                    )));
                }
                if !intersection.roads.contains(&road) {
                    return Err(invalid(format!(
                        "turn table uses road {} which does not pass through the intersection",
                        road.0
                    )));
                }
            }
            if turn.from_road == turn.to_road {
                return Err(invalid(format!("turn from road {} back onto itself", turn.from_road.0)));
            }
            if !sources.insert((turn.from_road, turn.from_lane)) {
                return Err(invalid(format!(
                    "lane {} of road {} has more than one turn target",
                    turn.from_lane.0, turn.from_road.0
                )));
            }
        }
        Ok(())
    }
}

/// Initial vehicle positions for one lane
pub fn initial_positions(
    fill: &LaneFill,
    length: usize,
    reserved: Option<&RangeInclusive<usize>>,
    rng: &mut impl Rng,
) -> Vec<usize> {
    match fill {
        LaneFill::Empty => Vec::new(),
        LaneFill::Cells(cells) => cells
            .iter()
            .enumerate()
            .filter_map(|(i, occupied)| occupied.then_some(i))
            .collect(),
        LaneFill::Density(p) => (0..length).filter(|_| rng.random_bool(*p)).collect(),
        LaneFill::Count(count) => evenly_spaced(*count, length, reserved),
    }
}

fn evenly_spaced(count: usize, length: usize, reserved: Option<&RangeInclusive<usize>>) -> Vec<usize> {
    let count = count.min(length);
    let spacing = if count > 1 { (length / count).max(1) } else { 1 };
    let allowed = |i: &usize| reserved.map_or(true, |r| !r.contains(i));

    let mut positions: Vec<usize> = (0..length)
        .step_by(spacing)
        .filter(allowed)
        .take(count)
        .collect();

    // Top up from the remaining free cells when the grid skipped too many
    if positions.len() < count {
        let extra: Vec<usize> = (0..length)
            .filter(allowed)
            .filter(|i| !positions.contains(i))
            .take(count - positions.len())
            .collect();
        positions.extend(extra);
        positions.sort_unstable();
    }
    positions
}

fn invalid(message: impl Into<String>) -> SimError {
    SimError::InvalidTopology(message.into())
}
