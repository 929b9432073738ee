use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use geom::{Duration, Speed};

use crate::routing::TurnDirection;

/// Per-country switches consulted while deriving centroids and routing costs. Every field has
/// a default, so a JSON file only has to name what differs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NationalProperties {
    /// Match city centres against admin areas nested in index areas, not just direct members
    pub use_index_areas_for_centroids: bool,
    /// Road classes up to and including this one count as major
    pub major_road_class_limit: u8,
    /// Time factor per road class, indexed by class. Classes past the end use the last entry.
    pub road_class_penalty: Vec<f64>,
    pub ramp_penalty: f64,
    /// Speeds at or below this (km/h) get `slow_road_penalty`
    pub slow_road_limit: u8,
    pub slow_road_penalty: f64,
    /// Used when a node has no speed limit (km/h)
    pub default_speed_limit: u8,
    pub standstill: StandstillTimes,
}

/// Seconds lost at a turn, waiting or slowing down.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandstillTimes {
    pub left_major: f64,
    pub left_minor: f64,
    pub u_turn_major: f64,
    pub u_turn_minor: f64,
    pub right_major: f64,
    pub right_minor: f64,
    pub enter_roundabout: f64,
    pub enter_ferry: f64,
    pub exit_ferry: f64,
    pub change_ferry: f64,
}

impl Default for StandstillTimes {
    fn default() -> StandstillTimes {
        StandstillTimes {
            left_major: 8.0,
            left_minor: 5.0,
            u_turn_major: 20.0,
            u_turn_minor: 10.0,
            right_major: 4.0,
            right_minor: 2.0,
            enter_roundabout: 3.0,
            enter_ferry: 900.0,
            exit_ferry: 60.0,
            change_ferry: 600.0,
        }
    }
}

impl Default for NationalProperties {
    fn default() -> NationalProperties {
        NationalProperties {
            use_index_areas_for_centroids: false,
            major_road_class_limit: 2,
            road_class_penalty: vec![1.0, 1.0, 1.05, 1.1, 1.2],
            ramp_penalty: 1.1,
            slow_road_limit: 30,
            slow_road_penalty: 1.15,
            default_speed_limit: 50,
            standstill: StandstillTimes::default(),
        }
    }
}

impl NationalProperties {
    pub fn load(path: &str) -> Result<NationalProperties> {
        abstutil::read_json(path).with_context(|| format!("national properties in {}", path))
    }

    pub fn is_major(&self, road_class: u8) -> bool {
        road_class <= self.major_road_class_limit
    }

    pub fn time_penalty(&self, road_class: u8, ramp: bool, speed_limit: u8) -> f64 {
        let mut factor = self
            .road_class_penalty
            .get(road_class as usize)
            .or_else(|| self.road_class_penalty.last())
            .copied()
            .unwrap_or(1.0);
        if ramp {
            factor *= self.ramp_penalty;
        }
        if speed_limit <= self.slow_road_limit {
            factor *= self.slow_road_penalty;
        }
        factor
    }

    /// Nodes without a speed limit get the default one.
    pub fn effective_speed_limit(&self, speed_limit: u8) -> u8 {
        if speed_limit == 0 {
            self.default_speed_limit.max(1)
        } else {
            speed_limit
        }
    }

    pub fn speed(&self, speed_limit: u8) -> Speed {
        Speed::km_per_hour(f64::from(self.effective_speed_limit(speed_limit)))
    }

    /// Left and U-turns are major if either end is; right turns only if both are.
    pub fn standstill_time(&self, turn: TurnDirection, from_class: u8, to_class: u8) -> Duration {
        let from_major = self.is_major(from_class);
        let to_major = self.is_major(to_class);
        let t = &self.standstill;
        let secs = match turn {
            TurnDirection::Left if from_major || to_major => t.left_major,
            TurnDirection::Left => t.left_minor,
            TurnDirection::UTurn if from_major || to_major => t.u_turn_major,
            TurnDirection::UTurn => t.u_turn_minor,
            TurnDirection::Right if from_major && to_major => t.right_major,
            TurnDirection::Right => t.right_minor,
            TurnDirection::EnterRoundabout => t.enter_roundabout,
            TurnDirection::EnterFerry => t.enter_ferry,
            TurnDirection::ExitFerry => t.exit_ferry,
            TurnDirection::ChangeFerry => t.change_ferry,
            TurnDirection::Undefined
            | TurnDirection::Ahead
            | TurnDirection::FollowRoad
            | TurnDirection::ExitRoundabout
            | TurnDirection::AheadInRoundabout
            | TurnDirection::OnRamp
            | TurnDirection::OffRamp
            | TurnDirection::EnterBus
            | TurnDirection::ExitBus
            | TurnDirection::ChangeBus
            | TurnDirection::KeepLeft
            | TurnDirection::KeepRight => 0.0,
        };
        Duration::seconds(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standstill_table() {
        let np = NationalProperties::default();
        let secs = |turn, a, b| np.standstill_time(turn, a, b).inner_seconds();
        assert_eq!(secs(TurnDirection::Left, 1, 4), 8.0);
        assert_eq!(secs(TurnDirection::Left, 4, 4), 5.0);
        assert_eq!(secs(TurnDirection::UTurn, 4, 0), 20.0);
        assert_eq!(secs(TurnDirection::Right, 1, 4), 2.0);
        assert_eq!(secs(TurnDirection::Right, 1, 2), 4.0);
        assert_eq!(secs(TurnDirection::EnterFerry, 4, 4), 900.0);
        assert_eq!(secs(TurnDirection::Ahead, 0, 0), 0.0);
    }

    #[test]
    fn penalties() {
        let np = NationalProperties::default();
        assert_eq!(np.time_penalty(0, false, 110), 1.0);
        assert!((np.time_penalty(3, true, 30) - 1.1 * 1.1 * 1.15).abs() < 1e-9);
        assert_eq!(np.time_penalty(9, false, 50), 1.2);
    }

    #[test]
    fn partial_json() {
        let np: NationalProperties =
            serde_json::from_str(r#"{"use_index_areas_for_centroids": true}"#).unwrap();
        assert!(np.use_index_areas_for_centroids);
        assert_eq!(np.major_road_class_limit, 2);
        assert_eq!(np.standstill.enter_roundabout, 3.0);
    }
}
