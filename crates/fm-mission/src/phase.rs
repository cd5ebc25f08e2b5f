//! Mission phases and their index ranges.

use fm_powertrain::OperatingMode;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    TaxiOut,
    Climb,
    Cruise,
    Descent,
    Reserve,
    TaxiIn,
}

impl Phase {
    pub const FLIGHT: [Phase; 4] = [Phase::Climb, Phase::Cruise, Phase::Descent, Phase::Reserve];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::TaxiOut => "taxi_out",
            Phase::Climb => "climb",
            Phase::Cruise => "cruise",
            Phase::Descent => "descent",
            Phase::Reserve => "reserve",
            Phase::TaxiIn => "taxi_in",
        }
    }

    pub fn operating_mode(&self) -> OperatingMode {
        match self {
            Phase::TaxiOut | Phase::TaxiIn => OperatingMode::Taxi,
            Phase::Climb => OperatingMode::Climb,
            Phase::Cruise => OperatingMode::Cruise,
            Phase::Descent => OperatingMode::Descent,
            Phase::Reserve => OperatingMode::Reserve,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of mission points per flight phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointCounts {
    pub climb: usize,
    pub cruise: usize,
    pub descent: usize,
    pub reserve: usize,
}

impl Default for PointCounts {
    fn default() -> Self {
        Self {
            climb: 100,
            cruise: 100,
            descent: 50,
            reserve: 1,
        }
    }
}

impl PointCounts {
    pub fn total(&self) -> usize {
        self.climb + self.cruise + self.descent + self.reserve
    }

    pub fn count(&self, phase: Phase) -> usize {
        match phase {
            Phase::Climb => self.climb,
            Phase::Cruise => self.cruise,
            Phase::Descent => self.descent,
            Phase::Reserve => self.reserve,
            Phase::TaxiOut | Phase::TaxiIn => 0,
        }
    }

    /// Index range of a flight phase in the mission point sequence.
    pub fn range(&self, phase: Phase) -> Range<usize> {
        let mut start = 0;
        for p in Phase::FLIGHT {
            let n = self.count(p);
            if p == phase {
                return start..start + n;
            }
            start += n;
        }
        0..0
    }

    /// Phase tag of every mission point.
    pub fn tags(&self) -> Vec<Phase> {
        Phase::FLIGHT
            .iter()
            .flat_map(|&p| std::iter::repeat_n(p, self.count(p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_tile_the_sequence() {
        let c = PointCounts {
            climb: 3,
            cruise: 4,
            descent: 2,
            reserve: 0,
        };
        assert_eq!(c.range(Phase::Climb), 0..3);
        assert_eq!(c.range(Phase::Cruise), 3..7);
        assert_eq!(c.range(Phase::Descent), 7..9);
        assert!(c.range(Phase::Reserve).is_empty());
        assert_eq!(c.tags().len(), c.total());
        assert_eq!(c.tags()[3], Phase::Cruise);
    }

    #[test]
    fn defaults() {
        let c = PointCounts::default();
        assert_eq!((c.climb, c.cruise, c.descent, c.reserve), (100, 100, 50, 1));
        assert_eq!(Phase::Reserve.to_string(), "reserve");
    }
}
