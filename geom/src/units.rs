use std::{cmp, fmt, iter, ops};

use serde::{Deserialize, Serialize};

/// A distance, in meters. Can be negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Distance(f64);

// By construction, Distance is a finite f64.
impl Eq for Distance {}

#[allow(clippy::derive_ord_xor_partial_ord)] // false positive
impl Ord for Distance {
    fn cmp(&self, other: &Distance) -> cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Distance {
    pub const ZERO: Distance = Distance::const_meters(0.0);

    pub fn meters(value: f64) -> Distance {
        if !value.is_finite() {
            panic!("Bad Distance {}", value);
        }
        Distance(value)
    }

    // TODO Can't panic inside a const fn, seemingly. Don't pass in anything bad!
    pub const fn const_meters(value: f64) -> Distance {
        Distance(value)
    }

    pub fn inner_meters(self) -> f64 {
        self.0
    }

    pub fn abs(self) -> Distance {
        Distance(self.0.abs())
    }

    pub fn min(self, other: Distance) -> Distance {
        if self <= other {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Distance) -> Distance {
        if self >= other {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.1}m", self.0)
    }
}

impl ops::Add for Distance {
    type Output = Distance;

    fn add(self, other: Distance) -> Distance {
        Distance::meters(self.0 + other.0)
    }
}

impl ops::AddAssign for Distance {
    fn add_assign(&mut self, other: Distance) {
        *self = *self + other;
    }
}

impl ops::Sub for Distance {
    type Output = Distance;

    fn sub(self, other: Distance) -> Distance {
        Distance::meters(self.0 - other.0)
    }
}

impl ops::Mul<f64> for Distance {
    type Output = Distance;

    fn mul(self, scalar: f64) -> Distance {
        Distance::meters(self.0 * scalar)
    }
}

impl ops::Div<Speed> for Distance {
    type Output = Duration;

    fn div(self, speed: Speed) -> Duration {
        if speed.0 <= 0.0 {
            panic!("Can't divide {} by non-positive speed {:?}", self, speed);
        }
        Duration::seconds(self.0 / speed.0)
    }
}

impl iter::Sum for Distance {
    fn sum<I: Iterator<Item = Distance>>(iter: I) -> Distance {
        iter.fold(Distance::ZERO, |a, b| a + b)
    }
}

/// A duration, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Duration(f64);

impl Eq for Duration {}

#[allow(clippy::derive_ord_xor_partial_ord)] // false positive
impl Ord for Duration {
    fn cmp(&self, other: &Duration) -> cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Duration {
    pub const ZERO: Duration = Duration::const_seconds(0.0);

    pub fn seconds(value: f64) -> Duration {
        if !value.is_finite() {
            panic!("Bad Duration {}", value);
        }
        Duration(value)
    }

    pub const fn const_seconds(value: f64) -> Duration {
        Duration(value)
    }

    pub fn minutes(value: usize) -> Duration {
        Duration::seconds(60.0 * value as f64)
    }

    pub fn inner_seconds(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.1}s", self.0)
    }
}

impl ops::Add for Duration {
    type Output = Duration;

    fn add(self, other: Duration) -> Duration {
        Duration::seconds(self.0 + other.0)
    }
}

impl ops::AddAssign for Duration {
    fn add_assign(&mut self, other: Duration) {
        *self = *self + other;
    }
}

impl ops::Mul<f64> for Duration {
    type Output = Duration;

    fn mul(self, scalar: f64) -> Duration {
        Duration::seconds(self.0 * scalar)
    }
}

impl iter::Sum for Duration {
    fn sum<I: Iterator<Item = Duration>>(iter: I) -> Duration {
        iter.fold(Duration::ZERO, |a, b| a + b)
    }
}

/// In meters per second.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Speed(f64);

impl Speed {
    pub fn meters_per_second(value: f64) -> Speed {
        if !value.is_finite() {
            panic!("Bad Speed {}", value);
        }
        Speed(value)
    }

    pub fn km_per_hour(value: f64) -> Speed {
        Speed::meters_per_second(value / 3.6)
    }

    pub fn inner_meters_per_second(self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_time() {
        let t = Distance::meters(100.0) / Speed::km_per_hour(36.0);
        assert!((t.inner_seconds() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn sums() {
        let total: Distance = vec![Distance::meters(1.5), Distance::meters(2.5)]
            .into_iter()
            .sum();
        assert_eq!(total, Distance::meters(4.0));
        let time: Duration = vec![Duration::seconds(3.0), Duration::minutes(1)]
            .into_iter()
            .sum();
        assert_eq!(time, Duration::seconds(63.0));
    }
}
