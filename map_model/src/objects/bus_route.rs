use anyhow::Result;
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;

/// A routeable stretch of one public transport line. Stops attach to street segments through
/// an offset along the closest street.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusRoute {
    pub bus_route_id: u32,
    /// Fraction along the closest street segment, out of 65536, measured from its node 0
    pub offset_in_closest_street: u16,
}

impl BusRoute {
    pub fn offset_fraction(&self) -> f64 {
        f64::from(self.offset_in_closest_street) / 65536.0
    }

    pub(crate) fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.bus_route_id);
        buf.write_u16(self.offset_in_closest_street);
        buf.write_u16(0);
    }

    pub(crate) fn load(buf: &mut DataBuffer) -> Result<BusRoute> {
        let bus_route_id = buf.read_u32()?;
        let offset_in_closest_street = buf.read_u16()?;
        buf.read_u16()?;
        Ok(BusRoute {
            bus_route_id,
            offset_in_closest_street,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_offset() {
        let b = BusRoute {
            bus_route_id: 3,
            offset_in_closest_street: 32768,
        };
        assert_eq!(b.offset_fraction(), 0.5);
    }
}
