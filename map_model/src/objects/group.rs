use anyhow::Result;
use serde::{Deserialize, Serialize};

use abstutil::DataBuffer;

use crate::ItemID;

/// The street segments sharing one street name. Members point back here through their group
/// list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Street {
    pub members: Vec<ItemID>,
}

/// A search category, like "restaurants", grouping POIs and other items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: u16,
    pub members: Vec<ItemID>,
}

fn save_members(members: &[ItemID], buf: &mut DataBuffer) {
    buf.write_u32(members.len() as u32);
    for id in members {
        buf.write_u32(id.0);
    }
}

fn load_members(buf: &mut DataBuffer) -> Result<Vec<ItemID>> {
    let n = buf.read_u32()? as usize;
    // The presize is capped by what the buffer could still hold
    let mut members = Vec::with_capacity(n.min(buf.remaining() / 4));
    for _ in 0..n {
        members.push(ItemID(buf.read_u32()?));
    }
    Ok(members)
}

impl Street {
    pub(crate) fn save(&self, buf: &mut DataBuffer) {
        save_members(&self.members, buf);
    }

    pub(crate) fn load(buf: &mut DataBuffer) -> Result<Street> {
        Ok(Street {
            members: load_members(buf)?,
        })
    }

    pub fn memory_usage(&self) -> usize {
        self.members.capacity() * std::mem::size_of::<ItemID>()
    }
}

impl Category {
    pub(crate) fn save(&self, buf: &mut DataBuffer) {
        buf.write_u16(self.category_id);
        buf.write_u16(0);
        save_members(&self.members, buf);
    }

    pub(crate) fn load(buf: &mut DataBuffer) -> Result<Category> {
        let category_id = buf.read_u16()?;
        buf.read_u16()?;
        Ok(Category {
            category_id,
            members: load_members(buf)?,
        })
    }

    pub fn memory_usage(&self) -> usize {
        self.members.capacity() * std::mem::size_of::<ItemID>()
    }
}
