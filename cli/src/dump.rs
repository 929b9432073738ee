use anyhow::{bail, Result};
use serde::Serialize;

use geom::GfxData;
use map_model::{GenericMap, Item, ItemID};

#[derive(Serialize)]
struct ItemDump<'a> {
    id: u32,
    description: String,
    names: Vec<&'a str>,
    item: &'a Item,
    gfx: Option<&'a GfxData>,
    admin_centroid: Option<geom::Coord>,
}

pub fn item(path: String, id: ItemID, output: Option<String>) -> Result<()> {
    let map = GenericMap::load(&path)?;
    let item = match map.item(id) {
        Some(item) => item,
        None => bail!("{} has no {}", path, id),
    };
    let dump = ItemDump {
        id: id.0,
        description: format!("{} ({})", id, item.item_type()),
        names: map.item_names(id),
        item,
        gfx: map.gfx_of(id),
        admin_centroid: map.aux_tables().admin_centroids.get(id).copied(),
    };
    match output {
        Some(output) => abstutil::write_json(&output, &dump),
        None => {
            println!("{}", abstutil::to_json(&dump)?);
            Ok(())
        }
    }
}
