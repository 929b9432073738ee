//! A multi-tool for binary map files: inspect them, run spatial queries, and rewrite them.

#[macro_use]
extern crate log;

mod dump;

use anyhow::{bail, Result};
use enumset::EnumSet;
use structopt::StructOpt;

use abstutil::{prettyprint_bytes, Timer};
use geom::{Coord, METER_TO_MC2SCALE};
use map_model::{GenericMap, ItemID, ItemType, MapRights, NationalProperties};

#[derive(StructOpt)]
#[structopt(name = "mapcli", about = "Inspect and maintain binary map files")]
enum Command {
    /// Print counts per zoom level and item kind, and memory use
    Info {
        #[structopt()]
        path: String,
    },
    /// Print one item as JSON
    DumpItem {
        #[structopt()]
        path: String,
        /// The item ID as a raw number, like 134217731
        #[structopt(long)]
        id: u32,
        /// Write the JSON here instead of STDOUT
        #[structopt(long)]
        output: Option<String>,
    },
    /// List the items within some distance of a point
    Radius {
        #[structopt()]
        path: String,
        /// Latitude in degrees
        #[structopt(long)]
        lat: f64,
        /// Longitude in degrees
        #[structopt(long)]
        lon: f64,
        #[structopt(long, default_value = "100")]
        meters: f64,
        /// Only these kinds, like `StreetSegment,PointOfInterest`. Everything by default.
        #[structopt(long)]
        kinds: Option<String>,
        /// Only items visible to this rights mask
        #[structopt(long)]
        rights: Option<u32>,
    },
    /// Find the item closest to a point
    Closest {
        #[structopt()]
        path: String,
        #[structopt(long)]
        lat: f64,
        #[structopt(long)]
        lon: f64,
        #[structopt(long)]
        kinds: Option<String>,
    },
    /// Derive admin area centroids again and save the map in place
    RecomputeCentroids {
        #[structopt()]
        path: String,
        /// Only overwrite centroids that moved, instead of starting over
        #[structopt(long)]
        update: bool,
        /// A JSON file overriding the default national properties
        #[structopt(long)]
        national_properties: Option<String>,
    },
    /// Load a map and write it again, optionally in an older format version
    Resave {
        #[structopt()]
        input: String,
        #[structopt(long)]
        output: String,
        #[structopt(long)]
        version: Option<u8>,
    },
}

fn main() -> Result<()> {
    let cmd = Command::from_args();
    // JSON output should stay clean
    if !matches!(cmd, Command::DumpItem { .. }) {
        abstutil::logger::setup();
    }

    match cmd {
        Command::Info { path } => info(path)?,
        Command::DumpItem { path, id, output } => dump::item(path, ItemID(id), output)?,
        Command::Radius {
            path,
            lat,
            lon,
            meters,
            kinds,
            rights,
        } => radius(path, Coord::from_degrees(lat, lon), meters, kinds, rights)?,
        Command::Closest {
            path,
            lat,
            lon,
            kinds,
        } => closest(path, Coord::from_degrees(lat, lon), kinds)?,
        Command::RecomputeCentroids {
            path,
            update,
            national_properties,
        } => recompute_centroids(path, update, national_properties)?,
        Command::Resave {
            input,
            output,
            version,
        } => {
            let map = GenericMap::load(&input)?;
            map.save_version(&output, version.unwrap_or(map_model::CURRENT_VERSION))?;
        }
    }
    Ok(())
}

fn info(path: String) -> Result<()> {
    let map = GenericMap::load(&path)?;
    for line in map.describe() {
        println!("{}", line);
    }
    println!("Memory use: {}", prettyprint_bytes(map.memory_usage()));
    Ok(())
}

/// Parses a comma-separated list of kind names, ignoring case.
fn parse_kinds(kinds: Option<String>) -> Result<EnumSet<ItemType>> {
    let raw = match kinds {
        Some(raw) => raw,
        None => return Ok(EnumSet::all()),
    };
    let mut set = EnumSet::new();
    for name in raw.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        match ItemType::all().find(|t| t.to_string().eq_ignore_ascii_case(name)) {
            Some(t) => {
                set.insert(t);
            }
            None => bail!("Unknown item kind {}", name),
        }
    }
    Ok(set)
}

fn radius(
    path: String,
    center: Coord,
    meters: f64,
    kinds: Option<String>,
    rights: Option<u32>,
) -> Result<()> {
    let kinds = parse_kinds(kinds)?;
    let map = GenericMap::load(&path)?;
    let radius = (meters * METER_TO_MC2SCALE).round() as i32;
    let found = map.items_within_radius(center, radius, kinds, rights.map(MapRights));
    info!("{} items within {}m", found.len(), meters);
    for id in found {
        println!(
            "{}\t{}\t{}",
            id.0,
            map.item_type(id).map(|t| t.to_string()).unwrap_or_default(),
            map.best_name(id).unwrap_or("")
        );
    }
    Ok(())
}

fn closest(path: String, pt: Coord, kinds: Option<String>) -> Result<()> {
    let kinds = parse_kinds(kinds)?;
    let map = GenericMap::load(&path)?;
    match map.closest_item(pt, kinds, None) {
        Some((id, sq_dist)) => println!(
            "{} ({}), {} away",
            id,
            map.best_name(id).unwrap_or("unnamed"),
            geom::meters_from_squared_mc2(sq_dist)
        ),
        None => println!("Nothing found"),
    }
    Ok(())
}

fn recompute_centroids(path: String, update: bool, national: Option<String>) -> Result<()> {
    let mut map = GenericMap::load(&path)?;
    if let Some(national) = national {
        map.set_national_properties(NationalProperties::load(&national)?);
    }
    let mut timer = Timer::new("recompute admin area centroids");
    let n = if update {
        map.update_centre_coordinates_for_admin_areas(&mut timer)
    } else {
        map.create_centre_coordinates_for_admin_areas(&mut timer)
    };
    map.recompute_native_languages();
    println!("{} centroids changed", n);
    map.save(&path)
}
