//! The binary map format: magic and header, a 4-byte body size, then the body. Bodies up to
//! version 5 are a fixed run of sections. Later ones frame every section with its byte
//! length, and a reader stops at the first section it doesn't have data for and skips any it
//! doesn't know.

use anyhow::{bail, Context, Result};

use abstutil::{prettyprint_usize, DataBuffer, Timer};
use geom::GfxData;

use super::{GenericMap, ItemRef, MapState};
use crate::aux_tables::AuxTable;
use crate::header::{MapHeader, CURRENT_VERSION, LAST_LEGACY_VERSION, OLDEST_SUPPORTED_VERSION};
use crate::names::ItemNames;
use crate::objects::{Item, ItemKind, ItemType, NBR_ITEM_TYPES};
use crate::routing::{BoundarySegments, LandmarkTable, Node, NodeExpansionTable};
use crate::{ItemID, MAX_SLOTS_PER_ZOOM, NUMBER_GFX_ZOOMLEVELS};

/// Item payload lengths share their header word with the kind tag.
const MAX_ITEM_LENGTH: usize = 0x00FF_FFFF;

impl GenericMap {
    pub fn load(path: &str) -> Result<GenericMap> {
        let mut timer = Timer::new(format!("load {}", path));
        timer.start("read file");
        let bytes = fs_err::read(path)?;
        timer.stop("read file");
        GenericMap::load_from_bytes(bytes, &mut timer).with_context(|| format!("loading {}", path))
    }

    pub fn load_from_bytes(bytes: Vec<u8>, timer: &mut Timer) -> Result<GenericMap> {
        let mut buf = DataBuffer::from_bytes(bytes);
        let header = MapHeader::load(&mut buf)?;
        let mut map = GenericMap::empty(header);
        map.create_allocators();
        map.internal_load(&mut buf, timer)?;
        Ok(map)
    }

    fn internal_load(&mut self, buf: &mut DataBuffer, timer: &mut Timer) -> Result<()> {
        let body_size = buf.read_u32()? as usize;
        let end = buf.position() + body_size;
        if end > buf.len() {
            bail!(
                "Body claims {} bytes, but only {} remain",
                body_size,
                buf.remaining()
            );
        }
        let version = self.header.version;
        info!(
            "Loading map {} (format version {}, {} byte body)",
            self.header.map_id,
            version,
            prettyprint_usize(body_size)
        );

        if version <= LAST_LEGACY_VERSION {
            self.load_static_block(buf, timer)?;
            self.aux.user_rights.load(buf)?;
            self.aux.admin_centroids.load(buf)?;
        } else {
            let static_end = read_frame(buf, end)?;
            self.load_static_block(buf, timer)?;
            buf.seek(static_end)?;
            for table in self.aux.tables_mut() {
                if buf.position() >= end {
                    debug!("Body ends before the {} table", table.name());
                    break;
                }
                let section_end = read_frame(buf, end)?;
                table
                    .load(buf)
                    .with_context(|| format!("loading the {} table", table.name()))?;
                if buf.position() > section_end {
                    bail!("The {} table overran its section", table.name());
                }
                buf.seek(section_end)?;
            }
            if buf.position() < end {
                info!(
                    "Skipping {} bytes of sections this version doesn't know",
                    prettyprint_usize(end - buf.position())
                );
            }
        }
        buf.seek(end)?;

        self.strip_dangling_groups(timer);
        self.build_hash_table(timer);
        self.state = MapState::Loaded;
        Ok(())
    }

    fn load_static_block(&mut self, buf: &mut DataBuffer, timer: &mut Timer) -> Result<()> {
        timer.start("static block");
        // Presize every arena. Kinds this code doesn't know will become null items.
        let nbr_types = buf.read_u32()? as usize;
        let mut unknown = 0;
        for tag in 0..nbr_types {
            let n = buf.read_u32()? as usize;
            match ItemType::from_tag(tag as u8).filter(|_| tag < NBR_ITEM_TYPES) {
                Some(t) => self.item_arenas[t.tag() as usize].reallocate(n)?,
                None => unknown += n,
            }
        }
        self.item_arenas[ItemType::Null.tag() as usize].reallocate(unknown)?;
        self.nodes.reallocate(buf.read_u32()? as usize)?;
        self.connections.reallocate(buf.read_u32()? as usize)?;
        self.gfx.reallocate(buf.read_u32()? as usize)?;

        let has_map_gfx = buf.read_bool()?;
        buf.align_to(4);
        self.map_gfx = if has_map_gfx {
            Some(GfxData::load(buf).context("map geometry")?)
        } else {
            None
        };
        self.names = ItemNames::load(buf).context("string table")?;

        timer.start_iter("load zoom levels", NUMBER_GFX_ZOOMLEVELS);
        for zoom in 0..NUMBER_GFX_ZOOMLEVELS {
            timer.next();
            let count = buf.read_u32()?;
            let byte_len = buf.read_u32()? as usize;
            let zoom_end = buf.position() + byte_len;
            if count > MAX_SLOTS_PER_ZOOM {
                bail!("Zoom level {} claims {} items", zoom, count);
            }
            let mut level = Vec::with_capacity((count as usize).min(byte_len / 4));
            for slot in 0..count {
                let (id, r) = self
                    .load_item(buf)
                    .with_context(|| format!("item {} on zoom level {}", slot, zoom))?;
                let expected = ItemID::new(zoom, slot);
                if id != expected {
                    panic!(
                        "Corrupt map: zoom {} slot {} holds {} instead of {}",
                        zoom, slot, id, expected
                    );
                }
                level.push(r);
            }
            if buf.position() != zoom_end {
                bail!(
                    "Zoom level {} should end at offset {}, but ended at {}",
                    zoom,
                    zoom_end,
                    buf.position()
                );
            }
            self.zoom_levels[zoom] = level;
        }

        self.boundary = BoundarySegments::load(buf).context("boundary segments")?;
        self.landmarks = LandmarkTable::load(buf).context("landmarks")?;
        self.expansion = NodeExpansionTable::load(buf).context("node expansion table")?;
        timer.stop("static block");
        Ok(())
    }

    fn load_item(&mut self, buf: &mut DataBuffer) -> Result<(ItemID, ItemRef)> {
        let item_header = buf.read_u32()?;
        let tag = (item_header >> 24) as u8;
        let len = (item_header & MAX_ITEM_LENGTH as u32) as usize;
        let end = buf.position() + len;
        if end > buf.len() {
            bail!("Item claims {} bytes, but only {} remain", len, buf.remaining());
        }

        let item_type = match ItemType::from_tag(tag) {
            Some(t) => t,
            None => {
                // Written by newer code. Keep the slot as a tombstone.
                let id = ItemID(buf.read_u32()?);
                buf.seek(end)?;
                return Ok((id, self.alloc_item(Item::tombstone(id))));
            }
        };

        let mut item = Item::load_common(item_type, buf)?;
        let id = item.id;
        let has_gfx = buf.read_bool()?;
        buf.align_to(4);
        if has_gfx {
            item.gfx = Some(self.gfx.alloc(GfxData::load(buf)?));
        }
        item.kind = ItemKind::load(item_type, buf)?;
        if item_type.is_routeable() {
            let n0 = Node::load(id.node0(), &mut self.connections, buf)?;
            let n1 = Node::load(id.node1(), &mut self.connections, buf)?;
            item.nodes = Some([self.nodes.alloc(n0), self.nodes.alloc(n1)]);
        }
        if buf.position() > end {
            bail!("{} ({}) overran its {} bytes", id, item_type, len);
        }
        buf.seek(end)?;
        Ok((id, self.alloc_item(item)))
    }

    fn alloc_item(&mut self, item: Item) -> ItemRef {
        let item_type = item.item_type();
        let handle = self.item_arenas[item_type.tag() as usize].alloc(item);
        ItemRef { item_type, handle }
    }

    /// Group references to missing or removed items can't be resolved, most often because
    /// the group was of a kind this code doesn't know.
    fn strip_dangling_groups(&mut self, timer: &mut Timer) {
        let mut fixes = Vec::new();
        for item in self.all_items() {
            let bad: Vec<ItemID> = item
                .groups()
                .iter()
                .map(|g| g.id())
                .filter(|g| self.live_item(*g).is_none())
                .collect();
            if !bad.is_empty() {
                fixes.push((item.id(), bad));
            }
        }
        let mut stripped = 0;
        for (id, bad) in fixes {
            if let Some(item) = self.item_mut(id) {
                for g in bad {
                    if item.remove_group(g) {
                        stripped += 1;
                    }
                }
            }
        }
        if stripped > 0 {
            timer.warn(format!("Stripped {} dangling group references", stripped));
        }
    }

    pub fn save(&self, path: &str) -> Result<()> {
        self.save_version(path, CURRENT_VERSION)
    }

    /// Writes an older format, leaving out the sections it didn't have.
    pub fn save_version(&self, path: &str, version: u8) -> Result<()> {
        let bytes = self.to_bytes(version)?;
        let len = bytes.len();
        fs_err::write(path, bytes)?;
        info!("Wrote {} ({} bytes)", path, prettyprint_usize(len));
        Ok(())
    }

    pub fn to_bytes(&self, version: u8) -> Result<Vec<u8>> {
        if !(OLDEST_SUPPORTED_VERSION..=CURRENT_VERSION).contains(&version) {
            bail!("Can't write format version {}", version);
        }
        let mut timer = Timer::new(format!("save map {}", self.header.map_id));
        let mut buf = DataBuffer::with_capacity(self.memory_usage());
        self.header.save(version, &mut buf);

        let size_at = buf.position();
        buf.write_u32(0);
        if version <= LAST_LEGACY_VERSION {
            self.save_static_block(&mut buf, &mut timer)?;
            self.aux.user_rights.save(&mut buf);
            self.aux.admin_centroids.save(&mut buf);
        } else {
            buf.write_framed(|b| self.save_static_block(b, &mut timer))?;
            for table in self.aux.tables() {
                if table.since_version() <= version {
                    buf.write_framed(|b| {
                        table.save(b);
                        Ok(())
                    })?;
                }
            }
        }
        let body_size = buf.position() - size_at - 4;
        buf.patch_u32(size_at, body_size as u32)?;
        Ok(buf.into_bytes())
    }

    fn save_static_block(&self, buf: &mut DataBuffer, timer: &mut Timer) -> Result<()> {
        timer.start("static block");
        buf.write_u32(NBR_ITEM_TYPES as u32);
        for t in ItemType::all() {
            buf.write_u32(self.nbr_items_of_type(t) as u32);
        }
        buf.write_u32(self.nodes.len() as u32);
        buf.write_u32(self.connections.len() as u32);
        buf.write_u32(self.gfx.len() as u32);

        buf.write_bool(self.map_gfx.is_some());
        buf.align_to(4);
        if let Some(ref gfx) = self.map_gfx {
            gfx.save(buf).context("map geometry")?;
        }
        self.names.save(buf);

        timer.start_iter("save zoom levels", NUMBER_GFX_ZOOMLEVELS);
        for (zoom, level) in self.zoom_levels.iter().enumerate() {
            timer.next();
            buf.write_u32(level.len() as u32);
            let len_at = buf.position();
            buf.write_u32(0);
            for (slot, r) in level.iter().enumerate() {
                self.save_item(ItemID::new(zoom, slot as u32), *r, buf)?;
            }
            let len = buf.position() - len_at - 4;
            buf.patch_u32(len_at, len as u32)?;
        }

        self.boundary.save(buf);
        self.landmarks.save(buf);
        self.expansion.save(buf);
        timer.stop("static block");
        Ok(())
    }

    fn save_item(&self, id: ItemID, r: ItemRef, buf: &mut DataBuffer) -> Result<()> {
        let tombstone;
        let item = match self.item_arenas[r.item_type.tag() as usize].get(r.handle) {
            Some(item) => item,
            None => {
                tombstone = Item::tombstone(id);
                &tombstone
            }
        };
        let item_type = item.item_type();

        let header_at = buf.position();
        buf.write_u32(0);
        item.save_common(buf)?;
        let gfx = self.item_gfx(item);
        buf.write_bool(gfx.is_some());
        buf.align_to(4);
        if let Some(gfx) = gfx {
            gfx.save(buf).with_context(|| format!("geometry of {}", id))?;
        }
        item.kind.save(buf);
        if item_type.is_routeable() {
            let nodes = match item.nodes {
                Some(nodes) => nodes,
                None => bail!("{} is routeable but has no nodes", id),
            };
            for h in nodes {
                match self.nodes.get(h) {
                    Some(node) => node.save(&self.connections, buf),
                    None => bail!("{} lost one of its nodes", id),
                }
            }
        }
        buf.align_to(4);

        let len = buf.position() - header_at - 4;
        if len > MAX_ITEM_LENGTH {
            bail!("{} needs {} bytes, more than an item can hold", id, len);
        }
        buf.patch_u32(header_at, (u32::from(item_type.tag()) << 24) | len as u32)
    }
}

/// Reads a section length and returns where the section ends.
fn read_frame(buf: &mut DataBuffer, body_end: usize) -> Result<usize> {
    let len = buf.read_u32()? as usize;
    let section_end = buf.position() + len;
    if section_end > body_end {
        bail!(
            "Section at offset {} runs {} bytes past the body",
            buf.position(),
            section_end - body_end
        );
    }
    Ok(section_end)
}
