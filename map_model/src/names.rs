use std::collections::HashMap;

use anyhow::Result;

use abstutil::DataBuffer;

/// The map's string table. Items refer to names by index; equal strings share one entry.
#[derive(Clone, Debug, Default)]
pub struct ItemNames {
    strings: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl ItemNames {
    pub fn new() -> ItemNames {
        ItemNames::default()
    }

    /// Returns the index of the string, adding it if needed.
    pub fn add(&mut self, name: &str) -> u32 {
        if let Some(idx) = self.lookup.get(name) {
            return *idx;
        }
        let idx = self.strings.len() as u32;
        self.strings.push(name.to_string());
        self.lookup.insert(name.to_string(), idx);
        idx
    }

    pub fn get(&self, idx: u32) -> Option<&str> {
        self.strings.get(idx as usize).map(|s| s.as_str())
    }

    pub fn find(&self, name: &str) -> Option<u32> {
        self.lookup.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.strings
            .iter()
            .map(|s| 2 * (s.capacity() + std::mem::size_of::<String>()) + 4)
            .sum()
    }

    pub(crate) fn save(&self, buf: &mut DataBuffer) {
        buf.write_u32(self.strings.len() as u32);
        for s in &self.strings {
            buf.write_string(s);
        }
        buf.align_to(4);
    }

    pub(crate) fn load(buf: &mut DataBuffer) -> Result<ItemNames> {
        let mut names = ItemNames::new();
        for _ in 0..buf.read_u32()? {
            let s = buf.read_string()?;
            // Keep indices stable even if the file has duplicates
            let idx = names.strings.len() as u32;
            names.lookup.entry(s.clone()).or_insert(idx);
            names.strings.push(s);
        }
        buf.align_to(4);
        Ok(names)
    }
}

/// Case-insensitive comparison that also ignores a leading article and some punctuation, for
/// matching city centres to the areas they're named after.
pub fn names_match(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut trimmed = lower.trim();
    for article in ["the ", "la ", "le ", "de ", "den ", "det "] {
        if let Some(rest) = trimmed.strip_prefix(article) {
            trimmed = rest;
            break;
        }
    }
    trimmed
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .filter(|c| !matches!(c, '.' | ',' | '\''))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup() {
        let mut names = ItemNames::new();
        let a = names.add("Lund");
        let b = names.add("Malmö");
        assert_eq!(names.add("Lund"), a);
        assert_ne!(a, b);
        assert_eq!(names.get(b), Some("Malmö"));
        assert_eq!(names.get(7), None);
    }

    #[test]
    fn fuzzy_names() {
        assert!(names_match("St. Albans", "st albans"));
        assert!(names_match("The Hague", "hague"));
        assert!(names_match("Saint-Denis", "Saint Denis"));
        assert!(!names_match("Lund", "Lunds"));
    }
}
