use std::collections::BTreeMap;
use std::path::Path;

use quasar_codec::keys::{self, KeyType, ParsedKey};
use rocksdb::{IteratorMode, Options, DB};

use crate::prefix::PrefixSpec;

pub struct Inspector {
    db: DB,
}

impl Inspector {
    pub fn open(db_path: &str) -> Result<Self, String> {
        if !Path::new(db_path).exists() {
            return Err(format!("db path '{db_path}' does not exist"));
        }
        let db = DB::open_for_read_only(&Options::default(), db_path, false)
            .map_err(|e| e.to_string())?;
        Ok(Self { db })
    }

    /// Per-key-type counts and total sizes.
    pub fn info(&self) -> Result<(), String> {
        let mut counts: BTreeMap<u8, (u64, u64)> = BTreeMap::new();
        for item in self.db.iterator(IteratorMode::Start) {
            let (key, value) = item.map_err(|e| e.to_string())?;
            let type_byte = key.first().copied().unwrap_or(0);
            let entry = counts.entry(type_byte).or_default();
            entry.0 += 1;
            entry.1 += (key.len() + value.len()) as u64;
        }
        println!("{:<12} {:>12} {:>14}", "key type", "count", "bytes");
        for (type_byte, (count, bytes)) in counts {
            println!(
                "{:<12} {count:>12} {bytes:>14}",
                type_name(type_byte)
            );
        }
        Ok(())
    }

    /// `info` plus up to `num_samples` decoded keys per type.
    pub fn stats(&self, num_samples: usize) -> Result<(), String> {
        self.info()?;
        if num_samples == 0 {
            return Ok(());
        }
        let mut shown: BTreeMap<u8, usize> = BTreeMap::new();
        for item in self.db.iterator(IteratorMode::Start) {
            let (key, _) = item.map_err(|e| e.to_string())?;
            let type_byte = key.first().copied().unwrap_or(0);
            let seen = shown.entry(type_byte).or_default();
            if *seen >= num_samples {
                continue;
            }
            *seen += 1;
            println!("    [{}] {}", type_name(type_byte), render_key(&key));
        }
        Ok(())
    }

    /// Entries under the assembled prefix, keys decoded where the layout is
    /// known.
    pub fn dump(&self, spec: &PrefixSpec, num_entries: usize) -> Result<(), String> {
        let prefix = spec.to_bytes();
        let mode = if prefix.is_empty() {
            IteratorMode::Start
        } else {
            IteratorMode::From(&prefix, rocksdb::Direction::Forward)
        };
        let mut dumped = 0usize;
        for item in self.db.iterator(mode) {
            let (key, value) = item.map_err(|e| e.to_string())?;
            if !key.starts_with(&prefix) {
                break;
            }
            if dumped >= num_entries {
                break;
            }
            dumped += 1;
            match keys::parse_key(&key, spec.id_len) {
                Some(parsed) => println!("{} => {} bytes", render_parsed(&parsed), value.len()),
                None => println!("{} => {} bytes", hex_str(&key), value.len()),
            }
        }
        println!("{dumped} entrie(s) dumped");
        Ok(())
    }
}

fn type_name(type_byte: u8) -> &'static str {
    match KeyType::from_u8(type_byte) {
        Some(KeyType::Vertex) => "vertex",
        Some(KeyType::Edge) => "edge",
        Some(KeyType::Index) => "index",
        Some(KeyType::System) => "system",
        Some(KeyType::Operation) => "operation",
        Some(KeyType::Kv) => "kv",
        None => "unknown",
    }
}

/// Hex rendering with printable characters echoed, the way raw keys are
/// easiest to eyeball.
fn hex_str(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        out.push_str(&format!("{b:02X}"));
        if (32..127).contains(&b) {
            out.push_str(&format!("({})", b as char));
        }
        out.push(' ');
    }
    out
}

fn render_key(key: &[u8]) -> String {
    // Without a known id length only the type/part header is structured.
    if key.len() >= 4 {
        let part = u32::from(key[1]) | u32::from(key[2]) << 8 | u32::from(key[3]) << 16;
        format!("part {part}, key {}", hex_str(key))
    } else {
        hex_str(key)
    }
}

fn render_parsed(parsed: &ParsedKey) -> String {
    match parsed {
        ParsedKey::Vertex { part, vid, tag_id } => {
            format!("vertex part={part} vid={} tag={tag_id}", hex_str(vid))
        }
        ParsedKey::Edge {
            part,
            src,
            edge_type,
            rank,
            dst,
            edge_ver,
        } => format!(
            "edge part={part} src={} type={edge_type} rank={rank} dst={} ver={edge_ver}",
            hex_str(src),
            hex_str(dst)
        ),
        ParsedKey::Index { part, tail } => {
            format!("index part={part} tail={}", hex_str(tail))
        }
        ParsedKey::System { part, sys_type } => {
            format!("system part={part} sys_type={sys_type}")
        }
        ParsedKey::Operation { part, tail } => {
            format!("operation part={part} tail={}", hex_str(tail))
        }
        ParsedKey::Kv { part, name } => {
            format!("kv part={part} name={}", String::from_utf8_lossy(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use quasar_codec::keys;

    use super::*;
    use crate::prefix::build_prefix;

    fn seeded_db(dir: &std::path::Path) -> DB {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, dir).unwrap();
        for part in 1..=2u32 {
            for vid in [b"aa".as_slice(), b"bb".as_slice()] {
                let key = keys::vertex_key(part, vid, 4, 7).unwrap();
                db.put(key, b"row").unwrap();
            }
        }
        let edge = keys::edge_key(1, b"aa", 4, 3, 0, b"bb", 0).unwrap();
        db.put(edge, b"row").unwrap();
        db.put(keys::system_key(1, 1), b"").unwrap();
        db
    }

    #[test]
    fn info_and_stats_walk_a_seeded_instance() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _ = seeded_db(dir.path());
        }
        let inspector = Inspector::open(dir.path().to_str().unwrap()).unwrap();
        inspector.info().unwrap();
        inspector.stats(2).unwrap();
    }

    #[test]
    fn dump_walks_only_the_prefix() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _ = seeded_db(dir.path());
        }
        let inspector = Inspector::open(dir.path().to_str().unwrap()).unwrap();
        let spec = build_prefix("type:1;part:1;idlen:4").unwrap();
        inspector.dump(&spec, 10).unwrap();
    }

    #[test]
    fn missing_path_fails_to_open() {
        assert!(Inspector::open("/definitely/not/here").is_err());
    }
}
