//! Assembles a scan prefix from the `--prefix "k1:v1;k2:v2;…"` flag.
//!
//! Supported keys: `type` (1..6), `part`, `idlen`, `vid`, `tag`, `edge`,
//! `rank`, `dst`. Fields are appended in key-layout order; assembly stops
//! at the first gap so the result is always a valid scan prefix.

#[derive(Debug, Default, Clone)]
pub struct PrefixSpec {
    pub key_type: Option<u8>,
    pub part: Option<u32>,
    pub id_len: usize,
    pub vid: Option<Vec<u8>>,
    pub tag: Option<u32>,
    pub edge: Option<i32>,
    pub rank: Option<i64>,
    pub dst: Option<Vec<u8>>,
}

impl PrefixSpec {
    /// The raw key prefix this spec selects.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![];
        let Some(key_type) = self.key_type else {
            return out;
        };
        out.push(key_type);
        let Some(part) = self.part else {
            return out;
        };
        out.extend_from_slice(&part.to_le_bytes()[..3]);
        let Some(vid) = &self.vid else {
            return out;
        };
        let mut vid = vid.clone();
        if self.id_len > 0 {
            vid.resize(self.id_len, 0);
        }
        out.extend_from_slice(&vid);
        match key_type {
            0x01 => {
                if let Some(tag) = self.tag {
                    out.extend_from_slice(&tag.to_le_bytes());
                }
            }
            0x02 => {
                let Some(edge) = self.edge else {
                    return out;
                };
                out.extend_from_slice(&edge.to_le_bytes());
                let Some(rank) = self.rank else {
                    return out;
                };
                out.extend_from_slice(&rank.to_le_bytes());
                if let Some(dst) = &self.dst {
                    let mut dst = dst.clone();
                    if self.id_len > 0 {
                        dst.resize(self.id_len, 0);
                    }
                    out.extend_from_slice(&dst);
                }
            }
            _ => {}
        }
        out
    }
}

pub fn build_prefix(spec: &str) -> Result<PrefixSpec, String> {
    let mut out = PrefixSpec::default();
    if spec.trim().is_empty() {
        return Ok(out);
    }
    for pair in spec.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair
            .split_once(':')
            .ok_or_else(|| format!("expected key:value, got `{pair}`"))?;
        match key.trim() {
            "type" => {
                let t: u8 = parse_int(value)?;
                if !(1..=6).contains(&t) {
                    return Err(format!("key type out of range: {t}"));
                }
                out.key_type = Some(t);
            }
            "part" => out.part = Some(parse_int(value)?),
            "idlen" => out.id_len = parse_int(value)?,
            "tag" => out.tag = Some(parse_int(value)?),
            "edge" => out.edge = Some(parse_int(value)?),
            "rank" => out.rank = Some(parse_int(value)?),
            "vid" => out.vid = Some(parse_id(value)?),
            "dst" => out.dst = Some(parse_id(value)?),
            other => return Err(format!("unknown prefix key `{other}`")),
        }
    }
    Ok(out)
}

fn parse_int<T: std::str::FromStr>(value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number `{}`", value.trim()))
}

/// An id is a plain string, or hex when it starts with `\x`.
fn parse_id(value: &str) -> Result<Vec<u8>, String> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("\\x") {
        if hex.len() % 2 != 0 {
            return Err("hex id must have an even number of digits".to_string());
        }
        (0..hex.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|_| format!("invalid hex id `{value}`"))
            })
            .collect()
    } else {
        Ok(value.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_prefix_assembles_in_layout_order() {
        let spec = build_prefix("type:1;part:7;idlen:4;vid:ab;tag:3").unwrap();
        let bytes = spec.to_bytes();
        assert_eq!(
            bytes,
            vec![0x01, 7, 0, 0, b'a', b'b', 0, 0, 3, 0, 0, 0]
        );
    }

    #[test]
    fn edge_prefix_stops_at_the_first_gap() {
        // No rank: the prefix ends after the edge type.
        let spec = build_prefix("type:2;part:1;idlen:2;vid:xy;edge:-3").unwrap();
        let bytes = spec.to_bytes();
        assert_eq!(bytes.len(), 1 + 3 + 2 + 4);
        assert_eq!(&bytes[6..10], &(-3i32).to_le_bytes());
    }

    #[test]
    fn hex_ids_decode() {
        let spec = build_prefix("type:1;part:1;vid:\\x0001ff").unwrap();
        assert_eq!(spec.vid, Some(vec![0x00, 0x01, 0xff]));
    }

    #[test]
    fn bad_inputs_are_rejected() {
        assert!(build_prefix("type:9").is_err());
        assert!(build_prefix("nope:1").is_err());
        assert!(build_prefix("type").is_err());
        assert!(build_prefix("vid:\\x0f0").is_err());
    }

    #[test]
    fn empty_prefix_is_empty_bytes() {
        assert!(build_prefix("").unwrap().to_bytes().is_empty());
    }
}
