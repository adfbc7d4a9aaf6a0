//! The persisted key layout.
//!
//! Every key starts with a one-byte key type followed by the partition id
//! as three little-endian bytes. Vertex ids are right-padded with `\x00` to
//! the space's fixed `vid_len`.

use crate::CodecError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    Vertex = 0x01,
    Edge = 0x02,
    Index = 0x03,
    System = 0x04,
    Operation = 0x05,
    Kv = 0x06,
}

impl KeyType {
    pub fn from_u8(byte: u8) -> Option<KeyType> {
        match byte {
            0x01 => Some(KeyType::Vertex),
            0x02 => Some(KeyType::Edge),
            0x03 => Some(KeyType::Index),
            0x04 => Some(KeyType::System),
            0x05 => Some(KeyType::Operation),
            0x06 => Some(KeyType::Kv),
            _ => None,
        }
    }
}

fn push_part(part: u32, out: &mut Vec<u8>) {
    out.extend_from_slice(&part.to_le_bytes()[..3]);
}

fn pad_vid(vid: &[u8], vid_len: usize, out: &mut Vec<u8>) -> Result<(), CodecError> {
    if vid.len() > vid_len {
        return Err(CodecError::VidTooLong(vid.len(), vid_len));
    }
    out.extend_from_slice(vid);
    out.resize(out.len() + (vid_len - vid.len()), 0);
    Ok(())
}

pub fn vertex_key(
    part: u32,
    vid: &[u8],
    vid_len: usize,
    tag_id: u32,
) -> Result<Vec<u8>, CodecError> {
    let mut key = Vec::with_capacity(1 + 3 + vid_len + 4);
    key.push(KeyType::Vertex as u8);
    push_part(part, &mut key);
    pad_vid(vid, vid_len, &mut key)?;
    key.extend_from_slice(&tag_id.to_le_bytes());
    Ok(key)
}

#[allow(clippy::too_many_arguments)]
pub fn edge_key(
    part: u32,
    src: &[u8],
    vid_len: usize,
    edge_type: i32,
    rank: i64,
    dst: &[u8],
    edge_ver: u8,
) -> Result<Vec<u8>, CodecError> {
    let mut key = Vec::with_capacity(1 + 3 + vid_len * 2 + 4 + 8 + 1);
    key.push(KeyType::Edge as u8);
    push_part(part, &mut key);
    pad_vid(src, vid_len, &mut key)?;
    key.extend_from_slice(&edge_type.to_le_bytes());
    key.extend_from_slice(&rank.to_le_bytes());
    pad_vid(dst, vid_len, &mut key)?;
    key.push(edge_ver);
    Ok(key)
}

pub fn system_key(part: u32, sys_type: u8) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.push(KeyType::System as u8);
    push_part(part, &mut key);
    key.push(sys_type);
    key
}

pub fn kv_key(part: u32, name: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + name.len());
    key.push(KeyType::Kv as u8);
    push_part(part, &mut key);
    key.extend_from_slice(name);
    key
}

/// `type | part` prefix shared by every layout; the scan prefix for one
/// partition.
pub fn part_prefix(key_type: KeyType, part: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(4);
    key.push(key_type as u8);
    push_part(part, &mut key);
    key
}

/// A key decoded back into its structured form. `Index` and `Operation`
/// keys keep their tail opaque.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedKey {
    Vertex {
        part: u32,
        vid: Vec<u8>,
        tag_id: u32,
    },
    Edge {
        part: u32,
        src: Vec<u8>,
        edge_type: i32,
        rank: i64,
        dst: Vec<u8>,
        edge_ver: u8,
    },
    Index {
        part: u32,
        tail: Vec<u8>,
    },
    System {
        part: u32,
        sys_type: u8,
    },
    Operation {
        part: u32,
        tail: Vec<u8>,
    },
    Kv {
        part: u32,
        name: Vec<u8>,
    },
}

impl ParsedKey {
    pub fn key_type(&self) -> KeyType {
        match self {
            ParsedKey::Vertex { .. } => KeyType::Vertex,
            ParsedKey::Edge { .. } => KeyType::Edge,
            ParsedKey::Index { .. } => KeyType::Index,
            ParsedKey::System { .. } => KeyType::System,
            ParsedKey::Operation { .. } => KeyType::Operation,
            ParsedKey::Kv { .. } => KeyType::Kv,
        }
    }

    pub fn part(&self) -> u32 {
        match self {
            ParsedKey::Vertex { part, .. }
            | ParsedKey::Edge { part, .. }
            | ParsedKey::Index { part, .. }
            | ParsedKey::System { part, .. }
            | ParsedKey::Operation { part, .. }
            | ParsedKey::Kv { part, .. } => *part,
        }
    }
}

pub fn parse_key(key: &[u8], vid_len: usize) -> Option<ParsedKey> {
    if key.len() < 4 {
        return None;
    }
    let key_type = KeyType::from_u8(key[0])?;
    let part = u32::from(key[1]) | u32::from(key[2]) << 8 | u32::from(key[3]) << 16;
    let rest = &key[4..];
    match key_type {
        KeyType::Vertex => {
            if rest.len() != vid_len + 4 {
                return None;
            }
            let vid = rest[..vid_len].to_vec();
            let tag_id = u32::from_le_bytes(rest[vid_len..].try_into().unwrap());
            Some(ParsedKey::Vertex { part, vid, tag_id })
        }
        KeyType::Edge => {
            if rest.len() != vid_len * 2 + 4 + 8 + 1 {
                return None;
            }
            let src = rest[..vid_len].to_vec();
            let mut at = vid_len;
            let edge_type = i32::from_le_bytes(rest[at..at + 4].try_into().unwrap());
            at += 4;
            let rank = i64::from_le_bytes(rest[at..at + 8].try_into().unwrap());
            at += 8;
            let dst = rest[at..at + vid_len].to_vec();
            at += vid_len;
            Some(ParsedKey::Edge {
                part,
                src,
                edge_type,
                rank,
                dst,
                edge_ver: rest[at],
            })
        }
        KeyType::System => {
            if rest.len() != 1 {
                return None;
            }
            Some(ParsedKey::System {
                part,
                sys_type: rest[0],
            })
        }
        KeyType::Kv => Some(ParsedKey::Kv {
            part,
            name: rest.to_vec(),
        }),
        KeyType::Index => Some(ParsedKey::Index {
            part,
            tail: rest.to_vec(),
        }),
        KeyType::Operation => Some(ParsedKey::Operation {
            part,
            tail: rest.to_vec(),
        }),
    }
}
