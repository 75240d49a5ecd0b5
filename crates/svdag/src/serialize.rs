//! Bit-exact load/store of an encoded word stream plus its header.
//!
//! Byte order is host-native, matching legacy artifacts (see DESIGN.md);
//! cross-endian portability is an explicit non-goal.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use glam::Vec3;
use svdag_core::{Aabb, Result};

use crate::encode::EncodedDag;

/// A fully self-contained on-disk representation: bounding box, root side,
/// level count, and the encoded word stream.
#[derive(Clone, Debug)]
pub struct SerializedDag {
    pub bbox: Aabb,
    pub root_side: f32,
    pub levels: u32,
    pub encoded: EncodedDag,
}

pub struct Serializer;

impl Serializer {
    /// Header layout: sceneBBox.min, sceneBBox.max (12 bytes each), rootSide,
    /// levels, nNodes, firstLeafPtr, wordCount (4 bytes each), then
    /// `wordCount` 32-bit words.
    #[tracing::instrument(skip_all)]
    pub fn save(path: impl AsRef<Path>, bbox: Aabb, root_side: f32, levels: u32, encoded: &EncodedDag) -> Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);

        w.write_all(bytemuck::bytes_of(&bbox.min))?;
        w.write_all(bytemuck::bytes_of(&bbox.max))?;
        w.write_all(&root_side.to_ne_bytes())?;
        w.write_all(&levels.to_ne_bytes())?;
        w.write_all(&encoded.n_nodes.to_ne_bytes())?;
        w.write_all(&encoded.first_leaf_ptr.to_ne_bytes())?;
        let word_count = encoded.words.len() as u32;
        w.write_all(&word_count.to_ne_bytes())?;
        w.write_all(bytemuck::cast_slice(&encoded.words))?;
        w.flush()?;

        tracing::debug!(word_count, "serialized encoded DAG");
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn load(path: impl AsRef<Path>) -> Result<SerializedDag> {
        let file = File::open(path)?;
        let mut r = BufReader::new(file);

        let min = read_vec3(&mut r)?;
        let max = read_vec3(&mut r)?;
        let root_side = read_f32(&mut r)?;
        let levels = read_u32(&mut r)?;
        let n_nodes = read_u32(&mut r)?;
        let first_leaf_ptr = read_u32(&mut r)?;
        let word_count = read_u32(&mut r)?;

        let mut bytes = vec![0u8; word_count as usize * 4];
        r.read_exact(&mut bytes)?;
        let words: Vec<u32> = bytes.chunks_exact(4).map(|c| u32::from_ne_bytes(c.try_into().unwrap())).collect();

        tracing::debug!(word_count, "loaded encoded DAG");
        Ok(SerializedDag {
            bbox: Aabb::new(min, max),
            root_side,
            levels,
            encoded: EncodedDag { words, first_leaf_ptr, n_nodes },
        })
    }

    /// Like [`Serializer::load`], but also runs [`EncodedDag::validate`] on
    /// the decoded word stream before returning, so a truncated or
    /// hand-corrupted file surfaces as [`svdag_core::Error::CorruptEncoding`]
    /// instead of a later out-of-bounds traversal. This is the `load` path
    /// `BuildConfig::check_integrity` refers to.
    pub fn load_checked(path: impl AsRef<Path>) -> Result<SerializedDag> {
        let loaded = Self::load(path)?;
        loaded.encoded.validate()?;
        Ok(loaded)
    }
}

fn read_vec3(r: &mut impl Read) -> Result<Vec3> {
    let mut buf = [0u8; 12];
    r.read_exact(&mut buf)?;
    let x = f32::from_ne_bytes(buf[0..4].try_into().unwrap());
    let y = f32::from_ne_bytes(buf[4..8].try_into().unwrap());
    let z = f32::from_ne_bytes(buf[8..12].try_into().unwrap());
    Ok(Vec3::new(x, y, z))
}

fn read_f32(r: &mut impl Read) -> Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_ne_bytes(buf))
}

fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_ne_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelStructure;
    use crate::encode::Encoder;

    #[test]
    fn save_load_round_trips_byte_for_byte() {
        let ls = LevelStructure::new(2);
        let encoded = Encoder::encode(&ls);
        let bbox = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));

        let dir = std::env::temp_dir();
        let path = dir.join(format!("svdag-roundtrip-test-{}.bin", std::process::id()));
        Serializer::save(&path, bbox, 2.0, 2, &encoded).unwrap();
        let loaded = Serializer::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.bbox, bbox);
        assert_eq!(loaded.root_side, 2.0);
        assert_eq!(loaded.levels, 2);
        assert_eq!(loaded.encoded.n_nodes, encoded.n_nodes);
        assert_eq!(loaded.encoded.first_leaf_ptr, encoded.first_leaf_ptr);
        assert_eq!(loaded.encoded.words, encoded.words);
    }

    #[test]
    fn load_checked_accepts_a_well_formed_file() {
        let mut ls = LevelStructure::new(2);
        ls.level_mut(1).push(crate::node::Node { child_mask: 0b0000_0001, ..Default::default() });
        ls.root_mut().set_child_bit(0);
        ls.root_mut().children[0] = 0;
        let encoded = Encoder::encode(&ls);
        let bbox = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));

        let path = std::env::temp_dir().join(format!("svdag-checked-roundtrip-test-{}.bin", std::process::id()));
        Serializer::save(&path, bbox, 2.0, 2, &encoded).unwrap();
        let loaded = Serializer::load_checked(&path);
        std::fs::remove_file(&path).ok();

        assert!(loaded.is_ok());
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("svdag-does-not-exist-hopefully.bin");
        assert!(Serializer::load(&path).is_err());
    }
}
