//! Integration tests for the seed scenarios: small, hand-checkable builds
//! that exercise the full construction/compression/encoding/traversal
//! pipeline end to end.

use glam::Vec3;
use svdag::{
    BuildConfig, DagCompressor, Encoder, LevelStructure, Node, SdagCompressor, Serializer,
    Strategy, TriangleSoup, Voxelizer,
};
use svdag_core::Aabb;

/// S1 — two voxels at opposite corners (exact point reflections of each
/// other through the scene center), 4 levels. Plain DAG cannot merge the
/// two root-to-voxel chains at any level (their occupied octant never
/// coincides), but SDAG's XYZ mirror should collapse both chains down to a
/// single shared path at every non-root level.
#[test]
fn s1_opposite_corners_dag_keeps_two_chains_sdag_merges_them() {
    let bbox = Aabb::new(Vec3::ZERO, Vec3::ONE);
    let points = vec![Vec3::splat(0.1), Vec3::splat(0.9)];
    let built = Voxelizer::from_points(points.into_iter(), bbox, BuildConfig { levels: 4, ..Default::default() });
    assert_eq!(built.levels.voxel_count(), 2);

    let mut dag = built.levels.clone();
    DagCompressor::compress(&mut dag).unwrap();
    assert_eq!(dag.voxel_count(), 2);
    assert_eq!(dag.total_nodes(), 7, "root + 2 distinct nodes at each of the 3 deeper levels");

    let mut sdag = built.levels.clone();
    SdagCompressor::compress(&mut sdag, Strategy::EightLookup).unwrap();
    assert_eq!(sdag.voxel_count(), 2);
    assert_eq!(sdag.total_nodes(), 4, "root + 1 merged node at each of the 3 deeper levels");
}

/// S2 — a unit cube fully filled at depth 3: after DAG, every level has
/// exactly one node (`nNodesDAG = 3`). Built directly as the uncompressed
/// SVO a full-cube voxelization would produce: 8 structurally-identical
/// inner nodes under the root, each with 8 structurally-identical fully
/// occupied leaves.
#[test]
fn s2_fully_filled_cube_collapses_to_one_node_per_level() {
    let mut ls = LevelStructure::new(3);

    for inner in 0..8u32 {
        for leaf in 0..8u32 {
            let _ = leaf;
            ls.level_mut(2).push(Node { child_mask: 0xFF, ..Default::default() });
        }
        let mut node = Node { child_mask: 0xFF, ..Default::default() };
        for c in 0..8usize {
            node.children[c] = inner * 8 + c as u32;
        }
        ls.level_mut(1).push(node);
    }
    ls.root_mut().child_mask = 0xFF;
    for c in 0..8usize {
        ls.root_mut().children[c] = c as u32;
    }

    DagCompressor::compress(&mut ls).unwrap();

    assert_eq!(ls.level(1).len(), 1);
    assert_eq!(ls.level(2).len(), 1);
    assert_eq!(ls.total_nodes(), 3);
}

/// S3 — a planar slab voxelized through several levels: every level's
/// occupancy is uniform across the two axes the plane doesn't vary along,
/// so after DAG each level collapses to a single node and child pointers
/// form one chain. Modeled directly (structurally) rather than through
/// triangle rasterization, to keep the expected result independent of
/// `tri_box_overlap`'s exact boundary handling.
#[test]
fn s3_planar_slab_forms_a_single_chain_after_dag() {
    let mut ls = LevelStructure::new(4);
    // Occupies octants 0 and 4 (the two z-halves at x=y=0) at every level:
    // a plane doesn't vary across x/y, so every node at a given level is a
    // byte-for-byte copy of its siblings, and two copies are pushed at each
    // non-root level to model that repetition before compression.
    for _ in 0..2 {
        ls.level_mut(3).push(Node { child_mask: 0b0001_0001, ..Default::default() });
    }
    for l in [1u32, 2u32] {
        for _ in 0..2 {
            let mut node = Node { child_mask: 0b0001_0001, ..Default::default() };
            node.children[0] = 0;
            node.children[4] = 1;
            ls.level_mut(l).push(node);
        }
    }
    ls.root_mut().child_mask = 0b0001_0001;
    ls.root_mut().children[0] = 0;
    ls.root_mut().children[4] = 1;

    DagCompressor::compress(&mut ls).unwrap();

    for l in 1..ls.num_levels() {
        assert_eq!(ls.level(l).len(), 1, "level {l} should collapse to a single node");
    }
}

/// S4 — a filled sphere of radius 0.25 at the origin, depth 6: SDAG should
/// compress at least as well as DAG (sphere symmetry gives it plenty of
/// mirror-equal subtrees to exploit), and a query at the center should
/// reach the deepest level.
#[test]
fn s4_sphere_sdag_compresses_at_least_as_well_as_dag_and_reaches_full_depth() {
    let bbox = Aabb::cube(Vec3::ZERO, 0.5);
    let levels = 6;
    // Sample at exactly the finest voxel resolution (2^levels per axis) so
    // each grid point lands on a distinct leaf sub-voxel's own center. A
    // coarser grid can skip the specific sub-voxel the origin query resolves
    // into, leaving it unoccupied even though the sphere covers it.
    let steps = 1u32 << levels;
    let mut points = Vec::new();
    for ix in 0..steps {
        for iy in 0..steps {
            for iz in 0..steps {
                let p = bbox.min
                    + bbox.size() * (Vec3::new(ix as f32, iy as f32, iz as f32) + Vec3::splat(0.5))
                        / steps as f32;
                if p.length() <= 0.25 {
                    points.push(p);
                }
            }
        }
    }
    assert!(!points.is_empty());

    let built = Voxelizer::from_points(points.into_iter(), bbox, BuildConfig { levels: 6, ..Default::default() });

    let mut dag = built.levels.clone();
    DagCompressor::compress(&mut dag).unwrap();

    let mut sdag = built.levels.clone();
    SdagCompressor::compress(&mut sdag, Strategy::Canonical).unwrap();

    assert_eq!(dag.voxel_count(), built.levels.voxel_count());
    assert_eq!(sdag.voxel_count(), built.levels.voxel_count());
    assert!(sdag.total_nodes() <= dag.total_nodes());

    let encoded = Encoder::encode(&dag);
    let trav = svdag::EncodedTraverser::new(&encoded.words, 6, bbox, bbox.size().max_element());
    assert_eq!(trav.traverse(Vec3::ZERO), 6);
}

/// S5 — an empty scene: one root with `childMask = 0`; `firstLeafPtr = 1`;
/// `wordCount = 1`; a query anywhere in the bbox returns depth 0.
#[test]
fn s5_empty_scene_encodes_to_a_single_word_and_traverses_to_depth_zero() {
    let scene = TriangleSoup::new();
    let built = Voxelizer::from_triangles(&scene, BuildConfig { levels: 4, ..Default::default() });
    assert_eq!(built.levels.root().child_mask, 0);

    let encoded = Encoder::encode(&built.levels);
    assert_eq!(encoded.first_leaf_ptr, 1);
    assert_eq!(encoded.words.len(), 1);
    assert_eq!(encoded.n_nodes, 1);

    let bbox = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    let trav = svdag::EncodedTraverser::new(&encoded.words, 4, bbox, 2.0);
    assert_eq!(trav.traverse(Vec3::ZERO), 0);
}

/// S6 — after encode-then-load, `getChild` yields the same pointer/level
/// sequence whether walking the freshly encoded buffer or the one just
/// round-tripped through `Serializer`.
#[test]
fn s6_get_child_agrees_after_save_and_load() {
    let mut ls = LevelStructure::new(2);
    ls.level_mut(1).push(Node { child_mask: 0b0000_0001, ..Default::default() });
    ls.root_mut().set_child_bit(5);
    ls.root_mut().children[5] = 0;

    let encoded = Encoder::encode(&ls);
    let bbox = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));

    let path = std::env::temp_dir().join(format!("svdag-s6-test-{}.bin", std::process::id()));
    Serializer::save(&path, bbox, 2.0, 2, &encoded).unwrap();
    let loaded = Serializer::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let fresh = svdag::EncodedTraverser::new(&encoded.words, 2, bbox, 2.0);
    let reloaded = svdag::EncodedTraverser::new(&loaded.encoded.words, loaded.levels, loaded.bbox, loaded.root_side);

    let root = fresh.get_root_trav_node();
    let (child_a, axes_a) = fresh.get_child(root, 5).unwrap();
    let (child_b, axes_b) = reloaded.get_child(root, 5).unwrap();
    assert_eq!(child_a.idx, child_b.idx);
    assert_eq!(child_a.level, child_b.level);
    assert_eq!(axes_a, axes_b);
}
