//! Builds a level-structured SVO by recursive subdivision against geometry.
//!
//! Two entry points ([`Voxelizer::from_triangles`], [`Voxelizer::from_points`])
//! share one recursive octant-subdivision driver and differ only in the
//! element/box predicate. An optional hierarchical (subtree-parallel) mode
//! builds a shallow root octree first and fans independent deep builds out
//! over `rayon`: parallel jobs never mutate shared state directly, a
//! mutex-guarded map collects their results one entry per completion, and a
//! single serial join step is the exclusive writer of the final
//! [`LevelStructure`]. Everything else in the pipeline stays single-threaded.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;
use hashbrown::HashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use svdag_core::{Aabb, MaterialId};

use crate::level::LevelStructure;
use crate::node::{Node, NULL_NODE};
use crate::scene::{tri_box_overlap, Scene};
use crate::stats::{BuildConfig, BuildStats};

/// A voxelized scene ready for DAG compression: the level-structured SVO,
/// per-leaf material stamps (index-aligned with the leaf level's node
/// array), the world-space bounding box used as the root cube, and build
/// statistics.
pub struct VoxelizedScene {
    pub levels: LevelStructure,
    pub leaf_materials: Vec<[MaterialId; 8]>,
    pub bbox: Aabb,
    pub root_side: f32,
    pub stats: BuildStats,
}

/// Intermediate recursive tree used while voxelizing, before flattening
/// into [`LevelStructure`]'s per-level arrays. Kept separate from `Node`
/// because candidate geometry has to accumulate per branch during descent,
/// which `Node`'s flat index representation has no room for.
enum BuildNode {
    Empty,
    Branch(Box<[BuildNode; 8]>),
    Leaf { occupancy: u8, materials: [MaterialId; 8] },
    /// Placeholder inserted by the shallow pass of the hierarchical
    /// builder; replaced with a fully built subtree during the join step.
    Deferred(usize),
}

impl Default for BuildNode {
    fn default() -> Self {
        BuildNode::Empty
    }
}

impl BuildNode {
    fn is_empty(&self) -> bool {
        matches!(self, BuildNode::Empty)
    }
}

#[derive(Default)]
struct Accum {
    n_nodes_svo: AtomicU64,
    n_nodes_last_lev_svo: AtomicU64,
    n_voxels: AtomicU64,
}

/// Octant `c`'s child center, given the parent `center`/`half_side`.
/// Octant naming: `c = 4*(x>cx) + 2*(y>cy) + (z>cz)`.
fn child_center(center: Vec3, half_side: f32, c: usize) -> Vec3 {
    let q = half_side * 0.5;
    let sx = if c & 0b100 != 0 { q } else { -q };
    let sy = if c & 0b010 != 0 { q } else { -q };
    let sz = if c & 0b001 != 0 { q } else { -q };
    center + Vec3::new(sx, sy, sz)
}

fn octant_for_point(center: Vec3, point: Vec3) -> usize {
    let x = (point.x > center.x) as usize;
    let y = (point.y > center.y) as usize;
    let z = (point.z > center.z) as usize;
    (x << 2) | (y << 1) | z
}

/// Recursive triangle-driven subdivision, for levels `[start_level, levels)`.
fn build_triangles_node(
    scene: &dyn Scene,
    candidates: &[usize],
    center: Vec3,
    half_side: f32,
    level: u32,
    levels: u32,
    accum: &Accum,
) -> BuildNode {
    if candidates.is_empty() {
        return BuildNode::Empty;
    }

    if level == levels - 1 {
        let mut occupancy = 0u8;
        let mut materials = [MaterialId::NONE; 8];
        for c in 0..8usize {
            let cc = child_center(center, half_side, c);
            let ch = half_side * 0.5;
            for &ti in candidates {
                let Some(tri) = scene.triangle(ti) else { continue };
                if tri_box_overlap(cc, ch, &tri) {
                    occupancy |= 1 << c;
                    materials[c] = scene.triangle_material(ti);
                    break;
                }
            }
        }
        if occupancy == 0 {
            return BuildNode::Empty;
        }
        accum.n_nodes_svo.fetch_add(1, Ordering::Relaxed);
        accum.n_nodes_last_lev_svo.fetch_add(1, Ordering::Relaxed);
        accum.n_voxels.fetch_add(u64::from(occupancy.count_ones()), Ordering::Relaxed);
        return BuildNode::Leaf { occupancy, materials };
    }

    let mut children: Box<[BuildNode; 8]> = Box::new(std::array::from_fn(|_| BuildNode::Empty));
    let mut any = false;
    for c in 0..8usize {
        let cc = child_center(center, half_side, c);
        let ch = half_side * 0.5;
        let child_candidates: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&ti| scene.triangle(ti).is_some_and(|tri| tri_box_overlap(cc, ch, &tri)))
            .collect();
        let child = build_triangles_node(scene, &child_candidates, cc, ch, level + 1, levels, accum);
        any |= !child.is_empty();
        children[c] = child;
    }

    if !any {
        return BuildNode::Empty;
    }
    accum.n_nodes_svo.fetch_add(1, Ordering::Relaxed);
    BuildNode::Branch(children)
}

/// Recursive point-driven insertion, mutating `node` in place as points
/// stream through it.
fn insert_point(node: &mut BuildNode, center: Vec3, half_side: f32, level: u32, levels: u32, point: Vec3) {
    let c = octant_for_point(center, point);
    if level == levels - 1 {
        if !matches!(node, BuildNode::Leaf { .. }) {
            *node = BuildNode::Leaf { occupancy: 0, materials: [MaterialId::NONE; 8] };
        }
        let BuildNode::Leaf { occupancy, .. } = node else { unreachable!() };
        *occupancy |= 1 << c;
        return;
    }

    if !matches!(node, BuildNode::Branch(_)) {
        *node = BuildNode::Branch(Box::new(std::array::from_fn(|_| BuildNode::Empty)));
    }
    let BuildNode::Branch(children) = node else { unreachable!() };
    let cc = child_center(center, half_side, c);
    let ch = half_side * 0.5;
    insert_point(&mut children[c], cc, ch, level + 1, levels, point);
}

/// Flattens a completed `BuildNode` tree into `ls`'s per-level arrays.
/// Returns the index the node was stored at, or [`NULL_NODE`] for `Empty`
/// (non-root empty nodes are simply never created, rather than created and
/// swept in a later pass).
fn flatten(
    tree: &BuildNode,
    level: u32,
    ls: &mut LevelStructure,
    leaf_materials: &mut Vec<[MaterialId; 8]>,
) -> u32 {
    match tree {
        BuildNode::Empty => NULL_NODE,
        BuildNode::Deferred(_) => {
            panic!("attempted to flatten an unresolved hierarchical-build placeholder")
        }
        BuildNode::Leaf { occupancy, materials } => {
            let idx = ls.level_mut(level).len() as u32;
            ls.level_mut(level).push(Node { child_mask: *occupancy, ..Default::default() });
            leaf_materials.push(*materials);
            idx
        }
        BuildNode::Branch(children) => {
            let mut node = Node::default();
            let mut child_idx = [NULL_NODE; 8];
            for c in 0..8usize {
                child_idx[c] = flatten(&children[c], level + 1, ls, leaf_materials);
            }
            for c in 0..8usize {
                if child_idx[c] != NULL_NODE {
                    node.set_child_bit(c);
                    node.children[c] = child_idx[c];
                }
            }
            let idx = ls.level_mut(level).len() as u32;
            ls.level_mut(level).push(node);
            idx
        }
    }
}

/// Writes a completed tree into the root slot that [`LevelStructure::new`]
/// pre-allocates, rather than pushing a second entry and copying it back —
/// level 0 must end up with exactly one node, matching the "levels[0] holds
/// exactly one root" invariant.
fn flatten_root(tree: &BuildNode, ls: &mut LevelStructure, leaf_materials: &mut Vec<[MaterialId; 8]>) {
    match tree {
        BuildNode::Empty => {}
        BuildNode::Deferred(_) => {
            panic!("attempted to flatten an unresolved hierarchical-build placeholder")
        }
        BuildNode::Leaf { occupancy, materials } => {
            ls.root_mut().child_mask = *occupancy;
            leaf_materials.push(*materials);
        }
        BuildNode::Branch(children) => {
            let mut child_idx = [NULL_NODE; 8];
            for c in 0..8usize {
                child_idx[c] = flatten(&children[c], 1, ls, leaf_materials);
            }
            for c in 0..8usize {
                if child_idx[c] != NULL_NODE {
                    ls.root_mut().set_child_bit(c);
                    ls.root_mut().children[c] = child_idx[c];
                }
            }
        }
    }
}

/// Voxelization entry points.
pub struct Voxelizer;

impl Voxelizer {
    /// Build an SVO from triangle geometry.
    #[tracing::instrument(skip_all, fields(levels = config.levels))]
    pub fn from_triangles(scene: &(impl Scene + Sync), config: BuildConfig) -> VoxelizedScene {
        let start = std::time::Instant::now();
        let bbox = Self::triangle_bbox(scene);
        let center = bbox.center();
        let root_side = bbox.size().max_element().max(f32::EPSILON);
        let half_side = root_side * 0.5;
        let candidates: Vec<usize> = (0..scene.triangle_count()).collect();

        let (mut ls, leaf_materials, accum) =
            if let Some(split) = config.hierarchical_split_level.filter(|&s| s > 0 && s < config.levels) {
                Self::build_hierarchical_triangles(scene, &candidates, center, half_side, split, config)
            } else {
                let accum = Accum::default();
                let tree =
                    build_triangles_node(scene, &candidates, center, half_side, 0, config.levels, &accum);
                let mut ls = LevelStructure::new(config.levels);
                let mut leaf_materials = Vec::new();
                flatten_root(&tree, &mut ls, &mut leaf_materials);
                (ls, leaf_materials, accum)
            };

        ls.clean_empty_nodes();

        let mut stats = BuildStats {
            n_nodes_svo: accum.n_nodes_svo.load(Ordering::Relaxed),
            n_nodes_last_lev_svo: accum.n_nodes_last_lev_svo.load(Ordering::Relaxed),
            n_voxels: accum.n_voxels.load(Ordering::Relaxed),
            ..Default::default()
        };
        stats.build_svo_time = start.elapsed();
        tracing::debug!(nodes = stats.n_nodes_svo, voxels = stats.n_voxels, "voxelized SVO");

        VoxelizedScene { levels: ls, leaf_materials, bbox, root_side, stats }
    }

    /// Build an SVO from a lazy point stream.
    #[tracing::instrument(skip_all, fields(levels = config.levels))]
    pub fn from_points(
        points: impl Iterator<Item = Vec3>,
        bbox: Aabb,
        config: BuildConfig,
    ) -> VoxelizedScene {
        let start = std::time::Instant::now();
        let center = bbox.center();
        let root_side = bbox.size().max_element().max(f32::EPSILON);
        let half_side = root_side * 0.5;

        let mut tree = BuildNode::Empty;
        let mut n_points = 0u64;
        for p in points {
            if !bbox.contains_point_half_open(p) {
                continue;
            }
            insert_point(&mut tree, center, half_side, 0, config.levels, p);
            n_points += 1;
        }

        let mut ls = LevelStructure::new(config.levels);
        let mut leaf_materials = Vec::new();
        flatten_root(&tree, &mut ls, &mut leaf_materials);
        ls.clean_empty_nodes();

        let n_voxels = ls.voxel_count();
        let mut stats = BuildStats {
            n_nodes_svo: ls.total_nodes() as u64,
            n_nodes_last_lev_svo: ls.level(ls.num_levels() - 1).len() as u64,
            n_voxels,
            ..Default::default()
        };
        stats.build_svo_time = start.elapsed();
        tracing::debug!(points = n_points, voxels = n_voxels, "voxelized SVO from points");

        VoxelizedScene { levels: ls, leaf_materials, bbox, root_side, stats }
    }

    fn triangle_bbox(scene: &impl Scene) -> Aabb {
        let mut bbox: Option<Aabb> = None;
        for i in 0..scene.triangle_count() {
            let Some(tri) = scene.triangle(i) else { continue };
            for v in [tri.v0, tri.v1, tri.v2] {
                bbox = Some(match bbox {
                    Some(mut b) => {
                        b.expand_to_include(v);
                        b
                    }
                    None => Aabb::new(v, v),
                });
            }
        }
        bbox.unwrap_or_else(|| Aabb::new(Vec3::ZERO, Vec3::ZERO))
    }

    /// Hierarchical (subtree-parallel) build: a shallow root SVO of depth
    /// `split`, then one independent deep voxelize+flatten-ready subtree
    /// per occupied shallow leaf, run on a rayon thread pool. The global
    /// DAG pass that deduplicates *across* subtrees is the caller's normal
    /// `DagCompressor::compress` call on the returned, already-joined
    /// `LevelStructure` — nothing special is required of it.
    fn build_hierarchical_triangles(
        scene: &(impl Scene + Sync),
        candidates: &[usize],
        center: Vec3,
        half_side: f32,
        split: u32,
        config: BuildConfig,
    ) -> (LevelStructure, Vec<[MaterialId; 8]>, Accum) {
        let accum = Accum::default();
        let mut jobs: Vec<(Vec3, f32, Vec<usize>)> = Vec::new();
        let shallow = Self::build_shallow(scene, candidates, center, half_side, 0, split, &mut jobs, &accum);

        let results: Mutex<HashMap<usize, BuildNode>> = Mutex::new(HashMap::new());
        if config.parallel {
            jobs.par_iter().enumerate().for_each(|(job_id, (jc, jh, cands))| {
                let subtree =
                    build_triangles_node(scene, cands, *jc, *jh, split, config.levels, &accum);
                results.lock().insert(job_id, subtree);
            });
        } else {
            for (job_id, (jc, jh, cands)) in jobs.iter().enumerate() {
                let subtree =
                    build_triangles_node(scene, cands, *jc, *jh, split, config.levels, &accum);
                results.lock().insert(job_id, subtree);
            }
        }

        let mut results = results.into_inner();
        let resolved = Self::resolve_deferred(shallow, &mut results);

        let mut ls = LevelStructure::new(config.levels);
        let mut leaf_materials = Vec::new();
        flatten_root(&resolved, &mut ls, &mut leaf_materials);
        (ls, leaf_materials, accum)
    }

    /// Builds the shallow root octree down to `split`, replacing what would
    /// normally be leaves at that level with `Deferred(job_id)` markers and
    /// recording each job's candidate list.
    #[allow(clippy::too_many_arguments)]
    fn build_shallow(
        scene: &impl Scene,
        candidates: &[usize],
        center: Vec3,
        half_side: f32,
        level: u32,
        split: u32,
        jobs: &mut Vec<(Vec3, f32, Vec<usize>)>,
        accum: &Accum,
    ) -> BuildNode {
        if candidates.is_empty() {
            return BuildNode::Empty;
        }
        if level == split {
            let job_id = jobs.len();
            jobs.push((center, half_side, candidates.to_vec()));
            return BuildNode::Deferred(job_id);
        }

        let mut children: Box<[BuildNode; 8]> = Box::new(std::array::from_fn(|_| BuildNode::Empty));
        let mut any = false;
        for c in 0..8usize {
            let cc = child_center(center, half_side, c);
            let ch = half_side * 0.5;
            let child_candidates: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&ti| scene.triangle(ti).is_some_and(|tri| tri_box_overlap(cc, ch, &tri)))
                .collect();
            let child = Self::build_shallow(scene, &child_candidates, cc, ch, level + 1, split, jobs, accum);
            any |= !child.is_empty();
            children[c] = child;
        }
        if !any {
            return BuildNode::Empty;
        }
        accum.n_nodes_svo.fetch_add(1, Ordering::Relaxed);
        BuildNode::Branch(children)
    }

    fn resolve_deferred(tree: BuildNode, results: &mut HashMap<usize, BuildNode>) -> BuildNode {
        match tree {
            BuildNode::Deferred(job_id) => results.remove(&job_id).unwrap_or(BuildNode::Empty),
            BuildNode::Branch(mut children) => {
                for child in children.iter_mut() {
                    let taken = std::mem::replace(child, BuildNode::Empty);
                    *child = Self::resolve_deferred(taken, results);
                }
                BuildNode::Branch(children)
            }
            other => other,
        }
    }
}
