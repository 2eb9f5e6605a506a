//! Primitive clustering.
//!
//! Groups a glTF mesh's primitives into the smallest number of shared
//! vertex-buffer orders. Two primitives share an order only when their
//! layout shape ([`VertexBufferDescriptor`]) AND their underlying attribute
//! accessor indices are identical — layout equality alone is not enough to
//! share vertex data. Codec-placeholder primitives (position accessor with
//! neither buffer view nor sparse data) are always singletons.

use gltf_dep::Semantic;
use gltf_dep::mesh::{Mesh, Mode, Primitive};

use crate::mesh::{VertexFormat, VertexLayout, VertexSemantic};

use super::error::ErrorCode;
use super::types::PrimitiveFailure;

/// Shape of a primitive's output vertex layout, used as the first-level
/// clustering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexBufferDescriptor {
    /// Layout carries normals.
    pub has_normals: bool,
    /// Layout carries tangents.
    pub has_tangents: bool,
    /// Number of texture coordinate sets.
    pub tex_coord_count: u8,
    /// Layout carries vertex colors.
    pub has_colors: bool,
    /// Layout carries joints + weights.
    pub has_bones: bool,
    /// Number of morph targets.
    pub morph_target_count: u8,
}

impl VertexBufferDescriptor {
    /// Derive the interleaved output layout for this shape.
    pub fn build_layout(&self) -> VertexLayout {
        let mut layout = VertexLayout::new().with(VertexSemantic::Position, VertexFormat::Float3);
        if self.has_normals {
            layout.push(VertexSemantic::Normal, VertexFormat::Float3);
        }
        if self.has_tangents {
            layout.push(VertexSemantic::Tangent, VertexFormat::Float4);
        }
        for set in 0..self.tex_coord_count {
            layout.push(VertexSemantic::TexCoord(set), VertexFormat::Float2);
        }
        if self.has_colors {
            layout.push(VertexSemantic::Color, VertexFormat::Float4);
        }
        if self.has_bones {
            layout.push(VertexSemantic::Joints, VertexFormat::Uint4);
            layout.push(VertexSemantic::Weights, VertexFormat::Float4);
        }
        layout
    }
}

/// Attribute accessor indices of one primitive, the second-level clustering
/// key (exact accessor equality guarantees shareable vertex data).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct AttributeSet {
    pub position: usize,
    pub normal: Option<usize>,
    pub tangent: Option<usize>,
    pub tex_coords: Vec<usize>,
    pub color: Option<usize>,
    pub joints: Option<usize>,
    pub weights: Option<usize>,
}

/// Morph target delta accessor indices for one primitive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct MorphTargetSet {
    pub positions: Option<usize>,
    pub normals: Option<usize>,
    pub tangents: Option<usize>,
}

/// One primitive's conversion recipe within a shared order.
#[derive(Debug, Clone)]
pub(crate) struct PrimitiveRecipe {
    pub mesh_index: usize,
    pub prim_index: usize,
    pub attributes: AttributeSet,
    pub targets: Vec<MorphTargetSet>,
    pub indices: Option<usize>,
    pub mode: Mode,
    pub material: Option<usize>,
    pub vertex_count: usize,
    /// Offset of this primitive's vertices within the shared buffer.
    pub base_vertex: usize,
}

/// One shared vertex-buffer generation order and its recipient primitives.
#[derive(Debug)]
pub(crate) struct MeshOrder {
    pub mesh_index: usize,
    pub descriptor: VertexBufferDescriptor,
    pub layout: VertexLayout,
    pub primitives: Vec<PrimitiveRecipe>,
    pub total_vertices: usize,
    pub label: Option<String>,
    /// Codec placeholder: no raw position data, needs a decompressor.
    pub compressed: bool,
}

/// Collect a primitive's attribute accessor indices.
///
/// Returns `None` when POSITION is absent (recorded by the caller as a
/// failure). Texture coordinate sets beyond the layout maximum are dropped
/// with a warning.
fn collect_attributes(primitive: &Primitive<'_>) -> Option<AttributeSet> {
    let mut set = AttributeSet::default();
    let mut position = None;
    let mut tex_coords: Vec<(u32, usize)> = Vec::new();

    for (semantic, accessor) in primitive.attributes() {
        match semantic {
            Semantic::Positions => position = Some(accessor.index()),
            Semantic::Normals => set.normal = Some(accessor.index()),
            Semantic::Tangents => set.tangent = Some(accessor.index()),
            Semantic::TexCoords(n) => {
                if n < VertexLayout::MAX_TEXCOORD_SETS as u32 {
                    tex_coords.push((n, accessor.index()));
                } else {
                    log::warn!(
                        "dropping TEXCOORD_{n}: more than {} sets",
                        VertexLayout::MAX_TEXCOORD_SETS
                    );
                }
            }
            Semantic::Colors(0) => set.color = Some(accessor.index()),
            Semantic::Joints(0) => set.joints = Some(accessor.index()),
            Semantic::Weights(0) => set.weights = Some(accessor.index()),
            // Additional color/joint/weight sets are not imported.
            _ => {}
        }
    }

    tex_coords.sort_by_key(|&(n, _)| n);
    set.tex_coords = tex_coords.into_iter().map(|(_, idx)| idx).collect();
    set.position = position?;
    Some(set)
}

fn collect_targets(primitive: &Primitive<'_>) -> Vec<MorphTargetSet> {
    primitive
        .morph_targets()
        .map(|target| MorphTargetSet {
            positions: target.positions().map(|a| a.index()),
            normals: target.normals().map(|a| a.index()),
            tangents: target.tangents().map(|a| a.index()),
        })
        .collect()
}

fn descriptor_of(set: &AttributeSet, target_count: usize) -> VertexBufferDescriptor {
    VertexBufferDescriptor {
        has_normals: set.normal.is_some(),
        has_tangents: set.tangent.is_some(),
        tex_coord_count: set.tex_coords.len() as u8,
        has_colors: set.color.is_some(),
        has_bones: set.joints.is_some() && set.weights.is_some(),
        morph_target_count: target_count as u8,
    }
}

/// Cluster one mesh's primitives into shared-buffer orders.
///
/// Primitives are visited in declaration order; each joins the first order
/// with an identical descriptor, attribute set, and morph target set, or
/// opens a new one. Failures (missing POSITION) are recorded and skipped.
pub(crate) fn cluster_mesh(
    mesh: &Mesh<'_>,
    failures: &mut Vec<PrimitiveFailure>,
) -> Vec<MeshOrder> {
    let mesh_index = mesh.index();
    let mut orders: Vec<MeshOrder> = Vec::new();

    for (prim_index, primitive) in mesh.primitives().enumerate() {
        let Some(attributes) = collect_attributes(&primitive) else {
            log::error!(
                "[{}] mesh {mesh_index} primitive {prim_index} has no POSITION attribute",
                ErrorCode::MissingPositions
            );
            failures.push(PrimitiveFailure {
                mesh_index,
                prim_index,
                code: ErrorCode::MissingPositions,
                detail: "primitive has no POSITION attribute".into(),
            });
            continue;
        };

        let targets = collect_targets(&primitive);
        let descriptor = descriptor_of(&attributes, targets.len());

        let position_accessor = primitive
            .attributes()
            .find(|(semantic, _)| *semantic == Semantic::Positions)
            .map(|(_, accessor)| accessor);
        let Some(position_accessor) = position_accessor else {
            continue;
        };
        let vertex_count = position_accessor.count();
        let compressed =
            position_accessor.view().is_none() && position_accessor.sparse().is_none();

        let recipe = PrimitiveRecipe {
            mesh_index,
            prim_index,
            attributes,
            targets,
            indices: primitive.indices().map(|a| a.index()),
            mode: primitive.mode(),
            material: primitive.material().index(),
            vertex_count,
            base_vertex: 0,
        };

        let existing = if compressed {
            None
        } else {
            orders.iter_mut().find(|order| {
                !order.compressed
                    && order.descriptor == descriptor
                    && order.primitives[0].attributes == recipe.attributes
                    && order.primitives[0].targets == recipe.targets
            })
        };

        match existing {
            Some(order) => {
                if cfg!(debug_assertions) && order.primitives[0].indices != recipe.indices {
                    log::warn!(
                        "mesh {mesh_index}: primitives {} and {prim_index} share vertex \
                         accessors but use different index accessors (redundant \
                         vertex-buffer sharing)",
                        order.primitives[0].prim_index
                    );
                }
                let mut recipe = recipe;
                recipe.base_vertex = order.total_vertices;
                order.total_vertices += recipe.vertex_count;
                order.primitives.push(recipe);
            }
            None => {
                let layout = descriptor.build_layout();
                let label = mesh.name().map(|name| {
                    if orders.is_empty() {
                        name.to_string()
                    } else {
                        format!("{name}_cluster{}", orders.len())
                    }
                });
                orders.push(MeshOrder {
                    mesh_index,
                    descriptor,
                    layout,
                    total_vertices: recipe.vertex_count,
                    primitives: vec![recipe],
                    label,
                    compressed,
                });
            }
        }
    }

    orders
}
