//! glTF 2.0 import pipeline.
//!
//! Converts a glTF/GLB asset's accessor data into renderer-ready mesh
//! buffers: interleaved f32-widened vertex attributes, signed 32-bit index
//! buffers with target winding, right-handed → left-handed coordinate
//! conversion, primitive clustering into shared buffers, sparse overlays,
//! morph target frames, and retained skinning/animation streams.
//!
//! # Phases
//!
//! An import runs in fixed phases: container parse + buffer resolution,
//! usage scan, mesh conversion, stream conversion, finalize. Conversion
//! fans out across the rayon thread pool (see [`crate::jobs`]); the
//! orchestration layer checks the caller's [`CancellationToken`] only
//! between phases, so kernels always run to completion and their results
//! are discarded on cancellation.
//!
//! # Failure isolation
//!
//! Structural container problems fail the whole load with [`ImportError`].
//! A bad primitive (unsupported component type, missing POSITION, codec
//! placeholder without a decompressor) fails only itself — or its whole
//! cluster when it shares a buffer — and is recorded in
//! [`ImportOutput::failures`] while the rest of the asset loads.
//!
//! # Example
//!
//! ```ignore
//! use gltf_import::import::{ImportSettings, import_gltf};
//!
//! let data = std::fs::read("model.glb").unwrap();
//! let output = import_gltf(&data, ImportSettings::default()).unwrap();
//!
//! for mesh in &output.meshes {
//!     println!(
//!         "mesh {}: {} vertices, {} submeshes",
//!         mesh.mesh_index,
//!         mesh.data.vertex_count(),
//!         mesh.data.submeshes().len()
//!     );
//! }
//! ```

mod access;
mod assemble;
mod buffers;
mod cluster;
mod convert;
mod error;
mod morph;
mod streams;
mod types;

#[cfg(test)]
mod tests;

pub use access::{AccessorUsage, UsagePolicy, UsageTable};
pub use buffers::GlbBinChunk;
pub use cluster::VertexBufferDescriptor;
pub use error::{ErrorCode, ImportError};
pub use types::{
    AnimationData, ChannelData, ChannelProperty, ConvertedStream, ImportOutput, Interpolation,
    MeshAssignment, PrimitiveFailure, SkinData,
};

use std::sync::Arc;

use gltf_dep::Document;

use crate::compute::{CancellationToken, Checkpoint};

use assemble::ConvertCx;

/// Decoded output of a compressed-mesh codec collaborator.
///
/// Arrays are in glTF conventions (right-handed, top-left UVs, source
/// winding); the importer applies the same corrections it applies to raw
/// accessor data.
#[derive(Debug, Clone, Default)]
pub struct DecodedPrimitive {
    /// Vertex positions (required).
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Vertex tangents (xyz + bitangent sign).
    pub tangents: Option<Vec<[f32; 4]>>,
    /// Texture coordinate sets.
    pub tex_coords: Vec<Vec<[f32; 2]>>,
    /// Index list; `None` means implicit sequential indices.
    pub indices: Option<Vec<u32>>,
}

/// Codec integration point for Draco/meshopt-compressed primitives.
///
/// A primitive whose position accessor has neither a buffer view nor sparse
/// data is a codec placeholder. With no decompressor configured it fails
/// with [`ErrorCode::CompressedPrimitive`]; with one, the decoded arrays
/// feed the normal kernel path. The codecs themselves live outside this
/// crate.
pub trait MeshDecompressor: Send + Sync {
    /// Decode one primitive, or `None` when it cannot be decoded.
    fn decode(&self, mesh_index: usize, prim_index: usize) -> Option<DecodedPrimitive>;
}

/// Accessor indices of one `EXT_mesh_gpu_instancing` attribute set.
///
/// Parsing the extension JSON is the caller's concern; the importer
/// converts the named accessors with the TRS kernels and retains them in
/// [`ImportOutput::streams`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceTransformAccessors {
    /// TRANSLATION accessor index.
    pub translation: Option<usize>,
    /// ROTATION accessor index.
    pub rotation: Option<usize>,
    /// SCALE accessor index.
    pub scale: Option<usize>,
}

/// Import configuration.
#[derive(Clone)]
pub struct ImportSettings {
    /// Resolution policy for accessors used in two different roles.
    pub usage_policy: UsagePolicy,
    /// Validate sparse override indices against the dense element count
    /// (out-of-range overrides are logged and skipped). Default on.
    pub validate_sparse_indices: bool,
    /// Instancing transform accessors supplied by the extension layer.
    pub instance_transforms: Vec<InstanceTransformAccessors>,
    /// Codec collaborator for compressed primitives.
    pub decompressor: Option<Arc<dyn MeshDecompressor>>,
}

impl ImportSettings {
    /// Settings with all defaults (sparse validation on, `LastWins` usage
    /// policy, no decompressor).
    pub fn new() -> Self {
        Self {
            usage_policy: UsagePolicy::default(),
            validate_sparse_indices: true,
            instance_transforms: Vec::new(),
            decompressor: None,
        }
    }

    /// Set the usage-conflict policy.
    pub fn with_usage_policy(mut self, policy: UsagePolicy) -> Self {
        self.usage_policy = policy;
        self
    }

    /// Enable or disable sparse index validation.
    pub fn with_sparse_validation(mut self, validate: bool) -> Self {
        self.validate_sparse_indices = validate;
        self
    }

    /// Add an instancing transform accessor set.
    pub fn with_instance_transforms(mut self, set: InstanceTransformAccessors) -> Self {
        self.instance_transforms.push(set);
        self
    }

    /// Wire in a compressed-mesh decompressor.
    pub fn with_decompressor(mut self, decompressor: Arc<dyn MeshDecompressor>) -> Self {
        self.decompressor = Some(decompressor);
        self
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ImportSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportSettings")
            .field("usage_policy", &self.usage_policy)
            .field("validate_sparse_indices", &self.validate_sparse_indices)
            .field("instance_transforms", &self.instance_transforms.len())
            .field("decompressor", &self.decompressor.is_some())
            .finish()
    }
}

/// Pipeline observation hooks, called on the coordinating thread.
///
/// All methods default to no-ops; implement the ones of interest. Dispatch
/// events fire once per accessor-conversion job as it is issued; assignment
/// events fire once per primitive when its output buffer is finalized.
pub trait ImportObserver {
    /// An accessor conversion job is about to be issued.
    fn on_accessor_dispatch(&mut self, _accessor: usize, _usage: AccessorUsage) {}

    /// A primitive's sub-mesh landed in an output buffer.
    fn on_primitive_assigned(
        &mut self,
        _mesh_index: usize,
        _prim_index: usize,
        _result_index: usize,
        _submesh_index: usize,
    ) {
    }
}

/// Phased import driver.
///
/// [`import_gltf`] and its variants cover the common cases; the phase
/// methods are public so hosts can interleave their own work (or their own
/// suspension points) between phases.
pub struct Importer {
    document: Document,
    buffers: Vec<Vec<u8>>,
    bin_chunk: Option<GlbBinChunk>,
    settings: ImportSettings,
    usage: UsageTable,

    meshes: Vec<MeshAssignment>,
    primitive_map: std::collections::HashMap<(usize, usize), (usize, usize)>,
    streams: std::collections::HashMap<usize, ConvertedStream>,
    skins: Vec<SkinData>,
    animations: Vec<AnimationData>,
    failures: Vec<PrimitiveFailure>,
}

impl Importer {
    /// Parse the container, resolve buffers, and build the usage table.
    ///
    /// Everything that can structurally fail the asset happens here.
    pub fn new(data: &[u8], settings: ImportSettings) -> Result<Self, ImportError> {
        let gltf = gltf_dep::Gltf::from_slice_without_validation(data)?;
        let blob = gltf.blob;
        let document = gltf.document;

        let resolved = buffers::resolve_buffers(&document, blob)?;
        buffers::validate_views(&document, &resolved.data)?;

        let usage = access::build_usage_table(
            &document,
            settings.usage_policy,
            &settings.instance_transforms,
        )?;

        Ok(Self {
            document,
            buffers: resolved.data,
            bin_chunk: resolved.bin_chunk,
            settings,
            usage,
            meshes: Vec::new(),
            primitive_map: std::collections::HashMap::new(),
            streams: std::collections::HashMap::new(),
            skins: Vec::new(),
            animations: Vec::new(),
            failures: Vec::new(),
        })
    }

    /// The read-only accessor usage table.
    pub fn usage(&self) -> &UsageTable {
        &self.usage
    }

    /// Cluster and convert all meshes; cluster builds run in parallel.
    pub fn convert_meshes(&mut self, mut observer: Option<&mut dyn ImportObserver>) {
        let mut orders = Vec::new();
        for mesh in self.document.meshes() {
            orders.extend(cluster::cluster_mesh(&mesh, &mut self.failures));
        }

        if let Some(observer) = observer.as_deref_mut() {
            for order in &orders {
                for recipe in &order.primitives {
                    for accessor in recipe_accessors(recipe) {
                        observer.on_accessor_dispatch(accessor, self.usage.usage(accessor));
                    }
                }
            }
        }

        let cx = ConvertCx::new(&self.document, &self.buffers, &self.settings);
        let built = crate::jobs::run_parallel(&orders, |order| assemble::build_order(order, &cx));

        for (order, result) in orders.iter().zip(built) {
            match result {
                Ok(data) => {
                    let result_index = self.meshes.len();
                    let mut primitive_indices = Vec::with_capacity(order.primitives.len());
                    for (submesh_index, recipe) in order.primitives.iter().enumerate() {
                        self.primitive_map.insert(
                            (recipe.mesh_index, recipe.prim_index),
                            (result_index, submesh_index),
                        );
                        primitive_indices.push(recipe.prim_index);
                        if let Some(observer) = observer.as_deref_mut() {
                            observer.on_primitive_assigned(
                                recipe.mesh_index,
                                recipe.prim_index,
                                result_index,
                                submesh_index,
                            );
                        }
                    }
                    self.meshes.push(MeshAssignment {
                        mesh_index: order.mesh_index,
                        data,
                        primitive_indices,
                    });
                }
                Err((failed_prim, e)) => {
                    log::error!(
                        "[{}] mesh {} cluster failed at primitive {failed_prim}: {}",
                        e.code,
                        order.mesh_index,
                        e.detail
                    );
                    for recipe in &order.primitives {
                        self.failures.push(PrimitiveFailure {
                            mesh_index: recipe.mesh_index,
                            prim_index: recipe.prim_index,
                            code: e.code,
                            detail: if recipe.prim_index == failed_prim {
                                e.detail.clone()
                            } else {
                                format!("cluster failed at primitive {failed_prim}")
                            },
                        });
                    }
                }
            }
        }
    }

    /// Convert retained streams: skins, animations, instance transforms.
    pub fn convert_streams(&mut self) {
        let cx = ConvertCx::new(&self.document, &self.buffers, &self.settings);
        self.skins = streams::convert_skins(&cx, &mut self.streams);
        self.animations = streams::convert_animations(&cx, &mut self.streams);
        streams::convert_instance_transforms(&cx, &mut self.streams);
    }

    /// Finalize: release source buffers and hand off the output.
    pub fn finish(self) -> ImportOutput {
        ImportOutput {
            meshes: self.meshes,
            primitive_map: self.primitive_map,
            streams: self.streams,
            skins: self.skins,
            animations: self.animations,
            failures: self.failures,
            bin_chunk: self.bin_chunk,
        }
    }
}

/// Every accessor a recipe's conversion will touch, for dispatch events.
fn recipe_accessors(recipe: &cluster::PrimitiveRecipe) -> Vec<usize> {
    let set = &recipe.attributes;
    let mut out = vec![set.position];
    out.extend(set.normal);
    out.extend(set.tangent);
    out.extend(set.tex_coords.iter().copied());
    out.extend(set.color);
    out.extend(set.joints);
    out.extend(set.weights);
    out.extend(recipe.indices);
    for target in &recipe.targets {
        out.extend(target.positions);
        out.extend(target.normals);
        out.extend(target.tangents);
    }
    out
}

/// Import an asset with default phase pacing.
pub fn import_gltf(data: &[u8], settings: ImportSettings) -> Result<ImportOutput, ImportError> {
    let mut importer = Importer::new(data, settings)?;
    importer.convert_meshes(None);
    importer.convert_streams();
    Ok(importer.finish())
}

/// Import an asset, checking the token between phases.
///
/// Already-scheduled kernels run to completion; on cancellation their
/// results are dropped with the importer.
pub fn import_gltf_cancellable(
    data: &[u8],
    settings: ImportSettings,
    token: &CancellationToken,
) -> Result<ImportOutput, ImportError> {
    token.check()?;
    let mut importer = Importer::new(data, settings)?;
    token.check()?;
    importer.convert_meshes(None);
    token.check()?;
    importer.convert_streams();
    token.check()?;
    Ok(importer.finish())
}

/// Import an asset, yielding to the host executor between phases.
pub async fn import_gltf_async(
    data: &[u8],
    settings: ImportSettings,
    token: Option<CancellationToken>,
) -> Result<ImportOutput, ImportError> {
    let checkpoint = || match &token {
        Some(token) => Checkpoint::with_token(token.clone()),
        None => Checkpoint::yield_only(),
    };

    let mut importer = Importer::new(data, settings)?;
    checkpoint().await?;
    importer.convert_meshes(None);
    checkpoint().await?;
    importer.convert_streams();
    checkpoint().await?;
    Ok(importer.finish())
}
