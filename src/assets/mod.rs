pub mod primitives;

use crate::render::{MeshData, MeshHandle, MeshVertex, RenderDevice, RenderError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("model '{reference}' not found")]
    NotFound { reference: String },
    #[error("failed to import glTF at {}: {source}", path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("model '{reference}' contains no triangles")]
    EmptyMesh { reference: String },
    #[error(transparent)]
    Upload(#[from] RenderError),
    #[error("model '{reference}' failed earlier: {cause}")]
    Unavailable { reference: String, cause: String },
}

/// Turns a document's model reference into a mesh living on a device.
pub trait AssetResolver {
    fn resolve(
        &mut self,
        device: &mut dyn RenderDevice,
        reference: &str,
    ) -> Result<MeshHandle, AssetError>;

    /// Drops cached handles, e.g. after the device they belong to was replaced.
    fn forget_uploads(&mut self);

    /// Lets references that failed before be looked up again.
    fn forget_failures(&mut self);
}

/// Built-in primitives first, then glTF files under `root`.
pub struct AssetLibrary {
    root: PathBuf,
    uploaded: HashMap<String, MeshHandle>,
    // Failed references and their cause; not retried until `forget_failures`.
    unavailable: HashMap<String, String>,
}

impl AssetLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            uploaded: HashMap::new(),
            unavailable: HashMap::new(),
        }
    }

    fn candidates(&self, reference: &str) -> [PathBuf; 3] {
        [
            self.root.join(reference),
            self.root.join(format!("{reference}.glb")),
            self.root.join(format!("{reference}.gltf")),
        ]
    }

    fn load(&self, reference: &str) -> Result<MeshData, AssetError> {
        if let Some(mesh) = primitives::builtin(reference) {
            return Ok(mesh);
        }
        let path = self
            .candidates(reference)
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| AssetError::NotFound {
                reference: reference.to_string(),
            })?;
        let mesh = import_gltf(&path)?;
        if mesh.is_empty() {
            return Err(AssetError::EmptyMesh {
                reference: reference.to_string(),
            });
        }
        log::info!(
            "Loaded model '{}' from {} ({} vertices)",
            reference,
            path.display(),
            mesh.vertices.len()
        );
        Ok(mesh)
    }
}

impl AssetResolver for AssetLibrary {
    fn resolve(
        &mut self,
        device: &mut dyn RenderDevice,
        reference: &str,
    ) -> Result<MeshHandle, AssetError> {
        if let Some(handle) = self.uploaded.get(reference) {
            return Ok(*handle);
        }
        if let Some(cause) = self.unavailable.get(reference) {
            return Err(AssetError::Unavailable {
                reference: reference.to_string(),
                cause: cause.clone(),
            });
        }
        let loaded = self
            .load(reference)
            .and_then(|mesh| device.upload_mesh(&mesh).map_err(AssetError::from));
        match loaded {
            Ok(handle) => {
                self.uploaded.insert(reference.to_string(), handle);
                Ok(handle)
            }
            Err(err) => {
                log::warn!("Model '{}' is unavailable: {}", reference, err);
                self.unavailable.insert(reference.to_string(), err.to_string());
                Err(err)
            }
        }
    }

    fn forget_uploads(&mut self) {
        self.uploaded.clear();
    }

    fn forget_failures(&mut self) {
        self.unavailable.clear();
    }
}

/// Merges every triangle primitive of every mesh in the file. Node transforms
/// are not applied.
fn import_gltf(path: &Path) -> Result<MeshData, AssetError> {
    let (document, buffers, _images) =
        gltf::import(path).map_err(|source| AssetError::Import {
            path: path.to_path_buf(),
            source,
        })?;

    let mut mesh = MeshData::default();
    for primitive in document.meshes().flat_map(|m| m.primitives()) {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            continue;
        }
        let reader =
            primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let base = mesh.vertices.len() as u32;
        let positions: Vec<[f32; 3]> = positions.collect();
        let mut normals = reader
            .read_normals()
            .map(|normals| normals.collect::<Vec<_>>())
            .unwrap_or_default();
        normals.resize(positions.len(), [0.0, 1.0, 0.0]);
        mesh.vertices
            .extend(positions.iter().zip(&normals).map(|(position, normal)| MeshVertex {
                position: *position,
                normal: *normal,
            }));
        match reader.read_indices() {
            Some(indices) => mesh
                .indices
                .extend(indices.into_u32().map(|index| base + index)),
            None => mesh.indices.extend(base..base + positions.len() as u32),
        }
    }
    Ok(mesh)
}
