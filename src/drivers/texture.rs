//! Texture driver.
//!
//! Mirrors a [`Texture`] into a device texture object. Sampling parameters are
//! pushed as one unit whenever any of them changed. Image contents are synced
//! per layer and mip level: an image whose data was replaced wholesale (its
//! [`DataKey`] changed) is reallocated, while in-place edits are replayed as
//! clamped sub-image writes. Depth and compressed images are always rewritten
//! whole, since partial writes are unreliable for them.

use crate::change_queue::ChangeQueue;
use crate::context::{Capabilities, DeviceContext, ImageSpec, SubImageSpec, TextureId};
use crate::error::{SyncError, SyncResult};
use crate::resources::{
    BufferData, DataKey, ImageRegion, Resource, ResourceKind, Texture, TextureState,
};
use crate::types::{DataType, TextureFormat, TextureParameters, TextureTarget};

use super::{ResourceDriver, ResourceHandle, kind_mismatch};

/// Device-side state of one texture.
#[derive(Debug)]
pub struct TextureHandle {
    target: TextureTarget,
    texture: Option<TextureId>,
    /// Effective format of the allocated images.
    format: Option<TextureFormat>,
    data_type: DataType,
    size: (u32, u32, u32),
    /// Key of the data last uploaded, by layer then mip level.
    keys: Vec<Vec<Option<DataKey>>>,
    parameters: Option<TextureParameters>,
    last_synced_version: u64,
    status: String,
}

impl TextureHandle {
    fn new(target: TextureTarget) -> Self {
        Self {
            target,
            texture: None,
            format: None,
            data_type: DataType::UnsignedByte,
            size: (0, 0, 0),
            keys: Vec::new(),
            parameters: None,
            last_synced_version: ChangeQueue::<()>::UNSYNCED,
            status: String::new(),
        }
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    /// Device texture object, once created.
    pub fn texture_id(&self) -> Option<TextureId> {
        self.texture
    }

    /// Format the images were allocated with, after any substitution.
    pub fn effective_format(&self) -> Option<TextureFormat> {
        self.format
    }

    /// Parameters last pushed to the device.
    pub fn parameters(&self) -> Option<&TextureParameters> {
        self.parameters.as_ref()
    }

    /// Key of the data last uploaded for `layer`, `level`.
    pub fn synced_key(&self, layer: usize, level: usize) -> Option<DataKey> {
        self.keys.get(layer).and_then(|levels| levels.get(level)).copied().flatten()
    }

    pub fn last_synced_version(&self) -> u64 {
        self.last_synced_version
    }

    fn has_layout(&self, state: &TextureState, format: TextureFormat) -> bool {
        self.format == Some(format)
            && self.data_type == state.data_type()
            && self.size == (state.width(), state.height(), state.depth())
            && self.keys.len() == state.layers()
            && self.keys.iter().all(|levels| levels.len() == state.mip_levels())
    }
}

/// Work planned for one mipmap image.
#[derive(Debug)]
enum ImageSync {
    Full { layer: usize, level: usize },
    Partial { layer: usize, level: usize, regions: Vec<ImageRegion> },
}

impl ImageSync {
    fn image(&self) -> (usize, usize) {
        match self {
            Self::Full { layer, level } | Self::Partial { layer, level, .. } => (*layer, *level),
        }
    }
}

/// Driver for [`Texture`] resources.
#[derive(Debug, Default)]
pub struct TextureDriver;

impl TextureDriver {
    pub fn new() -> Self {
        Self
    }

    /// Create a handle for `texture`.
    pub fn init_texture(&self, texture: &Texture) -> TextureHandle {
        TextureHandle::new(texture.target())
    }

    /// Sync `texture` into `handle`.
    pub fn update_texture(
        &self,
        context: &mut dyn DeviceContext,
        texture: &Texture,
        handle: &mut TextureHandle,
    ) -> SyncResult<String> {
        let capabilities = *context.capabilities();
        let state = texture.read();
        let target = texture.target();

        validate(&capabilities, texture, &state)?;

        let requested = state.format();
        let format = effective_format(&capabilities, requested);

        let changes = texture.changes();
        let parameters_dirty = handle.parameters.as_ref() != Some(state.parameters());
        let content_stale = changes.is_version_stale(handle.last_synced_version);
        if !parameters_dirty && !content_stale {
            return Ok(handle.status.clone());
        }

        let plan = if content_stale {
            plan_content(handle, texture, &state, format)
        } else {
            Vec::new()
        };

        if parameters_dirty || !plan.is_empty() {
            let id = match handle.texture {
                Some(id) => id,
                None => {
                    let id = context.create_texture(target)?;
                    handle.texture = Some(id);
                    id
                }
            };

            context.bind_texture(target, id);
            if parameters_dirty {
                log::trace!("Texture {}: pushing parameters", texture.id());
                context.set_texture_parameters(target, state.parameters());
                handle.parameters = Some(*state.parameters());
            }
            let mut scratch = Vec::new();
            for sync in &plan {
                push_image(context, target, &state, format, sync, &mut scratch);
            }
            context.restore_texture(target);
        }

        if content_stale {
            if !handle.has_layout(&state, format) {
                handle.keys = vec![vec![None; state.mip_levels()]; state.layers()];
            }
            for sync in &plan {
                let (layer, level) = sync.image();
                handle.keys[layer][level] = state.image(layer, level).map(BufferData::key);
            }
            handle.format = Some(format);
            handle.data_type = state.data_type();
            handle.size = (state.width(), state.height(), state.depth());
            handle.last_synced_version = changes.version();
        }

        handle.status = if format != requested {
            format!(
                "TextureFormat changed from {} to {} to meet hardware support",
                requested, format
            )
        } else {
            String::new()
        };
        Ok(handle.status.clone())
    }

    /// Forget synced contents and parameters; the texture object is kept.
    pub fn reset_texture(&self, handle: &mut TextureHandle) {
        handle.format = None;
        handle.keys.clear();
        handle.parameters = None;
        handle.last_synced_version = ChangeQueue::<()>::UNSYNCED;
        handle.status.clear();
    }

    /// Delete the texture object.
    pub fn dispose_texture(&self, context: &mut dyn DeviceContext, handle: &mut TextureHandle) {
        if let Some(id) = handle.texture.take() {
            context.delete_texture(id);
        }
        self.reset_texture(handle);
    }
}

impl ResourceDriver for TextureDriver {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Texture
    }

    fn init(&self, resource: &Resource) -> SyncResult<ResourceHandle> {
        match resource {
            Resource::Texture(texture) => Ok(ResourceHandle::Texture(self.init_texture(texture))),
            other => Err(kind_mismatch(ResourceKind::Texture, other.kind())),
        }
    }

    fn update(
        &self,
        context: &mut dyn DeviceContext,
        resource: &Resource,
        handle: &mut ResourceHandle,
    ) -> SyncResult<String> {
        match (resource, handle) {
            (Resource::Texture(texture), ResourceHandle::Texture(handle)) => {
                self.update_texture(context, texture, handle)
            }
            (Resource::Texture(_), handle) => {
                Err(kind_mismatch(ResourceKind::Texture, handle.kind()))
            }
            (other, _) => Err(kind_mismatch(ResourceKind::Texture, other.kind())),
        }
    }

    fn reset(&self, handle: &mut ResourceHandle) {
        if let ResourceHandle::Texture(handle) = handle {
            self.reset_texture(handle);
        }
    }

    fn dispose(&self, context: &mut dyn DeviceContext, handle: &mut ResourceHandle) {
        if let ResourceHandle::Texture(handle) = handle {
            self.dispose_texture(context, handle);
        }
    }
}

/// Format actually allocated for `requested` on a device with `capabilities`.
pub fn effective_format(capabilities: &Capabilities, requested: TextureFormat) -> TextureFormat {
    if capabilities.unclamped_float_textures {
        return requested;
    }
    requested.clamped_equivalent().unwrap_or(requested)
}

fn validate(capabilities: &Capabilities, texture: &Texture, state: &TextureState) -> SyncResult<()> {
    let target = texture.target();
    if !capabilities.supports_target(target) {
        return Err(SyncError::Unsupported(format!(
            "Texture target {} is not supported",
            target
        )));
    }

    let size = (state.width(), state.height(), state.depth());
    if let Some(owner) = texture.owner() {
        if size != (owner.width, owner.height, owner.depth) {
            return Err(SyncError::OwnerConflict(format!(
                "Cannot change dimensions of a texture owned by a surface: {}x{}x{} != {}x{}x{}",
                size.0, size.1, size.2, owner.width, owner.height, owner.depth
            )));
        }
        if state.format() != owner.format || state.data_type() != owner.data_type {
            return Err(SyncError::OwnerConflict(format!(
                "Cannot change format of a texture owned by a surface: {} ({}) != {} ({})",
                state.format(),
                state.data_type(),
                owner.format,
                owner.data_type
            )));
        }
        if state.mip_levels() > 1 {
            return Err(SyncError::OwnerConflict(
                "Textures owned by a surface cannot have mipmaps".to_string(),
            ));
        }
    }

    if state.format().is_depth() && !capabilities.depth_textures {
        return Err(SyncError::Unsupported(
            "Depth textures are not supported".to_string(),
        ));
    }

    let dimensions = [size.0, size.1, size.2];
    if !capabilities.npot_textures && dimensions.iter().any(|d| !d.is_power_of_two()) {
        return Err(SyncError::Unsupported(format!(
            "Non-power-of-two textures are not supported: {}x{}x{}",
            size.0, size.1, size.2
        )));
    }

    let max = capabilities.max_size(target);
    if dimensions.iter().any(|d| *d > max) {
        return Err(SyncError::Unsupported(format!(
            "Texture dimensions {}x{}x{} exceed maximum of {} for {}",
            size.0, size.1, size.2, max, target
        )));
    }
    Ok(())
}

/// Decide what has to be written for every image of a stale texture.
fn plan_content(
    handle: &TextureHandle,
    texture: &Texture,
    state: &TextureState,
    format: TextureFormat,
) -> Vec<ImageSync> {
    let changes = texture.changes();
    let layout = handle.has_layout(state, format);
    let history_lost = changes.has_lost_changes(handle.last_synced_version);
    let whole_images_only = format.is_depth() || format.is_compressed();

    let mut pending = vec![vec![Vec::new(); state.mip_levels()]; state.layers()];
    if !history_lost {
        for edit in changes.changes_since(handle.last_synced_version) {
            if let Some(regions) = pending
                .get_mut(edit.layer)
                .and_then(|levels: &mut Vec<Vec<ImageRegion>>| levels.get_mut(edit.level))
            {
                regions.push(edit.region);
            }
        }
    }

    let mut plan = Vec::new();
    for (layer, levels) in pending.into_iter().enumerate() {
        for (level, regions) in levels.into_iter().enumerate() {
            let current = state.image(layer, level).map(BufferData::key);
            let cached = if layout {
                handle.synced_key(layer, level)
            } else {
                None
            };

            if history_lost || cached.is_none() || cached != current {
                plan.push(ImageSync::Full { layer, level });
            } else if !regions.is_empty() {
                if whole_images_only {
                    plan.push(ImageSync::Full { layer, level });
                } else {
                    plan.push(ImageSync::Partial {
                        layer,
                        level,
                        regions,
                    });
                }
            }
        }
    }
    plan
}

fn push_image(
    context: &mut dyn DeviceContext,
    target: TextureTarget,
    state: &TextureState,
    format: TextureFormat,
    sync: &ImageSync,
    scratch: &mut Vec<u8>,
) {
    match sync {
        ImageSync::Full { layer, level } => {
            let (width, height, depth) = state.level_size(*level);
            let spec = ImageSpec {
                layer: *layer,
                level: *level,
                width,
                height,
                depth,
                format,
                data_type: state.data_type(),
                byte_len: format.buffer_size(state.data_type(), width, height, depth),
            };
            let data = state.image(*layer, *level).and_then(BufferData::bytes);
            log::trace!(
                "Texture image {}/{}: full replace ({}x{}x{})",
                layer,
                level,
                width,
                height,
                depth
            );
            context.tex_image(target, &spec, data);
        }
        ImageSync::Partial {
            layer,
            level,
            regions,
        } => {
            let Some(bytes) = state.image(*layer, *level).and_then(BufferData::bytes) else {
                return;
            };
            let size = state.level_size(*level);
            let texel = format.components() as usize * state.data_type().byte_size();
            for region in regions {
                let Some(region) = region.clamped(size.0, size.1, size.2) else {
                    continue;
                };
                if !copy_region(bytes, size, texel, &region, scratch) {
                    log::trace!(
                        "Texture image {}/{}: data too short for region {:?}",
                        layer,
                        level,
                        region
                    );
                    continue;
                }
                log::trace!("Texture image {}/{}: partial replace {:?}", layer, level, region);
                let spec = SubImageSpec {
                    layer: *layer,
                    level: *level,
                    region,
                    format,
                    data_type: state.data_type(),
                };
                context.tex_sub_image(target, &spec, scratch);
            }
        }
    }
}

/// Copy the texels of `region` out of a tightly packed image into `scratch`.
///
/// Returns false if `bytes` does not cover the region.
fn copy_region(
    bytes: &[u8],
    (width, height, _): (u32, u32, u32),
    texel: usize,
    region: &ImageRegion,
    scratch: &mut Vec<u8>,
) -> bool {
    scratch.clear();
    let row_len = region.width as usize * texel;
    for z in region.z..region.z + region.depth {
        for y in region.y..region.y + region.height {
            let row = (z as usize * height as usize + y as usize) * width as usize;
            let start = (row + region.x as usize) * texel;
            match bytes.get(start..start + row_len) {
                Some(src) => scratch.extend_from_slice(src),
                None => return false,
            }
        }
    }
    true
}
