//! Texture resource.

use parking_lot::{RwLock, RwLockReadGuard};

use crate::change_queue::ChangeQueue;
use crate::types::{DataType, TextureFormat, TextureParameters, TextureTarget};

use super::{BufferData, ResourceId};

/// A box inside one mipmap image, in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageRegion {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl ImageRegion {
    /// A two-dimensional region.
    pub fn new_2d(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            z: 0,
            width,
            height,
            depth: 1,
        }
    }

    /// A three-dimensional region.
    pub fn new_3d(x: u32, y: u32, z: u32, width: u32, height: u32, depth: u32) -> Self {
        Self {
            x,
            y,
            z,
            width,
            height,
            depth,
        }
    }

    /// Clip the region so it lies within a `width`x`height`x`depth` image.
    ///
    /// Returns `None` if nothing of the region remains.
    pub fn clamped(&self, width: u32, height: u32, depth: u32) -> Option<Self> {
        if width == 0 || height == 0 || depth == 0 {
            return None;
        }
        let x = self.x.min(width - 1);
        let y = self.y.min(height - 1);
        let z = self.z.min(depth - 1);
        let region = Self {
            x,
            y,
            z,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
            depth: self.depth.min(depth - z),
        };
        (region.width > 0 && region.height > 0 && region.depth > 0).then_some(region)
    }
}

/// An edit to one mipmap image of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MipmapRegion {
    pub layer: usize,
    pub level: usize,
    pub region: ImageRegion,
}

/// Properties fixed by a surface that owns a texture.
///
/// A texture attached to an offscreen surface may not diverge from the size and
/// format the surface allocated for it, and may only have one mipmap level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceOwner {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: TextureFormat,
    pub data_type: DataType,
}

/// Shape and format used to create a [`Texture`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDescriptor {
    pub target: TextureTarget,
    pub format: TextureFormat,
    pub data_type: DataType,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: usize,
    pub parameters: TextureParameters,
}

impl TextureDescriptor {
    /// A one-dimensional texture with a single mip level.
    pub fn new_1d(width: u32, format: TextureFormat, data_type: DataType) -> Self {
        Self::with_shape(TextureTarget::T1d, width, 1, 1, format, data_type)
    }

    /// A two-dimensional texture with a single mip level.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, data_type: DataType) -> Self {
        Self::with_shape(TextureTarget::T2d, width, height, 1, format, data_type)
    }

    /// A volume texture with a single mip level.
    pub fn new_3d(
        width: u32,
        height: u32,
        depth: u32,
        format: TextureFormat,
        data_type: DataType,
    ) -> Self {
        Self::with_shape(TextureTarget::T3d, width, height, depth, format, data_type)
    }

    /// A cube map with square faces of `size` and a single mip level.
    pub fn new_cube_map(size: u32, format: TextureFormat, data_type: DataType) -> Self {
        Self::with_shape(TextureTarget::CubeMap, size, size, 1, format, data_type)
    }

    fn with_shape(
        target: TextureTarget,
        width: u32,
        height: u32,
        depth: u32,
        format: TextureFormat,
        data_type: DataType,
    ) -> Self {
        Self {
            target,
            format,
            data_type,
            width,
            height,
            depth,
            mip_levels: 1,
            parameters: TextureParameters::default(),
        }
    }

    /// Set the number of mip levels (at least one).
    pub fn with_mip_levels(mut self, levels: usize) -> Self {
        self.mip_levels = levels.max(1);
        self
    }

    /// Set the initial sampling parameters.
    pub fn with_parameters(mut self, parameters: TextureParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Current contents of a texture, as seen under its lock.
#[derive(Debug)]
pub struct TextureState {
    format: TextureFormat,
    data_type: DataType,
    width: u32,
    height: u32,
    depth: u32,
    /// Indexed by layer, then mip level.
    images: Vec<Vec<BufferData>>,
    parameters: TextureParameters,
}

impl TextureState {
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of mip levels per layer.
    pub fn mip_levels(&self) -> usize {
        self.images.first().map_or(0, Vec::len)
    }

    /// Number of layers (6 for cube maps).
    pub fn layers(&self) -> usize {
        self.images.len()
    }

    pub fn parameters(&self) -> &TextureParameters {
        &self.parameters
    }

    /// The image stored at `layer`, `level`.
    pub fn image(&self, layer: usize, level: usize) -> Option<&BufferData> {
        self.images.get(layer).and_then(|levels| levels.get(level))
    }

    /// Dimensions of mip `level`, never smaller than one texel.
    pub fn level_size(&self, level: usize) -> (u32, u32, u32) {
        let shrink = |size: u32| size.checked_shr(level as u32).unwrap_or(0).max(1);
        (shrink(self.width), shrink(self.height), shrink(self.depth))
    }

    fn blank_images(
        layers: usize,
        levels: usize,
        format: TextureFormat,
        data_type: DataType,
        (width, height, depth): (u32, u32, u32),
    ) -> Vec<Vec<BufferData>> {
        (0..layers)
            .map(|_| {
                (0..levels)
                    .map(|level| {
                        let shrink = |size: u32| size.checked_shr(level as u32).unwrap_or(0).max(1);
                        let bytes = format.buffer_size(
                            data_type,
                            shrink(width),
                            shrink(height),
                            shrink(depth),
                        );
                        BufferData::empty(DataType::UnsignedByte, bytes)
                    })
                    .collect()
            })
            .collect()
    }
}

/// An image (1D, 2D, 3D or cube map) with mipmaps, synchronized to a device texture.
///
/// # Example
///
/// ```ignore
/// let texture = Texture::new(TextureDescriptor::new_2d(256, 256, TextureFormat::Rgba, DataType::UnsignedByte));
/// texture.set_image(0, 0, BufferData::from_u8(&pixels));
/// texture.modify_image(0, 0, ImageRegion::new_2d(0, 0, 16, 16), |bytes| bytes[0] = 255);
/// ```
#[derive(Debug)]
pub struct Texture {
    id: ResourceId,
    target: TextureTarget,
    owner: Option<SurfaceOwner>,
    state: RwLock<TextureState>,
    changes: ChangeQueue<MipmapRegion>,
}

impl Texture {
    /// Create a texture with blank images for every layer and level.
    pub fn new(descriptor: TextureDescriptor) -> Self {
        Self::build(descriptor, None, ChangeQueue::<MipmapRegion>::DEFAULT_CAPACITY)
    }

    /// Create a texture owned by an offscreen surface.
    pub fn with_owner(descriptor: TextureDescriptor, owner: SurfaceOwner) -> Self {
        Self::build(descriptor, Some(owner), ChangeQueue::<MipmapRegion>::DEFAULT_CAPACITY)
    }

    /// Create a texture whose change log retains at most `capacity` edits.
    pub fn with_history_capacity(descriptor: TextureDescriptor, capacity: usize) -> Self {
        Self::build(descriptor, None, capacity)
    }

    fn build(descriptor: TextureDescriptor, owner: Option<SurfaceOwner>, capacity: usize) -> Self {
        let depth = match descriptor.target {
            TextureTarget::T3d => descriptor.depth,
            _ => 1,
        };
        let height = match descriptor.target {
            TextureTarget::T1d => 1,
            _ => descriptor.height,
        };
        let images = TextureState::blank_images(
            descriptor.target.layer_count(),
            descriptor.mip_levels.max(1),
            descriptor.format,
            descriptor.data_type,
            (descriptor.width, height, depth),
        );
        Self {
            id: ResourceId::next(),
            target: descriptor.target,
            owner,
            state: RwLock::new(TextureState {
                format: descriptor.format,
                data_type: descriptor.data_type,
                width: descriptor.width,
                height,
                depth,
                images,
                parameters: descriptor.parameters,
            }),
            changes: ChangeQueue::with_capacity(capacity),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    /// The surface owning this texture, if any.
    pub fn owner(&self) -> Option<&SurfaceOwner> {
        self.owner.as_ref()
    }

    /// Edit log of this texture.
    pub fn changes(&self) -> &ChangeQueue<MipmapRegion> {
        &self.changes
    }

    /// Lock the texture for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, TextureState> {
        self.state.read()
    }

    pub fn parameters(&self) -> TextureParameters {
        self.state.read().parameters
    }

    /// Replace the sampling parameters.
    pub fn set_parameters(&self, parameters: TextureParameters) {
        self.state.write().parameters = parameters;
    }

    /// Replace the image at `layer`, `level` wholesale.
    ///
    /// Returns false if the layer or level does not exist.
    pub fn set_image(&self, layer: usize, level: usize, data: BufferData) -> bool {
        let mut state = self.state.write();
        let Some(slot) = state.images.get_mut(layer).and_then(|levels| levels.get_mut(level))
        else {
            return false;
        };
        *slot = data;
        self.changes.touch();
        true
    }

    /// Edit part of an image in place and record the edited region.
    ///
    /// `edit` receives the whole image's bytes; images without bytes only
    /// record the region. Returns false if the layer or level does not exist.
    pub fn modify_image(
        &self,
        layer: usize,
        level: usize,
        region: ImageRegion,
        edit: impl FnOnce(&mut [u8]),
    ) -> bool {
        let mut state = self.state.write();
        let Some(image) = state.images.get_mut(layer).and_then(|levels| levels.get_mut(level))
        else {
            return false;
        };
        if let Some(bytes) = image.bytes_mut() {
            edit(bytes);
        }
        self.changes.record_edit(MipmapRegion {
            layer,
            level,
            region,
        });
        true
    }

    /// Record that a region changed without touching the bytes.
    pub fn mark_dirty(&self, layer: usize, level: usize, region: ImageRegion) {
        let _state = self.state.write();
        self.changes.record_edit(MipmapRegion {
            layer,
            level,
            region,
        });
    }

    /// Change format, size or mip count, discarding every image.
    pub fn redefine(
        &self,
        format: TextureFormat,
        data_type: DataType,
        (width, height, depth): (u32, u32, u32),
        mip_levels: usize,
    ) {
        let mut state = self.state.write();
        let height = if self.target == TextureTarget::T1d { 1 } else { height };
        let depth = if self.target == TextureTarget::T3d { depth } else { 1 };
        state.images = TextureState::blank_images(
            self.target.layer_count(),
            mip_levels.max(1),
            format,
            data_type,
            (width, height, depth),
        );
        state.format = format;
        state.data_type = data_type;
        state.width = width;
        state.height = height;
        state.depth = depth;
        self.changes.touch();
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);
