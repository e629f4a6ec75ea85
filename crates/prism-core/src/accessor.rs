//! Accessor resolution and decoding.
//!
//! [`ResolvedAccessor`] is the flattened accessor → buffer view → buffer chain
//! a device needs to bind vertex data. [`AccessorView`] decodes elements on
//! the CPU for bounds, tangents, and the software device.

use glam::{Vec2, Vec3, Vec4};

use crate::errors::CoreError;
use crate::scene::{BufferTarget, ComponentType, Document, Primitive};

/// An accessor with every indirection followed and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAccessor {
    pub accessor: usize,
    pub buffer_view: usize,
    pub buffer: usize,
    /// Absolute offset into the buffer: accessor offset plus view offset.
    pub byte_offset: usize,
    /// View stride, or the element size when the view is tightly packed.
    pub byte_stride: usize,
    pub component_type: ComponentType,
    pub components: usize,
    pub normalized: bool,
    pub count: usize,
    pub target: Option<BufferTarget>,
}

impl ResolvedAccessor {
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.components
    }

    /// Byte range of the buffer touched by this accessor, or `None` when it
    /// does not fit in `usize`.
    pub fn byte_len(&self) -> Option<usize> {
        match self.count.checked_sub(1) {
            None => Some(0),
            Some(last) => last
                .checked_mul(self.byte_stride)?
                .checked_add(self.element_size()),
        }
    }
}

impl Document {
    /// Follow an accessor to its buffer, checking every index and range.
    pub fn resolve_accessor(&self, index: usize) -> Result<ResolvedAccessor, CoreError> {
        let accessor = self.accessor(index)?;
        let view_index = accessor.buffer_view.ok_or_else(|| CoreError::UnsupportedLayout {
            accessor: index,
            reason: "accessor has no buffer view".to_string(),
        })?;
        let view = self.buffer_view(view_index)?;
        let buffer = self.buffer(view.buffer)?;
        let out_of_bounds = || CoreError::OutOfBounds {
            accessor: index,
            buffer: view.buffer,
        };

        let resolved = ResolvedAccessor {
            accessor: index,
            buffer_view: view_index,
            buffer: view.buffer,
            byte_offset: accessor
                .byte_offset
                .checked_add(view.byte_offset)
                .ok_or_else(out_of_bounds)?,
            byte_stride: view
                .byte_stride
                .filter(|&stride| stride > 0)
                .unwrap_or_else(|| accessor.element_size()),
            component_type: accessor.component_type,
            components: accessor.dimensions.components(),
            normalized: accessor.normalized,
            count: accessor.count,
            target: view.target,
        };

        let accessor_end = resolved
            .byte_len()
            .and_then(|len| accessor.byte_offset.checked_add(len))
            .ok_or_else(out_of_bounds)?;
        let view_end = view
            .byte_offset
            .checked_add(view.byte_length)
            .ok_or_else(out_of_bounds)?;
        if accessor_end > view.byte_length || view_end > buffer.data.len() {
            return Err(out_of_bounds());
        }

        Ok(resolved)
    }

    /// Resolve an accessor that feeds a vertex attribute slot.
    pub fn resolve_vertex_accessor(&self, index: usize) -> Result<ResolvedAccessor, CoreError> {
        let resolved = self.resolve_accessor(index)?;
        expect_target(&resolved, BufferTarget::Vertex)?;
        Ok(resolved)
    }

    /// Resolve an accessor that feeds the element index source.
    pub fn resolve_index_accessor(&self, index: usize) -> Result<ResolvedAccessor, CoreError> {
        let resolved = self.resolve_accessor(index)?;
        expect_target(&resolved, BufferTarget::Index)?;
        if resolved.components != 1 || !resolved.component_type.is_index_type() {
            return Err(CoreError::UnsupportedLayout {
                accessor: index,
                reason: "indices must be unsigned scalars".to_string(),
            });
        }
        Ok(resolved)
    }

    /// Decoding view over an accessor.
    pub fn accessor_view(&self, index: usize) -> Result<AccessorView<'_>, CoreError> {
        let accessor = self.accessor(index)?;
        if accessor.buffer_view.is_none() {
            return Ok(AccessorView {
                data: &[],
                stride: 0,
                component_type: accessor.component_type,
                components: accessor.dimensions.components(),
                normalized: accessor.normalized,
                count: accessor.count,
            });
        }
        let resolved = self.resolve_accessor(index)?;
        let buffer = self.buffer(resolved.buffer)?;
        let data = resolved
            .byte_len()
            .and_then(|len| resolved.byte_offset.checked_add(len))
            .and_then(|end| buffer.data.get(resolved.byte_offset..end))
            .ok_or(CoreError::OutOfBounds {
                accessor: index,
                buffer: resolved.buffer,
            })?;
        Ok(AccessorView {
            data,
            stride: resolved.byte_stride,
            component_type: resolved.component_type,
            components: resolved.components,
            normalized: resolved.normalized,
            count: resolved.count,
        })
    }

    /// Vertex indices of a primitive, or `None` when it is drawn non-indexed.
    pub fn primitive_indices(&self, primitive: &Primitive) -> Result<Option<Vec<u32>>, CoreError> {
        match primitive.indices {
            Some(index) => {
                let view = self.accessor_view(index)?;
                Ok(Some((0..view.len()).map(|i| view.read_index(i)).collect()))
            }
            None => Ok(None),
        }
    }
}

fn expect_target(resolved: &ResolvedAccessor, expected: BufferTarget) -> Result<(), CoreError> {
    match resolved.target {
        Some(found) if found != expected => Err(CoreError::TargetMismatch {
            view: resolved.buffer_view,
            expected: expected.name(),
            found: found.name(),
        }),
        _ => Ok(()),
    }
}

/// Element-wise reader over validated accessor bytes.
///
/// Element indices must be below [`AccessorView::len`].
#[derive(Debug, Clone, Copy)]
pub struct AccessorView<'a> {
    data: &'a [u8],
    stride: usize,
    component_type: ComponentType,
    components: usize,
    normalized: bool,
    count: usize,
}

impl<'a> AccessorView<'a> {
    /// View over raw bytes already bound elsewhere, e.g. a device buffer.
    ///
    /// `count` is clamped to the elements that fit in `data`.
    pub fn from_bytes(
        data: &'a [u8],
        stride: usize,
        component_type: ComponentType,
        components: usize,
        normalized: bool,
        count: usize,
    ) -> Self {
        let element = component_type.size() * components;
        let fits = if stride == 0 || data.len() < element {
            0
        } else {
            (data.len() - element) / stride + 1
        };
        Self {
            data,
            stride,
            component_type,
            components,
            normalized,
            count: count.min(fits),
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// True for accessors without a buffer view, whose elements all read as zero.
    pub fn is_zeroed(&self) -> bool {
        self.data.is_empty()
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Read up to `out.len()` components of element `i`; missing ones are zero.
    pub fn read_into(&self, i: usize, out: &mut [f32]) {
        out.fill(0.0);
        if self.data.is_empty() {
            return;
        }
        let base = i * self.stride;
        let size = self.component_type.size();
        for (c, slot) in out.iter_mut().take(self.components).enumerate() {
            *slot = self.component(base + c * size);
        }
    }

    pub fn read_vec2(&self, i: usize) -> Vec2 {
        let mut v = [0.0; 2];
        self.read_into(i, &mut v);
        Vec2::from_array(v)
    }

    pub fn read_vec3(&self, i: usize) -> Vec3 {
        let mut v = [0.0; 3];
        self.read_into(i, &mut v);
        Vec3::from_array(v)
    }

    pub fn read_vec4(&self, i: usize) -> Vec4 {
        let mut v = [0.0; 4];
        self.read_into(i, &mut v);
        Vec4::from_array(v)
    }

    /// Read element `i` as an unsigned integer index.
    pub fn read_index(&self, i: usize) -> u32 {
        if self.data.is_empty() {
            return 0;
        }
        let b = &self.data[i * self.stride..];
        match self.component_type {
            ComponentType::U8 | ComponentType::I8 => b[0] as u32,
            ComponentType::U16 | ComponentType::I16 => u16::from_le_bytes([b[0], b[1]]) as u32,
            ComponentType::U32 => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            ComponentType::F32 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as u32,
        }
    }

    pub fn iter_vec3(&self) -> impl Iterator<Item = Vec3> + '_ {
        (0..self.count).map(move |i| self.read_vec3(i))
    }

    fn component(&self, offset: usize) -> f32 {
        let b = &self.data[offset..];
        match (self.component_type, self.normalized) {
            (ComponentType::F32, _) => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            (ComponentType::I8, false) => b[0] as i8 as f32,
            (ComponentType::I8, true) => (b[0] as i8 as f32 / 127.0).max(-1.0),
            (ComponentType::U8, false) => b[0] as f32,
            (ComponentType::U8, true) => b[0] as f32 / 255.0,
            (ComponentType::I16, false) => i16::from_le_bytes([b[0], b[1]]) as f32,
            (ComponentType::I16, true) => (i16::from_le_bytes([b[0], b[1]]) as f32 / 32767.0).max(-1.0),
            (ComponentType::U16, false) => u16::from_le_bytes([b[0], b[1]]) as f32,
            (ComponentType::U16, true) => u16::from_le_bytes([b[0], b[1]]) as f32 / 65535.0,
            (ComponentType::U32, _) => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32,
        }
    }
}
