//! Typed, strided reads over glTF buffer views

use crate::error::{Error, Result};
use crate::io::BinaryReader;

/// Component type of an accessor, by its glTF enum value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    /// `5120`
    Int8,
    /// `5121`
    UInt8,
    /// `5122`
    Int16,
    /// `5123`
    UInt16,
    /// `5125`
    UInt32,
    /// `5126`
    Float32,
}

impl ComponentType {
    /// Map a glTF `componentType` value
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            5120 => ComponentType::Int8,
            5121 => ComponentType::UInt8,
            5122 => ComponentType::Int16,
            5123 => ComponentType::UInt16,
            5125 => ComponentType::UInt32,
            5126 => ComponentType::Float32,
            _ => return None,
        })
    }

    /// Size of one component in bytes
    pub fn size(self) -> usize {
        match self {
            ComponentType::Int8 | ComponentType::UInt8 => 1,
            ComponentType::Int16 | ComponentType::UInt16 => 2,
            ComponentType::UInt32 | ComponentType::Float32 => 4,
        }
    }
}

/// Element arity of an accessor
///
/// Matrix types are not used by mesh attributes and are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorType {
    /// One component
    Scalar,
    /// Two components
    Vec2,
    /// Three components
    Vec3,
    /// Four components
    Vec4,
}

impl AccessorType {
    /// Map a glTF `type` string
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "SCALAR" => AccessorType::Scalar,
            "VEC2" => AccessorType::Vec2,
            "VEC3" => AccessorType::Vec3,
            "VEC4" => AccessorType::Vec4,
            _ => return None,
        })
    }

    /// Number of components per element
    pub fn component_count(self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 => 4,
        }
    }
}

/// Where and how the elements of an accessor are laid out in a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessorLayout {
    /// Component type
    pub component_type: ComponentType,
    /// Element arity
    pub accessor_type: AccessorType,
    /// Number of elements
    pub count: usize,
    /// Offset of the first element (buffer view offset plus accessor offset)
    pub byte_offset: usize,
    /// Distance between element starts; tightly packed when `None`
    pub byte_stride: Option<usize>,
}

impl AccessorLayout {
    /// A tightly packed layout starting at offset 0
    pub fn packed(
        component_type: ComponentType,
        accessor_type: AccessorType,
        count: usize,
    ) -> Self {
        Self {
            component_type,
            accessor_type,
            count,
            byte_offset: 0,
            byte_stride: None,
        }
    }

    /// Set the offset of the first element
    pub fn with_byte_offset(mut self, byte_offset: usize) -> Self {
        self.byte_offset = byte_offset;
        self
    }

    /// Set the element stride; `0` means tightly packed
    pub fn with_byte_stride(mut self, byte_stride: usize) -> Self {
        self.byte_stride = (byte_stride != 0).then_some(byte_stride);
        self
    }

    fn element_size(&self) -> usize {
        self.component_type.size() * self.accessor_type.component_count()
    }
}

/// Reader for the elements of one accessor
///
/// Elements come back as `[f64; 4]`; components beyond the accessor arity
/// are zero. A sparse overlay replaces the elements at the listed indices.
///
/// # Example
///
/// ```
/// use mesh3d_import::importer::{AccessorLayout, AccessorReader, AccessorType, ComponentType};
///
/// let data: Vec<u8> = [1u16, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
/// let layout = AccessorLayout::packed(ComponentType::UInt16, AccessorType::Scalar, 3);
/// let values = AccessorReader::new(&data, layout).read_scalars().unwrap();
/// assert_eq!(values, vec![1.0, 2.0, 3.0]);
/// ```
#[derive(Debug, Clone)]
pub struct AccessorReader<'b> {
    buffer: Option<&'b [u8]>,
    layout: AccessorLayout,
    sparse: Option<Box<(AccessorReader<'b>, AccessorReader<'b>)>>,
}

impl<'b> AccessorReader<'b> {
    /// Create a reader over `buffer`
    pub fn new(buffer: &'b [u8], layout: AccessorLayout) -> Self {
        Self {
            buffer: Some(buffer),
            layout,
            sparse: None,
        }
    }

    /// A reader whose dense elements are all zero
    ///
    /// Used for accessors without a buffer view, which only carry sparse
    /// values.
    pub fn zeroed(layout: AccessorLayout) -> Self {
        Self {
            buffer: None,
            layout,
            sparse: None,
        }
    }

    /// Overlay sparse values; `indices` must be a scalar accessor
    pub fn with_sparse(mut self, indices: AccessorReader<'b>, values: AccessorReader<'b>) -> Self {
        self.sparse = Some(Box::new((indices, values)));
        self
    }

    /// The layout of the dense part
    pub fn layout(&self) -> &AccessorLayout {
        &self.layout
    }

    /// Number of elements
    pub fn count(&self) -> usize {
        self.layout.count
    }

    /// Read every element, with the sparse overlay applied
    ///
    /// # Errors
    ///
    /// Returns [`Error::TruncatedInput`] when an element lies outside the
    /// buffer.
    pub fn read_elements(&self) -> Result<Vec<[f64; 4]>> {
        let mut elements = self.read_dense()?;
        if let Some(sparse) = &self.sparse {
            let (indices, values) = sparse.as_ref();
            let indices = indices.read_dense()?;
            let values = values.read_dense()?;
            for (index, value) in indices.iter().zip(values) {
                let index = index[0];
                if index < 0.0 {
                    continue;
                }
                if let Some(element) = elements.get_mut(index as usize) {
                    *element = value;
                }
            }
        }
        Ok(elements)
    }

    /// Read the first component of every element
    pub fn read_scalars(&self) -> Result<Vec<f64>> {
        Ok(self.read_elements()?.into_iter().map(|e| e[0]).collect())
    }

    fn read_dense(&self) -> Result<Vec<[f64; 4]>> {
        let layout = &self.layout;
        let Some(buffer) = self.buffer else {
            if layout.count > MAX_ZEROED_ELEMENTS {
                return Err(Error::invalid_format_context(
                    "glTF accessor",
                    &format!("{} elements without a buffer view", layout.count),
                ));
            }
            return Ok(vec![[0.0; 4]; layout.count]);
        };
        let stride = layout.byte_stride.unwrap_or_else(|| layout.element_size());
        let components = layout.accessor_type.component_count();
        let mut reader = BinaryReader::little_endian(buffer);
        let capacity = layout.count.min(buffer.len() / stride.max(1) + 1);
        let mut elements = Vec::with_capacity(capacity);
        for index in 0..layout.count {
            let start = index
                .checked_mul(stride)
                .and_then(|offset| offset.checked_add(layout.byte_offset))
                .ok_or_else(|| Error::truncated(stride, layout.byte_offset, buffer.len()))?;
            reader.set_position(start)?;
            let mut element = [0.0; 4];
            for component in element.iter_mut().take(components) {
                *component = read_component(&mut reader, layout.component_type)?;
            }
            elements.push(element);
        }
        Ok(elements)
    }
}

/// Upper bound on the element count of an accessor with no buffer view
const MAX_ZEROED_ELEMENTS: usize = 1 << 22;

fn read_component(reader: &mut BinaryReader<'_>, component_type: ComponentType) -> Result<f64> {
    Ok(match component_type {
        ComponentType::Int8 => reader.read_i8()? as f64,
        ComponentType::UInt8 => reader.read_u8()? as f64,
        ComponentType::Int16 => reader.read_i16()? as f64,
        ComponentType::UInt16 => reader.read_u16()? as f64,
        ComponentType::UInt32 => reader.read_u32()? as f64,
        ComponentType::Float32 => reader.read_f32()? as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_component_codes() {
        assert_eq!(ComponentType::from_code(5126), Some(ComponentType::Float32));
        assert_eq!(ComponentType::from_code(5125).map(ComponentType::size), Some(4));
        assert_eq!(ComponentType::from_code(5124), None);
        assert_eq!(AccessorType::from_name("VEC3"), Some(AccessorType::Vec3));
        assert_eq!(AccessorType::from_name("MAT4"), None);
    }

    #[test]
    fn test_strided_read() {
        // interleaved position (vec3) and a 4-byte pad
        let mut data = Vec::new();
        for i in 0..3 {
            data.extend(f32_bytes(&[i as f32, 10.0 + i as f32, 20.0 + i as f32]));
            data.extend_from_slice(&[0xAA; 4]);
        }
        let layout = AccessorLayout::packed(ComponentType::Float32, AccessorType::Vec3, 3)
            .with_byte_stride(16);
        let elements = AccessorReader::new(&data, layout).read_elements().unwrap();
        assert_eq!(elements[2], [2.0, 12.0, 22.0, 0.0]);
    }

    #[test]
    fn test_zero_stride_is_packed() {
        let layout = AccessorLayout::packed(ComponentType::UInt8, AccessorType::Vec2, 2)
            .with_byte_stride(0)
            .with_byte_offset(1);
        assert_eq!(layout.byte_stride, None);
        let elements = AccessorReader::new(&[9, 1, 2, 3, 4], layout).read_elements().unwrap();
        assert_eq!(elements, vec![[1.0, 2.0, 0.0, 0.0], [3.0, 4.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_sparse_overlay() {
        let dense = f32_bytes(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let indices: Vec<u8> = [1u16, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let values = f32_bytes(&[10.0, 30.0]);

        let reader = AccessorReader::new(
            &dense,
            AccessorLayout::packed(ComponentType::Float32, AccessorType::Scalar, 5),
        )
        .with_sparse(
            AccessorReader::new(
                &indices,
                AccessorLayout::packed(ComponentType::UInt16, AccessorType::Scalar, 2),
            ),
            AccessorReader::new(
                &values,
                AccessorLayout::packed(ComponentType::Float32, AccessorType::Scalar, 2),
            ),
        );
        assert_eq!(reader.read_scalars().unwrap(), vec![0.0, 10.0, 2.0, 30.0, 4.0]);
    }

    #[test]
    fn test_out_of_bounds() {
        let layout = AccessorLayout::packed(ComponentType::Float32, AccessorType::Vec3, 2);
        let result = AccessorReader::new(&[0u8; 20], layout).read_elements();
        assert!(matches!(result, Err(Error::TruncatedInput { .. })));
    }

    #[test]
    fn test_zeroed_with_sparse() {
        let indices = [2u8];
        let values = f32_bytes(&[7.0]);
        let layout = AccessorLayout::packed(ComponentType::Float32, AccessorType::Scalar, 3);
        let reader = AccessorReader::zeroed(layout).with_sparse(
            AccessorReader::new(
                &indices,
                AccessorLayout::packed(ComponentType::UInt8, AccessorType::Scalar, 1),
            ),
            AccessorReader::new(
                &values,
                AccessorLayout::packed(ComponentType::Float32, AccessorType::Scalar, 1),
            ),
        );
        assert_eq!(reader.read_scalars().unwrap(), vec![0.0, 0.0, 7.0]);
    }

    #[test]
    fn test_zeroed_count_too_large() {
        let layout =
            AccessorLayout::packed(ComponentType::Float32, AccessorType::Vec3, usize::MAX);
        let result = AccessorReader::zeroed(layout).read_elements();
        assert!(matches!(result, Err(Error::InvalidFormat(_))));

        let layout = AccessorLayout::packed(ComponentType::Float32, AccessorType::Scalar, 1000);
        assert_eq!(AccessorReader::zeroed(layout).read_elements().unwrap().len(), 1000);
    }

    #[test]
    fn test_count_larger_than_buffer() {
        let data = f32_bytes(&[1.0, 2.0, 3.0]);
        let layout =
            AccessorLayout::packed(ComponentType::Float32, AccessorType::Vec3, usize::MAX);
        let result = AccessorReader::new(&data, layout).read_elements();
        assert!(matches!(result, Err(Error::TruncatedInput { .. })));
    }

    #[test]
    fn test_sparse_count_larger_than_buffer() {
        let indices = [0u8];
        let values = f32_bytes(&[7.0]);
        let layout = AccessorLayout::packed(ComponentType::Float32, AccessorType::Scalar, 2);
        let reader = AccessorReader::zeroed(layout).with_sparse(
            AccessorReader::new(
                &indices,
                AccessorLayout::packed(ComponentType::UInt8, AccessorType::Scalar, usize::MAX),
            ),
            AccessorReader::new(
                &values,
                AccessorLayout::packed(ComponentType::Float32, AccessorType::Scalar, usize::MAX),
            ),
        );
        assert!(matches!(reader.read_elements(), Err(Error::TruncatedInput { .. })));
    }
}
