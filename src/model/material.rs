//! Materials and texture maps
//!
//! A [`Material`] holds the fields shared by every shading model plus a
//! [`MaterialKind`] carrying the Phong or physically based specifics.
//! Equality is structural and epsilon based for floats; decoders use it to
//! deduplicate materials (see [`Model::add_unique_material`](super::Model::add_unique_material)).

use super::color::RGBColor;
use crate::geometry::{Coord2D, is_equal, is_lower};
use std::sync::Arc;

/// An image referenced by a material
#[derive(Debug, Clone)]
pub struct TextureMap {
    /// File name of the image, as referenced by the source file
    pub name: String,
    /// Mime type when known (embedded images), otherwise `None`
    pub mime_type: Option<String>,
    /// Image content, when it could be resolved
    pub buffer: Option<Arc<[u8]>>,
    /// UV offset
    pub offset: Coord2D,
    /// UV scale
    pub scale: Coord2D,
    /// UV rotation in radians
    pub rotation: f64,
}

impl TextureMap {
    /// Create a texture map with an identity UV transform
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            buffer: None,
            offset: Coord2D::new(0.0, 0.0),
            scale: Coord2D::new(1.0, 1.0),
            rotation: 0.0,
        }
    }

    /// Returns true if the image content is present
    pub fn is_valid(&self) -> bool {
        self.buffer.is_some()
    }

    /// Returns true if offset, scale or rotation differ from identity
    pub fn has_transformation(&self) -> bool {
        self.offset != Coord2D::new(0.0, 0.0)
            || self.scale != Coord2D::new(1.0, 1.0)
            || !is_equal(self.rotation, 0.0)
    }
}

/// Texture maps compare by name, mime type and UV transform; the image
/// bytes are not compared.
impl PartialEq for TextureMap {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.mime_type == other.mime_type
            && self.offset == other.offset
            && self.scale == other.scale
            && is_equal(self.rotation, other.rotation)
    }
}

/// Shading model specific material fields
#[derive(Debug, Clone)]
pub enum MaterialKind {
    /// Classic ambient/diffuse/specular material
    Phong {
        /// Ambient color
        ambient: RGBColor,
        /// Specular color
        specular: RGBColor,
        /// Shininess in `0.0..=1.0`
        shininess: f64,
        /// Specular map
        specular_map: Option<TextureMap>,
    },
    /// Metallic-roughness material
    Physical {
        /// Metalness in `0.0..=1.0`
        metalness: f64,
        /// Roughness in `0.0..=1.0`
        roughness: f64,
        /// Metalness (and roughness) map
        metalness_map: Option<TextureMap>,
    },
}

impl PartialEq for MaterialKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                MaterialKind::Phong {
                    ambient: a1,
                    specular: s1,
                    shininess: sh1,
                    specular_map: m1,
                },
                MaterialKind::Phong {
                    ambient: a2,
                    specular: s2,
                    shininess: sh2,
                    specular_map: m2,
                },
            ) => a1 == a2 && s1 == s2 && is_equal(*sh1, *sh2) && m1 == m2,
            (
                MaterialKind::Physical {
                    metalness: me1,
                    roughness: r1,
                    metalness_map: m1,
                },
                MaterialKind::Physical {
                    metalness: me2,
                    roughness: r2,
                    metalness_map: m2,
                },
            ) => is_equal(*me1, *me2) && is_equal(*r1, *r2) && m1 == m2,
            _ => false,
        }
    }
}

/// A surface material
#[derive(Debug, Clone)]
pub struct Material {
    /// Phong or physical specific fields
    pub kind: MaterialKind,
    /// True for the material the finalizer creates for unassigned triangles
    pub is_default: bool,
    /// Material name
    pub name: String,
    /// Base (diffuse) color
    pub color: RGBColor,
    /// True when every triangle using this material carries vertex colors
    pub vertex_colors: bool,
    /// Emissive color
    pub emissive: RGBColor,
    /// Opacity in `0.0..=1.0`
    pub opacity: f64,
    /// True when the material should be rendered with blending
    pub transparent: bool,
    /// Diffuse (base color) map
    pub diffuse_map: Option<TextureMap>,
    /// Bump map
    pub bump_map: Option<TextureMap>,
    /// Normal map
    pub normal_map: Option<TextureMap>,
    /// Emissive map
    pub emissive_map: Option<TextureMap>,
    /// Alpha cutoff in `0.0..=1.0`
    pub alpha_test: f64,
    /// True when the diffuse map is multiplied by the base color
    pub multiply_diffuse_map: bool,
}

impl Material {
    /// A black Phong material
    pub fn phong() -> Self {
        Self::with_kind(MaterialKind::Phong {
            ambient: RGBColor::default(),
            specular: RGBColor::default(),
            shininess: 0.0,
            specular_map: None,
        })
    }

    /// A black physical material with metalness 0 and roughness 1
    pub fn physical() -> Self {
        Self::with_kind(MaterialKind::Physical {
            metalness: 0.0,
            roughness: 1.0,
            metalness_map: None,
        })
    }

    fn with_kind(kind: MaterialKind) -> Self {
        Self {
            kind,
            is_default: false,
            name: String::new(),
            color: RGBColor::default(),
            vertex_colors: false,
            emissive: RGBColor::default(),
            opacity: 1.0,
            transparent: false,
            diffuse_map: None,
            bump_map: None,
            normal_map: None,
            emissive_map: None,
            alpha_test: 0.0,
            multiply_diffuse_map: false,
        }
    }

    /// Returns true for Phong materials
    pub fn is_phong(&self) -> bool {
        matches!(self.kind, MaterialKind::Phong { .. })
    }

    /// Set `transparent` from the current opacity
    pub fn update_transparency(&mut self) {
        self.transparent = is_lower(self.opacity, 1.0);
    }

    /// All texture maps of the material
    pub fn texture_maps(&self) -> Vec<&TextureMap> {
        let mut maps: Vec<&TextureMap> = [
            &self.diffuse_map,
            &self.bump_map,
            &self.normal_map,
            &self.emissive_map,
        ]
        .into_iter()
        .flatten()
        .collect();
        match &self.kind {
            MaterialKind::Phong { specular_map, .. } => maps.extend(specular_map),
            MaterialKind::Physical { metalness_map, .. } => maps.extend(metalness_map),
        }
        maps
    }
}

impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.is_default == other.is_default
            && self.name == other.name
            && self.color == other.color
            && self.vertex_colors == other.vertex_colors
            && self.emissive == other.emissive
            && is_equal(self.opacity, other.opacity)
            && self.transparent == other.transparent
            && self.diffuse_map == other.diffuse_map
            && self.bump_map == other.bump_map
            && self.normal_map == other.normal_map
            && self.emissive_map == other.emissive_map
            && is_equal(self.alpha_test, other.alpha_test)
            && self.multiply_diffuse_map == other.multiply_diffuse_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let phong = Material::phong();
        assert!(phong.is_phong());
        assert_eq!(phong.opacity, 1.0);
        assert!(!phong.transparent);

        let physical = Material::physical();
        assert!(!physical.is_phong());
        assert!(matches!(
            physical.kind,
            MaterialKind::Physical { roughness, .. } if roughness == 1.0
        ));
    }

    #[test]
    fn test_structural_equality() {
        let mut a = Material::phong();
        a.name = "red".to_string();
        a.color = RGBColor::new(255, 0, 0);
        let mut b = a.clone();
        assert_eq!(a, b);

        b.opacity = 1.0 - 1.0e-10;
        assert_eq!(a, b);

        b.opacity = 0.5;
        assert_ne!(a, b);
        assert_ne!(Material::phong(), Material::physical());
    }

    #[test]
    fn test_texture_map_equality_ignores_buffer() {
        let mut a = TextureMap::new("wood.png");
        let mut b = TextureMap::new("wood.png");
        a.buffer = Some(Arc::from(vec![1u8, 2, 3]));
        assert_eq!(a, b);

        b.offset = Coord2D::new(0.5, 0.0);
        assert_ne!(a, b);
        assert!(b.has_transformation());
        assert!(!a.has_transformation());

        let mut c = TextureMap::new("wood.png");
        c.mime_type = Some("image/png".to_string());
        assert_ne!(a, c);
    }

    #[test]
    fn test_update_transparency() {
        let mut material = Material::phong();
        material.opacity = 0.5;
        material.update_transparency();
        assert!(material.transparent);
        material.opacity = 1.0 - 1.0e-9;
        material.update_transparency();
        assert!(!material.transparent);
    }

    #[test]
    fn test_texture_maps_listing() {
        let mut material = Material::phong();
        material.diffuse_map = Some(TextureMap::new("d.png"));
        if let MaterialKind::Phong { specular_map, .. } = &mut material.kind {
            *specular_map = Some(TextureMap::new("s.png"));
        }
        let names: Vec<&str> = material
            .texture_maps()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["d.png", "s.png"]);
    }
}
