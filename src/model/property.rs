//! Named metadata attached to models, nodes and meshes

use super::color::RGBColor;

/// A typed property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Free text
    Text(String),
    /// Whole number
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// Flag
    Boolean(bool),
    /// Ratio in `0.0..=1.0`
    Percent(f64),
    /// Color
    Color(RGBColor),
}

/// A single named property
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Property value
    pub value: PropertyValue,
}

impl Property {
    /// Create a new property
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A named group of properties
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyGroup {
    /// Group name (e.g. "Asset properties")
    pub name: String,
    /// Properties in insertion order
    pub properties: Vec<Property>,
}

impl PropertyGroup {
    /// Create an empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Append a property
    pub fn add_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Number of properties
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Look up a property by name
    pub fn find(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_lookup() {
        let mut group = PropertyGroup::new("Asset properties");
        group.add_property(Property::new(
            "generator",
            PropertyValue::Text("tool".to_string()),
        ));
        group.add_property(Property::new("count", PropertyValue::Integer(3)));
        assert_eq!(group.property_count(), 2);
        assert_eq!(
            group.find("count").map(|p| &p.value),
            Some(&PropertyValue::Integer(3))
        );
        assert!(group.find("missing").is_none());
    }
}
