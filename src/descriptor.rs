use anyhow::{Context, Result};
use serde::Deserialize;

/// One entry of a type-descriptor document: the vocabulary record for a
/// component type the palette and the logic editors can use.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    /// Fully qualified type name, e.g. `com.acme.widgets.Gauge`.
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub help_string: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(default)]
    pub editor_type: String,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub editor_args: Vec<String>,
}

/// A descriptor source is either a list of descriptors (an extension package
/// declaring several types) or a single descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DescriptorDocument {
    Many(Vec<ComponentDescriptor>),
    One(Box<ComponentDescriptor>),
}

impl DescriptorDocument {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing component descriptor document")
    }

    pub fn into_descriptors(self) -> Vec<ComponentDescriptor> {
        match self {
            DescriptorDocument::Many(descriptors) => descriptors,
            DescriptorDocument::One(descriptor) => vec![*descriptor],
        }
    }
}

/// Package of a fully qualified type name: everything before the final `.`.
pub fn package_of(type_name: &str) -> &str {
    type_name.rfind('.').map(|pos| &type_name[..pos]).unwrap_or("")
}

pub fn simple_name(type_name: &str) -> &str {
    type_name.rfind('.').map(|pos| &type_name[pos + 1..]).unwrap_or(type_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_descriptor_list() {
        let doc = DescriptorDocument::parse(
            r#"[
                { "type": "com.acme.widgets.Gauge", "name": "Gauge", "version": 2 },
                { "type": "com.acme.widgets.Dial", "name": "Dial" }
            ]"#,
        )
        .expect("list document parses");
        let descriptors = doc.into_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].type_name, "com.acme.widgets.Gauge");
        assert_eq!(descriptors[0].version, 2);
        assert_eq!(descriptors[1].version, 0);
    }

    #[test]
    fn parses_a_single_descriptor() {
        let doc = DescriptorDocument::parse(
            r#"{
                "type": "com.acme.solo.Beacon",
                "name": "Beacon",
                "properties": [
                    { "name": "Interval", "editorType": "text", "defaultValue": "500" }
                ]
            }"#,
        )
        .expect("single document parses");
        let descriptors = doc.into_descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].properties[0].name, "Interval");
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(DescriptorDocument::parse("{ not json").is_err());
        assert!(DescriptorDocument::parse(r#"{"name": "missing type"}"#).is_err());
    }

    #[test]
    fn splits_package_and_simple_name() {
        assert_eq!(package_of("com.acme.widgets.Gauge"), "com.acme.widgets");
        assert_eq!(simple_name("com.acme.widgets.Gauge"), "Gauge");
        assert_eq!(package_of("Bare"), "");
        assert_eq!(simple_name("Bare"), "Bare");
    }
}
