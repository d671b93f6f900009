//! Core schema types: attribute definitions and the schemas that own them.
//!
//! A [`Schema`] owns its attribute tree as an arena of [`SchemaAttribute`]
//! nodes. Children reference their sub-attributes by index and every node
//! carries its parent's index, so the tree can be walked in both directions
//! without owning pointers or reference cycles. The arena is released
//! together with the schema.

use crate::error::RegistrationError;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Index of an attribute node inside its schema's arena.
pub type AttrIndex = usize;

/// SCIM attribute data types as defined in RFC 7643 §2.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Boolean,
    Decimal,
    Integer,
    DateTime,
    Binary,
    Reference,
    Complex,
}

impl AttributeType {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "decimal" => Some(Self::Decimal),
            "integer" => Some(Self::Integer),
            "datetime" => Some(Self::DateTime),
            "binary" => Some(Self::Binary),
            "reference" => Some(Self::Reference),
            "complex" => Some(Self::Complex),
            _ => None,
        }
    }

    /// The RFC 7643 keyword for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::DateTime => "dateTime",
            Self::Binary => "binary",
            Self::Reference => "reference",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute mutability characteristics (RFC 7643 §2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mutability {
    ReadOnly,
    #[default]
    ReadWrite,
    Immutable,
    WriteOnly,
}

impl Mutability {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "readonly" => Some(Self::ReadOnly),
            "readwrite" => Some(Self::ReadWrite),
            "immutable" => Some(Self::Immutable),
            "writeonly" => Some(Self::WriteOnly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "readOnly",
            Self::ReadWrite => "readWrite",
            Self::Immutable => "immutable",
            Self::WriteOnly => "writeOnly",
        }
    }
}

/// When an attribute is returned in responses (RFC 7643 §2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Returned {
    Always,
    Never,
    #[default]
    Default,
    Request,
}

impl Returned {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            "default" => Some(Self::Default),
            "request" => Some(Self::Request),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Never => "never",
            Self::Default => "default",
            Self::Request => "request",
        }
    }
}

/// Attribute uniqueness constraints (RFC 7643 §2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Uniqueness {
    #[default]
    None,
    Server,
    Global,
}

impl Uniqueness {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "server" => Some(Self::Server),
            "global" => Some(Self::Global),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Server => "server",
            Self::Global => "global",
        }
    }
}

/// Legal targets of a `reference` attribute.
///
/// `External` and named resource types match any value unconditionally
/// during validation; `Uri` and `Url` demand a parsable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceType {
    External,
    Uri,
    Url,
    Resource(String),
}

impl ReferenceType {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "external" => Self::External,
            "uri" => Self::Uri,
            "url" => Self::Url,
            _ => Self::Resource(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::External => "external",
            Self::Uri => "uri",
            Self::Url => "url",
            Self::Resource(name) => name,
        }
    }
}

/// One node in a schema's attribute tree.
///
/// Sub-attributes and the parent are referenced by arena index; the owning
/// [`Schema`] resolves them.
#[derive(Debug, Clone)]
pub struct SchemaAttribute {
    pub name: String,
    pub attr_type: AttributeType,
    pub description: String,
    pub mutability: Mutability,
    pub returned: Returned,
    pub uniqueness: Uniqueness,
    pub multi_valued: bool,
    pub required: bool,
    pub case_exact: bool,
    pub canonical_values: Vec<String>,
    pub reference_types: Vec<ReferenceType>,
    pub sub_attributes: Vec<AttrIndex>,
    pub parent: Option<AttrIndex>,
    /// Dotted node name relative to the schema root, e.g. `emails.value`.
    pub node_name: String,
}

impl SchemaAttribute {
    /// True for types that appear as JSON scalars (everything but complex).
    pub fn is_simple(&self) -> bool {
        self.attr_type != AttributeType::Complex
    }
}

/// A parsed, URN-identified SCIM schema definition.
///
/// Immutable after construction; the registry hands out shared references.
#[derive(Debug, Clone)]
pub struct Schema {
    pub id: String,
    pub name: String,
    pub description: String,
    nodes: Vec<SchemaAttribute>,
    roots: Vec<AttrIndex>,
    by_path: HashMap<String, AttrIndex>,
}

impl Schema {
    /// Parse a schema document, enforcing the registration invariants:
    /// `name`, `type` and `description` are required on every attribute,
    /// dotted node names are unique within the schema, `readOnly` combined
    /// with `returned=never` is forbidden, and `writeOnly` forces
    /// `returned=never`.
    pub fn from_json(document: &Value) -> Result<Self, RegistrationError> {
        let obj = document
            .as_object()
            .ok_or_else(|| RegistrationError::InvalidSchema("schema must be a JSON object".into()))?;

        let id = required_str(obj, "id")?;
        let name = required_str(obj, "name")?;
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut schema = Schema {
            id,
            name,
            description,
            nodes: Vec::new(),
            roots: Vec::new(),
            by_path: HashMap::new(),
        };

        let attributes = obj
            .get("attributes")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                RegistrationError::InvalidSchema(format!(
                    "schema '{}' has no attributes array",
                    schema.id
                ))
            })?;

        for attribute in attributes {
            let index = schema.parse_attribute(attribute, None)?;
            schema.roots.push(index);
        }

        Ok(schema)
    }

    fn parse_attribute(
        &mut self,
        value: &Value,
        parent: Option<AttrIndex>,
    ) -> Result<AttrIndex, RegistrationError> {
        let obj = value.as_object().ok_or_else(|| {
            RegistrationError::InvalidSchema(format!(
                "attribute definition in schema '{}' must be an object",
                self.id
            ))
        })?;

        let name = required_str(obj, "name")?;
        let type_str = required_str(obj, "type")?;
        let description = required_str(obj, "description")?;

        let attr_type = AttributeType::parse(&type_str).ok_or_else(|| {
            RegistrationError::InvalidSchema(format!(
                "attribute '{}' has unknown type '{}'",
                name, type_str
            ))
        })?;

        let mutability = parse_enum(obj, "mutability", Mutability::parse, &name)?;
        let returned = parse_enum(obj, "returned", Returned::parse, &name)?;
        let uniqueness = parse_enum(obj, "uniqueness", Uniqueness::parse, &name)?;

        let node_name = match parent {
            Some(p) => format!("{}.{}", self.nodes[p].node_name, name),
            None => name.clone(),
        };

        if mutability == Mutability::ReadOnly && returned == Returned::Never {
            return Err(RegistrationError::InvalidSchema(format!(
                "attribute '{}' is readOnly and never returned; it could never carry a value",
                node_name
            )));
        }
        if mutability == Mutability::WriteOnly && returned != Returned::Never {
            return Err(RegistrationError::InvalidSchema(format!(
                "attribute '{}' is writeOnly and must declare returned=never",
                node_name
            )));
        }

        let key = node_name.to_lowercase();
        if self.by_path.contains_key(&key) {
            return Err(RegistrationError::InvalidSchema(format!(
                "duplicate attribute '{}' in schema '{}'",
                node_name, self.id
            )));
        }

        let canonical_values = obj
            .get("canonicalValues")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let reference_types = obj
            .get("referenceTypes")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ReferenceType::parse)
                    .collect()
            })
            .unwrap_or_default();

        let index = self.nodes.len();
        self.nodes.push(SchemaAttribute {
            name,
            attr_type,
            description,
            mutability,
            returned,
            uniqueness,
            multi_valued: obj.get("multiValued").and_then(Value::as_bool).unwrap_or(false),
            required: obj.get("required").and_then(Value::as_bool).unwrap_or(false),
            case_exact: obj.get("caseExact").and_then(Value::as_bool).unwrap_or(false),
            canonical_values,
            reference_types,
            sub_attributes: Vec::new(),
            parent,
            node_name,
        });
        self.by_path.insert(key, index);

        if let Some(subs) = obj.get("subAttributes").and_then(Value::as_array) {
            if attr_type != AttributeType::Complex {
                return Err(RegistrationError::InvalidSchema(format!(
                    "attribute '{}' declares subAttributes but is not complex",
                    self.nodes[index].node_name
                )));
            }
            for sub in subs {
                let sub_index = self.parse_attribute(sub, Some(index))?;
                self.nodes[index].sub_attributes.push(sub_index);
            }
        }

        Ok(index)
    }

    /// Access a node by arena index.
    pub fn attribute(&self, index: AttrIndex) -> &SchemaAttribute {
        &self.nodes[index]
    }

    /// Indices of the schema's top-level attributes, in declaration order.
    pub fn root_attributes(&self) -> &[AttrIndex] {
        &self.roots
    }

    /// Case-insensitive lookup by dotted node name.
    pub fn find_attribute(&self, dotted_path: &str) -> Option<AttrIndex> {
        self.by_path.get(&dotted_path.to_lowercase()).copied()
    }

    /// Iterate the sub-attributes of a complex node.
    pub fn sub_attributes(&self, index: AttrIndex) -> impl Iterator<Item = &SchemaAttribute> {
        self.nodes[index]
            .sub_attributes
            .iter()
            .map(move |&sub| &self.nodes[sub])
    }

    /// Rebuild the schema document for the `/Schemas` discovery endpoint.
    pub fn to_json(&self) -> Value {
        let attributes: Vec<Value> = self
            .roots
            .iter()
            .map(|&index| self.attribute_to_json(index))
            .collect();
        serde_json::json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Schema"],
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "attributes": attributes,
        })
    }

    fn attribute_to_json(&self, index: AttrIndex) -> Value {
        let attr = &self.nodes[index];
        let mut obj = serde_json::json!({
            "name": attr.name,
            "type": attr.attr_type.as_str(),
            "description": attr.description,
            "multiValued": attr.multi_valued,
            "required": attr.required,
            "caseExact": attr.case_exact,
            "mutability": attr.mutability.as_str(),
            "returned": attr.returned.as_str(),
            "uniqueness": attr.uniqueness.as_str(),
        });
        if !attr.canonical_values.is_empty() {
            obj["canonicalValues"] = Value::from(attr.canonical_values.clone());
        }
        if !attr.reference_types.is_empty() {
            obj["referenceTypes"] = Value::from(
                attr.reference_types
                    .iter()
                    .map(|r| r.as_str().to_string())
                    .collect::<Vec<_>>(),
            );
        }
        if !attr.sub_attributes.is_empty() {
            obj["subAttributes"] = Value::Array(
                attr.sub_attributes
                    .iter()
                    .map(|&sub| self.attribute_to_json(sub))
                    .collect(),
            );
        }
        obj
    }
}

fn required_str(
    obj: &serde_json::Map<String, Value>,
    field: &str,
) -> Result<String, RegistrationError> {
    obj.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            RegistrationError::InvalidSchema(format!("missing required field '{}'", field))
        })
}

fn parse_enum<T: Default>(
    obj: &serde_json::Map<String, Value>,
    field: &str,
    parse: fn(&str) -> Option<T>,
    attribute: &str,
) -> Result<T, RegistrationError> {
    match obj.get(field).and_then(Value::as_str) {
        Some(raw) => parse(raw).ok_or_else(|| {
            RegistrationError::InvalidSchema(format!(
                "attribute '{}' has unknown {} '{}'",
                attribute, field, raw
            ))
        }),
        None => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_schema(attributes: Value) -> Value {
        json!({
            "id": "urn:example:params:scim:schemas:Test",
            "name": "Test",
            "description": "test schema",
            "attributes": attributes,
        })
    }

    #[test]
    fn parses_nested_attributes_with_node_names() {
        let schema = Schema::from_json(&minimal_schema(json!([
            {
                "name": "emails",
                "type": "complex",
                "description": "Email addresses",
                "multiValued": true,
                "subAttributes": [
                    {"name": "value", "type": "string", "description": "Address"},
                    {"name": "type", "type": "string", "description": "Kind",
                     "canonicalValues": ["work", "home"]}
                ]
            }
        ])))
        .unwrap();

        let emails = schema.find_attribute("emails").unwrap();
        assert_eq!(schema.attribute(emails).attr_type, AttributeType::Complex);
        let value = schema.find_attribute("emails.value").unwrap();
        assert_eq!(schema.attribute(value).node_name, "emails.value");
        assert_eq!(schema.attribute(value).parent, Some(emails));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let schema = Schema::from_json(&minimal_schema(json!([
            {"name": "userName", "type": "string", "description": "login"}
        ])))
        .unwrap();
        assert!(schema.find_attribute("username").is_some());
        assert!(schema.find_attribute("USERNAME").is_some());
    }

    #[test]
    fn rejects_missing_description() {
        let result = Schema::from_json(&minimal_schema(json!([
            {"name": "userName", "type": "string"}
        ])));
        assert!(matches!(result, Err(RegistrationError::InvalidSchema(_))));
    }

    #[test]
    fn rejects_read_only_never_returned() {
        let result = Schema::from_json(&minimal_schema(json!([
            {"name": "ghost", "type": "string", "description": "unusable",
             "mutability": "readOnly", "returned": "never"}
        ])));
        assert!(matches!(result, Err(RegistrationError::InvalidSchema(_))));
    }

    #[test]
    fn write_only_requires_never() {
        let result = Schema::from_json(&minimal_schema(json!([
            {"name": "password", "type": "string", "description": "secret",
             "mutability": "writeOnly", "returned": "default"}
        ])));
        assert!(matches!(result, Err(RegistrationError::InvalidSchema(_))));

        let ok = Schema::from_json(&minimal_schema(json!([
            {"name": "password", "type": "string", "description": "secret",
             "mutability": "writeOnly", "returned": "never"}
        ])));
        assert!(ok.is_ok());
    }

    #[test]
    fn rejects_duplicate_attribute_names() {
        let result = Schema::from_json(&minimal_schema(json!([
            {"name": "title", "type": "string", "description": "one"},
            {"name": "Title", "type": "string", "description": "two"}
        ])));
        assert!(matches!(result, Err(RegistrationError::InvalidSchema(_))));
    }

    #[test]
    fn round_trips_to_discovery_document() {
        let schema = Schema::from_json(&minimal_schema(json!([
            {"name": "manager", "type": "reference", "description": "Manager ref",
             "referenceTypes": ["User", "uri"]}
        ])))
        .unwrap();
        let doc = schema.to_json();
        assert_eq!(doc["attributes"][0]["referenceTypes"][0], "User");
        assert_eq!(doc["attributes"][0]["referenceTypes"][1], "uri");
        let reparsed = Schema::from_json(&doc).unwrap();
        assert_eq!(
            reparsed.attribute(reparsed.find_attribute("manager").unwrap()).reference_types,
            vec![ReferenceType::Resource("User".into()), ReferenceType::Uri]
        );
    }
}
