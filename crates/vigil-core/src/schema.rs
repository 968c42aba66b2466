//! Type descriptors for agent inputs and outputs, and their JSON Schema form.
//!
//! Descriptors nest arbitrarily (objects of lists of objects, ...), so
//! rendering walks the tree with an explicit stack instead of recursion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

/// Kind discriminator of a [`TypeDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    Boolean,
    Number,
    Integer,
    String,
    Enum,
    Vector,
    Object,
    List,
    Dict,
    OneOf,
    Any,
    Image,
    Audio,
    Video,
    ThreeDimensional,
    File,
    NodeCall,
    Call,
    AuthToken,
}

/// Third-party service an `authToken` type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalService {
    Google,
    Wix,
    Clickup,
    Telegram,
    Openai,
    Ollama,
    Anthropic,
    Anyscale,
    Fireworks,
    GoogleVertex,
    Stability,
}

/// Reference to another input, used where a size is only known at run time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRef {
    #[serde(rename = "ref")]
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    Fixed(u64),
    Ref(InputRef),
}

/// `variants` is either a list of enum names or a list of alternative types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variants {
    Names(Vec<String>),
    Types(Vec<TypeDescriptor>),
}

/// Recursive description of a value's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    #[serde(rename = "type")]
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, TypeDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Box<TypeDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Variants>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ExternalService>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncate: Option<bool>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

enum Frame<'a> {
    Visit(&'a TypeDescriptor),
    Build(&'a TypeDescriptor),
}

impl TypeDescriptor {
    /// A bare descriptor of the given kind with every option unset.
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            optional: None,
            properties: None,
            elements: None,
            size: None,
            default_limit: None,
            min: None,
            max: None,
            variants: None,
            service: None,
            truncate: None,
            reference: None,
        }
    }

    pub fn object(properties: impl IntoIterator<Item = (String, TypeDescriptor)>) -> Self {
        Self {
            properties: Some(properties.into_iter().collect()),
            ..Self::new(TypeKind::Object)
        }
    }

    pub fn list(elements: TypeDescriptor) -> Self {
        Self {
            elements: Some(Box::new(elements)),
            ..Self::new(TypeKind::List)
        }
    }

    pub fn dict(elements: TypeDescriptor) -> Self {
        Self {
            elements: Some(Box::new(elements)),
            ..Self::new(TypeKind::Dict)
        }
    }

    pub fn one_of(variants: Vec<TypeDescriptor>) -> Self {
        Self {
            variants: Some(Variants::Types(variants)),
            ..Self::new(TypeKind::OneOf)
        }
    }

    pub fn enumeration(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            variants: Some(Variants::Names(names.into_iter().map(Into::into).collect())),
            ..Self::new(TypeKind::Enum)
        }
    }

    pub fn with_bounds(mut self, min: Option<Number>, max: Option<Number>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn is_optional(&self) -> bool {
        self.optional.unwrap_or(false)
    }

    /// Nested descriptors whose schemas this descriptor's schema embeds, in output order.
    fn children(&self) -> Vec<&TypeDescriptor> {
        match self.kind {
            TypeKind::Object => self
                .properties
                .iter()
                .flat_map(|props| props.values())
                .collect(),
            TypeKind::List | TypeKind::Dict => self.elements.as_deref().into_iter().collect(),
            TypeKind::OneOf => match &self.variants {
                Some(Variants::Types(types)) => types.iter().collect(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Render this descriptor as a JSON Schema fragment.
    pub fn to_json_schema(&self) -> Value {
        let mut stack = vec![Frame::Visit(self)];
        let mut built: Vec<Value> = Vec::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit(node) => {
                    stack.push(Frame::Build(node));
                    for child in node.children().into_iter().rev() {
                        stack.push(Frame::Visit(child));
                    }
                }
                Frame::Build(node) => {
                    let count = node.children().len();
                    let children = built.split_off(built.len() - count);
                    built.push(node.schema_with(children));
                }
            }
        }

        built.pop().unwrap_or_else(|| json!({}))
    }

    /// Schema of this node given the already-rendered schemas of its children.
    fn schema_with(&self, children: Vec<Value>) -> Value {
        let mut schema = Map::new();
        match self.kind {
            TypeKind::Boolean => {
                schema.insert("type".into(), json!("boolean"));
            }
            TypeKind::Number | TypeKind::Integer => {
                let name = if self.kind == TypeKind::Number { "number" } else { "integer" };
                schema.insert("type".into(), json!(name));
                insert_number(&mut schema, "minimum", &self.min);
                insert_number(&mut schema, "maximum", &self.max);
            }
            TypeKind::String => {
                schema.insert("type".into(), json!("string"));
                insert_number(&mut schema, "minLength", &self.min);
                insert_number(&mut schema, "maxLength", &self.max);
            }
            TypeKind::Enum => {
                let names = match &self.variants {
                    Some(Variants::Names(names)) => names.clone(),
                    _ => Vec::new(),
                };
                schema.insert("type".into(), json!("string"));
                schema.insert("enum".into(), json!(names));
            }
            TypeKind::Vector => {
                schema.insert("type".into(), json!("array"));
                schema.insert("items".into(), json!({"type": "number"}));
                if let Some(SizeSpec::Fixed(size)) = self.size {
                    schema.insert("minItems".into(), json!(size));
                    schema.insert("maxItems".into(), json!(size));
                }
            }
            TypeKind::Object => {
                let names = self.properties.iter().flat_map(|props| props.keys().cloned());
                let properties: Map<String, Value> = names.zip(children).collect();
                schema.insert("type".into(), json!("object"));
                schema.insert("properties".into(), Value::Object(properties));
            }
            TypeKind::List => {
                schema.insert("type".into(), json!("array"));
                schema.insert("items".into(), first_or_any(children));
                insert_number(&mut schema, "minItems", &self.min);
                insert_number(&mut schema, "maxItems", &self.max);
            }
            TypeKind::Dict => {
                schema.insert("type".into(), json!("object"));
                schema.insert("additionalProperties".into(), first_or_any(children));
            }
            TypeKind::OneOf => {
                schema.insert("oneOf".into(), Value::Array(children));
            }
            TypeKind::Any => {}
            TypeKind::Image => {
                return json!({
                    "oneOf": [
                        {"type": "object", "properties": {"url": {"type": "string"}}},
                        {"type": "object", "properties": {"base64": {"type": "string"}}}
                    ]
                });
            }
            TypeKind::Audio | TypeKind::Video | TypeKind::ThreeDimensional => {
                return json!({"type": "object", "properties": {"url": {"type": "string"}}});
            }
            TypeKind::File => {
                return json!({
                    "type": "object",
                    "properties": {"url": {"type": "string"}, "fileName": {"type": "string"}}
                });
            }
            TypeKind::NodeCall => {
                return json!({
                    "type": "object",
                    "properties": {"nodeId": {"type": "string"}, "inputs": {"type": "object"}}
                });
            }
            TypeKind::Call => {
                return json!({"type": "object", "properties": {"inputs": {"type": "object"}}});
            }
            TypeKind::AuthToken => {
                schema.insert("type".into(), json!("object"));
            }
        }
        Value::Object(schema)
    }
}

fn insert_number(schema: &mut Map<String, Value>, key: &str, value: &Option<Number>) {
    if let Some(n) = value {
        schema.insert(key.into(), Value::Number(n.clone()));
    }
}

fn first_or_any(children: Vec<Value>) -> Value {
    children.into_iter().next().unwrap_or_else(|| json!({}))
}
