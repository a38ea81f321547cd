use serde::Serialize;

use crate::{imports::ImportSet, literal::Literal};

/// Protobuf scalar wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    Fixed64,
    SFixed32,
    SFixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    /// The proto3 keyword. Also the name of the rule group in the validation extension.
    pub fn proto_name(&self) -> &'static str {
        match self {
            ScalarKind::Double   => "double",
            ScalarKind::Float    => "float",
            ScalarKind::Int32    => "int32",
            ScalarKind::Int64    => "int64",
            ScalarKind::UInt32   => "uint32",
            ScalarKind::UInt64   => "uint64",
            ScalarKind::SInt32   => "sint32",
            ScalarKind::SInt64   => "sint64",
            ScalarKind::Fixed32  => "fixed32",
            ScalarKind::Fixed64  => "fixed64",
            ScalarKind::SFixed32 => "sfixed32",
            ScalarKind::SFixed64 => "sfixed64",
            ScalarKind::Bool     => "bool",
            ScalarKind::String   => "string",
            ScalarKind::Bytes    => "bytes",
        }
    }

    /// The Rust type prost generates for this scalar.
    pub fn rust_type(&self) -> &'static str {
        match self {
            ScalarKind::Double => "f64",
            ScalarKind::Float => "f32",
            ScalarKind::Int32 | ScalarKind::SInt32 | ScalarKind::SFixed32 => "i32",
            ScalarKind::Int64 | ScalarKind::SInt64 | ScalarKind::SFixed64 => "i64",
            ScalarKind::UInt32 | ScalarKind::Fixed32 => "u32",
            ScalarKind::UInt64 | ScalarKind::Fixed64 => "u64",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "String",
            ScalarKind::Bytes => "Vec<u8>",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ScalarKind::Double | ScalarKind::Float)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            ScalarKind::Int32
                | ScalarKind::Int64
                | ScalarKind::SInt32
                | ScalarKind::SInt64
                | ScalarKind::SFixed32
                | ScalarKind::SFixed64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed()
            || matches!(
                self,
                ScalarKind::UInt32 | ScalarKind::UInt64 | ScalarKind::Fixed32 | ScalarKind::Fixed64
            )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Map keys may be any integral or string type, or bool.
    pub fn is_map_key(&self) -> bool {
        self.is_integer() || matches!(self, ScalarKind::String | ScalarKind::Bool)
    }
}

/// The standardized `google.protobuf` message types with a fixed import path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WellKnownType {
    Timestamp,
    Duration,
    Any,
    FieldMask,
    Struct,
    Empty,
}

impl WellKnownType {
    pub fn full_name(&self) -> &'static str {
        match self {
            WellKnownType::Timestamp => "google.protobuf.Timestamp",
            WellKnownType::Duration  => "google.protobuf.Duration",
            WellKnownType::Any       => "google.protobuf.Any",
            WellKnownType::FieldMask => "google.protobuf.FieldMask",
            WellKnownType::Struct    => "google.protobuf.Struct",
            WellKnownType::Empty     => "google.protobuf.Empty",
        }
    }

    pub fn import_path(&self) -> &'static str {
        match self {
            WellKnownType::Timestamp => "google/protobuf/timestamp.proto",
            WellKnownType::Duration  => "google/protobuf/duration.proto",
            WellKnownType::Any       => "google/protobuf/any.proto",
            WellKnownType::FieldMask => "google/protobuf/field_mask.proto",
            WellKnownType::Struct    => "google/protobuf/struct.proto",
            WellKnownType::Empty     => "google/protobuf/empty.proto",
        }
    }

    /// The host-side type the converter maps this well-known type to.
    pub fn rust_type(&self) -> &'static str {
        match self {
            WellKnownType::Timestamp => "SystemTime",
            WellKnownType::Duration  => "Duration",
            WellKnownType::Any       => "prost_types::Any",
            WellKnownType::FieldMask => "prost_types::FieldMask",
            WellKnownType::Struct    => "prost_types::Struct",
            WellKnownType::Empty     => "()",
        }
    }

    /// The rule group name in the validation extension, for types that have one.
    pub fn rule_group(&self) -> Option<&'static str> {
        match self {
            WellKnownType::Timestamp => Some("timestamp"),
            WellKnownType::Duration  => Some("duration"),
            WellKnownType::Any       => Some("any"),
            _ => None,
        }
    }
}

/// A resolved reference to an enum or message type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRef {
    /// The name as written in the rendered file (`Address`, `Order.Line`,
    /// `google.protobuf.Timestamp`).
    pub proto_name:  String,
    /// The name the reference resolved to: package-relative for package
    /// types (`Order.Line`), fully qualified for external ones.
    pub full_name:   String,
    /// The last segment of the name; what the host side calls the type.
    pub simple_name: String,
    pub well_known:  Option<WellKnownType>,
    /// The file declaring the type, when it is not the file being built.
    pub import:      Option<String>,
}

/// How a field is laid out on the wire. Exactly one leaf kind describes a
/// singular field; repeated and map fields wrap their element descriptors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireKind {
    Scalar { scalar: ScalarKind },
    Enum { target: TypeRef },
    Message { target: TypeRef },
    Repeated { item: Box<FieldDescriptor> },
    Map { key: Box<FieldDescriptor>, value: Box<FieldDescriptor> },
}

impl WireKind {
    pub fn is_leaf(&self) -> bool {
        !matches!(self, WireKind::Repeated { .. } | WireKind::Map { .. })
    }

    pub fn scalar(&self) -> Option<ScalarKind> {
        match *self {
            WireKind::Scalar { scalar } => Some(scalar),
            _ => None,
        }
    }
}

/// One validation constraint, addressed by its path inside the validation
/// extension (`["string", "min_len"]`, `["repeated", "items", "int32", "gt"]`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub path:  Vec<String>,
    pub value: Literal,
}

impl Rule {
    pub fn new<I, S>(path: I, value: impl Into<Literal>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule {
            path:  path.into_iter().map(Into::into).collect(),
            value: value.into(),
        }
    }

    /// Re-addresses this rule beneath `prefix`.
    pub fn wrapped(mut self, prefix: &[&str]) -> Self {
        let mut path: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        path.append(&mut self.path);
        self.path = path;
        self
    }

    pub fn dotted(&self) -> String {
        self.path.join(".")
    }
}

/// A literal option (`deprecated = true`, `(acme.sensitive) = true`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionEntry {
    pub name:  String,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name:        String,
    pub number:      u32,
    pub kind:        WireKind,
    /// The type token as rendered before the field name (`string`, `Address`,
    /// `map<string, int64>`). Repeated fields carry the item's type here.
    pub proto_type:  String,
    /// The type a host record must declare for this field.
    pub target_type: String,
    pub optional:    bool,
    pub repeated:    bool,
    pub map:         bool,
    pub constant:    bool,
    /// Set when the field is a choice of the named oneof.
    pub oneof:       Option<String>,
    pub rules:       Vec<Rule>,
    pub options:     Vec<OptionEntry>,
    /// Imports this field (and anything it wraps) requires.
    pub imports:     Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneofDescriptor {
    pub name:    String,
    pub fields:  Vec<FieldDescriptor>,
    pub rules:   Vec<Rule>,
    pub options: Vec<OptionEntry>,
}

/// An inclusive range of reserved numbers. Single numbers have `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ReservedRange {
    pub start: u32,
    pub end:   u32,
}

impl ReservedRange {
    pub fn contains(&self, number: u32) -> bool {
        self.start <= number && number <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueDescriptor {
    pub name:    String,
    pub number:  i32,
    pub options: Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumDescriptor {
    pub name:            String,
    pub full_name:       String,
    pub values:          Vec<EnumValueDescriptor>,
    pub reserved_ranges: Vec<(i32, i32)>,
    pub reserved_names:  Vec<String>,
    pub options:         Vec<OptionEntry>,
}

/// A host record field: its serialized name and its type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostField {
    pub name: String,
    pub ty:   String,
}

/// An explicit description of an external record type a message mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostRecord {
    /// Path to the type in the host crate (`crate::model::User`).
    pub type_path: String,
    pub fields:    Vec<HostField>,
}

impl HostRecord {
    pub fn new(type_path: impl Into<String>) -> Self {
        HostRecord {
            type_path: type_path.into(),
            fields:    Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.fields.push(HostField {
            name: name.into(),
            ty:   ty.into(),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&HostField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDescriptor {
    pub name:            String,
    pub full_name:       String,
    /// Regular fields in ascending number order. Oneof choices live in `oneofs`.
    pub fields:          Vec<FieldDescriptor>,
    pub oneofs:          Vec<OneofDescriptor>,
    pub messages:        Vec<MessageDescriptor>,
    pub enums:           Vec<EnumDescriptor>,
    pub reserved_ranges: Vec<ReservedRange>,
    pub reserved_names:  Vec<String>,
    pub rules:           Vec<Rule>,
    pub options:         Vec<OptionEntry>,
    pub host:            Option<HostRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDescriptor {
    pub name:             String,
    pub input:            TypeRef,
    pub output:           TypeRef,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub options:          Vec<OptionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    pub name:    String,
    /// Methods in handler precedence order.
    pub methods: Vec<MethodDescriptor>,
    pub options: Vec<OptionEntry>,
}

/// The options message an extension block extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionTarget {
    File,
    Message,
    Field,
    Service,
    Oneof,
}

impl ExtensionTarget {
    pub fn extendee(&self) -> &'static str {
        match self {
            ExtensionTarget::File    => "google.protobuf.FileOptions",
            ExtensionTarget::Message => "google.protobuf.MessageOptions",
            ExtensionTarget::Field   => "google.protobuf.FieldOptions",
            ExtensionTarget::Service => "google.protobuf.ServiceOptions",
            ExtensionTarget::Oneof   => "google.protobuf.OneofOptions",
        }
    }
}

pub const DESCRIPTOR_IMPORT: &str = "google/protobuf/descriptor.proto";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionDescriptor {
    pub target: ExtensionTarget,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDescriptor {
    pub name:       String,
    pub package:    String,
    /// Sorted, deduplicated import paths.
    pub imports:    ImportSet,
    pub options:    Vec<OptionEntry>,
    pub messages:   Vec<MessageDescriptor>,
    pub enums:      Vec<EnumDescriptor>,
    pub services:   Vec<ServiceDescriptor>,
    pub extensions: Vec<ExtensionDescriptor>,
}

/// How one host field becomes one generated message field, and back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conversion {
    Direct,
    /// A well-known message the host holds as its `prost_types` form.
    WellKnown,
    Timestamp,
    Duration,
    /// `path` is the generated enum type.
    Enum { path: String },
    /// `host` is the record the nested message is bound to; without one the
    /// host holds the generated type itself.
    Message { path: String, host: Option<String> },
    Optional { inner: Box<Conversion> },
    Repeated { inner: Box<Conversion> },
    Map { value: Box<Conversion> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConversion {
    /// Field name on the host record.
    pub host_field:    String,
    /// Field name on the generated message.
    pub message_field: String,
    pub conversion:    Conversion,
    /// Set when the generated field is a choice of this oneof.
    pub oneof:         Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageConverter {
    pub message:   String,
    /// Path of the generated type (`crate::pb::User`).
    pub generated: String,
    /// Path of the host type (`crate::model::User`).
    pub host:      String,
    pub fields:    Vec<FieldConversion>,
    /// Host fields without a schema counterpart, filled with their default
    /// when converting back.
    pub defaulted: Vec<String>,
}

/// Everything the converter renderer needs, for every bound message in a package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConverterDescriptor {
    pub package:          String,
    pub generated_module: String,
    pub messages:         Vec<MessageConverter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDescriptor {
    pub package:    String,
    pub files:      Vec<FileDescriptor>,
    pub converters: ConverterDescriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_key_kinds() {
        assert!(ScalarKind::String.is_map_key());
        assert!(ScalarKind::Bool.is_map_key());
        assert!(ScalarKind::SFixed64.is_map_key());
        assert!(!ScalarKind::Double.is_map_key());
        assert!(!ScalarKind::Bytes.is_map_key());
    }

    #[test]
    fn test_rule_wrapping() {
        let rule = Rule::new(["string", "min_len"], 3u64).wrapped(&["repeated", "items"]);
        assert_eq!(rule.dotted(), "repeated.items.string.min_len");
        assert_eq!(rule.value, Literal::UInt(3));
    }

    #[test]
    fn test_host_record_lookup() {
        let host = HostRecord::new("crate::model::User")
            .field("id", "i64")
            .field("name", "String");
        assert_eq!(host.get("name").map(|f| f.ty.as_str()), Some("String"));
        assert!(host.get("email").is_none());
    }
}
