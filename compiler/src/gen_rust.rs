use brine_proto_schema::{Conversion, ConverterDescriptor, FieldConversion, MessageConverter};

use crate::{
    error::ProtoError,
    package::ConverterRenderer,
    utils::{quote, rust_ident, to_pascal_case, to_snake_case},
};

const HEADER: &str = "// Code generated by brine-proto. DO NOT EDIT.";

const CONVERT_ERROR: &str = r#"/// Why a generated message could not become its host record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// A singular message field was not set.
    MissingField(&'static str),
    /// An enum field held a number the enum does not define.
    InvalidEnum { field: &'static str, value: i32 },
    /// A timestamp or duration does not fit the other side's type.
    OutOfRange(&'static str),
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::MissingField(field) => write!(f, "missing required field {}", field),
            ConvertError::InvalidEnum { field, value } => write!(f, "field {} holds unknown enum value {}", field, value),
            ConvertError::OutOfRange(field) => write!(f, "field {} is out of range", field),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<std::convert::Infallible> for ConvertError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ToMessage,
    ToHost,
}

/// The generated struct's field name for a proto field.
fn message_ident(name: &str) -> String {
    rust_ident(&to_snake_case(name))
}

/// Conversions that move the value across unchanged.
fn is_plain(conversion: &Conversion) -> bool {
    match conversion {
        Conversion::Direct | Conversion::WellKnown => true,
        Conversion::Message { host: None, .. } => true,
        Conversion::Optional { inner } | Conversion::Repeated { inner } => is_plain(inner),
        Conversion::Map { value } => is_plain(value),
        _ => false,
    }
}

/// Singular fields of these kinds are `Option`s on the generated struct.
fn is_message_like(conversion: &Conversion) -> bool {
    matches!(
        conversion,
        Conversion::WellKnown | Conversion::Timestamp | Conversion::Duration | Conversion::Message { .. }
    )
}

/// An expression converting `expr` in `direction`. Element conversions run
/// inside closures returning `Result<_, ConvertError>` so `?` works at every
/// depth.
fn convert(conversion: &Conversion, expr: &str, field: &str, direction: Direction) -> String {
    if is_plain(conversion) {
        return expr.to_string();
    }
    let name = quote(field);
    match (conversion, direction) {
        (Conversion::Timestamp, Direction::ToMessage) => format!("prost_types::Timestamp::from({})", expr),
        (Conversion::Timestamp, Direction::ToHost) => format!(
            "std::time::SystemTime::try_from({}).map_err(|_| ConvertError::OutOfRange({}))?",
            expr, name
        ),
        (Conversion::Duration, Direction::ToMessage) => format!(
            "prost_types::Duration::try_from({}).map_err(|_| ConvertError::OutOfRange({}))?",
            expr, name
        ),
        (Conversion::Duration, Direction::ToHost) => format!(
            "std::time::Duration::try_from({}).map_err(|_| ConvertError::OutOfRange({}))?",
            expr, name
        ),
        (Conversion::Enum { .. }, Direction::ToMessage) => format!("i32::from({})", expr),
        (Conversion::Enum { path }, Direction::ToHost) => format!(
            "{}::try_from({}).map_err(|_| ConvertError::InvalidEnum {{ field: {}, value: {} }})?",
            path, expr, name, expr
        ),
        (Conversion::Message { path, .. }, Direction::ToMessage) => format!("<{}>::try_from({})?", path, expr),
        (Conversion::Message { host: Some(host), .. }, Direction::ToHost) => {
            format!("<{}>::try_from({})?", host, expr)
        }
        (Conversion::Optional { inner }, _) => format!(
            "{}.map(|v| -> Result<_, ConvertError> {{ Ok({}) }}).transpose()?",
            expr,
            convert(inner, "v", field, direction)
        ),
        (Conversion::Repeated { inner }, _) => format!(
            "{}.into_iter().map(|v| -> Result<_, ConvertError> {{ Ok({}) }}).collect::<Result<Vec<_>, _>>()?",
            expr,
            convert(inner, "v", field, direction)
        ),
        (Conversion::Map { value }, _) => format!(
            "{}.into_iter().map(|(k, v)| -> Result<_, ConvertError> {{ Ok((k, {})) }}).collect::<Result<std::collections::HashMap<_, _>, _>>()?",
            expr,
            convert(value, "v", field, direction)
        ),
        _ => expr.to_string(),
    }
}

/// Oneof choices grouped by oneof, in the order the oneofs first appear.
fn oneof_groups(message: &MessageConverter) -> Vec<(&str, Vec<&FieldConversion>)> {
    let mut groups: Vec<(&str, Vec<&FieldConversion>)> = Vec::new();
    for field in &message.fields {
        let Some(oneof) = field.oneof.as_deref() else { continue };
        match groups.iter_mut().find(|(name, _)| *name == oneof) {
            Some((_, choices)) => choices.push(field),
            None => groups.push((oneof, vec![field])),
        }
    }
    groups
}

/// `crate::pb::User` with oneof `contact` is `crate::pb::user::Contact`.
fn oneof_path(generated: &str, oneof: &str) -> String {
    let (parent, name) = generated.rsplit_once("::").unwrap_or(("", generated));
    let module = if parent.is_empty() {
        to_snake_case(name)
    } else {
        format!("{}::{}", parent, to_snake_case(name))
    };
    format!("{}::{}", module, to_pascal_case(oneof))
}

/// The element conversion of a oneof choice; the host holds it as an `Option`.
fn choice_inner(field: &FieldConversion) -> &Conversion {
    match &field.conversion {
        Conversion::Optional { inner } => inner,
        other => other,
    }
}

fn generate_into_message(message: &MessageConverter) -> String {
    let mut body: Vec<String> = Vec::new();
    for field in message.fields.iter().filter(|f| f.oneof.is_none()) {
        let source = format!("value.{}", rust_ident(&field.host_field));
        let mut expr = convert(&field.conversion, &source, &field.message_field, Direction::ToMessage);
        if is_message_like(&field.conversion) {
            expr = format!("Some({})", expr);
        }
        body.push(format!("            {}: {},", message_ident(&field.message_field), expr));
    }

    for (oneof, choices) in oneof_groups(message) {
        let path = oneof_path(&message.generated, oneof);
        let mut branches: Vec<String> = Vec::new();
        for field in choices {
            let inner = convert(choice_inner(field), "v", &field.message_field, Direction::ToMessage);
            branches.push(format!(
                "if let Some(v) = value.{} {{\n                Some({}::{}({}))\n            }}",
                rust_ident(&field.host_field),
                path,
                to_pascal_case(&field.message_field),
                inner
            ));
        }
        body.push(format!(
            "            {}: {} else {{\n                None\n            }},",
            message_ident(oneof),
            branches.join(" else ")
        ));
    }
    body.push("            ..Default::default()".to_string());

    format!(
        "impl TryFrom<{host}> for {generated} {{\n    type Error = ConvertError;\n\n    fn try_from(value: {host}) -> Result<Self, Self::Error> {{\n        Ok(Self {{\n{body}\n        }})\n    }}\n}}",
        host = message.host,
        generated = message.generated,
        body = body.join("\n")
    )
}

fn generate_into_host(message: &MessageConverter) -> String {
    let mut prelude: Vec<String> = Vec::new();
    let mut body: Vec<String> = Vec::new();

    for (oneof, choices) in oneof_groups(message) {
        let path = oneof_path(&message.generated, oneof);
        let mut arms: Vec<String> = Vec::new();
        for field in &choices {
            let local = format!("oneof_{}", field.host_field);
            prelude.push(format!("        let mut {} = None;", local));
            let inner = convert(choice_inner(field), "v", &field.message_field, Direction::ToHost);
            arms.push(format!(
                "            Some({}::{}(v)) => {} = Some({}),",
                path,
                to_pascal_case(&field.message_field),
                local,
                inner
            ));
        }
        arms.push("            _ => {}".to_string());
        prelude.push(format!(
            "        match value.{} {{\n{}\n        }}",
            message_ident(oneof),
            arms.join("\n")
        ));
    }

    for field in &message.fields {
        let expr = if field.oneof.is_some() {
            format!("oneof_{}", field.host_field)
        } else {
            let mut source = format!("value.{}", message_ident(&field.message_field));
            if is_message_like(&field.conversion) {
                source = format!("{}.ok_or(ConvertError::MissingField({}))?", source, quote(&field.message_field));
            }
            convert(&field.conversion, &source, &field.message_field, Direction::ToHost)
        };
        body.push(format!("            {}: {},", rust_ident(&field.host_field), expr));
    }
    for name in &message.defaulted {
        body.push(format!("            {}: Default::default(),", rust_ident(name)));
    }

    let prelude = if prelude.is_empty() {
        String::new()
    } else {
        format!("{}\n", prelude.join("\n"))
    };
    format!(
        "impl TryFrom<{generated}> for {host} {{\n    type Error = ConvertError;\n\n    fn try_from(value: {generated}) -> Result<Self, Self::Error> {{\n{prelude}        Ok(Self {{\n{body}\n        }})\n    }}\n}}",
        host = message.host,
        generated = message.generated,
        prelude = prelude,
        body = body.join("\n")
    )
}

/// Renders conversions in both directions between every bound message and
/// its host record, plus the `ConvertError` they share.
pub fn render_converters(converters: &ConverterDescriptor) -> String {
    let mut rust_code: Vec<String> = Vec::new();
    rust_code.push(format!("{}\n// package: {}", HEADER, converters.package));
    rust_code.push(CONVERT_ERROR.to_string());

    for message in &converters.messages {
        rust_code.push(generate_into_message(message));
        rust_code.push(generate_into_host(message));
    }

    let mut text = rust_code.join("\n\n");
    text.push('\n');
    text
}

/// The default [ConverterRenderer].
#[derive(Debug, Clone, Copy, Default)]
pub struct RustConverterRenderer;

impl ConverterRenderer for RustConverterRenderer {
    fn render_converters(&self, converters: &ConverterDescriptor) -> Result<String, ProtoError> {
        Ok(render_converters(converters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn field(name: &str, conversion: Conversion) -> FieldConversion {
        FieldConversion {
            host_field: name.to_string(),
            message_field: name.to_string(),
            conversion,
            oneof: None,
        }
    }

    fn choice(name: &str, oneof: &str, inner: Conversion) -> FieldConversion {
        FieldConversion {
            oneof: Some(oneof.to_string()),
            ..field(name, Conversion::Optional { inner: Box::new(inner) })
        }
    }

    fn descriptor(message: MessageConverter) -> ConverterDescriptor {
        ConverterDescriptor {
            package: "acme.v1".into(),
            generated_module: "crate::pb".into(),
            messages: vec![message],
        }
    }

    #[test]
    fn test_render_plain_message() {
        let text = render_converters(&descriptor(MessageConverter {
            message: "Tag".into(),
            generated: "crate::pb::Tag".into(),
            host: "crate::model::Tag".into(),
            fields: vec![field("name", Conversion::Direct), field("type", Conversion::Direct)],
            defaulted: vec!["cached".into()],
        }));
        assert!(text.starts_with("// Code generated by brine-proto. DO NOT EDIT.\n// package: acme.v1\n"));
        assert!(text.contains("pub enum ConvertError {"));
        assert!(text.contains(
            r#"impl TryFrom<crate::model::Tag> for crate::pb::Tag {
    type Error = ConvertError;

    fn try_from(value: crate::model::Tag) -> Result<Self, Self::Error> {
        Ok(Self {
            name: value.name,
            r#type: value.r#type,
            ..Default::default()
        })
    }
}"#
        ));
        assert!(text.contains(
            r#"impl TryFrom<crate::pb::Tag> for crate::model::Tag {
    type Error = ConvertError;

    fn try_from(value: crate::pb::Tag) -> Result<Self, Self::Error> {
        Ok(Self {
            name: value.name,
            r#type: value.r#type,
            cached: Default::default(),
        })
    }
}"#
        ));
    }

    #[test]
    fn test_message_like_fields_are_wrapped() {
        let text = render_converters(&descriptor(MessageConverter {
            message: "Event".into(),
            generated: "crate::pb::Event".into(),
            host: "crate::model::Event".into(),
            fields: vec![
                field("at", Conversion::Timestamp),
                field(
                    "status",
                    Conversion::Enum {
                        path: "crate::pb::Status".into(),
                    },
                ),
                field(
                    "owner",
                    Conversion::Message {
                        path: "crate::pb::User".into(),
                        host: Some("crate::model::User".into()),
                    },
                ),
            ],
            defaulted: vec![],
        }));
        assert!(text.contains("            at: Some(prost_types::Timestamp::from(value.at)),"));
        assert!(text.contains("            status: i32::from(value.status),"));
        assert!(text.contains("            owner: Some(<crate::pb::User>::try_from(value.owner)?),"));
        assert!(text.contains(
            "            at: std::time::SystemTime::try_from(value.at.ok_or(ConvertError::MissingField(\"at\"))?).map_err(|_| ConvertError::OutOfRange(\"at\"))?,"
        ));
        assert!(text.contains(
            "            status: crate::pb::Status::try_from(value.status).map_err(|_| ConvertError::InvalidEnum { field: \"status\", value: value.status })?,"
        ));
        assert!(text.contains(
            "            owner: <crate::model::User>::try_from(value.owner.ok_or(ConvertError::MissingField(\"owner\"))?)?,"
        ));
    }

    #[test]
    fn test_collections_convert_elementwise() {
        let text = render_converters(&descriptor(MessageConverter {
            message: "Feed".into(),
            generated: "crate::pb::Feed".into(),
            host: "crate::model::Feed".into(),
            fields: vec![
                field("labels", Conversion::Repeated { inner: Box::new(Conversion::Direct) }),
                field("windows", Conversion::Repeated { inner: Box::new(Conversion::Duration) }),
                field("expires", Conversion::Optional { inner: Box::new(Conversion::Timestamp) }),
            ],
            defaulted: vec![],
        }));
        assert!(text.contains("            labels: value.labels,"));
        assert!(text.contains(
            "            windows: value.windows.into_iter().map(|v| -> Result<_, ConvertError> { Ok(prost_types::Duration::try_from(v).map_err(|_| ConvertError::OutOfRange(\"windows\"))?) }).collect::<Result<Vec<_>, _>>()?,"
        ));
        assert!(text.contains(
            "            expires: value.expires.map(|v| -> Result<_, ConvertError> { Ok(prost_types::Timestamp::from(v)) }).transpose()?,"
        ));
    }

    #[test]
    fn test_oneof_choices() {
        let text = render_converters(&descriptor(MessageConverter {
            message: "Contact".into(),
            generated: "crate::pb::Contact".into(),
            host: "crate::model::Contact".into(),
            fields: vec![
                field("name", Conversion::Direct),
                choice("email", "via", Conversion::Direct),
                choice("phone", "via", Conversion::Direct),
            ],
            defaulted: vec![],
        }));
        assert!(text.contains(
            r#"            via: if let Some(v) = value.email {
                Some(crate::pb::contact::Via::Email(v))
            } else if let Some(v) = value.phone {
                Some(crate::pb::contact::Via::Phone(v))
            } else {
                None
            },"#
        ));
        assert!(text.contains(
            r#"        let mut oneof_email = None;
        let mut oneof_phone = None;
        match value.via {
            Some(crate::pb::contact::Via::Email(v)) => oneof_email = Some(v),
            Some(crate::pb::contact::Via::Phone(v)) => oneof_phone = Some(v),
            _ => {}
        }
        Ok(Self {
            name: value.name,
            email: oneof_email,
            phone: oneof_phone,
        })"#
        ));
    }

    #[test]
    fn test_oneof_path() {
        assert_eq!(oneof_path("crate::pb::Contact", "via"), "crate::pb::contact::Via");
        assert_eq!(oneof_path("crate::pb::order::LineItem", "pricing_rule"), "crate::pb::order::line_item::PricingRule");
    }
}
