//! Converter IR: for every message bound to a host record, how each host
//! field maps onto the generated message field.

use brine_proto_schema::{
    Conversion, ConverterDescriptor, FieldConversion, FieldDescriptor, FileDescriptor, MessageConverter,
    MessageDescriptor, WellKnownType, WireKind,
};

use std::collections::HashMap;

use crate::utils::rust_type_path;

/// Host record paths of bound messages, by package-relative message name.
type Hosts = HashMap<String, String>;

fn kind_conversion(kind: &WireKind, module: &str, hosts: &Hosts) -> Conversion {
    match kind {
        WireKind::Scalar { .. } => Conversion::Direct,
        WireKind::Enum { target } => Conversion::Enum {
            path: rust_type_path(module, &target.full_name),
        },
        WireKind::Message { target } => match target.well_known {
            Some(WellKnownType::Timestamp) => Conversion::Timestamp,
            Some(WellKnownType::Duration) => Conversion::Duration,
            Some(_) => Conversion::WellKnown,
            None => Conversion::Message {
                path: rust_type_path(module, &target.full_name),
                host: hosts.get(&target.full_name).cloned(),
            },
        },
        WireKind::Repeated { item } => Conversion::Repeated {
            inner: Box::new(kind_conversion(&item.kind, module, hosts)),
        },
        WireKind::Map { value, .. } => Conversion::Map {
            value: Box::new(kind_conversion(&value.kind, module, hosts)),
        },
    }
}

/// The conversion for one field. Optional fields and oneof choices are
/// `Option`s on the host side.
pub fn field_conversion(field: &FieldDescriptor, module: &str, hosts: &Hosts) -> Conversion {
    let conversion = kind_conversion(&field.kind, module, hosts);
    if field.optional || field.oneof.is_some() {
        Conversion::Optional {
            inner: Box::new(conversion),
        }
    } else {
        conversion
    }
}

fn message_converter(message: &MessageDescriptor, module: &str, hosts: &Hosts) -> Option<MessageConverter> {
    let host = message.host.as_ref()?;
    let schema_fields = message
        .fields
        .iter()
        .chain(message.oneofs.iter().flat_map(|oneof| oneof.fields.iter()));

    let mut fields = Vec::new();
    for field in schema_fields {
        if host.get(&field.name).is_none() {
            continue;
        }
        fields.push(FieldConversion {
            host_field:    field.name.clone(),
            message_field: field.name.clone(),
            conversion:    field_conversion(field, module, hosts),
            oneof:         field.oneof.clone(),
        });
    }

    let defaulted = host
        .fields
        .iter()
        .filter(|host_field| !fields.iter().any(|f| f.host_field == host_field.name))
        .map(|host_field| host_field.name.clone())
        .collect();

    Some(MessageConverter {
        message: message.full_name.clone(),
        generated: rust_type_path(module, &message.full_name),
        host: host.type_path.clone(),
        fields,
        defaulted,
    })
}

fn collect_hosts(messages: &[MessageDescriptor], hosts: &mut Hosts) {
    for message in messages {
        if let Some(host) = &message.host {
            hosts.insert(message.full_name.clone(), host.type_path.clone());
        }
        collect_hosts(&message.messages, hosts);
    }
}

fn collect_messages(messages: &[MessageDescriptor], module: &str, hosts: &Hosts, out: &mut Vec<MessageConverter>) {
    for message in messages {
        out.extend(message_converter(message, module, hosts));
        collect_messages(&message.messages, module, hosts, out);
    }
}

/// One converter block covering every bound message in `files`, in file
/// order with nested messages after their parent.
pub fn collect_converters(package: &str, module: &str, files: &[FileDescriptor]) -> ConverterDescriptor {
    let mut hosts = Hosts::new();
    for file in files {
        collect_hosts(&file.messages, &mut hosts);
    }
    let mut messages = Vec::new();
    for file in files {
        collect_messages(&file.messages, module, &hosts, &mut messages);
    }
    ConverterDescriptor {
        package: package.to_string(),
        generated_module: module.to_string(),
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DEFAULT_VALIDATE_IMPORT,
        field::{self, Optional},
        file::file,
        message::message,
        oneof::oneof,
        registry::TypeRegistry,
    };
    use brine_proto_schema::HostRecord;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bound_message_conversions() {
        let mut registry = TypeRegistry::new();
        let model = file("acme/user.proto").message(
            message("User")
                .field(1, field::int64("id"))
                .field(2, field::timestamp("created_at"))
                .field(3, field::duration("ttl").optional())
                .field(4, field::repeated("tags", field::string("tag")))
                .field(5, field::string("internal_note"))
                .oneof(oneof("contact").choice(6, field::string("email")))
                .field(7, field::message("profile", "Profile"))
                .message(
                    message("Profile")
                        .field(1, field::string("bio"))
                        .bind(HostRecord::new("crate::model::Profile").field("bio", "String")),
                )
                .bind(
                    HostRecord::new("crate::model::User")
                        .field("id", "i64")
                        .field("created_at", "SystemTime")
                        .field("ttl", "Option<Duration>")
                        .field("tags", "Vec<String>")
                        .field("email", "Option<String>")
                        .field("profile", "Profile")
                        .field("cache_key", "String"),
                )
                .ignore("internal_note")
                .ignore("cache_key"),
        );
        model.declare(&mut |name, kind| {
            registry.register(name, "acme/user.proto", kind).unwrap();
        });
        let desc = model.build("acme.v1", &registry, DEFAULT_VALIDATE_IMPORT).unwrap();
        let converters = collect_converters("acme.v1", "crate::pb", &[desc]);

        assert_eq!(converters.messages.len(), 2);
        assert_eq!(converters.messages[1].generated, "crate::pb::user::Profile");
        let user = &converters.messages[0];
        assert_eq!(user.generated, "crate::pb::User");
        assert_eq!(user.host, "crate::model::User");
        assert_eq!(user.defaulted, vec!["cache_key".to_string()]);

        let conversions: Vec<_> = user.fields.iter().map(|f| (f.host_field.as_str(), f.conversion.clone())).collect();
        assert_eq!(
            conversions,
            vec![
                ("id", Conversion::Direct),
                ("created_at", Conversion::Timestamp),
                ("ttl", Conversion::Optional { inner: Box::new(Conversion::Duration) }),
                ("tags", Conversion::Repeated { inner: Box::new(Conversion::Direct) }),
                (
                    "profile",
                    Conversion::Message {
                        path: "crate::pb::user::Profile".into(),
                        host: Some("crate::model::Profile".into()),
                    }
                ),
                ("email", Conversion::Optional { inner: Box::new(Conversion::Direct) }),
            ]
        );
        assert_eq!(user.fields[5].oneof.as_deref(), Some("contact"));
    }
}
