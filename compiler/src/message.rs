//! Message models: the ordered field list, nested declarations, reserved
//! numbers and names, and the drift check against a bound host record.

use brine_proto_schema::{
    HostRecord, Literal, MessageDescriptor, OptionEntry, ReservedRange, Rule, ValidationErrors, ViolationKind,
};
use tracing::debug;

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    enumeration::EnumModel,
    field::{cel_literal, FieldModel},
    oneof::OneofModel,
    options::{push_option, set_option},
    registry::{BuildContext, DeclKind},
    traits::DescribeHost,
    utils::{normalize_type, optional_type, quote},
    verifier::{is_valid_field_number, verify_identifier, FIELD_NUMBER_MAX},
};

#[derive(Debug, Clone, PartialEq)]
pub struct MessageModel {
    pub(crate) name:            String,
    pub(crate) fields:          Vec<(u32, FieldModel)>,
    pub(crate) oneofs:          Vec<OneofModel>,
    pub(crate) messages:        Vec<MessageModel>,
    pub(crate) enums:           Vec<EnumModel>,
    pub(crate) reserved_ranges: Vec<ReservedRange>,
    pub(crate) reserved_names:  Vec<String>,
    pub(crate) cel:             Vec<Literal>,
    pub(crate) options:         Vec<OptionEntry>,
    pub(crate) host:            Option<HostRecord>,
    pub(crate) ignored:         BTreeSet<String>,
    pub(crate) skip_host_check: bool,
}

/// # Panics
///
/// Panics if `name` is not a valid identifier.
pub fn message(name: &str) -> MessageModel {
    verify_identifier("message", name);
    MessageModel {
        name:            name.to_string(),
        fields:          Vec::new(),
        oneofs:          Vec::new(),
        messages:        Vec::new(),
        enums:           Vec::new(),
        reserved_ranges: Vec::new(),
        reserved_names:  Vec::new(),
        cel:             Vec::new(),
        options:         Vec::new(),
        host:            None,
        ignored:         BTreeSet::new(),
        skip_host_check: false,
    }
}

impl MessageModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(mut self, number: u32, field: impl Into<FieldModel>) -> Self {
        self.fields.push((number, field.into()));
        self
    }

    pub fn oneof(mut self, oneof: OneofModel) -> Self {
        self.oneofs.push(oneof);
        self
    }

    /// Declares a message nested inside this one.
    pub fn message(mut self, message: MessageModel) -> Self {
        self.messages.push(message);
        self
    }

    /// Declares an enum nested inside this one.
    pub fn enumeration(mut self, model: EnumModel) -> Self {
        self.enums.push(model);
        self
    }

    pub fn reserved(self, number: u32) -> Self {
        self.reserved_range(number, number)
    }

    /// Reserves `start..=end`.
    pub fn reserved_range(mut self, start: u32, end: u32) -> Self {
        self.reserved_ranges.push(ReservedRange { start, end });
        self
    }

    pub fn reserved_name(mut self, name: &str) -> Self {
        verify_identifier("reserved", name);
        self.reserved_names.push(name.to_string());
        self
    }

    /// Adds a message-level CEL constraint. Constraints accumulate in call order.
    pub fn cel(mut self, id: &str, message: &str, expression: &str) -> Self {
        self.cel.push(cel_literal(id, message, expression));
        self
    }

    pub fn option(mut self, name: &str, value: impl Into<Literal>) -> Self {
        set_option(&mut self.options, name, value.into());
        self
    }

    pub fn repeated_option(mut self, name: &str, value: impl Into<Literal>) -> Self {
        push_option(&mut self.options, name, value.into());
        self
    }

    pub fn deprecated(self) -> Self {
        self.option("deprecated", true)
    }

    /// Binds the message to a host record. The build then checks the two
    /// agree field for field.
    pub fn bind(mut self, host: HostRecord) -> Self {
        self.host = Some(host);
        self
    }

    pub fn bind_host<T: DescribeHost>(self) -> Self {
        self.bind(T::describe_host())
    }

    /// Excludes a host field, or a schema field, from the drift check.
    pub fn ignore(mut self, name: &str) -> Self {
        self.ignored.insert(name.to_string());
        self
    }

    /// Keeps the binding for converters but skips the drift check.
    pub fn skip_host_check(mut self) -> Self {
        self.skip_host_check = true;
        self
    }

    pub fn host(&self) -> Option<&HostRecord> {
        self.host.as_ref()
    }

    /// Every field this message declares, oneof choices included, with the
    /// host type it expects.
    fn schema_fields(&self) -> Vec<(&str, String)> {
        let plain = self.fields.iter().map(|(_, field)| (field.name(), field.target_type()));
        let choices = self
            .oneofs
            .iter()
            .flat_map(|oneof| oneof.choices())
            .map(|(_, field)| (field.name(), optional_type(&field.target_type())));
        plain.chain(choices).collect()
    }

    /// Reports drift between the schema and its host record.
    pub fn check_host(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let host = match self.host {
            Some(ref host) if !self.skip_host_check => host,
            _ => return errors,
        };

        let mut schema: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (name, ty) in self.schema_fields() {
            schema.entry(name).or_default().push(ty);
        }

        for field in host.fields.iter().filter(|f| !self.ignored.contains(&f.name)) {
            match schema.get(field.name.as_str()).map(Vec::as_slice) {
                None | Some([]) => errors.push(ViolationKind::MissingSchemaField {
                    name: field.name.clone(),
                }),
                Some([ty]) => {
                    if normalize_type(ty) != normalize_type(&field.ty) {
                        errors.push(ViolationKind::HostTypeMismatch {
                            name:   field.name.clone(),
                            host:   field.ty.clone(),
                            schema: ty.clone(),
                        });
                    }
                }
                Some(matches) => errors.push(ViolationKind::AmbiguousHostField {
                    name:  field.name.clone(),
                    count: matches.len(),
                }),
            }
        }

        for name in schema.keys() {
            if host.get(name).is_none() && !self.ignored.contains(*name) {
                errors.push(ViolationKind::MissingHostField { name: name.to_string() });
            }
        }
        errors
    }

    /// Field numbers must be valid, unique across fields and oneof choices,
    /// and clear of every reserved range. Names must be unique and unreserved.
    fn check_numbers(&self, errors: &mut ValidationErrors) {
        let all: Vec<(u32, &str)> = self
            .fields
            .iter()
            .chain(self.oneofs.iter().flat_map(|oneof| oneof.choices()))
            .map(|(number, field)| (*number, field.name()))
            .collect();

        let mut numbers: BTreeMap<u32, &str> = BTreeMap::new();
        let mut names = BTreeSet::new();
        for &(number, name) in &all {
            if !is_valid_field_number(number) {
                errors.push(ViolationKind::InvalidFieldNumber { number });
            }
            if let Some(first) = numbers.insert(number, name) {
                errors.push(ViolationKind::DuplicateFieldNumber {
                    number,
                    first: first.to_string(),
                    second: name.to_string(),
                });
                numbers.insert(number, first);
            }
            if !names.insert(name) {
                errors.push(ViolationKind::DuplicateName { name: name.to_string() });
            }
        }

        for range in &self.reserved_ranges {
            if range.start > range.end {
                errors.push(ViolationKind::InvalidReservedRange {
                    start: range.start.into(),
                    end:   range.end.into(),
                });
                continue;
            }
            for bound in [range.start, range.end] {
                if !(1..=FIELD_NUMBER_MAX).contains(&bound) {
                    errors.push(ViolationKind::InvalidFieldNumber { number: bound });
                }
            }
            for &(number, name) in all.iter().filter(|(number, _)| range.contains(*number)) {
                errors.push(ViolationKind::ReservedNumberInUse {
                    number: number.into(),
                    field:  name.to_string(),
                });
            }
        }
        for name in &self.reserved_names {
            if names.contains(name.as_str()) {
                errors.push(ViolationKind::ReservedNameInUse { name: name.clone() });
            }
        }
    }

    /// Reports this message and everything nested in it, as package-relative names.
    pub(crate) fn declare(&self, prefix: &str, f: &mut dyn FnMut(String, DeclKind)) {
        let name = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", prefix, self.name)
        };
        f(name.clone(), DeclKind::Message);
        for model in &self.enums {
            f(format!("{}.{}", name, model.name()), DeclKind::Enum);
        }
        for message in &self.messages {
            message.declare(&name, f);
        }
    }

    /// Builds the message. Fields build in ascending number order whatever
    /// order they were added in. Every nested scope is built and checked even
    /// after a failure; if anything failed no descriptor is returned.
    pub fn build(self, ctx: &mut BuildContext) -> Result<MessageDescriptor, ValidationErrors> {
        let mut errors = self.check_host();
        self.check_numbers(&mut errors);

        let full_name = ctx.qualify(&self.name);
        ctx.enter(&self.name);

        let mut fields = self.fields;
        fields.sort_by_key(|(number, _)| *number);
        let mut built = Vec::with_capacity(fields.len());
        for (number, field) in fields {
            let scope = format!("field {}", quote(field.name()));
            if let Some(desc) = errors.collect(scope, field.build(number, ctx)) {
                built.push(desc);
            }
        }

        let mut oneofs = Vec::new();
        for oneof in self.oneofs {
            let scope = format!("oneof {}", quote(oneof.name()));
            oneofs.extend(errors.collect(scope, oneof.build(ctx)));
        }

        let mut messages = Vec::new();
        for message in self.messages {
            let scope = format!("message {}", quote(message.name()));
            messages.extend(errors.collect(scope, message.build(ctx)));
        }

        let mut enums = Vec::new();
        for model in self.enums {
            let scope = format!("enum {}", quote(model.name()));
            enums.extend(errors.collect(scope, model.build(ctx)));
        }

        ctx.leave();

        let rules: Vec<Rule> = self.cel.into_iter().map(|cel| Rule::new(["cel"], cel)).collect();
        if !rules.is_empty() {
            ctx.imports.insert(ctx.validate_import.clone());
        }

        debug!(message = %full_name, fields = built.len(), oneofs = oneofs.len(), "built message");
        errors.into_result(MessageDescriptor {
            name: self.name,
            full_name,
            fields: built,
            oneofs,
            messages,
            enums,
            reserved_ranges: self.reserved_ranges,
            reserved_names: self.reserved_names,
            rules,
            options: self.options,
            host: self.host,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{enumeration::enum_type, field, oneof::oneof, registry::TypeRegistry};
    use crate::field::{FieldBuilder, Lengthed, Optional};
    use pretty_assertions::assert_eq;

    fn user_host() -> HostRecord {
        HostRecord::new("crate::model::User").field("id", "i64").field("name", "String")
    }

    fn build(model: MessageModel) -> Result<MessageDescriptor, ValidationErrors> {
        model.build(&mut BuildContext::new("test.proto"))
    }

    #[test]
    fn test_fields_build_in_number_order() {
        let desc = build(
            message("User")
                .field(3, field::string("email"))
                .field(1, field::int64("id"))
                .field(2, field::string("name")),
        )
        .unwrap();
        let numbers: Vec<_> = desc.fields.iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_matching_host_builds() {
        let desc = build(
            message("User")
                .field(1, field::int64("id"))
                .field(2, field::string("name"))
                .bind(user_host()),
        )
        .unwrap();
        assert_eq!(desc.host, Some(user_host()));
    }

    #[test]
    fn test_missing_schema_field_and_ignore() {
        let model = message("User").field(1, field::int64("id")).bind(user_host());
        let err = build(model.clone()).unwrap_err();
        let kinds: Vec<_> = err.kinds().cloned().collect();
        assert_eq!(kinds, vec![ViolationKind::MissingSchemaField { name: "name".into() }]);

        assert!(build(model.ignore("name")).is_ok());
    }

    #[test]
    fn test_type_drift_and_extra_schema_field() {
        let err = build(
            message("User")
                .field(1, field::int32("id"))
                .field(2, field::string("name").optional())
                .field(3, field::bool("admin"))
                .bind(user_host()),
        )
        .unwrap_err();
        let kinds: Vec<_> = err.kinds().cloned().collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::HostTypeMismatch { name: "id".into(), host: "i64".into(), schema: "i32".into() },
                ViolationKind::HostTypeMismatch {
                    name:   "name".into(),
                    host:   "String".into(),
                    schema: "Option<String>".into(),
                },
                ViolationKind::MissingHostField { name: "admin".into() },
            ]
        );
    }

    #[test]
    fn test_oneof_choices_bind_as_options() {
        let host = HostRecord::new("crate::model::Contact")
            .field("email", "Option<String>")
            .field("phone", "Option<String>");
        let model = message("Contact")
            .oneof(oneof("via").choice(1, field::string("email")).choice(2, field::string("phone")))
            .bind(host);
        assert!(build(model).is_ok());
    }

    #[test]
    fn test_skip_host_check() {
        let model = message("User").field(1, field::int64("id")).bind(user_host()).skip_host_check();
        assert!(build(model).is_ok());
    }

    #[test]
    fn test_number_problems() {
        let err = build(
            message("Order")
                .field(1, field::string("id"))
                .field(1, field::string("code"))
                .field(19_500, field::string("internal"))
                .field(0, field::string("zero"))
                .oneof(oneof("payment").choice(4, field::string("card")).choice(5, field::string("id")))
                .reserved_range(4, 6)
                .reserved_name("code"),
        )
        .unwrap_err();
        let kinds: Vec<_> = err.kinds().cloned().collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::DuplicateFieldNumber { number: 1, first: "id".into(), second: "code".into() },
                ViolationKind::InvalidFieldNumber { number: 19_500 },
                ViolationKind::InvalidFieldNumber { number: 0 },
                ViolationKind::DuplicateName { name: "id".into() },
                ViolationKind::ReservedNumberInUse { number: 4, field: "card".into() },
                ViolationKind::ReservedNumberInUse { number: 5, field: "id".into() },
                ViolationKind::ReservedNameInUse { name: "code".into() },
            ]
        );
    }

    #[test]
    fn test_reserved_range_bounds() {
        let err = build(
            message("Order")
                .field(1, field::string("id"))
                .reserved_range(0, 3)
                .reserved_range(100, 536_870_912),
        )
        .unwrap_err();
        let kinds: Vec<_> = err.kinds().cloned().collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::InvalidFieldNumber { number: 0 },
                ViolationKind::ReservedNumberInUse { number: 1, field: "id".into() },
                ViolationKind::InvalidFieldNumber { number: 536_870_912 },
            ]
        );

        let spanning = message("Order").field(1, field::string("id")).reserved_range(10, 536_870_911);
        assert!(build(spanning).is_ok());
    }

    #[test]
    fn test_collection_hosts_ignore_entry_presence() {
        let host = HostRecord::new("crate::model::Item")
            .field("tags", "Vec<String>")
            .field("attrs", "HashMap<String, String>");
        let model = message("Item")
            .field(1, field::repeated("tags", field::string("tag").optional()))
            .field(2, field::map("attrs", field::string("k"), field::string("v").optional()))
            .bind(host);
        let desc = build(model).unwrap();
        assert_eq!(desc.fields[0].target_type, "Vec<String>");
        assert_eq!(desc.fields[1].target_type, "HashMap<String, String>");
    }

    #[test]
    fn test_errors_are_scoped_and_siblings_still_checked() {
        let err = build(
            message("User")
                .field(1, field::string("name").min_len(5).max_len(2))
                .field(2, field::int32("age"))
                .message(message("Address").field(1, field::string("city").len(3).min_len(1))),
        )
        .unwrap_err();
        let paths: Vec<_> = err.iter().map(|v| v.path.join(" / ")).collect();
        assert_eq!(paths, vec!["field \"name\"", "message \"Address\" / field \"city\""]);
    }

    #[test]
    fn test_nested_types_resolve_in_scope() {
        let outer = message("Order")
            .message(message("Line").field(1, field::string("sku")))
            .enumeration(enum_type("State").value("STATE_UNSPECIFIED", 0))
            .field(1, field::repeated("lines", field::message("item", "Line")))
            .field(2, field::enumeration("state", "State"));

        let mut registry = TypeRegistry::new();
        outer.declare("", &mut |name, kind| {
            registry.register(name, "shop.proto", kind).unwrap();
        });
        assert_eq!(registry.len(), 3);

        let mut ctx = BuildContext::with_registry("shop.proto", &registry);
        let desc = outer.build(&mut ctx).unwrap();
        assert_eq!(desc.messages[0].full_name, "Order.Line");
        assert_eq!(desc.enums[0].full_name, "Order.State");
        assert_eq!(desc.fields[0].target_type, "Vec<Line>");
        assert!(ctx.imports().is_empty());
    }

    #[test]
    fn test_message_cel_rules() {
        let mut ctx = BuildContext::new("test.proto");
        let desc = message("Range")
            .field(1, field::int32("lo"))
            .field(2, field::int32("hi"))
            .cel("lo_below_hi", "lo must be below hi", "this.lo < this.hi")
            .build(&mut ctx)
            .unwrap();
        assert_eq!(desc.rules[0].dotted(), "cel");
        assert!(ctx.imports().contains("buf/validate/validate.proto"));
    }

    #[test]
    fn test_optional_field_option_overwrite() {
        let desc = build(
            message("Doc").field(
                1,
                field::string("title").optional().option("(acme.label)", "a").option("(acme.label)", "b"),
            ),
        )
        .unwrap();
        assert_eq!(desc.fields[0].options.len(), 1);
        assert_eq!(desc.fields[0].options[0].value, Literal::from("b"));
    }
}
