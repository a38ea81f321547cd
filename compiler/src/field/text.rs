use brine_proto_schema::{FieldDescriptor, ImportSet, Literal, Rule, ScalarKind, ValidationErrors, ViolationKind, WireKind};
use regex::Regex;

use crate::registry::BuildContext;

use super::{
    impl_field_builder,
    rules::{check_formats, format_rules, Format, LengthRules, MembershipRules, BYTE_LENGTH, CHAR_LENGTH},
    Constant, Example, FieldCore, Lengthed, Membership, Optional, Resolved,
};

/// Substring and pattern rules shared by strings and bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Affixes {
    pub pattern:      Option<String>,
    pub prefix:       Option<Literal>,
    pub suffix:       Option<Literal>,
    pub contains:     Option<Literal>,
    pub not_contains: Option<Literal>,
}

impl Affixes {
    /// The pattern must compile; RE2 and the `regex` crate share their syntax.
    fn check(&self, errors: &mut ValidationErrors) {
        if let Some(ref pattern) = self.pattern {
            if let Err(err) = Regex::new(pattern) {
                errors.push(ViolationKind::InvalidPattern {
                    pattern: pattern.clone(),
                    reason:  err.to_string(),
                });
            }
        }
    }

    fn rules(&self, group: &str) -> Vec<Rule> {
        let mut rules = Vec::new();
        if let Some(ref pattern) = self.pattern {
            rules.push(Rule::new([group, "pattern"], pattern.as_str()));
        }
        for (name, value) in [
            ("prefix", &self.prefix),
            ("suffix", &self.suffix),
            ("contains", &self.contains),
            ("not_contains", &self.not_contains),
        ] {
            if let Some(value) = value {
                rules.push(Rule::new([group, name], value.clone()));
            }
        }
        rules
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringField {
    pub(crate) core:       FieldCore,
    pub(crate) length:     LengthRules,
    pub(crate) bytes:      LengthRules,
    pub(crate) membership: MembershipRules,
    pub(crate) affixes:    Affixes,
    pub(crate) formats:    Vec<Format>,
}

impl StringField {
    pub(crate) fn new(name: &str) -> Self {
        StringField {
            core:       FieldCore::new(name),
            length:     LengthRules::default(),
            bytes:      LengthRules::default(),
            membership: MembershipRules::default(),
            affixes:    Affixes::default(),
            formats:    Vec::new(),
        }
    }

    pub fn min_bytes(mut self, value: u64) -> Self {
        self.bytes.min = Some(value);
        self
    }

    pub fn max_bytes(mut self, value: u64) -> Self {
        self.bytes.max = Some(value);
        self
    }

    pub fn len_bytes(mut self, value: u64) -> Self {
        self.bytes.exact = Some(value);
        self
    }

    /// An RE2 pattern the whole value must match.
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.affixes.pattern = Some(pattern.to_string());
        self
    }

    pub fn prefix(mut self, value: &str) -> Self {
        self.affixes.prefix = Some(value.into());
        self
    }

    pub fn suffix(mut self, value: &str) -> Self {
        self.affixes.suffix = Some(value.into());
        self
    }

    pub fn contains(mut self, value: &str) -> Self {
        self.affixes.contains = Some(value.into());
        self
    }

    pub fn not_contains(mut self, value: &str) -> Self {
        self.affixes.not_contains = Some(value.into());
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.formats.push(format);
        self
    }

    pub fn email(self) -> Self {
        self.format(Format::Email)
    }

    pub fn hostname(self) -> Self {
        self.format(Format::Hostname)
    }

    pub fn ip(self) -> Self {
        self.format(Format::Ip)
    }

    pub fn ipv4(self) -> Self {
        self.format(Format::Ipv4)
    }

    pub fn ipv6(self) -> Self {
        self.format(Format::Ipv6)
    }

    pub fn uri(self) -> Self {
        self.format(Format::Uri)
    }

    pub fn uri_ref(self) -> Self {
        self.format(Format::UriRef)
    }

    pub fn address(self) -> Self {
        self.format(Format::Address)
    }

    pub fn uuid(self) -> Self {
        self.format(Format::Uuid)
    }

    pub fn host_and_port(self) -> Self {
        self.format(Format::HostAndPort)
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.length.check(CHAR_LENGTH, &mut errors);
        self.bytes.check(BYTE_LENGTH, &mut errors);
        self.membership.check(&mut errors);
        self.affixes.check(&mut errors);
        check_formats(&self.formats, &mut errors);

        let mut rules = self.length.rules("string", CHAR_LENGTH);
        rules.extend(self.bytes.rules("string", BYTE_LENGTH));
        rules.extend(self.affixes.rules("string"));
        rules.extend(self.membership.rules("string"));
        rules.extend(format_rules("string", &self.formats));

        let resolved = Resolved {
            kind:        WireKind::Scalar { scalar: ScalarKind::String },
            proto_type:  "string".to_string(),
            target_type: "String".to_string(),
            group:       Some("string"),
            rules,
            imports:     ImportSet::new(),
        };
        self.core.finish(number, resolved, errors, ctx)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BytesField {
    pub(crate) core:       FieldCore,
    pub(crate) length:     LengthRules,
    pub(crate) membership: MembershipRules,
    pub(crate) affixes:    Affixes,
    pub(crate) formats:    Vec<Format>,
}

impl BytesField {
    pub(crate) fn new(name: &str) -> Self {
        BytesField {
            core:       FieldCore::new(name),
            length:     LengthRules::default(),
            membership: MembershipRules::default(),
            affixes:    Affixes::default(),
            formats:    Vec::new(),
        }
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.affixes.pattern = Some(pattern.to_string());
        self
    }

    pub fn prefix(mut self, value: &[u8]) -> Self {
        self.affixes.prefix = Some(value.into());
        self
    }

    pub fn suffix(mut self, value: &[u8]) -> Self {
        self.affixes.suffix = Some(value.into());
        self
    }

    pub fn contains(mut self, value: &[u8]) -> Self {
        self.affixes.contains = Some(value.into());
        self
    }

    pub fn ip(mut self) -> Self {
        self.formats.push(Format::Ip);
        self
    }

    pub fn ipv4(mut self) -> Self {
        self.formats.push(Format::Ipv4);
        self
    }

    pub fn ipv6(mut self) -> Self {
        self.formats.push(Format::Ipv6);
        self
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.length.check(CHAR_LENGTH, &mut errors);
        self.membership.check(&mut errors);
        self.affixes.check(&mut errors);
        check_formats(&self.formats, &mut errors);

        let mut rules = self.length.rules("bytes", CHAR_LENGTH);
        rules.extend(self.affixes.rules("bytes"));
        rules.extend(self.membership.rules("bytes"));
        rules.extend(format_rules("bytes", &self.formats));

        let resolved = Resolved {
            kind:        WireKind::Scalar { scalar: ScalarKind::Bytes },
            proto_type:  "bytes".to_string(),
            target_type: "Vec<u8>".to_string(),
            group:       Some("bytes"),
            rules,
            imports:     ImportSet::new(),
        };
        self.core.finish(number, resolved, errors, ctx)
    }
}

impl_field_builder!(StringField, BytesField);

impl Optional for StringField {}
impl Optional for BytesField {}

impl Lengthed for StringField {
    fn length_mut(&mut self) -> &mut LengthRules {
        &mut self.length
    }
}

impl Lengthed for BytesField {
    fn length_mut(&mut self) -> &mut LengthRules {
        &mut self.length
    }
}

impl Membership for StringField {
    type Member = String;

    fn membership_mut(&mut self) -> &mut MembershipRules {
        &mut self.membership
    }
}

impl Membership for BytesField {
    type Member = Vec<u8>;

    fn membership_mut(&mut self) -> &mut MembershipRules {
        &mut self.membership
    }
}

impl Constant for StringField {
    type Value = String;
}

impl Constant for BytesField {
    type Value = Vec<u8>;
}

impl Example for StringField {
    type Value = String;
}

impl Example for BytesField {
    type Value = Vec<u8>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{self, FieldBuilder};
    use pretty_assertions::assert_eq;

    fn build(field: StringField) -> Result<FieldDescriptor, ValidationErrors> {
        field.build(2, &mut BuildContext::new("test.proto"))
    }

    #[test]
    fn test_length_and_format_rules() {
        let desc = build(field::string("email").min_len(5).max_len(254).email().required()).unwrap();
        let dotted: Vec<_> = desc.rules.iter().map(|r| r.dotted()).collect();
        assert_eq!(dotted, vec!["string.min_len", "string.max_len", "string.email", "required"]);
    }

    #[test]
    fn test_length_conflicts_reported() {
        let err = build(field::string("code").len(4).min_len(2).max_len(1)).unwrap_err();
        assert_eq!(err.len(), 3);
    }

    #[test]
    fn test_one_format_per_field() {
        let err = build(field::string("id").uuid().email()).unwrap_err();
        assert_eq!(
            err.kinds().next(),
            Some(&ViolationKind::MultipleFormats { formats: "uuid, email".into() })
        );
    }

    #[test]
    fn test_in_not_in_overlap() {
        assert!(build(field::string("tier").in_(["free", "pro"]).not_in(["gold"])).is_ok());
        let err = build(field::string("tier").in_(["free", "pro"]).not_in(["pro"])).unwrap_err();
        assert!(err.contains(|k| matches!(k, ViolationKind::OverlappingMembership { .. })));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = build(field::string("slug").pattern("([a-z")).unwrap_err();
        assert!(err.contains(|k| matches!(k, ViolationKind::InvalidPattern { .. })));
        assert!(build(field::string("slug").pattern("^[a-z-]+$")).is_ok());
    }

    #[test]
    fn test_examples_stack_in_call_order() {
        let desc = build(field::string("name").example("alice").example("bob")).unwrap();
        let examples: Vec<_> = desc
            .rules
            .iter()
            .filter(|r| r.dotted() == "string.example")
            .map(|r| r.value.clone())
            .collect();
        assert_eq!(examples, vec![Literal::from("alice"), Literal::from("bob")]);
    }

    #[test]
    fn test_bytes_rules() {
        let mut ctx = BuildContext::new("test.proto");
        let desc = field::bytes("addr").ipv4().max_len(4).build(1, &mut ctx).unwrap();
        let dotted: Vec<_> = desc.rules.iter().map(|r| r.dotted()).collect();
        assert_eq!(dotted, vec!["bytes.max_len", "bytes.ipv4"]);
        assert_eq!(desc.target_type, "Vec<u8>");

        let err = field::bytes("addr").ip().ipv6().build(1, &mut ctx).unwrap_err();
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn test_optional_string_target_type() {
        let desc = build(field::string("nick").optional().deprecated()).unwrap();
        assert!(desc.optional);
        assert_eq!(desc.target_type, "Option<String>");
        assert_eq!(desc.options[0].name, "deprecated");
    }
}
