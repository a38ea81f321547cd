use brine_proto_schema::{FieldDescriptor, ImportSet, Literal, Rule, ScalarKind, ValidationErrors, ViolationKind, WireKind};

use crate::registry::BuildContext;

use super::{
    impl_field_builder,
    rules::{describe, MembershipRules, RangeRules},
    Constant, Example, FieldCore, Membership, Optional, Ranged, Resolved,
};

/// Any integer or floating point field.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericField {
    pub(crate) core:       FieldCore,
    pub(crate) kind:       ScalarKind,
    pub(crate) range:      RangeRules,
    pub(crate) membership: MembershipRules,
    pub(crate) finite:     bool,
}

impl NumericField {
    pub(crate) fn new(name: &str, kind: ScalarKind) -> Self {
        debug_assert!(kind.is_numeric());
        NumericField {
            core: FieldCore::new(name),
            kind,
            range: RangeRules::default(),
            membership: MembershipRules::default(),
            finite: false,
        }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Rejects infinity and NaN. Only meaningful on `float` and `double`.
    pub fn finite(mut self) -> Self {
        self.finite = true;
        self
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let group = self.kind.proto_name();

        let mut named: Vec<(&str, &Literal)> = Vec::new();
        named.extend(self.range.values());
        named.extend(self.membership.values());
        named.extend(self.core.constant.iter().map(|v| ("const", v)));
        named.extend(self.core.examples.iter().map(|v| ("example", v)));
        for (rule, value) in named {
            if !fits(self.kind, value) {
                errors.push(ViolationKind::BoundTypeMismatch {
                    rule:  rule.to_string(),
                    value: describe(value),
                    kind:  group.to_string(),
                });
            }
        }

        self.range.check(&mut errors);
        self.membership.check(&mut errors);
        if self.finite && !self.kind.is_float() {
            errors.push(ViolationKind::FiniteOnNonFloat {
                kind: group.to_string(),
            });
        }

        let mut rules = self.range.rules(group);
        rules.extend(self.membership.rules(group));
        if self.finite {
            rules.push(Rule::new([group, "finite"], true));
        }

        let resolved = Resolved {
            kind:        WireKind::Scalar { scalar: self.kind },
            proto_type:  group.to_string(),
            target_type: self.kind.rust_type().to_string(),
            group:       Some(group),
            rules,
            imports:     ImportSet::new(),
        };
        self.core.finish(number, resolved, errors, ctx)
    }
}

/// Whether `value` is representable in a field of `kind`.
fn fits(kind: ScalarKind, value: &Literal) -> bool {
    let (min, max): (i128, i128) = match kind {
        ScalarKind::Double | ScalarKind::Float => return value.is_numeric(),
        ScalarKind::Int32 | ScalarKind::SInt32 | ScalarKind::SFixed32 => (i32::MIN as i128, i32::MAX as i128),
        ScalarKind::Int64 | ScalarKind::SInt64 | ScalarKind::SFixed64 => (i64::MIN as i128, i64::MAX as i128),
        ScalarKind::UInt32 | ScalarKind::Fixed32 => (0, u32::MAX as i128),
        ScalarKind::UInt64 | ScalarKind::Fixed64 => (0, u64::MAX as i128),
        _ => return false,
    };
    let value = match *value {
        Literal::Int(v) => v as i128,
        Literal::UInt(v) => v as i128,
        _ => return false,
    };
    min <= value && value <= max
}

impl_field_builder!(NumericField, BoolField);

impl Optional for NumericField {}

impl Ranged for NumericField {
    type Bound = Literal;

    fn range_mut(&mut self) -> &mut RangeRules {
        &mut self.range
    }
}

impl Membership for NumericField {
    type Member = Literal;

    fn membership_mut(&mut self) -> &mut MembershipRules {
        &mut self.membership
    }
}

impl Constant for NumericField {
    type Value = Literal;
}

impl Example for NumericField {
    type Value = Literal;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolField {
    pub(crate) core: FieldCore,
}

impl BoolField {
    pub(crate) fn new(name: &str) -> Self {
        BoolField {
            core: FieldCore::new(name),
        }
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let resolved = Resolved {
            kind:        WireKind::Scalar { scalar: ScalarKind::Bool },
            proto_type:  "bool".to_string(),
            target_type: "bool".to_string(),
            group:       Some("bool"),
            rules:       Vec::new(),
            imports:     ImportSet::new(),
        };
        self.core.finish(number, resolved, ValidationErrors::new(), ctx)
    }
}

impl Optional for BoolField {}

impl Constant for BoolField {
    type Value = bool;
}

impl Example for BoolField {
    type Value = bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{self, FieldBuilder};
    use pretty_assertions::assert_eq;

    fn build(field: NumericField) -> Result<FieldDescriptor, ValidationErrors> {
        let mut ctx = BuildContext::new("test.proto");
        field.build(1, &mut ctx)
    }

    #[test]
    fn test_bounds_render_under_kind_group() {
        let desc = build(field::int32("age").gte(0).lt(150)).unwrap();
        let rules: Vec<_> = desc.rules.iter().map(|r| (r.dotted(), r.value.clone())).collect();
        assert_eq!(
            rules,
            vec![
                ("int32.lt".to_string(), Literal::Int(150)),
                ("int32.gte".to_string(), Literal::Int(0)),
            ]
        );
        assert_eq!(desc.imports, vec!["buf/validate/validate.proto"]);
    }

    #[test]
    fn test_every_numeric_kind_rejects_inverted_bounds() {
        let constructors: [fn(&str) -> NumericField; 12] = [
            field::double, field::float, field::int32, field::int64, field::uint32, field::uint64,
            field::sint32, field::sint64, field::fixed32, field::fixed64, field::sfixed32, field::sfixed64,
        ];
        for constructor in constructors {
            let err = build(constructor("n").gt(10).lt(5)).unwrap_err();
            assert!(err.contains(|k| matches!(k, ViolationKind::InvertedRange { .. })));

            let err = build(constructor("n").gte(7).lte(7)).unwrap_err();
            assert!(err.contains(|k| matches!(k, ViolationKind::InvertedRange { .. })));

            assert!(build(constructor("n").gt(5).lt(10)).is_ok());
        }
    }

    #[test]
    fn test_violations_are_collected_together() {
        let err = build(field::int32("n").gt(1).gte(2).lt(0).finite().in_([1, 2]).not_in([2])).unwrap_err();
        let kinds: Vec<_> = err.kinds().cloned().collect();
        assert!(kinds.contains(&ViolationKind::ConflictingRules { first: "gt".into(), second: "gte".into() }));
        assert!(kinds.contains(&ViolationKind::InvertedRange { lower: "gt 1".into(), upper: "lt 0".into() }));
        assert!(kinds.contains(&ViolationKind::FiniteOnNonFloat { kind: "int32".into() }));
        assert!(kinds.contains(&ViolationKind::OverlappingMembership { values: "2".into() }));
    }

    #[test]
    fn test_finite_on_floats() {
        let desc = build(field::double("ratio").finite()).unwrap();
        assert_eq!(desc.rules[0].dotted(), "double.finite");
    }

    #[test]
    fn test_bound_out_of_range_for_kind() {
        let err = build(field::uint32("n").gt(-1)).unwrap_err();
        assert!(err.contains(|k| matches!(k, ViolationKind::BoundTypeMismatch { .. })));
        let err = build(field::int64("n").lt(1.5)).unwrap_err();
        assert!(err.contains(|k| matches!(k, ViolationKind::BoundTypeMismatch { .. })));
    }

    #[test]
    fn test_constant_excludes_other_rules_and_optional() {
        let desc = build(field::int32("version").const_value(2)).unwrap();
        assert!(desc.constant);
        assert_eq!(desc.rules[0].dotted(), "int32.const");

        let err = build(field::int32("version").const_value(2).gt(1).optional()).unwrap_err();
        assert!(err.contains(|k| matches!(k, ViolationKind::ConstWithRules { .. })));
        assert!(err.contains(|k| *k == ViolationKind::ConstOptional));
    }

    #[test]
    fn test_plain_field_needs_no_validate_import() {
        let mut ctx = BuildContext::new("test.proto");
        let desc = field::bool("active").build(3, &mut ctx).unwrap();
        assert!(desc.rules.is_empty());
        assert!(ctx.imports().is_empty());
        assert_eq!(desc.number, 3);
        assert_eq!(desc.proto_type, "bool");
    }
}
