use brine_proto_schema::{FieldDescriptor, ImportSet, Literal, Rule, ValidationErrors, ViolationKind, WellKnownType, WireKind};

use std::time::{Duration, SystemTime};

use crate::registry::{BuildContext, DeclKind};

use super::{impl_field_builder, rules::describe, rules::MembershipRules, rules::RangeRules, Constant, Example, FieldCore, Membership, Optional, Ranged, Resolved};

/// A `google.protobuf.Timestamp` field.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampField {
    pub(crate) core:   FieldCore,
    pub(crate) range:  RangeRules,
    pub(crate) lt_now: bool,
    pub(crate) gt_now: bool,
    pub(crate) within: Option<Duration>,
}

impl TimestampField {
    pub(crate) fn new(name: &str) -> Self {
        TimestampField {
            core:   FieldCore::new(name),
            range:  RangeRules::default(),
            lt_now: false,
            gt_now: false,
            within: None,
        }
    }

    /// The value must lie in the past at validation time.
    pub fn lt_now(mut self) -> Self {
        self.lt_now = true;
        self
    }

    /// The value must lie in the future at validation time.
    pub fn gt_now(mut self) -> Self {
        self.gt_now = true;
        self
    }

    /// The value must lie within `window` of the current time.
    pub fn within(mut self, window: Duration) -> Self {
        self.within = Some(window);
        self
    }

    fn check(&self, errors: &mut ValidationErrors) {
        self.range.check(errors);
        if let Some(window) = self.within {
            check_duration("within", &Literal::duration(window), errors);
        }
        let conflicts = [
            (self.lt_now && self.range.lt.is_some(), "lt", "lt_now"),
            (self.lt_now && self.range.lte.is_some(), "lte", "lt_now"),
            (self.gt_now && self.range.gt.is_some(), "gt", "gt_now"),
            (self.gt_now && self.range.gte.is_some(), "gte", "gt_now"),
            (self.lt_now && self.gt_now, "lt_now", "gt_now"),
        ];
        for (_, first, second) in conflicts.iter().filter(|(hit, ..)| *hit) {
            errors.push(ViolationKind::ConflictingRules {
                first:  first.to_string(),
                second: second.to_string(),
            });
        }
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.check(&mut errors);

        let mut rules = self.range.rules("timestamp");
        if self.lt_now {
            rules.push(Rule::new(["timestamp", "lt_now"], true));
        }
        if self.gt_now {
            rules.push(Rule::new(["timestamp", "gt_now"], true));
        }
        if let Some(window) = self.within {
            rules.push(Rule::new(["timestamp", "within"], Literal::duration(window)));
        }

        well_known_field(self.core, WellKnownType::Timestamp, number, rules, errors, ctx)
    }
}

impl Optional for TimestampField {}

impl Ranged for TimestampField {
    type Bound = SystemTime;

    fn range_mut(&mut self) -> &mut RangeRules {
        &mut self.range
    }
}

impl Constant for TimestampField {
    type Value = SystemTime;
}

impl Example for TimestampField {
    type Value = SystemTime;
}

/// A `google.protobuf.Duration` field.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationField {
    pub(crate) core:       FieldCore,
    pub(crate) range:      RangeRules,
    pub(crate) membership: MembershipRules,
}

impl DurationField {
    pub(crate) fn new(name: &str) -> Self {
        DurationField {
            core:       FieldCore::new(name),
            range:      RangeRules::default(),
            membership: MembershipRules::default(),
        }
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.range.check(&mut errors);
        self.membership.check(&mut errors);
        let constant = self.core.constant.iter().map(|value| ("const", value));
        for (rule, value) in self.range.values().chain(self.membership.values()).chain(constant) {
            check_duration(rule, value, &mut errors);
        }

        let mut rules = self.range.rules("duration");
        rules.extend(self.membership.rules("duration"));
        well_known_field(self.core, WellKnownType::Duration, number, rules, errors, ctx)
    }
}

impl Optional for DurationField {}

impl Ranged for DurationField {
    type Bound = Duration;

    fn range_mut(&mut self) -> &mut RangeRules {
        &mut self.range
    }
}

impl Membership for DurationField {
    type Member = Duration;

    fn membership_mut(&mut self) -> &mut MembershipRules {
        &mut self.membership
    }
}

impl Constant for DurationField {
    type Value = Duration;
}

impl Example for DurationField {
    type Value = Duration;
}

fn check_duration(rule: &str, value: &Literal, errors: &mut ValidationErrors) {
    if !value.in_duration_range() {
        errors.push(ViolationKind::DurationOutOfRange {
            rule:  rule.to_string(),
            value: describe(value),
        });
    }
}

fn well_known_field(
    core: FieldCore,
    wkt: WellKnownType,
    number: u32,
    rules: Vec<Rule>,
    mut errors: ValidationErrors,
    ctx: &mut BuildContext,
) -> Result<FieldDescriptor, ValidationErrors> {
    let mut imports = ImportSet::new();
    let target = match ctx.resolve(&wkt.into(), DeclKind::Message, &mut imports) {
        Ok(target) => target,
        Err(kind) => {
            errors.push(kind);
            return Err(errors);
        }
    };
    let resolved = Resolved {
        proto_type:  target.proto_name.clone(),
        target_type: wkt.rust_type().to_string(),
        kind:        WireKind::Message { target },
        group:       wkt.rule_group(),
        rules,
        imports,
    };
    core.finish(number, resolved, errors, ctx)
}

impl_field_builder!(TimestampField, DurationField);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{self, FieldBuilder};
    use pretty_assertions::assert_eq;

    use std::time::UNIX_EPOCH;

    #[test]
    fn test_timestamp_imports_once() {
        let mut ctx = BuildContext::new("events.proto");
        let created = field::timestamp("created_at").lt_now().build(1, &mut ctx).unwrap();
        let updated = field::timestamp("updated_at").build(2, &mut ctx).unwrap();
        assert_eq!(created.proto_type, "google.protobuf.Timestamp");
        assert_eq!(updated.target_type, "SystemTime");
        assert_eq!(created.rules[0].dotted(), "timestamp.lt_now");
        assert_eq!(
            ctx.imports().to_vec(),
            vec!["buf/validate/validate.proto", "google/protobuf/timestamp.proto"]
        );
    }

    #[test]
    fn test_now_rules_conflict_with_bounds() {
        let mut ctx = BuildContext::new("events.proto");
        let err = field::timestamp("at")
            .lt_now()
            .gt_now()
            .lt(UNIX_EPOCH + Duration::from_secs(10))
            .build(1, &mut ctx)
            .unwrap_err();
        let kinds: Vec<_> = err.kinds().cloned().collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::ConflictingRules { first: "lt".into(), second: "lt_now".into() },
                ViolationKind::ConflictingRules { first: "lt_now".into(), second: "gt_now".into() },
            ]
        );
    }

    #[test]
    fn test_timestamp_range_is_ordered() {
        let mut ctx = BuildContext::new("events.proto");
        let early = UNIX_EPOCH + Duration::from_secs(100);
        let late = UNIX_EPOCH + Duration::from_secs(200);
        assert!(field::timestamp("at").gt(early).lt(late).build(1, &mut ctx).is_ok());
        let err = field::timestamp("at").gte(late).lte(early).build(1, &mut ctx).unwrap_err();
        assert!(err.contains(|k| matches!(k, ViolationKind::InvertedRange { .. })));
    }

    #[test]
    fn test_duration_rules() {
        let mut ctx = BuildContext::new("jobs.proto");
        let desc = field::duration("timeout")
            .gt(Duration::ZERO)
            .lte(Duration::from_secs(3600))
            .optional()
            .build(3, &mut ctx)
            .unwrap();
        let dotted: Vec<_> = desc.rules.iter().map(|r| r.dotted()).collect();
        assert_eq!(dotted, vec!["duration.lte", "duration.gt"]);
        assert_eq!(desc.target_type, "Option<Duration>");
        assert!(ctx.imports().contains("google/protobuf/duration.proto"));

        let err = field::duration("timeout")
            .in_([Duration::from_secs(1)])
            .not_in([Duration::from_millis(1000)])
            .build(3, &mut ctx)
            .unwrap_err();
        assert!(err.contains(|k| matches!(k, ViolationKind::OverlappingMembership { .. })));
    }

    #[test]
    fn test_durations_beyond_proto_range() {
        let mut ctx = BuildContext::new("jobs.proto");
        let err = field::duration("timeout")
            .gt(Duration::ZERO)
            .lte(Duration::MAX)
            .build(3, &mut ctx)
            .unwrap_err();
        let kinds: Vec<_> = err.kinds().cloned().collect();
        assert_eq!(
            kinds,
            vec![ViolationKind::DurationOutOfRange {
                rule:  "lte".into(),
                value: format!("{{seconds: {}, nanos: 999999999}}", i64::MAX),
            }]
        );

        let ten_thousand_years = Duration::from_secs(315_576_000_000);
        assert!(field::duration("timeout").lte(ten_thousand_years).build(3, &mut ctx).is_ok());

        let err = field::timestamp("at").within(ten_thousand_years + Duration::from_secs(1)).build(1, &mut ctx).unwrap_err();
        assert!(err.contains(|k| matches!(k, ViolationKind::DurationOutOfRange { .. })));
    }
}
