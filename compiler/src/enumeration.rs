use brine_proto_schema::{EnumDescriptor, EnumValueDescriptor, Literal, OptionEntry, ValidationErrors, ViolationKind};
use tracing::debug;

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    options::{push_option, set_option},
    registry::BuildContext,
    verifier::verify_identifier,
};

/// One member of an enum.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueModel {
    pub(crate) name:    String,
    pub(crate) number:  i32,
    pub(crate) options: Vec<OptionEntry>,
}

/// # Panics
///
/// Panics if `name` is not a valid identifier.
pub fn enum_value(name: &str, number: i32) -> EnumValueModel {
    verify_identifier("enum value", name);
    EnumValueModel {
        name: name.to_string(),
        number,
        options: Vec::new(),
    }
}

impl EnumValueModel {
    pub fn option(mut self, name: &str, value: impl Into<Literal>) -> Self {
        set_option(&mut self.options, name, value.into());
        self
    }

    pub fn deprecated(self) -> Self {
        self.option("deprecated", true)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumModel {
    pub(crate) name:            String,
    pub(crate) values:          Vec<EnumValueModel>,
    pub(crate) allow_alias:     bool,
    pub(crate) reserved_ranges: Vec<(i32, i32)>,
    pub(crate) reserved_names:  Vec<String>,
    pub(crate) options:         Vec<OptionEntry>,
}

/// # Panics
///
/// Panics if `name` is not a valid identifier.
pub fn enum_type(name: &str) -> EnumModel {
    verify_identifier("enum", name);
    EnumModel {
        name:            name.to_string(),
        values:          Vec::new(),
        allow_alias:     false,
        reserved_ranges: Vec::new(),
        reserved_names:  Vec::new(),
        options:         Vec::new(),
    }
}

impl EnumModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(self, name: &str, number: i32) -> Self {
        self.entry(enum_value(name, number))
    }

    pub fn entry(mut self, value: EnumValueModel) -> Self {
        self.values.push(value);
        self
    }

    /// Permits several names for one number.
    pub fn allow_alias(mut self) -> Self {
        self.allow_alias = true;
        set_option(&mut self.options, "allow_alias", Literal::Bool(true));
        self
    }

    pub fn reserved(self, number: i32) -> Self {
        self.reserved_range(number, number)
    }

    /// Reserves `start..=end`.
    pub fn reserved_range(mut self, start: i32, end: i32) -> Self {
        self.reserved_ranges.push((start, end));
        self
    }

    pub fn reserved_name(mut self, name: &str) -> Self {
        verify_identifier("reserved", name);
        self.reserved_names.push(name.to_string());
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

    fn check(&self, errors: &mut ValidationErrors) {
        if !self.values.iter().any(|value| value.number == 0) {
            errors.push(ViolationKind::EnumMissingZero);
        }

        let mut names = BTreeSet::new();
        let mut numbers: BTreeMap<i32, &str> = BTreeMap::new();
        for value in &self.values {
            if !names.insert(value.name.as_str()) {
                errors.push(ViolationKind::DuplicateName { name: value.name.clone() });
            }
            match numbers.get(&value.number) {
                Some(first) if !self.allow_alias => errors.push(ViolationKind::DuplicateEnumNumber {
                    number: value.number,
                    first:  first.to_string(),
                    second: value.name.clone(),
                }),
                Some(_) => {}
                None => {
                    numbers.insert(value.number, &value.name);
                }
            }
        }

        for &(start, end) in &self.reserved_ranges {
            if start > end {
                errors.push(ViolationKind::InvalidReservedRange {
                    start: start.into(),
                    end:   end.into(),
                });
                continue;
            }
            for value in self.values.iter().filter(|v| start <= v.number && v.number <= end) {
                errors.push(ViolationKind::ReservedNumberInUse {
                    number: value.number.into(),
                    field:  value.name.clone(),
                });
            }
        }
        for name in &self.reserved_names {
            if names.contains(name.as_str()) {
                errors.push(ViolationKind::ReservedNameInUse { name: name.clone() });
            }
        }
    }

    /// Validates the enum. Values come out with the zero value first and the
    /// rest in ascending order; aliases keep their declaration order.
    pub fn build(self, ctx: &mut BuildContext) -> Result<EnumDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.check(&mut errors);

        let mut values: Vec<EnumValueDescriptor> = self
            .values
            .into_iter()
            .map(|value| EnumValueDescriptor {
                name:    value.name,
                number:  value.number,
                options: value.options,
            })
            .collect();
        values.sort_by_key(|value| (value.number != 0, value.number));

        debug!(name = %self.name, values = values.len(), "built enum");
        errors.into_result(EnumDescriptor {
            full_name: ctx.qualify(&self.name),
            name: self.name,
            values,
            reserved_ranges: self.reserved_ranges,
            reserved_names: self.reserved_names,
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(model: EnumModel) -> Result<EnumDescriptor, ValidationErrors> {
        model.build(&mut BuildContext::new("test.proto"))
    }

    #[test]
    fn test_zero_first_then_ascending() {
        let desc = build(
            enum_type("Status")
                .value("STATUS_ARCHIVED", 7)
                .value("STATUS_ACTIVE", 2)
                .value("STATUS_UNSPECIFIED", 0),
        )
        .unwrap();
        let order: Vec<_> = desc.values.iter().map(|v| (v.name.as_str(), v.number)).collect();
        assert_eq!(
            order,
            vec![("STATUS_UNSPECIFIED", 0), ("STATUS_ACTIVE", 2), ("STATUS_ARCHIVED", 7)]
        );
        assert_eq!(desc.full_name, "Status");
    }

    #[test]
    fn test_missing_zero() {
        let err = build(enum_type("Status").value("STATUS_ACTIVE", 1)).unwrap_err();
        assert_eq!(err.kinds().next(), Some(&ViolationKind::EnumMissingZero));
    }

    #[test]
    fn test_aliases_need_allow_alias() {
        let model = enum_type("Mode").value("MODE_UNSPECIFIED", 0).value("MODE_ON", 1).value("MODE_ENABLED", 1);
        let err = build(model.clone()).unwrap_err();
        assert_eq!(
            err.kinds().next(),
            Some(&ViolationKind::DuplicateEnumNumber {
                number: 1,
                first:  "MODE_ON".into(),
                second: "MODE_ENABLED".into(),
            })
        );
        let desc = build(model.allow_alias()).unwrap();
        assert_eq!(desc.options[0].name, "allow_alias");
    }

    #[test]
    fn test_reserved_collisions() {
        let err = build(
            enum_type("Kind")
                .value("KIND_UNSPECIFIED", 0)
                .value("KIND_OLD", 3)
                .reserved_range(2, 4)
                .reserved_range(9, 8)
                .reserved_name("KIND_OLD"),
        )
        .unwrap_err();
        let kinds: Vec<_> = err.kinds().cloned().collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::ReservedNumberInUse { number: 3, field: "KIND_OLD".into() },
                ViolationKind::InvalidReservedRange { start: 9, end: 8 },
                ViolationKind::ReservedNameInUse { name: "KIND_OLD".into() },
            ]
        );
    }
}
