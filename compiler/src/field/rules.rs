//! Rule containers shared by several field kinds, and the consistency checks
//! that apply to them. Checks only report; they never stop at the first problem.

use brine_proto_schema::{Literal, Rule, ValidationErrors, ViolationKind};

use std::cmp::Ordering;

pub(crate) fn describe(value: &Literal) -> String {
    match value {
        Literal::Bool(v) => v.to_string(),
        Literal::Int(v) => v.to_string(),
        Literal::UInt(v) => v.to_string(),
        Literal::Float(v) => v.to_string(),
        Literal::String(v) => crate::utils::quote(v),
        Literal::Bytes(v) => crate::utils::quote_bytes(v),
        Literal::Ident(v) => v.clone(),
        Literal::List(items) => format!("[{}]", items.iter().map(describe).collect::<Vec<_>>().join(", ")),
        Literal::Message(fields) => format!(
            "{{{}}}",
            fields
                .iter()
                .map(|(name, value)| format!("{}: {}", name, describe(value)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Upper and lower bounds. At most one of each pair may be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeRules {
    pub(crate) lt:  Option<Literal>,
    pub(crate) lte: Option<Literal>,
    pub(crate) gt:  Option<Literal>,
    pub(crate) gte: Option<Literal>,
}

impl RangeRules {
    pub fn is_empty(&self) -> bool {
        self.lt.is_none() && self.lte.is_none() && self.gt.is_none() && self.gte.is_none()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = (&'static str, &Literal)> {
        [("lt", &self.lt), ("lte", &self.lte), ("gt", &self.gt), ("gte", &self.gte)]
            .into_iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
    }

    fn upper(&self) -> Option<(&'static str, &Literal)> {
        match (&self.lt, &self.lte) {
            (Some(v), _) => Some(("lt", v)),
            (None, Some(v)) => Some(("lte", v)),
            _ => None,
        }
    }

    fn lower(&self) -> Option<(&'static str, &Literal)> {
        match (&self.gt, &self.gte) {
            (Some(v), _) => Some(("gt", v)),
            (None, Some(v)) => Some(("gte", v)),
            _ => None,
        }
    }

    /// The lower bound must sit strictly below the upper bound whichever
    /// pair of bound rules is used.
    pub(crate) fn check(&self, errors: &mut ValidationErrors) {
        for (name, _) in self.values().filter(|(_, value)| matches!(value, Literal::Float(v) if v.is_nan())) {
            errors.push(ViolationKind::NanBound { rule: name.to_string() });
        }
        if self.lt.is_some() && self.lte.is_some() {
            errors.push(ViolationKind::ConflictingRules {
                first:  "lt".to_string(),
                second: "lte".to_string(),
            });
        }
        if self.gt.is_some() && self.gte.is_some() {
            errors.push(ViolationKind::ConflictingRules {
                first:  "gt".to_string(),
                second: "gte".to_string(),
            });
        }
        if let (Some((lower_name, lower)), Some((upper_name, upper))) = (self.lower(), self.upper()) {
            if matches!(lower.compare(upper), Some(Ordering::Greater | Ordering::Equal)) {
                errors.push(ViolationKind::InvertedRange {
                    lower: format!("{} {}", lower_name, describe(lower)),
                    upper: format!("{} {}", upper_name, describe(upper)),
                });
            }
        }
    }

    pub(crate) fn rules(&self, group: &str) -> Vec<Rule> {
        self.values()
            .map(|(name, value)| Rule::new([group, name], value.clone()))
            .collect()
    }
}

/// `in` / `not_in` lists. The two must not share a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MembershipRules {
    pub(crate) in_:    Vec<Literal>,
    pub(crate) not_in: Vec<Literal>,
}

impl MembershipRules {
    pub fn is_empty(&self) -> bool {
        self.in_.is_empty() && self.not_in.is_empty()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = (&'static str, &Literal)> {
        self.in_
            .iter()
            .map(|v| ("in", v))
            .chain(self.not_in.iter().map(|v| ("not_in", v)))
    }

    pub(crate) fn check(&self, errors: &mut ValidationErrors) {
        let shared: Vec<String> = self
            .in_
            .iter()
            .filter(|a| {
                self.not_in
                    .iter()
                    .any(|b| *a == b || a.compare(b) == Some(Ordering::Equal))
            })
            .map(describe)
            .collect();
        if !shared.is_empty() {
            errors.push(ViolationKind::OverlappingMembership {
                values: shared.join(", "),
            });
        }
    }

    pub(crate) fn rules(&self, group: &str) -> Vec<Rule> {
        let mut rules = Vec::new();
        if !self.in_.is_empty() {
            rules.push(Rule::new([group, "in"], Literal::List(self.in_.clone())));
        }
        if !self.not_in.is_empty() {
            rules.push(Rule::new([group, "not_in"], Literal::List(self.not_in.clone())));
        }
        rules
    }
}

/// Names of the three length rules for one measured quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthNames {
    pub min:   &'static str,
    pub max:   &'static str,
    pub exact: Option<&'static str>,
}

pub const CHAR_LENGTH:  LengthNames = LengthNames { min: "min_len",   max: "max_len",   exact: Some("len") };
pub const BYTE_LENGTH:  LengthNames = LengthNames { min: "min_bytes", max: "max_bytes", exact: Some("len_bytes") };
pub const ITEM_COUNT:   LengthNames = LengthNames { min: "min_items", max: "max_items", exact: None };
pub const PAIR_COUNT:   LengthNames = LengthNames { min: "min_pairs", max: "max_pairs", exact: None };

/// Minimum, maximum and exact length. The exact length excludes both others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LengthRules {
    pub(crate) min:   Option<u64>,
    pub(crate) max:   Option<u64>,
    pub(crate) exact: Option<u64>,
}

impl LengthRules {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.exact.is_none()
    }

    pub(crate) fn check(&self, names: LengthNames, errors: &mut ValidationErrors) {
        let exact = names.exact.unwrap_or("len");
        if self.exact.is_some() {
            if self.min.is_some() {
                errors.push(ViolationKind::ConflictingRules {
                    first:  names.min.to_string(),
                    second: exact.to_string(),
                });
            }
            if self.max.is_some() {
                errors.push(ViolationKind::ConflictingRules {
                    first:  names.max.to_string(),
                    second: exact.to_string(),
                });
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                errors.push(ViolationKind::MinExceedsMax {
                    min:       names.min.to_string(),
                    min_value: min.to_string(),
                    max:       names.max.to_string(),
                    max_value: max.to_string(),
                });
            }
        }
    }

    pub(crate) fn rules(&self, group: &str, names: LengthNames) -> Vec<Rule> {
        let mut rules = Vec::new();
        if let (Some(exact), Some(name)) = (self.exact, names.exact) {
            rules.push(Rule::new([group, name], exact));
        }
        if let Some(min) = self.min {
            rules.push(Rule::new([group, names.min], min));
        }
        if let Some(max) = self.max {
            rules.push(Rule::new([group, names.max], max));
        }
        rules
    }
}

/// Well-known string and bytes formats. A field may carry at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Email,
    Hostname,
    Ip,
    Ipv4,
    Ipv6,
    Uri,
    UriRef,
    Address,
    Uuid,
    Tuuid,
    IpWithPrefixlen,
    Ipv4WithPrefixlen,
    Ipv6WithPrefixlen,
    IpPrefix,
    Ipv4Prefix,
    Ipv6Prefix,
    HostAndPort,
    HttpHeaderName,
    HttpHeaderValue,
}

impl Format {
    pub fn rule_name(&self) -> &'static str {
        match self {
            Format::Email             => "email",
            Format::Hostname          => "hostname",
            Format::Ip                => "ip",
            Format::Ipv4              => "ipv4",
            Format::Ipv6              => "ipv6",
            Format::Uri               => "uri",
            Format::UriRef            => "uri_ref",
            Format::Address           => "address",
            Format::Uuid              => "uuid",
            Format::Tuuid             => "tuuid",
            Format::IpWithPrefixlen   => "ip_with_prefixlen",
            Format::Ipv4WithPrefixlen => "ipv4_with_prefixlen",
            Format::Ipv6WithPrefixlen => "ipv6_with_prefixlen",
            Format::IpPrefix          => "ip_prefix",
            Format::Ipv4Prefix        => "ipv4_prefix",
            Format::Ipv6Prefix        => "ipv6_prefix",
            Format::HostAndPort       => "host_and_port",
            Format::HttpHeaderName | Format::HttpHeaderValue => "well_known_regex",
        }
    }

    fn value(&self) -> Literal {
        match self {
            Format::HttpHeaderName  => Literal::Ident("KNOWN_REGEX_HTTP_HEADER_NAME".to_string()),
            Format::HttpHeaderValue => Literal::Ident("KNOWN_REGEX_HTTP_HEADER_VALUE".to_string()),
            _ => Literal::Bool(true),
        }
    }
}

pub(crate) fn check_formats(formats: &[Format], errors: &mut ValidationErrors) {
    let mut distinct: Vec<Format> = Vec::new();
    for format in formats {
        if !distinct.contains(format) {
            distinct.push(*format);
        }
    }
    if distinct.len() > 1 {
        errors.push(ViolationKind::MultipleFormats {
            formats: distinct
                .iter()
                .map(|f| match f {
                    Format::HttpHeaderName => "http_header_name",
                    Format::HttpHeaderValue => "http_header_value",
                    other => other.rule_name(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        });
    }
}

pub(crate) fn format_rules(group: &str, formats: &[Format]) -> Vec<Rule> {
    formats
        .first()
        .map(|format| vec![Rule::new([group, format.rule_name()], format.value())])
        .unwrap_or_default()
}

/// The names of the rules in `rules`, for reports.
pub(crate) fn rule_names(rules: &[Rule]) -> String {
    rules.iter().map(Rule::dotted).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(gt: Option<i64>, gte: Option<i64>, lt: Option<i64>, lte: Option<i64>) -> ValidationErrors {
        let rules = RangeRules {
            gt:  gt.map(Literal::from),
            gte: gte.map(Literal::from),
            lt:  lt.map(Literal::from),
            lte: lte.map(Literal::from),
        };
        let mut errors = ValidationErrors::new();
        rules.check(&mut errors);
        errors
    }

    #[test]
    fn test_range_ordering() {
        assert!(range(Some(1), None, Some(10), None).is_empty());
        assert!(range(None, Some(1), None, Some(10)).is_empty());

        for errors in [
            range(None, Some(5), None, Some(5)),
            range(Some(10), None, Some(1), None),
            range(Some(5), None, Some(5), None),
            range(None, Some(5), Some(5), None),
            range(Some(5), None, None, Some(5)),
            range(None, Some(6), None, Some(5)),
        ] {
            assert!(errors.contains(|k| matches!(k, ViolationKind::InvertedRange { .. })));
        }
    }

    #[test]
    fn test_nan_bounds_are_rejected() {
        let rules = RangeRules {
            gt: Some(Literal::Float(f64::NAN)),
            lt: Some(Literal::Float(1.0)),
            ..RangeRules::default()
        };
        let mut errors = ValidationErrors::new();
        rules.check(&mut errors);
        let kinds: Vec<_> = errors.kinds().cloned().collect();
        assert_eq!(kinds, vec![ViolationKind::NanBound { rule: "gt".into() }]);

        let rules = RangeRules {
            gte: Some(Literal::Float(f64::NEG_INFINITY)),
            ..RangeRules::default()
        };
        let mut errors = ValidationErrors::new();
        rules.check(&mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_range_pairs_are_exclusive() {
        let errors = range(Some(1), Some(2), Some(10), Some(11));
        let conflicts: Vec<_> = errors
            .kinds()
            .filter(|k| matches!(k, ViolationKind::ConflictingRules { .. }))
            .collect();
        assert_eq!(conflicts.len(), 2);
    }

    #[test]
    fn test_membership_overlap() {
        let mut errors = ValidationErrors::new();
        let rules = MembershipRules {
            in_:    vec![1.into(), 2.into(), 3.into()],
            not_in: vec![3.into(), 4.into()],
        };
        rules.check(&mut errors);
        assert_eq!(
            errors.kinds().next(),
            Some(&ViolationKind::OverlappingMembership { values: "3".into() })
        );

        let mut errors = ValidationErrors::new();
        MembershipRules {
            in_:    vec!["a".into()],
            not_in: vec!["b".into()],
        }
        .check(&mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_length_conflicts() {
        let mut errors = ValidationErrors::new();
        LengthRules { min: Some(1), max: Some(5), exact: Some(3) }.check(CHAR_LENGTH, &mut errors);
        assert_eq!(errors.len(), 2);

        let mut errors = ValidationErrors::new();
        LengthRules { min: Some(6), max: Some(5), exact: None }.check(BYTE_LENGTH, &mut errors);
        assert_eq!(
            errors.kinds().next(),
            Some(&ViolationKind::MinExceedsMax {
                min:       "min_bytes".into(),
                min_value: "6".into(),
                max:       "max_bytes".into(),
                max_value: "5".into(),
            })
        );
    }

    #[test]
    fn test_single_format() {
        let mut errors = ValidationErrors::new();
        check_formats(&[Format::Email, Format::Email], &mut errors);
        assert!(errors.is_empty());
        check_formats(&[Format::Email, Format::Uuid], &mut errors);
        assert_eq!(errors.len(), 1);
    }
}
