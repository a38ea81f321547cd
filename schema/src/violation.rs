use serde::Serialize;
use thiserror::Error;

use std::fmt;

/// A single constraint violation found while building a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum ViolationKind {
    #[error("{first} and {second} are mutually exclusive")]
    ConflictingRules { first: String, second: String },

    #[error("lower bound {lower} must be below upper bound {upper}")]
    InvertedRange { lower: String, upper: String },

    #[error("in and not_in share {values}")]
    OverlappingMembership { values: String },

    #[error("a constant field cannot carry other rules ({rules})")]
    ConstWithRules { rules: String },

    #[error("a constant field cannot be optional")]
    ConstOptional,

    #[error("{min} ({min_value}) exceeds {max} ({max_value})")]
    MinExceedsMax {
        min:       String,
        min_value: String,
        max:       String,
        max_value: String,
    },

    #[error("at most one format is allowed, found {formats}")]
    MultipleFormats { formats: String },

    #[error("pattern {pattern} does not compile: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("{rule} bound is NaN")]
    NanBound { rule: String },

    #[error("{rule} value {value} is outside the range of google.protobuf.Duration")]
    DurationOutOfRange { rule: String, value: String },

    #[error("finite is only valid on float and double fields, not {kind}")]
    FiniteOnNonFloat { kind: String },

    #[error("{rule} value {value} does not fit a {kind} field")]
    BoundTypeMismatch {
        rule:  String,
        value: String,
        kind:  String,
    },

    #[error("{outer} cannot directly contain a {inner} field; wrap it in a message")]
    NestedCollection { outer: String, inner: String },

    #[error("unique items require a scalar item type, not {kind}")]
    UniqueOnNonScalar { kind: String },

    #[error("{kind} is not a valid map key type")]
    InvalidMapKey { kind: String },

    #[error("oneof choice cannot be {kind}")]
    CollectionInOneof { kind: String },

    #[error("field number {number} is used by both {first} and {second}")]
    DuplicateFieldNumber {
        number: u32,
        first:  String,
        second: String,
    },

    #[error("name {name} is declared more than once")]
    DuplicateName { name: String },

    #[error("field number {number} is outside 1..=536870911 or inside the reserved 19000..=19999")]
    InvalidFieldNumber { number: u32 },

    #[error("reserved number {number} is used by field {field}")]
    ReservedNumberInUse { number: i64, field: String },

    #[error("reserved name {name} is used by a field")]
    ReservedNameInUse { name: String },

    #[error("reserved range {start}..={end} is inverted")]
    InvalidReservedRange { start: i64, end: i64 },

    #[error("type {name} is not declared in this package")]
    UnresolvedType { name: String },

    #[error("type {name} is declared in both {first} and {second}")]
    DuplicateType {
        name:   String,
        first:  String,
        second: String,
    },

    #[error("the first enum value must be zero")]
    EnumMissingZero,

    #[error("enum number {number} is used by both {first} and {second}; set allow_alias to permit this")]
    DuplicateEnumNumber {
        number: i32,
        first:  String,
        second: String,
    },

    #[error("method {name} is declared more than once")]
    DuplicateMethod { name: String },

    #[error("host field {name} has no matching schema field")]
    MissingSchemaField { name: String },

    #[error("schema field {name} has no matching host field")]
    MissingHostField { name: String },

    #[error("host field {name} is {host} but the schema resolves to {schema}")]
    HostTypeMismatch {
        name:   String,
        host:   String,
        schema: String,
    },

    #[error("host field {name} matches {count} schema fields")]
    AmbiguousHostField { name: String, count: usize },
}

/// A violation together with the scopes it was found in, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: Vec<String>,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for scope in &self.path {
            write!(f, "{}: ", scope)?;
        }
        write!(f, "{}", self.kind)
    }
}

/// Every violation found in one build, in discovery order.
///
/// Each scope that builds children concatenates their errors under its own
/// name with [nest](#method.nest), so a report reads from the package down to
/// the field that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ViolationKind) {
        self.violations.push(Violation {
            path: Vec::new(),
            kind,
        });
    }

    /// Prefixes every violation with `scope`.
    pub fn nest(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        for violation in &mut self.violations {
            violation.path.insert(0, scope.clone());
        }
        self
    }

    pub fn append(&mut self, other: ValidationErrors) {
        self.violations.extend(other.violations);
    }

    /// Appends `other` beneath `scope`.
    pub fn extend_scoped(&mut self, scope: impl Into<String>, other: ValidationErrors) {
        self.append(other.nest(scope));
    }

    /// Collects the error side of `result` beneath `scope`, returning the success side.
    pub fn collect<T>(&mut self, scope: impl Into<String>, result: Result<T, ValidationErrors>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(errors) => {
                self.extend_scoped(scope, errors);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &ViolationKind> {
        self.violations.iter().map(|violation| &violation.kind)
    }

    pub fn contains(&self, predicate: impl Fn(&ViolationKind) -> bool) -> bool {
        self.kinds().any(predicate)
    }

    /// `Ok(value)` when nothing was reported, the accumulated errors otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<ViolationKind> for ValidationErrors {
    fn from(kind: ViolationKind) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(kind);
        errors
    }
}

impl IntoIterator for ValidationErrors {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut previous: &[String] = &[];
        for violation in &self.violations {
            let shared = previous
                .iter()
                .zip(&violation.path)
                .take_while(|(a, b)| a == b)
                .count();
            for (depth, scope) in violation.path.iter().enumerate().skip(shared) {
                writeln!(f, "{:indent$}{}:", "", scope, indent = depth * 2)?;
            }
            writeln!(
                f,
                "{:indent$}- {}",
                "",
                violation.kind,
                indent = violation.path.len() * 2
            )?;
            previous = &violation.path;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
