//! Field builders.
//!
//! Every field kind is a small builder struct wrapping a shared [FieldCore].
//! What a kind may be configured with is expressed by which capability traits
//! it implements ([Ranged], [Membership], [Lengthed], [Constant], [Optional],
//! [Example]); the traits' default methods do the bookkeeping. Builders are
//! collected into the [FieldModel] tagged union, which is what messages,
//! oneofs and composites own and build.

pub mod composite;
pub mod reference;
pub mod rules;
pub mod scalar;
pub mod text;
pub mod temporal;

use brine_proto_schema::{
    FieldDescriptor, ImportSet, Literal, OptionEntry, Rule, ScalarKind, ValidationErrors, ViolationKind,
    WellKnownType, WireKind,
};

use crate::{options, registry::BuildContext, utils::optional_type, verifier::verify_identifier};

pub use composite::{MapField, RepeatedField};
pub use reference::{AnyField, EnumField, MessageField};
pub use rules::{Format, LengthRules, MembershipRules, RangeRules};
pub use scalar::{BoolField, NumericField};
pub use temporal::{DurationField, TimestampField};
pub use text::{BytesField, StringField};

/// State every field kind carries regardless of its type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldCore {
    pub(crate) name:     String,
    pub(crate) optional: bool,
    pub(crate) required: bool,
    pub(crate) constant: Option<Literal>,
    pub(crate) examples: Vec<Literal>,
    pub(crate) cel:      Vec<Literal>,
    pub(crate) options:  Vec<OptionEntry>,
    pub(crate) imports:  ImportSet,
}

impl FieldCore {
    /// # Panics
    ///
    /// Panics if `name` is not a valid identifier.
    pub fn new(name: &str) -> Self {
        verify_identifier("field", name);
        FieldCore {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Singular options overwrite an earlier option of the same name in place.
    pub(crate) fn set_option(&mut self, name: &str, value: Literal) {
        options::set_option(&mut self.options, name, value);
    }

    /// Repeated options always append, keeping call order.
    pub(crate) fn push_option(&mut self, name: &str, value: Literal) {
        options::push_option(&mut self.options, name, value);
    }

    /// Rules that come from the core itself: `required`, then CEL constraints.
    fn own_rules(&self) -> Vec<Rule> {
        let mut rules = Vec::new();
        if self.required {
            rules.push(Rule::new(["required"], true));
        }
        for cel in &self.cel {
            rules.push(Rule::new(["cel"], cel.clone()));
        }
        rules
    }
}

/// What a field kind contributes to its descriptor once its own rules are checked.
pub(crate) struct Resolved {
    pub kind:        WireKind,
    pub proto_type:  String,
    pub target_type: String,
    /// Rule group of the kind in the validation extension (`string`, `int32`).
    pub group:       Option<&'static str>,
    pub rules:       Vec<Rule>,
    pub imports:     ImportSet,
}

impl FieldCore {
    /// Merges the core's rules with the kind's, checks the constant contract,
    /// records imports and produces the descriptor.
    pub(crate) fn finish(
        self,
        number: u32,
        resolved: Resolved,
        mut errors: ValidationErrors,
        ctx: &mut BuildContext,
    ) -> Result<FieldDescriptor, ValidationErrors> {
        let Resolved {
            kind,
            proto_type,
            target_type,
            group,
            rules: kind_rules,
            mut imports,
        } = resolved;

        let mut rules = kind_rules;
        rules.extend(self.own_rules());
        if let Some(group) = group {
            rules.extend(self.examples.iter().map(|example| Rule::new([group, "example"], example.clone())));
        }

        let constant = self.constant.is_some();
        if let Some(value) = self.constant {
            if !rules.is_empty() {
                errors.push(ViolationKind::ConstWithRules {
                    rules: rules::rule_names(&rules),
                });
            }
            if self.optional {
                errors.push(ViolationKind::ConstOptional);
            }
            let group = group.unwrap_or("const");
            rules.insert(0, Rule::new([group, "const"], value));
        }

        if !rules.is_empty() {
            imports.insert(ctx.validate_import.clone());
        }
        imports.merge(&self.imports);
        ctx.imports.merge(&imports);

        let target_type = if self.optional {
            optional_type(&target_type)
        } else {
            target_type
        };

        errors.into_result(FieldDescriptor {
            name: self.name,
            number,
            repeated: matches!(kind, WireKind::Repeated { .. }),
            map: matches!(kind, WireKind::Map { .. }),
            kind,
            proto_type,
            target_type,
            optional: self.optional,
            constant,
            oneof: None,
            rules,
            options: self.options,
            imports: imports.to_vec(),
        })
    }
}

/// Configuration shared by every field kind.
pub trait FieldBuilder: Sized {
    fn core(&self) -> &FieldCore;
    fn core_mut(&mut self) -> &mut FieldCore;

    fn name(&self) -> &str {
        &self.core().name
    }

    /// Marks the field as required to be populated.
    fn required(mut self) -> Self {
        self.core_mut().required = true;
        self
    }

    /// Sets a singular option. A later call with the same name replaces the value.
    fn option(mut self, name: &str, value: impl Into<Literal>) -> Self {
        self.core_mut().set_option(name, value.into());
        self
    }

    /// Appends an option without replacing earlier ones of the same name.
    fn repeated_option(mut self, name: &str, value: impl Into<Literal>) -> Self {
        self.core_mut().push_option(name, value.into());
        self
    }

    /// Declares the file defining a custom option this field uses.
    fn option_import(mut self, path: &str) -> Self {
        self.core_mut().imports.insert(path);
        self
    }

    fn deprecated(self) -> Self {
        self.option("deprecated", true)
    }

    fn json_name(self, name: &str) -> Self {
        self.option("json_name", name)
    }

    /// Adds a CEL constraint. Constraints accumulate in call order.
    fn cel(mut self, id: &str, message: &str, expression: &str) -> Self {
        self.core_mut().cel.push(cel_literal(id, message, expression));
        self
    }
}

pub(crate) fn cel_literal(id: &str, message: &str, expression: &str) -> Literal {
    Literal::Message(vec![
        ("id".to_string(), Literal::from(id)),
        ("message".to_string(), Literal::from(message)),
        ("expression".to_string(), Literal::from(expression)),
    ])
}

/// Kinds with explicit presence in proto3.
pub trait Optional: FieldBuilder {
    fn optional(mut self) -> Self {
        self.core_mut().optional = true;
        self
    }
}

/// Kinds that may be pinned to a single constant value.
pub trait Constant: FieldBuilder {
    type Value: Into<Literal>;

    fn const_value(mut self, value: impl Into<Self::Value>) -> Self {
        self.core_mut().constant = Some(Into::<Self::Value>::into(value).into());
        self
    }
}

/// Kinds that accept documented example values. Examples stack in call order.
pub trait Example: FieldBuilder {
    type Value: Into<Literal>;

    fn example(mut self, value: impl Into<Self::Value>) -> Self {
        self.core_mut().examples.push(Into::<Self::Value>::into(value).into());
        self
    }
}

/// Kinds with ordered values that accept bounds.
pub trait Ranged: FieldBuilder {
    type Bound: Into<Literal>;

    fn range_mut(&mut self) -> &mut RangeRules;

    fn gt(mut self, value: impl Into<Self::Bound>) -> Self {
        self.range_mut().gt = Some(Into::<Self::Bound>::into(value).into());
        self
    }

    fn gte(mut self, value: impl Into<Self::Bound>) -> Self {
        self.range_mut().gte = Some(Into::<Self::Bound>::into(value).into());
        self
    }

    fn lt(mut self, value: impl Into<Self::Bound>) -> Self {
        self.range_mut().lt = Some(Into::<Self::Bound>::into(value).into());
        self
    }

    fn lte(mut self, value: impl Into<Self::Bound>) -> Self {
        self.range_mut().lte = Some(Into::<Self::Bound>::into(value).into());
        self
    }
}

/// Kinds that accept allow and deny lists.
pub trait Membership: FieldBuilder {
    type Member: Into<Literal>;

    fn membership_mut(&mut self) -> &mut MembershipRules;

    fn in_<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Self::Member>,
    {
        let values = values.into_iter().map(|v| Into::<Self::Member>::into(v).into());
        self.membership_mut().in_.extend(values);
        self
    }

    fn not_in<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Self::Member>,
    {
        let values = values.into_iter().map(|v| Into::<Self::Member>::into(v).into());
        self.membership_mut().not_in.extend(values);
        self
    }
}

/// Kinds with a measurable length.
pub trait Lengthed: FieldBuilder {
    fn length_mut(&mut self) -> &mut LengthRules;

    fn min_len(mut self, value: u64) -> Self {
        self.length_mut().min = Some(value);
        self
    }

    fn max_len(mut self, value: u64) -> Self {
        self.length_mut().max = Some(value);
        self
    }

    fn len(mut self, value: u64) -> Self {
        self.length_mut().exact = Some(value);
        self
    }
}

/// Any field a message, oneof or composite can own.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldModel {
    Numeric(NumericField),
    Bool(BoolField),
    String(StringField),
    Bytes(BytesField),
    Enum(EnumField),
    Message(MessageField),
    Timestamp(TimestampField),
    Duration(DurationField),
    Any(AnyField),
    Repeated(RepeatedField),
    Map(MapField),
}

macro_rules! dispatch {
    ($self:expr, $field:ident => $body:expr) => {
        match $self {
            FieldModel::Numeric($field)   => $body,
            FieldModel::Bool($field)      => $body,
            FieldModel::String($field)    => $body,
            FieldModel::Bytes($field)     => $body,
            FieldModel::Enum($field)      => $body,
            FieldModel::Message($field)   => $body,
            FieldModel::Timestamp($field) => $body,
            FieldModel::Duration($field)  => $body,
            FieldModel::Any($field)       => $body,
            FieldModel::Repeated($field)  => $body,
            FieldModel::Map($field)       => $body,
        }
    };
}

impl FieldModel {
    pub fn core(&self) -> &FieldCore {
        dispatch!(self, field => field.core())
    }

    pub(crate) fn core_mut(&mut self) -> &mut FieldCore {
        dispatch!(self, field => field.core_mut())
    }

    pub fn name(&self) -> &str {
        &self.core().name
    }

    pub fn is_optional(&self) -> bool {
        self.core().optional
    }

    pub(crate) fn clear_optional(&mut self) {
        self.core_mut().optional = false;
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, FieldModel::Repeated(_) | FieldModel::Map(_))
    }

    /// The scalar wire type, for scalar kinds only.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            FieldModel::Numeric(field) => Some(field.kind),
            FieldModel::Bool(_) => Some(ScalarKind::Bool),
            FieldModel::String(_) => Some(ScalarKind::String),
            FieldModel::Bytes(_) => Some(ScalarKind::Bytes),
            _ => None,
        }
    }

    /// A short name of the kind, for reports.
    pub fn kind_name(&self) -> String {
        match self {
            FieldModel::Enum(field) => format!("enum {}", field.target.name()),
            FieldModel::Message(field) => format!("message {}", field.target.name()),
            FieldModel::Timestamp(_) => WellKnownType::Timestamp.full_name().to_string(),
            FieldModel::Duration(_) => WellKnownType::Duration.full_name().to_string(),
            FieldModel::Any(_) => WellKnownType::Any.full_name().to_string(),
            FieldModel::Repeated(_) => "repeated".to_string(),
            FieldModel::Map(_) => "map".to_string(),
            other => other
                .scalar_kind()
                .map(|kind| kind.proto_name().to_string())
                .unwrap_or_default(),
        }
    }

    /// The type a host record must declare to mirror this field. Computed
    /// without resolving references, so it can run before any build.
    pub fn target_type(&self) -> String {
        let base = self.base_type();
        if self.is_optional() {
            optional_type(&base)
        } else {
            base
        }
    }

    /// The target type ignoring this field's own presence. Collection entries
    /// never carry presence, so their items, keys and values use this.
    fn base_type(&self) -> String {
        match self {
            FieldModel::Numeric(field) => field.kind.rust_type().to_string(),
            FieldModel::Bool(_) => "bool".to_string(),
            FieldModel::String(_) => "String".to_string(),
            FieldModel::Bytes(_) => "Vec<u8>".to_string(),
            FieldModel::Enum(field) => field.target.simple_name().to_string(),
            FieldModel::Message(field) => field.target_type(),
            FieldModel::Timestamp(_) => WellKnownType::Timestamp.rust_type().to_string(),
            FieldModel::Duration(_) => WellKnownType::Duration.rust_type().to_string(),
            FieldModel::Any(_) => WellKnownType::Any.rust_type().to_string(),
            FieldModel::Repeated(field) => format!("Vec<{}>", field.item.base_type()),
            FieldModel::Map(field) => format!("HashMap<{}, {}>", field.key.base_type(), field.value.base_type()),
        }
    }

    /// Validates the field and resolves it to a descriptor at `number`,
    /// merging its import requirements into the context's import set.
    pub fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        match self {
            FieldModel::Numeric(field)   => field.build(number, ctx),
            FieldModel::Bool(field)      => field.build(number, ctx),
            FieldModel::String(field)    => field.build(number, ctx),
            FieldModel::Bytes(field)     => field.build(number, ctx),
            FieldModel::Enum(field)      => field.build(number, ctx),
            FieldModel::Message(field)   => field.build(number, ctx),
            FieldModel::Timestamp(field) => field.build(number, ctx),
            FieldModel::Duration(field)  => field.build(number, ctx),
            FieldModel::Any(field)       => field.build(number, ctx),
            FieldModel::Repeated(field)  => field.build(number, ctx),
            FieldModel::Map(field)       => field.build(number, ctx),
        }
    }
}

macro_rules! into_model {
    ($($builder:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$builder> for FieldModel {
                fn from(field: $builder) -> Self {
                    FieldModel::$variant(field)
                }
            }
        )*
    };
}

into_model! {
    NumericField   => Numeric,
    BoolField      => Bool,
    StringField    => String,
    BytesField     => Bytes,
    EnumField      => Enum,
    MessageField   => Message,
    TimestampField => Timestamp,
    DurationField  => Duration,
    AnyField       => Any,
    RepeatedField  => Repeated,
    MapField       => Map,
}

/// `FieldBuilder` impl for a builder whose core lives in a `core` field.
macro_rules! impl_field_builder {
    ($($builder:ty),* $(,)?) => {
        $(
            impl crate::field::FieldBuilder for $builder {
                fn core(&self) -> &crate::field::FieldCore {
                    &self.core
                }

                fn core_mut(&mut self) -> &mut crate::field::FieldCore {
                    &mut self.core
                }
            }
        )*
    };
}

pub(crate) use impl_field_builder;

macro_rules! scalar_constructors {
    ($($(#[$doc:meta])* $fn_name:ident => $kind:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $fn_name(name: &str) -> NumericField {
                NumericField::new(name, ScalarKind::$kind)
            }
        )*
    };
}

scalar_constructors! {
    double   => Double,
    float    => Float,
    int32    => Int32,
    int64    => Int64,
    uint32   => UInt32,
    uint64   => UInt64,
    sint32   => SInt32,
    sint64   => SInt64,
    fixed32  => Fixed32,
    fixed64  => Fixed64,
    sfixed32 => SFixed32,
    sfixed64 => SFixed64,
}

pub fn bool(name: &str) -> BoolField {
    BoolField::new(name)
}

pub fn string(name: &str) -> StringField {
    StringField::new(name)
}

pub fn bytes(name: &str) -> BytesField {
    BytesField::new(name)
}

/// A field referencing an enum declared in the package, or an external one.
pub fn enumeration(name: &str, target: impl Into<crate::registry::TypeName>) -> EnumField {
    EnumField::new(name, target.into())
}

/// A field referencing a message declared in the package, or an external one.
pub fn message(name: &str, target: impl Into<crate::registry::TypeName>) -> MessageField {
    MessageField::new(name, target.into())
}

pub fn timestamp(name: &str) -> TimestampField {
    TimestampField::new(name)
}

pub fn duration(name: &str) -> DurationField {
    DurationField::new(name)
}

pub fn any(name: &str) -> AnyField {
    AnyField::new(name)
}

/// A field of a well-known type without dedicated rules (`FieldMask`, `Struct`, `Empty`).
pub fn well_known(name: &str, wkt: WellKnownType) -> MessageField {
    MessageField::new(name, wkt.into())
}

pub fn repeated(name: &str, item: impl Into<FieldModel>) -> RepeatedField {
    RepeatedField::new(name, item.into())
}

pub fn map(name: &str, key: impl Into<FieldModel>, value: impl Into<FieldModel>) -> MapField {
    MapField::new(name, key.into(), value.into())
}
