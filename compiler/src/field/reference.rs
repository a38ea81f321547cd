use brine_proto_schema::{FieldDescriptor, ImportSet, Rule, ValidationErrors, WellKnownType, WireKind};

use crate::registry::{BuildContext, DeclKind, TypeName};

use super::{impl_field_builder, rules::MembershipRules, Constant, Example, FieldCore, Membership, Optional, Resolved};

#[derive(Debug, Clone, PartialEq)]
pub struct EnumField {
    pub(crate) core:         FieldCore,
    pub(crate) target:       TypeName,
    pub(crate) defined_only: bool,
    pub(crate) membership:   MembershipRules,
}

impl EnumField {
    pub(crate) fn new(name: &str, target: TypeName) -> Self {
        EnumField {
            core: FieldCore::new(name),
            target,
            defined_only: false,
            membership: MembershipRules::default(),
        }
    }

    /// Rejects numbers that are not members of the enum.
    pub fn defined_only(mut self) -> Self {
        self.defined_only = true;
        self
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut imports = ImportSet::new();
        self.membership.check(&mut errors);

        let target = match ctx.resolve(&self.target, DeclKind::Enum, &mut imports) {
            Ok(target) => target,
            Err(kind) => {
                errors.push(kind);
                return Err(errors);
            }
        };

        let mut rules = Vec::new();
        if self.defined_only {
            rules.push(Rule::new(["enum", "defined_only"], true));
        }
        rules.extend(self.membership.rules("enum"));

        let resolved = Resolved {
            proto_type:  target.proto_name.clone(),
            target_type: target.simple_name.clone(),
            kind:        WireKind::Enum { target },
            group:       Some("enum"),
            rules,
            imports,
        };
        self.core.finish(number, resolved, errors, ctx)
    }
}

impl Optional for EnumField {}

impl Membership for EnumField {
    type Member = i32;

    fn membership_mut(&mut self) -> &mut MembershipRules {
        &mut self.membership
    }
}

impl Constant for EnumField {
    type Value = i32;
}

impl Example for EnumField {
    type Value = i32;
}

/// A field holding another message, declared in the package or imported.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageField {
    pub(crate) core:   FieldCore,
    pub(crate) target: TypeName,
}

impl MessageField {
    pub(crate) fn new(name: &str, target: TypeName) -> Self {
        MessageField {
            core: FieldCore::new(name),
            target,
        }
    }

    pub fn target(&self) -> &TypeName {
        &self.target
    }

    pub(crate) fn target_type(&self) -> String {
        match self.target.well_known {
            Some(wkt) => wkt.rust_type().to_string(),
            None => self.target.simple_name().to_string(),
        }
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let mut imports = ImportSet::new();
        let target = ctx
            .resolve(&self.target, DeclKind::Message, &mut imports)
            .map_err(ValidationErrors::from)?;

        let resolved = Resolved {
            proto_type:  target.proto_name.clone(),
            target_type: self.target_type(),
            group:       target.well_known.and_then(|wkt| wkt.rule_group()),
            kind:        WireKind::Message { target },
            rules:       Vec::new(),
            imports,
        };
        self.core.finish(number, resolved, ValidationErrors::new(), ctx)
    }
}

impl Optional for MessageField {}

/// A `google.protobuf.Any` field, constrained by the type URLs it may hold.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyField {
    pub(crate) core:       FieldCore,
    pub(crate) membership: MembershipRules,
}

impl AnyField {
    pub(crate) fn new(name: &str) -> Self {
        AnyField {
            core:       FieldCore::new(name),
            membership: MembershipRules::default(),
        }
    }

    pub(crate) fn build(self, number: u32, ctx: &mut BuildContext) -> Result<FieldDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut imports = ImportSet::new();
        self.membership.check(&mut errors);
        let target = ctx
            .resolve(&WellKnownType::Any.into(), DeclKind::Message, &mut imports)
            .map_err(ValidationErrors::from)?;

        let resolved = Resolved {
            proto_type:  target.proto_name.clone(),
            target_type: WellKnownType::Any.rust_type().to_string(),
            kind:        WireKind::Message { target },
            group:       Some("any"),
            rules:       self.membership.rules("any"),
            imports,
        };
        self.core.finish(number, resolved, errors, ctx)
    }
}

impl Optional for AnyField {}

impl Membership for AnyField {
    type Member = String;

    fn membership_mut(&mut self) -> &mut MembershipRules {
        &mut self.membership
    }
}

impl_field_builder!(EnumField, MessageField, AnyField);
