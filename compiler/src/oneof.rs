use brine_proto_schema::{Literal, OneofDescriptor, OptionEntry, Rule, ValidationErrors, ViolationKind};
use tracing::warn;

use crate::{
    field::FieldModel,
    options::{push_option, set_option},
    registry::BuildContext,
    utils::quote,
    verifier::verify_identifier,
};

/// A group of fields of which at most one is populated.
#[derive(Debug, Clone, PartialEq)]
pub struct OneofModel {
    pub(crate) name:     String,
    pub(crate) choices:  Vec<(u32, FieldModel)>,
    pub(crate) required: bool,
    pub(crate) options:  Vec<OptionEntry>,
}

/// # Panics
///
/// Panics if `name` is not a valid identifier.
pub fn oneof(name: &str) -> OneofModel {
    verify_identifier("oneof", name);
    OneofModel {
        name:     name.to_string(),
        choices:  Vec::new(),
        required: false,
        options:  Vec::new(),
    }
}

impl OneofModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn choice(mut self, number: u32, field: impl Into<FieldModel>) -> Self {
        self.choices.push((number, field.into()));
        self
    }

    /// Exactly one choice must be populated.
    pub fn required(mut self) -> Self {
        self.required = true;
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

    pub(crate) fn choices(&self) -> impl Iterator<Item = &(u32, FieldModel)> {
        self.choices.iter()
    }

    /// Builds every choice in ascending number order. Collections are rejected;
    /// `optional` carries no meaning inside a oneof and is dropped.
    pub fn build(mut self, ctx: &mut BuildContext) -> Result<OneofDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut fields = Vec::new();
        self.choices.sort_by_key(|(number, _)| *number);

        for (number, mut choice) in self.choices {
            let scope = format!("field {}", quote(choice.name()));
            if choice.is_collection() {
                errors.extend_scoped(scope, ViolationKind::CollectionInOneof { kind: choice.kind_name() }.into());
                continue;
            }
            if choice.is_optional() {
                warn!(oneof = %self.name, field = %choice.name(), "dropping optional from oneof choice");
                choice.clear_optional();
            }
            if let Some(mut desc) = errors.collect(scope, choice.build(number, ctx)) {
                desc.oneof = Some(self.name.clone());
                fields.push(desc);
            }
        }

        let mut rules = Vec::new();
        if self.required {
            rules.push(Rule::new(["required"], true));
            ctx.imports.insert(ctx.validate_import.clone());
        }

        errors.into_result(OneofDescriptor {
            name: self.name,
            fields,
            rules,
            options: self.options,
        })
    }
}
