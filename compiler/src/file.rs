use brine_proto_schema::{
    ExtensionDescriptor, ExtensionTarget, FileDescriptor, ImportSet, Literal, OptionEntry, ValidationErrors, ViolationKind,
    DESCRIPTOR_IMPORT,
};
use tracing::debug;

use std::collections::BTreeMap;

use crate::{
    enumeration::EnumModel,
    field::FieldModel,
    message::MessageModel,
    options::{push_option, set_option},
    registry::{BuildContext, DeclKind, TypeRegistry},
    service::ServiceModel,
    utils::quote,
    verifier::{is_valid_field_number, verify_file_name},
};

/// One `.proto` file: top-level messages, enums, services and extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct FileModel {
    pub(crate) name:       String,
    pub(crate) options:    Vec<OptionEntry>,
    pub(crate) messages:   Vec<MessageModel>,
    pub(crate) enums:      Vec<EnumModel>,
    pub(crate) services:   Vec<ServiceModel>,
    pub(crate) extensions: BTreeMap<ExtensionTarget, Vec<(u32, FieldModel)>>,
    pub(crate) imports:    ImportSet,
}

/// # Panics
///
/// Panics if `name` is not a relative `.proto` path.
pub fn file(name: &str) -> FileModel {
    verify_file_name(name);
    FileModel {
        name:       name.to_string(),
        options:    Vec::new(),
        messages:   Vec::new(),
        enums:      Vec::new(),
        services:   Vec::new(),
        extensions: BTreeMap::new(),
        imports:    ImportSet::new(),
    }
}

impl FileModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(mut self, message: MessageModel) -> Self {
        self.messages.push(message);
        self
    }

    pub fn enumeration(mut self, model: EnumModel) -> Self {
        self.enums.push(model);
        self
    }

    pub fn service(mut self, service: ServiceModel) -> Self {
        self.services.push(service);
        self
    }

    /// Declares a custom option on `target`'s options message.
    pub fn extend(mut self, target: ExtensionTarget, number: u32, field: impl Into<FieldModel>) -> Self {
        self.extensions.entry(target).or_default().push((number, field.into()));
        self
    }

    /// Imports a file the schema needs but no reference reveals, such as
    /// the definition of a custom file option.
    pub fn import(mut self, path: &str) -> Self {
        self.imports.insert(path);
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

    pub fn messages(&self) -> &[MessageModel] {
        &self.messages
    }

    /// Reports every message and enum the file declares, nested ones included.
    pub(crate) fn declare(&self, f: &mut dyn FnMut(String, DeclKind)) {
        for model in &self.enums {
            f(model.name().to_string(), DeclKind::Enum);
        }
        for message in &self.messages {
            message.declare("", f);
        }
    }

    fn build_extensions(
        extensions: BTreeMap<ExtensionTarget, Vec<(u32, FieldModel)>>,
        ctx: &mut BuildContext,
        errors: &mut ValidationErrors,
    ) -> Vec<ExtensionDescriptor> {
        let mut built = Vec::new();
        for (target, mut fields) in extensions {
            if fields.is_empty() {
                continue;
            }
            ctx.imports.insert(DESCRIPTOR_IMPORT);
            fields.sort_by_key(|(number, _)| *number);

            let mut scoped = ValidationErrors::new();
            let mut descriptors = Vec::new();
            let mut numbers: BTreeMap<u32, String> = BTreeMap::new();
            for (number, field) in fields {
                let scope = format!("field {}", quote(field.name()));
                if !is_valid_field_number(number) {
                    scoped.extend_scoped(scope.clone(), ViolationKind::InvalidFieldNumber { number }.into());
                }
                if let Some(first) = numbers.get(&number) {
                    let duplicate = ViolationKind::DuplicateFieldNumber {
                        number,
                        first: first.clone(),
                        second: field.name().to_string(),
                    };
                    scoped.extend_scoped(scope.clone(), duplicate.into());
                } else {
                    numbers.insert(number, field.name().to_string());
                }
                descriptors.extend(scoped.collect(scope, field.build(number, ctx)));
            }
            errors.extend_scoped(format!("extend {}", target.extendee()), scoped);
            built.push(ExtensionDescriptor {
                target,
                fields: descriptors,
            });
        }
        built
    }

    /// Builds the file against `registry` with one import set shared by every
    /// declaration in it. The result imports each dependency once, sorted.
    pub fn build(self, package: &str, registry: &TypeRegistry, validate_import: &str) -> Result<FileDescriptor, ValidationErrors> {
        let mut ctx = BuildContext::with_registry(self.name.clone(), registry).validate_import(validate_import);
        let mut errors = ValidationErrors::new();

        let mut messages = Vec::new();
        for message in self.messages {
            let scope = format!("message {}", quote(message.name()));
            messages.extend(errors.collect(scope, message.build(&mut ctx)));
        }

        let mut enums = Vec::new();
        for model in self.enums {
            let scope = format!("enum {}", quote(model.name()));
            enums.extend(errors.collect(scope, model.build(&mut ctx)));
        }

        let mut services = Vec::new();
        for service in self.services {
            let scope = format!("service {}", quote(service.name()));
            services.extend(errors.collect(scope, service.build(&mut ctx)));
        }

        let extensions = Self::build_extensions(self.extensions, &mut ctx, &mut errors);

        let mut imports = ctx.into_imports();
        imports.merge(&self.imports);
        imports.remove(&self.name);

        debug!(file = %self.name, messages = messages.len(), imports = imports.len(), "built file");
        errors.into_result(FileDescriptor {
            name: self.name,
            package: package.to_string(),
            imports,
            options: self.options,
            messages,
            enums,
            services,
            extensions,
        })
    }
}
