use brine_proto_schema::{ImportSet, Literal, MethodDescriptor, OptionEntry, ServiceDescriptor, ValidationErrors, ViolationKind};
use tracing::debug;

use std::collections::BTreeSet;

use crate::{
    options::{push_option, set_option},
    registry::{BuildContext, DeclKind, TypeName},
    utils::quote,
    verifier::verify_identifier,
};

/// Handler verbs in the order they render, ahead of everything else.
const PRECEDENCE: [&str; 4] = ["Create", "Get", "Update", "Delete"];

/// Position of `name` among the handler verbs. `Get` matches `GetUser` but not `Getaway`.
fn precedence(name: &str) -> usize {
    PRECEDENCE
        .iter()
        .position(|verb| {
            name.strip_prefix(verb)
                .map_or(false, |rest| rest.chars().next().map_or(true, char::is_uppercase))
        })
        .unwrap_or(PRECEDENCE.len())
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodModel {
    pub(crate) name:             String,
    pub(crate) input:            TypeName,
    pub(crate) output:           TypeName,
    pub(crate) client_streaming: bool,
    pub(crate) server_streaming: bool,
    pub(crate) options:          Vec<OptionEntry>,
}

/// # Panics
///
/// Panics if `name` is not a valid identifier.
pub fn method(name: &str, input: impl Into<TypeName>, output: impl Into<TypeName>) -> MethodModel {
    verify_identifier("method", name);
    MethodModel {
        name:             name.to_string(),
        input:            input.into(),
        output:           output.into(),
        client_streaming: false,
        server_streaming: false,
        options:          Vec::new(),
    }
}

impl MethodModel {
    pub fn client_streaming(mut self) -> Self {
        self.client_streaming = true;
        self
    }

    pub fn server_streaming(mut self) -> Self {
        self.server_streaming = true;
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

    pub fn deprecated(self) -> Self {
        self.option("deprecated", true)
    }

    fn build(self, ctx: &mut BuildContext) -> Result<MethodDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut imports = ImportSet::new();
        let input = ctx.resolve(&self.input, DeclKind::Message, &mut imports);
        let output = ctx.resolve(&self.output, DeclKind::Message, &mut imports);
        ctx.imports.merge(&imports);

        match (input, output) {
            (Ok(input), Ok(output)) => Ok(MethodDescriptor {
                name: self.name,
                input,
                output,
                client_streaming: self.client_streaming,
                server_streaming: self.server_streaming,
                options: self.options,
            }),
            (input, output) => {
                for kind in [input.err(), output.err()].into_iter().flatten() {
                    errors.push(kind);
                }
                Err(errors)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceModel {
    pub(crate) name:    String,
    pub(crate) methods: Vec<MethodModel>,
    pub(crate) options: Vec<OptionEntry>,
}

/// # Panics
///
/// Panics if `name` is not a valid identifier.
pub fn service(name: &str) -> ServiceModel {
    verify_identifier("service", name);
    ServiceModel {
        name:    name.to_string(),
        methods: Vec::new(),
        options: Vec::new(),
    }
}

impl ServiceModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(mut self, method: MethodModel) -> Self {
        self.methods.push(method);
        self
    }

    /// Shorthand for a unary method.
    pub fn rpc(self, name: &str, input: impl Into<TypeName>, output: impl Into<TypeName>) -> Self {
        self.method(method(name, input, output))
    }

    pub fn option(mut self, name: &str, value: impl Into<Literal>) -> Self {
        set_option(&mut self.options, name, value.into());
        self
    }

    pub fn repeated_option(mut self, name: &str, value: impl Into<Literal>) -> Self {
        push_option(&mut self.options, name, value.into());
        self
    }

    /// Builds the service with its methods in handler order: create, get,
    /// update and delete handlers first, the rest by name.
    pub fn build(self, ctx: &mut BuildContext) -> Result<ServiceDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut seen = BTreeSet::new();
        for method in &self.methods {
            if !seen.insert(method.name.as_str()) {
                errors.push(ViolationKind::DuplicateMethod { name: method.name.clone() });
            }
        }

        let mut ordered = self.methods;
        ordered.sort_by(|a, b| {
            precedence(&a.name)
                .cmp(&precedence(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut methods = Vec::with_capacity(ordered.len());
        for method in ordered {
            let scope = format!("method {}", quote(&method.name));
            methods.extend(errors.collect(scope, method.build(ctx)));
        }

        debug!(service = %self.name, methods = methods.len(), "built service");
        errors.into_result(ServiceDescriptor {
            name: self.name,
            methods,
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use pretty_assertions::assert_eq;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        for name in ["User", "UserRequest", "Empty"] {
            registry.register(name, "acme/user.proto", DeclKind::Message).unwrap();
        }
        registry
    }

    #[test]
    fn test_precedence() {
        assert_eq!(precedence("CreateUser"), 0);
        assert_eq!(precedence("Get"), 1);
        assert_eq!(precedence("Getaway"), 4);
        assert_eq!(precedence("DeleteUser"), 3);
        assert_eq!(precedence("ListUsers"), 4);
    }

    #[test]
    fn test_methods_in_handler_order() {
        let registry = registry();
        let mut ctx = BuildContext::with_registry("acme/user_service.proto", &registry);
        let desc = service("UserService")
            .rpc("ListUsers", "UserRequest", "User")
            .rpc("DeleteUser", "UserRequest", "Empty")
            .rpc("Archive", "UserRequest", "Empty")
            .rpc("GetUser", "UserRequest", "User")
            .method(method("CreateUser", "User", "User").client_streaming())
            .rpc("UpdateUser", "User", "User")
            .build(&mut ctx)
            .unwrap();
        let names: Vec<_> = desc.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["CreateUser", "GetUser", "UpdateUser", "DeleteUser", "Archive", "ListUsers"]
        );
        assert!(desc.methods[0].client_streaming);
        assert_eq!(ctx.imports().to_vec(), vec!["acme/user.proto"]);
    }

    #[test]
    fn test_unresolved_and_duplicate_methods() {
        let registry = registry();
        let mut ctx = BuildContext::with_registry("acme/user.proto", &registry);
        let err = service("UserService")
            .rpc("GetUser", "UserRequest", "Account")
            .rpc("GetUser", "UserRequest", "User")
            .build(&mut ctx)
            .unwrap_err();
        let kinds: Vec<_> = err.kinds().cloned().collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::DuplicateMethod { name: "GetUser".into() },
                ViolationKind::UnresolvedType { name: "Account".into() },
            ]
        );
    }
}
