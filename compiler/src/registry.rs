use brine_proto_schema::{ImportSet, TypeRef, ValidationErrors, ViolationKind, WellKnownType};
use lazy_static::lazy_static;

use std::collections::BTreeMap;

use crate::{config::DEFAULT_VALIDATE_IMPORT, file::FileModel, utils::simple_name};

lazy_static! {
    static ref EMPTY: TypeRegistry = TypeRegistry::default();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Message,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub file: String,
    pub kind: DeclKind,
}

/// Every message and enum declared in a package, keyed by its name relative
/// to the package (`Order`, `Order.Line`), with the file that declares it.
///
/// Owned by the package root and handed to each file build, so references
/// across files resolve to an import without any shared global table.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    declarations: BTreeMap<String, Declaration>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks every file and records its declarations. Names declared twice
    /// are reported; the first declaration wins.
    pub fn collect(files: &[FileModel]) -> (TypeRegistry, ValidationErrors) {
        let mut registry = TypeRegistry::new();
        let mut errors = ValidationErrors::new();
        for file in files {
            file.declare(&mut |name, kind| {
                if let Err(existing) = registry.register(name.clone(), file.name(), kind) {
                    errors.push(ViolationKind::DuplicateType {
                        name,
                        first:  existing.file,
                        second: file.name().to_string(),
                    });
                }
            });
        }
        (registry, errors)
    }

    /// Returns the existing declaration if `name` is already taken.
    pub fn register(&mut self, name: impl Into<String>, file: &str, kind: DeclKind) -> Result<(), Declaration> {
        let name = name.into();
        if let Some(existing) = self.declarations.get(&name) {
            return Err(existing.clone());
        }
        self.declarations.insert(
            name,
            Declaration {
                file: file.to_string(),
                kind,
            },
        );
        Ok(())
    }

    /// Looks `name` up the way protobuf scoping does: innermost scope first,
    /// then each enclosing scope, then the package level.
    pub fn resolve(&self, name: &str, scope: &[String]) -> Option<(String, &Declaration)> {
        for depth in (0..=scope.len()).rev() {
            let mut candidate = scope[..depth].join(".");
            if !candidate.is_empty() {
                candidate.push('.');
            }
            candidate.push_str(name);
            if let Some(declaration) = self.declarations.get(&candidate) {
                return Some((candidate, declaration));
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// A reference to a message or enum by name, as an author writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub(crate) name:       String,
    pub(crate) import:     Option<String>,
    pub(crate) well_known: Option<WellKnownType>,
}

impl TypeName {
    /// A type outside this package, declared in the file at `import`.
    pub fn external(name: impl Into<String>, import: impl Into<String>) -> Self {
        let name = name.into();
        crate::verifier::verify_type_name("external", &name);
        TypeName {
            name,
            import: Some(import.into()),
            well_known: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn simple_name(&self) -> &str {
        match self.well_known {
            Some(wkt) => simple_name(wkt.full_name()),
            None => simple_name(&self.name),
        }
    }
}

impl From<&str> for TypeName {
    /// # Panics
    ///
    /// Panics if `name` is not a dotted type name.
    fn from(name: &str) -> Self {
        crate::verifier::verify_type_name("referenced", name);
        TypeName {
            name:       name.to_string(),
            import:     None,
            well_known: None,
        }
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        TypeName::from(name.as_str())
    }
}

impl From<WellKnownType> for TypeName {
    fn from(wkt: WellKnownType) -> Self {
        TypeName {
            name:       wkt.full_name().to_string(),
            import:     Some(wkt.import_path().to_string()),
            well_known: Some(wkt),
        }
    }
}

/// Shared state threaded through every nested build of one file.
pub struct BuildContext<'r> {
    pub(crate) imports:         ImportSet,
    pub(crate) registry:        &'r TypeRegistry,
    pub(crate) file:            String,
    pub(crate) validate_import: String,
    pub(crate) scope:           Vec<String>,
}

impl BuildContext<'static> {
    /// A context for building outside a package: references only resolve
    /// when they carry their own import.
    pub fn new(file: impl Into<String>) -> Self {
        BuildContext::with_registry(file, &EMPTY)
    }
}

impl<'r> BuildContext<'r> {
    pub fn with_registry(file: impl Into<String>, registry: &'r TypeRegistry) -> Self {
        BuildContext {
            imports:         ImportSet::new(),
            registry,
            file:            file.into(),
            validate_import: DEFAULT_VALIDATE_IMPORT.to_string(),
            scope:           Vec::new(),
        }
    }

    pub fn validate_import(mut self, path: impl Into<String>) -> Self {
        self.validate_import = path.into();
        self
    }

    pub fn imports(&self) -> &ImportSet {
        &self.imports
    }

    pub fn into_imports(self) -> ImportSet {
        self.imports
    }

    pub(crate) fn enter(&mut self, name: &str) {
        self.scope.push(name.to_string());
    }

    pub(crate) fn leave(&mut self) {
        self.scope.pop();
    }

    /// The package-relative name of `name` declared in the current scope.
    pub(crate) fn qualify(&self, name: &str) -> String {
        let mut parts = self.scope.clone();
        parts.push(name.to_string());
        parts.join(".")
    }

    /// Resolves a reference, recording the import it needs in `imports`.
    pub(crate) fn resolve(&self, target: &TypeName, expect: DeclKind, imports: &mut ImportSet) -> Result<TypeRef, ViolationKind> {
        if let Some(ref import) = target.import {
            imports.insert(import.clone());
            return Ok(TypeRef {
                proto_name:  target.name.clone(),
                full_name:   target.name.clone(),
                simple_name: target.simple_name().to_string(),
                well_known:  target.well_known,
                import:      Some(import.clone()),
            });
        }
        match self.registry.resolve(&target.name, &self.scope) {
            Some((full_name, declaration)) if declaration.kind == expect => {
                let import = if declaration.file != self.file {
                    imports.insert(declaration.file.clone());
                    Some(declaration.file.clone())
                } else {
                    None
                };
                Ok(TypeRef {
                    proto_name:  target.name.clone(),
                    full_name,
                    simple_name: target.simple_name().to_string(),
                    well_known:  None,
                    import,
                })
            }
            _ => Err(ViolationKind::UnresolvedType {
                name: target.name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register("Order", "shop/order.proto", DeclKind::Message).unwrap();
        registry.register("Order.Line", "shop/order.proto", DeclKind::Message).unwrap();
        registry.register("Line", "shop/line.proto", DeclKind::Message).unwrap();
        registry.register("Status", "shop/status.proto", DeclKind::Enum).unwrap();
        registry
    }

    #[test]
    fn test_innermost_scope_wins() {
        let registry = registry();
        let scope = vec!["Order".to_string()];
        let (name, declaration) = registry.resolve("Line", &scope).unwrap();
        assert_eq!(name, "Order.Line");
        assert_eq!(declaration.file, "shop/order.proto");

        let (name, _) = registry.resolve("Line", &[]).unwrap();
        assert_eq!(name, "Line");
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = registry();
        let existing = registry
            .register("Status", "shop/other.proto", DeclKind::Enum)
            .unwrap_err();
        assert_eq!(existing.file, "shop/status.proto");
    }

    #[test]
    fn test_resolve_adds_import_for_other_files() {
        let registry = registry();
        let ctx = BuildContext::with_registry("shop/order.proto", &registry);
        let mut imports = ImportSet::new();

        let line = ctx.resolve(&"Line".into(), DeclKind::Message, &mut imports).unwrap();
        assert_eq!(line.import.as_deref(), Some("shop/line.proto"));

        let order = ctx.resolve(&"Order".into(), DeclKind::Message, &mut imports).unwrap();
        assert_eq!(order.import, None);

        let err = ctx.resolve(&"Status".into(), DeclKind::Message, &mut imports).unwrap_err();
        assert_eq!(err, ViolationKind::UnresolvedType { name: "Status".into() });
        assert_eq!(imports.to_vec(), vec!["shop/line.proto"]);
    }

    #[test]
    fn test_well_known_carries_import() {
        let ctx = BuildContext::new("a.proto");
        let mut imports = ImportSet::new();
        let ts = ctx
            .resolve(&WellKnownType::Timestamp.into(), DeclKind::Message, &mut imports)
            .unwrap();
        assert_eq!(ts.proto_name, "google.protobuf.Timestamp");
        assert_eq!(ts.simple_name, "Timestamp");
        assert!(imports.contains("google/protobuf/timestamp.proto"));
    }
}
