use brine_proto_schema::{ConverterDescriptor, FileDescriptor, PackageDescriptor, ValidationErrors, ViolationKind};
use tracing::debug;

use std::collections::BTreeSet;

use crate::{
    config::GeneratorConfig,
    converter::collect_converters,
    error::ProtoError,
    file::FileModel,
    registry::TypeRegistry,
    utils::quote,
    verifier::verify_package,
};

/// One generated output, held in memory. Writing it anywhere is the caller's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name:     String,
    pub contents: String,
}

/// Turns one file's IR into text.
pub trait FileRenderer {
    fn render_file(&self, name: &str, file: &FileDescriptor) -> Result<String, ProtoError>;
}

/// Turns the package's converter IR into text.
pub trait ConverterRenderer {
    fn render_converters(&self, converters: &ConverterDescriptor) -> Result<String, ProtoError>;
}

impl<F> FileRenderer for F
where
    F: Fn(&str, &FileDescriptor) -> Result<String, ProtoError>,
{
    fn render_file(&self, name: &str, file: &FileDescriptor) -> Result<String, ProtoError> {
        self(name, file)
    }
}

impl<F> ConverterRenderer for F
where
    F: Fn(&ConverterDescriptor) -> Result<String, ProtoError>,
{
    fn render_converters(&self, converters: &ConverterDescriptor) -> Result<String, ProtoError> {
        self(converters)
    }
}

/// Owns every file of a package and the registry their references resolve through.
#[derive(Debug, Clone)]
pub struct PackageRoot {
    config: GeneratorConfig,
    files:  Vec<FileModel>,
}

impl PackageRoot {
    /// # Panics
    ///
    /// Panics if `package` is not a dotted identifier.
    pub fn new(package: &str) -> Self {
        verify_package(package);
        PackageRoot {
            config: GeneratorConfig::new(package),
            files:  Vec::new(),
        }
    }

    pub fn with_config(config: GeneratorConfig) -> Result<Self, ProtoError> {
        config.check()?;
        Ok(PackageRoot {
            config,
            files: Vec::new(),
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn file(mut self, file: FileModel) -> Self {
        self.files.push(file);
        self
    }

    /// Builds every file, then the converter IR for every bound message.
    /// All files are checked even when one fails; the package yields a
    /// descriptor only if none did.
    pub fn build(self) -> Result<PackageDescriptor, ValidationErrors> {
        let package = self.config.package.clone();
        let (registry, mut errors) = TypeRegistry::collect(&self.files);
        debug!(package = %package, files = self.files.len(), types = registry.len(), "building package");

        let mut names = BTreeSet::new();
        for file in &self.files {
            if !names.insert(file.name()) {
                errors.push(ViolationKind::DuplicateName {
                    name: file.name().to_string(),
                });
            }
        }

        let mut files = Vec::with_capacity(self.files.len());
        for file in self.files {
            let scope = format!("file {}", quote(file.name()));
            let result = file.build(&package, &registry, &self.config.validate_import);
            files.extend(errors.collect(scope, result));
        }

        let converters = collect_converters(&package, &self.config.generated_module, &files);
        errors.nest(format!("package {}", quote(&package))).into_result(PackageDescriptor {
            package,
            files,
            converters,
        })
    }

    /// Builds the package and renders every artifact: one per file, plus the
    /// converter file when any message is bound to a host record. Either every
    /// artifact is returned or none is.
    pub fn generate(
        self,
        files: &dyn FileRenderer,
        converters: &dyn ConverterRenderer,
    ) -> Result<Vec<Artifact>, ProtoError> {
        let converter_file = self.config.converter_file.clone();
        let package = self.build()?;

        let mut artifacts = Vec::with_capacity(package.files.len() + 1);
        for file in &package.files {
            artifacts.push(Artifact {
                name:     file.name.clone(),
                contents: files.render_file(&file.name, file)?,
            });
        }
        if !package.converters.messages.is_empty() {
            artifacts.push(Artifact {
                name:     converter_file,
                contents: converters.render_converters(&package.converters)?,
            });
        }
        debug!(package = %package.package, artifacts = artifacts.len(), "generated package");
        Ok(artifacts)
    }
}
