//! brine-proto-compiler
//!
//! This crate implements:
//!  1) Builders for fields, oneofs, messages, enums, services and files,
//!  2) Rule validation that reports every problem with the path leading to it,
//!  3) A package-wide type registry that resolves references into imports,
//!  4) Host-record drift detection and the converter IR for bound messages,
//!  5) Rendering (`render_file` → proto3 text, `render_converters` → Rust),
//!  6) Error types (`ProtoError`) and the `DescribeHost` trait.

pub mod config;
pub mod converter;
pub mod enumeration;
pub mod error;
pub mod field;
pub mod file;
pub mod gen_proto;
pub mod gen_rust;
pub mod message;
pub mod oneof;
mod options;
pub mod package;
pub mod registry;
pub mod service;
pub mod traits;
pub mod utils;
pub mod verifier;

pub use brine_proto_schema::{
    ExtensionTarget, HostRecord, ImportSet, Literal, PackageDescriptor, ValidationErrors, Violation, ViolationKind,
    WellKnownType,
};
pub use config::GeneratorConfig;
pub use enumeration::{enum_type, enum_value};
pub use error::ProtoError;
pub use file::file;
pub use gen_proto::{render_file, ProtoFileRenderer};
pub use gen_rust::{render_converters, RustConverterRenderer};
pub use message::message;
pub use oneof::oneof;
pub use package::{Artifact, PackageRoot};
pub use registry::TypeName;
pub use service::{method, service};
