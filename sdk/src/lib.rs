//! brine-proto
//!
//! Author protobuf schemas in Rust, with validation rules checked as the
//! schema is built rather than when the generated code first runs.
//!
//! - Field, message, enum, service and file builders (re-exported from the compiler)
//! - `generate`, which validates a package and renders its `.proto` files and converters
//! - `DescribeHost`, for binding messages to the records they mirror
//!
//! ```
//! use brine_proto::prelude::*;
//!
//! let root = PackageRoot::new("acme.user.v1").file(
//!     file("acme/user/v1/user.proto").message(
//!         message("User")
//!             .field(1, field::int64("id").gt(0))
//!             .field(2, field::string("name").required().min_len(1).max_len(80))
//!             .field(3, field::timestamp("created_at")),
//!     ),
//! );
//!
//! let artifacts = brine_proto::generate(root).unwrap();
//! assert_eq!(artifacts.len(), 1);
//! assert!(artifacts[0].contents.contains("import \"buf/validate/validate.proto\";"));
//! ```

pub use brine_proto_compiler::error::ProtoError;
pub use brine_proto_compiler::package::{Artifact, ConverterRenderer, FileRenderer, PackageRoot};
pub use brine_proto_compiler::traits::DescribeHost;
pub use brine_proto_compiler::{
    enum_type, enum_value, field, file, message, method, oneof, service, GeneratorConfig, TypeName,
};
pub use brine_proto_schema::{HostRecord, PackageDescriptor, ValidationErrors, ViolationKind};

use brine_proto_compiler::{ProtoFileRenderer, RustConverterRenderer};

/// Validates `root` and renders every artifact with the default renderers:
/// proto3 text per file, and Rust conversions when any message is bound.
pub fn generate(root: PackageRoot) -> Result<Vec<Artifact>, ProtoError> {
    root.generate(&ProtoFileRenderer, &RustConverterRenderer)
}

/// Dumps a built package descriptor as pretty-printed JSON.
pub fn descriptor_to_json(descriptor: &PackageDescriptor) -> Result<String, ProtoError> {
    Ok(serde_json::to_string_pretty(descriptor)?)
}

pub mod prelude {
    pub use brine_proto_compiler::field::{
        self, Constant, Example, FieldBuilder, Lengthed, Membership, Optional, Ranged,
    };
    pub use brine_proto_compiler::traits::DescribeHost;
    pub use brine_proto_compiler::{field::FieldModel, file::FileModel, message::MessageModel};
    pub use brine_proto_compiler::{
        enum_type, enum_value, file, message, method, oneof, service, ExtensionTarget, HostRecord, PackageRoot,
        TypeName, WellKnownType,
    };
}

pub mod render {
    pub use brine_proto_compiler::gen_proto::{render_file, render_literal, ProtoFileRenderer};
    pub use brine_proto_compiler::gen_rust::{render_converters, RustConverterRenderer};
}

pub mod schema {
    pub use brine_proto_schema::*;
}
