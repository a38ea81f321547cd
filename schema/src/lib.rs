//! The intermediate representation produced by building a Brine Proto schema.
//!
//! Descriptors are immutable results: the compiler produces each of them once
//! from an authored schema and the renderers only read them.
//!
//! ```
//! use brine_proto_schema::*;
//!
//! let mut imports = ImportSet::new();
//! imports.insert(WellKnownType::Timestamp.import_path());
//! imports.insert("buf/validate/validate.proto");
//! imports.insert(WellKnownType::Timestamp.import_path());
//!
//! assert_eq!(imports.to_vec(), ["buf/validate/validate.proto", "google/protobuf/timestamp.proto"]);
//! ```

pub mod descriptor;
pub mod imports;
pub mod literal;
pub mod violation;

pub use descriptor::*;
pub use imports::*;
pub use literal::*;
pub use violation::*;
