use lazy_static::lazy_static;
use regex::Regex;

use crate::utils::quote;

lazy_static! {
    static ref IDENTIFIER:   Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref PACKAGE_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref FILE_NAME:    Regex = Regex::new(r"^[A-Za-z0-9_\-]+(/[A-Za-z0-9_\-]+)*\.proto$").unwrap();
    static ref OPTION_NAME:  Regex = Regex::new(r"^(\([A-Za-z_][A-Za-z0-9_.]*\)|[A-Za-z_][A-Za-z0-9_]*)(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
}

pub const FIELD_NUMBER_MAX: u32 = 536_870_911;
pub const IMPLEMENTATION_RESERVED: std::ops::RangeInclusive<u32> = 19_000..=19_999;

/// Returns `true` if `number` may be assigned to a field.
pub fn is_valid_field_number(number: u32) -> bool {
    (1..=FIELD_NUMBER_MAX).contains(&number) && !IMPLEMENTATION_RESERVED.contains(&number)
}

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Aborts on a name that could never be rendered. A bad name is a bug in the
/// schema definition itself, not something a build can report and continue past.
///
/// # Panics
///
/// Panics if `name` is empty or not a plain identifier.
pub fn verify_identifier(what: &str, name: &str) {
    if !IDENTIFIER.is_match(name) {
        panic!("The {} name {} is not a valid identifier", what, quote(name));
    }
}

/// # Panics
///
/// Panics if `name` is not a dotted sequence of identifiers.
pub fn verify_type_name(what: &str, name: &str) {
    if !PACKAGE_NAME.is_match(name) {
        panic!("The {} type name {} is not a valid type reference", what, quote(name));
    }
}

/// # Panics
///
/// Panics if `name` is not a dotted sequence of identifiers.
pub fn verify_package(name: &str) {
    if !PACKAGE_NAME.is_match(name) {
        panic!("The package name {} is not a valid package", quote(name));
    }
}

/// # Panics
///
/// Panics if `name` is not a relative `.proto` path.
pub fn verify_file_name(name: &str) {
    if !FILE_NAME.is_match(name) {
        panic!("The file name {} is not a relative .proto path", quote(name));
    }
}

/// # Panics
///
/// Panics if `name` is neither a plain option nor a parenthesized extension.
pub fn verify_option_name(name: &str) {
    if !OPTION_NAME.is_match(name) {
        panic!("The option name {} is not a valid option", quote(name));
    }
}
