use brine_proto_schema::{Literal, OptionEntry};

use crate::verifier::verify_option_name;

/// Sets a singular option: an earlier entry of the same name is overwritten
/// in place and any further duplicates are dropped.
pub(crate) fn set_option(options: &mut Vec<OptionEntry>, name: &str, value: Literal) {
    verify_option_name(name);
    match options.iter().position(|entry| entry.name == name) {
        Some(index) => {
            options[index].value = value;
            let mut seen = false;
            options.retain(|entry| {
                if entry.name != name {
                    return true;
                }
                let keep = !seen;
                seen = true;
                keep
            });
        }
        None => options.push(OptionEntry {
            name: name.to_string(),
            value,
        }),
    }
}

/// Appends an option, keeping every earlier entry of the same name.
pub(crate) fn push_option(options: &mut Vec<OptionEntry>, name: &str, value: Literal) {
    verify_option_name(name);
    options.push(OptionEntry {
        name: name.to_string(),
        value,
    });
}
