//! Renders a file descriptor as proto3 source, with validation rules written
//! as `(buf.validate.*)` options.

use brine_proto_schema::{
    EnumDescriptor, ExtensionDescriptor, FieldDescriptor, FileDescriptor, Literal, MessageDescriptor,
    MethodDescriptor, OneofDescriptor, OptionEntry, ReservedRange, Rule, ServiceDescriptor,
};

use std::fmt::Display;

use crate::{
    error::ProtoError,
    package::FileRenderer,
    utils::{quote, quote_bytes},
};

const HEADER: &str = "// Code generated by brine-proto. DO NOT EDIT.";

/// Formats a literal as a protobuf text-format value.
pub fn render_literal(value: &Literal) -> String {
    match value {
        Literal::Bool(v) => v.to_string(),
        Literal::Int(v) => v.to_string(),
        Literal::UInt(v) => v.to_string(),
        Literal::Float(v) if v.is_nan() => "nan".to_string(),
        Literal::Float(v) if v.is_infinite() => if *v > 0.0 { "inf" } else { "-inf" }.to_string(),
        Literal::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{:.1}", v),
        Literal::Float(v) => v.to_string(),
        Literal::String(v) => quote(v),
        Literal::Bytes(v) => quote_bytes(v),
        Literal::Ident(v) => v.clone(),
        Literal::List(items) => format!("[{}]", items.iter().map(render_literal).collect::<Vec<_>>().join(", ")),
        Literal::Message(fields) => format!(
            "{{{}}}",
            fields
                .iter()
                .map(|(name, value)| format!("{}: {}", name, render_literal(value)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// `(extension).path = value` assignments for each rule. A list value is
/// written as one assignment per element, which is how a repeated option is
/// set in proto source.
fn rule_assignments(extension: &str, rules: &[Rule]) -> Vec<String> {
    let mut assignments = Vec::new();
    for rule in rules {
        let name = format!("({}).{}", extension, rule.dotted());
        match rule.value {
            Literal::List(ref items) => {
                for item in items {
                    assignments.push(format!("{} = {}", name, render_literal(item)));
                }
            }
            ref value => assignments.push(format!("{} = {}", name, render_literal(value))),
        }
    }
    assignments
}

fn option_assignments(options: &[OptionEntry]) -> Vec<String> {
    options
        .iter()
        .map(|option| format!("{} = {}", option.name, render_literal(&option.value)))
        .collect()
}

/// `option ...;` statements for a declaration body.
fn option_statements(options: &[OptionEntry], extension: &str, rules: &[Rule], indent: &str) -> Vec<String> {
    option_assignments(options)
        .into_iter()
        .chain(rule_assignments(extension, rules))
        .map(|assignment| format!("{}option {};", indent, assignment))
        .collect()
}

/// The trailing `[...]` of a field or enum value; empty when there is nothing to attach.
fn compact_options(assignments: Vec<String>, indent: &str) -> String {
    match assignments.len() {
        0 => String::new(),
        1 => format!(" [{}]", assignments[0]),
        _ => {
            let inner = format!("{}  ", indent);
            let lines: Vec<String> = assignments.iter().map(|a| format!("{}{}", inner, a)).collect();
            format!(" [\n{}\n{}]", lines.join(",\n"), indent)
        }
    }
}

fn render_field(field: &FieldDescriptor, indent: &str) -> String {
    let label = if field.repeated {
        "repeated "
    } else if field.optional && field.oneof.is_none() {
        "optional "
    } else {
        ""
    };
    let mut assignments = option_assignments(&field.options);
    assignments.extend(rule_assignments("buf.validate.field", &field.rules));
    format!(
        "{}{}{} {} = {}{};",
        indent,
        label,
        field.proto_type,
        field.name,
        field.number,
        compact_options(assignments, indent)
    )
}

fn render_reserved<T: Display + PartialEq>(ranges: &[(T, T)], names: &[String], indent: &str) -> Vec<String> {
    let mut lines = Vec::new();
    if !ranges.is_empty() {
        let ranges: Vec<String> = ranges
            .iter()
            .map(|(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{} to {}", start, end)
                }
            })
            .collect();
        lines.push(format!("{}reserved {};", indent, ranges.join(", ")));
    }
    if !names.is_empty() {
        let names: Vec<String> = names.iter().map(|name| quote(name)).collect();
        lines.push(format!("{}reserved {};", indent, names.join(", ")));
    }
    lines
}

fn render_oneof(oneof: &OneofDescriptor, indent: &str) -> Vec<String> {
    let inner = format!("{}  ", indent);
    let mut lines = vec![format!("{}oneof {} {{", indent, oneof.name)];
    lines.extend(option_statements(&oneof.options, "buf.validate.oneof", &oneof.rules, &inner));
    for field in &oneof.fields {
        lines.push(render_field(field, &inner));
    }
    lines.push(format!("{}}}", indent));
    lines
}

fn render_enum(desc: &EnumDescriptor, indent: &str) -> Vec<String> {
    let inner = format!("{}  ", indent);
    let mut lines = vec![format!("{}enum {} {{", indent, desc.name)];
    lines.extend(option_statements(&desc.options, "", &[], &inner));
    for value in &desc.values {
        lines.push(format!(
            "{}{} = {}{};",
            inner,
            value.name,
            value.number,
            compact_options(option_assignments(&value.options), &inner)
        ));
    }
    lines.extend(render_reserved(&desc.reserved_ranges, &desc.reserved_names, &inner));
    lines.push(format!("{}}}", indent));
    lines
}

fn render_message(desc: &MessageDescriptor, indent: &str) -> Vec<String> {
    let inner = format!("{}  ", indent);
    let mut lines = vec![format!("{}message {} {{", indent, desc.name)];

    let mut sections: Vec<Vec<String>> = Vec::new();
    sections.push(option_statements(&desc.options, "buf.validate.message", &desc.rules, &inner));
    let ranges: Vec<(u32, u32)> = desc.reserved_ranges.iter().map(|&ReservedRange { start, end }| (start, end)).collect();
    sections.push(render_reserved(&ranges, &desc.reserved_names, &inner));
    sections.push(desc.fields.iter().map(|field| render_field(field, &inner)).collect());
    for oneof in &desc.oneofs {
        sections.push(render_oneof(oneof, &inner));
    }
    for nested in &desc.enums {
        sections.push(render_enum(nested, &inner));
    }
    for nested in &desc.messages {
        sections.push(render_message(nested, &inner));
    }

    let body: Vec<String> = sections
        .into_iter()
        .filter(|section| !section.is_empty())
        .map(|section| section.join("\n"))
        .collect();
    if !body.is_empty() {
        lines.push(body.join("\n\n"));
    }
    lines.push(format!("{}}}", indent));
    lines
}

fn render_method(method: &MethodDescriptor) -> Vec<String> {
    let stream = |streaming: bool| if streaming { "stream " } else { "" };
    let signature = format!(
        "  rpc {}({}{}) returns ({}{})",
        method.name,
        stream(method.client_streaming),
        method.input.proto_name,
        stream(method.server_streaming),
        method.output.proto_name
    );
    if method.options.is_empty() {
        return vec![format!("{};", signature)];
    }
    let mut lines = vec![format!("{} {{", signature)];
    lines.extend(option_statements(&method.options, "", &[], "    "));
    lines.push("  }".to_string());
    lines
}

fn render_service(desc: &ServiceDescriptor) -> Vec<String> {
    let mut lines = vec![format!("service {} {{", desc.name)];
    lines.extend(option_statements(&desc.options, "", &[], "  "));
    for method in &desc.methods {
        lines.extend(render_method(method));
    }
    lines.push("}".to_string());
    lines
}

fn render_extension(desc: &ExtensionDescriptor) -> Vec<String> {
    let mut lines = vec![format!("extend {} {{", desc.target.extendee())];
    lines.extend(desc.fields.iter().map(|field| render_field(field, "  ")));
    lines.push("}".to_string());
    lines
}

/// Renders `file` as proto3 source. Imports come straight from the file's
/// import set, so they are sorted and each appears once.
pub fn render_file(name: &str, file: &FileDescriptor) -> String {
    let mut blocks: Vec<String> = Vec::new();
    blocks.push(format!("{}\n// source: {}", HEADER, name));
    blocks.push("syntax = \"proto3\";".to_string());
    blocks.push(format!("package {};", file.package));

    if !file.imports.is_empty() {
        let imports: Vec<String> = file.imports.iter().map(|path| format!("import {};", quote(path))).collect();
        blocks.push(imports.join("\n"));
    }
    let options = option_statements(&file.options, "", &[], "");
    if !options.is_empty() {
        blocks.push(options.join("\n"));
    }

    for desc in &file.enums {
        blocks.push(render_enum(desc, "").join("\n"));
    }
    for desc in &file.messages {
        blocks.push(render_message(desc, "").join("\n"));
    }
    for desc in &file.services {
        blocks.push(render_service(desc).join("\n"));
    }
    for desc in &file.extensions {
        blocks.push(render_extension(desc).join("\n"));
    }

    let mut text = blocks.join("\n\n");
    text.push('\n');
    text
}

/// The default [FileRenderer].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoFileRenderer;

impl FileRenderer for ProtoFileRenderer {
    fn render_file(&self, name: &str, file: &FileDescriptor) -> Result<String, ProtoError> {
        Ok(render_file(name, file))
    }
}
