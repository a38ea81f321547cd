pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// Escapes bytes for a proto string literal.
pub fn quote_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 2);
    out.push('"');
    for &b in bytes {
        match b {
            b'"'  => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out.push('"');
    out
}

/// Wraps `inner` in `Option<..>` unless it already is one.
pub fn optional_type(inner: &str) -> String {
    if inner.starts_with("Option<") {
        inner.to_string()
    } else {
        format!("Option<{}>", inner)
    }
}

/// Strips whitespace so host type tags compare regardless of formatting.
pub fn normalize_type(ty: &str) -> String {
    ty.chars().filter(|c| !c.is_whitespace()).collect()
}

/// The last `.`-separated segment of a type name.
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Converts a name to PascalCase. Underscored and all-caps names are
/// recased word by word; anything else keeps its inner casing.
pub fn to_pascal_case(s: &str) -> String {
    fn capitalize(word: &str, lower_rest: bool) -> String {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if lower_rest => first.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
            Some(first) => first.to_uppercase().to_string() + chars.as_str(),
        }
    }

    if s.contains('_') {
        s.split('_').filter(|word| !word.is_empty()).map(|word| capitalize(word, true)).collect()
    } else {
        capitalize(s, s == s.to_uppercase())
    }
}

/// Converts a name to snake_case without splitting acronyms
/// (`sessionID` becomes `session_id`).
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if !prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase()) {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

/// Escapes a Rust keyword as a raw identifier, the way prost names fields.
pub fn rust_ident(s: &str) -> String {
    const KEYWORDS: [&str; 38] = [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else",
        "enum", "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop",
        "match", "mod", "move", "mut", "pub", "ref", "return", "self", "Self", "static",
        "struct", "super", "trait", "true", "type", "unsafe", "use", "where", "while",
    ];
    match s {
        "self" | "Self" | "super" | "crate" => format!("{}_", s),
        _ if KEYWORDS.contains(&s) => format!("r#{}", s),
        _ => s.to_string(),
    }
}

/// The generated Rust path of a package-relative proto type: enclosing
/// messages become snake_case modules (`Order.Line` is `order::Line`).
pub fn rust_type_path(module: &str, full_name: &str) -> String {
    let mut parts: Vec<&str> = full_name.split('.').collect();
    let last = parts.pop().unwrap_or(full_name);
    let mut path = module.to_string();
    for part in parts {
        path.push_str("::");
        path.push_str(&to_snake_case(part));
    }
    path.push_str("::");
    path.push_str(&to_pascal_case(last));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote_bytes(&[0x61, 0x00, 0x22]), "\"a\\x00\\\"\"");
    }

    #[test]
    fn test_types() {
        assert_eq!(optional_type("i64"), "Option<i64>");
        assert_eq!(optional_type("Option<i64>"), "Option<i64>");
        assert_eq!(normalize_type("HashMap<String, i64>"), "HashMap<String,i64>");
        assert_eq!(simple_name("Order.Line"), "Line");
        assert_eq!(simple_name("Order"), "Order");
    }

    #[test]
    fn test_casing() {
        assert_eq!(to_pascal_case("payment_method"), "PaymentMethod");
        assert_eq!(to_pascal_case("SIGNAL"), "Signal");
        assert_eq!(to_pascal_case("userID"), "UserID");
        assert_eq!(to_snake_case("sessionID"), "session_id");
        assert_eq!(to_snake_case("OrderLine"), "order_line");
        assert_eq!(rust_ident("type"), "r#type");
        assert_eq!(rust_ident("self"), "self_");
        assert_eq!(rust_ident("name"), "name");
    }

    #[test]
    fn test_rust_type_path() {
        assert_eq!(rust_type_path("crate::pb", "User"), "crate::pb::User");
        assert_eq!(rust_type_path("crate::pb", "Order.LineItem"), "crate::pb::order::LineItem");
    }
}
