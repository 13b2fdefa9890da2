//! Escaping for Bullhorn search (Lucene) and query (`where`) syntax.

const LUCENE_SPECIAL: &[char] = &[
    '\\', '+', '-', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '/',
];

/// Backslash-escape characters with meaning in a Lucene query, plus the `&&` and `||` operators.
pub fn escape_query_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if LUCENE_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.replace("&&", "\\&&").replace("||", "\\||")
}

/// `(email:"x" OR email2:"x" OR email3:"x")`
pub fn email_search_query(email: &str) -> String {
    let escaped = escape_query_value(email);
    format!("(email:\"{escaped}\" OR email2:\"{escaped}\" OR email3:\"{escaped}\")")
}

/// A single-quoted string literal for a `where` clause.
pub fn where_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
