//! `<KEY>` placeholder substitution.

use std::collections::BTreeMap;

/// Replaces every `<KEY>` placeholder whose key is present in `vars`.
///
/// The template is scanned once, so replacement text is never re-expanded.
/// Unknown placeholders are left verbatim.
#[must_use]
pub fn substitute(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('<') {
        output.push_str(&rest[..open]);
        let candidate = &rest[open + 1..];
        match candidate.find(['>', '<']) {
            Some(close) if candidate.as_bytes()[close] == b'>' => {
                let key = &candidate[..close];
                match vars.get(key) {
                    Some(value) => output.push_str(value),
                    None => {
                        output.push('<');
                        output.push_str(key);
                        output.push('>');
                    }
                }
                rest = &candidate[close + 1..];
            }
            _ => {
                output.push('<');
                rest = candidate;
            }
        }
    }
    output.push_str(rest);
    output
}

/// Quotes `value` for inclusion in a `sh -c` command line.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
