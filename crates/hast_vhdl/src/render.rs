//! The [`Render`] trait and the text helpers shared by all nodes.

use crate::options::VhdlGenerationOptions;

/// Turns an IR node into VHDL source.
pub trait Render {
    /// Renders the node. The same node and options always give the same text.
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String;
}

impl<T: Render> Render for [T] {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        self.iter().map(|item| item.to_vhdl(options)).collect()
    }
}

impl<T: Render> Render for Vec<T> {
    fn to_vhdl(&self, options: &VhdlGenerationOptions) -> String {
        self.as_slice().to_vhdl(options)
    }
}

const RESERVED_WORDS: &[&str] = &[
    "abs", "access", "after", "alias", "all", "and", "architecture", "array", "assert",
    "attribute", "begin", "block", "body", "buffer", "bus", "case", "component", "configuration",
    "constant", "disconnect", "downto", "else", "elsif", "end", "entity", "exit", "file", "for",
    "function", "generate", "generic", "group", "guarded", "if", "impure", "in", "inertial",
    "inout", "is", "label", "library", "linkage", "literal", "loop", "map", "mod", "nand", "new",
    "next", "nor", "not", "null", "of", "on", "open", "or", "others", "out", "package", "port",
    "postponed", "procedure", "process", "pure", "range", "record", "register", "reject", "rem",
    "report", "return", "rol", "ror", "select", "severity", "shared", "signal", "sla", "sll",
    "sra", "srl", "subtype", "then", "to", "transport", "type", "unaffected", "units", "until",
    "use", "variable", "wait", "when", "while", "with", "xnor", "xor",
];

fn is_basic_identifier(name: &str) -> bool {
    let starts_with_letter = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_with_letter
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.contains("__")
        && !name.ends_with('_')
        && !RESERVED_WORDS.contains(&name.to_ascii_lowercase().as_str())
}

/// Renders a name as a VHDL identifier.
///
/// Plain identifiers pass through untouched. Everything else becomes an
/// extended identifier after name shortening.
pub fn identifier(name: &str, options: &VhdlGenerationOptions) -> String {
    if is_basic_identifier(name) {
        return name.to_owned();
    }
    let shortened = options.shorten_name(name);
    format!("\\{}\\", shortened.replace('\\', "\\\\"))
}

/// Appends a `;` unless the code already ends with one.
pub fn terminate(code: &str) -> String {
    let trimmed = code.trim_end();
    if trimmed.ends_with(';') {
        trimmed.to_owned()
    } else {
        format!("{trimmed};")
    }
}

/// Indents every non-empty line by four spaces when formatting.
pub fn indent(code: &str, options: &VhdlGenerationOptions) -> String {
    if !options.format_code {
        return code.to_owned();
    }
    code.lines()
        .map(|line| {
            if line.trim().is_empty() {
                "\n".to_owned()
            } else {
                format!("    {line}\n")
            }
        })
        .collect()
}

/// Renders a terminated statement followed by a line separator.
pub(crate) fn statement_line(code: &str, options: &VhdlGenerationOptions) -> String {
    format!("{}{}", terminate(code), options.newline())
}

/// Renders `text` as `--` comment lines; empty when comments are omitted.
///
/// Comment lines always end with a real newline, even when not formatting.
pub(crate) fn comment_lines(text: &str, options: &VhdlGenerationOptions) -> String {
    if options.omit_comments {
        return String::new();
    }
    text.lines().map(|line| format!("-- {line}\n")).collect()
}

/// Renders items and joins them with `separator`.
pub(crate) fn join<T: Render>(items: &[T], separator: &str, options: &VhdlGenerationOptions) -> String {
    items
        .iter()
        .map(|item| item.to_vhdl(options))
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::NameShortening;

    #[test]
    fn terminate_is_idempotent() {
        assert_eq!(terminate("a := b"), "a := b;");
        assert_eq!(terminate("a := b;"), "a := b;");
        assert_eq!(terminate(&terminate("a := b\n")), "a := b;");
    }

    #[test]
    fn plain_names_are_not_escaped() {
        let options = VhdlGenerationOptions::debug();
        assert_eq!(identifier("Clock", &options), "Clock");
        assert_eq!(identifier("Data_In2", &options), "Data_In2");
    }

    #[test]
    fn other_names_become_extended_identifiers() {
        let options = VhdlGenerationOptions::debug();
        assert_eq!(identifier("A.B.0._Started", &options), "\\A.B.0._Started\\");
        assert_eq!(identifier("signal", &options), "\\signal\\");
        assert_eq!(identifier("trailing_", &options), "\\trailing_\\");
        assert_eq!(identifier("a__b", &options), "\\a__b\\");
        assert_eq!(identifier("1st", &options), "\\1st\\");
        assert_eq!(identifier("back\\slash", &options), "\\back\\\\slash\\");
    }

    #[test]
    fn shortening_applies_to_extended_identifiers_only() {
        let options = VhdlGenerationOptions {
            name_shortener: NameShortening::Readable,
            ..VhdlGenerationOptions::debug()
        };
        let plain = "a".repeat(80);
        assert_eq!(identifier(&plain, &options), plain);
        let dotted = format!("{}.x", "a".repeat(80));
        assert!(identifier(&dotted, &options).len() < dotted.len());
    }

    #[test]
    fn indent_only_when_formatting() {
        let code = "a;\n\nb;\n";
        assert_eq!(indent(code, &VhdlGenerationOptions::debug()), "    a;\n\n    b;\n");
        let packed = VhdlGenerationOptions {
            format_code: false,
            ..VhdlGenerationOptions::debug()
        };
        assert_eq!(indent(code, &packed), code);
    }

    #[test]
    fn comments_keep_newlines_and_can_be_omitted() {
        let packed = VhdlGenerationOptions {
            format_code: false,
            omit_comments: false,
            name_shortener: NameShortening::None,
        };
        assert_eq!(comment_lines("one\ntwo", &packed), "-- one\n-- two\n");
        assert_eq!(comment_lines("one", &VhdlGenerationOptions::default()), "");
    }
}
