//! Options controlling how the IR is rendered.

use hast_common::ContentHash;
use serde::{Deserialize, Serialize};

/// Names at most this long are never shortened.
pub const MAX_READABLE_NAME_LENGTH: usize = 64;

/// Number of trailing characters kept by [`NameShortening::Readable`].
const KEPT_TAIL_LENGTH: usize = 48;

/// How extended identifiers are shortened before rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameShortening {
    /// Names are rendered as they are.
    #[default]
    None,
    /// Long names keep their most specific tail, prefixed with a hash of the
    /// full name so distinct names stay distinct.
    Readable,
}

impl NameShortening {
    /// Applies the shortening to an unescaped name.
    pub fn shorten(self, name: &str) -> String {
        match self {
            NameShortening::None => name.to_owned(),
            NameShortening::Readable => {
                if name.chars().count() <= MAX_READABLE_NAME_LENGTH {
                    return name.to_owned();
                }
                let skip = name.chars().count() - KEPT_TAIL_LENGTH;
                let tail: String = name.chars().skip(skip).collect();
                format!("H{}.{}", ContentHash::of_str(name).short_hex(8), tail)
            }
        }
    }
}

/// Settings for [`Render::to_vhdl`](crate::Render::to_vhdl).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VhdlGenerationOptions {
    /// Emit newlines and indentation. Without it the code is packed onto as
    /// few lines as comments allow.
    pub format_code: bool,
    /// Drop every comment node from the output.
    pub omit_comments: bool,
    /// Shortening applied to extended identifiers.
    pub name_shortener: NameShortening,
}

impl Default for VhdlGenerationOptions {
    fn default() -> Self {
        Self {
            format_code: false,
            omit_comments: true,
            name_shortener: NameShortening::Readable,
        }
    }
}

impl VhdlGenerationOptions {
    /// Formatted, commented output with full names.
    pub fn debug() -> Self {
        Self {
            format_code: true,
            omit_comments: false,
            name_shortener: NameShortening::None,
        }
    }

    /// Line separator: a newline when formatting, a space otherwise.
    pub fn newline(&self) -> &'static str {
        if self.format_code {
            "\n"
        } else {
            " "
        }
    }

    /// Shortens `name` with the configured shortener.
    pub fn shorten_name(&self, name: &str) -> String {
        self.name_shortener.shorten(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let debug = VhdlGenerationOptions::debug();
        assert!(debug.format_code);
        assert!(!debug.omit_comments);
        assert_eq!(debug.name_shortener, NameShortening::None);

        let default = VhdlGenerationOptions::default();
        assert!(!default.format_code);
        assert!(default.omit_comments);
        assert_eq!(default.newline(), " ");
    }

    #[test]
    fn short_names_are_kept() {
        let name = "Samples.Adder.Run.0._Started";
        assert_eq!(NameShortening::Readable.shorten(name), name);
        assert_eq!(NameShortening::None.shorten(name), name);
    }

    #[test]
    fn readable_shortening_keeps_tail() {
        let name = format!("{}.Method.0._Started", "Very.Long.Namespace".repeat(5));
        let short = NameShortening::Readable.shorten(&name);
        assert!(short.len() < name.len());
        assert!(short.ends_with("Method.0._Started"));
        assert!(short.starts_with('H'));
    }

    #[test]
    fn readable_shortening_has_no_collisions_on_shared_tails() {
        let tail = "System.UInt32 Samples.Calculator::Compute(System.UInt32).0._Started";
        let names: Vec<String> = (0..200).map(|i| format!("Namespace{i}.{tail}")).collect();
        let mut shortened: Vec<String> = names
            .iter()
            .map(|name| NameShortening::Readable.shorten(name))
            .collect();
        shortened.sort();
        shortened.dedup();
        assert_eq!(shortened.len(), names.len());
    }

    #[test]
    fn shortening_is_deterministic() {
        let name = "A".repeat(100);
        assert_eq!(
            NameShortening::Readable.shorten(&name),
            NameShortening::Readable.shorten(&name)
        );
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&NameShortening::Readable).unwrap();
        assert_eq!(json, "\"readable\"");
        let options: VhdlGenerationOptions =
            serde_json::from_str(r#"{"format_code": true}"#).unwrap();
        assert!(options.format_code);
        assert!(options.omit_comments);
    }
}
