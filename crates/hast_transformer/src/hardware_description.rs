//! Persisted hardware descriptions.
//!
//! A [`VhdlHardwareDescription`] is everything the vendor toolchain and
//! the host need from a generation run. It is stored as a JSON document
//! whose header carries a checksum of the VHDL source, so hand-edited or
//! truncated files are rejected on load.

use crate::manifest_builder::TransformedVhdlManifest;
use crate::member_id_table::MemberIdTable;
use hast_common::ContentHash;
use hast_vhdl::VhdlGenerationOptions;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Magic string identifying a saved hardware description.
const DESCRIPTION_MAGIC: &str = "HAST";

/// Current document format version.
const DESCRIPTION_FORMAT_VERSION: u32 = 1;

/// Language tag of VHDL descriptions.
pub const VHDL_LANGUAGE: &str = "VHDL";

/// Errors from saving or loading a hardware description.
#[derive(Debug, thiserror::Error)]
pub enum HardwareDescriptionError {
    /// Reading or writing the file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not have the expected shape.
    #[error("malformed hardware description: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The document is not a hardware description.
    #[error("not a hardware description: expected magic 'HAST', found '{0}'")]
    InvalidMagic(String),

    /// The document was written by an incompatible version.
    #[error("unsupported hardware description format version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version in the document.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },

    /// The VHDL source does not match the stored checksum.
    #[error("hardware description checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum stored in the header.
        expected: ContentHash,
        /// Checksum of the loaded source.
        actual: ContentHash,
    },
}

/// Header written in front of every saved description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionHeader {
    /// Must be `"HAST"`.
    pub magic: String,
    /// Document format version.
    pub format_version: u32,
    /// Checksum of `vhdl_source`.
    pub checksum: ContentHash,
}

/// Generated VHDL plus the data a host needs to call into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VhdlHardwareDescription {
    /// Always [`VHDL_LANGUAGE`].
    pub language: String,
    /// Full names of the members the host may start.
    pub hardware_entry_point_members: Vec<String>,
    /// IDs to select entry points with.
    pub member_id_table: MemberIdTable,
    /// The rendered design.
    pub vhdl_source: String,
    /// Non-fatal problems found while generating.
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct SavedDescription {
    header: DescriptionHeader,
    description: VhdlHardwareDescription,
}

impl VhdlHardwareDescription {
    /// Renders `manifest` with `options`.
    pub fn new(manifest: &TransformedVhdlManifest, options: &VhdlGenerationOptions) -> Self {
        Self {
            language: VHDL_LANGUAGE.to_string(),
            hardware_entry_point_members: manifest.hardware_entry_point_members.clone(),
            member_id_table: manifest.member_id_table.clone(),
            vhdl_source: manifest.to_vhdl(options),
            warnings: manifest.warnings.clone(),
        }
    }

    /// Writes the description as JSON.
    pub fn save(&self, writer: impl Write) -> Result<(), HardwareDescriptionError> {
        let saved = SavedDescription {
            header: DescriptionHeader {
                magic: DESCRIPTION_MAGIC.to_string(),
                format_version: DESCRIPTION_FORMAT_VERSION,
                checksum: ContentHash::of_str(&self.vhdl_source),
            },
            description: self.clone(),
        };
        serde_json::to_writer_pretty(writer, &saved)?;
        Ok(())
    }

    /// Reads a description written by [`save`](Self::save), validating
    /// magic, version and checksum in that order.
    pub fn load(reader: impl Read) -> Result<Self, HardwareDescriptionError> {
        let saved: SavedDescription = serde_json::from_reader(reader)?;
        let header = saved.header;
        if header.magic != DESCRIPTION_MAGIC {
            return Err(HardwareDescriptionError::InvalidMagic(header.magic));
        }
        if header.format_version != DESCRIPTION_FORMAT_VERSION {
            return Err(HardwareDescriptionError::UnsupportedVersion {
                found: header.format_version,
                expected: DESCRIPTION_FORMAT_VERSION,
            });
        }
        let actual = ContentHash::of_str(&saved.description.vhdl_source);
        if actual != header.checksum {
            return Err(HardwareDescriptionError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }
        Ok(saved.description)
    }

    /// Saves to `path`, replacing any existing file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), HardwareDescriptionError> {
        let file = File::create(path).map_err(|source| HardwareDescriptionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        self.save(&mut writer)?;
        writer.flush().map_err(|source| HardwareDescriptionError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads from `path`.
    pub fn load_from_file(path: &Path) -> Result<Self, HardwareDescriptionError> {
        let file = File::open(path).map_err(|source| HardwareDescriptionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Member;

    fn description() -> VhdlHardwareDescription {
        let mut member = Member::new("Demo::Run()");
        member.is_interface = true;
        VhdlHardwareDescription {
            language: VHDL_LANGUAGE.to_string(),
            hardware_entry_point_members: vec!["Demo::Run()".to_string()],
            member_id_table: MemberIdTable::build([&member]).unwrap(),
            vhdl_source: "entity Hast_IP is\nend Hast_IP;\n".to_string(),
            warnings: Vec::new(),
        }
    }

    fn saved(description: &VhdlHardwareDescription) -> serde_json::Value {
        let mut buffer = Vec::new();
        description.save(&mut buffer).unwrap();
        serde_json::from_slice(&buffer).unwrap()
    }

    fn load_value(value: &serde_json::Value) -> Result<VhdlHardwareDescription, HardwareDescriptionError> {
        VhdlHardwareDescription::load(value.to_string().as_bytes())
    }

    #[test]
    fn header_carries_magic_and_checksum() {
        let description = description();
        let value = saved(&description);
        assert_eq!(value["header"]["magic"], "HAST");
        assert_eq!(value["header"]["format_version"], 1);
        let loaded = load_value(&value).unwrap();
        assert_eq!(loaded, description);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut value = saved(&description());
        value["header"]["magic"] = "RIFF".into();
        let err = load_value(&value).unwrap_err();
        assert!(matches!(err, HardwareDescriptionError::InvalidMagic(magic) if magic == "RIFF"));
    }

    #[test]
    fn future_version_is_rejected() {
        let mut value = saved(&description());
        value["header"]["format_version"] = 7.into();
        let err = load_value(&value).unwrap_err();
        assert!(matches!(
            err,
            HardwareDescriptionError::UnsupportedVersion { found: 7, expected: 1 }
        ));
    }

    #[test]
    fn edited_source_is_rejected() {
        let mut value = saved(&description());
        value["description"]["vhdl_source"] = "entity Other is\nend Other;\n".into();
        let err = load_value(&value).unwrap_err();
        assert!(matches!(err, HardwareDescriptionError::ChecksumMismatch { .. }));
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        let err = VhdlHardwareDescription::load("not json".as_bytes()).unwrap_err();
        assert!(matches!(err, HardwareDescriptionError::Serialization(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = VhdlHardwareDescription::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn error_display() {
        let err = HardwareDescriptionError::UnsupportedVersion {
            found: 2,
            expected: 1,
        };
        assert_eq!(
            err.to_string(),
            "unsupported hardware description format version 2 (expected 1)"
        );
        let err = HardwareDescriptionError::InvalidMagic("XYZ".to_string());
        assert_eq!(
            err.to_string(),
            "not a hardware description: expected magic 'HAST', found 'XYZ'"
        );
    }
}
