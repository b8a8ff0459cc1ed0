pub mod crc;

pub(crate) mod consts;
pub(crate) mod generator;
pub(crate) mod namespace;
pub(crate) mod parser;

use std::path::PathBuf;

use indexmap::IndexMap;

pub use consts::FLASH_SECTOR_SIZE;
pub use generator::encode;
pub use parser::{decode, decode_verifying, Diagnostic, DiagnosticKind};

use crate::error::Error;
use crate::value::Value;

/// Maximum Key length is 15 bytes + 1 byte for the null terminator.
pub const MAX_KEY_LENGTH: usize = 15;

/// The ordered-map shape `encode`/`decode` operate on: namespace name →
/// (key → value), both levels preserving insertion order. Byte layout is
/// entirely determined by this order, so callers must use an
/// order-preserving map (never `std::collections::HashMap`).
pub type Namespaces = IndexMap<String, IndexMap<String, Value>>;

/// A single NVS key-value entry belonging to a namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct NvsEntry {
    /// The namespace this entry belongs to (max 15 bytes).
    pub namespace: String,
    /// The key identifying this entry within its namespace (max 15 bytes).
    pub key: String,
    /// The payload — either inline data or a reference to an external file.
    pub content: EntryContent,
}

/// The content of an NVS entry — either inline data or a file reference.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryContent {
    /// Inline data whose encoding is determined by the [`Value`] variant.
    Data(Value),
    /// A reference to a file whose content will be read at generation time.
    File {
        /// How the file content is interpreted.
        encoding: FileEncoding,
        /// Path to the file (resolved relative to the CSV location).
        file_path: PathBuf,
    },
}

/// The encoding used to interpret file content for NVS file entries.
///
/// `String` reads the file as UTF-8 text. `Hex2Bin` decodes hex-encoded
/// content. `Base64` decodes base64-encoded content. `Binary` uses the
/// raw bytes directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEncoding {
    /// UTF-8 text.
    String,
    /// Hex-encoded binary data.
    Hex2Bin,
    /// Base64-encoded binary data.
    Base64,
    /// Raw binary data.
    Binary,
}

impl std::str::FromStr for FileEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "hex2bin" => Ok(Self::Hex2Bin),
            "base64" => Ok(Self::Base64),
            "binary" => Ok(Self::Binary),
            _ => Err(Error::InvalidEncoding(s.to_string())),
        }
    }
}

impl FileEncoding {
    /// Return the encoding name as a static string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Hex2Bin => "hex2bin",
            Self::Base64 => "base64",
            Self::Binary => "binary",
        }
    }
}

impl std::fmt::Display for FileEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NvsEntry {
    /// Create a new entry with inline data.
    pub fn new_data(namespace: String, key: String, value: Value) -> Self {
        Self {
            namespace,
            key,
            content: EntryContent::Data(value),
        }
    }

    /// Create a new entry that references an external file.
    ///
    /// The file content will be read and converted according to `encoding`
    /// at partition generation time.
    pub fn new_file(
        namespace: String,
        key: String,
        encoding: FileEncoding,
        file_path: PathBuf,
    ) -> Self {
        Self {
            namespace,
            key,
            content: EntryContent::File {
                encoding,
                file_path,
            },
        }
    }
}

/// Validate that `key` is non-empty and within the NVS maximum key length.
pub(crate) fn validate_key(key: &str) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::InvalidKey("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(Error::InvalidKey(format!(
            "key '{}' is too long (max {} characters)",
            key, MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Resolve a [`NvsEntry`]'s content to a concrete [`Value`], reading any
/// referenced file from disk.
pub(crate) fn resolve_value(content: &EntryContent) -> Result<Value, Error> {
    match content {
        EntryContent::Data(v) => Ok(v.clone()),
        EntryContent::File {
            encoding,
            file_path,
        } => {
            let bytes = std::fs::read(file_path)?;
            parse_file_content(&bytes, *encoding)
        }
    }
}

fn parse_file_content(content: &[u8], encoding: FileEncoding) -> Result<Value, Error> {
    match encoding {
        FileEncoding::String => {
            let s = std::str::from_utf8(content)
                .map_err(|e| Error::ValueUnsupported(format!("invalid UTF-8 in file: {e}")))?;
            Ok(Value::Str(s.to_string()))
        }
        FileEncoding::Hex2Bin => {
            let hex_str = std::str::from_utf8(content)
                .map_err(|e| Error::ValueUnsupported(format!("invalid UTF-8 in hex file: {e}")))?;
            let bytes = hex::decode(hex_str.trim())?;
            Ok(Value::Blob(bytes))
        }
        FileEncoding::Base64 => {
            use base64::Engine;
            let b64_str = std::str::from_utf8(content).map_err(|e| {
                Error::ValueUnsupported(format!("invalid UTF-8 in base64 file: {e}"))
            })?;
            let bytes = base64::engine::general_purpose::STANDARD.decode(b64_str.trim())?;
            Ok(Value::Blob(bytes))
        }
        FileEncoding::Binary => Ok(Value::Blob(content.to_vec())),
    }
}

/// An ordered collection of NVS entries, the natural shape for CSV
/// interchange (one row per entry, grouped into namespace blocks).
///
/// This converts losslessly to and from [`Namespaces`], the ordered nested
/// map that [`encode`]/[`decode`] operate on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NvsPartition {
    /// The ordered list of entries in this partition.
    pub entries: Vec<NvsEntry>,
}

impl NvsPartition {
    /// Convert to the nested ordered-map shape the binary codec uses,
    /// resolving any file-referencing entries by reading them from disk.
    pub fn into_namespaces(&self) -> Result<Namespaces, Error> {
        let mut namespaces: Namespaces = IndexMap::new();
        for entry in &self.entries {
            let value = resolve_value(&entry.content)?;
            namespaces
                .entry(entry.namespace.clone())
                .or_default()
                .insert(entry.key.clone(), value);
        }
        Ok(namespaces)
    }
}

impl From<&Namespaces> for NvsPartition {
    fn from(namespaces: &Namespaces) -> Self {
        let mut entries = Vec::new();
        for (namespace, values) in namespaces {
            for (key, value) in values {
                entries.push(NvsEntry::new_data(
                    namespace.clone(),
                    key.clone(),
                    value.clone(),
                ));
            }
        }
        Self { entries }
    }
}
