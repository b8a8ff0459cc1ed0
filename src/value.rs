/// A concrete, explicitly-typed value stored in an NVS entry.
///
/// Unlike the dynamic-dispatch value inspection of the tool this codec's
/// format was distilled from, callers pick the width up front. Use
/// [`Value::from_u64`] / [`Value::from_i64`] if all you have is a runtime
/// integer and want the narrowest tag that fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Signed 8-bit integer.
    I8(i8),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Signed 16-bit integer.
    I16(i16),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 32-bit integer.
    I32(i32),
    /// UTF-8 string (without null terminator).
    Str(String),
    /// Opaque byte blob.
    Blob(Vec<u8>),
}

impl Value {
    /// Narrow an unsigned integer to the smallest tag that represents it
    /// exactly (`U8` → `U16` → `U32`).
    pub fn from_u64(v: u64) -> Option<Self> {
        if let Ok(v) = u8::try_from(v) {
            Some(Self::U8(v))
        } else if let Ok(v) = u16::try_from(v) {
            Some(Self::U16(v))
        } else {
            u32::try_from(v).ok().map(Self::U32)
        }
    }

    /// Narrow a signed integer to the smallest tag that represents it
    /// exactly (`I8` → `I16` → `I32`).
    pub fn from_i64(v: i64) -> Option<Self> {
        if let Ok(v) = i8::try_from(v) {
            Some(Self::I8(v))
        } else if let Ok(v) = i16::try_from(v) {
            Some(Self::I16(v))
        } else {
            i32::try_from(v).ok().map(Self::I32)
        }
    }

    /// The CSV `encoding` column string for this value.
    pub fn encoding_str(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::I8(_) => "i8",
            Self::U16(_) => "u16",
            Self::I16(_) => "i16",
            Self::U32(_) => "u32",
            Self::I32(_) => "i32",
            Self::Str(_) => "string",
            Self::Blob(_) => "base64",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
            Self::Blob(b) => {
                use base64::Engine;
                f.write_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
        }
    }
}
