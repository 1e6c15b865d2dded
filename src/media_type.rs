//! Parsing of blob media types, just enough to classify gzip-compressed
//! payloads. Anything that isn't recognized as gzip is treated as raw tar,
//! a permissive "unknown media type -> assume tar" default.

const GZIP_MEDIA_TYPES: &[&str] = &["application/gzip", "application/x-gzip"];
const GZIP_SUFFIX: &str = "+gzip";

/// A parsed blob media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    raw: String,
}

impl MediaType {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.trim().to_ascii_lowercase(),
        }
    }

    /// True when the media type names gzip directly (`application/gzip`,
    /// `application/x-gzip`) or carries the generic `+gzip` compression
    /// suffix some OCI-style media types use (e.g.
    /// `application/vnd.example.layer.v1.tar+gzip`).
    pub fn is_gzip_compressed(&self) -> bool {
        GZIP_MEDIA_TYPES.contains(&self.raw.as_str()) || self.raw.ends_with(GZIP_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
