//! Derivation of the stable hex identifier used as a cache directory name.
//!
//! Two modes are configured once, at [`Store`](crate::store::Store)
//! construction, and never change for its lifetime: `DescriptorIdentity`
//! hashes the component/resource coordinates, `BlobDigest` just reuses the
//! digest the remote already hands back.

use crate::model::{ComponentVersion, Resource};

/// How a blueprint's cache identifier is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMethod {
    /// Hash the repository context and component/resource coordinates.
    DescriptorIdentity,
    /// Use the digest reported for the blob itself.
    BlobDigest,
}

/// Computes the descriptor-identity id: SHA-256 over the repository-context
/// bytes (empty if the component carries none) followed by
/// `"<componentName>-<componentVersion>-<resourceName>-<resourceVersion>"`.
///
/// Lowercase hex, fixed width, pure function of its inputs.
pub fn descriptor_identity(
    component_version: &dyn ComponentVersion,
    resource: &dyn Resource,
) -> String {
    let mut buf = Vec::new();
    if let Some(ctx) = component_version.repository_context() {
        buf.extend_from_slice(ctx);
    }
    buf.extend_from_slice(
        format!(
            "{}-{}-{}-{}",
            component_version.name(),
            component_version.version(),
            resource.name(),
            resource.version(),
        )
        .as_bytes(),
    );
    let digest = openssl::sha::sha256(&buf);
    hex::encode(digest)
}

/// The blob-digest id is the digest string verbatim: no trimming, no case
/// folding. The remote is trusted to hand back a strong content hash.
pub fn blob_digest_identity(digest: &str) -> String {
    digest.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{StaticComponentVersion, StaticResource};

    #[test]
    fn descriptor_identity_is_pure() {
        let cv = StaticComponentVersion::new("comp-a", "1.0.0", None);
        let res = StaticResource::new("bp", "1.0.0");

        let id1 = descriptor_identity(&cv, &res);
        let id2 = descriptor_identity(&cv, &res);
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), 64);
    }

    #[test]
    fn descriptor_identity_matches_expected_hash() {
        // sha256("" ++ "comp-a-1.0.0-bp-1.0.0")
        let cv = StaticComponentVersion::new("comp-a", "1.0.0", None);
        let res = StaticResource::new("bp", "1.0.0");
        let id = descriptor_identity(&cv, &res);

        let expected = hex::encode(openssl::sha::sha256(b"comp-a-1.0.0-bp-1.0.0"));
        assert_eq!(id, expected);
    }

    #[test]
    fn descriptor_identity_includes_repository_context() {
        let cv_without = StaticComponentVersion::new("comp-a", "1.0.0", None);
        let cv_with = StaticComponentVersion::new("comp-a", "1.0.0", Some(b"repo-bytes".to_vec()));
        let res = StaticResource::new("bp", "1.0.0");

        assert_ne!(
            descriptor_identity(&cv_without, &res),
            descriptor_identity(&cv_with, &res)
        );
    }

    #[test]
    fn blob_digest_identity_is_verbatim() {
        assert_eq!(
            blob_digest_identity("sha256:ABCDEF"),
            "sha256:ABCDEF".to_string()
        );
    }
}
