//! Semantic-ID hashing.
//!
//! IDs must survive a navigation-free re-scan: two observations of the same
//! static page assign the same ID to an element whose identity-like
//! attributes are unchanged. Digits are stripped from the text prefix so
//! counters ("3 new messages") do not churn the ID.

/// 32-bit FNV-1a over the given bytes.
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// The attributes that feed the semantic hash, in hash order.
#[derive(Debug, Clone, Default)]
pub struct SemanticIdentity<'a> {
    pub tag: &'a str,
    pub test_id: Option<&'a str>,
    pub role: Option<&'a str>,
    pub input_type: Option<&'a str>,
    pub placeholder: Option<&'a str>,
    pub name: Option<&'a str>,
    pub text: Option<&'a str>,
}

/// Eight lowercase hex chars identifying the element, occurrence aside.
pub fn semantic_hash8(identity: &SemanticIdentity<'_>) -> String {
    let text_prefix: String = identity
        .text
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .take(20)
        .collect();

    let material = format!(
        "{}|{}|{}|{}|{}|{}|{}",
        identity.tag,
        identity.test_id.unwrap_or(""),
        identity.role.unwrap_or(""),
        identity.input_type.unwrap_or(""),
        identity.placeholder.unwrap_or(""),
        identity.name.unwrap_or(""),
        text_prefix,
    );
    format!("{:08x}", fnv1a32(material.as_bytes()))
}

/// Full semantic ID: `<tag>-<hash8>-<occurrence>`.
pub fn semantic_id(identity: &SemanticIdentity<'_>, occurrence: u32) -> String {
    format!("{}-{}-{}", identity.tag, semantic_hash8(identity), occurrence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a32_vectors() {
        // Standard FNV-1a reference values.
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_hash_is_stable() {
        let identity = SemanticIdentity {
            tag: "button",
            text: Some("Login"),
            role: Some("button"),
            ..Default::default()
        };
        assert_eq!(semantic_hash8(&identity), semantic_hash8(&identity));
        assert_eq!(semantic_hash8(&identity).len(), 8);
    }

    #[test]
    fn test_digits_do_not_churn() {
        let a = SemanticIdentity {
            tag: "a",
            text: Some("Inbox 3"),
            ..Default::default()
        };
        let b = SemanticIdentity {
            tag: "a",
            text: Some("Inbox 14"),
            ..Default::default()
        };
        assert_eq!(semantic_hash8(&a), semantic_hash8(&b));
    }

    #[test]
    fn test_distinct_attributes_differ() {
        let login = SemanticIdentity {
            tag: "button",
            text: Some("Login"),
            ..Default::default()
        };
        let cancel = SemanticIdentity {
            tag: "button",
            text: Some("Cancel"),
            ..Default::default()
        };
        assert_ne!(semantic_hash8(&login), semantic_hash8(&cancel));
    }

    #[test]
    fn test_occurrence_suffix() {
        let identity = SemanticIdentity {
            tag: "li",
            text: Some("item"),
            ..Default::default()
        };
        let id0 = semantic_id(&identity, 0);
        let id1 = semantic_id(&identity, 1);
        assert!(id0.starts_with("li-"));
        assert!(id0.ends_with("-0"));
        assert!(id1.ends_with("-1"));
        assert_eq!(id0[..id0.len() - 2], id1[..id1.len() - 2]);
    }
}
