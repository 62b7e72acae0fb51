use std::str::FromStr;

use canvasflow::types::{ALL_NODE_KINDS, NodeKind, UnknownNodeKindError};

#[test]
fn test_nodekind_encode_parse_roundtrip() {
    for kind in ALL_NODE_KINDS {
        let tag = kind.encode();
        assert_eq!(NodeKind::parse(tag).unwrap(), kind, "tag `{tag}`");
        assert_eq!(NodeKind::from_str(tag).unwrap(), kind);
    }
}

#[test]
fn test_nodekind_tags_are_lowercase() {
    for kind in ALL_NODE_KINDS {
        let tag = kind.encode();
        assert_eq!(tag, tag.to_lowercase(), "tag `{tag}` must be lowercase");
    }
}

#[test]
fn test_nodekind_parse_rejects_unknown_tags() {
    for tag in ["", "Text", "TEXT", "hologram", "text "] {
        let err = NodeKind::parse(tag).expect_err("unknown tag must not parse");
        assert_eq!(err, UnknownNodeKindError { tag: tag.into() });
    }
}

#[test]
fn test_source_kind_classification() {
    assert!(NodeKind::Text.is_source_kind());
    assert!(NodeKind::Image.is_source_kind());
    assert!(NodeKind::Speech.is_source_kind());
    assert!(NodeKind::Instruction.is_source_kind());
    // Comments are inert; generated websites are terminal artifacts.
    assert!(!NodeKind::Comment.is_source_kind());
    assert!(!NodeKind::Website.is_source_kind());
}

#[test]
fn test_only_text_supports_passthrough() {
    for kind in ALL_NODE_KINDS {
        assert_eq!(
            kind.supports_passthrough(),
            kind == NodeKind::Text,
            "kind `{kind}`"
        );
    }
}

#[test]
fn test_nodekind_display_matches_encode() {
    for kind in ALL_NODE_KINDS {
        assert_eq!(kind.to_string(), kind.encode());
    }
}

#[test]
fn test_nodekind_serde_uses_tags() {
    let json = serde_json::to_string(&NodeKind::Instruction).unwrap();
    assert_eq!(json, "\"instruction\"");
    let back: NodeKind = serde_json::from_str("\"website\"").unwrap();
    assert_eq!(back, NodeKind::Website);
}
