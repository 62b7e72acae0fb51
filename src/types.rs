//! Core types for the canvasflow workflow engine.
//!
//! This module defines the closed set of node kinds that can appear on a
//! canvas. The kind of a node decides which payload shape it carries, whether
//! it can act as a generation source for its neighbors, and which executor
//! the capability registry may dispatch to.
//!
//! # Key Types
//!
//! - [`NodeKind`]: the closed tagged set of canvas node types
//! - [`UnknownNodeKindError`]: raised when a persisted tag does not match any
//!   known kind
//!
//! # Examples
//!
//! ```rust
//! use canvasflow::types::NodeKind;
//!
//! let kind = NodeKind::parse("image")?;
//! assert_eq!(kind, NodeKind::Image);
//! assert_eq!(kind.encode(), "image");
//! assert!(kind.is_source_kind());
//! # Ok::<(), canvasflow::types::UnknownNodeKindError>(())
//! ```

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The type of a node on the canvas.
///
/// `NodeKind` is a closed set: every node a graph store hands out carries one
/// of these six tags, and an unrecognized tag is an error at the parsing
/// boundary rather than a fallback variant. Downstream code can therefore
/// match exhaustively without a catch-all arm.
///
/// # Persistence
///
/// `NodeKind` serializes to its lowercase tag both through serde and through
/// the [`encode`](Self::encode)/[`parse`](Self::parse) pair.
///
/// # Examples
///
/// ```rust
/// use canvasflow::types::NodeKind;
///
/// let processor = NodeKind::Speech;
/// let encoded = processor.encode();
/// assert_eq!(encoded, "speech");
/// assert_eq!(NodeKind::parse(encoded).unwrap(), processor);
///
/// // Unknown tags are fatal, not a fallback.
/// assert!(NodeKind::parse("hologram").is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Plain text content, either typed by the user or generated.
    ///
    /// Text is the only kind that participates in the passthrough pre-step:
    /// when a text node propagates to another text node, its payload is
    /// copied directly into the target before the target executes.
    Text,

    /// An image generated from the prompt assembled out of the node's
    /// direct sources.
    Image,

    /// Synthesized speech audio derived from upstream text.
    Speech,

    /// A user-authored instruction that steers generation of connected
    /// nodes. Instructions are sources, never generation targets.
    Instruction,

    /// A free-floating annotation. Comments never execute and are ignored
    /// when collecting sources.
    Comment,

    /// A generated web page assembled from the node's sources.
    Website,
}

/// All kinds, in canonical tag order. Handy for iteration and test strategies.
pub const ALL_NODE_KINDS: [NodeKind; 6] = [
    NodeKind::Text,
    NodeKind::Image,
    NodeKind::Speech,
    NodeKind::Instruction,
    NodeKind::Comment,
    NodeKind::Website,
];

impl NodeKind {
    /// Encode this kind into its persisted tag.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use canvasflow::types::NodeKind;
    /// assert_eq!(NodeKind::Instruction.encode(), "instruction");
    /// ```
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            NodeKind::Text => "text",
            NodeKind::Image => "image",
            NodeKind::Speech => "speech",
            NodeKind::Instruction => "instruction",
            NodeKind::Comment => "comment",
            NodeKind::Website => "website",
        }
    }

    /// Parse a persisted tag back into a kind.
    ///
    /// Unlike lenient decoders that fall back to a catch-all variant, an
    /// unknown tag here is an [`UnknownNodeKindError`]: the execution core
    /// treats a node type it cannot name as fatal for the call that
    /// encountered it.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownNodeKindError`] when `tag` is not one of the six
    /// canonical tags.
    pub fn parse(tag: &str) -> Result<Self, UnknownNodeKindError> {
        match tag {
            "text" => Ok(NodeKind::Text),
            "image" => Ok(NodeKind::Image),
            "speech" => Ok(NodeKind::Speech),
            "instruction" => Ok(NodeKind::Instruction),
            "comment" => Ok(NodeKind::Comment),
            "website" => Ok(NodeKind::Website),
            other => Err(UnknownNodeKindError {
                tag: other.to_string(),
            }),
        }
    }

    /// Returns `true` if nodes of this kind carry executable payload and may
    /// be collected as direct sources for a neighbor's generation step.
    ///
    /// Comment and website nodes are excluded: a comment is inert, and a
    /// generated website is a terminal artifact rather than an input.
    #[must_use]
    pub fn is_source_kind(&self) -> bool {
        matches!(
            self,
            NodeKind::Text | NodeKind::Image | NodeKind::Speech | NodeKind::Instruction
        )
    }

    /// Returns `true` if this kind takes part in the text passthrough
    /// pre-step (currently text only).
    #[must_use]
    pub fn supports_passthrough(&self) -> bool {
        matches!(self, NodeKind::Text)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode())
    }
}

impl FromStr for NodeKind {
    type Err = UnknownNodeKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::parse(s)
    }
}

/// A node type tag that does not belong to the closed kind set.
///
/// Raised during data-default construction and propagation whenever a stored
/// tag fails to parse; callers propagate it rather than recovering locally.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("unknown node kind: {tag}")]
#[diagnostic(
    code(canvasflow::types::unknown_node_kind),
    help("Valid kinds are: text, image, speech, instruction, comment, website.")
)]
pub struct UnknownNodeKindError {
    /// The offending tag as it appeared in the input.
    pub tag: String,
}
