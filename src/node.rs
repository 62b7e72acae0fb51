//! Canvas data model: nodes, edges, typed payloads, and merge patches.
//!
//! Nodes and edges are owned by the graph store; the execution core only
//! reads them and requests patches. Each [`NodeKind`] carries its own payload
//! struct, and updates travel as [`NodeDataPatch`] values that merge
//! shallowly at the top level of the payload: `Some` fields overwrite,
//! `None` fields leave the current value alone.

use serde::{Deserialize, Serialize};

use crate::types::{NodeKind, UnknownNodeKindError};

// ============================================================================
// Nodes & Edges
// ============================================================================

/// A single node on the canvas.
///
/// The authoritative copy lives in the graph store. The `locked` flag is set
/// by the user to pin a node (and fence off its subtree during execution);
/// the `running` flag is toggled transiently by the orchestrator for the
/// duration of the node's own execution step and acts as an advisory
/// re-entrancy guard, not a mutex.
///
/// # Examples
///
/// ```rust
/// use canvasflow::node::CanvasNode;
/// use canvasflow::types::NodeKind;
///
/// let node = CanvasNode::text("headline", "Launch day");
/// assert_eq!(node.kind(), NodeKind::Text);
/// assert!(!node.locked);
/// assert!(!node.running);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasNode {
    /// Unique identifier within the canvas.
    pub id: String,
    /// Type-specific payload; its variant is the node's kind.
    #[serde(flatten)]
    pub data: NodeData,
    /// User-set pin. A locked node never executes and blocks propagation
    /// into its subtree.
    #[serde(default)]
    pub locked: bool,
    /// Transient execution marker maintained by the orchestrator.
    #[serde(default)]
    pub running: bool,
}

impl CanvasNode {
    /// Create a node with the given payload, unlocked and not running.
    #[must_use]
    pub fn new(id: impl Into<String>, data: NodeData) -> Self {
        Self {
            id: id.into(),
            data,
            locked: false,
            running: false,
        }
    }

    /// Convenience constructor for a text node.
    #[must_use]
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, NodeData::Text(TextData::new(text)))
    }

    /// Convenience constructor for an image node with a prompt and no
    /// generated output yet.
    #[must_use]
    pub fn image(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeData::Image(ImageData {
                prompt: prompt.into(),
                ..Default::default()
            }),
        )
    }

    /// Convenience constructor for a speech node.
    #[must_use]
    pub fn speech(id: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeData::Speech(SpeechData {
                transcript: transcript.into(),
                ..Default::default()
            }),
        )
    }

    /// Convenience constructor for an instruction node.
    #[must_use]
    pub fn instruction(id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeData::Instruction(InstructionData {
                instruction: instruction.into(),
            }),
        )
    }

    /// Convenience constructor for a comment node.
    #[must_use]
    pub fn comment(id: impl Into<String>, comment: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeData::Comment(CommentData {
                comment: comment.into(),
            }),
        )
    }

    /// Convenience constructor for a website node with no generated page yet.
    #[must_use]
    pub fn website(id: impl Into<String>) -> Self {
        Self::new(id, NodeData::Website(WebsiteData::default()))
    }

    /// Set the locked flag, builder-style.
    #[must_use]
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// The node's kind, derived from its payload variant.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

/// A directed connection from one node to another.
///
/// Only identity and endpoints matter to execution; presentation attributes
/// stay in the UI layer. Edge order as returned by the graph store is the
/// order in which the orchestrator walks a node's outgoing branches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasEdge {
    /// Unique identifier within the canvas.
    pub id: String,
    /// Id of the node data flows out of.
    pub source: String,
    /// Id of the node data flows into.
    pub target: String,
}

impl CanvasEdge {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }

    /// Build an edge with a derived `source->target` id.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use canvasflow::node::CanvasEdge;
    ///
    /// let edge = CanvasEdge::between("draft", "hero");
    /// assert_eq!(edge.id, "draft->hero");
    /// ```
    #[must_use]
    pub fn between(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        let id = format!("{source}->{target}");
        Self { id, source, target }
    }
}

// ============================================================================
// Typed Payloads
// ============================================================================

/// Payload of a text node.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextData {
    /// The text content, user-typed or generated.
    #[serde(default)]
    pub text: String,
    /// Quota signal from the billing collaborator; consumed by executors,
    /// never enforced by the orchestrator.
    #[serde(default)]
    pub is_rate_limited: bool,
}

impl TextData {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_rate_limited: false,
        }
    }
}

/// Payload of an image node.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageData {
    /// Prompt assembled by the user or by an upstream instruction.
    #[serde(default)]
    pub prompt: String,
    /// Location of the generated image, once an executor produced one.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Quota signal from the billing collaborator.
    #[serde(default)]
    pub is_rate_limited: bool,
}

/// Payload of a speech node.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeechData {
    /// The text to synthesize, typically copied in from upstream text nodes.
    #[serde(default)]
    pub transcript: String,
    /// Location of the synthesized audio, once an executor produced it.
    #[serde(default)]
    pub audio_url: Option<String>,
    /// Quota signal from the billing collaborator.
    #[serde(default)]
    pub is_rate_limited: bool,
}

/// Payload of an instruction node. Instructions steer the generation of
/// connected nodes and are never generated themselves.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstructionData {
    #[serde(default)]
    pub instruction: String,
}

/// Payload of a comment node. Comments are inert annotations.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentData {
    #[serde(default)]
    pub comment: String,
}

/// Payload of a generated-website node.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebsiteData {
    /// The generated page, once an executor produced one.
    #[serde(default)]
    pub html: Option<String>,
    /// Quota signal from the billing collaborator.
    #[serde(default)]
    pub is_rate_limited: bool,
}

/// The typed payload of a canvas node, one variant per [`NodeKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum NodeData {
    Text(TextData),
    Image(ImageData),
    Speech(SpeechData),
    Instruction(InstructionData),
    Comment(CommentData),
    Website(WebsiteData),
}

impl NodeData {
    /// The kind this payload belongs to.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Image(_) => NodeKind::Image,
            NodeData::Speech(_) => NodeKind::Speech,
            NodeData::Instruction(_) => NodeKind::Instruction,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::Website(_) => NodeKind::Website,
        }
    }

    /// Default payload for a kind, used when materializing a freshly created
    /// node.
    #[must_use]
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Text => NodeData::Text(TextData::default()),
            NodeKind::Image => NodeData::Image(ImageData::default()),
            NodeKind::Speech => NodeData::Speech(SpeechData::default()),
            NodeKind::Instruction => NodeData::Instruction(InstructionData::default()),
            NodeKind::Comment => NodeData::Comment(CommentData::default()),
            NodeKind::Website => NodeData::Website(WebsiteData::default()),
        }
    }

    /// Default payload for a persisted kind tag.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownNodeKindError`] for tags outside the closed kind set;
    /// callers treat that as fatal rather than inventing a payload shape.
    pub fn default_for_tag(tag: &str) -> Result<Self, UnknownNodeKindError> {
        Ok(Self::default_for(NodeKind::parse(tag)?))
    }

    /// Merge a patch into this payload, shallowly at the top level: each
    /// `Some` field of the patch overwrites the corresponding field, `None`
    /// fields are left untouched.
    ///
    /// Returns `false` (and applies nothing) when the patch variant does not
    /// match the payload variant; the graph store surfaces that as a
    /// kind-mismatch error.
    pub fn merge(&mut self, patch: &NodeDataPatch) -> bool {
        match (self, patch) {
            (NodeData::Text(data), NodeDataPatch::Text(p)) => {
                if let Some(text) = &p.text {
                    data.text = text.clone();
                }
                if let Some(flag) = p.is_rate_limited {
                    data.is_rate_limited = flag;
                }
                true
            }
            (NodeData::Image(data), NodeDataPatch::Image(p)) => {
                if let Some(prompt) = &p.prompt {
                    data.prompt = prompt.clone();
                }
                if let Some(url) = &p.image_url {
                    data.image_url = Some(url.clone());
                }
                if let Some(flag) = p.is_rate_limited {
                    data.is_rate_limited = flag;
                }
                true
            }
            (NodeData::Speech(data), NodeDataPatch::Speech(p)) => {
                if let Some(transcript) = &p.transcript {
                    data.transcript = transcript.clone();
                }
                if let Some(url) = &p.audio_url {
                    data.audio_url = Some(url.clone());
                }
                if let Some(flag) = p.is_rate_limited {
                    data.is_rate_limited = flag;
                }
                true
            }
            (NodeData::Instruction(data), NodeDataPatch::Instruction(p)) => {
                if let Some(instruction) = &p.instruction {
                    data.instruction = instruction.clone();
                }
                true
            }
            (NodeData::Comment(data), NodeDataPatch::Comment(p)) => {
                if let Some(comment) = &p.comment {
                    data.comment = comment.clone();
                }
                true
            }
            (NodeData::Website(data), NodeDataPatch::Website(p)) => {
                if let Some(html) = &p.html {
                    data.html = Some(html.clone());
                }
                if let Some(flag) = p.is_rate_limited {
                    data.is_rate_limited = flag;
                }
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Patches
// ============================================================================

/// Partial text payload.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextPatch {
    pub text: Option<String>,
    pub is_rate_limited: Option<bool>,
}

impl TextPatch {
    /// Patch carrying only new text content, as used by the passthrough
    /// pre-step.
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            is_rate_limited: None,
        }
    }
}

/// Partial image payload.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImagePatch {
    pub prompt: Option<String>,
    pub image_url: Option<String>,
    pub is_rate_limited: Option<bool>,
}

/// Partial speech payload.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeechPatch {
    pub transcript: Option<String>,
    pub audio_url: Option<String>,
    pub is_rate_limited: Option<bool>,
}

/// Partial instruction payload.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstructionPatch {
    pub instruction: Option<String>,
}

/// Partial comment payload.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentPatch {
    pub comment: Option<String>,
}

/// Partial website payload.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebsitePatch {
    pub html: Option<String>,
    pub is_rate_limited: Option<bool>,
}

/// A merge patch against a node's payload, one variant per [`NodeKind`].
///
/// Executors request exactly one (or zero) of these per invocation through
/// the graph store; the store applies it with [`NodeData::merge`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
pub enum NodeDataPatch {
    Text(TextPatch),
    Image(ImagePatch),
    Speech(SpeechPatch),
    Instruction(InstructionPatch),
    Comment(CommentPatch),
    Website(WebsitePatch),
}

impl NodeDataPatch {
    /// The kind this patch targets.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeDataPatch::Text(_) => NodeKind::Text,
            NodeDataPatch::Image(_) => NodeKind::Image,
            NodeDataPatch::Speech(_) => NodeKind::Speech,
            NodeDataPatch::Instruction(_) => NodeKind::Instruction,
            NodeDataPatch::Comment(_) => NodeKind::Comment,
            NodeDataPatch::Website(_) => NodeKind::Website,
        }
    }
}
