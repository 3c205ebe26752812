use thiserror::Error;

/// Header text field a [`Error::InvalidText`] refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ModelText {
    Name,
    EnglishName,
    Comment,
    EnglishComment,
}

/// Cross-record reference checked while resolving a document.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Reference {
    Parent,
    Destination,
    InherentSource,
    IkEffector,
    IkJoint,
    VertexBone,
    SurfaceVertex,
    Texture,
    MaterialIndexCount,
    MorphVertex,
    MorphBone,
    MorphMaterial,
    MorphGroup,
    MorphRigidBody,
    LabelBone,
    LabelMorph,
    RigidBodyBone,
    JointRigidBody,
}

/// Why a single record (or section count) could not be read, written or resolved.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Defect {
    #[error("truncated input at offset {offset}: requested {requested} bytes, {remaining} remaining")]
    Truncated {
        offset: usize,
        requested: usize,
        remaining: usize,
    },

    #[error("negative length {value} at offset {offset}")]
    NegativeLength { offset: usize, value: i32 },

    #[error("text at offset {offset} is not valid for the declared encoding")]
    InvalidText { offset: usize },

    #[error("index {value} at offset {offset} is below -1")]
    NegativeIndex { offset: usize, value: i32 },

    #[error("unknown deform type {value}")]
    UnknownDeform { value: u8 },

    #[error("unknown morph type {value}")]
    UnknownMorphType { value: u8 },

    #[error("unknown morph category {value}")]
    UnknownMorphCategory { value: u8 },

    #[error("unknown material operation {value}")]
    UnknownMaterialOperation { value: u8 },

    #[error("unknown sphere mode {value}")]
    UnknownSphereMode { value: u8 },

    #[error("unknown label target {value}")]
    UnknownLabelTarget { value: u8 },

    #[error("unknown rigid body shape {value}")]
    UnknownShape { value: u8 },

    #[error("unknown rigid body mode {value}")]
    UnknownRigidBodyMode { value: u8 },

    #[error("boolean byte {value} at offset {offset} is neither 0 nor 1")]
    InvalidBool { offset: usize, value: u8 },

    #[error("{reference:?} reference {value} is out of range (count {count})")]
    Unresolved {
        reference: Reference,
        value: usize,
        count: usize,
    },

    #[error("bone {bone} is its own ancestor")]
    ParentCycle { bone: usize },

    #[error("index {value} does not fit in {width} byte(s)")]
    IndexOverflow { value: i64, width: u8 },

    #[error("record has {actual} additional UVs but the header declares {expected}")]
    AdditionalUvMismatch { expected: u8, actual: usize },

    #[error("UV morph channel {channel} is out of range 0..=4")]
    InvalidUvChannel { channel: u8 },

    #[error("{kind} is not representable in PMX {version}")]
    UnsupportedInVersion { kind: &'static str, version: f32 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("buffer of {len} bytes is too short for a PMX header")]
    InvalidHeader { len: usize },

    #[error("invalid PMX signature {found:?}")]
    InvalidSignature { found: [u8; 4] },

    #[error("unsupported PMX version {version}")]
    InvalidVersion { version: f32 },

    #[error("invalid header flag block (size {size})")]
    InvalidFlagSize { size: u8 },

    #[error("invalid header flag {field} = {value}")]
    InvalidFlag { field: &'static str, value: u8 },

    #[error("invalid model {field:?}: {defect}")]
    InvalidText { field: ModelText, defect: Defect },

    #[error("invalid vertex {index}: {defect}")]
    InvalidVertices { index: usize, defect: Defect },

    #[error("invalid surface index {index}: {defect}")]
    InvalidIndices { index: usize, defect: Defect },

    #[error("invalid texture {index}: {defect}")]
    InvalidTextures { index: usize, defect: Defect },

    #[error("invalid material {index}: {defect}")]
    InvalidMaterials { index: usize, defect: Defect },

    #[error("invalid bone {index}: {defect}")]
    InvalidBones { index: usize, defect: Defect },

    #[error("invalid morph {index}: {defect}")]
    InvalidMorphs { index: usize, defect: Defect },

    #[error("invalid label {index}: {defect}")]
    InvalidLabels { index: usize, defect: Defect },

    #[error("invalid rigid body {index}: {defect}")]
    InvalidRigidBodies { index: usize, defect: Defect },

    #[error("invalid joint {index}: {defect}")]
    InvalidJoints { index: usize, defect: Defect },
}

/// Failure class of an [`Error`], for callers that only branch on the kind.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    InvalidHeader,
    InvalidSignature,
    InvalidVersion,
    InvalidFlagSize,
    InvalidNameSize,
    InvalidEnglishNameSize,
    InvalidCommentSize,
    InvalidEnglishCommentSize,
    InvalidVertices,
    InvalidIndices,
    InvalidTextures,
    InvalidMaterials,
    InvalidBones,
    InvalidMorphs,
    InvalidLabels,
    InvalidRigidBodies,
    InvalidJoints,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHeader { .. } => ErrorKind::InvalidHeader,
            Self::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            Self::InvalidVersion { .. } => ErrorKind::InvalidVersion,
            Self::InvalidFlagSize { .. } | Self::InvalidFlag { .. } => ErrorKind::InvalidFlagSize,
            Self::InvalidText { field, .. } => match field {
                ModelText::Name => ErrorKind::InvalidNameSize,
                ModelText::EnglishName => ErrorKind::InvalidEnglishNameSize,
                ModelText::Comment => ErrorKind::InvalidCommentSize,
                ModelText::EnglishComment => ErrorKind::InvalidEnglishCommentSize,
            },
            Self::InvalidVertices { .. } => ErrorKind::InvalidVertices,
            Self::InvalidIndices { .. } => ErrorKind::InvalidIndices,
            Self::InvalidTextures { .. } => ErrorKind::InvalidTextures,
            Self::InvalidMaterials { .. } => ErrorKind::InvalidMaterials,
            Self::InvalidBones { .. } => ErrorKind::InvalidBones,
            Self::InvalidMorphs { .. } => ErrorKind::InvalidMorphs,
            Self::InvalidLabels { .. } => ErrorKind::InvalidLabels,
            Self::InvalidRigidBodies { .. } => ErrorKind::InvalidRigidBodies,
            Self::InvalidJoints { .. } => ErrorKind::InvalidJoints,
        }
    }

    /// The record-level defect behind a section error, if any.
    pub fn defect(&self) -> Option<&Defect> {
        match self {
            Self::InvalidText { defect, .. }
            | Self::InvalidVertices { defect, .. }
            | Self::InvalidIndices { defect, .. }
            | Self::InvalidTextures { defect, .. }
            | Self::InvalidMaterials { defect, .. }
            | Self::InvalidBones { defect, .. }
            | Self::InvalidMorphs { defect, .. }
            | Self::InvalidLabels { defect, .. }
            | Self::InvalidRigidBodies { defect, .. }
            | Self::InvalidJoints { defect, .. } => Some(defect),
            _ => None,
        }
    }
}
