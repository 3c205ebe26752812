use crate::BoneGraph;
use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec2, Vec3, Vec4};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextEncoding {
    #[default]
    Utf16Le,
    Utf8,
}

impl TextEncoding {
    pub(crate) fn from_flag(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Utf16Le),
            1 => Some(Self::Utf8),
            _ => None,
        }
    }

    pub(crate) fn flag(self) -> u8 {
        match self {
            Self::Utf16Le => 0,
            Self::Utf8 => 1,
        }
    }

    pub fn encoded_len(self, text: &str) -> usize {
        match self {
            Self::Utf16Le => text.encode_utf16().count() * 2,
            Self::Utf8 => text.len(),
        }
    }

    pub(crate) fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
            Self::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return None;
                }
                let units = bytes
                    .chunks_exact(2)
                    .map(LittleEndian::read_u16)
                    .collect::<Vec<_>>();
                String::from_utf16(&units).ok()
            }
        }
    }
}

/// Byte width of a cross-record reference.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IndexWidth {
    #[default]
    One,
    Two,
    Four,
}

impl IndexWidth {
    pub fn from_bytes(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            4 => Some(Self::Four),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// Smallest width holding signed references into a section of `count` records.
    pub fn for_count(count: usize) -> Self {
        if count < 0x80 {
            Self::One
        } else if count < 0x8000 {
            Self::Two
        } else {
            Self::Four
        }
    }

    /// Vertex references are unsigned at widths 1 and 2.
    pub fn for_vertex_count(count: usize) -> Self {
        if count < 0x100 {
            Self::One
        } else if count < 0x1_0000 {
            Self::Two
        } else {
            Self::Four
        }
    }
}

/// Convention IK angle limits are expressed in once loaded.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoordinateSystem {
    /// The file's own left-handed convention; limits pass through untouched.
    #[default]
    DirectX,
    /// Limits are mirrored on load and mirrored back on write.
    OpenGl,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LoadOptions {
    pub coordinate_system: CoordinateSystem,
}

/// Per-model codec parameters declared by the header.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataInfo {
    pub version: f32,
    pub encoding: TextEncoding,
    pub additional_uv_count: u8,
    pub vertex_index: IndexWidth,
    pub texture_index: IndexWidth,
    pub material_index: IndexWidth,
    pub bone_index: IndexWidth,
    pub morph_index: IndexWidth,
    pub rigid_body_index: IndexWidth,
    pub coordinate_system: CoordinateSystem,
}

impl Default for DataInfo {
    fn default() -> Self {
        Self {
            version: 2.0,
            encoding: TextEncoding::Utf16Le,
            additional_uv_count: 0,
            vertex_index: IndexWidth::One,
            texture_index: IndexWidth::One,
            material_index: IndexWidth::One,
            bone_index: IndexWidth::One,
            morph_index: IndexWidth::One,
            rigid_body_index: IndexWidth::One,
            coordinate_system: CoordinateSystem::DirectX,
        }
    }
}

impl DataInfo {
    pub fn is_v21(&self) -> bool {
        self.version >= 2.1
    }
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
    pub struct BoneFlags: u16 {
        const HAS_DESTINATION_BONE = 0x0001;
        const ROTATABLE = 0x0002;
        const MOVABLE = 0x0004;
        const VISIBLE = 0x0008;
        const INTERACTIVE = 0x0010;
        const HAS_IK = 0x0020;
        const LOCAL_INHERENT = 0x0080;
        const INHERENT_ROTATION = 0x0100;
        const INHERENT_TRANSLATION = 0x0200;
        const FIXED_AXIS = 0x0400;
        const LOCAL_AXES = 0x0800;
        const TRANSFORM_AFTER_PHYSICS = 0x1000;
        const EXTERNAL_PARENT = 0x2000;

        const _ = !0;
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Destination {
    Offset(Vec3),
    Bone(Option<usize>),
}

impl Default for Destination {
    fn default() -> Self {
        Self::Offset(Vec3::ZERO)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Inherent {
    pub source: Option<usize>,
    pub coefficient: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocalAxes {
    pub x: Vec3,
    pub z: Vec3,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AngleLimit {
    pub lower: Vec3,
    pub upper: Vec3,
}

impl AngleLimit {
    /// Mirrors a limit pair between the file convention and OpenGL. Applying it twice is the
    /// identity.
    pub fn mirrored(self) -> Self {
        Self {
            lower: Vec3::new(-self.upper.x, -self.upper.y, self.lower.z),
            upper: Vec3::new(-self.lower.x, -self.lower.y, self.upper.z),
        }
    }

    pub(crate) fn permits(self, axis: usize) -> bool {
        !(is_fuzzy_zero(self.lower[axis]) && is_fuzzy_zero(self.upper[axis]))
    }
}

pub(crate) fn is_fuzzy_zero(value: f32) -> bool {
    value.abs() < f32::EPSILON
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IkJointData {
    pub bone: Option<usize>,
    pub limit: Option<AngleLimit>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IkData {
    pub effector: Option<usize>,
    pub iterations: i32,
    /// Maximum rotation per iteration, in radians.
    pub angle_limit: f32,
    pub joints: Vec<IkJointData>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoneData {
    pub name: String,
    pub english_name: String,
    pub origin: Vec3,
    pub parent: Option<usize>,
    pub layer: i32,
    pub flags: BoneFlags,
    pub destination: Destination,
    pub inherent: Option<Inherent>,
    pub fixed_axis: Option<Vec3>,
    pub local_axes: Option<LocalAxes>,
    pub external_parent: Option<i32>,
    pub ik: Option<IkData>,
}

impl Default for BoneData {
    fn default() -> Self {
        Self {
            name: String::new(),
            english_name: String::new(),
            origin: Vec3::ZERO,
            parent: None,
            layer: 0,
            flags: BoneFlags::ROTATABLE | BoneFlags::VISIBLE | BoneFlags::INTERACTIVE,
            destination: Destination::default(),
            inherent: None,
            fixed_axis: None,
            local_axes: None,
            external_parent: None,
            ik: None,
        }
    }
}

impl BoneData {
    /// Flags as written to a file.
    ///
    /// Bits that select optional fields follow the fields actually present; the inherent bits
    /// are cleared when there is no inherent source. All other bits are kept as stored.
    pub fn layout_flags(&self) -> BoneFlags {
        let mut flags = self.flags;
        flags.set(
            BoneFlags::HAS_DESTINATION_BONE,
            matches!(self.destination, Destination::Bone(_)),
        );
        if self.inherent.is_none() {
            flags.remove(BoneFlags::INHERENT_ROTATION | BoneFlags::INHERENT_TRANSLATION);
        }
        flags.set(BoneFlags::FIXED_AXIS, self.fixed_axis.is_some());
        flags.set(BoneFlags::LOCAL_AXES, self.local_axes.is_some());
        flags.set(BoneFlags::EXTERNAL_PARENT, self.external_parent.is_some());
        flags.set(BoneFlags::HAS_IK, self.ik.is_some());
        flags
    }

    pub fn is_after_physics(&self) -> bool {
        self.flags.contains(BoneFlags::TRANSFORM_AFTER_PHYSICS)
    }

    pub fn has_inherent_rotation(&self) -> bool {
        self.inherent.is_some() && self.flags.contains(BoneFlags::INHERENT_ROTATION)
    }

    pub fn has_inherent_translation(&self) -> bool {
        self.inherent.is_some() && self.flags.contains(BoneFlags::INHERENT_TRANSLATION)
    }

    pub(crate) fn inherent_source(&self) -> Option<usize> {
        self.inherent.and_then(|inherent| inherent.source)
    }

    pub(crate) fn inherent_coefficient(&self) -> f32 {
        self.inherent.map(|inherent| inherent.coefficient).unwrap_or(1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Deform {
    Bdef1 {
        bone: Option<usize>,
    },
    Bdef2 {
        bones: [Option<usize>; 2],
        weight: f32,
    },
    Bdef4 {
        bones: [Option<usize>; 4],
        weights: [f32; 4],
    },
    Sdef {
        bones: [Option<usize>; 2],
        weight: f32,
        c: Vec3,
        r0: Vec3,
        r1: Vec3,
    },
    /// Dual-quaternion deform, PMX 2.1 only.
    Qdef {
        bones: [Option<usize>; 4],
        weights: [f32; 4],
    },
}

impl Deform {
    pub fn bones(&self) -> &[Option<usize>] {
        match self {
            Self::Bdef1 { bone } => std::slice::from_ref(bone),
            Self::Bdef2 { bones, .. } | Self::Sdef { bones, .. } => bones,
            Self::Bdef4 { bones, .. } | Self::Qdef { bones, .. } => bones,
        }
    }

    /// Weight of the `slot`th bone; BDEF1 implies 1.0 and BDEF2/SDEF store only the first.
    pub fn weight(&self, slot: usize) -> f32 {
        match self {
            Self::Bdef1 { .. } => {
                if slot == 0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Bdef2 { weight, .. } | Self::Sdef { weight, .. } => match slot {
                0 => *weight,
                1 => 1.0 - *weight,
                _ => 0.0,
            },
            Self::Bdef4 { weights, .. } | Self::Qdef { weights, .. } => {
                weights.get(slot).copied().unwrap_or(0.0)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexData {
    pub position: Vec3,
    pub normal: Vec3,
    pub texcoord: Vec2,
    pub additional_uvs: Vec<Vec4>,
    pub deform: Deform,
    pub edge_scale: f32,
}

impl Default for VertexData {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            texcoord: Vec2::ZERO,
            additional_uvs: Vec::new(),
            deform: Deform::Bdef1 { bone: None },
            edge_scale: 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SphereMode {
    #[default]
    Disabled,
    Multiply,
    Add,
    SubTexture,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Toon {
    Texture(Option<usize>),
    /// One of the ten shared toon textures.
    Shared(u8),
}

impl Default for Toon {
    fn default() -> Self {
        Self::Texture(None)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaterialData {
    pub name: String,
    pub english_name: String,
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub shininess: f32,
    pub ambient: Vec3,
    pub flags: u8,
    pub edge_color: Vec4,
    pub edge_size: f32,
    pub texture: Option<usize>,
    pub sphere_texture: Option<usize>,
    pub sphere_mode: SphereMode,
    pub toon: Toon,
    pub memo: String,
    /// Number of surface indices drawn with this material.
    pub index_count: i32,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: String::new(),
            english_name: String::new(),
            diffuse: Vec4::ONE,
            specular: Vec3::ZERO,
            shininess: 0.0,
            ambient: Vec3::ZERO,
            flags: 0,
            edge_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            edge_size: 1.0,
            texture: None,
            sphere_texture: None,
            sphere_mode: SphereMode::Disabled,
            toon: Toon::default(),
            memo: String::new(),
            index_count: 0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MorphCategory {
    System,
    Eyebrow,
    Eye,
    Lip,
    #[default]
    Other,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupMorph {
    pub morph: Option<usize>,
    pub weight: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VertexMorph {
    pub vertex: usize,
    pub offset: Vec3,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoneMorph {
    pub bone: Option<usize>,
    pub translation: Vec3,
    pub rotation: Quat,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UvMorph {
    pub vertex: usize,
    pub offset: Vec4,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MaterialOperation {
    #[default]
    Multiply,
    Add,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaterialMorph {
    /// `None` targets every material.
    pub material: Option<usize>,
    pub operation: MaterialOperation,
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub shininess: f32,
    pub ambient: Vec3,
    pub edge_color: Vec4,
    pub edge_size: f32,
    pub texture_weight: Vec4,
    pub sphere_texture_weight: Vec4,
    pub toon_texture_weight: Vec4,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImpulseMorph {
    pub rigid_body: Option<usize>,
    pub local: bool,
    pub velocity: Vec3,
    pub torque: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Morph {
    Group(Vec<GroupMorph>),
    Vertex(Vec<VertexMorph>),
    Bone(Vec<BoneMorph>),
    /// Channel 0 offsets the texcoord, channels 1..=4 the additional UVs.
    Uv {
        channel: u8,
        offsets: Vec<UvMorph>,
    },
    Material(Vec<MaterialMorph>),
    Flip(Vec<GroupMorph>),
    Impulse(Vec<ImpulseMorph>),
}

impl Morph {
    pub fn len(&self) -> usize {
        match self {
            Self::Group(v) | Self::Flip(v) => v.len(),
            Self::Vertex(v) => v.len(),
            Self::Bone(v) => v.len(),
            Self::Uv { offsets, .. } => offsets.len(),
            Self::Material(v) => v.len(),
            Self::Impulse(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MorphData {
    pub name: String,
    pub english_name: String,
    pub category: MorphCategory,
    pub morph: Morph,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LabelTarget {
    Bone(Option<usize>),
    Morph(Option<usize>),
}

/// A display frame grouping bones and morphs for editors.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabelData {
    pub name: String,
    pub english_name: String,
    pub special: bool,
    pub targets: Vec<LabelTarget>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RigidBodyShape {
    #[default]
    Sphere,
    Box,
    Capsule,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RigidBodyMode {
    /// Follows its bone.
    #[default]
    Static,
    /// Drives its bone from the simulation.
    Dynamic,
    /// Simulated rotation, bone-aligned position.
    Aligned,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyData {
    pub name: String,
    pub english_name: String,
    pub bone: Option<usize>,
    pub group: u8,
    pub collision_mask: u16,
    pub shape: RigidBodyShape,
    pub size: Vec3,
    pub position: Vec3,
    pub rotation: Vec3,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub restitution: f32,
    pub friction: f32,
    pub mode: RigidBodyMode,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointData {
    pub name: String,
    pub english_name: String,
    /// 0 is the 6DOF spring joint; PMX 2.1 adds 1..=5.
    pub kind: u8,
    pub rigid_bodies: [Option<usize>; 2],
    pub position: Vec3,
    pub rotation: Vec3,
    pub position_lower: Vec3,
    pub position_upper: Vec3,
    pub rotation_lower: Vec3,
    pub rotation_upper: Vec3,
    pub position_stiffness: Vec3,
    pub rotation_stiffness: Vec3,
}

/// A loaded model document.
///
/// Cross-record references are indices into the owning vectors. After any edit that changes
/// bone topology, call [`ModelData::resolve`] to validate references and rebuild the bone graph.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModelData {
    pub info: DataInfo,
    pub name: String,
    pub english_name: String,
    pub comment: String,
    pub english_comment: String,
    pub vertices: Vec<VertexData>,
    pub indices: Vec<u32>,
    pub textures: Vec<String>,
    pub materials: Vec<MaterialData>,
    pub bones: Vec<BoneData>,
    pub morphs: Vec<MorphData>,
    pub labels: Vec<LabelData>,
    pub rigid_bodies: Vec<RigidBodyData>,
    pub joints: Vec<JointData>,
    /// Sections this crate does not model (PMX 2.1 soft bodies), kept verbatim.
    pub trailing: Vec<u8>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) graph: BoneGraph,
}

impl ModelData {
    pub fn new(info: DataInfo) -> Self {
        Self {
            info,
            name: String::new(),
            english_name: String::new(),
            comment: String::new(),
            english_comment: String::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            textures: Vec::new(),
            materials: Vec::new(),
            bones: Vec::new(),
            morphs: Vec::new(),
            labels: Vec::new(),
            rigid_bodies: Vec::new(),
            joints: Vec::new(),
            trailing: Vec::new(),
            graph: BoneGraph::default(),
        }
    }

    pub fn graph(&self) -> &BoneGraph {
        &self.graph
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    pub fn morph_index(&self, name: &str) -> Option<usize> {
        self.morphs.iter().position(|morph| morph.name == name)
    }

    /// Picks the smallest index widths that hold the current record counts.
    pub fn fit_index_widths(&mut self) {
        self.info.vertex_index = IndexWidth::for_vertex_count(self.vertices.len());
        self.info.texture_index = IndexWidth::for_count(self.textures.len());
        self.info.material_index = IndexWidth::for_count(self.materials.len());
        self.info.bone_index = IndexWidth::for_count(self.bones.len());
        self.info.morph_index = IndexWidth::for_count(self.morphs.len());
        self.info.rigid_body_index = IndexWidth::for_count(self.rigid_bodies.len());
    }
}
