//! Programmatic documents shared by the unit tests.

use crate::{
    AngleLimit, BoneData, BoneFlags, BoneMorph, DataInfo, Deform, Destination, GroupMorph,
    IkData, IkJointData, ImpulseMorph, Inherent, JointData, LabelData, LabelTarget, LocalAxes,
    MaterialData, MaterialMorph, MaterialOperation, ModelData, Morph, MorphCategory, MorphData,
    RigidBodyData, RigidBodyMode, RigidBodyShape, SphereMode, TextEncoding, Toon, UvMorph,
    VertexData, VertexMorph,
};
use glam::{Quat, Vec2, Vec3, Vec4};
use std::sync::Arc;

pub fn bone(name: &str, origin: Vec3, parent: Option<usize>) -> BoneData {
    BoneData {
        name: name.to_string(),
        english_name: String::new(),
        origin,
        parent,
        ..BoneData::default()
    }
}

pub fn vertex(position: Vec3, bone: usize) -> VertexData {
    VertexData {
        position,
        deform: Deform::Bdef1 { bone: Some(bone) },
        ..VertexData::default()
    }
}

pub fn morph(name: &str, morph: Morph) -> MorphData {
    MorphData {
        name: name.to_string(),
        english_name: String::new(),
        category: MorphCategory::Other,
        morph,
    }
}

pub fn material_offset(material: Option<usize>, operation: MaterialOperation, value: f32) -> MaterialMorph {
    MaterialMorph {
        material,
        operation,
        diffuse: Vec4::splat(value),
        specular: Vec3::splat(value),
        shininess: value,
        ambient: Vec3::splat(value),
        edge_color: Vec4::splat(value),
        edge_size: value,
        texture_weight: Vec4::splat(value),
        sphere_texture_weight: Vec4::splat(value),
        toon_texture_weight: Vec4::splat(value),
    }
}

/// Resolves `data` and shares it, panicking on invalid fixtures.
pub fn resolved(mut data: ModelData) -> Arc<ModelData> {
    data.resolve().expect("fixture resolves");
    Arc::new(data)
}

pub fn model_with_bones(bones: Vec<BoneData>) -> ModelData {
    let mut data = ModelData::new(DataInfo::default());
    data.bones = bones;
    data
}

/// A PMX 2.1 document touching every record kind and optional bone field.
pub fn sample_model() -> ModelData {
    let info = DataInfo {
        version: 2.1,
        encoding: TextEncoding::Utf16Le,
        additional_uv_count: 1,
        ..DataInfo::default()
    };
    let mut data = ModelData::new(info);
    data.name = "サンプル".to_string();
    data.english_name = "sample".to_string();
    data.comment = "コメント\r\nline two".to_string();
    data.english_comment = "comment".to_string();

    let uv = vec![Vec4::new(0.1, 0.2, 0.3, 0.4)];
    data.vertices = vec![
        VertexData {
            position: Vec3::new(0.0, 0.0, 0.0),
            normal: Vec3::Y,
            texcoord: Vec2::new(0.0, 1.0),
            additional_uvs: uv.clone(),
            deform: Deform::Bdef1 { bone: Some(0) },
            edge_scale: 1.0,
        },
        VertexData {
            position: Vec3::new(0.0, 1.0, 0.0),
            normal: Vec3::Z,
            texcoord: Vec2::new(0.5, 0.5),
            additional_uvs: uv.clone(),
            deform: Deform::Bdef2 {
                bones: [Some(0), Some(1)],
                weight: 0.25,
            },
            edge_scale: 0.5,
        },
        VertexData {
            position: Vec3::new(1.0, 1.0, 0.0),
            normal: Vec3::X,
            texcoord: Vec2::new(1.0, 0.0),
            additional_uvs: uv.clone(),
            deform: Deform::Bdef4 {
                bones: [Some(0), Some(1), Some(2), None],
                weights: [0.5, 0.25, 0.25, 0.0],
            },
            edge_scale: 1.0,
        },
        VertexData {
            position: Vec3::new(1.0, 2.0, 0.0),
            normal: Vec3::Y,
            texcoord: Vec2::new(0.25, 0.75),
            additional_uvs: uv.clone(),
            deform: Deform::Sdef {
                bones: [Some(1), Some(2)],
                weight: 0.75,
                c: Vec3::new(0.0, 1.5, 0.0),
                r0: Vec3::new(0.0, 1.0, 0.0),
                r1: Vec3::new(0.0, 2.0, 0.0),
            },
            edge_scale: 1.0,
        },
        VertexData {
            position: Vec3::new(0.0, 2.0, 1.0),
            normal: Vec3::Y,
            texcoord: Vec2::ZERO,
            additional_uvs: uv,
            deform: Deform::Qdef {
                bones: [Some(1), Some(2), None, None],
                weights: [0.5, 0.5, 0.0, 0.0],
            },
            edge_scale: 1.0,
        },
    ];
    data.indices = vec![0, 1, 2, 2, 3, 4];
    data.textures = vec!["tex\\body.png".to_string(), "sphere.spa".to_string()];
    data.materials = vec![
        MaterialData {
            name: "肌".to_string(),
            english_name: "skin".to_string(),
            diffuse: Vec4::new(1.0, 0.9, 0.8, 1.0),
            specular: Vec3::splat(0.1),
            shininess: 5.0,
            ambient: Vec3::splat(0.8),
            flags: 0x1f,
            edge_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            edge_size: 1.0,
            texture: Some(0),
            sphere_texture: Some(1),
            sphere_mode: SphereMode::Multiply,
            toon: Toon::Shared(3),
            memo: "memo".to_string(),
            index_count: 3,
        },
        MaterialData {
            name: "服".to_string(),
            index_count: 3,
            toon: Toon::Texture(None),
            ..MaterialData::default()
        },
    ];

    let limit = AngleLimit {
        lower: Vec3::new(-1.0, -0.25, -0.5),
        upper: Vec3::new(0.5, 0.75, 0.0),
    };
    data.bones = vec![
        BoneData {
            name: "センター".to_string(),
            english_name: "center".to_string(),
            flags: BoneFlags::ROTATABLE | BoneFlags::MOVABLE | BoneFlags::VISIBLE | BoneFlags::INTERACTIVE,
            destination: Destination::Offset(Vec3::new(0.0, -1.0, 0.0)),
            ..BoneData::default()
        },
        BoneData {
            name: "腕".to_string(),
            english_name: "arm".to_string(),
            origin: Vec3::new(0.0, 1.0, 0.0),
            parent: Some(0),
            flags: BoneFlags::HAS_DESTINATION_BONE
                | BoneFlags::ROTATABLE
                | BoneFlags::VISIBLE
                | BoneFlags::INTERACTIVE
                | BoneFlags::LOCAL_AXES,
            destination: Destination::Bone(Some(2)),
            local_axes: Some(LocalAxes {
                x: Vec3::X,
                z: Vec3::Z,
            }),
            ..BoneData::default()
        },
        BoneData {
            name: "手".to_string(),
            english_name: "hand".to_string(),
            origin: Vec3::new(0.0, 2.0, 0.0),
            parent: Some(1),
            ..BoneData::default()
        },
        BoneData {
            name: "捩".to_string(),
            origin: Vec3::new(0.0, 1.5, 0.0),
            parent: Some(1),
            flags: BoneFlags::ROTATABLE
                | BoneFlags::INHERENT_ROTATION
                | BoneFlags::FIXED_AXIS
                | BoneFlags::EXTERNAL_PARENT,
            inherent: Some(Inherent {
                source: Some(1),
                coefficient: 0.5,
            }),
            fixed_axis: Some(Vec3::Y),
            external_parent: Some(7),
            ..BoneData::default()
        },
        BoneData {
            name: "手IK".to_string(),
            origin: Vec3::new(0.5, 2.0, 0.0),
            layer: 1,
            flags: BoneFlags::ROTATABLE
                | BoneFlags::MOVABLE
                | BoneFlags::HAS_IK
                | BoneFlags::TRANSFORM_AFTER_PHYSICS,
            ik: Some(IkData {
                effector: Some(2),
                iterations: 10,
                angle_limit: 0.5,
                joints: vec![
                    IkJointData {
                        bone: Some(1),
                        limit: Some(limit),
                    },
                    IkJointData {
                        bone: Some(0),
                        limit: None,
                    },
                ],
            }),
            ..BoneData::default()
        },
    ];

    data.morphs = vec![
        morph(
            "group",
            Morph::Group(vec![GroupMorph {
                morph: Some(1),
                weight: 0.5,
            }]),
        ),
        morph(
            "vertex",
            Morph::Vertex(vec![VertexMorph {
                vertex: 1,
                offset: Vec3::new(0.0, 0.1, 0.0),
            }]),
        ),
        morph(
            "bone",
            Morph::Bone(vec![BoneMorph {
                bone: Some(1),
                translation: Vec3::new(0.0, 0.0, 0.5),
                rotation: Quat::from_rotation_z(0.3),
            }]),
        ),
        morph(
            "uv",
            Morph::Uv {
                channel: 0,
                offsets: vec![UvMorph {
                    vertex: 2,
                    offset: Vec4::new(0.1, -0.1, 0.0, 0.0),
                }],
            },
        ),
        morph(
            "uva1",
            Morph::Uv {
                channel: 1,
                offsets: vec![UvMorph {
                    vertex: 0,
                    offset: Vec4::ONE,
                }],
            },
        ),
        morph(
            "material",
            Morph::Material(vec![material_offset(None, MaterialOperation::Add, 0.2)]),
        ),
        morph(
            "flip",
            Morph::Flip(vec![
                GroupMorph {
                    morph: Some(1),
                    weight: 1.0,
                },
                GroupMorph {
                    morph: Some(2),
                    weight: 1.0,
                },
            ]),
        ),
        morph(
            "impulse",
            Morph::Impulse(vec![ImpulseMorph {
                rigid_body: Some(0),
                local: true,
                velocity: Vec3::new(0.0, 1.0, 0.0),
                torque: Vec3::ZERO,
            }]),
        ),
    ];
    data.morphs[0].category = MorphCategory::Eye;

    data.labels = vec![
        LabelData {
            name: "Root".to_string(),
            english_name: "Root".to_string(),
            special: true,
            targets: vec![LabelTarget::Bone(Some(0))],
        },
        LabelData {
            name: "表情".to_string(),
            english_name: "Exp".to_string(),
            special: true,
            targets: vec![LabelTarget::Morph(Some(0)), LabelTarget::Morph(Some(1))],
        },
    ];

    data.rigid_bodies = vec![
        RigidBodyData {
            name: "腕剛体".to_string(),
            english_name: "arm body".to_string(),
            bone: Some(1),
            group: 2,
            collision_mask: 0xfffe,
            shape: RigidBodyShape::Capsule,
            size: Vec3::new(0.2, 1.0, 0.0),
            position: Vec3::new(0.0, 1.5, 0.0),
            rotation: Vec3::ZERO,
            mass: 1.0,
            linear_damping: 0.5,
            angular_damping: 0.5,
            restitution: 0.0,
            friction: 0.5,
            mode: RigidBodyMode::Dynamic,
        },
        RigidBodyData {
            name: "free".to_string(),
            english_name: String::new(),
            bone: None,
            group: 0,
            collision_mask: 0xffff,
            shape: RigidBodyShape::Sphere,
            size: Vec3::splat(0.5),
            position: Vec3::ZERO,
            rotation: Vec3::new(0.1, 0.2, 0.3),
            mass: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            restitution: 0.0,
            friction: 0.0,
            mode: RigidBodyMode::Static,
        },
    ];
    data.joints = vec![JointData {
        name: "joint".to_string(),
        english_name: String::new(),
        kind: 0,
        rigid_bodies: [Some(0), Some(1)],
        position: Vec3::new(0.0, 1.0, 0.0),
        rotation: Vec3::ZERO,
        position_lower: Vec3::splat(-0.1),
        position_upper: Vec3::splat(0.1),
        rotation_lower: Vec3::splat(-0.5),
        rotation_upper: Vec3::splat(0.5),
        position_stiffness: Vec3::ZERO,
        rotation_stiffness: Vec3::ONE,
    }];
    data.trailing = vec![0, 0, 0, 0];
    data
}
