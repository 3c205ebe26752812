//! Reference resolution and bone evaluation order.

use crate::{
    BoneData, Defect, Destination, Error, LabelTarget, ModelData, Morph, Reference, Toon,
};
use glam::Vec3;

/// Which side of the external physics step a bone is evaluated on.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PhysicsPhase {
    Before,
    After,
}

/// Bone hierarchy and evaluation order derived from a resolved document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoneGraph {
    children: Vec<Vec<usize>>,
    offsets: Vec<Vec3>,
    before_physics: Vec<usize>,
    after_physics: Vec<usize>,
    before_physics_ik: Vec<usize>,
    after_physics_ik: Vec<usize>,
}

impl BoneGraph {
    /// Builds the graph for bones whose references have already been validated.
    pub fn build(bones: &[BoneData]) -> Self {
        let mut children = vec![Vec::<usize>::new(); bones.len()];
        for (index, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent < children.len() {
                    children[parent].push(index);
                }
            }
        }

        let offsets = bones
            .iter()
            .map(|bone| match bone.parent.and_then(|parent| bones.get(parent)) {
                Some(parent) => bone.origin - parent.origin,
                None => bone.origin,
            })
            .collect();

        let phase_order = |after: bool| {
            let mut order = (0..bones.len())
                .filter(|&index| bones[index].is_after_physics() == after)
                .collect::<Vec<_>>();
            order.sort_by_key(|&index| (bones[index].layer, index));
            order
        };
        let before_physics = phase_order(false);
        let after_physics = phase_order(true);
        let ik_of = |order: &[usize]| {
            order
                .iter()
                .copied()
                .filter(|&index| bones[index].ik.is_some())
                .collect::<Vec<_>>()
        };
        let before_physics_ik = ik_of(&before_physics);
        let after_physics_ik = ik_of(&after_physics);

        Self {
            children,
            offsets,
            before_physics,
            after_physics,
            before_physics_ik,
            after_physics_ik,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn children(&self, bone: usize) -> &[usize] {
        self.children.get(bone).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `origin - parent.origin`, or the origin itself for roots.
    pub fn offset_from_parent(&self, bone: usize) -> Vec3 {
        self.offsets.get(bone).copied().unwrap_or(Vec3::ZERO)
    }

    /// Bones of one phase sorted by `(layer, index)`.
    pub fn order(&self, phase: PhysicsPhase) -> &[usize] {
        match phase {
            PhysicsPhase::Before => &self.before_physics,
            PhysicsPhase::After => &self.after_physics,
        }
    }

    /// IK bones of one phase, in evaluation order.
    pub fn ik_bones(&self, phase: PhysicsPhase) -> &[usize] {
        match phase {
            PhysicsPhase::Before => &self.before_physics_ik,
            PhysicsPhase::After => &self.after_physics_ik,
        }
    }

    /// Every bone, before-physics bones first.
    pub fn evaluation_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.before_physics
            .iter()
            .chain(self.after_physics.iter())
            .copied()
    }
}

fn check(reference: Reference, value: Option<usize>, count: usize) -> Result<(), Defect> {
    match value {
        Some(value) if value >= count => Err(Defect::Unresolved {
            reference,
            value,
            count,
        }),
        _ => Ok(()),
    }
}

fn validate_bone(bone: &BoneData, count: usize) -> Result<(), Defect> {
    check(Reference::Parent, bone.parent, count)?;
    if let Destination::Bone(target) = bone.destination {
        check(Reference::Destination, target, count)?;
    }
    check(Reference::InherentSource, bone.inherent_source(), count)?;
    if let Some(ik) = &bone.ik {
        check(Reference::IkEffector, ik.effector, count)?;
        for joint in &ik.joints {
            check(Reference::IkJoint, joint.bone, count)?;
        }
    }
    Ok(())
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Visit {
    Pending,
    Active,
    Done,
}

fn find_parent_cycle(bones: &[BoneData]) -> Option<usize> {
    let mut state = vec![Visit::Pending; bones.len()];
    let mut path = Vec::new();
    for start in 0..bones.len() {
        path.clear();
        let mut current = Some(start);
        while let Some(index) = current {
            match state[index] {
                Visit::Done => break,
                Visit::Active => return Some(index),
                Visit::Pending => {
                    state[index] = Visit::Active;
                    path.push(index);
                    current = bones[index].parent;
                }
            }
        }
        for &index in &path {
            state[index] = Visit::Done;
        }
    }
    None
}

fn validate_morph(morph: &Morph, data: &ModelData) -> Result<(), Defect> {
    match morph {
        Morph::Group(list) | Morph::Flip(list) => {
            for offset in list {
                check(Reference::MorphGroup, offset.morph, data.morphs.len())?;
            }
        }
        Morph::Vertex(list) => {
            for offset in list {
                check(
                    Reference::MorphVertex,
                    Some(offset.vertex),
                    data.vertices.len(),
                )?;
            }
        }
        Morph::Bone(list) => {
            for offset in list {
                check(Reference::MorphBone, offset.bone, data.bones.len())?;
            }
        }
        Morph::Uv { offsets, .. } => {
            for offset in offsets {
                check(
                    Reference::MorphVertex,
                    Some(offset.vertex),
                    data.vertices.len(),
                )?;
            }
        }
        Morph::Material(list) => {
            for offset in list {
                check(
                    Reference::MorphMaterial,
                    offset.material,
                    data.materials.len(),
                )?;
            }
        }
        Morph::Impulse(list) => {
            for offset in list {
                check(
                    Reference::MorphRigidBody,
                    offset.rigid_body,
                    data.rigid_bodies.len(),
                )?;
            }
        }
    }
    Ok(())
}

impl ModelData {
    /// Validates every cross-record reference and rebuilds the bone graph.
    ///
    /// Loading calls this once; call it again after editing bone topology.
    pub fn resolve(&mut self) -> Result<(), Error> {
        let bone_count = self.bones.len();
        for (index, bone) in self.bones.iter().enumerate() {
            validate_bone(bone, bone_count)
                .map_err(|defect| Error::InvalidBones { index, defect })?;
        }
        if let Some(bone) = find_parent_cycle(&self.bones) {
            return Err(Error::InvalidBones {
                index: bone,
                defect: Defect::ParentCycle { bone },
            });
        }

        for (index, vertex) in self.vertices.iter().enumerate() {
            for &bone in vertex.deform.bones() {
                check(Reference::VertexBone, bone, bone_count)
                    .map_err(|defect| Error::InvalidVertices { index, defect })?;
            }
        }

        let vertex_count = self.vertices.len();
        for (index, &vertex) in self.indices.iter().enumerate() {
            check(
                Reference::SurfaceVertex,
                Some(vertex as usize),
                vertex_count,
            )
            .map_err(|defect| Error::InvalidIndices { index, defect })?;
        }

        let texture_count = self.textures.len();
        let mut consumed = 0usize;
        for (index, material) in self.materials.iter().enumerate() {
            let wrap = |defect| Error::InvalidMaterials { index, defect };
            check(Reference::Texture, material.texture, texture_count).map_err(wrap)?;
            check(Reference::Texture, material.sphere_texture, texture_count).map_err(wrap)?;
            if let Toon::Texture(texture) = material.toon {
                check(Reference::Texture, texture, texture_count).map_err(wrap)?;
            }
            let count = usize::try_from(material.index_count).map_err(|_| {
                wrap(Defect::NegativeLength {
                    offset: 0,
                    value: material.index_count,
                })
            })?;
            consumed = consumed.saturating_add(count);
            if consumed > self.indices.len() {
                return Err(wrap(Defect::Unresolved {
                    reference: Reference::MaterialIndexCount,
                    value: consumed,
                    count: self.indices.len(),
                }));
            }
        }

        for (index, morph) in self.morphs.iter().enumerate() {
            validate_morph(&morph.morph, self)
                .map_err(|defect| Error::InvalidMorphs { index, defect })?;
        }

        for (index, label) in self.labels.iter().enumerate() {
            for target in &label.targets {
                match *target {
                    LabelTarget::Bone(bone) => check(Reference::LabelBone, bone, bone_count),
                    LabelTarget::Morph(morph) => {
                        check(Reference::LabelMorph, morph, self.morphs.len())
                    }
                }
                .map_err(|defect| Error::InvalidLabels { index, defect })?;
            }
        }

        for (index, body) in self.rigid_bodies.iter().enumerate() {
            check(Reference::RigidBodyBone, body.bone, bone_count)
                .map_err(|defect| Error::InvalidRigidBodies { index, defect })?;
        }

        let body_count = self.rigid_bodies.len();
        for (index, joint) in self.joints.iter().enumerate() {
            for body in joint.rigid_bodies {
                check(Reference::JointRigidBody, body, body_count)
                    .map_err(|defect| Error::InvalidJoints { index, defect })?;
            }
        }

        self.graph = BoneGraph::build(&self.bones);
        Ok(())
    }
}
