use crate::{
    BoneGraph, Destination, IkLimiter, ModelData, MorphBlender, PhysicsPhase, Transform,
};
use glam::{Quat, Vec3};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Bone {
    data_index: usize,
    parent: Option<usize>,

    /// Pose input, composed before the morph and IK terms.
    pub local_orientation: Quat,
    pub local_translation: Vec3,

    /// Written by [`MorphBlender::apply`] every frame.
    pub morph_orientation: Quat,
    pub morph_translation: Vec3,

    /// Accumulated IK rotation; reset at the start of every frame.
    pub joint_orientation: Quat,

    pub ik_enabled: bool,

    pub(super) inherent_orientation: Quat,
    pub(super) inherent_translation: Vec3,
    pub(super) local: Transform,
    pub(super) world: Transform,
}

impl Bone {
    fn new(data_index: usize, parent: Option<usize>) -> Self {
        Self {
            data_index,
            parent,
            local_orientation: Quat::IDENTITY,
            local_translation: Vec3::ZERO,
            morph_orientation: Quat::IDENTITY,
            morph_translation: Vec3::ZERO,
            joint_orientation: Quat::IDENTITY,
            ik_enabled: true,
            inherent_orientation: Quat::IDENTITY,
            inherent_translation: Vec3::ZERO,
            local: Transform::IDENTITY,
            world: Transform::IDENTITY,
        }
    }

    pub fn data_index(&self) -> usize {
        self.data_index
    }

    pub fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    /// Transform relative to the parent bone, as of the last update.
    pub fn local_transform(&self) -> Transform {
        self.local
    }

    pub fn world_transform(&self) -> Transform {
        self.world
    }

    pub fn world_origin(&self) -> Vec3 {
        self.world.translation
    }

    /// Rotation this bone passes on to bones inheriting from it.
    pub fn inherent_orientation(&self) -> Quat {
        self.inherent_orientation
    }

    pub fn inherent_translation(&self) -> Vec3 {
        self.inherent_translation
    }

    fn reset_pose(&mut self) {
        self.local_orientation = Quat::IDENTITY;
        self.local_translation = Vec3::ZERO;
        self.morph_orientation = Quat::IDENTITY;
        self.morph_translation = Vec3::ZERO;
        self.joint_orientation = Quat::IDENTITY;
    }
}

/// External simulation consulted between the two bone passes of a frame.
pub trait PhysicsStep {
    /// Receives the world transform of every bone after the before-physics pass and returns
    /// world transforms to impose, keyed by bone index.
    fn step(&mut self, world: &[Transform]) -> Vec<(usize, Transform)>;
}

/// A physics step that never moves anything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoPhysics;

impl PhysicsStep for NoPhysics {
    fn step(&mut self, _world: &[Transform]) -> Vec<(usize, Transform)> {
        Vec::new()
    }
}

/// Per-instance pose state for a loaded model.
///
/// Models that were never resolved (built in code or decoded through serde) get their bone graph
/// built here without validation; call [`ModelData::resolve`] first to reject bad references.
#[derive(Clone, Debug)]
pub struct Skeleton {
    pub data: Arc<ModelData>,
    pub bones: Vec<Bone>,
    pub morphs: MorphBlender,
    pub ik_limiter: IkLimiter,
    chain_scratch: Vec<usize>,
}

impl Skeleton {
    pub fn new(data: Arc<ModelData>) -> Self {
        let data = if data.graph().len() == data.bones.len() {
            data
        } else {
            tracing::debug!(
                bones = data.bones.len(),
                "building bone graph for an unresolved model"
            );
            let mut owned = ModelData::clone(&data);
            owned.graph = BoneGraph::build(&owned.bones);
            Arc::new(owned)
        };
        let bones = data
            .bones
            .iter()
            .enumerate()
            .map(|(data_index, bone)| Bone::new(data_index, bone.parent))
            .collect();
        let morphs = MorphBlender::new(&data);
        let mut skeleton = Self {
            data,
            bones,
            morphs,
            ik_limiter: IkLimiter::default(),
            chain_scratch: Vec::new(),
        };
        skeleton.update_world_transform();
        skeleton
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.data.bone_index(name)
    }

    pub fn morph_index(&self, name: &str) -> Option<usize> {
        self.data.morph_index(name)
    }

    /// Clears pose input, IK results and morph weights.
    pub fn set_to_rest_pose(&mut self) {
        for bone in &mut self.bones {
            bone.reset_pose();
        }
        self.morphs.reset_weights();
    }

    /// World position of the bone's tail: the destination bone's origin, or the bone's own origin
    /// displaced by its offset.
    pub fn destination_origin(&self, bone: usize) -> Option<Vec3> {
        let data = self.data.bones.get(bone)?;
        let world = self.bones.get(bone)?.world;
        match data.destination {
            Destination::Bone(Some(target)) => self.bones.get(target).map(Bone::world_origin),
            Destination::Bone(None) => Some(world.translation),
            Destination::Offset(offset) => Some(world.transform_point(offset)),
        }
    }

    /// World transform relative to the rest pose, suitable for linear blend skinning.
    pub fn skinning_transform(&self, bone: usize) -> Option<Transform> {
        let origin = self.data.bones.get(bone)?.origin;
        let world = self.bones.get(bone)?.world;
        Some(world * Transform::from_translation(-origin))
    }

    pub fn update_world_transform(&mut self) {
        self.update_world_transform_with_physics(&mut NoPhysics);
    }

    pub fn update_world_transform_with_physics<P: PhysicsStep + ?Sized>(&mut self, physics: &mut P) {
        for bone in &mut self.bones {
            bone.joint_orientation = Quat::IDENTITY;
        }

        let data = Arc::clone(&self.data);
        self.morphs.apply(&data, &mut self.bones);

        self.update_phase(&data, PhysicsPhase::Before);

        let world = self.bones.iter().map(Bone::world_transform).collect::<Vec<_>>();
        for (index, transform) in physics.step(&world) {
            match self.bones.get_mut(index) {
                Some(bone) => bone.world = transform,
                None => tracing::debug!(
                    bone = index,
                    count = world.len(),
                    "ignoring physics override for unknown bone"
                ),
            }
        }

        self.update_phase(&data, PhysicsPhase::After);
    }

    fn update_phase(&mut self, data: &ModelData, phase: PhysicsPhase) {
        let graph = data.graph();
        let order = graph.order(phase);
        self.transform_bones(data, order);
        for &ik_bone in graph.ik_bones(phase) {
            if !self.bones.get(ik_bone).is_some_and(|bone| bone.ik_enabled) {
                continue;
            }
            self.solve_ik(data, ik_bone);
            self.transform_bones(data, order);
        }
    }

    fn transform_bones(&mut self, data: &ModelData, order: &[usize]) {
        for &index in order {
            self.perform_transform(data, index);
        }
    }

    /// Recomputes one bone's local and world transform from its pose inputs, its inherent
    /// source and its parent's current world transform.
    pub(super) fn perform_transform(&mut self, data: &ModelData, index: usize) {
        let (Some(bone_data), Some(bone)) = (data.bones.get(index), self.bones.get(index)) else {
            return;
        };
        let source = bone_data
            .inherent_source()
            .and_then(|source| Some((self.bones.get(source)?, data.bones.get(source)?)));
        let coefficient = bone_data.inherent_coefficient();
        let own_orientation = bone.local_orientation * bone.morph_orientation;

        let mut orientation = Quat::IDENTITY;
        let mut inherent_orientation = Quat::IDENTITY;
        if let (true, Some((source, source_data))) = (bone_data.has_inherent_rotation(), source) {
            let mut contribution = if source_data.has_inherent_rotation() {
                source.inherent_orientation
            } else {
                source.local_orientation * source.morph_orientation
            };
            if coefficient != 1.0 {
                contribution = Quat::IDENTITY.slerp(contribution, coefficient);
            }
            contribution *= source.joint_orientation;
            inherent_orientation = (contribution * own_orientation).normalize();
            orientation = contribution;
        }
        orientation = (orientation * own_orientation * bone.joint_orientation).normalize();

        let mut translation = bone.local_translation + bone.morph_translation;
        let mut inherent_translation = Vec3::ZERO;
        if let (true, Some((source, source_data))) = (bone_data.has_inherent_translation(), source)
        {
            let contribution = if source_data.has_inherent_translation() {
                source.inherent_translation
            } else {
                source.local_translation + source.morph_translation
            };
            inherent_translation = contribution * coefficient;
            translation += inherent_translation;
        }

        let local = Transform::new(
            orientation,
            data.graph().offset_from_parent(index) + translation,
        );
        let world = match bone.parent.and_then(|parent| self.bones.get(parent)) {
            Some(parent) => parent.world * local,
            None => local,
        };

        let bone = &mut self.bones[index];
        bone.inherent_orientation = inherent_orientation;
        bone.inherent_translation = inherent_translation;
        bone.local = local;
        bone.world = world;
    }

    /// Recomputes world transforms from `joint` down the parent path to `effector`.
    pub(super) fn update_chain(&mut self, data: &ModelData, joint: usize, effector: usize) {
        let mut path = std::mem::take(&mut self.chain_scratch);
        path.clear();
        let mut reached = false;
        let mut current = Some(effector);
        while let Some(index) = current {
            if index == joint {
                reached = true;
                break;
            }
            if path.len() > self.bones.len() {
                break;
            }
            path.push(index);
            current = self.bones.get(index).and_then(Bone::parent_index);
        }

        self.perform_transform(data, joint);
        if reached {
            for &index in path.iter().rev() {
                self.perform_transform(data, index);
            }
        }
        self.chain_scratch = path;
    }
}
