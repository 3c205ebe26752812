//! Iterative IK with per-joint angle limits.
//!
//! Each IK bone rotates its joints, one at a time and for a fixed number of iterations, so that
//! the effector bone approaches the IK bone's own world origin. Joint rotations accumulate in
//! [`Bone::joint_orientation`](crate::Bone) and never touch the pose input.

use crate::{AngleLimit, ModelData, Skeleton};
use glam::{EulerRot, Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

const DEGENERATE_EPSILON: f32 = 1.0e-6;
const MIDDLE_ANGLE_LIMIT: f32 = 88.0 * std::f32::consts::PI / 180.0;

/// One limited joint rotation proposed by the solver.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JointStep {
    /// Joint orientation before this step.
    pub current: Quat,
    /// Unit rotation axis in the joint's local frame.
    pub axis: Vec3,
    pub angle: f32,
    pub limit: AngleLimit,
    pub iteration: usize,
    /// Reflect off the limits instead of sticking to them.
    pub reflect: bool,
}

pub trait JointLimiter {
    /// Returns the joint orientation after applying `step` within its limits.
    fn constrain(&self, step: &JointStep) -> Quat;
}

/// Decomposes the rotated joint into Euler angles in an order chosen from the limits and clamps
/// each angle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SwingLimiter;

/// Clamps the sum of the step's and the joint's ZYX Euler angles. On the first iteration a
/// joint with a single permitted axis first has the step axis replaced by that axis, positive.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EulerLimiter;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum IkLimiter {
    #[default]
    Swing,
    Euler,
}

impl IkLimiter {
    pub fn limiter(self) -> &'static dyn JointLimiter {
        match self {
            Self::Swing => &SwingLimiter,
            Self::Euler => &EulerLimiter,
        }
    }
}

/// Snaps `axis` onto the joint's single permitted axis. Axes of joints with two or three
/// permitted axes pass through unchanged; `None` when the joint is fully locked.
fn constrain_axis(axis: Vec3, limit: AngleLimit, keep_sign: bool) -> Option<Vec3> {
    let mut permitted = (0..3).filter(|&index| limit.permits(index));
    let first = permitted.next()?;
    if permitted.next().is_some() {
        return Some(axis);
    }
    let mut projected = Vec3::ZERO;
    projected[first] = if keep_sign && axis[first] < 0.0 { -1.0 } else { 1.0 };
    Some(projected)
}

/// Clamps `value` into `[lower, upper]`, reflecting off the violated bound when the reflection
/// stays inside.
pub fn clamp_angle(value: f32, lower: f32, upper: f32, reflect: bool) -> f32 {
    if value < lower {
        let reflected = 2.0 * lower - value;
        if reflect && reflected <= upper {
            reflected
        } else {
            lower
        }
    } else if value > upper {
        let reflected = 2.0 * upper - value;
        if reflect && reflected >= lower {
            reflected
        } else {
            upper
        }
    } else {
        value
    }
}

impl JointLimiter for SwingLimiter {
    fn constrain(&self, step: &JointStep) -> Quat {
        let Some(axis) = constrain_axis(step.axis, step.limit, true) else {
            return step.current;
        };
        let rotated = (step.current * Quat::from_axis_angle(axis, step.angle)).normalize();
        let AngleLimit { lower, upper } = step.limit;
        let clamp =
            |value: f32, axis: usize| clamp_angle(value, lower[axis], upper[axis], step.reflect);
        let middle = |value: f32| value.clamp(-MIDDLE_ANGLE_LIMIT, MIDDLE_ANGLE_LIMIT);

        let constrained = if lower.x > -FRAC_PI_2 && upper.x < FRAC_PI_2 {
            let (y, x, z) = rotated.to_euler(EulerRot::YXZ);
            Quat::from_euler(EulerRot::YXZ, clamp(y, 1), clamp(middle(x), 0), clamp(z, 2))
        } else if lower.y > -FRAC_PI_2 && upper.y < FRAC_PI_2 {
            let (z, y, x) = rotated.to_euler(EulerRot::ZYX);
            Quat::from_euler(EulerRot::ZYX, clamp(z, 2), clamp(middle(y), 1), clamp(x, 0))
        } else {
            let (x, z, y) = rotated.to_euler(EulerRot::XZY);
            Quat::from_euler(EulerRot::XZY, clamp(x, 0), clamp(middle(z), 2), clamp(y, 1))
        };
        constrained.normalize()
    }
}

impl JointLimiter for EulerLimiter {
    fn constrain(&self, step: &JointStep) -> Quat {
        let limit = step.limit;
        let axis = if step.iteration == 0 {
            match constrain_axis(step.axis, limit, false) {
                Some(axis) => axis,
                None => return step.current,
            }
        } else {
            step.axis
        };

        let (z1, y1, x1) = Quat::from_axis_angle(axis, step.angle).to_euler(EulerRot::ZYX);
        let (z2, y2, x2) = step.current.to_euler(EulerRot::ZYX);
        let delta = |axis: usize, step_angle: f32, current: f32| {
            if !limit.permits(axis) {
                return 0.0;
            }
            let sum = step_angle + current;
            if sum < limit.lower[axis] {
                limit.lower[axis] - current
            } else if sum > limit.upper[axis] {
                limit.upper[axis] - current
            } else {
                step_angle
            }
        };
        let rotation = Quat::from_euler(
            EulerRot::ZYX,
            delta(2, z1, z2),
            delta(1, y1, y2),
            delta(0, x1, x2),
        );
        (step.current * rotation).normalize()
    }
}

impl Skeleton {
    /// Runs the IK chain rooted at `ik_bone`. Degenerate geometry skips the affected joint for
    /// that iteration.
    pub(super) fn solve_ik(&mut self, data: &ModelData, ik_bone: usize) {
        let Some(ik) = data.bones.get(ik_bone).and_then(|bone| bone.ik.as_ref()) else {
            return;
        };
        let Some(effector) = ik.effector.filter(|&effector| effector < self.bones.len()) else {
            return;
        };
        let target = self.bones[ik_bone].world.translation;
        let saved_orientation = self.bones[effector].joint_orientation;
        let limiter = self.ik_limiter.limiter();
        let iterations = usize::try_from(ik.iterations).unwrap_or(0);

        for iteration in 0..iterations {
            let perform_constraint = iteration < iterations / 2;
            for (position, joint) in ik.joints.iter().enumerate() {
                let Some(joint_index) = joint.bone.filter(|&bone| bone < self.bones.len()) else {
                    continue;
                };
                let inverse = self.bones[joint_index].world.inverse();
                let to_target = inverse.transform_point(target).try_normalize();
                let to_effector = inverse
                    .transform_point(self.bones[effector].world.translation)
                    .try_normalize();
                let (Some(to_target), Some(to_effector)) = (to_target, to_effector) else {
                    tracing::trace!(bone = ik_bone, joint = joint_index, iteration, "degenerate IK joint");
                    continue;
                };
                let cross = to_effector.cross(to_target);
                if cross.length() < DEGENERATE_EPSILON {
                    tracing::trace!(bone = ik_bone, joint = joint_index, iteration, "IK joint already aligned");
                    continue;
                }
                let axis = cross.normalize();
                let bound = (ik.angle_limit * (position as f32 + 1.0) * 2.0).abs();
                let angle = to_effector.dot(to_target).clamp(-1.0, 1.0).acos().min(bound);

                let current = self.bones[joint_index].joint_orientation;
                let next = match joint.limit {
                    Some(limit) if perform_constraint => limiter.constrain(&JointStep {
                        current,
                        axis,
                        angle,
                        limit,
                        iteration,
                        reflect: perform_constraint,
                    }),
                    _ => (current * Quat::from_axis_angle(axis, angle)).normalize(),
                };
                self.bones[joint_index].joint_orientation = next;
                self.update_chain(data, joint_index, effector);
            }
        }

        self.bones[effector].joint_orientation = saved_orientation;
        self.perform_transform(data, effector);
    }
}
