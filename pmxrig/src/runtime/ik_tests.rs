use crate::test_fixtures::{bone, model_with_bones, resolved};
use crate::{
    AngleLimit, EulerLimiter, IkData, IkJointData, IkLimiter, JointLimiter, JointStep, Skeleton,
    SwingLimiter, clamp_angle,
};
use glam::{EulerRot, Quat, Vec3};

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn assert_vec3_approx(actual: Vec3, expected: Vec3) {
    assert!(
        actual.abs_diff_eq(expected, 1.0e-4),
        "expected {expected}, got {actual}"
    );
}

/// Joint at the origin, effector one unit up, IK target one unit along +X.
fn single_joint(iterations: i32, angle_limit: f32, limit: Option<AngleLimit>) -> Skeleton {
    let mut ik = bone("ik", Vec3::X, None);
    ik.ik = Some(IkData {
        effector: Some(1),
        iterations,
        angle_limit,
        joints: vec![IkJointData {
            bone: Some(0),
            limit,
        }],
    });
    Skeleton::new(resolved(model_with_bones(vec![
        bone("joint", Vec3::ZERO, None),
        bone("effector", Vec3::Y, Some(0)),
        ik,
    ])))
}

fn swing_step(axis: Vec3, angle: f32, limit: AngleLimit, reflect: bool) -> JointStep {
    JointStep {
        current: Quat::IDENTITY,
        axis,
        angle,
        limit,
        iteration: 0,
        reflect,
    }
}

#[test]
fn single_joint_chain_converges() {
    let skeleton = single_joint(20, 2.0, None);
    assert_vec3_approx(skeleton.bones[1].world_origin(), Vec3::X);
    assert_vec3_approx(skeleton.bones[0].world_origin(), Vec3::ZERO);
    let expected = Quat::from_rotation_z(-std::f32::consts::FRAC_PI_2);
    assert!(
        skeleton.bones[0].joint_orientation.abs_diff_eq(expected, 1.0e-4),
        "{}",
        skeleton.bones[0].joint_orientation
    );
    // The solver leaves the pose input alone.
    assert_eq!(skeleton.bones[0].local_orientation, Quat::IDENTITY);
    assert_eq!(skeleton.bones[1].local_orientation, Quat::IDENTITY);
}

#[test]
fn angle_limit_bounds_each_step() {
    // One iteration with a 0.25 rad limit allows at most 0.5 rad on the first joint.
    let skeleton = single_joint(1, 0.25, None);
    let (axis, angle) = skeleton.bones[0].joint_orientation.to_axis_angle();
    assert_approx(angle, 0.5);
    assert_vec3_approx(axis, Vec3::NEG_Z);
}

#[test]
fn disabled_ik_leaves_the_chain_at_rest() {
    let mut skeleton = single_joint(20, 2.0, None);
    skeleton.bones[2].ik_enabled = false;
    skeleton.update_world_transform();
    assert_vec3_approx(skeleton.bones[1].world_origin(), Vec3::Y);
    assert_eq!(skeleton.bones[0].joint_orientation, Quat::IDENTITY);
}

#[test]
fn joint_orientation_is_recomputed_every_frame() {
    let mut skeleton = single_joint(20, 2.0, None);
    let first = skeleton.bones[0].joint_orientation;
    skeleton.update_world_transform();
    assert!(skeleton.bones[0].joint_orientation.abs_diff_eq(first, 1.0e-5));
    assert_vec3_approx(skeleton.bones[1].world_origin(), Vec3::X);
}

#[test]
fn aligned_chain_is_left_untouched() {
    let mut ik = bone("ik", Vec3::new(0.0, 2.0, 0.0), None);
    ik.ik = Some(IkData {
        effector: Some(1),
        iterations: 10,
        angle_limit: 1.0,
        joints: vec![IkJointData {
            bone: Some(0),
            limit: None,
        }],
    });
    let skeleton = Skeleton::new(resolved(model_with_bones(vec![
        bone("joint", Vec3::ZERO, None),
        bone("effector", Vec3::Y, Some(0)),
        ik,
    ])));
    assert_eq!(skeleton.bones[0].joint_orientation, Quat::IDENTITY);
    assert_vec3_approx(skeleton.bones[1].world_origin(), Vec3::Y);
}

#[test]
fn clamp_angle_reflects_only_inside_the_range() {
    assert_approx(clamp_angle(0.3, -0.5, 0.5, true), 0.3);
    assert_approx(clamp_angle(0.7, -0.5, 0.5, true), 0.3);
    assert_approx(clamp_angle(0.7, -0.5, 0.5, false), 0.5);
    assert_approx(clamp_angle(-0.6, -0.5, 0.5, true), -0.4);
    assert_approx(clamp_angle(2.0, -0.5, 0.5, true), 0.5);
    assert_approx(clamp_angle(-2.0, -0.5, 0.5, true), -0.5);
}

#[test]
fn swing_limiter_keeps_rotation_within_limits() {
    let limit = AngleLimit {
        lower: Vec3::new(-0.5, 0.0, 0.0),
        upper: Vec3::new(0.5, 0.0, 0.0),
    };
    let axis = Vec3::new(0.9, 0.3, -0.3).normalize();

    let clamped = SwingLimiter.constrain(&swing_step(axis, 1.2, limit, false));
    let (y, x, z) = clamped.to_euler(EulerRot::YXZ);
    assert_approx(x, 0.5);
    assert_approx(y, 0.0);
    assert_approx(z, 0.0);

    let reflected = SwingLimiter.constrain(&swing_step(axis, 0.7, limit, true));
    let (_, x, _) = reflected.to_euler(EulerRot::YXZ);
    assert_approx(x, 0.3);

    let within = SwingLimiter.constrain(&swing_step(-axis, 0.2, limit, true));
    let (_, x, _) = within.to_euler(EulerRot::YXZ);
    assert_approx(x, -0.2);
}

#[test]
fn swing_limiter_switches_decomposition_for_wide_x_limits() {
    let limit = AngleLimit {
        lower: Vec3::new(-3.0, 0.0, 0.0),
        upper: Vec3::new(3.0, 0.0, 0.0),
    };
    let rotated = SwingLimiter.constrain(&swing_step(Vec3::X, 1.0, limit, true));
    assert!(rotated.abs_diff_eq(Quat::from_rotation_x(1.0), 1.0e-4), "{rotated}");
}

#[test]
fn fully_locked_joint_does_not_move() {
    let limit = AngleLimit {
        lower: Vec3::ZERO,
        upper: Vec3::ZERO,
    };
    let current = Quat::from_rotation_y(0.2);
    let step = JointStep {
        current,
        ..swing_step(Vec3::X, 1.0, limit, true)
    };
    assert_eq!(SwingLimiter.constrain(&step), current);
    assert_eq!(EulerLimiter.constrain(&step), current);
}

#[test]
fn euler_limiter_clamps_the_accumulated_angle() {
    let limit = AngleLimit {
        lower: Vec3::new(-0.5, 0.0, 0.0),
        upper: Vec3::new(0.5, 0.0, 0.0),
    };
    let step = JointStep {
        current: Quat::from_rotation_x(0.3),
        axis: Vec3::X,
        angle: 0.6,
        limit,
        iteration: 1,
        reflect: true,
    };
    let rotated = EulerLimiter.constrain(&step);
    let (z, y, x) = rotated.to_euler(EulerRot::ZYX);
    assert_approx(x, 0.5);
    assert_approx(y, 0.0);
    assert_approx(z, 0.0);

    let below = EulerLimiter.constrain(&JointStep {
        axis: Vec3::NEG_X,
        angle: 1.0,
        ..step
    });
    let (_, _, x) = below.to_euler(EulerRot::ZYX);
    assert_approx(x, -0.5);
}

#[test]
fn euler_limiter_projects_onto_the_permitted_axis_first() {
    let limit = AngleLimit {
        lower: Vec3::new(0.0, 0.0, -1.0),
        upper: Vec3::new(0.0, 0.0, 1.0),
    };
    let rotated = EulerLimiter.constrain(&swing_step(Vec3::new(0.6, 0.0, -0.8), 0.4, limit, true));
    assert!(rotated.abs_diff_eq(Quat::from_rotation_z(0.4), 1.0e-5), "{rotated}");
}

#[test]
fn limited_joint_is_constrained_while_solving() {
    let limit = AngleLimit {
        lower: Vec3::new(0.0, 0.0, -0.5),
        upper: Vec3::new(0.0, 0.0, 0.0),
    };
    // Two iterations: only the first applies the limit, and with a per-step bound of 0.2 rad the
    // second cannot escape it by more than that.
    for limiter in [IkLimiter::Swing, IkLimiter::Euler] {
        let mut skeleton = single_joint(2, 0.1, Some(limit));
        skeleton.ik_limiter = limiter;
        skeleton.update_world_transform();
        let (z, y, x) = skeleton.bones[0].joint_orientation.to_euler(EulerRot::ZYX);
        assert_approx(x, 0.0);
        assert_approx(y, 0.0);
        assert!(z < 0.0 && z >= -0.5 - 0.2 - 1.0e-4, "{limiter:?}: z = {z}");
    }
}

#[test]
fn multi_axis_limits_keep_the_step_axis() {
    let axis = Vec3::new(1.0, 0.0, 1.0).normalize();
    let free = Quat::from_axis_angle(axis, 0.2);
    let open = AngleLimit {
        lower: Vec3::splat(-1.0),
        upper: Vec3::splat(1.0),
    };
    let step = swing_step(axis, 0.2, open, true);
    let swing = SwingLimiter.constrain(&step);
    assert!(swing.abs_diff_eq(free, 1.0e-5), "{swing}");
    let euler = EulerLimiter.constrain(&step);
    assert!(euler.abs_diff_eq(free, 1.0e-5), "{euler}");

    // y locked: the step still rotates about both x and z.
    let two_axes = AngleLimit {
        lower: Vec3::new(-1.0, 0.0, -1.0),
        upper: Vec3::new(1.0, 0.0, 1.0),
    };
    let step = swing_step(axis, 0.2, two_axes, true);
    for rotated in [SwingLimiter.constrain(&step), EulerLimiter.constrain(&step)] {
        let (z, y, x) = rotated.to_euler(EulerRot::ZYX);
        let expected = 0.2 / std::f32::consts::SQRT_2;
        assert!((x - expected).abs() < 2.0e-2, "x = {x}");
        assert!((z - expected).abs() < 2.0e-2, "z = {z}");
        assert!(y.abs() < 2.0e-2, "y = {y}");
    }
}

#[test]
fn effector_listed_in_its_own_chain_is_never_rotated() {
    let mut ik = bone("ik", Vec3::X, None);
    ik.ik = Some(IkData {
        effector: Some(1),
        iterations: 20,
        angle_limit: 2.0,
        joints: vec![
            IkJointData {
                bone: Some(1),
                limit: None,
            },
            IkJointData {
                bone: Some(0),
                limit: None,
            },
        ],
    });
    let skeleton = Skeleton::new(resolved(model_with_bones(vec![
        bone("joint", Vec3::ZERO, None),
        bone("effector", Vec3::Y, Some(0)),
        ik,
    ])));
    assert_eq!(skeleton.bones[1].joint_orientation, Quat::IDENTITY);
    assert_eq!(skeleton.bones[1].local_orientation, Quat::IDENTITY);
    assert_vec3_approx(skeleton.bones[1].world_origin(), Vec3::X);
}

#[test]
fn target_opposite_the_effector_leaves_the_joint_at_rest() {
    let mut ik = bone("ik", Vec3::NEG_Y, None);
    ik.ik = Some(IkData {
        effector: Some(1),
        iterations: 20,
        angle_limit: 2.0,
        joints: vec![IkJointData {
            bone: Some(0),
            limit: None,
        }],
    });
    let skeleton = Skeleton::new(resolved(model_with_bones(vec![
        bone("joint", Vec3::ZERO, None),
        bone("effector", Vec3::Y, Some(0)),
        ik,
    ])));
    assert_eq!(skeleton.bones[0].joint_orientation, Quat::IDENTITY);
    assert_vec3_approx(skeleton.bones[1].world_origin(), Vec3::Y);
}
