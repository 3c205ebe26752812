use super::Record;
use crate::{
    BinaryInput, BinaryOutput, DataInfo, Defect, JointData, RigidBodyData, RigidBodyMode,
    RigidBodyShape, text_size,
};
use glam::Vec3;

// group + mask + shape + size/position/rotation + five scalars + mode
const RIGID_BODY_FIXED_SIZE: usize = 1 + 2 + 1 + 36 + 20 + 1;
const JOINT_VECTORS: usize = 8;

fn shape(value: u8) -> Result<RigidBodyShape, Defect> {
    match value {
        0 => Ok(RigidBodyShape::Sphere),
        1 => Ok(RigidBodyShape::Box),
        2 => Ok(RigidBodyShape::Capsule),
        _ => Err(Defect::UnknownShape { value }),
    }
}

fn shape_value(shape: RigidBodyShape) -> u8 {
    match shape {
        RigidBodyShape::Sphere => 0,
        RigidBodyShape::Box => 1,
        RigidBodyShape::Capsule => 2,
    }
}

fn mode(value: u8) -> Result<RigidBodyMode, Defect> {
    match value {
        0 => Ok(RigidBodyMode::Static),
        1 => Ok(RigidBodyMode::Dynamic),
        2 => Ok(RigidBodyMode::Aligned),
        _ => Err(Defect::UnknownRigidBodyMode { value }),
    }
}

fn mode_value(mode: RigidBodyMode) -> u8 {
    match mode {
        RigidBodyMode::Static => 0,
        RigidBodyMode::Dynamic => 1,
        RigidBodyMode::Aligned => 2,
    }
}

impl Record for RigidBodyData {
    fn read(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Self, Defect> {
        let name = input.read_text(info.encoding)?;
        let english_name = input.read_text(info.encoding)?;
        let bone = input.read_ref(info.bone_index)?;
        let group = input.read_fixed()?;
        let collision_mask = input.read_fixed()?;
        let shape = shape(input.read_fixed()?)?;
        let size = input.read_fixed()?;
        let position = input.read_fixed()?;
        let rotation = input.read_fixed()?;
        let mass = input.read_fixed()?;
        let linear_damping = input.read_fixed()?;
        let angular_damping = input.read_fixed()?;
        let restitution = input.read_fixed()?;
        let friction = input.read_fixed()?;
        let mode = mode(input.read_fixed()?)?;
        Ok(Self {
            name,
            english_name,
            bone,
            group,
            collision_mask,
            shape,
            size,
            position,
            rotation,
            mass,
            linear_damping,
            angular_damping,
            restitution,
            friction,
            mode,
        })
    }

    fn write(&self, output: &mut BinaryOutput, info: &DataInfo) -> Result<(), Defect> {
        output.write_text(&self.name, info.encoding)?;
        output.write_text(&self.english_name, info.encoding)?;
        output.write_ref(self.bone, info.bone_index)?;
        output.write_fixed(self.group);
        output.write_fixed(self.collision_mask);
        output.write_fixed(shape_value(self.shape));
        output.write_fixed(self.size);
        output.write_fixed(self.position);
        output.write_fixed(self.rotation);
        output.write_fixed(self.mass);
        output.write_fixed(self.linear_damping);
        output.write_fixed(self.angular_damping);
        output.write_fixed(self.restitution);
        output.write_fixed(self.friction);
        output.write_fixed(mode_value(self.mode));
        Ok(())
    }

    fn estimate_size(&self, info: &DataInfo) -> usize {
        text_size(&self.name, info.encoding)
            + text_size(&self.english_name, info.encoding)
            + info.bone_index.bytes()
            + RIGID_BODY_FIXED_SIZE
    }

    fn skip(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<(), Defect> {
        input.skip_text()?;
        input.skip_text()?;
        input.skip(info.bone_index.bytes() + RIGID_BODY_FIXED_SIZE)
    }
}

impl Record for JointData {
    fn read(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Self, Defect> {
        let name = input.read_text(info.encoding)?;
        let english_name = input.read_text(info.encoding)?;
        let kind = input.read_fixed()?;
        let rigid_bodies = [
            input.read_ref(info.rigid_body_index)?,
            input.read_ref(info.rigid_body_index)?,
        ];
        let mut vectors = [Vec3::ZERO; JOINT_VECTORS];
        for vector in &mut vectors {
            *vector = input.read_fixed()?;
        }
        let [
            position,
            rotation,
            position_lower,
            position_upper,
            rotation_lower,
            rotation_upper,
            position_stiffness,
            rotation_stiffness,
        ] = vectors;
        Ok(Self {
            name,
            english_name,
            kind,
            rigid_bodies,
            position,
            rotation,
            position_lower,
            position_upper,
            rotation_lower,
            rotation_upper,
            position_stiffness,
            rotation_stiffness,
        })
    }

    fn write(&self, output: &mut BinaryOutput, info: &DataInfo) -> Result<(), Defect> {
        output.write_text(&self.name, info.encoding)?;
        output.write_text(&self.english_name, info.encoding)?;
        output.write_fixed(self.kind);
        for body in self.rigid_bodies {
            output.write_ref(body, info.rigid_body_index)?;
        }
        for vector in [
            self.position,
            self.rotation,
            self.position_lower,
            self.position_upper,
            self.rotation_lower,
            self.rotation_upper,
            self.position_stiffness,
            self.rotation_stiffness,
        ] {
            output.write_fixed(vector);
        }
        Ok(())
    }

    fn estimate_size(&self, info: &DataInfo) -> usize {
        text_size(&self.name, info.encoding)
            + text_size(&self.english_name, info.encoding)
            + 1
            + 2 * info.rigid_body_index.bytes()
            + 12 * JOINT_VECTORS
    }

    fn skip(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<(), Defect> {
        input.skip_text()?;
        input.skip_text()?;
        input.skip(1 + 2 * info.rigid_body_index.bytes() + 12 * JOINT_VECTORS)
    }
}
