use super::Record;
use crate::{
    AngleLimit, BinaryInput, BinaryOutput, BoneData, BoneFlags, CoordinateSystem, DataInfo,
    Defect, Destination, IkData, IkJointData, Inherent, LocalAxes, text_size,
};
use glam::Vec3;

fn to_loaded(limit: AngleLimit, info: &DataInfo) -> AngleLimit {
    match info.coordinate_system {
        CoordinateSystem::DirectX => limit,
        CoordinateSystem::OpenGl => limit.mirrored(),
    }
}

// The mirror is an involution, so writing applies the same mapping as loading.
fn to_stored(limit: AngleLimit, info: &DataInfo) -> AngleLimit {
    to_loaded(limit, info)
}

impl Record for BoneData {
    fn read(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Self, Defect> {
        let width = info.bone_index;
        let name = input.read_text(info.encoding)?;
        let english_name = input.read_text(info.encoding)?;
        let origin = input.read_fixed::<Vec3>()?;
        let parent = input.read_ref(width)?;
        let layer = input.read_fixed::<i32>()?;
        let flags = BoneFlags::from_bits_retain(input.read_fixed::<u16>()?);

        let destination = if flags.contains(BoneFlags::HAS_DESTINATION_BONE) {
            Destination::Bone(input.read_ref(width)?)
        } else {
            Destination::Offset(input.read_fixed()?)
        };
        let inherent =
            if flags.intersects(BoneFlags::INHERENT_ROTATION | BoneFlags::INHERENT_TRANSLATION) {
                Some(Inherent {
                    source: input.read_ref(width)?,
                    coefficient: input.read_fixed()?,
                })
            } else {
                None
            };
        let fixed_axis = if flags.contains(BoneFlags::FIXED_AXIS) {
            Some(input.read_fixed()?)
        } else {
            None
        };
        let local_axes = if flags.contains(BoneFlags::LOCAL_AXES) {
            Some(LocalAxes {
                x: input.read_fixed()?,
                z: input.read_fixed()?,
            })
        } else {
            None
        };
        let external_parent = if flags.contains(BoneFlags::EXTERNAL_PARENT) {
            Some(input.read_fixed()?)
        } else {
            None
        };
        let ik = if flags.contains(BoneFlags::HAS_IK) {
            Some(read_ik(input, info)?)
        } else {
            None
        };

        Ok(Self {
            name,
            english_name,
            origin,
            parent,
            layer,
            flags,
            destination,
            inherent,
            fixed_axis,
            local_axes,
            external_parent,
            ik,
        })
    }

    fn write(&self, output: &mut BinaryOutput, info: &DataInfo) -> Result<(), Defect> {
        let width = info.bone_index;
        let flags = self.layout_flags();
        output.write_text(&self.name, info.encoding)?;
        output.write_text(&self.english_name, info.encoding)?;
        output.write_fixed(self.origin);
        output.write_ref(self.parent, width)?;
        output.write_fixed(self.layer);
        output.write_fixed(flags.bits());

        match self.destination {
            Destination::Bone(bone) => output.write_ref(bone, width)?,
            Destination::Offset(offset) => output.write_fixed(offset),
        }
        if let Some(inherent) = self.inherent {
            if flags.intersects(BoneFlags::INHERENT_ROTATION | BoneFlags::INHERENT_TRANSLATION) {
                output.write_ref(inherent.source, width)?;
                output.write_fixed(inherent.coefficient);
            }
        }
        if let Some(axis) = self.fixed_axis {
            output.write_fixed(axis);
        }
        if let Some(axes) = self.local_axes {
            output.write_fixed(axes.x);
            output.write_fixed(axes.z);
        }
        if let Some(key) = self.external_parent {
            output.write_fixed(key);
        }
        if let Some(ik) = &self.ik {
            write_ik(output, info, ik)?;
        }
        Ok(())
    }

    fn estimate_size(&self, info: &DataInfo) -> usize {
        let bone = info.bone_index.bytes();
        let flags = self.layout_flags();
        let mut size = text_size(&self.name, info.encoding)
            + text_size(&self.english_name, info.encoding)
            + 12
            + bone
            + 4
            + 2;
        size += match self.destination {
            Destination::Bone(_) => bone,
            Destination::Offset(_) => 12,
        };
        if flags.intersects(BoneFlags::INHERENT_ROTATION | BoneFlags::INHERENT_TRANSLATION) {
            size += bone + 4;
        }
        if self.fixed_axis.is_some() {
            size += 12;
        }
        if self.local_axes.is_some() {
            size += 24;
        }
        if self.external_parent.is_some() {
            size += 4;
        }
        if let Some(ik) = &self.ik {
            size += bone + 4 + 4 + 4;
            for joint in &ik.joints {
                size += bone + 1;
                if joint.limit.is_some() {
                    size += 24;
                }
            }
        }
        size
    }

    fn skip(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<(), Defect> {
        let bone = info.bone_index.bytes();
        input.skip_text()?;
        input.skip_text()?;
        input.skip(12 + bone + 4)?;
        let flags = BoneFlags::from_bits_retain(input.read_fixed::<u16>()?);
        if flags.contains(BoneFlags::HAS_DESTINATION_BONE) {
            input.skip(bone)?;
        } else {
            input.skip(12)?;
        }
        if flags.intersects(BoneFlags::INHERENT_ROTATION | BoneFlags::INHERENT_TRANSLATION) {
            input.skip(bone + 4)?;
        }
        if flags.contains(BoneFlags::FIXED_AXIS) {
            input.skip(12)?;
        }
        if flags.contains(BoneFlags::LOCAL_AXES) {
            input.skip(24)?;
        }
        if flags.contains(BoneFlags::EXTERNAL_PARENT) {
            input.skip(4)?;
        }
        if flags.contains(BoneFlags::HAS_IK) {
            input.skip(bone + 4 + 4)?;
            let joints = input.read_count()?;
            for _ in 0..joints {
                input.skip(bone)?;
                if input.read_bool()? {
                    input.skip(24)?;
                }
            }
        }
        Ok(())
    }
}

fn read_ik(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<IkData, Defect> {
    let width = info.bone_index;
    let effector = input.read_ref(width)?;
    let iterations = input.read_fixed::<i32>()?;
    let angle_limit = input.read_fixed::<f32>()?;
    let count = input.read_count()?;
    let mut joints = Vec::with_capacity(count.min(input.remaining()));
    for _ in 0..count {
        let bone = input.read_ref(width)?;
        let limit = if input.read_bool()? {
            let stored = AngleLimit {
                lower: input.read_fixed()?,
                upper: input.read_fixed()?,
            };
            Some(to_loaded(stored, info))
        } else {
            None
        };
        joints.push(IkJointData { bone, limit });
    }
    Ok(IkData {
        effector,
        iterations,
        angle_limit,
        joints,
    })
}

fn write_ik(output: &mut BinaryOutput, info: &DataInfo, ik: &IkData) -> Result<(), Defect> {
    let width = info.bone_index;
    output.write_ref(ik.effector, width)?;
    output.write_fixed(ik.iterations);
    output.write_fixed(ik.angle_limit);
    output.write_count(ik.joints.len())?;
    for joint in &ik.joints {
        output.write_ref(joint.bone, width)?;
        match joint.limit {
            Some(limit) => {
                let stored = to_stored(limit, info);
                output.write_bool(true);
                output.write_fixed(stored.lower);
                output.write_fixed(stored.upper);
            }
            None => output.write_bool(false),
        }
    }
    Ok(())
}
