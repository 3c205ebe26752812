use super::Record;
use crate::{BinaryInput, BinaryOutput, DataInfo, Defect, Deform, VertexData};
use glam::{Vec2, Vec3, Vec4};

const DEFORM_BDEF1: u8 = 0;
const DEFORM_BDEF2: u8 = 1;
const DEFORM_BDEF4: u8 = 2;
const DEFORM_SDEF: u8 = 3;
const DEFORM_QDEF: u8 = 4;

// position + normal + texcoord
const BASE_SIZE: usize = 12 + 12 + 8;

impl Record for VertexData {
    fn read(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Self, Defect> {
        let position = input.read_fixed::<Vec3>()?;
        let normal = input.read_fixed::<Vec3>()?;
        let texcoord = input.read_fixed::<Vec2>()?;
        let mut additional_uvs = Vec::with_capacity(usize::from(info.additional_uv_count));
        for _ in 0..info.additional_uv_count {
            additional_uvs.push(input.read_fixed::<Vec4>()?);
        }
        let deform = read_deform(input, info)?;
        let edge_scale = input.read_fixed::<f32>()?;
        Ok(Self {
            position,
            normal,
            texcoord,
            additional_uvs,
            deform,
            edge_scale,
        })
    }

    fn write(&self, output: &mut BinaryOutput, info: &DataInfo) -> Result<(), Defect> {
        if self.additional_uvs.len() != usize::from(info.additional_uv_count) {
            return Err(Defect::AdditionalUvMismatch {
                expected: info.additional_uv_count,
                actual: self.additional_uvs.len(),
            });
        }
        output.write_fixed(self.position);
        output.write_fixed(self.normal);
        output.write_fixed(self.texcoord);
        for uv in &self.additional_uvs {
            output.write_fixed(*uv);
        }
        write_deform(output, info, &self.deform)?;
        output.write_fixed(self.edge_scale);
        Ok(())
    }

    fn estimate_size(&self, info: &DataInfo) -> usize {
        BASE_SIZE
            + 16 * usize::from(info.additional_uv_count)
            + deform_size(&self.deform, info)
            + 4
    }

    fn skip(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<(), Defect> {
        input.skip(BASE_SIZE + 16 * usize::from(info.additional_uv_count))?;
        let bone = info.bone_index.bytes();
        let value = input.read_fixed::<u8>()?;
        let payload = match value {
            DEFORM_BDEF1 => bone,
            DEFORM_BDEF2 => 2 * bone + 4,
            DEFORM_BDEF4 => 4 * bone + 16,
            DEFORM_SDEF => 2 * bone + 4 + 36,
            DEFORM_QDEF if info.is_v21() => 4 * bone + 16,
            _ => return Err(Defect::UnknownDeform { value }),
        };
        input.skip(payload + 4)
    }
}

fn read_deform(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Deform, Defect> {
    let width = info.bone_index;
    let value = input.read_fixed::<u8>()?;
    Ok(match value {
        DEFORM_BDEF1 => Deform::Bdef1 {
            bone: input.read_ref(width)?,
        },
        DEFORM_BDEF2 => Deform::Bdef2 {
            bones: [input.read_ref(width)?, input.read_ref(width)?],
            weight: input.read_fixed()?,
        },
        DEFORM_SDEF => Deform::Sdef {
            bones: [input.read_ref(width)?, input.read_ref(width)?],
            weight: input.read_fixed()?,
            c: input.read_fixed()?,
            r0: input.read_fixed()?,
            r1: input.read_fixed()?,
        },
        DEFORM_BDEF4 | DEFORM_QDEF if value == DEFORM_BDEF4 || info.is_v21() => {
            let bones = [
                input.read_ref(width)?,
                input.read_ref(width)?,
                input.read_ref(width)?,
                input.read_ref(width)?,
            ];
            let weights = [
                input.read_fixed()?,
                input.read_fixed()?,
                input.read_fixed()?,
                input.read_fixed()?,
            ];
            if value == DEFORM_BDEF4 {
                Deform::Bdef4 { bones, weights }
            } else {
                Deform::Qdef { bones, weights }
            }
        }
        _ => return Err(Defect::UnknownDeform { value }),
    })
}

fn write_deform(output: &mut BinaryOutput, info: &DataInfo, deform: &Deform) -> Result<(), Defect> {
    let width = info.bone_index;
    match deform {
        Deform::Bdef1 { bone } => {
            output.write_fixed(DEFORM_BDEF1);
            output.write_ref(*bone, width)?;
        }
        Deform::Bdef2 { bones, weight } => {
            output.write_fixed(DEFORM_BDEF2);
            for bone in bones {
                output.write_ref(*bone, width)?;
            }
            output.write_fixed(*weight);
        }
        Deform::Bdef4 { bones, weights } | Deform::Qdef { bones, weights } => {
            let tag = if matches!(deform, Deform::Qdef { .. }) {
                if !info.is_v21() {
                    return Err(Defect::UnsupportedInVersion {
                        kind: "QDEF deform",
                        version: info.version,
                    });
                }
                DEFORM_QDEF
            } else {
                DEFORM_BDEF4
            };
            output.write_fixed(tag);
            for bone in bones {
                output.write_ref(*bone, width)?;
            }
            for weight in weights {
                output.write_fixed(*weight);
            }
        }
        Deform::Sdef {
            bones,
            weight,
            c,
            r0,
            r1,
        } => {
            output.write_fixed(DEFORM_SDEF);
            for bone in bones {
                output.write_ref(*bone, width)?;
            }
            output.write_fixed(*weight);
            output.write_fixed(*c);
            output.write_fixed(*r0);
            output.write_fixed(*r1);
        }
    }
    Ok(())
}

fn deform_size(deform: &Deform, info: &DataInfo) -> usize {
    let bone = info.bone_index.bytes();
    1 + match deform {
        Deform::Bdef1 { .. } => bone,
        Deform::Bdef2 { .. } => 2 * bone + 4,
        Deform::Bdef4 { .. } | Deform::Qdef { .. } => 4 * bone + 16,
        Deform::Sdef { .. } => 2 * bone + 4 + 36,
    }
}
