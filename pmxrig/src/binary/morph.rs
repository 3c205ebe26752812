use super::Record;
use crate::{
    BinaryInput, BinaryOutput, BoneMorph, DataInfo, Defect, GroupMorph, ImpulseMorph,
    MaterialMorph, MaterialOperation, Morph, MorphCategory, MorphData, UvMorph, VertexMorph,
    text_size,
};

const MORPH_GROUP: u8 = 0;
const MORPH_VERTEX: u8 = 1;
const MORPH_BONE: u8 = 2;
const MORPH_UV: u8 = 3;
const MORPH_UVA4: u8 = 7;
const MORPH_MATERIAL: u8 = 8;
const MORPH_FLIP: u8 = 9;
const MORPH_IMPULSE: u8 = 10;

// operation + diffuse + specular + shininess + ambient + edge color + edge size + 3 texture weights
const MATERIAL_OFFSET_SIZE: usize = 1 + 16 + 12 + 4 + 12 + 16 + 4 + 16 * 3;

fn category(value: u8) -> Result<MorphCategory, Defect> {
    match value {
        0 => Ok(MorphCategory::System),
        1 => Ok(MorphCategory::Eyebrow),
        2 => Ok(MorphCategory::Eye),
        3 => Ok(MorphCategory::Lip),
        4 => Ok(MorphCategory::Other),
        _ => Err(Defect::UnknownMorphCategory { value }),
    }
}

fn category_value(category: MorphCategory) -> u8 {
    match category {
        MorphCategory::System => 0,
        MorphCategory::Eyebrow => 1,
        MorphCategory::Eye => 2,
        MorphCategory::Lip => 3,
        MorphCategory::Other => 4,
    }
}

fn type_value(morph: &Morph) -> u8 {
    match morph {
        Morph::Group(_) => MORPH_GROUP,
        Morph::Vertex(_) => MORPH_VERTEX,
        Morph::Bone(_) => MORPH_BONE,
        Morph::Uv { channel, .. } => MORPH_UV.saturating_add(*channel),
        Morph::Material(_) => MORPH_MATERIAL,
        Morph::Flip(_) => MORPH_FLIP,
        Morph::Impulse(_) => MORPH_IMPULSE,
    }
}

fn is_known_type(value: u8, info: &DataInfo) -> bool {
    value <= MORPH_MATERIAL || (info.is_v21() && value <= MORPH_IMPULSE)
}

/// Size of one offset entry of a morph of the given type.
fn offset_size(value: u8, info: &DataInfo) -> usize {
    match value {
        MORPH_GROUP | MORPH_FLIP => info.morph_index.bytes() + 4,
        MORPH_VERTEX => info.vertex_index.bytes() + 12,
        MORPH_BONE => info.bone_index.bytes() + 12 + 16,
        MORPH_MATERIAL => info.material_index.bytes() + MATERIAL_OFFSET_SIZE,
        MORPH_IMPULSE => info.rigid_body_index.bytes() + 1 + 12 + 12,
        // UV and the four additional UV channels
        _ => info.vertex_index.bytes() + 16,
    }
}

fn read_list<T>(
    input: &mut BinaryInput<'_>,
    count: usize,
    mut read: impl FnMut(&mut BinaryInput<'_>) -> Result<T, Defect>,
) -> Result<Vec<T>, Defect> {
    let mut list = Vec::with_capacity(count.min(input.remaining()));
    for _ in 0..count {
        list.push(read(input)?);
    }
    Ok(list)
}

fn read_group(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<GroupMorph, Defect> {
    Ok(GroupMorph {
        morph: input.read_ref(info.morph_index)?,
        weight: input.read_fixed()?,
    })
}

fn read_material(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<MaterialMorph, Defect> {
    let material = input.read_ref(info.material_index)?;
    let operation = match input.read_fixed::<u8>()? {
        0 => MaterialOperation::Multiply,
        1 => MaterialOperation::Add,
        value => return Err(Defect::UnknownMaterialOperation { value }),
    };
    Ok(MaterialMorph {
        material,
        operation,
        diffuse: input.read_fixed()?,
        specular: input.read_fixed()?,
        shininess: input.read_fixed()?,
        ambient: input.read_fixed()?,
        edge_color: input.read_fixed()?,
        edge_size: input.read_fixed()?,
        texture_weight: input.read_fixed()?,
        sphere_texture_weight: input.read_fixed()?,
        toon_texture_weight: input.read_fixed()?,
    })
}

fn write_material(
    output: &mut BinaryOutput,
    info: &DataInfo,
    offset: &MaterialMorph,
) -> Result<(), Defect> {
    output.write_ref(offset.material, info.material_index)?;
    output.write_fixed(match offset.operation {
        MaterialOperation::Multiply => 0u8,
        MaterialOperation::Add => 1u8,
    });
    output.write_fixed(offset.diffuse);
    output.write_fixed(offset.specular);
    output.write_fixed(offset.shininess);
    output.write_fixed(offset.ambient);
    output.write_fixed(offset.edge_color);
    output.write_fixed(offset.edge_size);
    output.write_fixed(offset.texture_weight);
    output.write_fixed(offset.sphere_texture_weight);
    output.write_fixed(offset.toon_texture_weight);
    Ok(())
}

impl Record for MorphData {
    fn read(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Self, Defect> {
        let name = input.read_text(info.encoding)?;
        let english_name = input.read_text(info.encoding)?;
        let category = category(input.read_fixed()?)?;
        let value = input.read_fixed::<u8>()?;
        if !is_known_type(value, info) {
            return Err(Defect::UnknownMorphType { value });
        }
        let count = input.read_count()?;

        let morph = match value {
            MORPH_GROUP => Morph::Group(read_list(input, count, |input| read_group(input, info))?),
            MORPH_FLIP => Morph::Flip(read_list(input, count, |input| read_group(input, info))?),
            MORPH_VERTEX => Morph::Vertex(read_list(input, count, |input| {
                Ok(VertexMorph {
                    vertex: input.read_vertex_ref(info.vertex_index)?,
                    offset: input.read_fixed()?,
                })
            })?),
            MORPH_BONE => Morph::Bone(read_list(input, count, |input| {
                Ok(BoneMorph {
                    bone: input.read_ref(info.bone_index)?,
                    translation: input.read_fixed()?,
                    rotation: input.read_fixed()?,
                })
            })?),
            MORPH_UV..=MORPH_UVA4 => Morph::Uv {
                channel: value - MORPH_UV,
                offsets: read_list(input, count, |input| {
                    Ok(UvMorph {
                        vertex: input.read_vertex_ref(info.vertex_index)?,
                        offset: input.read_fixed()?,
                    })
                })?,
            },
            MORPH_MATERIAL => {
                Morph::Material(read_list(input, count, |input| read_material(input, info))?)
            }
            _ => Morph::Impulse(read_list(input, count, |input| {
                Ok(ImpulseMorph {
                    rigid_body: input.read_ref(info.rigid_body_index)?,
                    local: input.read_bool()?,
                    velocity: input.read_fixed()?,
                    torque: input.read_fixed()?,
                })
            })?),
        };

        Ok(Self {
            name,
            english_name,
            category,
            morph,
        })
    }

    fn write(&self, output: &mut BinaryOutput, info: &DataInfo) -> Result<(), Defect> {
        if let Morph::Uv { channel, .. } = self.morph {
            if channel > MORPH_UVA4 - MORPH_UV {
                return Err(Defect::InvalidUvChannel { channel });
            }
        }
        let value = type_value(&self.morph);
        if !is_known_type(value, info) {
            return Err(Defect::UnsupportedInVersion {
                kind: "morph type",
                version: info.version,
            });
        }
        output.write_text(&self.name, info.encoding)?;
        output.write_text(&self.english_name, info.encoding)?;
        output.write_fixed(category_value(self.category));
        output.write_fixed(value);
        output.write_count(self.morph.len())?;

        match &self.morph {
            Morph::Group(list) | Morph::Flip(list) => {
                for offset in list {
                    output.write_ref(offset.morph, info.morph_index)?;
                    output.write_fixed(offset.weight);
                }
            }
            Morph::Vertex(list) => {
                for offset in list {
                    output.write_vertex_ref(offset.vertex, info.vertex_index)?;
                    output.write_fixed(offset.offset);
                }
            }
            Morph::Bone(list) => {
                for offset in list {
                    output.write_ref(offset.bone, info.bone_index)?;
                    output.write_fixed(offset.translation);
                    output.write_fixed(offset.rotation);
                }
            }
            Morph::Uv { offsets, .. } => {
                for offset in offsets {
                    output.write_vertex_ref(offset.vertex, info.vertex_index)?;
                    output.write_fixed(offset.offset);
                }
            }
            Morph::Material(list) => {
                for offset in list {
                    write_material(output, info, offset)?;
                }
            }
            Morph::Impulse(list) => {
                for offset in list {
                    output.write_ref(offset.rigid_body, info.rigid_body_index)?;
                    output.write_bool(offset.local);
                    output.write_fixed(offset.velocity);
                    output.write_fixed(offset.torque);
                }
            }
        }
        Ok(())
    }

    fn estimate_size(&self, info: &DataInfo) -> usize {
        text_size(&self.name, info.encoding)
            + text_size(&self.english_name, info.encoding)
            + 1
            + 1
            + 4
            + self.morph.len() * offset_size(type_value(&self.morph), info)
    }

    fn skip(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<(), Defect> {
        input.skip_text()?;
        input.skip_text()?;
        category(input.read_fixed()?)?;
        let value = input.read_fixed::<u8>()?;
        if !is_known_type(value, info) {
            return Err(Defect::UnknownMorphType { value });
        }
        let count = input.read_count()?;
        input.skip(count.saturating_mul(offset_size(value, info)))
    }
}
