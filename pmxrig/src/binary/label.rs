use super::Record;
use crate::{BinaryInput, BinaryOutput, DataInfo, Defect, LabelData, LabelTarget, text_size};

const TARGET_BONE: u8 = 0;
const TARGET_MORPH: u8 = 1;

impl Record for LabelData {
    fn read(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Self, Defect> {
        let name = input.read_text(info.encoding)?;
        let english_name = input.read_text(info.encoding)?;
        let special = input.read_bool()?;
        let count = input.read_count()?;
        let mut targets = Vec::with_capacity(count.min(input.remaining()));
        for _ in 0..count {
            let target = match input.read_fixed::<u8>()? {
                TARGET_BONE => LabelTarget::Bone(input.read_ref(info.bone_index)?),
                TARGET_MORPH => LabelTarget::Morph(input.read_ref(info.morph_index)?),
                value => return Err(Defect::UnknownLabelTarget { value }),
            };
            targets.push(target);
        }
        Ok(Self {
            name,
            english_name,
            special,
            targets,
        })
    }

    fn write(&self, output: &mut BinaryOutput, info: &DataInfo) -> Result<(), Defect> {
        output.write_text(&self.name, info.encoding)?;
        output.write_text(&self.english_name, info.encoding)?;
        output.write_bool(self.special);
        output.write_count(self.targets.len())?;
        for target in &self.targets {
            match *target {
                LabelTarget::Bone(bone) => {
                    output.write_fixed(TARGET_BONE);
                    output.write_ref(bone, info.bone_index)?;
                }
                LabelTarget::Morph(morph) => {
                    output.write_fixed(TARGET_MORPH);
                    output.write_ref(morph, info.morph_index)?;
                }
            }
        }
        Ok(())
    }

    fn estimate_size(&self, info: &DataInfo) -> usize {
        let targets = self
            .targets
            .iter()
            .map(|target| {
                1 + match target {
                    LabelTarget::Bone(_) => info.bone_index.bytes(),
                    LabelTarget::Morph(_) => info.morph_index.bytes(),
                }
            })
            .sum::<usize>();
        text_size(&self.name, info.encoding)
            + text_size(&self.english_name, info.encoding)
            + 1
            + 4
            + targets
    }

    fn skip(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<(), Defect> {
        input.skip_text()?;
        input.skip_text()?;
        input.read_bool()?;
        let count = input.read_count()?;
        for _ in 0..count {
            match input.read_fixed::<u8>()? {
                TARGET_BONE => input.skip_index(info.bone_index)?,
                TARGET_MORPH => input.skip_index(info.morph_index)?,
                value => return Err(Defect::UnknownLabelTarget { value }),
            }
        }
        Ok(())
    }
}
