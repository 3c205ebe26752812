use super::Record;
use crate::{
    BinaryInput, BinaryOutput, DataInfo, Defect, MaterialData, SphereMode, Toon, text_size,
};

// diffuse + specular + shininess + ambient + flags + edge color + edge size
const COLOR_BLOCK_SIZE: usize = 16 + 12 + 4 + 12 + 1 + 16 + 4;

fn sphere_mode(value: u8) -> Result<SphereMode, Defect> {
    match value {
        0 => Ok(SphereMode::Disabled),
        1 => Ok(SphereMode::Multiply),
        2 => Ok(SphereMode::Add),
        3 => Ok(SphereMode::SubTexture),
        _ => Err(Defect::UnknownSphereMode { value }),
    }
}

fn sphere_mode_value(mode: SphereMode) -> u8 {
    match mode {
        SphereMode::Disabled => 0,
        SphereMode::Multiply => 1,
        SphereMode::Add => 2,
        SphereMode::SubTexture => 3,
    }
}

impl Record for MaterialData {
    fn read(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Self, Defect> {
        let name = input.read_text(info.encoding)?;
        let english_name = input.read_text(info.encoding)?;
        let diffuse = input.read_fixed()?;
        let specular = input.read_fixed()?;
        let shininess = input.read_fixed()?;
        let ambient = input.read_fixed()?;
        let flags = input.read_fixed()?;
        let edge_color = input.read_fixed()?;
        let edge_size = input.read_fixed()?;
        let texture = input.read_ref(info.texture_index)?;
        let sphere_texture = input.read_ref(info.texture_index)?;
        let sphere_mode = sphere_mode(input.read_fixed()?)?;
        let toon = if input.read_bool()? {
            Toon::Shared(input.read_fixed()?)
        } else {
            Toon::Texture(input.read_ref(info.texture_index)?)
        };
        let memo = input.read_text(info.encoding)?;
        let index_count = input.read_fixed()?;
        Ok(Self {
            name,
            english_name,
            diffuse,
            specular,
            shininess,
            ambient,
            flags,
            edge_color,
            edge_size,
            texture,
            sphere_texture,
            sphere_mode,
            toon,
            memo,
            index_count,
        })
    }

    fn write(&self, output: &mut BinaryOutput, info: &DataInfo) -> Result<(), Defect> {
        output.write_text(&self.name, info.encoding)?;
        output.write_text(&self.english_name, info.encoding)?;
        output.write_fixed(self.diffuse);
        output.write_fixed(self.specular);
        output.write_fixed(self.shininess);
        output.write_fixed(self.ambient);
        output.write_fixed(self.flags);
        output.write_fixed(self.edge_color);
        output.write_fixed(self.edge_size);
        output.write_ref(self.texture, info.texture_index)?;
        output.write_ref(self.sphere_texture, info.texture_index)?;
        output.write_fixed(sphere_mode_value(self.sphere_mode));
        match self.toon {
            Toon::Shared(index) => {
                output.write_bool(true);
                output.write_fixed(index);
            }
            Toon::Texture(texture) => {
                output.write_bool(false);
                output.write_ref(texture, info.texture_index)?;
            }
        }
        output.write_text(&self.memo, info.encoding)?;
        output.write_fixed(self.index_count);
        Ok(())
    }

    fn estimate_size(&self, info: &DataInfo) -> usize {
        let texture = info.texture_index.bytes();
        let toon = match self.toon {
            Toon::Shared(_) => 1,
            Toon::Texture(_) => texture,
        };
        text_size(&self.name, info.encoding)
            + text_size(&self.english_name, info.encoding)
            + COLOR_BLOCK_SIZE
            + 2 * texture
            + 2
            + toon
            + text_size(&self.memo, info.encoding)
            + 4
    }

    fn skip(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<(), Defect> {
        input.skip_text()?;
        input.skip_text()?;
        input.skip(COLOR_BLOCK_SIZE + 2 * info.texture_index.bytes())?;
        sphere_mode(input.read_fixed()?)?;
        if input.read_bool()? {
            input.skip(1)?;
        } else {
            input.skip_index(info.texture_index)?;
        }
        input.skip_text()?;
        input.skip(4)
    }
}
