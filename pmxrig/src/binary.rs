//! PMX 2.0/2.1 loader and writer.
//!
//! The codec is IO-free: it operates on an in-memory byte slice. Loading runs in two passes. A
//! preparse walks every section without allocating records to validate the layout and locate
//! section boundaries; the materializing pass then builds the records and resolves references.

use crate::{
    BinaryInput, BinaryOutput, DataInfo, Defect, Error, IndexWidth, LoadOptions, ModelData,
    ModelText, TextEncoding, text_size,
};
use std::ops::Range;
use std::sync::Arc;

mod bone;
mod label;
mod material;
mod morph;
mod physics;
mod vertex;

const SIGNATURE: &[u8; 4] = b"PMX ";
const FLAG_SIZE: u8 = 8;
// signature + version + flag size
const FIXED_HEADER_SIZE: usize = 9;

/// One record kind of the PMX format.
///
/// `estimate_size` must equal the number of bytes `write` emits, and `skip` must consume exactly
/// what `read` consumes.
pub trait Record: Sized {
    fn read(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Self, Defect>;

    fn write(&self, output: &mut BinaryOutput, info: &DataInfo) -> Result<(), Defect>;

    fn estimate_size(&self, info: &DataInfo) -> usize;

    fn skip(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<(), Defect>;
}

/// Texture paths are bare texts.
impl Record for String {
    fn read(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Self, Defect> {
        input.read_text(info.encoding)
    }

    fn write(&self, output: &mut BinaryOutput, info: &DataInfo) -> Result<(), Defect> {
        output.write_text(self, info.encoding)
    }

    fn estimate_size(&self, info: &DataInfo) -> usize {
        text_size(self, info.encoding)
    }

    fn skip(input: &mut BinaryInput<'_>, _info: &DataInfo) -> Result<(), Defect> {
        input.skip_text()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SectionSpan {
    pub count: usize,
    /// Byte range including the leading i32 count.
    pub range: Range<usize>,
}

/// Section boundaries found by [`ModelData::preparse`].
#[derive(Clone, Debug, PartialEq)]
pub struct SectionLayout {
    pub info: DataInfo,
    /// Byte range of the name, English name, comment and English comment texts.
    pub texts: Range<usize>,
    pub vertices: SectionSpan,
    pub indices: SectionSpan,
    pub textures: SectionSpan,
    pub materials: SectionSpan,
    pub bones: SectionSpan,
    pub morphs: SectionSpan,
    pub labels: SectionSpan,
    pub rigid_bodies: SectionSpan,
    pub joints: SectionSpan,
    pub trailing: Range<usize>,
}

type Wrap = fn(usize, Defect) -> Error;

fn vertex_error(index: usize, defect: Defect) -> Error {
    Error::InvalidVertices { index, defect }
}

fn index_error(index: usize, defect: Defect) -> Error {
    Error::InvalidIndices { index, defect }
}

fn texture_error(index: usize, defect: Defect) -> Error {
    Error::InvalidTextures { index, defect }
}

fn material_error(index: usize, defect: Defect) -> Error {
    Error::InvalidMaterials { index, defect }
}

fn bone_error(index: usize, defect: Defect) -> Error {
    Error::InvalidBones { index, defect }
}

fn morph_error(index: usize, defect: Defect) -> Error {
    Error::InvalidMorphs { index, defect }
}

fn label_error(index: usize, defect: Defect) -> Error {
    Error::InvalidLabels { index, defect }
}

fn rigid_body_error(index: usize, defect: Defect) -> Error {
    Error::InvalidRigidBodies { index, defect }
}

fn joint_error(index: usize, defect: Defect) -> Error {
    Error::InvalidJoints { index, defect }
}

const MODEL_TEXTS: [ModelText; 4] = [
    ModelText::Name,
    ModelText::EnglishName,
    ModelText::Comment,
    ModelText::EnglishComment,
];

fn read_header(input: &mut BinaryInput<'_>) -> Result<DataInfo, Error> {
    let len = input.remaining();
    if len < FIXED_HEADER_SIZE {
        return Err(Error::InvalidHeader { len });
    }
    let truncated = |_| Error::InvalidHeader { len };

    let signature = input.read_bytes(4).map_err(truncated)?;
    if signature != SIGNATURE {
        let mut found = [0u8; 4];
        found.copy_from_slice(signature);
        return Err(Error::InvalidSignature { found });
    }

    let version = input.read_fixed::<f32>().map_err(truncated)?;
    if version != 2.0 && version != 2.1 {
        return Err(Error::InvalidVersion { version });
    }

    let size = input.read_fixed::<u8>().map_err(truncated)?;
    if size != FLAG_SIZE {
        return Err(Error::InvalidFlagSize { size });
    }
    let flags = input.read_bytes(usize::from(FLAG_SIZE)).map_err(truncated)?;

    let encoding = TextEncoding::from_flag(flags[0]).ok_or(Error::InvalidFlag {
        field: "encoding",
        value: flags[0],
    })?;
    if flags[1] > 4 {
        return Err(Error::InvalidFlag {
            field: "additional_uv_count",
            value: flags[1],
        });
    }
    let width = |field: &'static str, value: u8| {
        IndexWidth::from_bytes(value).ok_or(Error::InvalidFlag { field, value })
    };

    Ok(DataInfo {
        version,
        encoding,
        additional_uv_count: flags[1],
        vertex_index: width("vertex_index_size", flags[2])?,
        texture_index: width("texture_index_size", flags[3])?,
        material_index: width("material_index_size", flags[4])?,
        bone_index: width("bone_index_size", flags[5])?,
        morph_index: width("morph_index_size", flags[6])?,
        rigid_body_index: width("rigid_body_index_size", flags[7])?,
        coordinate_system: Default::default(),
    })
}

fn write_header(output: &mut BinaryOutput, info: &DataInfo) {
    output.write_bytes(SIGNATURE);
    output.write_fixed(info.version);
    output.write_fixed(FLAG_SIZE);
    output.write_fixed(info.encoding.flag());
    output.write_fixed(info.additional_uv_count);
    for width in [
        info.vertex_index,
        info.texture_index,
        info.material_index,
        info.bone_index,
        info.morph_index,
        info.rigid_body_index,
    ] {
        output.write_fixed(width.bytes() as u8);
    }
}

fn skip_section<T: Record>(
    input: &mut BinaryInput<'_>,
    info: &DataInfo,
    wrap: Wrap,
) -> Result<SectionSpan, Error> {
    let start = input.offset();
    let count = input.read_count().map_err(|defect| wrap(0, defect))?;
    for index in 0..count {
        T::skip(input, info).map_err(|defect| wrap(index, defect))?;
    }
    Ok(SectionSpan {
        count,
        range: start..input.offset(),
    })
}

fn read_section<T: Record>(
    input: &mut BinaryInput<'_>,
    info: &DataInfo,
    wrap: Wrap,
) -> Result<Vec<T>, Error> {
    let count = input.read_count().map_err(|defect| wrap(0, defect))?;
    // Every record is at least one byte, so the remaining input bounds the allocation.
    let mut records = Vec::with_capacity(count.min(input.remaining()));
    for index in 0..count {
        records.push(T::read(input, info).map_err(|defect| wrap(index, defect))?);
    }
    Ok(records)
}

fn write_section<T: Record>(
    output: &mut BinaryOutput,
    info: &DataInfo,
    records: &[T],
    wrap: Wrap,
) -> Result<(), Error> {
    output
        .write_count(records.len())
        .map_err(|defect| wrap(0, defect))?;
    for (index, record) in records.iter().enumerate() {
        record
            .write(output, info)
            .map_err(|defect| wrap(index, defect))?;
    }
    Ok(())
}

fn section_size<T: Record>(info: &DataInfo, records: &[T]) -> usize {
    4 + records
        .iter()
        .map(|record| record.estimate_size(info))
        .sum::<usize>()
}

fn skip_indices(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<SectionSpan, Error> {
    let start = input.offset();
    let count = input.read_count().map_err(|defect| index_error(0, defect))?;
    input
        .skip(count.saturating_mul(info.vertex_index.bytes()))
        .map_err(|defect| index_error(0, defect))?;
    Ok(SectionSpan {
        count,
        range: start..input.offset(),
    })
}

fn read_indices(input: &mut BinaryInput<'_>, info: &DataInfo) -> Result<Vec<u32>, Error> {
    let count = input.read_count().map_err(|defect| index_error(0, defect))?;
    let mut indices = Vec::with_capacity(count.min(input.remaining()));
    for index in 0..count {
        indices.push(
            input
                .read_unsigned_index(info.vertex_index)
                .map_err(|defect| index_error(index, defect))?,
        );
    }
    Ok(indices)
}

impl ModelData {
    /// Validates the header and locates every section without building records.
    pub fn preparse(bytes: &[u8]) -> Result<SectionLayout, Error> {
        let mut input = BinaryInput::new(bytes);
        let info = read_header(&mut input)?;

        let texts_start = input.offset();
        for field in MODEL_TEXTS {
            input
                .skip_text()
                .map_err(|defect| Error::InvalidText { field, defect })?;
        }
        let texts = texts_start..input.offset();

        let vertices = skip_section::<crate::VertexData>(&mut input, &info, vertex_error)?;
        let indices = skip_indices(&mut input, &info)?;
        let textures = skip_section::<String>(&mut input, &info, texture_error)?;
        let materials = skip_section::<crate::MaterialData>(&mut input, &info, material_error)?;
        let bones = skip_section::<crate::BoneData>(&mut input, &info, bone_error)?;
        let morphs = skip_section::<crate::MorphData>(&mut input, &info, morph_error)?;
        let labels = skip_section::<crate::LabelData>(&mut input, &info, label_error)?;
        let rigid_bodies =
            skip_section::<crate::RigidBodyData>(&mut input, &info, rigid_body_error)?;
        let joints = skip_section::<crate::JointData>(&mut input, &info, joint_error)?;

        let layout = SectionLayout {
            info,
            texts,
            vertices,
            indices,
            textures,
            materials,
            bones,
            morphs,
            labels,
            rigid_bodies,
            joints,
            trailing: input.offset()..bytes.len(),
        };
        tracing::debug!(
            version = layout.info.version,
            vertices = layout.vertices.count,
            materials = layout.materials.count,
            bones = layout.bones.count,
            morphs = layout.morphs.count,
            rigid_bodies = layout.rigid_bodies.count,
            joints = layout.joints.count,
            trailing = layout.trailing.len(),
            "preparsed PMX sections"
        );
        Ok(layout)
    }

    pub fn from_pmx_bytes(bytes: &[u8]) -> Result<Arc<Self>, Error> {
        Self::from_pmx_bytes_with_options(bytes, &LoadOptions::default())
    }

    pub fn from_pmx_bytes_with_options(
        bytes: &[u8],
        options: &LoadOptions,
    ) -> Result<Arc<Self>, Error> {
        match Self::load(bytes, options) {
            Ok(data) => Ok(Arc::new(data)),
            Err(error) => {
                tracing::warn!(%error, kind = ?error.kind(), "failed to load PMX model");
                Err(error)
            }
        }
    }

    fn load(bytes: &[u8], options: &LoadOptions) -> Result<Self, Error> {
        let layout = Self::preparse(bytes)?;
        let mut info = layout.info;
        info.coordinate_system = options.coordinate_system;

        let mut data = ModelData::new(info);
        let mut input = BinaryInput::at(bytes, layout.texts.start);
        let mut texts = Vec::with_capacity(MODEL_TEXTS.len());
        for field in MODEL_TEXTS {
            texts.push(
                input
                    .read_text(info.encoding)
                    .map_err(|defect| Error::InvalidText { field, defect })?,
            );
        }
        if let [name, english_name, comment, english_comment] = texts.as_mut_slice() {
            data.name = std::mem::take(name);
            data.english_name = std::mem::take(english_name);
            data.comment = std::mem::take(comment);
            data.english_comment = std::mem::take(english_comment);
        }

        data.vertices = read_section(&mut input, &info, vertex_error)?;
        data.indices = read_indices(&mut input, &info)?;
        data.textures = read_section(&mut input, &info, texture_error)?;
        data.materials = read_section(&mut input, &info, material_error)?;
        data.bones = read_section(&mut input, &info, bone_error)?;
        data.morphs = read_section(&mut input, &info, morph_error)?;
        data.labels = read_section(&mut input, &info, label_error)?;
        data.rigid_bodies = read_section(&mut input, &info, rigid_body_error)?;
        data.joints = read_section(&mut input, &info, joint_error)?;
        debug_assert_eq!(input.offset(), layout.trailing.start);
        data.trailing = input.rest().to_vec();

        data.resolve()?;
        tracing::debug!(
            name = %data.name,
            bones = data.bones.len(),
            morphs = data.morphs.len(),
            "loaded PMX model"
        );
        Ok(data)
    }

    /// Serializes the document with the layout and index widths declared in `info`.
    pub fn to_pmx_bytes(&self) -> Result<Vec<u8>, Error> {
        let info = &self.info;
        let mut output = BinaryOutput::with_capacity(self.estimate_size());
        write_header(&mut output, info);
        for (field, text) in MODEL_TEXTS.into_iter().zip(self.texts()) {
            output
                .write_text(text, info.encoding)
                .map_err(|defect| Error::InvalidText { field, defect })?;
        }

        write_section(&mut output, info, &self.vertices, vertex_error)?;
        output
            .write_count(self.indices.len())
            .map_err(|defect| index_error(0, defect))?;
        for (index, &vertex) in self.indices.iter().enumerate() {
            output
                .write_unsigned_index(vertex, info.vertex_index)
                .map_err(|defect| index_error(index, defect))?;
        }
        write_section(&mut output, info, &self.textures, texture_error)?;
        write_section(&mut output, info, &self.materials, material_error)?;
        write_section(&mut output, info, &self.bones, bone_error)?;
        write_section(&mut output, info, &self.morphs, morph_error)?;
        write_section(&mut output, info, &self.labels, label_error)?;
        write_section(&mut output, info, &self.rigid_bodies, rigid_body_error)?;
        write_section(&mut output, info, &self.joints, joint_error)?;
        output.write_bytes(&self.trailing);
        Ok(output.into_bytes())
    }

    /// Exact length of [`ModelData::to_pmx_bytes`] output.
    pub fn estimate_size(&self) -> usize {
        let info = &self.info;
        FIXED_HEADER_SIZE
            + usize::from(FLAG_SIZE)
            + self
                .texts()
                .iter()
                .map(|text| text_size(text, info.encoding))
                .sum::<usize>()
            + section_size(info, &self.vertices)
            + 4
            + self.indices.len() * info.vertex_index.bytes()
            + section_size(info, &self.textures)
            + section_size(info, &self.materials)
            + section_size(info, &self.bones)
            + section_size(info, &self.morphs)
            + section_size(info, &self.labels)
            + section_size(info, &self.rigid_bodies)
            + section_size(info, &self.joints)
            + self.trailing.len()
    }

    fn texts(&self) -> [&str; 4] {
        [
            &self.name,
            &self.english_name,
            &self.comment,
            &self.english_comment,
        ]
    }
}
