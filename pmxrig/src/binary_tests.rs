use crate::test_fixtures::{bone, model_with_bones, resolved, sample_model};
use crate::{
    BinaryInput, BinaryOutput, CoordinateSystem, DataInfo, Defect, Error, ErrorKind, IndexWidth,
    LoadOptions, ModelData, Record, Reference, TextEncoding, VertexData,
};
use glam::Vec3;
use pretty_assertions::assert_eq;
use std::fmt::Debug;

fn info_with_width(width: IndexWidth, encoding: TextEncoding) -> DataInfo {
    DataInfo {
        version: 2.1,
        encoding,
        additional_uv_count: 1,
        vertex_index: width,
        texture_index: width,
        material_index: width,
        bone_index: width,
        morph_index: width,
        rigid_body_index: width,
        ..DataInfo::default()
    }
}

fn assert_record_round_trip<T: Record + PartialEq + Debug>(record: &T, info: &DataInfo) {
    let mut output = BinaryOutput::new();
    record.write(&mut output, info).expect("write record");
    let bytes = output.into_bytes();
    assert_eq!(record.estimate_size(info), bytes.len(), "estimate for {record:?}");

    let mut input = BinaryInput::new(&bytes);
    let read = T::read(&mut input, info).expect("read record");
    assert_eq!(&read, record);
    assert_eq!(input.remaining(), 0);

    let mut input = BinaryInput::new(&bytes);
    T::skip(&mut input, info).expect("skip record");
    assert_eq!(input.offset(), bytes.len());
}

fn sample_bytes() -> Vec<u8> {
    sample_model().to_pmx_bytes().expect("sample writes")
}

#[test]
fn records_round_trip_at_every_index_width() {
    let data = sample_model();
    for width in [IndexWidth::One, IndexWidth::Two, IndexWidth::Four] {
        for encoding in [TextEncoding::Utf16Le, TextEncoding::Utf8] {
            let info = info_with_width(width, encoding);
            data.vertices
                .iter()
                .for_each(|record| assert_record_round_trip(record, &info));
            data.textures
                .iter()
                .for_each(|record| assert_record_round_trip(record, &info));
            data.materials
                .iter()
                .for_each(|record| assert_record_round_trip(record, &info));
            data.bones
                .iter()
                .for_each(|record| assert_record_round_trip(record, &info));
            data.morphs
                .iter()
                .for_each(|record| assert_record_round_trip(record, &info));
            data.labels
                .iter()
                .for_each(|record| assert_record_round_trip(record, &info));
            data.rigid_bodies
                .iter()
                .for_each(|record| assert_record_round_trip(record, &info));
            data.joints
                .iter()
                .for_each(|record| assert_record_round_trip(record, &info));
        }
    }
}

#[test]
fn document_round_trips_byte_exact() {
    let bytes = sample_bytes();
    assert_eq!(bytes.len(), sample_model().estimate_size());

    let loaded = ModelData::from_pmx_bytes(&bytes).expect("sample loads");
    let mut expected = sample_model();
    expected.resolve().expect("sample resolves");
    assert_eq!(*loaded, expected);

    assert_eq!(loaded.to_pmx_bytes().expect("rewrite"), bytes);
}

#[test]
fn utf8_document_round_trips_byte_exact() {
    let mut data = sample_model();
    data.info.encoding = TextEncoding::Utf8;
    let bytes = data.to_pmx_bytes().expect("utf-8 writes");
    let loaded = ModelData::from_pmx_bytes(&bytes).expect("utf-8 loads");
    assert_eq!(loaded.name, "サンプル");
    assert_eq!(loaded.comment, "コメント\r\nline two");
    assert_eq!(loaded.to_pmx_bytes().expect("rewrite"), bytes);
}

#[test]
fn preparse_locates_every_section() {
    let bytes = sample_bytes();
    let layout = ModelData::preparse(&bytes).expect("preparse");
    let data = sample_model();

    assert_eq!(layout.info.version, 2.1);
    assert_eq!(layout.info.additional_uv_count, 1);
    assert_eq!(layout.vertices.count, data.vertices.len());
    assert_eq!(layout.indices.count, data.indices.len());
    assert_eq!(layout.textures.count, data.textures.len());
    assert_eq!(layout.materials.count, data.materials.len());
    assert_eq!(layout.bones.count, data.bones.len());
    assert_eq!(layout.morphs.count, data.morphs.len());
    assert_eq!(layout.labels.count, data.labels.len());
    assert_eq!(layout.rigid_bodies.count, data.rigid_bodies.len());
    assert_eq!(layout.joints.count, data.joints.len());

    assert_eq!(layout.texts.end, layout.vertices.range.start);
    assert_eq!(layout.vertices.range.end, layout.indices.range.start);
    assert_eq!(layout.bones.range.end, layout.morphs.range.start);
    assert_eq!(layout.joints.range.end, layout.trailing.start);
    assert_eq!(layout.trailing, bytes.len() - 4..bytes.len());
}

#[test]
fn rejects_buffer_shorter_than_header() {
    let error = ModelData::from_pmx_bytes(b"PMX ").unwrap_err();
    assert!(matches!(error, Error::InvalidHeader { len: 4 }));
    assert_eq!(error.kind(), ErrorKind::InvalidHeader);
}

#[test]
fn rejects_bad_signature_version_and_flag_size() {
    let bytes = sample_bytes();

    let mut signature = bytes.clone();
    signature[..4].copy_from_slice(b"PMD ");
    let error = ModelData::from_pmx_bytes(&signature).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidSignature);

    let mut version = bytes.clone();
    version[4..8].copy_from_slice(&3.0f32.to_le_bytes());
    let error = ModelData::from_pmx_bytes(&version).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidVersion);

    let mut flag_size = bytes.clone();
    flag_size[8] = 9;
    let error = ModelData::from_pmx_bytes(&flag_size).unwrap_err();
    assert!(matches!(error, Error::InvalidFlagSize { size: 9 }));

    let mut encoding = bytes;
    encoding[9] = 2;
    let error = ModelData::from_pmx_bytes(&encoding).unwrap_err();
    assert!(matches!(
        error,
        Error::InvalidFlag {
            field: "encoding",
            value: 2
        }
    ));
}

#[test]
fn truncated_buffers_fail_with_the_section_kind() {
    let bytes = sample_bytes();
    let layout = ModelData::preparse(&bytes).expect("preparse");

    let cases = [
        (layout.texts.start + 2, ErrorKind::InvalidNameSize),
        (layout.vertices.range.start + 6, ErrorKind::InvalidVertices),
        (layout.indices.range.start + 5, ErrorKind::InvalidIndices),
        (layout.materials.range.start + 10, ErrorKind::InvalidMaterials),
        (layout.bones.range.start + 10, ErrorKind::InvalidBones),
        (layout.morphs.range.end - 1, ErrorKind::InvalidMorphs),
        (layout.joints.range.start + 3, ErrorKind::InvalidJoints),
    ];
    for (len, kind) in cases {
        let error = ModelData::from_pmx_bytes(&bytes[..len]).unwrap_err();
        assert_eq!(error.kind(), kind, "truncated at {len}");
        assert!(
            matches!(error.defect(), Some(Defect::Truncated { .. })),
            "truncated at {len}: {error}"
        );
    }
}

#[test]
fn parent_out_of_range_fails_the_load() {
    let data = model_with_bones(vec![
        bone("root", Vec3::ZERO, None),
        bone("child", Vec3::Y, Some(5)),
    ]);
    let bytes = data.to_pmx_bytes().expect("writes unresolved data");

    let error = ModelData::from_pmx_bytes(&bytes).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidBones);
    assert!(matches!(
        error,
        Error::InvalidBones {
            index: 1,
            defect: Defect::Unresolved {
                reference: Reference::Parent,
                value: 5,
                count: 2,
            },
        }
    ));
}

#[test]
fn parent_cycle_fails_resolution() {
    let mut data = model_with_bones(vec![
        bone("a", Vec3::ZERO, Some(1)),
        bone("b", Vec3::Y, Some(0)),
    ]);
    let error = data.resolve().unwrap_err();
    assert!(matches!(
        error,
        Error::InvalidBones {
            defect: Defect::ParentCycle { .. },
            ..
        }
    ));
}

#[test]
fn index_below_minus_one_is_rejected() {
    let data = model_with_bones(vec![bone("a", Vec3::ZERO, None)]);
    let mut bytes = data.to_pmx_bytes().expect("writes");
    let layout = ModelData::preparse(&bytes).expect("preparse");
    // count, UTF-16 name "a", empty English name, origin
    let parent = layout.bones.range.start + 4 + 6 + 4 + 12;
    assert_eq!(bytes[parent], 0xff);
    bytes[parent] = 0xfe;

    let error = ModelData::from_pmx_bytes(&bytes).unwrap_err();
    assert!(matches!(
        error,
        Error::InvalidBones {
            index: 0,
            defect: Defect::NegativeIndex { value: -2, .. },
        }
    ));
}

#[test]
fn surface_index_out_of_range_fails_the_load() {
    let mut data = ModelData::new(DataInfo::default());
    data.vertices = vec![VertexData::default(); 2];
    data.indices = vec![0, 1, 2];
    let bytes = data.to_pmx_bytes().expect("writes");

    let error = ModelData::from_pmx_bytes(&bytes).unwrap_err();
    assert!(matches!(
        error,
        Error::InvalidIndices {
            index: 2,
            defect: Defect::Unresolved {
                reference: Reference::SurfaceVertex,
                ..
            },
        }
    ));
}

#[test]
fn opengl_limits_are_mirrored_on_load_and_restored_on_write() {
    let bytes = sample_bytes();
    let options = LoadOptions {
        coordinate_system: CoordinateSystem::OpenGl,
    };
    let loaded = ModelData::from_pmx_bytes_with_options(&bytes, &options).expect("loads");
    assert_eq!(loaded.info.coordinate_system, CoordinateSystem::OpenGl);

    let stored = sample_model().bones[4].ik.clone().expect("ik bone");
    let mirrored = loaded.bones[4].ik.as_ref().expect("ik bone");
    let stored_limit = stored.joints[0].limit.expect("limit");
    let loaded_limit = mirrored.joints[0].limit.expect("limit");
    assert_eq!(loaded_limit, stored_limit.mirrored());
    assert_eq!(loaded_limit.lower, Vec3::new(-0.5, -0.75, -0.5));
    assert_eq!(loaded_limit.upper, Vec3::new(1.0, 0.25, 0.0));
    assert_eq!(loaded_limit.mirrored(), stored_limit);

    assert_eq!(loaded.to_pmx_bytes().expect("rewrite"), bytes);
}

#[test]
fn write_rejects_indices_wider_than_declared() {
    let mut data = model_with_bones(vec![bone("a", Vec3::ZERO, None)]);
    data.bones[0].parent = Some(200);
    let error = data.to_pmx_bytes().unwrap_err();
    assert!(matches!(
        error,
        Error::InvalidBones {
            index: 0,
            defect: Defect::IndexOverflow { value: 200, width: 1 },
        }
    ));
}

#[test]
fn write_rejects_features_newer_than_the_version() {
    let mut data = sample_model();
    data.info.version = 2.0;
    let error = data.to_pmx_bytes().unwrap_err();
    assert!(matches!(
        error,
        Error::InvalidVertices {
            index: 4,
            defect: Defect::UnsupportedInVersion { .. },
        }
    ));
}

#[test]
fn fit_index_widths_follows_record_counts() {
    let mut data = model_with_bones(vec![bone("a", Vec3::ZERO, None); 128]);
    data.vertices = vec![VertexData::default(); 300];
    data.fit_index_widths();
    assert_eq!(data.info.bone_index, IndexWidth::Two);
    assert_eq!(data.info.vertex_index, IndexWidth::Two);
    assert_eq!(data.info.morph_index, IndexWidth::One);

    data.vertices.truncate(255);
    data.fit_index_widths();
    assert_eq!(data.info.vertex_index, IndexWidth::One);
}

#[test]
fn load_builds_the_bone_graph() {
    let loaded = ModelData::from_pmx_bytes(&sample_bytes()).expect("loads");
    let expected = resolved(sample_model());
    assert_eq!(loaded.graph(), expected.graph());
    assert_eq!(loaded.graph().children(1), &[2, 3]);
}
