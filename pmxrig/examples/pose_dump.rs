use pmxrig::{ModelData, Skeleton};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut positional = Vec::<String>::new();
    let mut morphs = Vec::<(String, f32)>::new();

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--morph" => {
                let pair = args.get(i + 1).ok_or("--morph expects NAME=WEIGHT")?;
                let (name, weight) = pair.split_once('=').ok_or("--morph expects NAME=WEIGHT")?;
                morphs.push((name.to_string(), weight.parse()?));
                i += 2;
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let path = positional
        .first()
        .map(PathBuf::from)
        .ok_or("usage: pose_dump MODEL.pmx [--morph NAME=WEIGHT]...")?;
    let bytes = std::fs::read(&path)?;
    let data = ModelData::from_pmx_bytes(&bytes)?;

    let mut skeleton = Skeleton::new(data.clone());
    for (name, weight) in &morphs {
        match skeleton.morph_index(name) {
            Some(index) => {
                skeleton.morphs.set_weight(index, *weight);
            }
            None => tracing::warn!(morph = %name, "unknown morph"),
        }
    }
    skeleton.update_world_transform();

    let bones: Vec<_> = skeleton
        .bones
        .iter()
        .enumerate()
        .map(|(i, bone)| {
            let world = bone.world_transform();
            json!({
                "i": i,
                "name": data.bones[bone.data_index()].name,
                "parent": bone.parent_index(),
                "origin": world.translation.to_array(),
                "rotation": world.rotation.to_array(),
            })
        })
        .collect();

    let out = json!({
        "name": data.name,
        "version": data.info.version,
        "bones": bones,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
