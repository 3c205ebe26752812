use crate::{Bone, GroupMorph, MaterialData, MaterialMorph, MaterialOperation, ModelData, Morph};
use glam::{Quat, Vec2, Vec3, Vec4};

/// Multiply/add pair a renderer applies to a sampled texture color.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TextureBlend {
    pub mul: Vec4,
    pub add: Vec4,
}

impl TextureBlend {
    pub const IDENTITY: Self = Self {
        mul: Vec4::ONE,
        add: Vec4::ZERO,
    };

    pub fn apply(&self, color: Vec4) -> Vec4 {
        color * self.mul + self.add
    }

    fn blend(&mut self, operation: MaterialOperation, target: Vec4, weight: f32) {
        match operation {
            MaterialOperation::Multiply => self.mul *= Vec4::ONE.lerp(target, weight),
            MaterialOperation::Add => self.add += target * weight,
        }
    }
}

impl Default for TextureBlend {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The morphable scalar and color parameters of a material.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MaterialParams {
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub shininess: f32,
    pub ambient: Vec3,
    pub edge_color: Vec4,
    pub edge_size: f32,
}

impl MaterialParams {
    pub const ONE: Self = Self::splat(1.0);
    pub const ZERO: Self = Self::splat(0.0);

    const fn splat(value: f32) -> Self {
        Self {
            diffuse: Vec4::splat(value),
            specular: Vec3::splat(value),
            shininess: value,
            ambient: Vec3::splat(value),
            edge_color: Vec4::splat(value),
            edge_size: value,
        }
    }

    fn of_material(material: &MaterialData) -> Self {
        Self {
            diffuse: material.diffuse,
            specular: material.specular,
            shininess: material.shininess,
            ambient: material.ambient,
            edge_color: material.edge_color,
            edge_size: material.edge_size,
        }
    }

    fn of_morph(morph: &MaterialMorph) -> Self {
        Self {
            diffuse: morph.diffuse,
            specular: morph.specular,
            shininess: morph.shininess,
            ambient: morph.ambient,
            edge_color: morph.edge_color,
            edge_size: morph.edge_size,
        }
    }

    fn map2(self, other: Self, vec4: impl Fn(Vec4, Vec4) -> Vec4, vec3: impl Fn(Vec3, Vec3) -> Vec3, scalar: impl Fn(f32, f32) -> f32) -> Self {
        Self {
            diffuse: vec4(self.diffuse, other.diffuse),
            specular: vec3(self.specular, other.specular),
            shininess: scalar(self.shininess, other.shininess),
            ambient: vec3(self.ambient, other.ambient),
            edge_color: vec4(self.edge_color, other.edge_color),
            edge_size: scalar(self.edge_size, other.edge_size),
        }
    }

    /// `self * lerp(1, target, weight)`, component-wise.
    fn scaled_toward(self, target: Self, weight: f32) -> Self {
        self.map2(
            target,
            |a, t| a * Vec4::ONE.lerp(t, weight),
            |a, t| a * Vec3::ONE.lerp(t, weight),
            |a, t| a * (1.0 + (t - 1.0) * weight),
        )
    }

    fn offset_by(self, delta: Self, weight: f32) -> Self {
        self.map2(
            delta,
            |a, d| a + d * weight,
            |a, d| a + d * weight,
            |a, d| a + d * weight,
        )
    }

    fn multiply_add(self, mul: Self, add: Self) -> Self {
        let product = self.map2(mul, |a, m| a * m, |a, m| a * m, |a, m| a * m);
        product.offset_by(add, 1.0)
    }
}

/// Morph accumulators for one material. The morphed value is `base * mul + add`.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialState {
    pub base: MaterialParams,
    pub mul: MaterialParams,
    pub add: MaterialParams,
    pub texture: TextureBlend,
    pub sphere_texture: TextureBlend,
    pub toon_texture: TextureBlend,
}

impl MaterialState {
    fn new(material: &MaterialData) -> Self {
        Self {
            base: MaterialParams::of_material(material),
            mul: MaterialParams::ONE,
            add: MaterialParams::ZERO,
            texture: TextureBlend::IDENTITY,
            sphere_texture: TextureBlend::IDENTITY,
            toon_texture: TextureBlend::IDENTITY,
        }
    }

    fn reset(&mut self) {
        self.mul = MaterialParams::ONE;
        self.add = MaterialParams::ZERO;
        self.texture = TextureBlend::IDENTITY;
        self.sphere_texture = TextureBlend::IDENTITY;
        self.toon_texture = TextureBlend::IDENTITY;
    }

    pub fn current(&self) -> MaterialParams {
        self.base.multiply_add(self.mul, self.add)
    }

    fn blend(&mut self, morph: &MaterialMorph, weight: f32) {
        let target = MaterialParams::of_morph(morph);
        match morph.operation {
            MaterialOperation::Multiply => self.mul = self.mul.scaled_toward(target, weight),
            MaterialOperation::Add => self.add = self.add.offset_by(target, weight),
        }
        self.texture.blend(morph.operation, morph.texture_weight, weight);
        self.sphere_texture
            .blend(morph.operation, morph.sphere_texture_weight, weight);
        self.toon_texture
            .blend(morph.operation, morph.toon_texture_weight, weight);
    }
}

/// Morphable per-vertex attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct MorphVertex {
    pub position: Vec3,
    pub texcoord: Vec2,
    pub additional_uvs: Vec<Vec4>,
}

/// Weighted morph state and the working buffers morphs are blended into.
#[derive(Clone, Debug, Default)]
pub struct MorphBlender {
    weights: Vec<f32>,
    vertices: Vec<MorphVertex>,
    materials: Vec<MaterialState>,
    visiting: Vec<usize>,
}

impl MorphBlender {
    pub fn new(data: &ModelData) -> Self {
        Self {
            weights: vec![0.0; data.morphs.len()],
            vertices: data
                .vertices
                .iter()
                .map(|vertex| MorphVertex {
                    position: vertex.position,
                    texcoord: vertex.texcoord,
                    additional_uvs: vertex.additional_uvs.clone(),
                })
                .collect(),
            materials: data.materials.iter().map(MaterialState::new).collect(),
            visiting: Vec::new(),
        }
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn weight(&self, morph: usize) -> f32 {
        self.weights.get(morph).copied().unwrap_or(0.0)
    }

    /// Sets a morph weight. Weights are not clamped; returns `false` for an unknown morph.
    pub fn set_weight(&mut self, morph: usize, weight: f32) -> bool {
        match self.weights.get_mut(morph) {
            Some(slot) => {
                *slot = weight;
                true
            }
            None => false,
        }
    }

    pub fn reset_weights(&mut self) {
        self.weights.fill(0.0);
    }

    pub fn vertices(&self) -> &[MorphVertex] {
        &self.vertices
    }

    pub fn materials(&self) -> &[MaterialState] {
        &self.materials
    }

    /// Restores the rest pose: vertex buffers, material accumulators and bone morph offsets.
    pub fn reset(&mut self, data: &ModelData, bones: &mut [Bone]) {
        if self.vertices.len() != data.vertices.len() || self.materials.len() != data.materials.len() {
            let weights = std::mem::take(&mut self.weights);
            *self = Self::new(data);
            for (slot, weight) in self.weights.iter_mut().zip(weights) {
                *slot = weight;
            }
        }
        for (vertex, rest) in self.vertices.iter_mut().zip(&data.vertices) {
            vertex.position = rest.position;
            vertex.texcoord = rest.texcoord;
            vertex.additional_uvs.clone_from(&rest.additional_uvs);
        }
        for material in &mut self.materials {
            material.reset();
        }
        for bone in bones {
            bone.morph_translation = Vec3::ZERO;
            bone.morph_orientation = Quat::IDENTITY;
        }
    }

    /// Resets to the rest pose, then applies every morph with a non-zero weight.
    pub fn apply(&mut self, data: &ModelData, bones: &mut [Bone]) {
        self.reset(data, bones);
        self.weights.resize(data.morphs.len(), 0.0);
        for index in 0..data.morphs.len() {
            let weight = self.weights[index];
            if weight != 0.0 {
                self.visiting.clear();
                self.apply_morph(data, bones, index, weight);
            }
        }
    }

    fn apply_morph(&mut self, data: &ModelData, bones: &mut [Bone], index: usize, weight: f32) {
        let Some(morph) = data.morphs.get(index) else {
            tracing::debug!(morph = index, "skipping unknown morph");
            return;
        };
        match &morph.morph {
            Morph::Vertex(offsets) => {
                for offset in offsets {
                    match self.vertices.get_mut(offset.vertex) {
                        Some(vertex) => vertex.position += offset.offset * weight,
                        None => tracing::debug!(morph = index, vertex = offset.vertex, "skipping vertex morph entry"),
                    }
                }
            }
            Morph::Uv { channel, offsets } => {
                for offset in offsets {
                    let Some(vertex) = self.vertices.get_mut(offset.vertex) else {
                        tracing::debug!(morph = index, vertex = offset.vertex, "skipping uv morph entry");
                        continue;
                    };
                    match usize::from(*channel) {
                        0 => vertex.texcoord += offset.offset.truncate().truncate() * weight,
                        channel => match vertex.additional_uvs.get_mut(channel - 1) {
                            Some(uv) => *uv += offset.offset * weight,
                            None => tracing::debug!(morph = index, channel, "skipping uv morph entry"),
                        },
                    }
                }
            }
            Morph::Bone(offsets) => {
                for offset in offsets {
                    let Some(bone) = offset.bone.and_then(|bone| bones.get_mut(bone)) else {
                        tracing::debug!(morph = index, bone = ?offset.bone, "skipping bone morph entry");
                        continue;
                    };
                    let rotation = if offset.rotation.length_squared() > 0.0 {
                        offset.rotation.normalize()
                    } else {
                        Quat::IDENTITY
                    };
                    bone.morph_translation += offset.translation * weight;
                    bone.morph_orientation =
                        (bone.morph_orientation * Quat::IDENTITY.slerp(rotation, weight)).normalize();
                }
            }
            Morph::Material(offsets) => {
                for offset in offsets {
                    match offset.material {
                        None => {
                            for material in &mut self.materials {
                                material.blend(offset, weight);
                            }
                        }
                        Some(material) => match self.materials.get_mut(material) {
                            Some(state) => state.blend(offset, weight),
                            None => tracing::debug!(morph = index, material, "skipping material morph entry"),
                        },
                    }
                }
            }
            Morph::Group(entries) => {
                self.visiting.push(index);
                for entry in entries {
                    self.apply_entry(data, bones, entry, weight * entry.weight);
                }
                self.visiting.pop();
            }
            Morph::Flip(entries) => {
                if weight > 0.0 && !entries.is_empty() {
                    let count = entries.len();
                    let selected = ((weight * count as f32).ceil() as usize)
                        .saturating_sub(1)
                        .min(count - 1);
                    let entry = entries[selected];
                    self.visiting.push(index);
                    self.apply_entry(data, bones, &entry, entry.weight);
                    self.visiting.pop();
                }
            }
            // Impulses are physics input.
            Morph::Impulse(_) => {}
        }
    }

    fn apply_entry(&mut self, data: &ModelData, bones: &mut [Bone], entry: &GroupMorph, weight: f32) {
        let Some(target) = entry.morph else {
            return;
        };
        if self.visiting.contains(&target) {
            tracing::debug!(morph = target, "dropping cyclic group morph entry");
            return;
        }
        self.apply_morph(data, bones, target, weight);
    }
}
