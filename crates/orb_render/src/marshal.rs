//! Host-side packing of camera and scene state for the kernel.
//!
//! Spheres are stored array-of-structs in the scene and transposed here
//! into one contiguous array per field. Field order is
//! [`SphereField::ALL`]; index `i` of every array belongs to sphere `i`.

use orb_core::{MaterialKind, Sphere};
use orb_math::{Camera, DVec3};

use crate::abi::{KernelAbi, SphereField};

/// Stand-in geometry used when a scene has no spheres.
///
/// Zero-length storage arrays are rejected by most device runtimes, so an
/// empty scene is rendered as this single ground sphere instead.
pub fn placeholder_sphere() -> Sphere {
    Sphere::lambertian(DVec3::new(0.0, -100.5, -1.0), 100.0, DVec3::new(0.8, 0.8, 0.0))
}

/// Structure-of-arrays form of a sphere list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SphereArrays {
    pub center_x: Vec<f32>,
    pub center_y: Vec<f32>,
    pub center_z: Vec<f32>,
    pub radius: Vec<f32>,
    pub material: Vec<MaterialKind>,
    pub albedo_r: Vec<f32>,
    pub albedo_g: Vec<f32>,
    pub albedo_b: Vec<f32>,
    pub fuzz: Vec<f32>,
    pub refraction_index: Vec<f32>,
}

impl SphereArrays {
    /// Transpose `spheres`, substituting [`placeholder_sphere`] when empty.
    pub fn from_spheres(spheres: &[Sphere]) -> Self {
        if spheres.is_empty() {
            return Self::transpose(&[placeholder_sphere()]);
        }
        Self::transpose(spheres)
    }

    fn transpose(spheres: &[Sphere]) -> Self {
        let n = spheres.len();
        let mut arrays = Self {
            center_x: Vec::with_capacity(n),
            center_y: Vec::with_capacity(n),
            center_z: Vec::with_capacity(n),
            radius: Vec::with_capacity(n),
            material: Vec::with_capacity(n),
            albedo_r: Vec::with_capacity(n),
            albedo_g: Vec::with_capacity(n),
            albedo_b: Vec::with_capacity(n),
            fuzz: Vec::with_capacity(n),
            refraction_index: Vec::with_capacity(n),
        };

        for sphere in spheres {
            let center = sphere.center().as_vec3();
            let albedo = sphere.albedo().as_vec3();

            arrays.center_x.push(center.x);
            arrays.center_y.push(center.y);
            arrays.center_z.push(center.z);
            arrays.radius.push(sphere.radius() as f32);
            arrays.material.push(sphere.material());
            arrays.albedo_r.push(albedo.x);
            arrays.albedo_g.push(albedo.y);
            arrays.albedo_b.push(albedo.z);
            arrays.fuzz.push(sphere.fuzz() as f32);
            arrays.refraction_index.push(sphere.refraction_index() as f32);
        }

        arrays
    }

    /// Number of entries in every array.
    pub fn len(&self) -> usize {
        self.radius.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radius.is_empty()
    }

    /// Rebuild sphere `i` from the arrays.
    pub fn sphere(&self, i: usize) -> Option<Sphere> {
        if i >= self.len() {
            return None;
        }

        Some(Sphere::from_parts(
            DVec3::new(
                self.center_x[i] as f64,
                self.center_y[i] as f64,
                self.center_z[i] as f64,
            ),
            self.radius[i] as f64,
            self.material[i],
            DVec3::new(
                self.albedo_r[i] as f64,
                self.albedo_g[i] as f64,
                self.albedo_b[i] as f64,
            ),
            self.fuzz[i] as f64,
            self.refraction_index[i] as f64,
        ))
    }

    /// Inverse of the transpose.
    pub fn to_spheres(&self) -> Vec<Sphere> {
        (0..self.len()).filter_map(|i| self.sphere(i)).collect()
    }

    /// Little-endian device bytes of one field as `abi` encodes it.
    pub fn field_bytes(&self, field: SphereField, abi: KernelAbi) -> Vec<u8> {
        match field {
            SphereField::CenterX => f32_bytes(&self.center_x),
            SphereField::CenterY => f32_bytes(&self.center_y),
            SphereField::CenterZ => f32_bytes(&self.center_z),
            SphereField::Radius => f32_bytes(&self.radius),
            SphereField::MaterialIndex => {
                let indices: Vec<i32> =
                    self.material.iter().map(|m| abi.material_index(*m)).collect();
                bytemuck::cast_slice(&indices).to_vec()
            }
            SphereField::AlbedoR => f32_bytes(&self.albedo_r),
            SphereField::AlbedoG => f32_bytes(&self.albedo_g),
            SphereField::AlbedoB => f32_bytes(&self.albedo_b),
            SphereField::Fuzz => f32_bytes(&self.fuzz),
            SphereField::RefractionIndex => f32_bytes(&self.refraction_index),
        }
    }
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

/// Pad a 3-vector to four lanes; the 4th is zero and unused.
pub fn pack_vec3(v: DVec3) -> [f32; 4] {
    let v = v.as_vec3();
    [v.x, v.y, v.z, 0.0]
}

/// Camera frustum values in kernel layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraArgs {
    pub origin: [f32; 4],
    pub lower_left_corner: [f32; 4],
    pub horizontal: [f32; 4],
    pub vertical: [f32; 4],
}

impl CameraArgs {
    pub fn from_camera(camera: &Camera) -> Self {
        let frustum = camera.frustum();
        Self {
            origin: pack_vec3(frustum.origin),
            lower_left_corner: pack_vec3(frustum.lower_left_corner),
            horizontal: pack_vec3(frustum.horizontal),
            vertical: pack_vec3(frustum.vertical),
        }
    }
}
