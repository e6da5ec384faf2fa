//! Sphere primitive and its material record.

use orb_math::DVec3;
use serde::{Deserialize, Serialize};

/// Surface material variant.
///
/// The discriminant is the material index the compute kernel switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum MaterialKind {
    Lambertian = 0,
    Metal = 1,
    Dielectric = 2,
}

impl MaterialKind {
    /// Material index as transferred to the device.
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Inverse of [`MaterialKind::index`].
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Lambertian),
            1 => Some(Self::Metal),
            2 => Some(Self::Dielectric),
            _ => None,
        }
    }
}

/// A sphere with a uniform five-field material record.
///
/// Every variant carries albedo, fuzz and refraction index so the device
/// transfer never needs a tagged union. Unused fields hold defaults:
/// fuzz and refraction index are 0 where they do not apply, and a
/// dielectric's albedo is white.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "SphereRecord")]
pub struct Sphere {
    center: DVec3,
    radius: f64,
    material: MaterialKind,
    albedo: DVec3,
    fuzz: f64,
    refraction_index: f64,
}

/// Scene-file form of a sphere; fields a variant does not use may be omitted.
#[derive(Deserialize)]
struct SphereRecord {
    center: DVec3,
    radius: f64,
    material: MaterialKind,
    #[serde(default = "white")]
    albedo: DVec3,
    #[serde(default)]
    fuzz: f64,
    #[serde(default)]
    refraction_index: f64,
}

impl From<SphereRecord> for Sphere {
    fn from(r: SphereRecord) -> Self {
        Sphere::from_parts(r.center, r.radius, r.material, r.albedo, r.fuzz, r.refraction_index)
    }
}

fn white() -> DVec3 {
    DVec3::ONE
}

impl Sphere {
    /// Diffuse sphere.
    pub fn lambertian(center: DVec3, radius: f64, albedo: DVec3) -> Self {
        Self {
            center,
            radius,
            material: MaterialKind::Lambertian,
            albedo,
            fuzz: 0.0,
            refraction_index: 0.0,
        }
    }

    /// Reflective sphere. `fuzz` of 0 is a perfect mirror.
    pub fn metal(center: DVec3, radius: f64, albedo: DVec3, fuzz: f64) -> Self {
        Self {
            center,
            radius,
            material: MaterialKind::Metal,
            albedo,
            fuzz,
            refraction_index: 0.0,
        }
    }

    /// Refractive sphere (1.5 for glass).
    pub fn dielectric(center: DVec3, radius: f64, refraction_index: f64) -> Self {
        Self {
            center,
            radius,
            material: MaterialKind::Dielectric,
            albedo: white(),
            fuzz: 0.0,
            refraction_index,
        }
    }

    /// Rebuild a sphere from raw fields, normalizing the unused ones for `material`.
    pub fn from_parts(
        center: DVec3,
        radius: f64,
        material: MaterialKind,
        albedo: DVec3,
        fuzz: f64,
        refraction_index: f64,
    ) -> Self {
        match material {
            MaterialKind::Lambertian => Self::lambertian(center, radius, albedo),
            MaterialKind::Metal => Self::metal(center, radius, albedo, fuzz),
            MaterialKind::Dielectric => Self::dielectric(center, radius, refraction_index),
        }
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn material(&self) -> MaterialKind {
        self.material
    }

    pub fn albedo(&self) -> DVec3 {
        self.albedo
    }

    pub fn fuzz(&self) -> f64 {
        self.fuzz
    }

    pub fn refraction_index(&self) -> f64 {
        self.refraction_index
    }
}
