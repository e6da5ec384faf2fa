//! Scene aggregate: the active camera plus an ordered sphere list.
//!
//! Insertion order is the device array order. A sphere is identified only
//! by its position in the list, so the order must survive untouched until
//! the spheres are marshaled.

use orb_math::{Camera, DVec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::controls::{CameraCommand, ControlSettings};
use crate::sphere::Sphere;

/// Camera and spheres to render.
#[derive(Debug, Clone)]
pub struct Scene {
    camera: Camera,
    spheres: Vec<Sphere>,
}

impl Scene {
    /// Create an empty scene viewed through `camera`.
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            spheres: Vec::new(),
        }
    }

    /// Create a scene with an initial sphere list.
    pub fn with_spheres(camera: Camera, spheres: Vec<Sphere>) -> Self {
        Self { camera, spheres }
    }

    /// Append a sphere. Order is preserved.
    pub fn add_sphere(&mut self, sphere: Sphere) {
        self.spheres.push(sphere);
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn sphere_count(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replace the active camera.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Apply a camera command to the active camera.
    pub fn apply(&mut self, command: CameraCommand, settings: &ControlSettings) {
        self.camera = command.apply(self.camera, settings);
    }
}

/// Sphere list as stored in a scene file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    pub spheres: Vec<Sphere>,
}

impl SceneDescription {
    /// Build a scene from this description viewed through `camera`.
    pub fn into_scene(self, camera: Camera) -> Scene {
        Scene::with_spheres(camera, self.spheres)
    }
}

/// Scatter the classic "final scene": a large ground sphere, a grid of
/// small randomly-materialed spheres and three large feature spheres.
pub fn random_scene<R: Rng>(camera: Camera, rng: &mut R) -> Scene {
    let mut scene = Scene::new(camera);

    scene.add_sphere(Sphere::lambertian(
        DVec3::new(0.0, -1000.0, 0.0),
        1000.0,
        DVec3::splat(0.5),
    ));

    let clearing = DVec3::new(4.0, 0.2, 0.0);

    for a in -11..11 {
        for b in -11..11 {
            let choose_mat: f64 = rng.gen();
            let center = DVec3::new(
                a as f64 + 0.9 * rng.gen::<f64>(),
                0.2,
                b as f64 + 0.9 * rng.gen::<f64>(),
            );

            // Keep small spheres out of the feature spheres' way
            if (center - clearing).length() <= 0.9 {
                continue;
            }

            let sphere = if choose_mat < 0.8 {
                let albedo = DVec3::new(
                    rng.gen::<f64>() * rng.gen::<f64>(),
                    rng.gen::<f64>() * rng.gen::<f64>(),
                    rng.gen::<f64>() * rng.gen::<f64>(),
                );
                Sphere::lambertian(center, 0.2, albedo)
            } else if choose_mat < 0.95 {
                let albedo = DVec3::new(
                    rng.gen_range(0.5..1.0),
                    rng.gen_range(0.5..1.0),
                    rng.gen_range(0.5..1.0),
                );
                let fuzz = rng.gen_range(0.0..0.5);
                Sphere::metal(center, 0.2, albedo, fuzz)
            } else {
                Sphere::dielectric(center, 0.2, 1.5)
            };

            scene.add_sphere(sphere);
        }
    }

    scene.add_sphere(Sphere::dielectric(DVec3::new(0.0, 1.0, 0.0), 1.0, 1.5));
    scene.add_sphere(Sphere::lambertian(
        DVec3::new(-4.0, 1.0, 0.0),
        1.0,
        DVec3::new(0.4, 0.2, 0.1),
    ));
    scene.add_sphere(Sphere::metal(
        DVec3::new(4.0, 1.0, 0.0),
        1.0,
        DVec3::new(0.7, 0.6, 0.5),
        0.0,
    ));

    log::debug!("Built random scene with {} spheres", scene.sphere_count());

    scene
}
