use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::config::MAX_SPHERES;
use crate::error::{Result, TracewError};

/// One analytic sphere.
///
/// `albedo` may exceed 1.0 per channel, which scales emitted light.
/// `emission == 0.0` marks a non-emissive surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub albedo: Vec3,
    pub smoothness: f32,
    pub emission: f32,
}

impl Sphere {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.center.is_finite() {
            return Err(format!("center {} is not finite", self.center));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(format!("radius {} must be positive", self.radius));
        }
        if !self.albedo.is_finite() || self.albedo.min_element() < 0.0 {
            return Err(format!("albedo {} must be finite and non-negative", self.albedo));
        }
        if !(0.0..=1.0).contains(&self.smoothness) {
            return Err(format!("smoothness {} outside [0, 1]", self.smoothness));
        }
        if !(self.emission.is_finite() && self.emission >= 0.0) {
            return Err(format!("emission {} must be non-negative", self.emission));
        }
        Ok(())
    }
}

/// Immutable, validated list of spheres fed to the trace program.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    spheres: Vec<Sphere>,
}

impl Scene {
    pub fn new(spheres: Vec<Sphere>) -> Result<Self> {
        if spheres.len() > MAX_SPHERES {
            return Err(TracewError::scene(format!(
                "{} spheres exceed the supported maximum of {}",
                spheres.len(),
                MAX_SPHERES
            )));
        }
        for (i, sphere) in spheres.iter().enumerate() {
            sphere
                .validate()
                .map_err(|msg| TracewError::scene(format!("sphere {i}: {msg}")))?;
        }
        Ok(Self { spheres })
    }

    /// Builds a scene from five index-aligned sequences.
    pub fn from_parallel(
        centers: &[Vec3],
        radii: &[f32],
        colors: &[Vec3],
        smoothness: &[f32],
        emission: &[f32],
    ) -> Result<Self> {
        let n = centers.len();
        let lengths = [radii.len(), colors.len(), smoothness.len(), emission.len()];
        if lengths.iter().any(|&len| len != n) {
            return Err(TracewError::scene(format!(
                "parallel sequences differ in length: centers={n}, radii={}, colors={}, smoothness={}, emission={}",
                lengths[0], lengths[1], lengths[2], lengths[3]
            )));
        }

        let spheres = zip_spheres(centers, radii, colors, smoothness, emission);
        Self::new(spheres)
    }

    /// Large emissive cyan ball, four diffuse balls, an orange lamp and a mirror.
    pub fn showcase() -> Self {
        let centers = [
            Vec3::new(0.0, -200.0, 50.0),
            Vec3::new(700.0, -350.0, 150.0),
            Vec3::new(100.0, -400.0, -400.0),
            Vec3::new(300.0, -425.0, -100.0),
            Vec3::new(750.0, -450.0, -150.0),
            Vec3::new(-350.0, -375.0, -350.0),
            Vec3::new(450.0, -440.0, -300.0),
        ];
        let radii = [300.0, 150.0, 100.0, 75.0, 50.0, 125.0, 60.0];
        let colors = [
            Vec3::new(0.1, 1.0, 1.5),
            Vec3::new(0.9, 0.2, 0.2),
            Vec3::new(0.2, 0.9, 0.2),
            Vec3::new(0.2, 0.2, 0.9),
            Vec3::new(2.0, 1.0, 0.2),
            Vec3::new(0.9, 0.9, 0.9),
            Vec3::new(0.9, 0.9, 0.9),
        ];
        let smoothness = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let emission = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0];

        Self {
            spheres: zip_spheres(&centers, &radii, &colors, &smoothness, &emission),
        }
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Packs the spheres into the fixed-size block the trace program reads.
    pub fn to_gpu(&self) -> SceneBuffer {
        let mut buffer = SceneBuffer::zeroed();
        for (slot, sphere) in buffer.spheres.iter_mut().zip(&self.spheres) {
            *slot = SphereData::from(sphere);
        }
        buffer.count = self.spheres.len() as u32;
        buffer
    }
}

fn zip_spheres(
    centers: &[Vec3],
    radii: &[f32],
    colors: &[Vec3],
    smoothness: &[f32],
    emission: &[f32],
) -> Vec<Sphere> {
    centers
        .iter()
        .zip(radii)
        .zip(colors)
        .zip(smoothness)
        .zip(emission)
        .map(|((((&center, &radius), &albedo), &smoothness), &emission)| Sphere {
            center,
            radius,
            albedo,
            smoothness,
            emission,
        })
        .collect()
}

impl Default for Scene {
    fn default() -> Self {
        Self::showcase()
    }
}

// ======================================
// === SHADER DATA STRUCTURES ===
// ======================================

// 48 bytes, a multiple of 16 as WGSL uniform arrays require.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable, PartialEq)]
pub struct SphereData {
    pub center: [f32; 3],
    pub radius: f32,
    pub albedo: [f32; 3],
    pub smoothness: f32,
    pub emission: f32,
    pub _padding: [f32; 3],
}

impl From<&Sphere> for SphereData {
    fn from(sphere: &Sphere) -> Self {
        Self {
            center: sphere.center.to_array(),
            radius: sphere.radius,
            albedo: sphere.albedo.to_array(),
            smoothness: sphere.smoothness,
            emission: sphere.emission,
            _padding: [0.0; 3],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SceneBuffer {
    pub spheres: [SphereData; MAX_SPHERES],
    pub count: u32,
    pub _padding: [u32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(radius: f32) -> Sphere {
        Sphere {
            center: Vec3::ZERO,
            radius,
            albedo: Vec3::ONE,
            smoothness: 0.5,
            emission: 0.0,
        }
    }

    #[test]
    fn showcase_is_valid_and_aligned() {
        let scene = Scene::showcase();
        assert_eq!(scene.len(), 7);
        assert!(Scene::new(scene.spheres().to_vec()).is_ok());

        let radii: Vec<f32> = scene.spheres().iter().map(|s| s.radius).collect();
        let emission: Vec<f32> = scene.spheres().iter().map(|s| s.emission).collect();
        assert_eq!(radii, vec![300.0, 150.0, 100.0, 75.0, 50.0, 125.0, 60.0]);
        assert_eq!(emission, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(scene.spheres().last().map(|s| s.smoothness), Some(1.0));
    }

    #[test]
    fn parallel_sequences_must_match() {
        let err = Scene::from_parallel(
            &[Vec3::ZERO, Vec3::ONE],
            &[1.0, 2.0],
            &[Vec3::ONE],
            &[0.0, 0.0],
            &[0.0, 0.0],
        );
        assert!(matches!(err, Err(TracewError::Scene(_))));
    }

    #[test]
    fn parallel_sequences_keep_index_alignment() {
        let scene = Scene::from_parallel(
            &[Vec3::X, Vec3::Y],
            &[1.0, 2.0],
            &[Vec3::ONE, Vec3::splat(3.0)],
            &[0.0, 1.0],
            &[0.0, 4.0],
        )
        .unwrap();

        let second = scene.spheres()[1];
        assert_eq!(second.center, Vec3::Y);
        assert_eq!(second.radius, 2.0);
        assert_eq!(second.albedo, Vec3::splat(3.0));
        assert_eq!(second.smoothness, 1.0);
        assert_eq!(second.emission, 4.0);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        assert!(Scene::new(vec![ball(0.0)]).is_err());
        assert!(Scene::new(vec![ball(-1.0)]).is_err());
        assert!(Scene::new(vec![Sphere { smoothness: 1.5, ..ball(1.0) }]).is_err());
        assert!(Scene::new(vec![Sphere { emission: -0.1, ..ball(1.0) }]).is_err());
        assert!(Scene::new(vec![Sphere { albedo: Vec3::new(0.1, -1.0, 0.0), ..ball(1.0) }]).is_err());
        // Albedo above one is allowed.
        assert!(Scene::new(vec![Sphere { albedo: Vec3::splat(2.0), ..ball(1.0) }]).is_ok());
    }

    #[test]
    fn rejects_too_many_spheres() {
        assert!(Scene::new(vec![ball(1.0); MAX_SPHERES]).is_ok());
        assert!(Scene::new(vec![ball(1.0); MAX_SPHERES + 1]).is_err());
    }

    #[test]
    fn gpu_packing_preserves_order_and_count() {
        let scene = Scene::showcase();
        let gpu = scene.to_gpu();

        assert_eq!(std::mem::size_of::<SphereData>(), 48);
        assert_eq!(gpu.count, 7);
        assert_eq!(gpu.spheres[4].albedo, [2.0, 1.0, 0.2]);
        assert_eq!(gpu.spheres[4].emission, 1.0);
        assert_eq!(gpu.spheres[7], SphereData::zeroed());
    }
}
