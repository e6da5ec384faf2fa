//! Kernel argument contract.
//!
//! The compute kernel takes its inputs as positional arguments. A
//! [`KernelAbi`] is the ordered schema of those arguments: the slot index
//! is the position in [`KernelAbi::slots`], and each slot names where its
//! value comes from and what it looks like in device memory.
//!
//! Two contracts exist and the host and kernel must agree on exactly one:
//!
//! | Slot  | Extended                                   | Simple            |
//! |-------|--------------------------------------------|-------------------|
//! | 0     | output pixels                              | same              |
//! | 1-2   | width, height                              | same              |
//! | 3-6   | origin, lower-left, horizontal, vertical   | same              |
//! | 7-11  | center x/y/z, radius, material index       | same              |
//! | 12-16 | albedo r/g/b, fuzz, refraction index       | -                 |
//! | 17    | sphere count                               | 12: sphere count  |
//! | 18-20 | debug flag, samples per pixel, max depth   | -                 |

use std::fmt;

use orb_core::MaterialKind;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Device-memory shape of one kernel argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// Write-only buffer of `width * height` 32-bit cells
    OutputPixels,
    /// 32-bit signed integer
    Int,
    /// Four 32-bit floats; a 3-vector padded with an unused 4th lane
    Float4,
    /// Array of 32-bit floats, one per sphere
    FloatArray,
    /// Array of 32-bit signed integers, one per sphere
    IntArray,
}

impl ArgKind {
    /// Size in bytes of one element (the whole value for scalars).
    pub fn element_size(self) -> usize {
        match self {
            ArgKind::Float4 => 16,
            ArgKind::OutputPixels | ArgKind::Int | ArgKind::FloatArray | ArgKind::IntArray => 4,
        }
    }

    /// Whether the argument is bound as a device buffer rather than a value.
    pub fn is_buffer(self) -> bool {
        matches!(
            self,
            ArgKind::OutputPixels | ArgKind::FloatArray | ArgKind::IntArray
        )
    }
}

/// One structure-of-arrays field of the sphere list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SphereField {
    CenterX,
    CenterY,
    CenterZ,
    Radius,
    MaterialIndex,
    AlbedoR,
    AlbedoG,
    AlbedoB,
    Fuzz,
    RefractionIndex,
}

impl SphereField {
    /// All fields in transfer order.
    pub const ALL: [SphereField; 10] = [
        SphereField::CenterX,
        SphereField::CenterY,
        SphereField::CenterZ,
        SphereField::Radius,
        SphereField::MaterialIndex,
        SphereField::AlbedoR,
        SphereField::AlbedoG,
        SphereField::AlbedoB,
        SphereField::Fuzz,
        SphereField::RefractionIndex,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SphereField::CenterX => "center_x",
            SphereField::CenterY => "center_y",
            SphereField::CenterZ => "center_z",
            SphereField::Radius => "radius",
            SphereField::MaterialIndex => "material_index",
            SphereField::AlbedoR => "albedo_r",
            SphereField::AlbedoG => "albedo_g",
            SphereField::AlbedoB => "albedo_b",
            SphereField::Fuzz => "fuzz",
            SphereField::RefractionIndex => "refraction_index",
        }
    }

    pub fn kind(self) -> ArgKind {
        match self {
            SphereField::MaterialIndex => ArgKind::IntArray,
            _ => ArgKind::FloatArray,
        }
    }
}

/// Where the value of a kernel argument comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgSource {
    PixelBuffer,
    Width,
    Height,
    CameraOrigin,
    LowerLeftCorner,
    Horizontal,
    Vertical,
    Sphere(SphereField),
    SphereCount,
    DebugFlag,
    SamplesPerPixel,
    MaxDepth,
}

impl ArgSource {
    pub fn kind(self) -> ArgKind {
        match self {
            ArgSource::PixelBuffer => ArgKind::OutputPixels,
            ArgSource::Width
            | ArgSource::Height
            | ArgSource::SphereCount
            | ArgSource::DebugFlag
            | ArgSource::SamplesPerPixel
            | ArgSource::MaxDepth => ArgKind::Int,
            ArgSource::CameraOrigin
            | ArgSource::LowerLeftCorner
            | ArgSource::Horizontal
            | ArgSource::Vertical => ArgKind::Float4,
            ArgSource::Sphere(field) => field.kind(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArgSource::PixelBuffer => "pixels",
            ArgSource::Width => "width",
            ArgSource::Height => "height",
            ArgSource::CameraOrigin => "camera_origin",
            ArgSource::LowerLeftCorner => "lower_left_corner",
            ArgSource::Horizontal => "horizontal",
            ArgSource::Vertical => "vertical",
            ArgSource::Sphere(field) => field.name(),
            ArgSource::SphereCount => "sphere_count",
            ArgSource::DebugFlag => "debug",
            ArgSource::SamplesPerPixel => "samples_per_pixel",
            ArgSource::MaxDepth => "max_depth",
        }
    }
}

const SIMPLE_SLOTS: [ArgSource; 13] = [
    ArgSource::PixelBuffer,
    ArgSource::Width,
    ArgSource::Height,
    ArgSource::CameraOrigin,
    ArgSource::LowerLeftCorner,
    ArgSource::Horizontal,
    ArgSource::Vertical,
    ArgSource::Sphere(SphereField::CenterX),
    ArgSource::Sphere(SphereField::CenterY),
    ArgSource::Sphere(SphereField::CenterZ),
    ArgSource::Sphere(SphereField::Radius),
    ArgSource::Sphere(SphereField::MaterialIndex),
    ArgSource::SphereCount,
];

const EXTENDED_SLOTS: [ArgSource; 21] = [
    ArgSource::PixelBuffer,
    ArgSource::Width,
    ArgSource::Height,
    ArgSource::CameraOrigin,
    ArgSource::LowerLeftCorner,
    ArgSource::Horizontal,
    ArgSource::Vertical,
    ArgSource::Sphere(SphereField::CenterX),
    ArgSource::Sphere(SphereField::CenterY),
    ArgSource::Sphere(SphereField::CenterZ),
    ArgSource::Sphere(SphereField::Radius),
    ArgSource::Sphere(SphereField::MaterialIndex),
    ArgSource::Sphere(SphereField::AlbedoR),
    ArgSource::Sphere(SphereField::AlbedoG),
    ArgSource::Sphere(SphereField::AlbedoB),
    ArgSource::Sphere(SphereField::Fuzz),
    ArgSource::Sphere(SphereField::RefractionIndex),
    ArgSource::SphereCount,
    ArgSource::DebugFlag,
    ArgSource::SamplesPerPixel,
    ArgSource::MaxDepth,
];

/// Which argument contract the kernel was built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelAbi {
    /// Geometry plus a binary diffuse/reflective material choice.
    Simple,
    /// Full material record plus quality settings.
    #[default]
    Extended,
}

impl KernelAbi {
    /// Ordered argument schema; the slot index is the position.
    pub fn slots(self) -> &'static [ArgSource] {
        match self {
            KernelAbi::Simple => &SIMPLE_SLOTS,
            KernelAbi::Extended => &EXTENDED_SLOTS,
        }
    }

    /// Argument kinds in slot order.
    pub fn kinds(self) -> Vec<ArgKind> {
        self.slots().iter().map(|s| s.kind()).collect()
    }

    /// Sphere fields the contract transfers, in slot order.
    pub fn sphere_fields(self) -> impl Iterator<Item = SphereField> {
        self.slots().iter().filter_map(|s| match s {
            ArgSource::Sphere(field) => Some(*field),
            _ => None,
        })
    }

    /// Slot index of `source`, if the contract carries it.
    pub fn slot_of(self, source: ArgSource) -> Option<usize> {
        self.slots().iter().position(|s| *s == source)
    }

    /// Material index as the kernel expects it.
    ///
    /// The simple contract only distinguishes diffuse (0) from
    /// reflective (1).
    pub fn material_index(self, material: MaterialKind) -> i32 {
        match self {
            KernelAbi::Extended => material.index(),
            KernelAbi::Simple => match material {
                MaterialKind::Lambertian => 0,
                MaterialKind::Metal | MaterialKind::Dielectric => 1,
            },
        }
    }

    /// Check a kernel's declared signature against this contract.
    pub fn check_signature(self, signature: &[ArgKind]) -> RenderResult<()> {
        let slots = self.slots();
        if slots.len() != signature.len() {
            return Err(RenderError::AbiArity {
                expected: slots.len(),
                found: signature.len(),
            });
        }

        for (slot, (source, found)) in slots.iter().zip(signature).enumerate() {
            if source.kind() != *found {
                return Err(RenderError::AbiMismatch {
                    slot,
                    expected: source.kind(),
                    found: *found,
                });
            }
        }

        Ok(())
    }
}

impl fmt::Display for KernelAbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelAbi::Simple => f.write_str("simple"),
            KernelAbi::Extended => f.write_str("extended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_slot_layout() {
        let abi = KernelAbi::Extended;
        assert_eq!(abi.slots().len(), 21);

        assert_eq!(abi.slot_of(ArgSource::PixelBuffer), Some(0));
        assert_eq!(abi.slot_of(ArgSource::Width), Some(1));
        assert_eq!(abi.slot_of(ArgSource::Height), Some(2));
        assert_eq!(abi.slot_of(ArgSource::CameraOrigin), Some(3));
        assert_eq!(abi.slot_of(ArgSource::Vertical), Some(6));
        assert_eq!(abi.slot_of(ArgSource::Sphere(SphereField::CenterX)), Some(7));
        assert_eq!(abi.slot_of(ArgSource::Sphere(SphereField::MaterialIndex)), Some(11));
        assert_eq!(abi.slot_of(ArgSource::Sphere(SphereField::AlbedoR)), Some(12));
        assert_eq!(abi.slot_of(ArgSource::Sphere(SphereField::RefractionIndex)), Some(16));
        assert_eq!(abi.slot_of(ArgSource::SphereCount), Some(17));
        assert_eq!(abi.slot_of(ArgSource::DebugFlag), Some(18));
        assert_eq!(abi.slot_of(ArgSource::SamplesPerPixel), Some(19));
        assert_eq!(abi.slot_of(ArgSource::MaxDepth), Some(20));

        let fields: Vec<_> = abi.sphere_fields().collect();
        assert_eq!(fields, SphereField::ALL.to_vec());
    }

    #[test]
    fn test_simple_slot_layout() {
        let abi = KernelAbi::Simple;
        assert_eq!(abi.slots().len(), 13);
        assert_eq!(abi.slot_of(ArgSource::SphereCount), Some(12));
        assert_eq!(abi.slot_of(ArgSource::Sphere(SphereField::AlbedoR)), None);
        assert_eq!(abi.slot_of(ArgSource::DebugFlag), None);
        assert_eq!(abi.sphere_fields().count(), 5);

        // Shared prefix is identical between contracts
        assert_eq!(
            &KernelAbi::Extended.slots()[..12],
            &KernelAbi::Simple.slots()[..12]
        );
    }

    #[test]
    fn test_slot_kinds() {
        let kinds = KernelAbi::Extended.kinds();
        assert_eq!(kinds[0], ArgKind::OutputPixels);
        assert_eq!(kinds[1], ArgKind::Int);
        assert_eq!(kinds[3], ArgKind::Float4);
        assert_eq!(kinds[7], ArgKind::FloatArray);
        assert_eq!(kinds[11], ArgKind::IntArray);
        assert_eq!(kinds[16], ArgKind::FloatArray);
        assert!(kinds[17..].iter().all(|k| *k == ArgKind::Int));

        assert_eq!(ArgKind::Float4.element_size(), 16);
        assert!(ArgKind::IntArray.is_buffer());
        assert!(!ArgKind::Int.is_buffer());
    }

    #[test]
    fn test_material_index_per_contract() {
        assert_eq!(KernelAbi::Extended.material_index(MaterialKind::Dielectric), 2);
        assert_eq!(KernelAbi::Simple.material_index(MaterialKind::Lambertian), 0);
        assert_eq!(KernelAbi::Simple.material_index(MaterialKind::Metal), 1);
        assert_eq!(KernelAbi::Simple.material_index(MaterialKind::Dielectric), 1);
    }

    #[test]
    fn test_check_signature() {
        let abi = KernelAbi::Extended;
        assert!(abi.check_signature(&abi.kinds()).is_ok());

        let err = abi.check_signature(&KernelAbi::Simple.kinds()).unwrap_err();
        assert!(matches!(err, RenderError::AbiArity { expected: 21, found: 13 }));
        assert_eq!(
            err.to_string(),
            "Contract declares 21 arguments, kernel expects 13"
        );

        let mut kinds = abi.kinds();
        kinds[11] = ArgKind::FloatArray;
        let err = abi.check_signature(&kinds).unwrap_err();
        assert!(matches!(
            err,
            RenderError::AbiMismatch {
                slot: 11,
                expected: ArgKind::IntArray,
                found: ArgKind::FloatArray
            }
        ));
    }
}
