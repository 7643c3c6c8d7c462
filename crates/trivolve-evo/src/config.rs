use std::fmt;
use std::path::PathBuf;

use crate::grader::TILE_SIZE;
use crate::lottery::MAX_CANDIDATES;
use crate::vertex::Vertex;

/// Reference image used when none is given on the command line.
pub const DEFAULT_REFERENCE_PATH: &str = "assets/reference.png";

/// Tunables of one evolution run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionConfig {
    /// Candidates per grid row.
    pub grid_width: u32,
    /// Candidate rows.
    pub grid_height: u32,
    /// Cell size in pixels; multiple of the grader tile size.
    pub cell_width: u32,
    pub cell_height: u32,
    pub triangles_per_instance: u32,
    /// Master seed for the initial population and per-frame seeds.
    pub seed: u32,
    /// Per-vertex mutation probability in `[0, 1]`.
    pub mutation_rate: f32,
    /// Max position offset per mutation, in cell-local NDC.
    pub position_step: f32,
    /// Max color/alpha offset per mutation.
    pub color_step: f32,
    /// Exponent applied to normalised fitness before sampling.
    pub selection_pressure: f32,
    /// Copy the best candidate into the next generation unmutated.
    pub elitism: bool,
    /// Frames between fitness reports; 0 disables reporting.
    pub report_interval: u32,
    pub reference_path: PathBuf,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            grid_width: 8,
            grid_height: 8,
            cell_width: 128,
            cell_height: 128,
            triangles_per_instance: 64,
            seed: 1,
            mutation_rate: 0.02,
            position_step: 0.1,
            color_step: 0.1,
            selection_pressure: 4.0,
            elitism: true,
            report_interval: 120,
            reference_path: PathBuf::from(DEFAULT_REFERENCE_PATH),
        }
    }
}

impl EvolutionConfig {
    pub fn instance_count(&self) -> u32 {
        self.grid_width * self.grid_height
    }

    pub fn triangle_count(&self) -> u32 {
        self.instance_count() * self.triangles_per_instance
    }

    pub fn vertex_count(&self) -> u32 {
        3 * self.triangle_count()
    }

    /// Offscreen grid image size in pixels.
    pub fn image_size(&self) -> (u32, u32) {
        (
            self.grid_width * self.cell_width,
            self.grid_height * self.cell_height,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.grid_width as u64 * self.grid_height as u64;
        if n == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if n > MAX_CANDIDATES as u64 {
            return Err(ConfigError::TooManyCandidates { count: n });
        }
        for (name, value) in [("cell width", self.cell_width), ("cell height", self.cell_height)] {
            if value == 0 || value % TILE_SIZE != 0 {
                return Err(ConfigError::CellNotTileAligned { name, value });
            }
        }
        if self.triangles_per_instance == 0 {
            return Err(ConfigError::NoTriangles);
        }
        let vertices = 3 * n * self.triangles_per_instance as u64;
        if vertices > u32::MAX as u64 {
            return Err(ConfigError::TooManyVertices { count: vertices });
        }
        let image_w = self.grid_width as u64 * self.cell_width as u64;
        let image_h = self.grid_height as u64 * self.cell_height as u64;
        if image_w > u32::MAX as u64 || image_h > u32::MAX as u64 {
            return Err(ConfigError::ImageTooLarge {
                width: image_w,
                height: image_h,
                max: u32::MAX,
            });
        }
        let ranges = [
            ("mutation rate", self.mutation_rate, 0.0, 1.0),
            ("position step", self.position_step, 0.0, 2.0),
            ("color step", self.color_step, 0.0, 1.0),
            ("selection pressure", self.selection_pressure, 0.0, 64.0),
        ];
        for (name, value, lo, hi) in ranges {
            if !(lo..=hi).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    name,
                    value,
                    lo,
                    hi,
                });
            }
        }
        Ok(())
    }

    /// [`Self::validate`] plus the texture and buffer limits of a device.
    pub fn validate_for(&self, limits: &wgpu::Limits) -> Result<(), ConfigError> {
        self.validate()?;

        let (w, h) = self.image_size();
        let max = limits.max_texture_dimension_2d;
        if w > max || h > max {
            return Err(ConfigError::ImageTooLarge {
                width: w as u64,
                height: h as u64,
                max,
            });
        }

        // Generation buffers are bound whole as storage by the evolve stage.
        let bytes = self.vertex_count() as u64 * std::mem::size_of::<Vertex>() as u64;
        let max = limits
            .max_buffer_size
            .min(limits.max_storage_buffer_binding_size as u64);
        if bytes > max {
            return Err(ConfigError::PopulationTooLarge { bytes, max });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    EmptyGrid,
    TooManyCandidates { count: u64 },
    CellNotTileAligned { name: &'static str, value: u32 },
    NoTriangles,
    TooManyVertices { count: u64 },
    ImageTooLarge { width: u64, height: u64, max: u32 },
    PopulationTooLarge { bytes: u64, max: u64 },
    OutOfRange {
        name: &'static str,
        value: f32,
        lo: f32,
        hi: f32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid => f.write_str("grid must hold at least one candidate"),
            Self::TooManyCandidates { count } => write!(
                f,
                "{count} candidates exceed the selection limit of {MAX_CANDIDATES}"
            ),
            Self::CellNotTileAligned { name, value } => {
                write!(f, "{name} {value} is not a non-zero multiple of {TILE_SIZE}")
            }
            Self::NoTriangles => f.write_str("candidates need at least one triangle"),
            Self::TooManyVertices { count } => {
                write!(f, "{count} vertices do not fit a 32-bit vertex index")
            }
            Self::ImageTooLarge { width, height, max } => {
                write!(f, "grid image {width}x{height} exceeds the {max} pixel limit")
            }
            Self::PopulationTooLarge { bytes, max } => {
                write!(f, "population needs {bytes} bytes per generation, device allows {max}")
            }
            Self::OutOfRange { name, value, lo, hi } => {
                write!(f, "{name} {value} outside [{lo}, {hi}]")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = EvolutionConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.instance_count(), 64);
        assert_eq!(cfg.vertex_count(), 3 * 64 * 64);
        assert_eq!(cfg.image_size(), (1024, 1024));
    }

    #[test]
    fn empty_grid_is_rejected() {
        let cfg = EvolutionConfig {
            grid_height: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyGrid));
    }

    #[test]
    fn more_than_1024_candidates_is_rejected() {
        let cfg = EvolutionConfig {
            grid_width: 33,
            grid_height: 32,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TooManyCandidates { count: 1056 })
        );

        let cfg = EvolutionConfig {
            grid_width: 32,
            grid_height: 32,
            cell_width: 32,
            cell_height: 32,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unaligned_cell_is_rejected() {
        let cfg = EvolutionConfig {
            cell_width: 100,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::CellNotTileAligned { value: 100, .. })
        ));
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        let cfg = EvolutionConfig {
            mutation_rate: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange { name: "mutation rate", .. })
        ));
    }

    #[test]
    fn vertex_count_overflow_is_rejected() {
        let cfg = EvolutionConfig {
            triangles_per_instance: 30_000_000,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TooManyVertices {
                count: 3 * 64 * 30_000_000
            })
        );
    }

    #[test]
    fn oversized_image_is_rejected() {
        let cfg = EvolutionConfig {
            grid_width: 1,
            grid_height: 1,
            cell_width: 0x8000_0000,
            cell_height: 32,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ImageTooLarge { max: u32::MAX, .. })
        ));
    }

    // ── device limits ─────────────────────────────────────────────────────

    #[test]
    fn image_wider_than_texture_limit_is_rejected() {
        let cfg = EvolutionConfig {
            grid_width: 1024,
            grid_height: 1,
            cell_width: 32,
            cell_height: 32,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Ok(()));

        let limits = wgpu::Limits {
            max_texture_dimension_2d: 8192,
            ..wgpu::Limits::default()
        };
        assert_eq!(
            cfg.validate_for(&limits),
            Err(ConfigError::ImageTooLarge {
                width: 32768,
                height: 32,
                max: 8192
            })
        );
    }

    #[test]
    fn population_larger_than_storage_binding_is_rejected() {
        let cfg = EvolutionConfig {
            triangles_per_instance: 1 << 16,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Ok(()));

        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 128 << 20,
            ..wgpu::Limits::default()
        };
        let bytes = 3 * 64 * (1u64 << 16) * 32;
        assert!(matches!(
            cfg.validate_for(&limits),
            Err(ConfigError::PopulationTooLarge { bytes: b, max }) if b == bytes && max <= 128 << 20
        ));
    }

    #[test]
    fn default_fits_default_limits() {
        assert_eq!(
            EvolutionConfig::default().validate_for(&wgpu::Limits::default()),
            Ok(())
        );
    }

    #[test]
    fn nan_is_out_of_range() {
        let cfg = EvolutionConfig {
            color_step: f32::NAN,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
