use std::fmt;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use trivolve_engine::compute::{
    BoundResource, ComputeProgram, ComputeProgramDesc, ResourceBinding, ResourceKind,
};
use trivolve_engine::device::DeviceCtx;
use trivolve_engine::resources::GpuImage;

/// Side of a grader tile in pixels.
pub const TILE_SIZE: u32 = 32;

/// Tile geometry of the grid image.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileGrid {
    pub image_width: u32,
    pub image_height: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl TileGrid {
    pub fn new(
        image_width: u32,
        image_height: u32,
        cell_width: u32,
        cell_height: u32,
    ) -> Result<Self, TileError> {
        let dims = [
            ("image width", image_width),
            ("image height", image_height),
            ("cell width", cell_width),
            ("cell height", cell_height),
        ];
        for (name, value) in dims {
            if value == 0 || value % TILE_SIZE != 0 {
                return Err(TileError::Unaligned { name, value });
            }
        }
        if image_width % cell_width != 0 || image_height % cell_height != 0 {
            return Err(TileError::PartialCell {
                image: (image_width, image_height),
                cell: (cell_width, cell_height),
            });
        }
        Ok(Self {
            image_width,
            image_height,
            cell_width,
            cell_height,
        })
    }

    /// Workgroups to dispatch: one per tile.
    pub fn workgroups(&self) -> [u32; 3] {
        [
            self.image_width / TILE_SIZE,
            self.image_height / TILE_SIZE,
            1,
        ]
    }

    pub fn cells_per_row(&self) -> u32 {
        self.image_width / self.cell_width
    }

    pub fn cell_rows(&self) -> u32 {
        self.image_height / self.cell_height
    }

    /// Candidate index owning tile `(tx, ty)`.
    pub fn tile_owner(&self, tx: u32, ty: u32) -> u32 {
        let cx = tx * TILE_SIZE / self.cell_width;
        let cy = ty * TILE_SIZE / self.cell_height;
        cy * self.cells_per_row() + cx
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    /// A dimension is zero or not a multiple of [`TILE_SIZE`].
    Unaligned { name: &'static str, value: u32 },
    /// The image does not hold a whole number of cells.
    PartialCell { image: (u32, u32), cell: (u32, u32) },
}

impl fmt::Display for TileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unaligned { name, value } => {
                write!(f, "{name} {value} is not a non-zero multiple of {TILE_SIZE}")
            }
            Self::PartialCell { image, cell } => write!(
                f,
                "image {}x{} is not a whole number of {}x{} cells",
                image.0, image.1, cell.0, cell.1
            ),
        }
    }
}

impl std::error::Error for TileError {}

/// Per-pixel similarity in `[0, 1]`; 1 is an exact match.
pub fn pixel_fitness(candidate: [f32; 3], reference: [f32; 3]) -> f32 {
    let d: f32 = (0..3).map(|i| (candidate[i] - reference[i]).abs()).sum();
    1.0 - d / 3.0
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct GraderParams {
    cell_width: u32,
    cell_height: u32,
    grid_width: u32,
    instance_count: u32,
}

/// Accumulates each candidate's mean similarity into the scores buffer.
///
/// Slot `i` ends up in `[0, 1]`; the trailing slot holds the sum of all
/// candidates.
pub struct Grader {
    program: ComputeProgram,
    binding: ResourceBinding,
    scores: wgpu::Buffer,
    tiles: TileGrid,
}

impl Grader {
    pub fn new(
        ctx: DeviceCtx<'_>,
        tiles: TileGrid,
        grid_image: &GpuImage,
        reference: &GpuImage,
        scores: &wgpu::Buffer,
    ) -> Result<Self> {
        anyhow::ensure!(
            (grid_image.width, grid_image.height) == (tiles.image_width, tiles.image_height),
            "grid image is {}x{}, tile grid expects {}x{}",
            grid_image.width,
            grid_image.height,
            tiles.image_width,
            tiles.image_height
        );
        anyhow::ensure!(
            (reference.width, reference.height) == (tiles.cell_width, tiles.cell_height),
            "reference image is {}x{}, expected one cell ({}x{})",
            reference.width,
            reference.height,
            tiles.cell_width,
            tiles.cell_height
        );

        let program = ComputeProgram::new(
            ctx,
            ComputeProgramDesc {
                label: "trivolve grader",
                source: include_str!("shaders/grader.wgsl"),
                entry_point: "main",
                bindings: &[
                    (0, ResourceKind::Image),
                    (1, ResourceKind::Image),
                    (2, ResourceKind::storage()),
                ],
                params_size: Some(std::mem::size_of::<GraderParams>() as u64),
            },
        )?;

        let binding = program.bind_resources(
            ctx,
            &[
                (0, BoundResource::Image(&grid_image.view)),
                (1, BoundResource::Image(&reference.view)),
                (2, BoundResource::Buffer(scores)),
            ],
        )?;

        let instances = tiles.cells_per_row() * tiles.cell_rows();
        program.write_params(
            ctx,
            &GraderParams {
                cell_width: tiles.cell_width,
                cell_height: tiles.cell_height,
                grid_width: tiles.cells_per_row(),
                instance_count: instances,
            },
        )?;

        Ok(Self {
            program,
            binding,
            scores: scores.clone(),
            tiles,
        })
    }

    /// Zeroes the bound scores buffer and records the grading dispatch.
    pub fn record(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.clear_buffer(&self.scores, 0, None);
        self.program
            .dispatch(encoder, &self.binding, self.tiles.workgroups());
    }
}
