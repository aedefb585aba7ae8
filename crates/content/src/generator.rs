use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::buffer::{ContentBuffer, DirtySections, Vertex};
use crate::noise::Fbm;
use crate::params::ProceduralParameters;
use crate::GenerationError;

/// Generator policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Reuse compatible sections of the previous buffer instead of rebuilding
    /// everything. Output bytes are identical either way.
    pub incremental: bool,
}

/// Procedural content generator.
///
/// `generate` is a pure function of `(params, previous)`: identical inputs
/// always produce byte-identical buffers.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Build geometry and texture for `params`.
    ///
    /// With incremental generation enabled and a compatible `previous`
    /// buffer, the index topology is shared and marked clean; if `previous`
    /// was built from the very same parameter state (same version) it is
    /// returned with every section clean. The result records `previous` as
    /// its base whenever sections were carried over.
    pub fn generate(
        &self,
        params: &ProceduralParameters,
        previous: Option<&ContentBuffer>,
    ) -> Result<ContentBuffer, GenerationError> {
        params.validate()?;
        let _span = tracing::debug_span!(
            "generate",
            version = params.version(),
            resolution = params.resolution()
        )
        .entered();

        let reusable = previous
            .filter(|_| self.config.incremental)
            .filter(|prev| prev.resolution == params.resolution());

        if let Some(prev) = reusable {
            if prev.version == params.version() {
                tracing::trace!("parameters unchanged, reusing previous buffer");
                let mut same = prev.clone();
                same.base = Some(prev.version);
                same.dirty = DirtySections::NONE;
                return Ok(same);
            }
        }

        let heights = height_field(params);
        let vertices = build_vertices(params, &heights);
        let texels = build_texels(params, &heights);

        let (indices, dirty, base) = match reusable {
            Some(prev) => (
                Arc::clone(&prev.indices),
                DirtySections {
                    vertices: true,
                    indices: false,
                    texels: true,
                },
                Some(prev.version),
            ),
            None => (build_indices(params.resolution()), DirtySections::ALL, None),
        };

        tracing::debug!(
            vertices = vertices.len(),
            indices = indices.len(),
            incremental = !dirty.indices,
            "content generated"
        );

        Ok(ContentBuffer {
            version: params.version(),
            base,
            resolution: params.resolution(),
            vertices,
            indices,
            texels,
            dirty,
        })
    }
}

/// Sample normalized heights (`[0, 1]`) on a `resolution²` grid, row-major.
fn height_field(params: &ProceduralParameters) -> Vec<f32> {
    let n = params.resolution() as usize;
    let fbm = Fbm {
        octaves: params.octaves(),
        frequency: params.frequency(),
        persistence: params.persistence(),
        lacunarity: params.lacunarity(),
    };
    let step = 1.0 / (n - 1) as f32;
    let t = params.time();

    let mut heights = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            let u = col as f32 * step;
            let v = row as f32 * step;
            heights.push(fbm.sample(params.seed(), u + t, v + t * 0.5));
        }
    }
    heights
}

/// Grid over `[-1, 1]²` in XZ with heights on Y and central-difference normals.
fn build_vertices(params: &ProceduralParameters, heights: &[f32]) -> Vec<Vertex> {
    let n = params.resolution() as usize;
    let step = 1.0 / (n - 1) as f32;
    let spacing = 2.0 * step;
    let amp = params.amplitude();
    let h = |row: usize, col: usize| heights[row * n + col] * amp;

    let mut vertices = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            let left = h(row, col.saturating_sub(1));
            let right = h(row, (col + 1).min(n - 1));
            let up = h(row.saturating_sub(1), col);
            let down = h((row + 1).min(n - 1), col);
            let dx = spacing * (((col + 1).min(n - 1) - col.saturating_sub(1)) as f32);
            let dz = spacing * (((row + 1).min(n - 1) - row.saturating_sub(1)) as f32);
            let normal = Vec3::new((left - right) / dx, 1.0, (up - down) / dz).normalize();

            let u = col as f32 * step;
            let v = row as f32 * step;
            vertices.push(Vertex {
                position: [u * 2.0 - 1.0, h(row, col), v * 2.0 - 1.0],
                normal: normal.to_array(),
                uv: [u, v],
            });
        }
    }
    vertices
}

/// Two counter-clockwise triangles per grid cell.
fn build_indices(resolution: u32) -> Arc<[u32]> {
    let n = resolution;
    let cells = (n - 1) as usize;
    let mut indices = Vec::with_capacity(cells * cells * 6);
    for row in 0..n - 1 {
        for col in 0..n - 1 {
            let i0 = row * n + col;
            let i1 = i0 + 1;
            let i2 = i0 + n;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }
    Arc::from(indices)
}

/// Colour height bands: water, sand, grass, rock, snow.
fn build_texels(params: &ProceduralParameters, heights: &[f32]) -> Vec<[u8; 4]> {
    const BANDS: [(f32, [f32; 3]); 5] = [
        (0.35, [0.10, 0.25, 0.60]),
        (0.42, [0.80, 0.75, 0.50]),
        (0.65, [0.20, 0.55, 0.20]),
        (0.80, [0.45, 0.40, 0.35]),
        (1.01, [0.95, 0.95, 0.97]),
    ];
    debug_assert_eq!(heights.len(), (params.resolution() as usize).pow(2));

    heights
        .iter()
        .map(|&h| {
            let base = BANDS
                .iter()
                .find(|(limit, _)| h < *limit)
                .map(|(_, c)| *c)
                .unwrap_or(BANDS[BANDS.len() - 1].1);
            let shade = 0.75 + 0.25 * h;
            [
                to_unorm8(base[0] * shade),
                to_unorm8(base[1] * shade),
                to_unorm8(base[2] * shade),
                255,
            ]
        })
        .collect()
}

fn to_unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
