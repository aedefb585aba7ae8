use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use procgfx_common::{CommandList, DrawCommand, ResourceDescriptor, ResourceId, SubmissionId};
use procgfx_content::{ContentBuffer, Generator, ProceduralParameters};
use procgfx_device::DeviceContext;
use procgfx_frame::{FrameError, FrameState, FrameWork};
use procgfx_resources::{ContentBinding, ResourceError, ResourceManager};

use crate::camera::OrbitCamera;
use crate::{Backend, CoreError, RendererConfig};

/// Per-frame shader constants.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// xyz: direction towards the light, w: ambient term.
    pub light: [f32; 4],
    /// x: animation time, y: amplitude, zw: unused.
    pub params: [f32; 4],
}

impl SceneUniforms {
    pub const SIZE: u64 = std::mem::size_of::<SceneUniforms>() as u64;

    fn new(camera: &OrbitCamera, params: &ProceduralParameters) -> Self {
        let light = Vec3::new(0.4, 1.0, 0.3).normalize();
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            light: [light.x, light.y, light.z, 0.15],
            params: [params.time(), params.amplitude(), 0.0, 0.0],
        }
    }
}

/// Procedural scene state living between frames.
#[derive(Debug)]
pub struct Scene {
    params: ProceduralParameters,
    generator: Generator,
    content: ContentBuffer,
    binding: ContentBinding,
    pipeline: ResourceId,
    uniforms: ResourceId,
    camera: OrbitCamera,
    clear_color: [f32; 4],
    fixed_dt: Option<f32>,
    regenerations: u64,
}

impl Scene {
    /// Create the pipeline and uniform buffer, pre-generate content and upload
    /// it. Resources created before a failure stay tracked by `rm`; the caller
    /// releases them.
    pub fn build<B: Backend>(
        device: &mut DeviceContext<B>,
        rm: &mut ResourceManager,
        config: &RendererConfig,
    ) -> Result<Self, CoreError> {
        let _span = tracing::info_span!("scene_build").entered();
        let surface_format = device.surface()?.format;
        let pipeline = rm.create_resource(
            device,
            ResourceDescriptor::pipeline("heightfield.pipeline", surface_format),
        )?;
        let uniforms = rm.create_resource(
            device,
            ResourceDescriptor::uniform_buffer("scene.uniforms", SceneUniforms::SIZE),
        )?;

        let params = config.params.clone();
        let generator = Generator::new(config.generator.clone());
        let content = generator.generate(&params, None)?;
        let mut binding = ContentBinding::new();
        let report = binding.sync(device, rm, &content, SubmissionId::NONE)?;

        let mut camera = OrbitCamera::default();
        camera.fit(device.surface()?.extent);
        let initial = SceneUniforms::new(&camera, &params);
        rm.update_resource(
            device,
            uniforms,
            bytemuck::bytes_of(&initial),
            params.version(),
        )?;

        tracing::info!(
            seed = params.seed(),
            resolution = params.resolution(),
            bytes = report.uploaded_bytes,
            digest = %content.digest(),
            "scene ready"
        );

        Ok(Self {
            params,
            generator,
            content,
            binding,
            pipeline,
            uniforms,
            camera,
            clear_color: config.clear_color,
            fixed_dt: config.fixed_dt,
            regenerations: 0,
        })
    }

    pub fn params(&self) -> &ProceduralParameters {
        &self.params
    }

    /// Mutate or replace parameters between frames. Any change, including
    /// assigning a whole new value, leaves a version the current content was
    /// not built from, so the next frame regenerates before drawing.
    pub fn params_mut(&mut self) -> &mut ProceduralParameters {
        &mut self.params
    }

    pub fn content(&self) -> &ContentBuffer {
        &self.content
    }

    pub fn binding(&self) -> &ContentBinding {
        &self.binding
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    /// Content rebuilds since the scene was built.
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }

    fn regenerate<B: Backend>(
        &mut self,
        device: &mut DeviceContext<B>,
        rm: &mut ResourceManager,
        frame: &FrameState,
    ) -> Result<(), FrameError> {
        let next = self
            .generator
            .generate(&self.params, Some(&self.content))
            .map_err(FrameError::content)?;
        self.binding
            .sync(device, rm, &next, frame.last_submitted)
            .map_err(FrameError::content)?;
        self.content = next;
        self.regenerations += 1;
        Ok(())
    }
}

/// One frame's view of the scene and the resource manager.
pub struct SceneFrame<'a> {
    pub resources: &'a mut ResourceManager,
    pub scene: &'a mut Scene,
}

impl<B: Backend> FrameWork<B> for SceneFrame<'_> {
    fn update(
        &mut self,
        device: &mut DeviceContext<B>,
        frame: &FrameState,
    ) -> Result<(), FrameError> {
        let rm = &mut *self.resources;
        let scene = &mut *self.scene;

        rm.reclaim(device, frame.completed)
            .map_err(FrameError::content)?;

        let dt = scene.fixed_dt.unwrap_or(frame.dt);
        scene.params.evolve(dt);
        if scene.content.version() != scene.params.version() {
            scene.regenerate(device, rm, frame)?;
        }

        scene.camera.fit(frame.extent);
        scene.camera.advance(dt);
        let uniforms = SceneUniforms::new(&scene.camera, &scene.params);
        rm.update_resource(
            device,
            scene.uniforms,
            bytemuck::bytes_of(&uniforms),
            scene.params.version(),
        )
        .map_err(FrameError::content)
    }

    fn record(&mut self, _frame: &FrameState, commands: &mut CommandList) -> Result<(), FrameError> {
        let scene = &*self.scene;
        let version = scene.params.version();
        scene
            .binding
            .ensure_current(self.resources, version)
            .map_err(FrameError::content)?;

        let missing = || FrameError::content(ResourceError::Backend("content not bound".into()));
        commands.clear_color = scene.clear_color;
        commands.push(DrawCommand {
            pipeline: scene.pipeline,
            vertex_buffer: scene.binding.vertex_buffer().ok_or_else(missing)?,
            index_buffer: scene.binding.index_buffer().ok_or_else(missing)?,
            index_count: scene.binding.index_count(),
            uniforms: scene.uniforms,
            texture: scene.binding.texture().ok_or_else(missing)?,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeadlessBackend;
    use procgfx_common::Extent2d;
    use procgfx_frame::FatalCause;
    use std::time::Instant;

    fn frame(index: u64) -> FrameState {
        FrameState {
            index,
            timestamp: Instant::now(),
            dt: 0.016,
            image_index: 0,
            extent: Extent2d::new(320, 240),
            last_submitted: SubmissionId(index),
            completed: SubmissionId(index),
        }
    }

    fn setup(
        config: &RendererConfig,
    ) -> (DeviceContext<HeadlessBackend>, ResourceManager, Scene) {
        let mut device = DeviceContext::new(HeadlessBackend::new());
        device.init(&config.device).unwrap();
        let mut rm = ResourceManager::new();
        let scene = Scene::build(&mut device, &mut rm, config).unwrap();
        (device, rm, scene)
    }

    fn small_config() -> RendererConfig {
        RendererConfig {
            params: ProceduralParameters::new(5, 16),
            ..Default::default()
        }
    }

    #[test]
    fn uniforms_layout() {
        assert_eq!(SceneUniforms::SIZE, 96);
    }

    #[test]
    fn build_creates_pipeline_uniforms_and_content() {
        let (mut device, mut rm, scene) = setup(&small_config());
        assert_eq!(rm.live_count(), 5);
        assert_eq!(device.backend().live_allocations(), 5);
        assert!(scene.binding().ensure_current(&rm, scene.params().version()).is_ok());
        rm.release_all(&mut device).unwrap();
    }

    #[test]
    fn update_evolves_and_regenerates() {
        let (mut device, mut rm, mut scene) = setup(&small_config());
        let before = scene.content().digest();
        {
            let mut work = SceneFrame {
                resources: &mut rm,
                scene: &mut scene,
            };
            work.update(&mut device, &frame(0)).unwrap();
            let mut commands = CommandList::default();
            FrameWork::<HeadlessBackend>::record(&mut work, &frame(0), &mut commands)
                .unwrap();
            assert_eq!(commands.draws.len(), 1);
            assert_eq!(commands.draws[0].index_count, 15 * 15 * 6);
        }
        assert_eq!(scene.regenerations(), 1);
        assert_ne!(scene.content().digest(), before);
        rm.release_all(&mut device).unwrap();
    }

    #[test]
    fn frozen_content_is_not_regenerated() {
        let mut config = small_config();
        config.params = config.params.with_speed(0.0);
        let (mut device, mut rm, mut scene) = setup(&config);
        let mut work = SceneFrame {
            resources: &mut rm,
            scene: &mut scene,
        };
        work.update(&mut device, &frame(0)).unwrap();
        work.update(&mut device, &frame(1)).unwrap();
        assert_eq!(scene.regenerations(), 0);
        rm.release_all(&mut device).unwrap();
    }

    #[test]
    fn record_refuses_stale_content() {
        let (mut device, mut rm, mut scene) = setup(&small_config());
        scene.params_mut().set_seed(1234);
        let mut work = SceneFrame {
            resources: &mut rm,
            scene: &mut scene,
        };
        let err = FrameWork::<HeadlessBackend>::record(
            &mut work,
            &frame(0),
            &mut CommandList::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::Fatal(FatalCause::Content(_))));

        work.update(&mut device, &frame(0)).unwrap();
        assert!(
            FrameWork::<HeadlessBackend>::record(&mut work, &frame(0), &mut CommandList::default())
                .is_ok()
        );
        rm.release_all(&mut device).unwrap();
    }

    #[test]
    fn replaced_params_are_regenerated() {
        let mut config = small_config();
        config.params = config.params.with_speed(0.0);
        let (mut device, mut rm, mut scene) = setup(&config);
        *scene.params_mut() = ProceduralParameters::new(77, 16).with_speed(0.0);
        let mut work = SceneFrame {
            resources: &mut rm,
            scene: &mut scene,
        };
        work.update(&mut device, &frame(0)).unwrap();
        assert!(
            FrameWork::<HeadlessBackend>::record(&mut work, &frame(0), &mut CommandList::default())
                .is_ok()
        );

        let expected = Generator::default()
            .generate(&ProceduralParameters::new(77, 16), None)
            .unwrap();
        assert_eq!(scene.regenerations(), 1);
        assert_eq!(scene.content().digest(), expected.digest());
        rm.release_all(&mut device).unwrap();
    }

    #[test]
    fn resolution_change_recreates_resources() {
        let (mut device, mut rm, mut scene) = setup(&small_config());
        let old_texture = scene.binding().texture();
        scene.params_mut().set_resolution(32);
        let mut work = SceneFrame {
            resources: &mut rm,
            scene: &mut scene,
        };
        work.update(&mut device, &frame(3)).unwrap();
        assert_ne!(scene.binding().texture(), old_texture);
        assert_eq!(scene.content().resolution(), 32);
        // Old resources wait for submission 3 to retire.
        assert_eq!(rm.pending_frees(), 3);
        rm.release_all(&mut device).unwrap();
        assert_eq!(device.backend().live_allocations(), 0);
    }

    #[test]
    fn fixed_dt_makes_runs_reproducible() {
        let mut config = small_config();
        config.fixed_dt = Some(0.1);
        let digests: Vec<String> = (0..2)
            .map(|_| {
                let (mut device, mut rm, mut scene) = setup(&config);
                let mut work = SceneFrame {
                    resources: &mut rm,
                    scene: &mut scene,
                };
                for i in 0..3 {
                    work.update(&mut device, &frame(i)).unwrap();
                }
                let digest = scene.content().digest();
                rm.release_all(&mut device).unwrap();
                digest
            })
            .collect();
        assert_eq!(digests[0], digests[1]);
    }
}
