use std::collections::{HashMap, VecDeque};

use procgfx_common::{
    BackendError, CommandList, Extent2d, ResourceDescriptor, ResourceId, SubmissionId,
    TextureFormat,
};
use procgfx_device::{
    DeviceBackend, DeviceCapabilities, DeviceRequirements, SurfaceConfig, SurfaceRequest,
};
use procgfx_frame::{AcquireError, FrameBackend, StopHandle, TargetImage};
use procgfx_resources::{ResourceBackend, ResourceError};

/// Faults the headless backend injects.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// `open_device` reports no adapter.
    pub fail_device: bool,
    /// `create_surface` fails.
    pub fail_surface: bool,
    /// Total bytes allocatable before `OutOfMemory`.
    pub memory_budget: Option<u64>,
    /// Returned by successive `acquire_target` calls before succeeding.
    pub acquire_failures: VecDeque<AcquireError>,
    /// Submissions still executing after each submit; retired by later
    /// submits or `wait_idle`.
    pub gpu_latency: u64,
    /// Request a stop while acquiring the n-th target (1-based), i.e. from
    /// inside that frame's iteration.
    pub stop_on_acquire: Option<(u64, StopHandle)>,
}

impl FaultPlan {
    pub fn none() -> Self {
        Self::default()
    }

    /// Fail the next `count` acquisitions with `error`.
    pub fn failing_acquires(mut self, error: AcquireError, count: usize) -> Self {
        self.acquire_failures.extend(std::iter::repeat_n(error, count));
        self
    }

    pub fn stopping_on_acquire(mut self, target: u64, stop: StopHandle) -> Self {
        self.stop_on_acquire = Some((target, stop));
        self
    }
}

/// Activity counters of a [`HeadlessBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessCounters {
    pub acquire_attempts: u64,
    pub targets_acquired: u64,
    pub submissions: u64,
    pub presents: u64,
    pub draws: u64,
    pub writes: u64,
    pub bytes_written: u64,
    pub frees: u64,
}

#[derive(Debug)]
struct Allocation {
    descriptor: ResourceDescriptor,
    data: Vec<u8>,
}

/// Deterministic CPU backend: tracks every device, surface and resource
/// operation so tests can account for leaks and ordering.
#[derive(Debug)]
pub struct HeadlessBackend {
    faults: FaultPlan,
    capabilities: DeviceCapabilities,
    device_open: bool,
    surface: Option<SurfaceConfig>,
    allocations: HashMap<ResourceId, Allocation>,
    acquired: Option<TargetImage>,
    next_image: u32,
    submitted: SubmissionId,
    completed: SubmissionId,
    counters: HeadlessCounters,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_faults(FaultPlan::none())
    }

    pub fn with_faults(faults: FaultPlan) -> Self {
        Self {
            faults,
            capabilities: DeviceCapabilities {
                adapter_name: "headless (cpu)".into(),
                formats: vec![
                    TextureFormat::Rgba8Unorm,
                    TextureFormat::Rgba8UnormSrgb,
                    TextureFormat::Bgra8Unorm,
                    TextureFormat::Bgra8UnormSrgb,
                    TextureFormat::Depth32Float,
                ],
                max_texture_dimension: 8192,
                max_buffer_size: 256 << 20,
            },
            device_open: false,
            surface: None,
            allocations: HashMap::new(),
            acquired: None,
            next_image: 0,
            submitted: SubmissionId::NONE,
            completed: SubmissionId::NONE,
            counters: HeadlessCounters::default(),
        }
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    pub fn faults_mut(&mut self) -> &mut FaultPlan {
        &mut self.faults
    }

    pub fn live_allocations(&self) -> usize {
        self.allocations.len()
    }

    pub fn bytes_in_use(&self) -> u64 {
        self.allocations.values().map(|a| a.descriptor.size).sum()
    }

    pub fn device_open(&self) -> bool {
        self.device_open
    }

    pub fn surface_open(&self) -> bool {
        self.surface.is_some()
    }

    pub fn presents(&self) -> u64 {
        self.counters.presents
    }

    pub fn submissions(&self) -> u64 {
        self.counters.submissions
    }

    pub fn acquire_attempts(&self) -> u64 {
        self.counters.acquire_attempts
    }

    pub fn counters(&self) -> HeadlessCounters {
        self.counters
    }

    /// Contents last written to `id`.
    pub fn contents(&self, id: ResourceId) -> Option<&[u8]> {
        self.allocations.get(&id).map(|a| a.data.as_slice())
    }

    fn retire(&mut self) {
        let pending = self.submitted.0.saturating_sub(self.faults.gpu_latency);
        self.completed = SubmissionId(pending.max(self.completed.0));
    }
}

impl DeviceBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn open_device(
        &mut self,
        _requirements: &DeviceRequirements,
    ) -> Result<DeviceCapabilities, BackendError> {
        if self.faults.fail_device {
            return Err("no adapter available (injected)".into());
        }
        self.device_open = true;
        Ok(self.capabilities.clone())
    }

    fn create_surface(&mut self, request: &SurfaceRequest) -> Result<SurfaceConfig, BackendError> {
        if !self.device_open {
            return Err("surface requested without an open device".into());
        }
        if self.faults.fail_surface {
            return Err("surface creation failed (injected)".into());
        }
        let format = if self.capabilities.supports_format(request.format) {
            request.format
        } else {
            TextureFormat::Bgra8UnormSrgb
        };
        let config = SurfaceConfig {
            extent: request.extent,
            format,
            image_count: if request.vsync { 3 } else { 2 },
        };
        self.surface = Some(config);
        Ok(config)
    }

    fn resize_surface(&mut self, extent: Extent2d) -> Result<SurfaceConfig, BackendError> {
        let surface = self
            .surface
            .as_mut()
            .ok_or_else(|| BackendError::new("resize without a surface"))?;
        surface.extent = extent;
        self.acquired = None;
        Ok(*surface)
    }

    fn destroy_surface(&mut self) {
        self.surface = None;
        self.acquired = None;
    }

    fn close_device(&mut self) {
        if self.surface.is_some() {
            tracing::error!("headless device closed while its surface is alive");
        }
        if !self.allocations.is_empty() {
            tracing::error!(
                leaked = self.allocations.len(),
                "headless device closed with live allocations"
            );
        }
        self.device_open = false;
    }

    fn wait_idle(&mut self) {
        self.completed = self.submitted;
    }
}

impl ResourceBackend for HeadlessBackend {
    fn allocate(
        &mut self,
        id: ResourceId,
        descriptor: &ResourceDescriptor,
    ) -> Result<(), ResourceError> {
        if !self.device_open {
            return Err(ResourceError::Backend("allocation without an open device".into()));
        }
        if let Some(limit) = self.faults.memory_budget {
            let requested = self.bytes_in_use() + descriptor.size;
            if requested > limit {
                return Err(ResourceError::OutOfMemory { requested, limit });
            }
        }
        self.allocations.insert(
            id,
            Allocation {
                descriptor: descriptor.clone(),
                data: vec![0; descriptor.size as usize],
            },
        );
        Ok(())
    }

    fn write(&mut self, id: ResourceId, data: &[u8]) -> Result<(), ResourceError> {
        let alloc = self
            .allocations
            .get_mut(&id)
            .ok_or_else(|| ResourceError::Backend(format!("write to unknown {id}")))?;
        let dst = alloc
            .data
            .get_mut(..data.len())
            .ok_or_else(|| ResourceError::Backend(format!("write overflows {id}")))?;
        dst.copy_from_slice(data);
        self.counters.writes += 1;
        self.counters.bytes_written += data.len() as u64;
        Ok(())
    }

    fn free(&mut self, id: ResourceId) {
        if self.allocations.remove(&id).is_none() {
            tracing::error!(%id, "free of unknown resource");
            return;
        }
        self.counters.frees += 1;
    }
}

impl FrameBackend for HeadlessBackend {
    fn acquire_target(&mut self) -> Result<TargetImage, AcquireError> {
        self.counters.acquire_attempts += 1;
        if let Some(err) = self.faults.acquire_failures.pop_front() {
            return Err(err);
        }
        let surface = self.surface.ok_or(AcquireError::Lost)?;
        let target = TargetImage {
            image_index: self.next_image,
            extent: surface.extent,
        };
        self.next_image = (self.next_image + 1) % surface.image_count.max(1);
        self.acquired = Some(target);
        self.counters.targets_acquired += 1;
        if let Some((at, stop)) = &self.faults.stop_on_acquire {
            if *at == self.counters.targets_acquired {
                tracing::debug!(acquire = *at, "stop requested mid-frame (injected)");
                stop.request_stop();
            }
        }
        Ok(target)
    }

    fn submit(
        &mut self,
        target: &TargetImage,
        commands: &CommandList,
    ) -> Result<SubmissionId, BackendError> {
        if self.acquired.as_ref() != Some(target) {
            return Err("submit to a target that was not acquired".into());
        }
        if let Some(missing) = commands
            .referenced_resources()
            .find(|id| !self.allocations.contains_key(id))
        {
            return Err(BackendError::new(format!("command list uses freed {missing}")));
        }
        self.submitted = self.submitted.next();
        self.counters.submissions += 1;
        self.counters.draws += commands.draws.len() as u64;
        self.retire();
        Ok(self.submitted)
    }

    fn present(&mut self, target: TargetImage) -> Result<(), BackendError> {
        if self.acquired.take() != Some(target) {
            return Err("present of a target that was not acquired".into());
        }
        self.counters.presents += 1;
        Ok(())
    }

    fn completed_submission(&self) -> SubmissionId {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened() -> HeadlessBackend {
        let mut b = HeadlessBackend::new();
        b.open_device(&DeviceRequirements::default()).unwrap();
        b.create_surface(&SurfaceRequest::default()).unwrap();
        b
    }

    #[test]
    fn injected_device_failure() {
        let mut b = HeadlessBackend::with_faults(FaultPlan {
            fail_device: true,
            ..Default::default()
        });
        assert!(b.open_device(&DeviceRequirements::default()).is_err());
        assert!(!b.device_open());
    }

    #[test]
    fn memory_budget_is_enforced() {
        let mut b = opened();
        b.faults_mut().memory_budget = Some(64);
        b.allocate(ResourceId(1), &ResourceDescriptor::vertex_buffer("a", 48))
            .unwrap();
        let err = b
            .allocate(ResourceId(2), &ResourceDescriptor::vertex_buffer("b", 48))
            .unwrap_err();
        assert!(matches!(err, ResourceError::OutOfMemory { limit: 64, .. }));
        assert_eq!(b.live_allocations(), 1);
    }

    #[test]
    fn scripted_acquire_failures_come_first() {
        let mut b = opened();
        *b.faults_mut() = FaultPlan::none().failing_acquires(AcquireError::Timeout, 2);
        assert_eq!(b.acquire_target(), Err(AcquireError::Timeout));
        assert_eq!(b.acquire_target(), Err(AcquireError::Timeout));
        assert!(b.acquire_target().is_ok());
        assert_eq!(b.acquire_attempts(), 3);
    }

    #[test]
    fn stop_is_requested_on_the_chosen_acquire() {
        let stop = StopHandle::new();
        let mut b = opened();
        *b.faults_mut() = FaultPlan::none()
            .failing_acquires(AcquireError::Timeout, 1)
            .stopping_on_acquire(2, stop.clone());
        assert!(b.acquire_target().is_err());
        let t = b.acquire_target().unwrap();
        b.present(t).unwrap();
        assert!(!stop.is_stop_requested());
        b.acquire_target().unwrap();
        assert!(stop.is_stop_requested());
        assert_eq!(b.counters().targets_acquired, 2);
    }

    #[test]
    fn latency_delays_completion_until_idle() {
        let mut b = opened();
        b.faults_mut().gpu_latency = 2;
        for _ in 0..3 {
            let t = b.acquire_target().unwrap();
            b.submit(&t, &CommandList::default()).unwrap();
            b.present(t).unwrap();
        }
        assert_eq!(b.completed_submission(), SubmissionId(1));
        b.wait_idle();
        assert_eq!(b.completed_submission(), SubmissionId(3));
    }

    #[test]
    fn submit_rejects_freed_resources() {
        let mut b = opened();
        let t = b.acquire_target().unwrap();
        let mut commands = CommandList::default();
        commands.push(procgfx_common::DrawCommand {
            pipeline: ResourceId(1),
            vertex_buffer: ResourceId(2),
            index_buffer: ResourceId(3),
            index_count: 6,
            uniforms: ResourceId(4),
            texture: ResourceId(5),
        });
        assert!(b.submit(&t, &commands).is_err());
    }

    #[test]
    fn present_requires_acquired_target() {
        let mut b = opened();
        let t = b.acquire_target().unwrap();
        b.submit(&t, &CommandList::default()).unwrap();
        b.present(t).unwrap();
        assert!(b.present(t).is_err());
        assert_eq!(b.presents(), 1);
    }

    #[test]
    fn image_index_rotates() {
        let mut b = opened();
        let indices: Vec<u32> = (0..4)
            .map(|_| {
                let t = b.acquire_target().unwrap();
                b.present(t).unwrap();
                t.image_index
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 0]);
    }
}
