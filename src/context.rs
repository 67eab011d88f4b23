//! Execution context: WebGPU device, queue, and pipeline cache.
//!
//! The context does not own the device lifecycle in any deep sense — it wraps
//! handles the caller already has (or acquires one for them via
//! [`SparseContext::from_default_adapter`], mainly for tests and demos). Every
//! conversion call enqueues its kernels on this context's queue in program
//! order and returns without waiting; the caller synchronizes before reading
//! outputs or reusing scratch.

use std::sync::Arc;
use std::time::Duration;

use wgpu::{Buffer, BufferDescriptor, BufferUsages, Device, Queue};

use crate::error::{Error, Result};
use crate::pipeline::PipelineCache;

/// Execution context for sparse format conversions.
///
/// `Clone` is cheap; clones share the device, queue, and pipeline cache.
/// Concurrent calls through independent contexts (and independent buffers)
/// are safe; sharing one scratch buffer between in-flight calls is the
/// caller's bug, exactly as with any other queue-ordered GPU API.
#[derive(Clone)]
pub struct SparseContext {
    device: Arc<Device>,
    queue: Arc<Queue>,
    pipeline_cache: Arc<PipelineCache>,
}

impl std::fmt::Debug for SparseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseContext").finish_non_exhaustive()
    }
}

impl SparseContext {
    /// Wrap an existing device and queue.
    pub fn new(device: Arc<Device>, queue: Arc<Queue>) -> Self {
        let pipeline_cache = Arc::new(PipelineCache::new(device.clone()));
        Self {
            device,
            queue,
            pipeline_cache,
        }
    }

    /// Acquire the first available adapter and build a context on it.
    ///
    /// # Errors
    ///
    /// Returns an error if no adapter is found or device creation fails.
    pub fn from_default_adapter() -> Result<Self> {
        let (device, queue) = pollster::block_on(async {
            let instance = wgpu::Instance::default();
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .map_err(|e| Error::Backend(format!("no WebGPU adapter: {e}")))?;

            adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: Some("sparsefmt device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    trace: wgpu::Trace::Off,
                    experimental_features: wgpu::ExperimentalFeatures::default(),
                })
                .await
                .map_err(|e| Error::Backend(format!("device request failed: {e:?}")))
        })?;

        Ok(Self::new(Arc::new(device), Arc::new(queue)))
    }

    /// Get reference to the WebGPU device.
    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Get reference to the WebGPU queue.
    #[inline]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Get reference to the pipeline cache.
    #[inline]
    pub(crate) fn pipeline_cache(&self) -> &PipelineCache {
        &self.pipeline_cache
    }

    /// Create a storage buffer usable as kernel input/output and as a
    /// copy source/destination.
    pub fn create_storage_buffer(&self, label: &str, size: u64) -> Buffer {
        self.device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    }

    /// Create a uniform buffer holding one `Pod` parameter struct.
    pub(crate) fn create_params_buffer<T: bytemuck::Pod>(&self, label: &str, params: &T) -> Buffer {
        let buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<T>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(&buffer, 0, bytemuck::bytes_of(params));
        buffer
    }

    /// Upload a slice of `Pod` data into a buffer at offset 0.
    pub fn write_buffer<T: bytemuck::Pod>(&self, buffer: &Buffer, data: &[T]) {
        self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(data));
    }

    /// Block until all submitted work has completed.
    pub fn synchronize(&self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(60)),
            })
            .map_err(|e| Error::Backend(format!("GPU poll failed: {e}")))?;
        Ok(())
    }

    /// Read `count` elements back from a storage buffer (blocking).
    ///
    /// Copies through a staging buffer; intended for tests and small results,
    /// not the hot path.
    pub fn read_buffer<T: bytemuck::Pod>(&self, buffer: &Buffer, count: usize) -> Result<Vec<T>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let size = (count * std::mem::size_of::<T>()) as u64;
        let staging = self.device.create_buffer(&BufferDescriptor {
            label: Some("sparsefmt staging"),
            size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sparsefmt readback"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(60)),
            })
            .map_err(|e| Error::Backend(format!("GPU poll failed during readback: {e}")))?;

        receiver
            .recv()
            .map_err(|_| Error::Backend("map_async callback was not invoked".into()))?
            .map_err(|e| Error::Backend(format!("map_async failed: {e}")))?;

        let out;
        {
            let data = slice.get_mapped_range();
            out = bytemuck::cast_slice::<u8, T>(&data)[..count].to_vec();
        }
        staging.unmap();
        Ok(out)
    }
}
