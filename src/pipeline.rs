//! WGSL compute pipeline infrastructure.
//!
//! Provides pipeline, shader-module, and bind-group-layout caching plus
//! dispatch helpers shared by every kernel launcher in the crate. Scratch
//! sub-regions bind as `BufferBinding { offset, size }`, which is why all
//! scratch offsets are aligned to the 256-byte storage-offset alignment.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, Buffer, BufferBinding, BufferBindingType,
    ComputePipeline, ComputePipelineDescriptor, Device, PipelineLayoutDescriptor, ShaderModule,
    ShaderModuleDescriptor, ShaderSource, ShaderStages,
};

/// Workgroup size for all compute shaders in this crate.
pub const WORKGROUP_SIZE: u32 = 256;

/// Hard dispatch ceiling: workgroups per dimension times lanes per workgroup.
pub const MAX_DISPATCH_LANES: u64 = 65_535 * WORKGROUP_SIZE as u64;

/// A bound slice of a buffer: the whole buffer or a 256-aligned sub-region.
#[derive(Clone, Copy)]
pub struct BufRegion<'a> {
    /// Underlying buffer
    pub buffer: &'a Buffer,
    /// Byte offset of the region start
    pub offset: u64,
    /// Region length in bytes
    pub size: u64,
}

impl<'a> BufRegion<'a> {
    /// Bind an entire buffer.
    pub fn whole(buffer: &'a Buffer) -> Self {
        Self {
            buffer,
            offset: 0,
            size: buffer.size(),
        }
    }

    /// Bind a sub-region of a buffer.
    pub fn slice(buffer: &'a Buffer, offset: u64, size: u64) -> Self {
        Self {
            buffer,
            offset,
            size,
        }
    }
}

/// Key for the bind group layout cache.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    /// Number of storage buffers in the layout
    pub num_storage_buffers: u32,
    /// Number of uniform buffers in the layout
    pub num_uniform_buffers: u32,
}

/// Cache for compute pipelines keyed by (shader module, entry point).
pub struct PipelineCache {
    device: Arc<Device>,
    modules: Mutex<HashMap<&'static str, Arc<ShaderModule>>>,
    pipelines: Mutex<HashMap<(&'static str, &'static str), Arc<ComputePipeline>>>,
    layouts: Mutex<HashMap<LayoutKey, Arc<BindGroupLayout>>>,
}

impl PipelineCache {
    /// Create a new pipeline cache for a device.
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            modules: Mutex::new(HashMap::new()),
            pipelines: Mutex::new(HashMap::new()),
            layouts: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create a shader module.
    pub fn get_or_create_module(&self, name: &'static str, source: &str) -> Arc<ShaderModule> {
        let mut modules = self.modules.lock();
        if let Some(module) = modules.get(name) {
            return module.clone();
        }

        let module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });

        let module = Arc::new(module);
        modules.insert(name, module.clone());
        module
    }

    /// Get or create a compute pipeline.
    pub fn get_or_create_pipeline(
        &self,
        shader_name: &'static str,
        entry_point: &'static str,
        module: &ShaderModule,
        layout: &BindGroupLayout,
    ) -> Arc<ComputePipeline> {
        let key = (shader_name, entry_point);
        let mut pipelines = self.pipelines.lock();

        if let Some(pipeline) = pipelines.get(&key) {
            return pipeline.clone();
        }

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{}_layout", shader_name)),
                bind_group_layouts: &[layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&ComputePipelineDescriptor {
                label: Some(&format!("{}_{}", shader_name, entry_point)),
                layout: Some(&pipeline_layout),
                module,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            });

        let pipeline = Arc::new(pipeline);
        pipelines.insert(key, pipeline.clone());
        pipeline
    }

    /// Get or create a bind group layout: N read-write storage buffers
    /// followed by M uniform buffers.
    pub fn get_or_create_layout(&self, key: LayoutKey) -> Arc<BindGroupLayout> {
        let mut layouts = self.layouts.lock();

        if let Some(layout) = layouts.get(&key) {
            return layout.clone();
        }

        let mut entries = Vec::new();

        for i in 0..key.num_storage_buffers {
            entries.push(BindGroupLayoutEntry {
                binding: i,
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        for i in 0..key.num_uniform_buffers {
            entries.push(BindGroupLayoutEntry {
                binding: key.num_storage_buffers + i,
                visibility: ShaderStages::COMPUTE,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        let layout = self
            .device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("sparsefmt_layout"),
                entries: &entries,
            });

        let layout = Arc::new(layout);
        layouts.insert(key, layout.clone());
        layout
    }

    /// Create a bind group from buffer regions, in binding order.
    pub fn create_bind_group(&self, layout: &BindGroupLayout, regions: &[BufRegion]) -> BindGroup {
        let entries: Vec<BindGroupEntry> = regions
            .iter()
            .enumerate()
            .map(|(i, region)| BindGroupEntry {
                binding: i as u32,
                resource: BindingResource::Buffer(BufferBinding {
                    buffer: region.buffer,
                    offset: region.offset,
                    size: NonZeroU64::new(region.size),
                }),
            })
            .collect();

        self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("sparsefmt_bind_group"),
            layout,
            entries: &entries,
        })
    }

    /// Get device reference.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

/// Compute number of workgroups for n lanes.
#[inline]
pub fn workgroup_count(n: u64) -> u32 {
    (n as u32).div_ceil(WORKGROUP_SIZE)
}
