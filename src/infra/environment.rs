// ============================================================
// Layer 6 — Compute Environment
// ============================================================
// Built once at startup, before any model is constructed, and
// never changed afterwards:
//
//   device_index    → which discrete GPU the run is pinned to
//   memory_fraction → share of the adapter's largest buffer the
//                     memory pools may hand out, in (0, 1]
//
// A requested adapter that does not exist is a warning, not a
// failure: the run falls back to wgpu's default adapter (which
// may be a CPU one). Only when no adapter at all can be opened
// does `apply` return an error.
//
// The budget is installed as a custom cubecl pool layout on a
// freshly registered `WgpuDevice::Existing`, so every tensor the
// run allocates goes through it.

use std::panic::{catch_unwind, AssertUnwindSafe};

use burn::backend::wgpu::{
    init_device, init_setup, AutoGraphicsApi, MemoryConfiguration, RuntimeOptions, WgpuDevice,
    WgpuSetup,
};
use cubecl_runtime::memory_management::{MemoryPoolOptions, PoolType};
use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;

/// Minimum buffer alignment wgpu storage uses.
const WGPU_MIN_ALIGNMENT: u64 = 32;

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub device_index: usize,
    pub memory_fraction: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            memory_fraction: 0.5,
        }
    }
}

impl EnvironmentConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.memory_fraction > 0.0 && self.memory_fraction <= 1.0) {
            return Err(PipelineError::Config(format!(
                "memory_fraction must be in (0, 1], got {}",
                self.memory_fraction
            )));
        }
        Ok(())
    }

    /// The adapter asked for, before availability is known.
    pub fn requested_device(&self) -> WgpuDevice {
        WgpuDevice::DiscreteGpu(self.device_index)
    }

    /// Validate, open the adapter and install the memory budget.
    /// Consumes the config so it can only be applied once per run.
    pub fn apply(self) -> Result<ComputeEnvironment, PipelineError> {
        self.validate()?;

        let (opened, setup) = select_device(self.requested_device(), open_adapter)?;

        let limits = setup.adapter.limits();
        let max_page = limits.max_storage_buffer_binding_size as u64;
        let alignment = WGPU_MIN_ALIGNMENT.max(limits.min_storage_buffer_offset_alignment as u64);
        let pools = budget_pools(max_page, alignment, self.memory_fraction);
        let page_budget = largest_page(&pools);

        let device = init_device(
            setup,
            RuntimeOptions {
                memory_config: MemoryConfiguration::Custom(pools),
                ..Default::default()
            },
        );

        tracing::info!(
            "Compute device {:?} (as {:?}), largest buffer {} of {} bytes ({:.0}%)",
            opened,
            device,
            page_budget,
            max_page,
            self.memory_fraction * 100.0
        );

        Ok(ComputeEnvironment { device })
    }
}

/// Open `requested`, or the default adapter if it is unavailable.
///
/// `try_open` returns `None` when the adapter cannot be opened.
pub fn select_device<S>(
    requested: WgpuDevice,
    try_open: impl Fn(&WgpuDevice) -> Option<S>,
) -> Result<(WgpuDevice, S), PipelineError> {
    if let Some(setup) = try_open(&requested) {
        return Ok((requested, setup));
    }
    if requested != WgpuDevice::DefaultDevice {
        tracing::warn!("Adapter {:?} is not available, falling back to the default adapter", requested);
        if let Some(setup) = try_open(&WgpuDevice::DefaultDevice) {
            return Ok((WgpuDevice::DefaultDevice, setup));
        }
    }
    Err(PipelineError::Config(format!(
        "no compute adapter could be opened (requested {requested:?})"
    )))
}

/// cubecl panics when no adapter matches the device.
fn open_adapter(device: &WgpuDevice) -> Option<WgpuSetup> {
    catch_unwind(AssertUnwindSafe(|| {
        init_setup::<AutoGraphicsApi>(device, RuntimeOptions::default())
    }))
    .ok()
}

/// Pool layout whose largest page is `fraction` of `max_page`, aligned
/// down. Below it, sliced pools shrink by 4× until 32 MiB, and a final
/// exclusive pool takes allocations under one alignment unit.
pub fn budget_pools(max_page: u64, alignment: u64, fraction: f64) -> Vec<MemoryPoolOptions> {
    let alignment = alignment.max(1);
    let scaled = (max_page as f64 * fraction) as u64;
    let top = (scaled / alignment * alignment).max(alignment);

    let mut pools = vec![MemoryPoolOptions {
        pool_type: PoolType::SlicedPages { max_slice_size: top },
        page_size: top,
        chunk_num_prealloc: 0,
        dealloc_period: None,
    }];

    let mut current = top;
    while current >= 32 * MB {
        current = (current / 4).next_multiple_of(alignment);
        pools.push(MemoryPoolOptions {
            pool_type: PoolType::SlicedPages {
                max_slice_size: current / 2u64.pow(pools.len() as u32),
            },
            page_size: current,
            chunk_num_prealloc: 0,
            dealloc_period: None,
        });
    }

    pools.push(MemoryPoolOptions {
        pool_type: PoolType::ExclusivePages,
        page_size: alignment,
        chunk_num_prealloc: 0,
        dealloc_period: None,
    });
    pools
}

fn largest_page(pools: &[MemoryPoolOptions]) -> u64 {
    pools.iter().map(|p| p.page_size).max().unwrap_or(0)
}

/// The resolved, immutable environment of a run.
#[derive(Debug, Clone)]
pub struct ComputeEnvironment {
    device: WgpuDevice,
}

impl ComputeEnvironment {
    pub fn device(&self) -> &WgpuDevice {
        &self.device
    }
}
