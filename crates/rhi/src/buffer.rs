//! GPU buffers holding fixed-stride instances.
//!
//! A [`Buffer`] is a linear array of `instance_count` instances, each
//! occupying `alignment_size` bytes (the instance size rounded up to the
//! device's minimum offset alignment). Memory comes from gpu-allocator.
//!
//! # Host access
//!
//! Host-visible allocations are persistently mapped by the allocator, so
//! [`Buffer::map`] and [`Buffer::unmap`] open and close a logical mapped
//! window. Reads, writes, flushes and invalidations are only allowed inside
//! that window. Buffers in device-local memory are filled through a staging
//! copy instead.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use renderer_rhi::device::Device;
//! use renderer_rhi::buffer::{Buffer, BufferUsage};
//! use renderer_rhi::vk;
//!
//! # fn example(device: Arc<Device>) -> Result<(), renderer_rhi::RhiError> {
//! let alignment = device.limits().min_uniform_buffer_offset_alignment;
//! let mut ubo = Buffer::new(device, "frame ubo", BufferUsage::Uniform, 64, 2, alignment)?;
//!
//! ubo.map(vk::WHOLE_SIZE, 0)?;
//! ubo.write_at_index(&[0u8; 64], 1)?;
//! ubo.flush_at_index(1)?;
//! # Ok(())
//! # }
//! ```

use std::ops::Range;
use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::{debug, error};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Buffer usage type.
///
/// Selects both the Vulkan usage flags and the memory location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Device-local vertex data, filled by a transfer
    Vertex,
    /// Device-local index data, filled by a transfer
    Index,
    /// Host-visible uniform data updated every frame
    Uniform,
    /// Host-visible transfer source for uploads
    Staging,
}

impl BufferUsage {
    /// Converts to Vulkan buffer usage flags.
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Index => {
                vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
        }
    }

    /// Returns the memory location for this buffer type.
    ///
    /// `CpuToGpu` is host-visible, `GpuOnly` is device-local only.
    pub fn memory_location(self) -> MemoryLocation {
        match self {
            BufferUsage::Vertex | BufferUsage::Index => MemoryLocation::GpuOnly,
            BufferUsage::Uniform | BufferUsage::Staging => MemoryLocation::CpuToGpu,
        }
    }

    /// Returns a human-readable name for the buffer type.
    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
            BufferUsage::Staging => "staging",
        }
    }
}

/// Rounds `instance_size` up to a multiple of `min_offset_alignment`.
///
/// `min_offset_alignment` must be zero or a power of two. Zero means no
/// alignment requirement.
#[inline]
pub fn alignment_size(
    instance_size: vk::DeviceSize,
    min_offset_alignment: vk::DeviceSize,
) -> vk::DeviceSize {
    if min_offset_alignment > 0 {
        (instance_size + min_offset_alignment - 1) & !(min_offset_alignment - 1)
    } else {
        instance_size
    }
}

/// Resolves `(size, offset)` against `limit`, expanding `WHOLE_SIZE` to the
/// rest of the range.
fn resolve_range(
    size: vk::DeviceSize,
    offset: vk::DeviceSize,
    limit: vk::DeviceSize,
) -> RhiResult<Range<vk::DeviceSize>> {
    let size = if size == vk::WHOLE_SIZE {
        limit.saturating_sub(offset)
    } else {
        size
    };

    match offset.checked_add(size) {
        Some(end) if end <= limit => Ok(offset..end),
        _ => Err(RhiError::BufferOutOfBounds {
            offset,
            size,
            limit,
        }),
    }
}

/// Computes the `(offset, size)` of a `VkMappedMemoryRange` covering
/// `[offset, offset + size)` of a buffer whose memory occupies
/// `allocation_offset .. allocation_offset + allocation_size`, widened to
/// multiples of `atom_size`.
///
/// When rounding the end up would leave the allocation, the size becomes
/// `vk::WHOLE_SIZE`, which covers the rest of the memory object and is
/// valid for any atom-aligned offset.
pub fn mapped_memory_range(
    allocation_offset: vk::DeviceSize,
    allocation_size: vk::DeviceSize,
    range: Range<vk::DeviceSize>,
    atom_size: vk::DeviceSize,
) -> (vk::DeviceSize, vk::DeviceSize) {
    let atom = atom_size.max(1);
    let start = (allocation_offset + range.start) / atom * atom;
    let end = (allocation_offset + range.end).div_ceil(atom) * atom;
    if end > allocation_offset + allocation_size {
        (start, vk::WHOLE_SIZE)
    } else {
        (start, end - start)
    }
}

/// Host-side bookkeeping for a buffer's mapped window.
///
/// Holds the byte range currently open for host access and performs the
/// bounds-checked copies between that window and the mapped bytes.
#[derive(Debug)]
pub struct MappedWindow {
    name: String,
    buffer_size: vk::DeviceSize,
    open: Option<Range<vk::DeviceSize>>,
}

impl MappedWindow {
    /// Creates a closed window over a buffer of `buffer_size` bytes.
    pub fn new(name: &str, buffer_size: vk::DeviceSize) -> Self {
        Self {
            name: name.to_string(),
            buffer_size,
            open: None,
        }
    }

    /// Opens `[offset, offset + size)`. `vk::WHOLE_SIZE` extends to the end.
    pub fn open(&mut self, size: vk::DeviceSize, offset: vk::DeviceSize) -> RhiResult<()> {
        self.open = Some(resolve_range(size, offset, self.buffer_size)?);
        Ok(())
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn buffer_size(&self) -> vk::DeviceSize {
        self.buffer_size
    }

    /// Resolves `(size, offset)` and checks it lies inside the open window.
    ///
    /// # Errors
    ///
    /// - [`RhiError::BufferNotMapped`] if the window is closed
    /// - [`RhiError::BufferOutOfBounds`] if the region leaves the window
    pub fn checked_range(
        &self,
        size: vk::DeviceSize,
        offset: vk::DeviceSize,
    ) -> RhiResult<Range<vk::DeviceSize>> {
        let window = self
            .open
            .clone()
            .ok_or_else(|| RhiError::BufferNotMapped(self.name.clone()))?;
        let range = resolve_range(size, offset, self.buffer_size)?;
        if range.start < window.start || range.end > window.end {
            return Err(RhiError::BufferOutOfBounds {
                offset,
                size: range.end - range.start,
                limit: window.end,
            });
        }
        Ok(range)
    }

    /// Copies `data` into `memory`.
    ///
    /// With `size = vk::WHOLE_SIZE` exactly `buffer_size` bytes go to the
    /// start of the buffer and `offset` is ignored.
    pub fn write(
        &self,
        memory: &mut [u8],
        data: &[u8],
        size: vk::DeviceSize,
        offset: vk::DeviceSize,
    ) -> RhiResult<()> {
        let range = if size == vk::WHOLE_SIZE {
            self.checked_range(self.buffer_size, 0)?
        } else {
            self.checked_range(size, offset)?
        };
        let len = range.end - range.start;
        let source = data.get(..len as usize).ok_or(RhiError::BufferOutOfBounds {
            offset: 0,
            size: len,
            limit: data.len() as vk::DeviceSize,
        })?;

        let memory_len = memory.len() as vk::DeviceSize;
        let target = memory
            .get_mut(range.start as usize..range.end as usize)
            .ok_or(RhiError::BufferOutOfBounds {
                offset: range.start,
                size: len,
                limit: memory_len,
            })?;
        target.copy_from_slice(source);
        Ok(())
    }

    /// Copies `size` bytes at `offset` out of `memory`.
    pub fn read(
        &self,
        memory: &[u8],
        size: vk::DeviceSize,
        offset: vk::DeviceSize,
    ) -> RhiResult<Vec<u8>> {
        let range = self.checked_range(size, offset)?;
        memory
            .get(range.start as usize..range.end as usize)
            .map(<[u8]>::to_vec)
            .ok_or(RhiError::BufferOutOfBounds {
                offset: range.start,
                size: range.end - range.start,
                limit: memory.len() as vk::DeviceSize,
            })
    }
}

/// GPU buffer of fixed-stride instances with allocator-managed memory.
///
/// Memory and the buffer handle are released together on drop.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    host: MappedWindow,
    usage: BufferUsage,
    instance_size: vk::DeviceSize,
    instance_count: u32,
    alignment_size: vk::DeviceSize,
}

impl Buffer {
    /// Creates a buffer for `instance_count` instances of `instance_size`
    /// bytes.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `name` - Debug name used for the allocation and in logs
    /// * `usage` - Usage, which also decides the memory location
    /// * `instance_size` - Raw size of one instance in bytes
    /// * `instance_count` - Number of instances
    /// * `min_offset_alignment` - Required alignment of each instance start,
    ///   or 1 for tightly packed data
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty or creation/allocation fails.
    pub fn new(
        device: Arc<Device>,
        name: &str,
        usage: BufferUsage,
        instance_size: vk::DeviceSize,
        instance_count: u32,
        min_offset_alignment: vk::DeviceSize,
    ) -> RhiResult<Self> {
        let alignment_size = alignment_size(instance_size, min_offset_alignment);
        let buffer_size = alignment_size * vk::DeviceSize::from(instance_count);
        if buffer_size == 0 {
            return Err(RhiError::InvalidHandle(format!(
                "Buffer '{name}' must have a non-zero size"
            )));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(buffer_size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocated = device.lock_allocator().allocate(&AllocationCreateDesc {
            name,
            requirements,
            location: usage.memory_location(),
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocated {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e.into());
            }
        };

        let bound = unsafe {
            device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        };
        if let Err(e) = bound {
            if let Err(free_err) = device.lock_allocator().free(allocation) {
                error!("Failed to free allocation of '{}': {}", name, free_err);
            }
            unsafe { device.handle().destroy_buffer(buffer, None) };
            return Err(e.into());
        }

        debug!(
            "Created {} buffer '{}': {} x {} bytes",
            usage.name(),
            name,
            instance_count,
            alignment_size
        );

        Ok(Self {
            device,
            buffer,
            allocation: Some(allocation),
            host: MappedWindow::new(name, buffer_size),
            usage,
            instance_size,
            instance_count,
            alignment_size,
        })
    }

    // =========================================================================
    // Mapping
    // =========================================================================

    /// Opens `[offset, offset + size)` for host access.
    ///
    /// `size = vk::WHOLE_SIZE` maps from `offset` to the end of the buffer.
    ///
    /// # Errors
    ///
    /// - [`RhiError::BufferNotHostVisible`] for device-local memory
    /// - [`RhiError::BufferOutOfBounds`] if the range exceeds the buffer
    pub fn map(&mut self, size: vk::DeviceSize, offset: vk::DeviceSize) -> RhiResult<()> {
        if !self.is_host_visible() {
            return Err(RhiError::BufferNotHostVisible(self.host.name().to_string()));
        }
        self.host.open(size, offset)
    }

    /// Closes the mapped window. Does nothing if the buffer is not mapped.
    pub fn unmap(&mut self) {
        self.host.close();
    }

    /// Returns true while a mapped window is open.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.host.is_open()
    }

    /// Returns true if the memory can be accessed by the host.
    pub fn is_host_visible(&self) -> bool {
        self.allocation
            .as_ref()
            .is_some_and(|allocation| allocation.mapped_ptr().is_some())
    }

    // =========================================================================
    // Host access
    // =========================================================================

    /// Copies `data` into the mapped memory.
    ///
    /// With `size = vk::WHOLE_SIZE` exactly `buffer_size` bytes are copied
    /// to the start of the buffer and `offset` is ignored. Otherwise `size`
    /// bytes are copied to `offset`. `data` must hold at least that many
    /// bytes.
    ///
    /// # Errors
    ///
    /// - [`RhiError::BufferNotMapped`] if `map` was not called
    /// - [`RhiError::BufferOutOfBounds`] if the region leaves the mapped
    ///   window or `data` is too short
    pub fn write_to_buffer(
        &mut self,
        data: &[u8],
        size: vk::DeviceSize,
        offset: vk::DeviceSize,
    ) -> RhiResult<()> {
        let host = &self.host;
        let memory = self
            .allocation
            .as_mut()
            .and_then(|allocation| allocation.mapped_slice_mut())
            .ok_or_else(|| RhiError::BufferNotHostVisible(host.name().to_string()))?;
        host.write(memory, data, size, offset)
    }

    /// Copies `size` bytes at `offset` out of the mapped memory.
    ///
    /// `size = vk::WHOLE_SIZE` reads to the end of the buffer. Call
    /// [`Buffer::invalidate`] first for non-coherent memory written by the
    /// device.
    pub fn read(&self, size: vk::DeviceSize, offset: vk::DeviceSize) -> RhiResult<Vec<u8>> {
        let memory = self
            .allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_slice())
            .ok_or_else(|| RhiError::BufferNotHostVisible(self.host.name().to_string()))?;
        self.host.read(memory, size, offset)
    }

    /// Makes host writes in the region visible to the device.
    ///
    /// Only needed for non-coherent memory. The range is widened to the
    /// device's non-coherent atom size.
    pub fn flush(&self, size: vk::DeviceSize, offset: vk::DeviceSize) -> RhiResult<()> {
        let range = self.memory_range(size, offset)?;
        unsafe {
            self.device
                .handle()
                .flush_mapped_memory_ranges(std::slice::from_ref(&range))?;
        }
        Ok(())
    }

    /// Makes device writes in the region visible to the host.
    ///
    /// Only needed for non-coherent memory.
    pub fn invalidate(&self, size: vk::DeviceSize, offset: vk::DeviceSize) -> RhiResult<()> {
        let range = self.memory_range(size, offset)?;
        unsafe {
            self.device
                .handle()
                .invalidate_mapped_memory_ranges(std::slice::from_ref(&range))?;
        }
        Ok(())
    }

    fn memory_range(
        &self,
        size: vk::DeviceSize,
        offset: vk::DeviceSize,
    ) -> RhiResult<vk::MappedMemoryRange<'static>> {
        let range = self.host.checked_range(size, offset)?;
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| RhiError::BufferNotHostVisible(self.host.name().to_string()))?;

        let atom = self.device.limits().non_coherent_atom_size;
        let (memory_offset, memory_size) =
            mapped_memory_range(allocation.offset(), allocation.size(), range, atom);

        Ok(vk::MappedMemoryRange::default()
            .memory(unsafe { allocation.memory() })
            .offset(memory_offset)
            .size(memory_size))
    }

    /// Describes `[offset, offset + size)` for a descriptor write.
    pub fn descriptor_info(
        &self,
        size: vk::DeviceSize,
        offset: vk::DeviceSize,
    ) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.buffer,
            offset,
            range: size,
        }
    }

    // =========================================================================
    // Per-instance access
    // =========================================================================

    /// Writes one instance at `index`.
    pub fn write_at_index(&mut self, data: &[u8], index: u32) -> RhiResult<()> {
        let offset = self.index_offset(index);
        self.write_to_buffer(data, self.instance_size, offset)
    }

    /// Flushes the aligned slot of instance `index`.
    pub fn flush_at_index(&self, index: u32) -> RhiResult<()> {
        self.flush(self.alignment_size, self.index_offset(index))
    }

    /// Invalidates the aligned slot of instance `index`.
    pub fn invalidate_at_index(&self, index: u32) -> RhiResult<()> {
        self.invalidate(self.alignment_size, self.index_offset(index))
    }

    /// Describes the aligned slot of instance `index`.
    pub fn descriptor_info_for_index(&self, index: u32) -> vk::DescriptorBufferInfo {
        self.descriptor_info(self.alignment_size, self.index_offset(index))
    }

    #[inline]
    fn index_offset(&self, index: u32) -> vk::DeviceSize {
        vk::DeviceSize::from(index) * self.alignment_size
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.host.name()
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Total size in bytes (`alignment_size * instance_count`).
    #[inline]
    pub fn buffer_size(&self) -> vk::DeviceSize {
        self.host.buffer_size()
    }

    #[inline]
    pub fn instance_size(&self) -> vk::DeviceSize {
        self.instance_size
    }

    #[inline]
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    #[inline]
    pub fn alignment_size(&self) -> vk::DeviceSize {
        self.alignment_size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.unmap();

        if let Some(allocation) = self.allocation.take()
            && let Err(e) = self.device.lock_allocator().free(allocation)
        {
            error!("Failed to free buffer '{}': {}", self.host.name(), e);
        }

        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        debug!("Destroyed {} buffer '{}'", self.usage.name(), self.host.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_flags_and_location() {
        assert!(
            BufferUsage::Vertex
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST)
        );
        assert!(
            BufferUsage::Index
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST)
        );
        assert_eq!(
            BufferUsage::Staging.to_vk_usage(),
            vk::BufferUsageFlags::TRANSFER_SRC
        );
        assert_eq!(BufferUsage::Vertex.memory_location(), MemoryLocation::GpuOnly);
        assert_eq!(BufferUsage::Index.memory_location(), MemoryLocation::GpuOnly);
        assert_eq!(
            BufferUsage::Uniform.memory_location(),
            MemoryLocation::CpuToGpu
        );
        assert_eq!(
            BufferUsage::Staging.memory_location(),
            MemoryLocation::CpuToGpu
        );
    }

    #[test]
    fn test_alignment_size_rounds_up_to_power_of_two() {
        for alignment in [1u64, 2, 4, 16, 64, 256] {
            for size in 1u64..=600 {
                let aligned = alignment_size(size, alignment);
                assert_eq!(aligned % alignment, 0, "size {size}, alignment {alignment}");
                assert!(aligned >= size);
                assert!(aligned < size + alignment);
            }
        }
    }

    #[test]
    fn test_alignment_size_zero_alignment_is_identity() {
        assert_eq!(alignment_size(13, 0), 13);
        assert_eq!(alignment_size(64, 0), 64);
    }

    #[test]
    fn test_alignment_size_examples() {
        assert_eq!(alignment_size(144, 256), 256);
        assert_eq!(alignment_size(256, 256), 256);
        assert_eq!(alignment_size(257, 256), 512);
    }

    #[test]
    fn test_resolve_range_whole_size() {
        assert_eq!(resolve_range(vk::WHOLE_SIZE, 0, 512).unwrap(), 0..512);
        assert_eq!(resolve_range(vk::WHOLE_SIZE, 256, 512).unwrap(), 256..512);
        assert_eq!(resolve_range(64, 128, 512).unwrap(), 128..192);
    }

    #[test]
    fn test_resolve_range_out_of_bounds() {
        assert!(matches!(
            resolve_range(64, 480, 512),
            Err(RhiError::BufferOutOfBounds {
                offset: 480,
                size: 64,
                limit: 512
            })
        ));
        assert!(resolve_range(u64::MAX - 1, 2, 512).is_err());
    }

    #[test]
    fn test_mapped_memory_range_is_atom_aligned() {
        let (offset, size) = mapped_memory_range(1000, 4096, 10..30, 64);
        assert_eq!(offset, 960);
        assert_eq!(size, 128);
        assert_eq!(offset % 64, 0);
        assert_eq!(size % 64, 0);
        assert!(offset <= 1010 && offset + size >= 1030);
    }

    #[test]
    fn test_mapped_memory_range_zero_atom() {
        assert_eq!(mapped_memory_range(16, 48, 0..48, 0), (16, 48));
    }

    #[test]
    fn test_mapped_memory_range_stays_inside_dedicated_memory() {
        // 100-byte dedicated allocation, 64-byte atoms: rounding up to 128
        // would overrun the memory object.
        let (offset, size) = mapped_memory_range(0, 100, 0..100, 64);
        assert_eq!(offset, 0);
        assert_eq!(size, vk::WHOLE_SIZE);

        let (offset, size) = mapped_memory_range(0, 100, 0..40, 64);
        assert_eq!((offset, size), (0, 64));
        assert!(offset + size <= 100);
    }

    #[test]
    fn test_mapped_memory_range_rounds_within_suballocation() {
        // The atom-rounded end stays inside the allocation, so the size is
        // kept explicit.
        let (offset, size) = mapped_memory_range(256, 256, 0..100, 64);
        assert_eq!((offset, size), (256, 128));
        assert!(offset + size <= 256 + 256);
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn test_window_write_then_read_returns_same_bytes() {
        let mut window = MappedWindow::new("ubo", 64);
        let mut memory = vec![0u8; 64];
        window.open(vk::WHOLE_SIZE, 0).unwrap();

        let data = pattern(64);
        window.write(&mut memory, &data, vk::WHOLE_SIZE, 0).unwrap();
        assert_eq!(window.read(&memory, vk::WHOLE_SIZE, 0).unwrap(), data);
        // Reading again does not disturb the contents.
        assert_eq!(window.read(&memory, vk::WHOLE_SIZE, 0).unwrap(), data);

        window.write(&mut memory, &[9, 8, 7, 6], 4, 16).unwrap();
        assert_eq!(window.read(&memory, 4, 16).unwrap(), vec![9, 8, 7, 6]);
        assert_eq!(window.read(&memory, 16, 0).unwrap(), data[..16]);
    }

    #[test]
    fn test_window_closed_is_not_mapped() {
        let mut window = MappedWindow::new("ubo", 32);
        let mut memory = vec![0u8; 32];

        assert!(matches!(
            window.write(&mut memory, &[1, 2, 3, 4], 4, 0),
            Err(RhiError::BufferNotMapped(ref name)) if name == "ubo"
        ));
        assert!(matches!(
            window.read(&memory, 4, 0),
            Err(RhiError::BufferNotMapped(_))
        ));

        window.open(vk::WHOLE_SIZE, 0).unwrap();
        window.close();
        assert!(!window.is_open());
        assert!(matches!(
            window.write(&mut memory, &[1, 2, 3, 4], 4, 0),
            Err(RhiError::BufferNotMapped(_))
        ));
        assert!(memory.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_window_whole_size_write_copies_buffer_size_bytes() {
        let mut window = MappedWindow::new("staging", 64);
        // The allocation may be larger than the buffer.
        let mut memory = vec![0xAAu8; 96];
        window.open(vk::WHOLE_SIZE, 0).unwrap();

        let data = pattern(80);
        window.write(&mut memory, &data, vk::WHOLE_SIZE, 32).unwrap();
        assert_eq!(memory[..64], data[..64]);
        assert!(memory[64..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_window_rejects_access_outside_partial_window() {
        let mut window = MappedWindow::new("ubo", 128);
        let mut memory = vec![0u8; 128];
        window.open(32, 16).unwrap();

        assert!(matches!(
            window.write(&mut memory, &[0; 8], 8, 0),
            Err(RhiError::BufferOutOfBounds { .. })
        ));
        assert!(matches!(
            window.write(&mut memory, &[0; 8], 8, 44),
            Err(RhiError::BufferOutOfBounds { .. })
        ));
        assert!(matches!(
            window.write(&mut memory, &[0; 128], vk::WHOLE_SIZE, 0),
            Err(RhiError::BufferOutOfBounds { .. })
        ));
        assert!(window.read(&memory, 16, 48).is_err());

        window.write(&mut memory, &[5; 8], 8, 40).unwrap();
        assert_eq!(window.read(&memory, 8, 40).unwrap(), vec![5; 8]);
    }

    #[test]
    fn test_window_rejects_short_source() {
        let mut window = MappedWindow::new("ubo", 64);
        let mut memory = vec![0u8; 64];
        window.open(vk::WHOLE_SIZE, 0).unwrap();

        assert!(matches!(
            window.write(&mut memory, &[1, 2, 3, 4], 8, 0),
            Err(RhiError::BufferOutOfBounds { size: 8, limit: 4, .. })
        ));
        assert!(window.write(&mut memory, &pattern(32), vk::WHOLE_SIZE, 0).is_err());
        assert!(memory.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_window_open_beyond_buffer_fails() {
        let mut window = MappedWindow::new("ubo", 64);
        assert!(window.open(32, 48).is_err());
        assert!(!window.is_open());
    }

    #[test]
    fn test_buffer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Buffer>();
    }
}
