mod bindable;
mod readback_buffer;
mod storage_buffer;

pub use self::bindable::*;
pub use self::readback_buffer::*;
pub use self::storage_buffer::*;

/// Rounds given size up to the buffer alignment wgpu expects from copies and
/// writes; empty buffers get a single block so they can still be bound.
pub(crate) fn pad_size(size: usize) -> usize {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;

    size.max(16).div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    #[test]
    fn pad_size() {
        assert_eq!(16, super::pad_size(0));
        assert_eq!(16, super::pad_size(16));
        assert_eq!(20, super::pad_size(17));
        assert_eq!(80, super::pad_size(80));
    }
}
