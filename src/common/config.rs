//! Configuration constants for the buffer pool.

/// Size of a page in bytes (4KB).
///
/// Shared by every [`PageFile`](crate::storage::PageFile) and the buffer pool:
/// a frame holds exactly one page of this size.
pub const PAGE_SIZE: usize = 4096;

/// Page directory capacity relative to the number of frames.
///
/// Keeping the table a bit larger than the frame count keeps the load
/// factor low even when every frame is occupied.
pub const DIRECTORY_SIZING_FACTOR: f64 = 1.2;

/// Initial capacity of the page directory for a pool of `frame_count` frames.
///
/// Roughly `1.2 × frame_count`, nudged to the next odd number.
pub fn directory_capacity(frame_count: usize) -> usize {
    let scaled = (frame_count as f64 * DIRECTORY_SIZING_FACTOR) as usize;
    scaled / 2 * 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_directory_capacity_is_odd() {
        for frames in 1..200 {
            let cap = directory_capacity(frames);
            assert_eq!(cap % 2, 1, "capacity for {} frames", frames);
            assert!(cap as f64 >= frames as f64 * DIRECTORY_SIZING_FACTOR - 1.0);
        }
    }

    #[test]
    fn test_directory_capacity_values() {
        assert_eq!(directory_capacity(1), 1);
        assert_eq!(directory_capacity(3), 3);
        assert_eq!(directory_capacity(10), 13);
        assert_eq!(directory_capacity(100), 121);
    }
}
