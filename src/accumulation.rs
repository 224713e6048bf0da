//! Ping-pong history buffers for progressive accumulation.
//!
//! Two equally sized float targets trade roles every frame: the trace pass
//! reads the previous estimate from one and writes the refined estimate into
//! the other. `frame_count` is the number of samples already folded into the
//! buffer that the next frame will read as history.

use crate::error::Result;

/// Creates and clears accumulation targets on behalf of the buffer manager.
pub trait TargetAllocator {
    type Target;

    /// Creates one full-resolution float colour target.
    ///
    /// Must fail when the target is not usable as both a render attachment and
    /// an exactly-sampled texture.
    fn create_target(&mut self, label: &str, width: u32, height: u32) -> Result<Self::Target>;

    /// Fills the target with opaque black.
    fn clear_target(&mut self, target: &Self::Target);
}

pub struct AccumulationBuffers<T> {
    targets: [T; 2],
    width: u32,
    height: u32,
    write_index: usize,
    frame_count: u32,
}

impl<T> AccumulationBuffers<T> {
    pub fn allocate<A>(allocator: &mut A, width: u32, height: u32) -> Result<Self>
    where
        A: TargetAllocator<Target = T>,
    {
        let targets = Self::create_pair(allocator, width, height)?;
        log::info!("Allocated {width}x{height} accumulation targets");

        Ok(Self {
            targets,
            width,
            height,
            write_index: 0,
            frame_count: 0,
        })
    }

    /// Replaces both targets at a new size. History is discarded.
    pub fn reallocate<A>(&mut self, allocator: &mut A, width: u32, height: u32) -> Result<()>
    where
        A: TargetAllocator<Target = T>,
    {
        self.targets = Self::create_pair(allocator, width, height)?;
        self.width = width;
        self.height = height;
        self.frame_count = 0;
        log::info!("Reallocated accumulation targets at {width}x{height}");
        Ok(())
    }

    fn create_pair<A>(allocator: &mut A, width: u32, height: u32) -> Result<[T; 2]>
    where
        A: TargetAllocator<Target = T>,
    {
        let ping = allocator.create_target("Accumulation Ping", width, height)?;
        let pong = allocator.create_target("Accumulation Pong", width, height)?;
        Ok([ping, pong])
    }

    pub fn current_write_target(&self) -> &T {
        &self.targets[self.write_index]
    }

    pub fn current_read_source(&self) -> &T {
        &self.targets[self.read_index()]
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn read_index(&self) -> usize {
        1 - self.write_index
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Swaps write/read roles and counts the sample just written.
    pub fn advance_frame(&mut self) {
        self.write_index = self.read_index();
        self.frame_count = self.frame_count.saturating_add(1);
    }

    /// Clears both targets and zeroes the counter. Roles are left as they are.
    pub fn reset<A>(&mut self, allocator: &mut A)
    where
        A: TargetAllocator<Target = T>,
    {
        for target in &self.targets {
            allocator.clear_target(target);
        }
        self.frame_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TracewError;

    #[derive(Debug, PartialEq)]
    struct FakeTarget {
        id: usize,
        size: (u32, u32),
    }

    #[derive(Default)]
    struct FakeAllocator {
        created: usize,
        cleared: Vec<usize>,
        fail_on: Option<usize>,
    }

    impl TargetAllocator for FakeAllocator {
        type Target = FakeTarget;

        fn create_target(&mut self, label: &str, width: u32, height: u32) -> Result<FakeTarget> {
            let id = self.created;
            if self.fail_on == Some(id) {
                return Err(TracewError::IncompleteTarget {
                    label: label.to_string(),
                    message: "unsupported format".to_string(),
                });
            }
            self.created += 1;
            Ok(FakeTarget { id, size: (width, height) })
        }

        fn clear_target(&mut self, target: &FakeTarget) {
            self.cleared.push(target.id);
        }
    }

    #[test]
    fn allocates_two_distinct_equal_targets() {
        let mut alloc = FakeAllocator::default();
        let buffers = AccumulationBuffers::allocate(&mut alloc, 640, 480).unwrap();

        assert_eq!(alloc.created, 2);
        assert_eq!(buffers.frame_count(), 0);
        assert_eq!(buffers.size(), (640, 480));
        assert_ne!(buffers.current_write_target().id, buffers.current_read_source().id);
        assert_eq!(buffers.current_write_target().size, buffers.current_read_source().size);
    }

    #[test]
    fn incomplete_target_is_fatal() {
        let mut alloc = FakeAllocator {
            fail_on: Some(1),
            ..Default::default()
        };
        let result = AccumulationBuffers::allocate(&mut alloc, 640, 480);
        assert!(matches!(result, Err(TracewError::IncompleteTarget { .. })));
    }

    #[test]
    fn advance_counts_and_alternates() {
        let mut alloc = FakeAllocator::default();
        let mut buffers = AccumulationBuffers::allocate(&mut alloc, 4, 4).unwrap();
        buffers.reset(&mut alloc);

        for n in 1..=9u32 {
            let previous_write = buffers.current_write_target().id;
            buffers.advance_frame();

            assert_eq!(buffers.frame_count(), n);
            assert_eq!(buffers.write_index(), n as usize % 2);
            assert_ne!(buffers.write_index(), buffers.read_index());
            // Last frame's output becomes this frame's history.
            assert_eq!(buffers.current_read_source().id, previous_write);
        }
    }

    #[test]
    fn reset_clears_both_and_keeps_roles() {
        let mut alloc = FakeAllocator::default();
        let mut buffers = AccumulationBuffers::allocate(&mut alloc, 4, 4).unwrap();
        for _ in 0..5 {
            buffers.advance_frame();
        }
        let write_before = buffers.write_index();

        buffers.reset(&mut alloc);
        assert_eq!(buffers.frame_count(), 0);
        assert_eq!(buffers.write_index(), write_before);
        assert_eq!(alloc.cleared, vec![0, 1]);

        buffers.reset(&mut alloc);
        assert_eq!(buffers.frame_count(), 0);
        assert_eq!(buffers.write_index(), write_before);
    }

    #[test]
    fn reallocate_resizes_and_discards_history() {
        let mut alloc = FakeAllocator::default();
        let mut buffers = AccumulationBuffers::allocate(&mut alloc, 4, 4).unwrap();
        buffers.advance_frame();
        buffers.advance_frame();

        buffers.reallocate(&mut alloc, 8, 2).unwrap();

        assert_eq!(alloc.created, 4);
        assert_eq!(buffers.size(), (8, 2));
        assert_eq!(buffers.frame_count(), 0);
        assert_eq!(buffers.current_write_target().size, (8, 2));
        assert_eq!(buffers.current_read_source().size, (8, 2));
    }
}
