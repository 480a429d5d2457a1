//! Deferred draw queuing.
//!
//! Draws are accumulated during the frame by [`Renderer::draw_mesh`] and consumed
//! exactly once by the PBR pass. The queue is generic over the mesh type so the
//! ordering and capacity rules can be exercised without a device.
//!
//! [`Renderer::draw_mesh`]: crate::Renderer::draw_mesh

use std::sync::Arc;

use crate::transform::Transform;

/// A queued mesh draw: a shared mesh and the transform to draw it with.
///
/// Holding an `Arc` keeps the mesh's GPU buffers alive until the frame that
/// records the draw has been encoded, even if the caller drops its handle.
pub struct DrawRequest<M> {
    pub mesh: Arc<M>,
    pub transform: Transform,
}

/// FIFO of draw requests for the current frame.
///
/// # Usage Pattern
///
/// ```ignore
/// // Each frame: queue draw calls
/// queue.push(Arc::clone(&mesh), transform);
///
/// // The PBR pass takes everything queued, at most `capacity` draws
/// let (draws, dropped) = queue.drain_clamped(capacity);
/// ```
pub struct DrawQueue<M> {
    requests: Vec<DrawRequest<M>>,
}

impl<M> DrawQueue<M> {
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
        }
    }

    /// Queues a mesh for rendering this frame.
    pub fn push(&mut self, mesh: Arc<M>, transform: Transform) {
        self.requests.push(DrawRequest { mesh, transform });
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Discard every queued draw, used when a frame is skipped.
    pub fn clear(&mut self) {
        self.requests.clear();
    }

    /// Empties the queue, yielding at most `capacity` draws in submission order.
    ///
    /// Requests past `capacity` are dropped and their count returned alongside
    /// the drain; the queue is empty afterwards either way.
    pub fn drain_clamped(
        &mut self,
        capacity: usize,
    ) -> (std::vec::Drain<'_, DrawRequest<M>>, usize) {
        let dropped = self.requests.len().saturating_sub(capacity);
        if dropped > 0 {
            log::warn!(
                "Draw queue holds {} draws but the instance buffer fits {capacity}; dropping {dropped}",
                self.requests.len()
            );
            self.requests.truncate(capacity);
        }
        (self.requests.drain(..), dropped)
    }
}

impl<M> Default for DrawQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte offset of instance slot `index` in a buffer of `stride`-sized slots.
pub fn slot_offset(index: usize, stride: u32) -> u32 {
    index as u32 * stride
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn at(x: f32) -> Transform {
        Transform::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn drains_in_submission_order() {
        let mut queue = DrawQueue::new();
        let mesh = Arc::new("cube");
        for i in 0..5 {
            queue.push(Arc::clone(&mesh), at(i as f32));
        }

        let (draws, dropped) = queue.drain_clamped(16);
        let xs: Vec<f32> = draws.map(|d| d.transform.translation.x).collect();

        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(dropped, 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn overflow_is_clamped_and_counted() {
        let mut queue = DrawQueue::new();
        let mesh = Arc::new(0u8);
        for i in 0..10 {
            queue.push(Arc::clone(&mesh), at(i as f32));
        }

        let (draws, dropped) = queue.drain_clamped(4);
        assert_eq!(draws.count(), 4);
        assert_eq!(dropped, 6);
        assert!(queue.is_empty());
        // Only the caller's handle survives once the queue has been drained.
        assert_eq!(Arc::strong_count(&mesh), 1);
    }

    #[test]
    fn second_drain_is_empty() {
        let mut queue = DrawQueue::new();
        queue.push(Arc::new(()), Transform::default());

        assert_eq!(queue.drain_clamped(8).0.count(), 1);
        assert_eq!(queue.drain_clamped(8).0.count(), 0);
    }

    #[test]
    fn queue_keeps_mesh_alive_until_drained() {
        let mut queue = DrawQueue::new();
        let mesh = Arc::new(String::from("sphere"));
        queue.push(Arc::clone(&mesh), Transform::default());
        let weak = Arc::downgrade(&mesh);
        drop(mesh);

        assert!(weak.upgrade().is_some());
        queue.clear();
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn slots_are_stride_apart() {
        assert_eq!(slot_offset(0, 256), 0);
        assert_eq!(slot_offset(1, 256), 256);
        assert_eq!(slot_offset(7, 256), 1792);
    }
}
