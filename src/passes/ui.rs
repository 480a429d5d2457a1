//! Overlay composited on top of the tonemapped frame.

use super::{FrameContext, RenderPass};
use crate::gpu::GpuContext;

/// An immediate-mode UI (editor panels, debug overlays) drawn over the frame.
///
/// [`begin_frame`](Self::begin_frame) and [`end_frame`](Self::end_frame)
/// bracket the caller's UI building for one frame; [`render`](Self::render)
/// then draws into a pass that has already loaded the presentable image.
pub trait UiOverlay {
    fn begin_frame(&mut self) {}

    fn end_frame(&mut self) {}

    fn render(&mut self, gpu: &GpuContext, pass: &mut wgpu::RenderPass<'_>);
}

/// Hosts an optional [`UiOverlay`].
///
/// Without an overlay the pass records nothing.
#[derive(Default)]
pub struct UiPass {
    overlay: Option<Box<dyn UiOverlay>>,
    in_frame: bool,
}

impl UiPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_overlay(&mut self, overlay: Box<dyn UiOverlay>) {
        self.overlay = Some(overlay);
        self.in_frame = false;
    }

    pub fn take_overlay(&mut self) -> Option<Box<dyn UiOverlay>> {
        self.in_frame = false;
        self.overlay.take()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Start building this frame's UI. Repeated calls without an
    /// [`end_frame`](Self::end_frame) are ignored.
    pub fn begin_frame(&mut self) {
        if self.in_frame {
            log::debug!("UI frame already open");
            return;
        }
        if let Some(overlay) = &mut self.overlay {
            overlay.begin_frame();
            self.in_frame = true;
        }
    }

    pub fn end_frame(&mut self) {
        if !self.in_frame {
            return;
        }
        if let Some(overlay) = &mut self.overlay {
            overlay.end_frame();
        }
        self.in_frame = false;
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }
}

impl RenderPass for UiPass {
    fn render(
        &mut self,
        ctx: &mut FrameContext,
        target: &wgpu::TextureView,
        _resolve_target: Option<&wgpu::TextureView>,
    ) {
        // A frame left open by the caller is closed before drawing.
        self.end_frame();

        let Some(overlay) = &mut self.overlay else {
            return;
        };

        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("UI Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        overlay.render(ctx.gpu, &mut pass);
    }

    fn label(&self) -> &'static str {
        "UI Pass"
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<&'static str>>>,
    }

    impl UiOverlay for Recorder {
        fn begin_frame(&mut self) {
            self.events.borrow_mut().push("begin");
        }

        fn end_frame(&mut self) {
            self.events.borrow_mut().push("end");
        }

        fn render(&mut self, _gpu: &GpuContext, _pass: &mut wgpu::RenderPass<'_>) {
            self.events.borrow_mut().push("render");
        }
    }

    #[test]
    fn frames_are_bracketed_once() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut pass = UiPass::new();
        pass.set_overlay(Box::new(Recorder {
            events: Rc::clone(&events),
        }));

        pass.begin_frame();
        pass.begin_frame();
        assert!(pass.in_frame());
        pass.end_frame();
        pass.end_frame();

        assert_eq!(*events.borrow(), vec!["begin", "end"]);
        assert!(!pass.in_frame());
    }

    #[test]
    fn no_overlay_never_opens_a_frame() {
        let mut pass = UiPass::new();
        pass.begin_frame();

        assert!(!pass.in_frame());
        assert!(!pass.has_overlay());
    }
}
