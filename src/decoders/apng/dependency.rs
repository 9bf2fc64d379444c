use crate::decoders::apng::frame::{BlendMode, DisposalMethod, FrameDescriptor, FrameRect};

/// Decides which earlier frame a newly opened frame must be composited onto.
pub trait FrameDependencyRule {
    /// `prior` holds every frame before `frame`, indexed by frame index. `reports_alpha` tells
    /// whether the image format can produce transparent pixels at all.
    fn required_frame(
        &self,
        frame: &FrameDescriptor,
        prior: &[FrameDescriptor],
        canvas: FrameRect,
        reports_alpha: bool,
    ) -> Option<u32>;
}

/// Dependency rule following APNG compositing semantics.
///
/// A frame is independent when it repaints the whole canvas opaquely (or with `Source` blend), or
/// when the canvas it lands on was fully cleared. Otherwise it depends on the most recent frame
/// whose disposal leaves pixels it can see: `RestorePrevious` frames are skipped, frames entirely
/// covered by the new one are looked through, and `RestoreBackground` frames hand the dependency
/// on to whatever they themselves required.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApngDependencyRule;

impl FrameDependencyRule for ApngDependencyRule {
    fn required_frame(
        &self,
        frame: &FrameDescriptor,
        prior: &[FrameDescriptor],
        canvas: FrameRect,
        reports_alpha: bool,
    ) -> Option<u32> {
        let index = frame.index() as usize;
        if index == 0 {
            return None;
        }

        let blends_with_previous = frame.blend() == BlendMode::Over;
        if (!reports_alpha || !blends_with_previous) && frame.rect() == canvas {
            return None;
        }

        let mut prev = prior.get(index - 1)?;
        while prev.disposal() == DisposalMethod::RestorePrevious {
            if prev.index() == 0 {
                return None;
            }
            prev = prior.get(prev.index() as usize - 1)?;
        }

        let clears_prev = prev.disposal() == DisposalMethod::RestoreBackground;
        if clears_prev && (prev.rect() == canvas || prev.required_frame().is_none()) {
            return None;
        }

        if reports_alpha && blends_with_previous {
            return Some(prev.index());
        }

        // Frames hidden entirely under this one contribute nothing of their own.
        while frame.rect().contains(&prev.rect()) {
            prev = prior.get(prev.required_frame()? as usize)?;
        }

        if prev.disposal() == DisposalMethod::RestoreBackground {
            if prev.rect() == canvas || prev.required_frame().is_none() {
                return None;
            }
            return prev.required_frame();
        }

        Some(prev.index())
    }
}
