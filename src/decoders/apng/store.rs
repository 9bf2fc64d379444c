use crate::decoders::apng::frame::{BlendMode, DisposalMethod, FrameDescriptor, FrameInfo, FrameRect};
use crate::decoders::apng::header::AnimationHeader;

/// Animation metadata and frame descriptors built by one scan of the stream.
#[derive(Debug, Clone)]
pub struct FrameStore {
    header: AnimationHeader,
    canvas_width: u32,
    canvas_height: u32,
    interlaced: bool,
    reports_alpha: bool,
    base_data_offset: u64,
    animation: Option<Animation>,
}

#[derive(Debug, Clone)]
struct Animation {
    declared_frames: u32,
    play_count: u32,
    frames: Vec<FrameDescriptor>,
}

impl FrameStore {
    pub(crate) fn new(
        header: AnimationHeader,
        canvas_width: u32,
        canvas_height: u32,
        interlaced: bool,
        reports_alpha: bool,
        base_data_offset: u64,
    ) -> Self {
        FrameStore {
            header,
            canvas_width,
            canvas_height,
            interlaced,
            reports_alpha,
            base_data_offset,
            animation: None,
        }
    }

    /// Switches to the animated view. `canvas` is the size fixed by the first fcTL.
    pub(crate) fn set_animation(
        &mut self,
        canvas: FrameRect,
        declared_frames: u32,
        play_count: u32,
        mut frames: Vec<FrameDescriptor>,
    ) {
        frames.truncate(declared_frames as usize);
        self.canvas_width = canvas.width;
        self.canvas_height = canvas.height;
        self.animation = Some(Animation {
            declared_frames,
            play_count,
            frames,
        });
    }

    pub fn header(&self) -> &AnimationHeader {
        &self.header
    }

    pub fn canvas_width(&self) -> u32 {
        self.canvas_width
    }

    pub fn canvas_height(&self) -> u32 {
        self.canvas_height
    }

    pub fn canvas(&self) -> FrameRect {
        FrameRect::canvas(self.canvas_width, self.canvas_height)
    }

    pub fn is_interlaced(&self) -> bool {
        self.interlaced
    }

    pub fn reports_alpha(&self) -> bool {
        self.reports_alpha
    }

    /// Offset of the first IDAT chunk prefix.
    pub fn base_data_offset(&self) -> u64 {
        self.base_data_offset
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }

    pub fn declared_frames(&self) -> Option<u32> {
        self.animation.as_ref().map(|a| a.declared_frames)
    }

    pub fn frame_count(&self) -> u32 {
        match &self.animation {
            Some(animation) => animation.frames.len() as u32,
            None => 1,
        }
    }

    /// Number of times to play the animation, 0 meaning forever. Still images play once.
    pub fn repetition_count(&self) -> u32 {
        match &self.animation {
            Some(animation) => animation.play_count,
            None => 1,
        }
    }

    /// Descriptor for an animated frame. Still images have none.
    pub fn frame(&self, index: u32) -> Option<&FrameDescriptor> {
        self.animation.as_ref()?.frames.get(index as usize)
    }

    pub fn frames(&self) -> &[FrameDescriptor] {
        match &self.animation {
            Some(animation) => &animation.frames,
            None => &[],
        }
    }

    pub fn frame_info(&self, index: u32) -> Option<FrameInfo> {
        match &self.animation {
            Some(animation) => animation.frames.get(index as usize).map(|f| f.info()),
            None if index == 0 => Some(FrameInfo {
                rect: self.canvas(),
                duration_ms: 0,
                disposal: DisposalMethod::Keep,
                blend: BlendMode::Source,
                required_frame: None,
                has_alpha: self.reports_alpha,
                complete: true,
            }),
            None => None,
        }
    }
}
