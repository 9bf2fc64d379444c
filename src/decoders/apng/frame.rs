use crate::log_warn;

/// Placement of a frame on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        FrameRect { x, y, width, height }
    }

    pub fn canvas(width: u32, height: u32) -> Self {
        FrameRect::new(0, 0, width, height)
    }

    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the rect is non-empty and lies entirely inside a `width` x `height` canvas.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty() && self.right() <= width as u64 && self.bottom() <= height as u64
    }

    pub fn contains(&self, other: &FrameRect) -> bool {
        self.x <= other.x && self.y <= other.y && self.right() >= other.right() && self.bottom() >= other.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalMethod {
    Keep,
    RestoreBackground,
    RestorePrevious,
}

impl DisposalMethod {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => DisposalMethod::Keep,
            1 => DisposalMethod::RestoreBackground,
            2 => DisposalMethod::RestorePrevious,
            _ => {
                log_warn!("Invalid fcTL dispose_op: {}", byte);
                DisposalMethod::Keep
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Source,
    Over,
}

impl BlendMode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => BlendMode::Source,
            1 => BlendMode::Over,
            _ => {
                log_warn!("Invalid fcTL blend_op: {}", byte);
                BlendMode::Source
            }
        }
    }
}

/// Location of one fdAT payload (sequence number excluded) in the source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRange {
    pub offset: u64,
    pub length: u32,
}

/// Display duration in milliseconds from an fcTL delay fraction.
///
/// A zero denominator means hundredths of a second.
pub fn normalize_duration(delay_num: u16, delay_den: u16) -> u32 {
    if delay_den == 0 {
        delay_num as u32 * 10
    } else {
        delay_num as u32 * 1000 / delay_den as u32
    }
}

/// Everything the scanner learned about one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDescriptor {
    index: u32,
    rect: FrameRect,
    duration_ms: u32,
    disposal: DisposalMethod,
    blend: BlendMode,
    required_frame: Option<u32>,
    has_alpha: bool,
    complete: bool,
    uses_base_image: bool,
    data_ranges: Vec<DataRange>,
}

impl FrameDescriptor {
    pub fn new(
        index: u32,
        rect: FrameRect,
        duration_ms: u32,
        disposal: DisposalMethod,
        blend: BlendMode,
        uses_base_image: bool,
    ) -> Self {
        FrameDescriptor {
            index,
            rect,
            duration_ms,
            disposal,
            blend,
            required_frame: None,
            has_alpha: true,
            complete: false,
            uses_base_image,
            data_ranges: Vec::new(),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn rect(&self) -> FrameRect {
        self.rect
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    pub fn disposal(&self) -> DisposalMethod {
        self.disposal
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    pub fn required_frame(&self) -> Option<u32> {
        self.required_frame
    }

    /// Whether the frame can leave transparent pixels on the canvas: the image has alpha, or the
    /// frame does not cover the whole canvas.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True when the frame's pixels are the IDAT image rather than fdAT data.
    pub fn uses_base_image(&self) -> bool {
        self.uses_base_image
    }

    pub fn data_ranges(&self) -> &[DataRange] {
        &self.data_ranges
    }

    /// Sum of the recorded payload lengths.
    pub fn data_len(&self) -> u64 {
        self.data_ranges.iter().map(|r| r.length as u64).sum()
    }

    pub fn info(&self) -> FrameInfo {
        FrameInfo {
            rect: self.rect,
            duration_ms: self.duration_ms,
            disposal: self.disposal,
            blend: self.blend,
            required_frame: self.required_frame,
            has_alpha: self.has_alpha,
            complete: self.complete,
        }
    }

    pub(crate) fn set_has_alpha(&mut self, has_alpha: bool) {
        self.has_alpha = has_alpha;
    }

    pub(crate) fn set_required_frame(&mut self, required_frame: Option<u32>) {
        self.required_frame = required_frame;
    }

    pub(crate) fn push_range(&mut self, range: DataRange) {
        if self.complete {
            log_warn!("Ignoring data for closed frame {}", self.index);
            return;
        }

        self.data_ranges.push(range);
    }

    pub(crate) fn close(&mut self) {
        self.complete = true;
    }
}

/// Per-frame metadata handed to callers and to the external compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub rect: FrameRect,
    pub duration_ms: u32,
    pub disposal: DisposalMethod,
    pub blend: BlendMode,
    pub required_frame: Option<u32>,
    pub has_alpha: bool,
    pub complete: bool,
}
