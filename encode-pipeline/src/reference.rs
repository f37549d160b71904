use super::{backend::SurfaceId, config::MAX_REFERENCE_FRAMES, gop::FrameType};

/// A reconstructed picture that can be used for prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferencePicture {
    pub surface: SurfaceId,
    pub frame_idx: u32,
    pub top_field_order_cnt: u64,
}

/// Tracks the two most recent reference pictures. P frames predict from the last one and B frames
/// from both.
#[derive(Clone, Debug, Default)]
pub struct ReferenceTracker {
    current: Option<ReferencePicture>,
    last: Option<ReferencePicture>,
    second_last: Option<ReferencePicture>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ReferencePicture> {
        self.current.as_ref()
    }

    pub fn last(&self) -> Option<&ReferencePicture> {
        self.last.as_ref()
    }

    pub fn second_last(&self) -> Option<&ReferencePicture> {
        self.second_last.as_ref()
    }

    /// Records the picture being encoded. B frames aren't recorded.
    pub fn begin_frame(&mut self, picture: ReferencePicture, frame_type: FrameType) {
        if frame_type.is_reference() {
            self.current = Some(picture);
        }
    }

    /// Makes the current picture the last reference once a reference frame has been submitted.
    pub fn finish_frame(&mut self, frame_type: FrameType) {
        if frame_type.is_reference() {
            self.second_last = self.last;
            self.last = self.current;
        }
    }

    /// The references `frame_type` predicts from, in list order.
    pub fn reference_list(&self, frame_type: FrameType) -> Vec<ReferencePicture> {
        match frame_type {
            FrameType::Idr | FrameType::I => vec![],
            FrameType::P => self.last.into_iter().collect(),
            FrameType::B => self.second_last.into_iter().chain(self.last).collect(),
        }
    }

    /// Enumerates every reference surface, for backends that expect all of them in each picture.
    /// The entry sharing the current picture's surface is tagged with `2 * encode_order`, other
    /// entries carry the order count of the tracked picture on that surface if there is one.
    /// Entries past the end of `surfaces` are invalid.
    pub fn full_reference_list(
        &self,
        surfaces: &[SurfaceId],
        current: &ReferencePicture,
        encode_order: u64,
    ) -> [Option<ReferencePicture>; MAX_REFERENCE_FRAMES] {
        let mut ret = [None; MAX_REFERENCE_FRAMES];
        for (i, &surface) in surfaces.iter().take(MAX_REFERENCE_FRAMES).enumerate() {
            let top_field_order_cnt = if surface == current.surface {
                2 * encode_order
            } else {
                [self.last, self.second_last]
                    .iter()
                    .flatten()
                    .find(|p| p.surface == surface)
                    .map(|p| p.top_field_order_cnt)
                    .unwrap_or(0)
            };
            ret[i] = Some(ReferencePicture {
                surface,
                frame_idx: i as u32,
                top_field_order_cnt,
            });
        }
        ret
    }
}
