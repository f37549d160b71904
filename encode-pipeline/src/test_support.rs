//! A backend that records every call and "encodes" each picture as a small record describing it.

use super::{
    backend::{BackendResult, CodedBufferId, EncoderBackend, PackedHeaderType, SurfaceId},
    gop::FrameType,
    params::{PictureParameters, RateControlParameters, SequenceParameters, SliceParameters, SliceType},
    source::{PixelLayout, RawFrame},
};
use bytes::Bytes;
use h264::PackedHeader;
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    thread,
    time::Duration,
};

/// The size of the coded output of each picture.
pub const RECORD_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Upload(SurfaceId),
    BeginPicture(SurfaceId),
    RenderSequence(SequenceParameters, RateControlParameters),
    RenderPicture(PictureParameters),
    RenderPackedHeader(PackedHeaderType, PackedHeader),
    RenderSlice(SliceParameters),
    EndPicture,
    Sync(SurfaceId),
    MapCodedBuffer(CodedBufferId),
}

/// A decoded coded-output record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    pub frame_type: FrameType,
    /// The first luma sample of the source surface.
    pub content: u8,
    pub display_order: u64,
}

pub fn parse_records(output: &[u8]) -> Vec<Record> {
    assert_eq!(output.len() % RECORD_SIZE, 0);
    output
        .chunks(RECORD_SIZE)
        .map(|record| Record {
            frame_type: match record[0] {
                0 => FrameType::Idr,
                1 => FrameType::I,
                2 => FrameType::P,
                _ => FrameType::B,
            },
            content: record[1],
            display_order: u64::from_be_bytes(record[2..].try_into().unwrap()),
        })
        .collect()
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    next_id: u32,
    surfaces: HashSet<SurfaceId>,
    coded_buffers: HashSet<CodedBufferId>,
    contents: HashMap<SurfaceId, u8>,
    begun: Option<SurfaceId>,
    picture: Option<PictureParameters>,
    slice_type: Option<SliceType>,
    coded: HashMap<CodedBufferId, Vec<Bytes>>,
    slices: usize,
    syncs: usize,
}

#[derive(Default)]
pub struct RecordingBackend {
    pub layout: Option<PixelLayout>,
    /// Fails the nth `render_slice` call.
    pub fail_slice_at: Option<usize>,
    /// Fails the nth `sync_surface` call.
    pub fail_sync_at: Option<usize>,
    pub sync_delay: Option<Duration>,
    pub(crate) state: Mutex<State>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().expect("the lock should not be poisoned").calls.clone()
    }

    pub fn pictures(&self) -> Vec<PictureParameters> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::RenderPicture(picture) => Some(picture),
                _ => None,
            })
            .collect()
    }

    pub fn slices(&self) -> Vec<SliceParameters> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::RenderSlice(slice) => Some(slice),
                _ => None,
            })
            .collect()
    }

    pub fn packed_headers(&self) -> Vec<(PackedHeaderType, PackedHeader)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::RenderPackedHeader(header_type, header) => Some((header_type, header)),
                _ => None,
            })
            .collect()
    }

    /// Whether every surface and buffer that was created has been destroyed.
    pub fn released_everything(&self) -> bool {
        let state = self.state.lock().expect("the lock should not be poisoned");
        state.surfaces.is_empty() && state.coded_buffers.is_empty()
    }

    fn record(&self, call: Call) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().expect("the lock should not be poisoned");
        state.calls.push(call);
        state
    }
}

impl EncoderBackend for RecordingBackend {
    fn surface_layout(&self) -> PixelLayout {
        self.layout.unwrap_or(PixelLayout::Nv12)
    }

    fn create_surfaces(&self, _width: u32, _height: u32, count: usize) -> BackendResult<Vec<SurfaceId>> {
        let mut state = self.state.lock().expect("the lock should not be poisoned");
        let first = state.next_id;
        state.next_id += count as u32;
        let surfaces: Vec<_> = (first..first + count as u32).map(SurfaceId).collect();
        state.surfaces.extend(&surfaces);
        Ok(surfaces)
    }

    fn destroy_surfaces(&self, surfaces: &[SurfaceId]) -> BackendResult<()> {
        let mut state = self.state.lock().expect("the lock should not be poisoned");
        for surface in surfaces {
            if !state.surfaces.remove(surface) {
                return Err(format!("unknown surface {:?}", surface).into());
            }
        }
        Ok(())
    }

    fn create_coded_buffers(&self, _size: usize, count: usize) -> BackendResult<Vec<CodedBufferId>> {
        let mut state = self.state.lock().expect("the lock should not be poisoned");
        let first = state.next_id;
        state.next_id += count as u32;
        let buffers: Vec<_> = (first..first + count as u32).map(CodedBufferId).collect();
        state.coded_buffers.extend(&buffers);
        Ok(buffers)
    }

    fn destroy_coded_buffers(&self, buffers: &[CodedBufferId]) -> BackendResult<()> {
        let mut state = self.state.lock().expect("the lock should not be poisoned");
        for buffer in buffers {
            if !state.coded_buffers.remove(buffer) {
                return Err(format!("unknown coded buffer {:?}", buffer).into());
            }
        }
        Ok(())
    }

    fn upload_surface(&self, surface: SurfaceId, frame: &RawFrame) -> BackendResult<()> {
        if frame.layout != self.surface_layout() {
            return Err(format!("frame is {:?}, expected {:?}", frame.layout, self.surface_layout()).into());
        }
        let mut state = self.record(Call::Upload(surface));
        state.contents.insert(surface, frame.samples(0).first().copied().unwrap_or(0));
        Ok(())
    }

    fn begin_picture(&self, surface: SurfaceId) -> BackendResult<()> {
        let mut state = self.record(Call::BeginPicture(surface));
        if state.begun.is_some() {
            return Err("picture already begun".into());
        }
        state.begun = Some(surface);
        state.picture = None;
        state.slice_type = None;
        Ok(())
    }

    fn render_sequence(&self, sequence: &SequenceParameters, rate_control: &RateControlParameters) -> BackendResult<()> {
        drop(self.record(Call::RenderSequence(sequence.clone(), *rate_control)));
        Ok(())
    }

    fn render_picture(&self, picture: &PictureParameters) -> BackendResult<()> {
        let mut state = self.record(Call::RenderPicture(picture.clone()));
        if state.begun.is_none() {
            return Err("no picture begun".into());
        }
        state.picture = Some(picture.clone());
        Ok(())
    }

    fn render_packed_header(&self, header_type: PackedHeaderType, header: &PackedHeader) -> BackendResult<()> {
        drop(self.record(Call::RenderPackedHeader(header_type, header.clone())));
        Ok(())
    }

    fn render_slice(&self, slice: &SliceParameters) -> BackendResult<()> {
        let mut state = self.record(Call::RenderSlice(slice.clone()));
        state.slices += 1;
        if Some(state.slices) == self.fail_slice_at {
            return Err("slice rejected".into());
        }
        state.slice_type = Some(slice.slice_type);
        Ok(())
    }

    fn end_picture(&self) -> BackendResult<()> {
        let mut state = self.record(Call::EndPicture);
        let surface = state.begun.take().ok_or("no picture begun")?;
        let picture = state.picture.take().ok_or("no picture parameters rendered")?;
        let frame_type = match (picture.idr_pic_flag, state.slice_type.ok_or("no slice rendered")?) {
            (true, _) => FrameType::Idr,
            (false, SliceType::I) => FrameType::I,
            (false, SliceType::P) => FrameType::P,
            (false, SliceType::B) => FrameType::B,
        };
        let content = state.contents.get(&surface).copied().unwrap_or(0);
        let display_order = picture.current_picture.top_field_order_cnt / 2;
        state.coded.insert(
            picture.coded_buffer,
            vec![
                Bytes::from(vec![frame_type as u8, content]),
                Bytes::copy_from_slice(&display_order.to_be_bytes()),
            ],
        );
        Ok(())
    }

    fn sync_surface(&self, surface: SurfaceId) -> BackendResult<()> {
        if let Some(delay) = self.sync_delay {
            thread::sleep(delay);
        }
        let mut state = self.record(Call::Sync(surface));
        state.syncs += 1;
        if Some(state.syncs) == self.fail_sync_at {
            return Err("device lost".into());
        }
        Ok(())
    }

    fn map_coded_buffer(&self, buffer: CodedBufferId) -> BackendResult<Vec<Bytes>> {
        let mut state = self.record(Call::MapCodedBuffer(buffer));
        state.coded.remove(&buffer).ok_or_else(|| "coded buffer is empty".into())
    }
}
