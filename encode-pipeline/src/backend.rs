use super::{
    error::BackendError,
    params::{PictureParameters, RateControlParameters, SequenceParameters, SliceParameters},
    source::{PixelLayout, RawFrame},
};
use bytes::Bytes;
use h264::PackedHeader;

pub type BackendResult<T> = Result<T, BackendError>;

/// An opaque handle to a backend surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

/// An opaque handle to a backend buffer that receives a picture's coded output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodedBufferId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackedHeaderType {
    Sequence,
    Picture,
    Sei,
}

/// The device side of the pipeline. Pictures are submitted by one thread while another thread
/// syncs surfaces and maps coded buffers, so implementations must be usable through a shared
/// reference.
///
/// A picture is submitted as `begin_picture`, any number of `render_*` calls, then `end_picture`.
pub trait EncoderBackend: Send + Sync {
    /// The layout source frames must be in to be uploaded.
    fn surface_layout(&self) -> PixelLayout;

    fn create_surfaces(&self, width: u32, height: u32, count: usize) -> BackendResult<Vec<SurfaceId>>;
    fn destroy_surfaces(&self, surfaces: &[SurfaceId]) -> BackendResult<()>;

    fn create_coded_buffers(&self, size: usize, count: usize) -> BackendResult<Vec<CodedBufferId>>;
    fn destroy_coded_buffers(&self, buffers: &[CodedBufferId]) -> BackendResult<()>;

    /// Copies `frame`, which is in `surface_layout()`, into the surface.
    fn upload_surface(&self, surface: SurfaceId, frame: &RawFrame) -> BackendResult<()>;

    fn begin_picture(&self, surface: SurfaceId) -> BackendResult<()>;
    fn render_sequence(&self, sequence: &SequenceParameters, rate_control: &RateControlParameters) -> BackendResult<()>;
    fn render_picture(&self, picture: &PictureParameters) -> BackendResult<()>;
    fn render_packed_header(&self, header_type: PackedHeaderType, header: &PackedHeader) -> BackendResult<()>;
    fn render_slice(&self, slice: &SliceParameters) -> BackendResult<()>;
    fn end_picture(&self) -> BackendResult<()>;

    /// Blocks until the picture encoded from the surface is complete and the surface can be
    /// written again.
    fn sync_surface(&self, surface: SurfaceId) -> BackendResult<()>;

    /// Returns the coded output of the last picture that targeted the buffer, as one or more
    /// segments.
    fn map_coded_buffer(&self, buffer: CodedBufferId) -> BackendResult<Vec<Bytes>>;
}
