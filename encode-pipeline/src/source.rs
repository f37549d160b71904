use super::error::{PipelineError, Result};
use log::warn;
use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    /// A Y plane followed by an interleaved UV plane.
    Nv12,
    /// Y, U, and V planes.
    I420,
    /// Y, V, and U planes.
    Yv12,
    /// Packed 4:2:2, U Y V Y.
    Uyvy,
    /// Packed 4:2:2, Y U Y V.
    Yuy2,
}

impl PixelLayout {
    pub fn is_planar(self) -> bool {
        matches!(self, Self::Nv12 | Self::I420 | Self::Yv12)
    }

    pub fn frame_size(self, width: u32, height: u32) -> usize {
        let luma = width as usize * height as usize;
        if self.is_planar() {
            luma * 3 / 2
        } else {
            luma * 2
        }
    }
}

/// An uncompressed frame with tightly packed planes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    pub layout: PixelLayout,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// The samples of a plane, in storage order. NV12 has 2 planes, packed layouts have 1.
    pub fn samples(&self, plane: usize) -> &[u8] {
        let luma = self.width as usize * self.height as usize;
        let quarter = luma / 4;
        let range = match (self.layout, plane) {
            (PixelLayout::Uyvy | PixelLayout::Yuy2, 0) => 0..self.data.len(),
            (PixelLayout::Nv12 | PixelLayout::I420 | PixelLayout::Yv12, 0) => 0..luma,
            (PixelLayout::Nv12, 1) => luma..luma + 2 * quarter,
            (PixelLayout::I420 | PixelLayout::Yv12, 1) => luma..luma + quarter,
            (PixelLayout::I420 | PixelLayout::Yv12, 2) => luma + quarter..luma + 2 * quarter,
            _ => return &[],
        };
        self.data.get(range).unwrap_or(&[])
    }

    /// Returns the U and V planes.
    fn chroma_planes(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        Ok(match self.layout {
            PixelLayout::Nv12 => {
                let uv = self.samples(1);
                (uv.iter().step_by(2).copied().collect(), uv.iter().skip(1).step_by(2).copied().collect())
            }
            PixelLayout::I420 => (self.samples(1).to_vec(), self.samples(2).to_vec()),
            PixelLayout::Yv12 => (self.samples(2).to_vec(), self.samples(1).to_vec()),
            layout => return Err(PipelineError::UnsupportedPixelLayout { layout }),
        })
    }

    /// Re-arranges the planes of a 4:2:0 frame. Packed 4:2:2 layouts can't be converted to or from.
    pub fn convert(&self, layout: PixelLayout) -> Result<RawFrame> {
        if layout == self.layout {
            return Ok(self.clone());
        } else if !layout.is_planar() {
            return Err(PipelineError::UnsupportedPixelLayout { layout });
        }

        let (u, v) = self.chroma_planes()?;
        let mut data = Vec::with_capacity(layout.frame_size(self.width, self.height));
        data.extend_from_slice(self.samples(0));
        match layout {
            PixelLayout::Nv12 => {
                for (u, v) in u.into_iter().zip(v) {
                    data.push(u);
                    data.push(v);
                }
            }
            PixelLayout::I420 => {
                data.extend(u);
                data.extend(v);
            }
            _ => {
                data.extend(v);
                data.extend(u);
            }
        }

        Ok(RawFrame {
            layout,
            width: self.width,
            height: self.height,
            data,
        })
    }
}

/// Provides the source frame for each display order.
pub trait FrameSource: Send {
    fn load(&mut self, index: u64) -> Result<RawFrame>;

    /// Whether frames should be reloaded into surfaces after they're encoded. If not, each surface
    /// keeps the frame it was first loaded with.
    fn refills(&self) -> bool;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn load(&mut self, index: u64) -> Result<RawFrame> {
        (**self).load(index)
    }

    fn refills(&self) -> bool {
        (**self).refills()
    }
}

const BOX_WIDTH: u32 = 8;

/// Generates a checkerboard that scrolls down by a row each frame.
pub struct SyntheticSource {
    layout: PixelLayout,
    width: u32,
    height: u32,
}

impl SyntheticSource {
    pub fn new(layout: PixelLayout, width: u32, height: u32) -> Self {
        Self { layout, width, height }
    }
}

impl FrameSource for SyntheticSource {
    fn load(&mut self, index: u64) -> Result<RawFrame> {
        let row_shift = (index % (2 * BOX_WIDTH) as u64) as u32;
        let (width, height) = (self.width as usize, self.height as usize);

        let mut data = Vec::with_capacity(PixelLayout::I420.frame_size(self.width, self.height));
        for row in 0..self.height {
            let band = (row + row_shift) / BOX_WIDTH;
            data.extend((0..self.width).map(|col| if (col / BOX_WIDTH + band) % 2 == 0 { 0xeb } else { 0x10 }));
        }
        let quarter = width / 2 * (height / 2);
        data.resize(width * height + quarter, 0x80);
        data.resize(width * height + 2 * quarter, 0x80);

        RawFrame {
            layout: PixelLayout::I420,
            width: self.width,
            height: self.height,
            data,
        }
        .convert(self.layout)
    }

    fn refills(&self) -> bool {
        false
    }
}

/// Reads frames from raw 4:2:0 video, wrapping around at the end.
pub struct YuvFileSource<R> {
    reader: R,
    file_layout: PixelLayout,
    surface_layout: PixelLayout,
    width: u32,
    height: u32,
    frames: u64,
}

impl YuvFileSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P, file_layout: PixelLayout, surface_layout: PixelLayout, width: u32, height: u32) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?), file_layout, surface_layout, width, height)
    }
}

impl<R: Read + Seek + Send> YuvFileSource<R> {
    pub fn new(mut reader: R, file_layout: PixelLayout, surface_layout: PixelLayout, width: u32, height: u32) -> Result<Self> {
        for layout in [file_layout, surface_layout] {
            if !layout.is_planar() {
                return Err(PipelineError::UnsupportedPixelLayout { layout });
            }
        }

        let len = reader.seek(SeekFrom::End(0))?;
        let frames = len / file_layout.frame_size(width, height) as u64;
        if frames == 0 {
            return Err(PipelineError::ResourceExhausted { resource: "source frames" });
        }

        Ok(Self {
            reader,
            file_layout,
            surface_layout,
            width,
            height,
            frames,
        })
    }

    /// The number of complete frames in the file.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl<R: Read + Seek + Send> FrameSource for YuvFileSource<R> {
    fn load(&mut self, index: u64) -> Result<RawFrame> {
        let frame_size = self.file_layout.frame_size(self.width, self.height);
        self.reader.seek(SeekFrom::Start(index % self.frames * frame_size as u64))?;

        let mut data = vec![0; frame_size];
        self.reader.read_exact(&mut data)?;

        RawFrame {
            layout: self.file_layout,
            width: self.width,
            height: self.height,
            data,
        }
        .convert(self.surface_layout)
    }

    fn refills(&self) -> bool {
        true
    }
}

/// Opens the file at `path` if there is one. A file that can't be opened falls back to the
/// synthetic pattern.
pub fn open_source(
    path: Option<&Path>,
    file_layout: PixelLayout,
    surface_layout: PixelLayout,
    width: u32,
    height: u32,
) -> Result<Box<dyn FrameSource>> {
    if let Some(path) = path {
        match File::open(path) {
            Ok(f) => return Ok(Box::new(YuvFileSource::new(BufReader::new(f), file_layout, surface_layout, width, height)?)),
            Err(e) => warn!("unable to open {}, using a synthetic source instead: {}", path.display(), e),
        }
    }
    if !surface_layout.is_planar() {
        return Err(PipelineError::UnsupportedPixelLayout { layout: surface_layout });
    }
    Ok(Box::new(SyntheticSource::new(surface_layout, width, height)))
}
