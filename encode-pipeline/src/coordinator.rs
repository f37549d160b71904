use super::{
    backend::{CodedBufferId, EncoderBackend, PackedHeaderType, SurfaceId},
    config::EncoderConfig,
    error::{backend_error, header_error, PipelineError, Result},
    gop::FrameType,
    params::{PictureParameters, RateControlParameters, SequenceParameters, SliceParameters},
    reference::{ReferencePicture, ReferenceTracker},
    source::{FrameSource, RawFrame},
    surface_pool::SurfacePool,
    task_queue::{PostProcessTask, TaskQueue},
};
use h264::{build_packed_picture_header, build_packed_sei_timing, build_packed_sequence_header};
use log::{debug, info, warn};
use scopeguard::{guard, ScopeGuard};
use std::{io::Write, thread};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    pub frames: u64,
    pub bytes_written: u64,
    pub idr_frames: u64,
    pub i_frames: u64,
    pub p_frames: u64,
    pub b_frames: u64,
}

impl EncodeSummary {
    fn count(&mut self, frame_type: FrameType) {
        self.frames += 1;
        match frame_type {
            FrameType::Idr => self.idr_frames += 1,
            FrameType::I => self.i_frames += 1,
            FrameType::P => self.p_frames += 1,
            FrameType::B => self.b_frames += 1,
        }
    }
}

#[derive(Clone, Copy)]
struct Resources<'a> {
    source_surfaces: &'a [SurfaceId],
    reference_surfaces: &'a [SurfaceId],
    coded_buffers: &'a [CodedBufferId],
}

fn upload<B: EncoderBackend + ?Sized>(backend: &B, surface: SurfaceId, frame: RawFrame) -> Result<()> {
    let layout = backend.surface_layout();
    let frame = if frame.layout == layout { frame } else { frame.convert(layout)? };
    backend.upload_surface(surface, &frame).map_err(backend_error("uploading surface"))
}

fn check_count(len: usize, count: usize, resource: &'static str) -> Result<()> {
    if len < count {
        return Err(PipelineError::ResourceExhausted { resource });
    }
    Ok(())
}

/// Finishes submitted frames: waits for the backend, writes the coded output, and refills the
/// source surface.
struct PostProcessor<'a, B: ?Sized, S: ?Sized, W: ?Sized> {
    backend: &'a B,
    resources: Resources<'a>,
    pool: &'a SurfacePool,
    source: &'a mut S,
    output: &'a mut W,
    bytes_written: u64,
}

impl<'a, B: EncoderBackend + ?Sized, S: FrameSource + ?Sized, W: Write + ?Sized> PostProcessor<'a, B, S, W> {
    fn process(&mut self, task: PostProcessTask) -> Result<()> {
        let slot = self.pool.slot_for(task.display_order);
        let surface = self.resources.source_surfaces[slot];
        self.backend.sync_surface(surface).map_err(backend_error("syncing surface"))?;

        let mut coded_size = 0;
        let segments = self
            .backend
            .map_coded_buffer(self.resources.coded_buffers[slot])
            .map_err(backend_error("mapping coded buffer"))?;
        for segment in segments {
            self.output.write_all(&segment)?;
            coded_size += segment.len() as u64;
        }
        self.bytes_written += coded_size;

        if self.source.refills() {
            let frame = self.source.load(task.display_order + self.pool.len() as u64)?;
            upload(self.backend, surface, frame)?;
        }
        self.pool.release(slot);

        info!("frame {} (display order {}): {} bytes coded", task.encode_order, task.display_order, coded_size);
        Ok(())
    }
}

/// Drives an `EncoderBackend` through a whole stream. Pictures are submitted in encode order from
/// the calling thread while their output is collected either inline or on a worker thread.
pub struct Pipeline<'a, B: ?Sized> {
    backend: &'a B,
    config: EncoderConfig,
    sequence: SequenceParameters,
}

impl<'a, B: EncoderBackend + ?Sized> Pipeline<'a, B> {
    /// Validates the config after adjusting it for the profile. Nothing is sent to the backend
    /// until `run` is called.
    pub fn new(backend: &'a B, mut config: EncoderConfig) -> Result<Self> {
        config.constrain_to_profile();
        config.validate()?;
        Ok(Self {
            backend,
            sequence: SequenceParameters::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn sequence_parameters(&self) -> &SequenceParameters {
        &self.sequence
    }

    /// Encodes `config.frame_count` frames from `source`, writing the coded output to `output` in
    /// encode order. Any backend failure ends the run.
    pub fn run<S, W>(&self, source: &mut S, output: &mut W) -> Result<EncodeSummary>
    where
        S: FrameSource + ?Sized,
        W: Write + Send + ?Sized,
    {
        let config = &self.config;
        let backend = self.backend;
        info!(
            "encoding {} frames at {}x{}, {} fps, {} bps ({:?} profile, {} mode)",
            config.frame_count,
            config.width,
            config.height,
            config.frame_rate,
            config.bitrate(),
            config.profile,
            if config.sync_mode { "sync" } else { "async" }
        );

        let destroy_surfaces = move |surfaces: Vec<SurfaceId>| {
            if let Err(e) = backend.destroy_surfaces(&surfaces) {
                warn!("unable to destroy surfaces: {}", e);
            }
        };

        let source_surfaces = backend
            .create_surfaces(config.width, config.height, config.surface_count)
            .map_err(backend_error("creating source surfaces"))?;
        let source_surfaces = guard(source_surfaces, destroy_surfaces);
        check_count(source_surfaces.len(), config.surface_count, "source surfaces")?;

        let reference_surfaces = backend
            .create_surfaces(config.width, config.height, config.max_ref_frames)
            .map_err(backend_error("creating reference surfaces"))?;
        let reference_surfaces = guard(reference_surfaces, destroy_surfaces);
        check_count(reference_surfaces.len(), config.max_ref_frames, "reference surfaces")?;

        let coded_buffers = backend
            .create_coded_buffers(config.coded_buffer_size(), config.surface_count)
            .map_err(backend_error("creating coded buffers"))?;
        let coded_buffers = guard(coded_buffers, move |buffers| {
            if let Err(e) = backend.destroy_coded_buffers(&buffers) {
                warn!("unable to destroy coded buffers: {}", e);
            }
        });
        check_count(coded_buffers.len(), config.surface_count, "coded buffers")?;

        let resources = Resources {
            source_surfaces: &source_surfaces[..config.surface_count],
            reference_surfaces: &reference_surfaces[..config.max_ref_frames],
            coded_buffers: &coded_buffers[..config.surface_count],
        };

        for (i, &surface) in resources.source_surfaces.iter().enumerate() {
            upload(backend, surface, source.load(i as u64)?)?;
        }

        let pool = SurfacePool::new(config.surface_count);
        let mut post_processor = PostProcessor {
            backend,
            resources,
            pool: &pool,
            source,
            output,
            bytes_written: 0,
        };

        let summary = if config.sync_mode {
            let summary = self.submit(resources, &pool, |task| post_processor.process(task))?;
            EncodeSummary {
                bytes_written: post_processor.bytes_written,
                ..summary
            }
        } else {
            let frame_count = config.frame_count;
            let queue = TaskQueue::new();
            let (submitted, processed) = thread::scope(|s| -> Result<_> {
                let (pool, queue) = (&pool, &queue);
                let worker = thread::Builder::new().name("post-process".to_owned()).spawn_scoped(s, move || -> Result<u64> {
                    let failed = guard((), |_| {
                        pool.abort();
                        queue.close();
                    });
                    for _ in 0..frame_count {
                        let task = queue.pop().ok_or(PipelineError::PostProcessingAborted)?;
                        post_processor.process(task)?;
                    }
                    ScopeGuard::into_inner(failed);
                    Ok(post_processor.bytes_written)
                })?;

                let submitted = {
                    let _close = guard(queue, |queue| queue.close());
                    self.submit(resources, pool, |task| {
                        if queue.push(task) {
                            Ok(())
                        } else {
                            Err(PipelineError::PostProcessingAborted)
                        }
                    })
                };
                let processed = worker.join().unwrap_or_else(|e| std::panic::resume_unwind(e));
                Ok((submitted, processed))
            })?;

            match (submitted, processed) {
                (Ok(summary), Ok(bytes_written)) => EncodeSummary { bytes_written, ..summary },
                // A failure on one side aborts the other, so report the failure that came first.
                (Err(PipelineError::PostProcessingAborted), Err(e)) | (Err(e), _) | (Ok(_), Err(e)) => return Err(e),
            }
        };

        info!(
            "encoded {} frames ({} IDR, {} I, {} P, {} B), {} bytes",
            summary.frames, summary.idr_frames, summary.i_frames, summary.p_frames, summary.b_frames, summary.bytes_written
        );
        Ok(summary)
    }

    fn submit<F>(&self, resources: Resources<'_>, pool: &SurfacePool, mut post_process: F) -> Result<EncodeSummary>
    where
        F: FnMut(PostProcessTask) -> Result<()>,
    {
        let config = &self.config;
        let sequence = &self.sequence;
        let backend = self.backend;
        let rate_control = RateControlParameters::new(config);
        let max_frame_num = sequence.max_frame_num();

        let mut summary = EncodeSummary::default();
        let mut tracker = ReferenceTracker::new();
        // frame_num restarts with each IDR frame and wraps at MaxFrameNum, but reference surfaces
        // are used round robin.
        let mut frame_num = 0;
        let mut reference_count = 0;
        let mut idr_encode_order = 0;

        for encode_order in 0..config.frame_count {
            let frame = config.gop.schedule(encode_order);
            debug!(
                "frame {}: {:?}, display order {}",
                frame.encode_order, frame.frame_type, frame.display_order
            );

            let slot = pool.slot_for(frame.display_order);
            pool.wait_encodable(slot)?;

            if frame.frame_type == FrameType::Idr {
                frame_num = 0;
                idr_encode_order = encode_order;
            }

            let reference_surface = reference_count % resources.reference_surfaces.len();
            let current = ReferencePicture {
                surface: resources.reference_surfaces[reference_surface],
                frame_idx: frame_num,
                top_field_order_cnt: 2 * frame.display_order,
            };
            tracker.begin_frame(current, frame.frame_type);

            let mut picture = PictureParameters::new(config, &frame, current, frame_num, resources.coded_buffers[slot]);
            let mut slice = SliceParameters::new(sequence, &frame);
            if config.ref_override {
                picture.reference_frames = tracker.full_reference_list(resources.reference_surfaces, &current, encode_order);
                slice.override_references(&tracker, frame.frame_type);
            } else {
                picture.set_references(&tracker, frame.frame_type);
            }

            backend
                .begin_picture(resources.source_surfaces[slot])
                .map_err(backend_error("beginning picture"))?;

            if encode_order == 0 {
                backend
                    .render_sequence(sequence, &rate_control)
                    .map_err(backend_error("rendering sequence parameters"))?;
            }
            backend.render_picture(&picture).map_err(backend_error("rendering picture parameters"))?;

            if encode_order == 0 && config.packed_headers {
                let header = build_packed_sequence_header(&sequence.to_sequence_parameter_set()).map_err(header_error)?;
                backend
                    .render_packed_header(PackedHeaderType::Sequence, &header)
                    .map_err(backend_error("rendering packed sequence header"))?;

                let header = build_packed_picture_header(&picture.to_picture_parameter_set()).map_err(header_error)?;
                backend
                    .render_packed_header(PackedHeaderType::Picture, &header)
                    .map_err(backend_error("rendering packed picture header"))?;
            }

            if config.timing_sei && frame.frame_type == FrameType::Idr {
                let header =
                    build_packed_sei_timing(&sequence.buffering_period(), &sequence.pic_timing(&frame, idr_encode_order)).map_err(header_error)?;
                backend
                    .render_packed_header(PackedHeaderType::Sei, &header)
                    .map_err(backend_error("rendering packed sei"))?;
            }

            backend.render_slice(&slice).map_err(backend_error("rendering slice parameters"))?;
            backend.end_picture().map_err(backend_error("ending picture"))?;

            pool.mark_pending(slot);
            post_process(PostProcessTask {
                display_order: frame.display_order,
                encode_order,
            })?;

            tracker.finish_frame(frame.frame_type);
            if frame.frame_type.is_reference() {
                frame_num = (frame_num + 1) % max_frame_num;
                reference_count += 1;
            }
            summary.count(frame.frame_type);
        }

        Ok(summary)
    }
}
