//! Benchmarks building packed SPS, PPS and SEI headers and splitting them back apart.

use criterion::{criterion_group, criterion_main, Criterion};
use h264::*;

fn sequence_parameter_set() -> SequenceParameterSet {
    SequenceParameterSet {
        profile_idc: U8(PROFILE_IDC_HIGH),
        constraint_set3_flag: U1(1),
        level_idc: U8(41),
        chroma_format_idc: UE(1),
        log2_max_frame_num_minus4: UE(12),
        log2_max_pic_order_cnt_lsb_minus4: UE(2),
        max_num_ref_frames: UE(3),
        pic_width_in_mbs_minus1: UE(119),
        pic_height_in_map_units_minus1: UE(67),
        frame_mbs_only_flag: U1(1),
        direct_8x8_inference_flag: U1(1),
        frame_cropping_flag: U1(1),
        frame_crop_bottom_offset: UE(4),
        ..Default::default()
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let sps = sequence_parameter_set();
    let pps = PictureParameterSet {
        entropy_coding_mode_flag: U1(1),
        pic_init_qp_minus26: SE(2),
        deblocking_filter_control_present_flag: U1(1),
        transform_8x8_mode_flag: U1(1),
        ..Default::default()
    };
    let bp = BufferingPeriod {
        seq_parameter_set_id: UE(0),
        initial_cpb_removal_delay: 90000,
        initial_cpb_removal_delay_offset: 0,
        initial_cpb_removal_delay_length: 24,
    };
    let pt = PicTiming {
        cpb_removal_delay: 2,
        cpb_removal_delay_length: 24,
        dpb_output_delay: 2,
        dpb_output_delay_length: 24,
    };

    let mut g = c.benchmark_group("packed_header");
    g.bench_function("build_packed_sequence_header", |b| {
        b.iter(|| build_packed_sequence_header(&sps).unwrap());
    });
    g.bench_function("build_packed_picture_header", |b| {
        b.iter(|| build_packed_picture_header(&pps).unwrap());
    });
    g.bench_function("build_packed_sei_timing", |b| {
        b.iter(|| build_packed_sei_timing(&bp, &pt).unwrap());
    });

    let stream = [
        build_packed_sequence_header(&sps).unwrap().data,
        build_packed_picture_header(&pps).unwrap().data,
        build_packed_sei_timing(&bp, &pt).unwrap().data,
    ]
    .concat()
    .repeat(1000);
    g.throughput(criterion::Throughput::Bytes(stream.len() as u64));
    g.bench_function("iterate_annex_b", |b| {
        b.iter(|| iterate_annex_b(&stream).count());
    });
    g.warm_up_time(std::time::Duration::from_secs(1));
    g.sampling_mode(criterion::SamplingMode::Flat);
    g.sample_size(10);
    g.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
