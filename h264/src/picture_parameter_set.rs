use super::{decode, encode, syntax_elements::*, Bitstream, BitstreamWriter, Decode, Encode};

use std::io;

// ITU-T H.264, 04/2017, 7.3.2.2
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PictureParameterSet {
    pub pic_parameter_set_id: UE,
    pub seq_parameter_set_id: UE,
    pub entropy_coding_mode_flag: U1,
    pub bottom_field_pic_order_in_frame_present_flag: U1,
    pub num_slice_groups_minus1: UE,
    pub num_ref_idx_l0_default_active_minus1: UE,
    pub num_ref_idx_l1_default_active_minus1: UE,
    pub weighted_pred_flag: U1,
    pub weighted_bipred_idc: U2,
    pub pic_init_qp_minus26: SE,
    pub pic_init_qs_minus26: SE,
    pub chroma_qp_index_offset: SE,
    pub deblocking_filter_control_present_flag: U1,
    pub constrained_intra_pred_flag: U1,
    pub redundant_pic_cnt_present_flag: U1,

    // if (more_rbsp_data()) {
    pub transform_8x8_mode_flag: U1,
    pub pic_scaling_matrix_present_flag: U1,
    pub second_chroma_qp_index_offset: SE,
    // }
}

impl Decode for PictureParameterSet {
    fn decode<T: AsRef<[u8]>>(bs: &mut Bitstream<T>) -> io::Result<Self> {
        let mut ret = Self::default();

        decode!(
            bs,
            &mut ret.pic_parameter_set_id,
            &mut ret.seq_parameter_set_id,
            &mut ret.entropy_coding_mode_flag,
            &mut ret.bottom_field_pic_order_in_frame_present_flag,
            &mut ret.num_slice_groups_minus1
        )?;

        if ret.num_slice_groups_minus1.0 > 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "slice groups are not supported"));
        }

        decode!(
            bs,
            &mut ret.num_ref_idx_l0_default_active_minus1,
            &mut ret.num_ref_idx_l1_default_active_minus1,
            &mut ret.weighted_pred_flag,
            &mut ret.weighted_bipred_idc,
            &mut ret.pic_init_qp_minus26,
            &mut ret.pic_init_qs_minus26,
            &mut ret.chroma_qp_index_offset,
            &mut ret.deblocking_filter_control_present_flag,
            &mut ret.constrained_intra_pred_flag,
            &mut ret.redundant_pic_cnt_present_flag
        )?;

        if bs.more_rbsp_data() {
            decode!(bs, &mut ret.transform_8x8_mode_flag, &mut ret.pic_scaling_matrix_present_flag)?;

            if ret.pic_scaling_matrix_present_flag.0 != 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "decoding scaling matrices is not supported"));
            }

            decode!(bs, &mut ret.second_chroma_qp_index_offset)?;
        } else {
            ret.second_chroma_qp_index_offset = ret.chroma_qp_index_offset;
        }

        Ok(ret)
    }
}

impl Encode for PictureParameterSet {
    fn encode(&self, bs: &mut BitstreamWriter) -> io::Result<()> {
        if self.num_slice_groups_minus1.0 > 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "slice groups are not supported"));
        } else if self.pic_scaling_matrix_present_flag.0 != 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "encoding scaling matrices is not supported"));
        }

        encode!(
            bs,
            &self.pic_parameter_set_id,
            &self.seq_parameter_set_id,
            &self.entropy_coding_mode_flag,
            &self.bottom_field_pic_order_in_frame_present_flag,
            &self.num_slice_groups_minus1,
            &self.num_ref_idx_l0_default_active_minus1,
            &self.num_ref_idx_l1_default_active_minus1,
            &self.weighted_pred_flag,
            &self.weighted_bipred_idc,
            &self.pic_init_qp_minus26,
            &self.pic_init_qs_minus26,
            &self.chroma_qp_index_offset,
            &self.deblocking_filter_control_present_flag,
            &self.constrained_intra_pred_flag,
            &self.redundant_pic_cnt_present_flag,
            &self.transform_8x8_mode_flag,
            &self.pic_scaling_matrix_present_flag,
            &self.second_chroma_qp_index_offset
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn high_profile_pps() -> PictureParameterSet {
        PictureParameterSet {
            entropy_coding_mode_flag: U1(1),
            pic_init_qp_minus26: SE(2),
            deblocking_filter_control_present_flag: U1(1),
            transform_8x8_mode_flag: U1(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_picture_parameter_set() {
        let mut bs = BitstreamWriter::new();
        high_profile_pps().encode(&mut bs).unwrap();
        bs.rbsp_trailing_bits().unwrap();
        assert_eq!(bs.finish().data, vec![0xee, 0x09, 0xcb]);

        let pps = PictureParameterSet {
            entropy_coding_mode_flag: U1(0),
            transform_8x8_mode_flag: U1(0),
            ..high_profile_pps()
        };
        let mut bs = BitstreamWriter::new();
        pps.encode(&mut bs).unwrap();
        bs.rbsp_trailing_bits().unwrap();
        assert_eq!(bs.finish().data, vec![0xce, 0x09, 0xc3]);
    }

    #[test]
    fn test_decode_picture_parameter_set() {
        let pps = PictureParameterSet::decode(&mut Bitstream::new(&[0xee, 0x09, 0xcb])).unwrap();
        assert_eq!(pps, high_profile_pps());

        // Without the optional trailing fields the second chroma offset inherits the first.
        let pps = PictureParameterSet::decode(&mut Bitstream::new(&[0xce, 0x09, 0xc8])).unwrap();
        assert_eq!(pps.transform_8x8_mode_flag.0, 0);
        assert_eq!(pps.pic_init_qp_minus26.0, 2);
        assert_eq!(pps.second_chroma_qp_index_offset, pps.chroma_qp_index_offset);
    }

    #[test]
    fn test_slice_groups_rejected() {
        let pps = PictureParameterSet {
            num_slice_groups_minus1: UE(1),
            ..Default::default()
        };
        let mut bs = BitstreamWriter::new();
        assert_eq!(pps.encode(&mut bs).unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }
}
