//! Vendor cluster frame codec.
//!
//! Layout: `status:u8, tsn:u8, dp:u8, dp_type:u8, len:u16 BE, data[len]`.
use shade_traits::VendorCommand;
use thiserror::Error;

use crate::report::{DataPointType, RawReport};

const HEADER_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short: {0} bytes")]
    Incomplete(usize),
    #[error("declared length {declared} but {actual} data bytes follow")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("unsupported data point type 0x{0:02x}")]
    UnsupportedType(u8),
}

/// Split a received frame into a report. The payload is `[dp_type] ++ data`.
pub fn decode_frame(tag: u8, bytes: &[u8]) -> Result<RawReport, FrameError> {
    if bytes.len() < HEADER_LEN {
        return Err(FrameError::Incomplete(bytes.len()));
    }
    let dp = bytes[2];
    let dp_type = bytes[3];
    DataPointType::try_from(dp_type).map_err(FrameError::UnsupportedType)?;
    let declared = usize::from(u16::from_be_bytes([bytes[4], bytes[5]]));
    let data = &bytes[HEADER_LEN..];
    if data.len() != declared {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: data.len(),
        });
    }
    let mut payload = Vec::with_capacity(1 + data.len());
    payload.push(dp_type);
    payload.extend_from_slice(data);
    Ok(RawReport {
        dp,
        tag,
        payload,
    })
}

/// Encode an outbound SET_DATA frame.
///
/// Value data points carry 4 big-endian bytes; Bool and Enum carry one.
pub fn encode_command(
    tsn: u8,
    cmd: &VendorCommand,
    dp_type: DataPointType,
) -> Result<Vec<u8>, FrameError> {
    let data: Vec<u8> = match dp_type {
        DataPointType::Value => cmd.value.to_be_bytes().to_vec(),
        DataPointType::Bool | DataPointType::Enum => {
            let b = u8::try_from(cmd.value)
                .map_err(|_| FrameError::UnsupportedType(dp_type as u8))?;
            vec![b]
        }
        other => return Err(FrameError::UnsupportedType(other as u8)),
    };
    let mut out = Vec::with_capacity(HEADER_LEN + data.len());
    out.extend_from_slice(&[0x00, tsn, cmd.dp, dp_type as u8]);
    // data is at most 4 bytes
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(&data);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_frame_lands_low_byte_at_index_four() {
        let bytes = [0x00, 0x11, 3, 0x02, 0x00, 0x04, 0, 0, 0, 42];
        let r = decode_frame(0x01, &bytes).unwrap();
        assert_eq!(r.dp, 3);
        assert_eq!(r.tag, 0x01);
        assert_eq!(r.payload, vec![0x02, 0, 0, 0, 42]);
        assert_eq!(r.payload[4], 42);
    }

    #[test]
    fn enum_frame_lands_at_index_one() {
        let bytes = [0x00, 0x01, 12, 0x04, 0x00, 0x01, 1];
        let r = decode_frame(0x02, &bytes).unwrap();
        assert_eq!(r.payload, vec![0x04, 1]);
    }

    #[test]
    fn rejects_malformed_frames() {
        assert_eq!(decode_frame(1, &[0, 1, 3]), Err(FrameError::Incomplete(3)));
        assert_eq!(
            decode_frame(1, &[0, 1, 3, 2, 0, 4, 0, 0]),
            Err(FrameError::LengthMismatch {
                declared: 4,
                actual: 2
            })
        );
        assert_eq!(
            decode_frame(1, &[0, 1, 3, 9, 0, 0]),
            Err(FrameError::UnsupportedType(9))
        );
    }

    #[test]
    fn encodes_enum_and_value_commands() {
        let open = VendorCommand::new(1, 1, true);
        assert_eq!(
            encode_command(7, &open, DataPointType::Enum).unwrap(),
            vec![0x00, 7, 1, 0x04, 0x00, 0x01, 1]
        );
        let goto = VendorCommand::new(2, 55, true);
        assert_eq!(
            encode_command(8, &goto, DataPointType::Value).unwrap(),
            vec![0x00, 8, 2, 0x02, 0x00, 0x04, 0, 0, 0, 55]
        );
        assert!(encode_command(8, &goto, DataPointType::String).is_err());
    }

    #[test]
    fn encoded_frame_decodes_back() {
        let cmd = VendorCommand::new(9, 30, false);
        let bytes = encode_command(3, &cmd, DataPointType::Value).unwrap();
        let r = decode_frame(0x02, &bytes).unwrap();
        assert_eq!(r.dp, 9);
        assert_eq!(r.value_u32(), Some(30));
    }
}
