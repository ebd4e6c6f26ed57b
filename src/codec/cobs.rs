//! COBS (Consistent Overhead Byte Stuffing) framing
//!
//! Encodes data so the marker byte never appears in the payload, allowing it
//! as frame delimiter. The marker is a link-wide parameter: code bytes are
//! offset by the marker value so they can never collide with it.
//!
//! Buffer-reusing variants (`encode_into`, `decode_into`) avoid allocation in
//! the receive loop.

use crate::constants::COBS_MAX_RUN;
use crate::error::FrameError;
use bytes::BytesMut;

/// Code value of a full group (254 literals, no implied marker)
const FULL_GROUP: usize = COBS_MAX_RUN + 1;

/// Size of the encoded form of `len` bytes, terminator included
///
/// Exact for inputs without marker bytes, an upper bound otherwise.
/// An empty input still carries one code byte.
pub const fn max_encoded_len(len: usize) -> usize {
    let groups = len.div_ceil(COBS_MAX_RUN);
    len + if groups == 0 { 1 } else { groups } + 1
}

/// Encode data using COBS into provided buffer
///
/// Clears output buffer, encodes data with trailing marker.
/// Returns number of bytes written.
pub fn encode_into(data: &[u8], marker: u8, output: &mut Vec<u8>) -> usize {
    output.clear();
    output.reserve(max_encoded_len(data.len()));

    let mut code_index = 0;
    output.push(0);
    let mut code: u8 = 1;

    for (i, &byte) in data.iter().enumerate() {
        if byte == marker {
            output[code_index] = code.wrapping_add(marker);
            code_index = output.len();
            output.push(0);
            code = 1;
        } else {
            output.push(byte);
            code += 1;
            // A full run at the very end needs no empty trailing group
            if code as usize == FULL_GROUP && i + 1 < data.len() {
                output[code_index] = code.wrapping_add(marker);
                code_index = output.len();
                output.push(0);
                code = 1;
            }
        }
    }

    output[code_index] = code.wrapping_add(marker);
    output.push(marker);
    output.len()
}

/// Encode data using COBS into a new buffer (trailing marker included)
pub fn encode(data: &[u8], marker: u8) -> Vec<u8> {
    let mut output = Vec::new();
    encode_into(data, marker, &mut output);
    output
}

/// Decode COBS-encoded data into BytesMut
///
/// A single trailing marker is accepted and ignored.
/// Extends the BytesMut buffer (does not clear - caller should clear if needed).
/// On error the buffer is left as it was before the call.
/// Returns number of bytes written.
pub fn decode_into(encoded: &[u8], marker: u8, output: &mut BytesMut) -> Result<usize, FrameError> {
    let encoded = match encoded.split_last() {
        Some((&last, rest)) if last == marker => rest,
        _ => encoded,
    };

    if encoded.is_empty() {
        return Ok(0);
    }

    let start_len = output.len();
    let mut i = 0;

    while i < encoded.len() {
        let code = encoded[i].wrapping_sub(marker) as usize;

        // A group is its code byte plus code - 1 literals and must fit in the frame
        if code == 0 || i + code > encoded.len() {
            output.truncate(start_len);
            return Err(FrameError::Malformed { offset: i });
        }

        let literals = &encoded[i + 1..i + code];
        if let Some(pos) = literals.iter().position(|&b| b == marker) {
            output.truncate(start_len);
            return Err(FrameError::Malformed { offset: i + 1 + pos });
        }

        output.extend_from_slice(literals);
        i += code;

        if code < FULL_GROUP && i < encoded.len() {
            output.extend_from_slice(&[marker]);
        }
    }

    Ok(output.len() - start_len)
}

/// Decode COBS-encoded data into a new buffer
pub fn decode(encoded: &[u8], marker: u8) -> Result<Vec<u8>, FrameError> {
    let mut output = BytesMut::with_capacity(encoded.len());
    decode_into(encoded, marker, &mut output)?;
    Ok(output.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_MARKER;

    const M: u8 = DEFAULT_MARKER;

    #[test]
    fn canonical_zero_marker_vector() {
        let data = [0x00, 0x00, 0x11, 0x22, 0x00, 0x33];
        let encoded = encode(&data, 0x00);
        assert_eq!(encoded, vec![0x01, 0x01, 0x03, 0x11, 0x22, 0x02, 0x33, 0x00]);
        assert_eq!(decode(&encoded, 0x00).unwrap(), data);
    }

    #[test]
    fn roundtrip() {
        let cases = vec![
            vec![],
            vec![0x01],
            vec![M],
            vec![0x01, 0x02, 0x03],
            vec![M, M, M],
            vec![0x01, M, 0x02, M, 0x03],
            vec![0x00, M, 0xFF, M.wrapping_add(1)],
        ];

        let mut encoded = Vec::new();
        let mut decoded = BytesMut::new();

        for original in cases {
            encode_into(&original, M, &mut encoded);
            decoded.clear();
            decode_into(&encoded, M, &mut decoded).unwrap();
            assert_eq!(original, decoded.as_ref());
        }
    }

    #[test]
    fn decode_accepts_missing_terminator() {
        let encoded = encode(&[0x10, M, 0x20], M);
        let body = &encoded[..encoded.len() - 1];
        assert_eq!(decode(body, M).unwrap(), vec![0x10, M, 0x20]);
    }

    #[test]
    fn no_marker_in_encoded() {
        let data = vec![M, 0x01, M, 0x02, M];
        let encoded = encode(&data, M);
        // Check all bytes except trailing delimiter
        for &byte in &encoded[..encoded.len() - 1] {
            assert_ne!(byte, M);
        }
        assert_eq!(encoded.last(), Some(&M));
    }

    #[test]
    fn empty_input() {
        let encoded = encode(&[], M);
        assert_eq!(encoded, vec![1u8.wrapping_add(M), M]);
        assert_eq!(max_encoded_len(0), 2);
        assert!(decode(&[], M).unwrap().is_empty());
    }

    #[test]
    fn full_run_has_no_trailing_group() {
        let data = vec![0x01; COBS_MAX_RUN];
        let encoded = encode(&data, M);
        assert_eq!(encoded.len(), max_encoded_len(data.len()));
        assert_eq!(encoded.len(), COBS_MAX_RUN + 2);
        assert_eq!(decode(&encoded, M).unwrap(), data);
    }

    #[test]
    fn full_run_with_empty_trailing_group() {
        // Encoders that always close the last group emit an extra empty one
        let data = vec![0x01; COBS_MAX_RUN];
        let mut encoded = vec![255u8.wrapping_add(M)];
        encoded.extend_from_slice(&data);
        encoded.push(1u8.wrapping_add(M));
        encoded.push(M);

        assert_eq!(decode(&encoded, M).unwrap(), data);
    }

    #[test]
    fn full_run_followed_by_marker() {
        let mut data = vec![0x01; COBS_MAX_RUN];
        data.push(M);
        let encoded = encode(&data, M);
        assert!(encoded.len() <= max_encoded_len(data.len()));
        assert_eq!(decode(&encoded, M).unwrap(), data);
    }

    #[test]
    fn code_past_end_is_malformed() {
        // Code claims 4 bytes (code + 3 literals) but only 2 literals follow
        let encoded = [4u8.wrapping_add(M), 0x01, 0x02];
        assert_eq!(
            decode(&encoded, M),
            Err(FrameError::Malformed { offset: 0 })
        );
    }

    #[test]
    fn code_exactly_at_end_is_valid() {
        let encoded = [3u8.wrapping_add(M), 0x01, 0x02];
        assert_eq!(decode(&encoded, M).unwrap(), vec![0x01, 0x02]);
    }

    #[test]
    fn single_byte_code_always_valid() {
        let encoded = [1u8.wrapping_add(M), 1u8.wrapping_add(M)];
        assert_eq!(decode(&encoded, M).unwrap(), vec![M]);
    }

    #[test]
    fn marker_inside_frame_is_malformed() {
        let encoded = [3u8.wrapping_add(M), 0x01, M, 0x05];
        assert_eq!(
            decode(&encoded, M),
            Err(FrameError::Malformed { offset: 2 })
        );
    }

    #[test]
    fn failed_decode_leaves_output_untouched() {
        let mut decoded = BytesMut::from(&b"keep"[..]);
        let encoded = [2u8.wrapping_add(M), 0x01, 9u8.wrapping_add(M)];
        assert!(decode_into(&encoded, M, &mut decoded).is_err());
        assert_eq!(decoded.as_ref(), b"keep");
    }

    #[test]
    fn buffer_reuse() {
        let mut encoded = Vec::new();
        let mut decoded = BytesMut::new();

        encode_into(&[1, 2, 3], M, &mut encoded);
        decoded.clear();
        decode_into(&encoded, M, &mut decoded).unwrap();
        assert_eq!(decoded.as_ref(), &[1, 2, 3]);

        // Reuse buffers - should clear and work correctly
        encode_into(&[4, 5], M, &mut encoded);
        decoded.clear();
        decode_into(&encoded, M, &mut decoded).unwrap();
        assert_eq!(decoded.as_ref(), &[4, 5]);
    }
}
