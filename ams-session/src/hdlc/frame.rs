//! HDLC type-3 frame layout, decoded in place
//!
//! ```text
//! +------+--------+------+-----+------+-----+---------+-----+------+
//! | Flag | Format | Dest | Src | Ctrl | HCS | Payload | FCS | Flag |
//! | 0x7E | (2)    | 1-4  | 1-4 | (1)  | (2) | (n)     | (2) | 0x7E |
//! +------+--------+------+-----+------+-----+---------+-----+------+
//! ```
//!
//! The 11 low bits of the format field count every byte between the two
//! flags. HCS covers format, addresses and control; FCS covers everything
//! between the opening flag and the FCS itself. Both are CRC16/X25, stored
//! little-endian.

use crate::hdlc::address::scan_address;
use ams_core::{AmsError, AmsResult, DecodeError, FcsCalc, RawFrame, crc16_x25};
use std::ops::Range;

/// HDLC frame flag
pub const FLAG: u8 = 0x7E;

/// Logical Link Control (LLC) Request
pub const LLC_REQUEST: [u8; 3] = [0xE6, 0xE6, 0x00];

/// Logical Link Control (LLC) Response
pub const LLC_RESPONSE: [u8; 3] = [0xE6, 0xE7, 0x00];

/// Link-control prefix skipped at the start of every segment payload
pub const LLC_PREFIX_LENGTH: usize = 3;

/// Upper nibble of the format field for frame format type 3
pub const FORMAT_TYPE_3: u8 = 0xA0;
const FORMAT_TYPE_MASK: u8 = 0xF0;

/// "More fragments follow" bit in the first format byte
pub const SEGMENTATION_BIT: u8 = 0x08;

const LENGTH_MASK: u16 = 0x07FF;

/// Flag plus the 2-byte format field
pub const HEADER_PREFIX_LENGTH: usize = 3;

/// FCS plus closing flag
pub const FOOTER_LENGTH: usize = 3;

const HCS_LENGTH: usize = 2;
const FCS_LENGTH: usize = 2;

/// Smallest frame: flags, format, 1-byte addresses, control, HCS, FCS
pub const MIN_FRAME_LENGTH: usize = HEADER_PREFIX_LENGTH + 1 + 1 + 1 + HCS_LENGTH + FOOTER_LENGTH;

/// Largest frame the 11-bit length field can describe
pub const MAX_FRAME_LENGTH: usize = LENGTH_MASK as usize + 2;

/// Header fields of a validated frame
///
/// Address fields are kept as byte ranges into the input buffer, so the
/// header stays valid only as long as that buffer is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    format: u16,
    destination: Range<usize>,
    source: Range<usize>,
    control: u8,
    hcs: u16,
}

impl FrameHeader {
    /// Raw 16-bit format field: type nibble, segmentation bit and length
    pub fn format(&self) -> u16 {
        self.format
    }

    /// Total frame length including both flags
    pub fn frame_length(&self) -> usize {
        (self.format & LENGTH_MASK) as usize + 2
    }

    /// Whether more fragments of this dialogue follow
    pub fn is_segmented(&self) -> bool {
        (self.format >> 8) as u8 & SEGMENTATION_BIT == SEGMENTATION_BIT
    }

    /// Byte range of the destination address
    pub fn destination(&self) -> Range<usize> {
        self.destination.clone()
    }

    /// Byte range of the source address
    pub fn source(&self) -> Range<usize> {
        self.source.clone()
    }

    /// Control field (frame type and sequence numbers)
    pub fn control(&self) -> u8 {
        self.control
    }

    /// Header check sequence as carried in the frame
    pub fn hcs(&self) -> u16 {
        self.hcs
    }

    /// Offset of the first payload byte
    pub fn length(&self) -> usize {
        self.source.end + 1 + HCS_LENGTH
    }
}

/// Trailer fields of a validated frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFooter {
    fcs: u16,
    flag: u8,
}

impl FrameFooter {
    /// Frame check sequence as carried in the frame
    pub fn fcs(&self) -> u16 {
        self.fcs
    }

    /// Closing flag byte, always [`FLAG`]
    pub fn flag(&self) -> u8 {
        self.flag
    }
}

/// A frame that passed boundary and checksum validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFrame {
    pub header: FrameHeader,
    pub footer: FrameFooter,
}

impl ValidatedFrame {
    /// Byte range of the payload within the input buffer
    pub fn payload(&self) -> Range<usize> {
        self.header.length()..self.header.frame_length() - FOOTER_LENGTH
    }

    /// Input bytes the frame occupies, both flags included
    pub fn frame_length(&self) -> usize {
        self.header.frame_length()
    }
}

/// Result of deframing a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deframed {
    /// More bytes are needed before the frame can be judged
    Incomplete,
    /// The buffer does not hold a type-3 frame
    UnknownData,
    Frame(ValidatedFrame),
}

/// Validate the frame at the start of `frame`.
///
/// Checks run in wire order: opening flag, format type, declared length
/// against available bytes, closing flag, address fields, header checksum,
/// frame checksum. Bytes past the declared length are ignored.
///
/// # Returns
/// - [`Deframed::Incomplete`] when the declared length is not yet available
/// - [`Deframed::UnknownData`] when the format type is not 3
/// - [`Deframed::Frame`] with the header, footer and payload range
///
/// # Errors
/// - [`DecodeError::BoundaryFlagMissing`] for a missing opening or closing flag
/// - [`DecodeError::MalformedFrame`] for a length below the minimum or an
///   unterminated address field
/// - [`DecodeError::HeaderChecksum`] / [`DecodeError::FooterChecksum`]
pub fn deframe(frame: RawFrame<'_>) -> Result<Deframed, DecodeError> {
    if frame.len() < HEADER_PREFIX_LENGTH {
        return Ok(Deframed::Incomplete);
    }
    if frame.byte(0)? != FLAG {
        return Err(DecodeError::BoundaryFlagMissing);
    }
    if frame.byte(1)? & FORMAT_TYPE_MASK != FORMAT_TYPE_3 {
        return Ok(Deframed::UnknownData);
    }

    let format = frame.u16_be(1)?;
    let frame_length = (format & LENGTH_MASK) as usize + 2;
    if frame_length > frame.len() {
        return Ok(Deframed::Incomplete);
    }
    let frame = frame.truncate(frame_length)?;

    let flag = frame.byte(frame_length - 1)?;
    if flag != FLAG {
        return Err(DecodeError::BoundaryFlagMissing);
    }
    if frame_length < MIN_FRAME_LENGTH {
        return Err(DecodeError::MalformedFrame(format!(
            "declared length {} is below the minimum of {}",
            frame_length, MIN_FRAME_LENGTH
        )));
    }

    let footer_start = frame_length - FOOTER_LENGTH;
    let destination = scan_address(frame, HEADER_PREFIX_LENGTH, footer_start)?;
    let source = scan_address(frame, destination.end, footer_start)?;

    let control_at = source.end;
    let header_end = control_at + 1 + HCS_LENGTH;
    if header_end > footer_start {
        return Err(DecodeError::MalformedFrame(format!(
            "header of {} bytes overlaps the footer at {}",
            header_end, footer_start
        )));
    }

    let hcs = frame.u16_le(control_at + 1)?;
    let computed = crc16_x25(frame.slice(1..control_at + 1)?);
    if computed != hcs {
        return Err(DecodeError::HeaderChecksum {
            expected: hcs,
            computed,
        });
    }

    // Running the CRC across the FCS itself leaves the fixed residue.
    let fcs = frame.u16_le(footer_start)?;
    let mut residue = FcsCalc::new();
    residue.update_bytes(frame.slice(1..footer_start + FCS_LENGTH)?);
    if !residue.is_good_residue() {
        return Err(DecodeError::FooterChecksum {
            expected: fcs,
            computed: crc16_x25(frame.slice(1..footer_start)?),
        });
    }

    Ok(Deframed::Frame(ValidatedFrame {
        header: FrameHeader {
            format,
            destination,
            source,
            control: frame.byte(control_at)?,
            hcs,
        },
        footer: FrameFooter { fcs, flag },
    }))
}

/// Build a type-3 frame around `information`.
///
/// # Arguments
/// * `destination` - Destination address as wire bytes (see
///   [`HdlcAddress::encode`](crate::hdlc::address::HdlcAddress::encode))
/// * `source` - Source address as wire bytes
/// * `control` - Control field
/// * `information` - Payload, link-control prefix included if any
/// * `segmented` - Set the "more fragments" bit
///
/// # Errors
/// [`AmsError::InvalidData`] for an address field that is empty, longer
/// than 4 bytes or not stop-bit terminated, or a frame beyond
/// [`MAX_FRAME_LENGTH`].
pub fn encode_frame(
    destination: &[u8],
    source: &[u8],
    control: u8,
    information: &[u8],
    segmented: bool,
) -> AmsResult<Vec<u8>> {
    for (name, address) in [("destination", destination), ("source", source)] {
        let terminated = address.last().is_some_and(|b| b & 0x01 == 0x01);
        let marker_inside = address
            .iter()
            .rev()
            .skip(1)
            .any(|b| b & 0x01 == 0x01);
        if !terminated || marker_inside || address.len() > 4 {
            return Err(AmsError::InvalidData(format!(
                "{} address {:02X?} is not a valid address field",
                name, address
            )));
        }
    }

    let frame_length = HEADER_PREFIX_LENGTH
        + destination.len()
        + source.len()
        + 1
        + HCS_LENGTH
        + information.len()
        + FOOTER_LENGTH;
    if frame_length > MAX_FRAME_LENGTH {
        return Err(AmsError::InvalidData(format!(
            "frame of {} bytes exceeds the maximum of {}",
            frame_length, MAX_FRAME_LENGTH
        )));
    }

    let mut format = (FORMAT_TYPE_3 as u16) << 8 | (frame_length - 2) as u16;
    if segmented {
        format |= (SEGMENTATION_BIT as u16) << 8;
    }

    let mut result = Vec::with_capacity(frame_length);
    result.push(FLAG);
    result.extend_from_slice(&format.to_be_bytes());
    result.extend_from_slice(destination);
    result.extend_from_slice(source);
    result.push(control);

    let mut hcs = FcsCalc::new();
    hcs.update_bytes(&result[1..]);
    result.extend_from_slice(&hcs.fcs_value_bytes());

    result.extend_from_slice(information);

    let mut fcs = FcsCalc::new();
    fcs.update_bytes(&result[1..]);
    result.extend_from_slice(&fcs.fcs_value_bytes());
    result.push(FLAG);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deframe_all(data: &[u8]) -> Result<Deframed, DecodeError> {
        deframe(RawFrame::new(data, data.len()))
    }

    #[test]
    fn test_encoded_frame_layout() {
        let payload = [0xE6, 0xE7, 0x00, 0x0F, 0x01];
        let frame = encode_frame(&[0x02, 0x23], &[0x13], 0x13, &payload, false).unwrap();
        assert_eq!(frame.len(), 17);
        assert_eq!(&frame[..7], &[0x7E, 0xA0, 0x0F, 0x02, 0x23, 0x13, 0x13]);
        assert_eq!(&frame[9..14], &payload);
        assert_eq!(frame[16], FLAG);
    }

    #[test]
    fn test_deframe_reports_fields() {
        let frame = encode_frame(&[0x02, 0x23], &[0x13], 0x13, &[1, 2, 3, 4], true).unwrap();
        let Deframed::Frame(validated) = deframe_all(&frame).unwrap() else {
            panic!("expected a frame");
        };
        assert!(validated.header.is_segmented());
        assert_eq!(validated.header.destination(), 3..5);
        assert_eq!(validated.header.source(), 5..6);
        assert_eq!(validated.header.control(), 0x13);
        assert_eq!(validated.header.frame_length(), frame.len());
        assert_eq!(validated.footer.flag(), FLAG);
        assert_eq!(&frame[validated.payload()], &[1, 2, 3, 4]);
        assert_eq!(
            validated.header.hcs(),
            u16::from_le_bytes([frame[7], frame[8]])
        );
        assert_eq!(
            validated.footer.fcs(),
            u16::from_le_bytes([frame[13], frame[14]])
        );
    }

    #[test]
    fn test_deframe_ignores_trailing_bytes() {
        let mut data = encode_frame(&[0x03], &[0x21], 0x13, &[9, 9], false).unwrap();
        let length = data.len();
        data.extend_from_slice(&[0x7E, 0xA0]);
        let Deframed::Frame(validated) = deframe_all(&data).unwrap() else {
            panic!("expected a frame");
        };
        assert_eq!(validated.frame_length(), length);
    }

    #[test]
    fn test_unknown_format_type() {
        let mut frame = encode_frame(&[0x03], &[0x21], 0x13, &[1], false).unwrap();
        frame[1] = 0x80 | (frame[1] & 0x0F);
        assert_eq!(deframe_all(&frame).unwrap(), Deframed::UnknownData);
    }

    #[test]
    fn test_declared_length_below_minimum() {
        let data = [0x7E, 0xA0, 0x03, 0x03, 0x7E];
        assert!(matches!(
            deframe_all(&data),
            Err(DecodeError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_unterminated_address_is_malformed() {
        // no address byte carries the stop bit before the footer
        let data = [
            0x7E, 0xA0, 0x0B, 0x02, 0x04, 0x06, 0x08, 0x0A, 0x0C, 0x00, 0x00, 0x00, 0x7E,
        ];
        assert!(matches!(
            deframe_all(&data),
            Err(DecodeError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_encode_rejects_bad_addresses() {
        assert!(encode_frame(&[0x02], &[0x21], 0x13, &[], false).is_err());
        assert!(encode_frame(&[0x03, 0x05], &[0x21], 0x13, &[], false).is_err());
        assert!(encode_frame(&[], &[0x21], 0x13, &[], false).is_err());
        assert!(encode_frame(&[0x03], &[0x21], 0x13, &vec![0u8; MAX_FRAME_LENGTH], false).is_err());
    }
}
