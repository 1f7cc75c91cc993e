//! Serial API frame codec: bytes on the wire ↔ [`RawFrame`].
//!
//! Grounded on the teacher's `zwave-serial::frame` module (the nom parsing
//! approach, the `SerialControlByte`/`SerialFrame` split) generalized to
//! also serialize frames (the teacher leaves serialization to
//! `cookie-factory` call sites; here the codec owns both directions since
//! spec.md §8's framing round-trip property requires it).

use derive_try_from_primitive::TryFromPrimitive;
use nom::{
    branch::alt,
    bytes::streaming::{tag, take, take_till1},
    combinator::{map, peek, value},
    number::streaming::be_u8,
    sequence::tuple,
    IResult,
};
use zwave_core::checksum::xor_sum;

pub const ACK_BUFFER: [u8; 1] = [SerialControlByte::ACK as u8];
pub const NAK_BUFFER: [u8; 1] = [SerialControlByte::NAK as u8];
pub const CAN_BUFFER: [u8; 1] = [SerialControlByte::CAN as u8];
pub const SOF: u8 = 0x01;

#[derive(Debug, Clone, Copy, TryFromPrimitive)]
#[repr(u8)]
pub enum SerialControlByte {
    SOF = 0x01,
    ACK = 0x06,
    NAK = 0x15,
    CAN = 0x18,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Request = 0x00,
    Response = 0x01,
}

impl FrameType {
    fn try_from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::Request),
            0x01 => Some(Self::Response),
            _ => None,
        }
    }
}

/// A decoded Serial API data frame: `type`, `function`, and payload, with
/// the checksum already verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub frame_type: FrameType,
    pub function: u8,
    pub payload: Vec<u8>,
}

impl DataFrame {
    pub fn new(frame_type: FrameType, function: u8, payload: Vec<u8>) -> Self {
        Self { frame_type, function, payload }
    }

    /// Serializes this frame to its wire form, including SOF/LEN/checksum.
    pub fn encode(&self) -> Vec<u8> {
        let len = 2 + self.payload.len() as u8;
        let mut body = Vec::with_capacity(2 + self.payload.len());
        body.push(len);
        body.push(self.frame_type as u8);
        body.push(self.function);
        body.extend_from_slice(&self.payload);
        let chk = xor_sum(&body);

        let mut out = Vec::with_capacity(2 + body.len() + 1);
        out.push(SOF);
        out.extend_from_slice(&body);
        out.push(chk);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    Ack,
    Nak,
    Can,
    Data(DataFrame),
    /// Bytes consumed before the decoder recognized a control byte or SOF.
    Garbage(Vec<u8>),
}

impl RawFrame {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            RawFrame::Ack => ACK_BUFFER.to_vec(),
            RawFrame::Nak => NAK_BUFFER.to_vec(),
            RawFrame::Can => CAN_BUFFER.to_vec(),
            RawFrame::Data(d) => d.encode(),
            RawFrame::Garbage(bytes) => bytes.clone(),
        }
    }
}

fn consume_garbage(i: &[u8]) -> IResult<&[u8], RawFrame> {
    map(take_till1(|b| SerialControlByte::try_from(b).is_ok()), |g: &[u8]| {
        RawFrame::Garbage(g.to_vec())
    })(i)
}

fn parse_control(i: &[u8]) -> IResult<&[u8], RawFrame> {
    alt((
        value(RawFrame::Ack, tag(&ACK_BUFFER)),
        value(RawFrame::Nak, tag(&NAK_BUFFER)),
        value(RawFrame::Can, tag(&CAN_BUFFER)),
    ))(i)
}

#[derive(Debug, PartialEq, Eq)]
pub struct ChecksumMismatch;

/// Parses a single data frame's bytes (SOF, LEN, TYPE, FUNC, payload, CHK),
/// returning the remaining input and either the decoded frame or a checksum
/// failure carrying the bytes that must still be dropped.
fn parse_data(i: &[u8]) -> IResult<&[u8], Result<DataFrame, ChecksumMismatch>> {
    peek(take(5usize))(i)?;
    let (_, (_, len)) = peek(tuple((tag([SOF]), be_u8)))(i)?;

    // LEN counts TYPE + FUNC + payload (not itself, not CHK). Total frame
    // size is 1 (SOF) + 1 (LEN) + len + 1 (CHK).
    let (i, whole) = take(3usize + len as usize)(i)?;

    let body = &whole[1..whole.len() - 1]; // LEN..last payload byte (excludes SOF and CHK)
    let computed = xor_sum(body);
    let chk = whole[whole.len() - 1];

    let frame_type = whole[2];
    let function = whole[3];
    let payload = whole[4..whole.len() - 1].to_vec();

    if computed == chk {
        Ok((
            i,
            Ok(DataFrame {
                frame_type: FrameType::try_from_u8(frame_type).unwrap_or(FrameType::Request),
                function,
                payload,
            }),
        ))
    } else {
        Ok((i, Err(ChecksumMismatch)))
    }
}

/// The outcome of parsing one step of the receive stream: either a decoded
/// frame, garbage, or a bad checksum (caller must send NAK).
#[derive(Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    Frame(RawFrame),
    BadChecksum,
}

pub fn parse_one(i: &[u8]) -> IResult<&[u8], ParseOutcome> {
    alt((
        map(consume_garbage, ParseOutcome::Frame),
        map(parse_control, ParseOutcome::Frame),
        map(parse_data, |r| match r {
            Ok(frame) => ParseOutcome::Frame(RawFrame::Data(frame)),
            Err(ChecksumMismatch) => ParseOutcome::BadChecksum,
        }),
    ))(i)
}
