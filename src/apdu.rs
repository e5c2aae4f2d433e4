//! Command/response APDU codec and ISO 7816-4 status words.

/// A parsed command APDU.
///
/// Both short and extended length fields are accepted. Chaining, logical
/// channel and secure-messaging bits of the class byte are preserved but not
/// interpreted at this layer; the card decides which class bytes it speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandApdu {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
    /// Expected response length (`Ne`), if the Le field was present.
    pub le: Option<usize>,
}

impl CommandApdu {
    /// Parses a raw command APDU.
    ///
    /// Malformed input is a card-edge condition, not a host error, so the
    /// failure type is the [Status] word the card answers with.
    pub fn parse(raw: &[u8]) -> Result<CommandApdu, Status> {
        if raw.len() < 4 {
            return Err(Status::WrongLength);
        }
        let (cla, ins, p1, p2) = (raw[0], raw[1], raw[2], raw[3]);
        let body = &raw[4..];

        let (data, le) = match body {
            // Case 1: header only.
            [] => (Vec::new(), None),
            // Case 2S: short Le only.
            [le] => (Vec::new(), Some(decode_short_le(*le))),
            // Extended cases start with a zero marker byte.
            [0x00, rest @ ..] if rest.len() >= 2 => parse_extended(rest)?,
            // Case 3S / 4S: short Lc.
            [lc, rest @ ..] => {
                let lc = *lc as usize;
                match rest.len().checked_sub(lc) {
                    Some(0) => (rest.to_vec(), None),
                    Some(1) => (rest[..lc].to_vec(), Some(decode_short_le(rest[lc]))),
                    _ => return Err(Status::WrongLength),
                }
            }
        };

        Ok(CommandApdu {
            cla,
            ins,
            p1,
            p2,
            data,
            le,
        })
    }
}

fn decode_short_le(le: u8) -> usize {
    if le == 0 {
        256
    } else {
        le as usize
    }
}

/// Parses the body after the extended-length marker byte.
fn parse_extended(body: &[u8]) -> Result<(Vec<u8>, Option<usize>), Status> {
    match body.len() {
        // Case 2E: two-byte Le.
        2 => {
            let le = u16::from_be_bytes([body[0], body[1]]) as usize;
            Ok((Vec::new(), Some(if le == 0 { 65536 } else { le })))
        }
        _ => {
            let lc = u16::from_be_bytes([body[0], body[1]]) as usize;
            let rest = &body[2..];
            match rest.len().checked_sub(lc) {
                // Case 3E.
                Some(0) => Ok((rest.to_vec(), None)),
                // Case 4E: two-byte Le after the data field.
                Some(2) => {
                    let le = u16::from_be_bytes([rest[lc], rest[lc + 1]]) as usize;
                    Ok((rest[..lc].to_vec(), Some(if le == 0 { 65536 } else { le })))
                }
                _ => Err(Status::WrongLength),
            }
        }
    }
}

/// A response APDU: optional data followed by a two-byte status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseApdu {
    pub data: Vec<u8>,
    pub status: Status,
}

impl ResponseApdu {
    pub fn new(status: Status, data: Vec<u8>) -> Self {
        ResponseApdu { data, status }
    }
}

impl From<Status> for ResponseApdu {
    fn from(status: Status) -> Self {
        ResponseApdu {
            data: Vec::new(),
            status,
        }
    }
}

impl From<ResponseApdu> for Vec<u8> {
    fn from(value: ResponseApdu) -> Self {
        let status: [u8; 2] = value.status.into();
        let mut encoded = Vec::with_capacity(value.data.len() + 2);
        encoded.extend(value.data);
        encoded.extend(status);
        encoded
    }
}

/// Status words returned at the card edge.
///
/// The numeric encodings follow ISO/IEC 7816-4 and the usage conventions of
/// BSI TR-03110; drivers compare them byte-for-byte, so the mapping below is
/// part of the external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Successful execution.
    Ok,
    /// Warning: the referenced data (password) is deactivated.
    ReferenceDeactivated,
    /// Verification failed, no counter information.
    VerificationFailed,
    /// Warning counting the remaining password retries (0..=15).
    RetriesRemaining(u8),
    /// Wrong length field or command body.
    WrongLength,
    /// Security status not satisfied: a required condition does not hold.
    SecurityStatusNotSatisfied,
    /// Authentication method blocked (retry counter exhausted).
    AuthMethodBlocked,
    /// Conditions of use not satisfied (e.g. command outside protocol flow).
    ConditionsNotSatisfied,
    /// Command not allowed: no current elementary file.
    NoCurrentEf,
    /// Incorrect parameters in the command data field.
    IncorrectData,
    /// Referenced file not found.
    FileNotFound,
    /// Incorrect parameters P1-P2.
    IncorrectP1P2,
    /// Referenced data (key, password, domain parameters) not found.
    ReferenceNotFound,
    /// Offset outside the elementary file.
    OffsetOutsideEf,
    /// Instruction code not supported.
    InstructionNotSupported,
    /// Class byte not supported.
    ClassNotSupported,
}

impl From<Status> for [u8; 2] {
    fn from(value: Status) -> Self {
        match value {
            Status::Ok => [0x90, 0x00],
            Status::ReferenceDeactivated => [0x62, 0x83],
            Status::VerificationFailed => [0x63, 0x00],
            Status::RetriesRemaining(n) => [0x63, 0xC0 | (n & 0x0F)],
            Status::WrongLength => [0x67, 0x00],
            Status::SecurityStatusNotSatisfied => [0x69, 0x82],
            Status::AuthMethodBlocked => [0x69, 0x83],
            Status::ConditionsNotSatisfied => [0x69, 0x85],
            Status::NoCurrentEf => [0x69, 0x86],
            Status::IncorrectData => [0x6A, 0x80],
            Status::FileNotFound => [0x6A, 0x82],
            Status::IncorrectP1P2 => [0x6A, 0x86],
            Status::ReferenceNotFound => [0x6A, 0x88],
            Status::OffsetOutsideEf => [0x6B, 0x00],
            Status::InstructionNotSupported => [0x6D, 0x00],
            Status::ClassNotSupported => [0x6E, 0x00],
        }
    }
}

/// Instruction bytes understood by the simulator.
pub mod ins {
    pub const DEACTIVATE_FILE: u8 = 0x04;
    pub const VERIFY: u8 = 0x20;
    pub const MSE_SET: u8 = 0x22;
    pub const CHANGE_REFERENCE_DATA: u8 = 0x24;
    pub const PSO: u8 = 0x2A;
    pub const RESET_RETRY_COUNTER: u8 = 0x2C;
    pub const ACTIVATE_FILE: u8 = 0x44;
    pub const EXTERNAL_AUTHENTICATE: u8 = 0x82;
    pub const GET_CHALLENGE: u8 = 0x84;
    pub const GENERAL_AUTHENTICATE: u8 = 0x86;
    pub const SELECT: u8 = 0xA4;
    pub const READ_BINARY: u8 = 0xB0;
    pub const UPDATE_BINARY: u8 = 0xD6;
    pub const DELETE_FILE: u8 = 0xE4;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_case_1() {
        let cmd = CommandApdu::parse(&[0x00, 0xA4, 0x04, 0x00]).unwrap();
        assert_eq!(cmd.ins, 0xA4);
        assert!(cmd.data.is_empty());
        assert_eq!(cmd.le, None);
    }

    #[test]
    fn parse_case_2_short() {
        let cmd = CommandApdu::parse(&[0x00, 0xB0, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(cmd.le, Some(256));
        let cmd = CommandApdu::parse(&[0x00, 0xB0, 0x00, 0x00, 0x10]).unwrap();
        assert_eq!(cmd.le, Some(16));
    }

    #[test]
    fn parse_case_3_short() {
        let cmd = CommandApdu::parse(&[0x00, 0xD6, 0x00, 0x00, 0x03, 0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(cmd.data, vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(cmd.le, None);
    }

    #[test]
    fn parse_case_4_short() {
        let cmd = CommandApdu::parse(&[0x10, 0x86, 0x00, 0x00, 0x02, 0x7C, 0x00, 0x00]).unwrap();
        assert_eq!(cmd.data, vec![0x7C, 0x00]);
        assert_eq!(cmd.le, Some(256));
        assert_eq!(cmd.cla, 0x10);
    }

    #[test]
    fn parse_extended_lc() {
        let mut raw = vec![0x00, 0xD6, 0x00, 0x00, 0x00, 0x01, 0x04];
        raw.extend_from_slice(&[0xEE; 0x104]);
        let cmd = CommandApdu::parse(&raw).unwrap();
        assert_eq!(cmd.data.len(), 0x104);
        assert_eq!(cmd.le, None);

        raw.extend_from_slice(&[0x02, 0x00]);
        let cmd = CommandApdu::parse(&raw).unwrap();
        assert_eq!(cmd.le, Some(0x200));
    }

    #[test]
    fn parse_truncated_body() {
        assert_eq!(
            CommandApdu::parse(&[0x00, 0xD6, 0x00, 0x00, 0x05, 0xAA]),
            Err(Status::WrongLength)
        );
        assert_eq!(CommandApdu::parse(&[0x00, 0xA4]), Err(Status::WrongLength));
    }

    #[test]
    fn status_word_encoding() {
        let pairs: &[(Status, [u8; 2])] = &[
            (Status::Ok, [0x90, 0x00]),
            (Status::RetriesRemaining(2), [0x63, 0xC2]),
            (Status::SecurityStatusNotSatisfied, [0x69, 0x82]),
            (Status::AuthMethodBlocked, [0x69, 0x83]),
            (Status::ReferenceNotFound, [0x6A, 0x88]),
            (Status::FileNotFound, [0x6A, 0x82]),
            (Status::IncorrectData, [0x6A, 0x80]),
            (Status::InstructionNotSupported, [0x6D, 0x00]),
        ];
        for (status, expected) in pairs {
            let encoded: [u8; 2] = (*status).into();
            assert_eq!(&encoded, expected);
        }
    }

    #[test]
    fn response_encoding_appends_status() {
        let response = ResponseApdu::new(Status::Ok, vec![0x01, 0x02]);
        let raw: Vec<u8> = response.into();
        assert_eq!(raw, vec![0x01, 0x02, 0x90, 0x00]);
    }
}
