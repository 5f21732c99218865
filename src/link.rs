//! Line protocol shared by host and device.
//!
//! One ASCII command per `\n`-terminated line: either `a0,a1,...,a7` (degrees, joint order of
//! `joint::JOINTS`) or a gait keyword such as `circle_wave`. There is no acknowledgment,
//! checksum or retry; a line that does not parse is dropped and the next one is read.

use core::fmt::Write as _;

use embedded_io::{Error as _, Read, Write};
use log::{info, warn};

use crate::{GaitKind, PositionVector};

/// Longest line accepted, newline excluded.
pub const LINE_CAPACITY: usize = 128;
/// Most integers a numeric line may carry before it is rejected at parse time.
pub const MAX_VALUES: usize = 32;

/// Parsed but not yet range-checked angles.
pub type Candidate = heapless::Vec<i32, MAX_VALUES>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Position(Candidate),
    Gait(GaitKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("Invalid position value at token {0}")]
    Malformed(usize),
    #[error("Too many values in command ({0})")]
    TooManyValues(usize),
    #[error("Line longer than 128 bytes")]
    LineTooLong,
    #[error("Line is not ASCII")]
    NotAscii,
    #[error("Transport closed")]
    Closed,
    #[error("Transport I/O error: {0:?}")]
    Io(embedded_io::ErrorKind),
    #[error("Serial port is not connected")]
    TransportUnavailable,
}

impl LinkError {
    /// Whether the error only concerns the offending line.
    pub fn is_malformed_line(&self) -> bool {
        matches!(
            self,
            LinkError::Malformed(_)
                | LinkError::TooManyValues(_)
                | LinkError::LineTooLong
                | LinkError::NotAscii
        )
    }
}

/// Parses one base-10 integer. Values past `i32` saturate so the controller still sees them
/// as out of range instead of the line being dropped.
fn parse_value(token: &str) -> Option<i32> {
    if let Ok(value) = token.parse() {
        return Some(value);
    }
    let digits = token.strip_prefix(['-', '+']).unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if token.starts_with('-') { i32::MIN } else { i32::MAX })
}

/// Parses one line, newline already removed. Blank lines yield `Ok(None)`.
///
/// Whitespace is trimmed first, then any `[`, `]` and `'` around the payload. Every token
/// must parse or the whole line is rejected; no partial vector is produced.
pub fn parse_line(line: &str) -> Result<Option<Command>, LinkError> {
    let text = line.trim().trim_matches(['[', ']', '\'']);
    if text.is_empty() {
        return Ok(None);
    }
    if let Some(gait) = GaitKind::from_keyword(text) {
        return Ok(Some(Command::Gait(gait)));
    }

    let mut values = Candidate::new();
    let mut count = 0;
    for (index, token) in text.split(',').enumerate() {
        let value = parse_value(token.trim()).ok_or(LinkError::Malformed(index))?;
        // keep scanning past capacity so a bad token still reports as malformed
        let _ = values.push(value);
        count += 1;
    }
    if count > MAX_VALUES {
        return Err(LinkError::TooManyValues(count));
    }
    Ok(Some(Command::Position(values)))
}

/// `a0,...,a7\n`
pub fn encode_pose(pose: &PositionVector) -> heapless::String<LINE_CAPACITY> {
    let mut line = heapless::String::new();
    // 8 * "180," fits well inside the capacity
    let _ = writeln!(line, "{pose}");
    line
}

pub fn encode_gait(gait: GaitKind) -> heapless::String<LINE_CAPACITY> {
    let mut line = heapless::String::new();
    let _ = writeln!(line, "{}", gait.keyword());
    line
}

/// Writes one encoded line and flushes it.
pub fn write_line<W: Write>(port: &mut W, line: &str) -> Result<(), LinkError> {
    port.write_all(line.as_bytes())
        .map_err(|e| LinkError::Io(e.kind()))?;
    port.flush().map_err(|e| LinkError::Io(e.kind()))
}

/// Device end of the link: reads bytes from the transport and yields one command per line.
pub struct CommandLink<R> {
    port: R,
    line: heapless::Vec<u8, LINE_CAPACITY>,
    overflowed: bool,
}

impl<R: Read> CommandLink<R> {
    pub fn new(port: R) -> Self {
        Self {
            port,
            line: heapless::Vec::new(),
            overflowed: false,
        }
    }

    /// Blocks until a full line arrives and parses it.
    ///
    /// `Ok(None)` is a blank line. Malformed lines come back as errors for which
    /// `is_malformed_line` holds; the link is ready for the next line either way.
    /// End of stream is `Err(LinkError::Closed)`.
    pub fn next_command(&mut self) -> Result<Option<Command>, LinkError> {
        let mut byte = [0u8; 1];
        loop {
            let read = self
                .port
                .read(&mut byte)
                .map_err(|e| LinkError::Io(e.kind()))?;
            if read == 0 {
                return Err(LinkError::Closed);
            }
            if byte[0] == b'\n' {
                return self.take_line();
            }
            if self.line.push(byte[0]).is_err() {
                self.overflowed = true;
            }
        }
    }

    fn take_line(&mut self) -> Result<Option<Command>, LinkError> {
        let overflowed = core::mem::replace(&mut self.overflowed, false);
        let result = if overflowed {
            Err(LinkError::LineTooLong)
        } else if !self.line.is_ascii() {
            Err(LinkError::NotAscii)
        } else {
            match core::str::from_utf8(&self.line) {
                Ok(text) => {
                    if !text.trim().is_empty() {
                        info!("Received command: {}", text.trim());
                    }
                    parse_line(text)
                }
                Err(_) => Err(LinkError::NotAscii),
            }
        };
        self.line.clear();
        if let Err(e) = &result {
            warn!("Dropped line: {}", e);
        }
        result
    }

    pub fn into_inner(self) -> R {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io_adapters::std::FromStd;
    use std::io::Cursor;

    fn link(input: &str) -> CommandLink<FromStd<Cursor<Vec<u8>>>> {
        CommandLink::new(FromStd::new(Cursor::new(input.as_bytes().to_vec())))
    }

    fn position(values: &[i32]) -> Option<Command> {
        Some(Command::Position(Candidate::from_slice(values).unwrap()))
    }

    #[test]
    fn parses_position_line() {
        assert_eq!(
            parse_line("0,55,0,139,0,142,0,55"),
            Ok(position(&[0, 55, 0, 139, 0, 142, 0, 55]))
        );
        assert_eq!(
            parse_line("  [ 10, 20 ,30]\r"),
            Ok(position(&[10, 20, 30]))
        );
        assert_eq!(parse_line("'-5,181'"), Ok(position(&[-5, 181])));
    }

    #[test]
    fn oversized_integers_stay_out_of_range() {
        assert_eq!(
            parse_line("7,7,7,99999999999,7,7,7,-99999999999"),
            Ok(position(&[7, 7, 7, i32::MAX, 7, 7, 7, i32::MIN]))
        );
        assert_eq!(parse_line("1,9999999999x"), Err(LinkError::Malformed(1)));
        assert_eq!(parse_line("1,-"), Err(LinkError::Malformed(1)));
    }

    #[test]
    fn parses_gait_keywords() {
        assert_eq!(
            parse_line("circle_wave"),
            Ok(Some(Command::Gait(GaitKind::Wave)))
        );
        assert_eq!(
            parse_line("['circle_wave']"),
            Ok(Some(Command::Gait(GaitKind::Wave)))
        );
        assert_eq!(parse_line("stand\r"), Ok(Some(Command::Gait(GaitKind::Stand))));
        assert_eq!(parse_line("CIRCLE_WAVE"), Err(LinkError::Malformed(0)));
        // brackets are stripped after whitespace, so padding inside them is kept
        assert_eq!(parse_line("[ circle_wave ]"), Err(LinkError::Malformed(0)));
    }

    #[test]
    fn any_bad_token_rejects_the_line() {
        assert_eq!(parse_line("1,2,abc"), Err(LinkError::Malformed(2)));
        assert_eq!(parse_line("1,,2"), Err(LinkError::Malformed(1)));
        assert_eq!(parse_line("1,2,"), Err(LinkError::Malformed(2)));
        assert_eq!(parse_line("1.5,2"), Err(LinkError::Malformed(0)));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line(" [] \r"), Ok(None));
    }

    #[test]
    fn too_many_values() {
        let line = ["1"; 40].join(",");
        assert_eq!(parse_line(&line), Err(LinkError::TooManyValues(40)));
    }

    #[test]
    fn encodes_pose_and_gait() {
        let pose = PositionVector::new([0, 113, 0, 139, 170, 102, 0, 55]);
        assert_eq!(encode_pose(&pose).as_str(), "0,113,0,139,170,102,0,55\n");
        assert_eq!(encode_gait(GaitKind::Wave).as_str(), "circle_wave\n");

        let encoded = encode_pose(&pose);
        let Ok(Some(Command::Position(values))) = parse_line(encoded.trim_end()) else {
            panic!("encoded pose did not parse");
        };
        assert_eq!(PositionVector::try_from(values.as_slice()), Ok(pose));
    }

    #[test]
    fn reads_one_command_per_call() {
        let mut link = link("1,2,3,4,5,6,7,8\n\nwave\n1,x\n9,9\n");
        assert_eq!(
            link.next_command(),
            Ok(position(&[1, 2, 3, 4, 5, 6, 7, 8]))
        );
        assert_eq!(link.next_command(), Ok(None));
        assert_eq!(link.next_command(), Ok(Some(Command::Gait(GaitKind::Wave))));
        assert_eq!(link.next_command(), Err(LinkError::Malformed(1)));
        assert_eq!(link.next_command(), Ok(position(&[9, 9])));
        assert_eq!(link.next_command(), Err(LinkError::Closed));
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let mut link = link("1,2");
        assert_eq!(link.next_command(), Err(LinkError::Closed));
    }

    #[test]
    fn long_line_is_dropped_and_link_recovers() {
        let long = "1,".repeat(100);
        let mut link = link(&format!("{long}\nstand\n"));
        let error = link.next_command().unwrap_err();
        assert_eq!(error, LinkError::LineTooLong);
        assert!(error.is_malformed_line());
        assert_eq!(link.next_command(), Ok(Some(Command::Gait(GaitKind::Stand))));
    }

    #[test]
    fn non_ascii_is_dropped() {
        let mut link = link("9\u{b0},10\nstand\n");
        assert_eq!(link.next_command(), Err(LinkError::NotAscii));
        assert_eq!(link.next_command(), Ok(Some(Command::Gait(GaitKind::Stand))));
    }

    #[test]
    fn write_line_sends_bytes() {
        let mut port = FromStd::new(Vec::new());
        write_line(&mut port, "circle_wave\n").unwrap();
        assert_eq!(port.inner().as_slice(), b"circle_wave\n");
    }
}
