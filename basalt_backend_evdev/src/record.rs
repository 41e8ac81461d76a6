// Copyright 2026 the Basalt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wire format of kernel `input_event` records.
//!
//! Each record is a `struct input_event`: a 16-byte `timeval`, then event
//! type, code, and value. Records are parsed from bytes rather than
//! transmuted, in native byte order (the kernel writes them on the same
//! machine that reads them).

use basalt_core::input::{RawEvent, RawEventKind};

/// Size in bytes of one `input_event` record on 64-bit Linux.
pub const EVENT_RECORD_SIZE: usize = 24;

const EV_SYN: u16 = 0x00;
const EV_KEY: u16 = 0x01;
const EV_REL: u16 = 0x02;
const EV_ABS: u16 = 0x03;

/// Parses complete records from `buf` into `out`, returning the number of
/// bytes consumed.
///
/// A trailing partial record is left unconsumed; the caller keeps it for
/// the next read. Event types the engine does not model (`EV_MSC`,
/// `EV_LED`, ...) are consumed and skipped.
pub fn parse_records(buf: &[u8], out: &mut Vec<RawEvent>) -> usize {
    let mut consumed = 0;
    while buf.len() - consumed >= EVENT_RECORD_SIZE {
        let record = &buf[consumed..consumed + EVENT_RECORD_SIZE];
        consumed += EVENT_RECORD_SIZE;

        // Skip the 16-byte timestamp; frame timing comes from the loop.
        let ty = u16::from_ne_bytes([record[16], record[17]]);
        let code = u16::from_ne_bytes([record[18], record[19]]);
        let value = i32::from_ne_bytes([record[20], record[21], record[22], record[23]]);

        let kind = match ty {
            EV_SYN => RawEventKind::Sync,
            EV_KEY => RawEventKind::Key,
            EV_REL => RawEventKind::Relative,
            EV_ABS => RawEventKind::Absolute,
            _ => continue,
        };
        out.push(RawEvent { kind, code, value });
    }
    consumed
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_core::input::codes;

    fn record(ty: u16, code: u16, value: i32) -> [u8; EVENT_RECORD_SIZE] {
        let mut bytes = [0_u8; EVENT_RECORD_SIZE];
        bytes[16..18].copy_from_slice(&ty.to_ne_bytes());
        bytes[18..20].copy_from_slice(&code.to_ne_bytes());
        bytes[20..24].copy_from_slice(&value.to_ne_bytes());
        bytes
    }

    #[test]
    fn parses_a_relative_move_with_sync() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&record(EV_REL, codes::AXIS_X, 5));
        buf.extend_from_slice(&record(EV_REL, codes::AXIS_Y, -3));
        buf.extend_from_slice(&record(EV_SYN, 0, 0));

        let mut out = Vec::new();
        let consumed = parse_records(&buf, &mut out);
        assert_eq!(consumed, buf.len());
        assert_eq!(
            out,
            vec![
                RawEvent {
                    kind: RawEventKind::Relative,
                    code: codes::AXIS_X,
                    value: 5,
                },
                RawEvent {
                    kind: RawEventKind::Relative,
                    code: codes::AXIS_Y,
                    value: -3,
                },
                RawEvent {
                    kind: RawEventKind::Sync,
                    code: 0,
                    value: 0,
                },
            ]
        );
    }

    #[test]
    fn partial_record_is_left_for_the_next_read() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&record(EV_KEY, codes::BTN_LEFT, 1));
        buf.extend_from_slice(&record(EV_KEY, codes::BTN_LEFT, 0)[..10]);

        let mut out = Vec::new();
        let consumed = parse_records(&buf, &mut out);
        assert_eq!(consumed, EVENT_RECORD_SIZE, "only the complete record");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn unmodeled_event_types_are_consumed_and_skipped() {
        const EV_MSC: u16 = 0x04;
        let mut buf = Vec::new();
        buf.extend_from_slice(&record(EV_MSC, 4, 42));
        buf.extend_from_slice(&record(EV_KEY, 30, 2));

        let mut out = Vec::new();
        let consumed = parse_records(&buf, &mut out);
        assert_eq!(consumed, buf.len());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, 2, "key repeat value passes through");
    }
}
