use crate::editor::keys::{modifiers_from_xterm_param, KeyCode, KeyEvent, KeyModifiers};

const ESC: u8 = 0x1b;

/// Turns raw terminal bytes into [`KeyEvent`]s.
///
/// Sequences split across reads are kept until the next `advance`; the
/// caller flushes them after a short idle period. Bracketed-paste markers
/// are *not* interpreted here: `CSI 200~` and `CSI 201~` come out as the
/// literal keys `ESC [ 2 0 0 ~`, which the editor's paste state machine
/// recognises.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    buf: Vec<u8>,
}

enum Parsed {
    Keys(Vec<KeyEvent>, usize),
    Incomplete,
    Skip(usize),
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, data: &[u8]) -> Vec<KeyEvent> {
        self.buf.extend_from_slice(data);
        let mut keys = Vec::new();
        let mut pos = 0;
        while pos < self.buf.len() {
            match parse_one(&self.buf[pos..]) {
                Parsed::Keys(parsed, consumed) => {
                    keys.extend(parsed);
                    pos += consumed;
                }
                Parsed::Skip(consumed) => pos += consumed,
                Parsed::Incomplete => break,
            }
        }
        self.buf.drain(..pos);
        keys
    }

    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Emit whatever is still pending as literal keys. A lone ESC becomes
    /// an Escape keypress.
    pub fn flush(&mut self) -> Vec<KeyEvent> {
        let pending = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&pending).into_owned();
        text.chars()
            .filter_map(|ch| match ch {
                '\u{1b}' => Some(KeyEvent::plain(KeyCode::Escape)),
                '\u{fffd}' => None,
                ch if ch.is_control() => control_key(ch as u8),
                ch => Some(KeyEvent::char(ch)),
            })
            .collect()
    }
}

fn one(key: KeyEvent, consumed: usize) -> Parsed {
    Parsed::Keys(vec![key], consumed)
}

fn parse_one(buf: &[u8]) -> Parsed {
    match buf[0] {
        ESC => parse_escape(buf),
        b @ (0x00..=0x1f | 0x7f) => match control_key(b) {
            Some(key) => one(key, 1),
            None => Parsed::Skip(1),
        },
        0x20..=0x7e => one(KeyEvent::char(buf[0] as char), 1),
        _ => parse_utf8(buf),
    }
}

fn control_key(byte: u8) -> Option<KeyEvent> {
    let key = match byte {
        0x09 => KeyEvent::plain(KeyCode::Tab),
        0x0d => KeyEvent::plain(KeyCode::Enter),
        0x08 | 0x7f => KeyEvent::plain(KeyCode::Backspace),
        0x00 => KeyEvent::ctrl('@'),
        b @ 0x01..=0x1a => KeyEvent::ctrl((b + b'a' - 1) as char),
        _ => return None,
    };
    Some(key)
}

fn parse_escape(buf: &[u8]) -> Parsed {
    let Some(&next) = buf.get(1) else {
        return Parsed::Incomplete;
    };
    match next {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        // ESC ESC: two presses, the second parsed on its own.
        ESC => one(KeyEvent::plain(KeyCode::Escape), 1),
        0x0d => one(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT), 2),
        0x7f => one(KeyEvent::new(KeyCode::Backspace, KeyModifiers::ALT), 2),
        b @ 0x20..=0x7e => one(KeyEvent::alt(b as char), 2),
        b @ 0x01..=0x1a => one(
            KeyEvent::new(
                KeyCode::Char((b + b'a' - 1) as char),
                KeyModifiers::ALT | KeyModifiers::CONTROL,
            ),
            2,
        ),
        _ => one(KeyEvent::plain(KeyCode::Escape), 1),
    }
}

fn parse_csi(buf: &[u8]) -> Parsed {
    let mut end = 2;
    loop {
        let Some(&b) = buf.get(end) else {
            return Parsed::Incomplete;
        };
        if (0x40..=0x7e).contains(&b) {
            break;
        }
        if !(0x20..=0x3f).contains(&b) {
            return Parsed::Skip(end);
        }
        end += 1;
    }

    let final_byte = buf[end];
    let raw = &buf[2..end];
    let consumed = end + 1;
    let params = parse_params(raw);
    let param = |idx: usize| params.get(idx).copied().unwrap_or(0);
    let modifiers = modifiers_from_xterm_param(param(1));

    match final_byte {
        b'~' => match param(0) {
            // Paste markers are handed on verbatim.
            200 | 201 => {
                let mut keys = vec![KeyEvent::plain(KeyCode::Escape)];
                keys.extend(buf[1..consumed].iter().map(|&b| KeyEvent::char(b as char)));
                Parsed::Keys(keys, consumed)
            }
            1 | 7 => one(KeyEvent::new(KeyCode::Home, modifiers), consumed),
            2 => one(KeyEvent::new(KeyCode::Insert, modifiers), consumed),
            3 => one(KeyEvent::new(KeyCode::Delete, modifiers), consumed),
            4 | 8 => one(KeyEvent::new(KeyCode::End, modifiers), consumed),
            5 => one(KeyEvent::new(KeyCode::PageUp, modifiers), consumed),
            6 => one(KeyEvent::new(KeyCode::PageDown, modifiers), consumed),
            // xterm modifyOtherKeys: CSI 27 ; mods ; code ~
            27 => match codepoint_key(param(2)) {
                Some(code) => one(KeyEvent::new(code, modifiers), consumed),
                None => Parsed::Skip(consumed),
            },
            _ => Parsed::Skip(consumed),
        },
        // CSI code ; mods u
        b'u' => match codepoint_key(param(0)) {
            Some(code) => one(KeyEvent::new(code, modifiers), consumed),
            None => Parsed::Skip(consumed),
        },
        b'A' => one(KeyEvent::new(KeyCode::Up, modifiers), consumed),
        b'B' => one(KeyEvent::new(KeyCode::Down, modifiers), consumed),
        b'C' => one(KeyEvent::new(KeyCode::Right, modifiers), consumed),
        b'D' => one(KeyEvent::new(KeyCode::Left, modifiers), consumed),
        b'H' => one(KeyEvent::new(KeyCode::Home, modifiers), consumed),
        b'F' => one(KeyEvent::new(KeyCode::End, modifiers), consumed),
        b'Z' => one(KeyEvent::plain(KeyCode::BackTab), consumed),
        _ => Parsed::Skip(consumed),
    }
}

fn parse_ss3(buf: &[u8]) -> Parsed {
    let Some(&b) = buf.get(2) else {
        return Parsed::Incomplete;
    };
    let code = match b {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'M' => KeyCode::KpEnter,
        _ => return Parsed::Skip(3),
    };
    one(KeyEvent::plain(code), 3)
}

fn codepoint_key(codepoint: u16) -> Option<KeyCode> {
    match codepoint {
        13 => Some(KeyCode::Enter),
        9 => Some(KeyCode::Tab),
        27 => Some(KeyCode::Escape),
        127 => Some(KeyCode::Backspace),
        cp => char::from_u32(u32::from(cp))
            .filter(|ch| !ch.is_control())
            .map(KeyCode::Char),
    }
}

fn parse_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';')
        .map(|part| {
            part.iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u16, |acc, &b| {
                    acc.saturating_mul(10).saturating_add(u16::from(b - b'0'))
                })
        })
        .collect()
}

fn parse_utf8(buf: &[u8]) -> Parsed {
    let expected = match buf[0] {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Parsed::Skip(1),
    };
    if buf.len() < expected {
        return Parsed::Incomplete;
    }
    match std::str::from_utf8(&buf[..expected])
        .ok()
        .and_then(|s| s.chars().next())
    {
        Some(ch) => one(KeyEvent::char(ch), expected),
        None => Parsed::Skip(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<KeyEvent> {
        KeyDecoder::new().advance(bytes)
    }

    #[test]
    fn test_printable_and_control_bytes() {
        assert_eq!(
            decode(b"a\r\n\x7f\t\x01"),
            vec![
                KeyEvent::char('a'),
                KeyEvent::plain(KeyCode::Enter),
                KeyEvent::ctrl('j'),
                KeyEvent::plain(KeyCode::Backspace),
                KeyEvent::plain(KeyCode::Tab),
                KeyEvent::ctrl('a'),
            ]
        );
    }

    #[test]
    fn test_arrows_with_modifiers() {
        assert_eq!(
            decode(b"\x1b[D\x1b[1;5C\x1bOA"),
            vec![
                KeyEvent::plain(KeyCode::Left),
                KeyEvent::new(KeyCode::Right, KeyModifiers::CONTROL),
                KeyEvent::plain(KeyCode::Up),
            ]
        );
    }

    #[test]
    fn test_csi_modifier_param_builds_combined_flags() {
        let keys = decode(b"\x1b[1;7D\x1b[1;8H");
        assert_eq!(keys[0].modifiers, KeyModifiers::ALT | KeyModifiers::CONTROL);
        assert_eq!(keys[1].code, KeyCode::Home);
        assert!(keys[1]
            .modifiers
            .contains(KeyModifiers::SHIFT | KeyModifiers::ALT | KeyModifiers::CONTROL));
        assert_eq!(keys[0].name(), "CTRL_ALT_LEFT");
    }

    #[test]
    fn test_alt_keys_and_shift_enter_variants() {
        assert_eq!(
            decode(b"\x1bb\x1b\r\x1b[13;2u\x1b[27;2;13~"),
            vec![
                KeyEvent::alt('b'),
                KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT),
                KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT),
                KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT),
            ]
        );
    }

    #[test]
    fn test_paste_markers_are_passed_through_as_keys() {
        let mut expected = vec![KeyEvent::plain(KeyCode::Escape)];
        expected.extend(KeyEvent::typed("[200~hi"));
        expected.push(KeyEvent::plain(KeyCode::Escape));
        expected.extend(KeyEvent::typed("[201~"));
        assert_eq!(decode(b"\x1b[200~hi\x1b[201~"), expected);
    }

    #[test]
    fn test_split_sequences_wait_for_more_bytes() {
        let mut decoder = KeyDecoder::new();
        assert!(decoder.advance(b"\x1b[1;").is_empty());
        assert!(decoder.has_pending());
        assert_eq!(
            decoder.advance(b"5D"),
            vec![KeyEvent::new(KeyCode::Left, KeyModifiers::CONTROL)]
        );
        assert!(decoder.advance(&[0xe8, 0xaa]).is_empty());
        assert_eq!(decoder.advance(&[0x9e]), vec![KeyEvent::char('語')]);
    }

    #[test]
    fn test_flush_turns_lone_escape_into_keypress() {
        let mut decoder = KeyDecoder::new();
        assert!(decoder.advance(b"\x1b").is_empty());
        assert_eq!(decoder.flush(), vec![KeyEvent::plain(KeyCode::Escape)]);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_double_escape_yields_two_presses() {
        let mut decoder = KeyDecoder::new();
        let mut keys = decoder.advance(b"\x1b\x1b");
        keys.extend(decoder.flush());
        assert_eq!(
            keys,
            vec![
                KeyEvent::plain(KeyCode::Escape),
                KeyEvent::plain(KeyCode::Escape)
            ]
        );
    }
}
