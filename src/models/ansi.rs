//! ANSI escape stripping for runner error output.

const ESC: char = '\u{1b}';
const CSI: char = '\u{9b}';
const BEL: char = '\u{07}';

/// Remove ANSI escape sequences (CSI color/cursor codes and OSC strings).
pub fn strip_ansi(input: &str) -> String {
    if !input.contains(ESC) && !input.contains(CSI) {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ESC => match chars.peek() {
                Some('[') => {
                    chars.next();
                    skip_csi(&mut chars);
                }
                Some(']') => {
                    chars.next();
                    skip_osc(&mut chars);
                }
                // Two-character escapes such as ESC c or ESC (B
                Some('(') | Some(')') => {
                    chars.next();
                    chars.next();
                }
                Some(_) => {
                    chars.next();
                }
                None => {}
            },
            CSI => skip_csi(&mut chars),
            _ => out.push(c),
        }
    }

    out
}

/// Parameter and intermediate bytes run until a final byte in 0x40..=0x7e.
fn skip_csi(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    for c in chars.by_ref() {
        if ('\u{40}'..='\u{7e}').contains(&c) {
            break;
        }
    }
}

/// OSC strings end at BEL or at the ST sequence ESC \.
fn skip_osc(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while let Some(c) = chars.next() {
        if c == BEL {
            break;
        }
        if c == ESC {
            if chars.peek() == Some(&'\\') {
                chars.next();
            }
            break;
        }
    }
}
