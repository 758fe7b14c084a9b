//! # Stop Characters
//!
//! Text fields in delimited formats end at a separator rather than at a length
//! prefix. A [`StopCharTester`] decides which characters end a field;
//! [`parse_utf8`] and [`skip_to`] read a stream up to (and including) the
//! first such character.
//!
//! | Set        | Stops on                                    |
//! |------------|---------------------------------------------|
//! | `Comma`    | control characters and `,`                  |
//! | `Control`  | control characters (below `' '`)            |
//! | `NewLine`  | `'\n'`                                      |
//! | `Space`    | whitespace and NUL                          |
//! | `XmlText`  | `"`, `<`, `>` and NUL                       |
//! | `FixText`  | NUL and SOH (`\x01`, the FIX separator)     |
//! | `Quotes`   | `"` and NUL                                 |
//! | `All`      | nothing; reads to the end of the input      |

use eyre::Result;
use smallvec::SmallVec;

use super::utf8::read_char;
use crate::bytes::StreamingInput;

pub trait StopCharTester {
    fn is_stop_char(&self, ch: char) -> bool;
}

impl<F: Fn(char) -> bool> StopCharTester for F {
    fn is_stop_char(&self, ch: char) -> bool {
        self(ch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopChars {
    Comma,
    Control,
    NewLine,
    Space,
    XmlText,
    FixText,
    Quotes,
    All,
}

impl StopCharTester for StopChars {
    #[inline]
    fn is_stop_char(&self, ch: char) -> bool {
        match self {
            StopChars::Comma => ch < ' ' || ch == ',',
            StopChars::Control => ch < ' ',
            StopChars::NewLine => ch == '\n',
            StopChars::Space => ch.is_whitespace() || ch == '\0',
            StopChars::XmlText => matches!(ch, '"' | '<' | '>' | '\0'),
            StopChars::FixText => ch <= '\u{1}',
            StopChars::Quotes => ch == '"' || ch == '\0',
            StopChars::All => false,
        }
    }
}

/// Stops on any character of a caller-supplied set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopCharSet {
    chars: SmallVec<[char; 4]>,
}

impl StopCharTester for StopCharSet {
    #[inline]
    fn is_stop_char(&self, ch: char) -> bool {
        self.chars.contains(&ch)
    }
}

pub fn for_chars(separators: &str) -> StopCharSet {
    StopCharSet {
        chars: separators.chars().collect(),
    }
}

/// Reads characters until a stop character or the end of input. The stop
/// character is consumed but not returned.
pub fn parse_utf8<I, T>(input: &mut I, tester: &T) -> Result<String>
where
    I: StreamingInput + ?Sized,
    T: StopCharTester + ?Sized,
{
    let mut text = String::new();
    while input.remaining() > 0 {
        let ch = read_char(input)?;
        if tester.is_stop_char(ch) {
            break;
        }
        text.push(ch);
    }
    Ok(text)
}

/// Consumes input up to and including the next stop character. Returns
/// `false` if the input ran out first.
pub fn skip_to<I, T>(input: &mut I, tester: &T) -> Result<bool>
where
    I: StreamingInput + ?Sized,
    T: StopCharTester + ?Sized,
{
    while input.remaining() > 0 {
        if tester.is_stop_char(read_char(input)?) {
            return Ok(true);
        }
    }
    Ok(false)
}
