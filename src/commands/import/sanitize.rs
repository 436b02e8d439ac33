use std::borrow::Cow;

use unicode_normalization::UnicodeNormalization;

use crate::cli::SourceEncoding;

pub(super) const FIELD_DELIMITER: char = '\t';
const QUOTE: char = '"';

/// Decodes one raw line. Strict UTF-8 yields `None` on invalid byte sequences;
/// Latin-1 maps every byte to the code point of the same value and cannot fail.
pub(super) fn decode_line(bytes: &[u8], encoding: SourceEncoding) -> Option<String> {
    match encoding {
        SourceEncoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
        SourceEncoding::Latin1 => Some(bytes.iter().map(|&byte| char::from(byte)).collect()),
    }
}

/// Cleans every field of a decoded line and re-emits it with delimited-text quoting.
/// The output always splits back into the same number of fields as the input.
pub(super) fn sanitize_line(line: &str) -> String {
    split_fields(line)
        .iter()
        .map(|field| quote_field(&clean_text(field)).into_owned())
        .collect::<Vec<String>>()
        .join("\t")
}

/// Splits on tabs, honoring quoted fields. A field is quoted only when it opens
/// with a double quote and its closing quote sits directly before a tab or the end
/// of the line; inside it tabs are literal and `""` stands for one quote character.
/// Any other field is taken literally up to the next tab, so the field count always
/// matches the number of tabs outside quoted fields plus one.
pub(super) fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut rest = line;

    loop {
        let (field, consumed) = match quoted_field(rest) {
            Some(quoted) => quoted,
            None => {
                let end = rest.find(FIELD_DELIMITER).unwrap_or(rest.len());
                (rest[..end].to_string(), end)
            }
        };
        fields.push(field);

        rest = &rest[consumed..];
        match rest.strip_prefix(FIELD_DELIMITER) {
            Some(next) => rest = next,
            None => return fields,
        }
    }
}

/// Returns the unescaped value of a well-formed quoted field at the start of
/// `input` and the number of bytes it spans, closing quote included.
fn quoted_field(input: &str) -> Option<(String, usize)> {
    let body = input.strip_prefix(QUOTE)?;
    let mut value = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        if ch != QUOTE {
            value.push(ch);
            continue;
        }
        if let Some(&(_, QUOTE)) = chars.peek() {
            value.push(QUOTE);
            chars.next();
            continue;
        }

        let after = &body[index + 1..];
        if after.is_empty() || after.starts_with(FIELD_DELIMITER) {
            return Some((value, QUOTE.len_utf8() + index + 1));
        }
        return None;
    }

    None
}

pub(super) fn clean_text(input: &str) -> String {
    let unescaped = input
        .replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'");

    let mut collapsed = String::with_capacity(unescaped.len());
    for ch in unescaped.chars() {
        if is_invisible(ch) || is_pictographic(ch) {
            continue;
        }
        if ch.is_control() && ch != '\t' && ch != '\n' {
            continue;
        }
        collapsed.push(canonical_quote(ch).unwrap_or(ch));
    }

    collapsed
        .nfkd()
        .filter(|ch| matches!(ch, '\t' | '\n' | ' '..='~'))
        .collect()
}

pub(super) fn quote_field(field: &str) -> Cow<'_, str> {
    if field.contains([QUOTE, ',', '\t', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace(QUOTE, "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn canonical_quote(ch: char) -> Option<char> {
    match ch {
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{2036}'
        | '\u{00AB}' | '\u{00BB}' | '\u{301D}' | '\u{301E}' | '\u{FF02}' => Some('"'),
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '\u{2035}'
        | '\u{2039}' | '\u{203A}' | '\u{FF07}' => Some('\''),
        _ => None,
    }
}

fn is_invisible(ch: char) -> bool {
    matches!(
        ch,
        '\u{00AD}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FE00}'..='\u{FE0F}'
            | '\u{FEFF}'
    )
}

fn is_pictographic(ch: char) -> bool {
    matches!(
        ch,
        '\u{2600}'..='\u{27BF}' | '\u{2B00}'..='\u{2BFF}' | '\u{1F000}'..='\u{1FAFF}'
    )
}
