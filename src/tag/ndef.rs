//! Minimal NDEF message codec: enough to read and write the single
//! well-known Text record that carries a tag identifier.

use crate::error::{Error, Result};

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;

pub const TNF_EMPTY: u8 = 0x00;
pub const TNF_WELL_KNOWN: u8 = 0x01;

const TEXT_TYPE: &[u8] = b"T";
const STATUS_UTF16: u8 = 0x80;
const STATUS_LANG_MASK: u8 = 0x3F;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub tnf: u8,
    pub record_type: Vec<u8>,
    pub id: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn text(text: &str, lang: &str) -> Self {
        let lang = &lang.as_bytes()[..lang.len().min(STATUS_LANG_MASK as usize)];
        let mut payload = Vec::with_capacity(1 + lang.len() + text.len());
        payload.push(lang.len() as u8);
        payload.extend_from_slice(lang);
        payload.extend_from_slice(text.as_bytes());

        Self {
            tnf: TNF_WELL_KNOWN,
            record_type: TEXT_TYPE.to_vec(),
            id: Vec::new(),
            payload,
        }
    }

    pub fn is_text(&self) -> bool {
        self.tnf == TNF_WELL_KNOWN && self.record_type == TEXT_TYPE
    }

    /// Decoded text of a Text record; None for any other record.
    pub fn as_text(&self) -> Result<Option<String>> {
        if !self.is_text() {
            return Ok(None);
        }
        let (&status, rest) = self
            .payload
            .split_first()
            .ok_or_else(|| Error::Ndef("empty text record payload".into()))?;

        let lang_len = (status & STATUS_LANG_MASK) as usize;
        if rest.len() < lang_len {
            return Err(Error::Ndef("language code runs past payload".into()));
        }
        let body = &rest[lang_len..];

        let text = if status & STATUS_UTF16 != 0 {
            decode_utf16(body)?
        } else {
            String::from_utf8(body.to_vec()).map_err(|e| Error::Ndef(e.to_string()))?
        };
        Ok(Some(text))
    }
}

fn decode_utf16(body: &[u8]) -> Result<String> {
    if body.len() % 2 != 0 {
        return Err(Error::Ndef("odd length UTF-16 text".into()));
    }
    let (little_endian, body) = match body {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        _ => (false, body),
    };
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|c| {
            if little_endian {
                u16::from_le_bytes([c[0], c[1]])
            } else {
                u16::from_be_bytes([c[0], c[1]])
            }
        })
        .collect();
    String::from_utf16(&units).map_err(|e| Error::Ndef(e.to_string()))
}

pub fn encode_message(records: &[Record]) -> Vec<u8> {
    let mut out = Vec::new();
    let last = records.len().saturating_sub(1);

    for (i, record) in records.iter().enumerate() {
        let short = record.payload.len() < 256;
        let mut header = record.tnf & TNF_MASK;
        if i == 0 {
            header |= FLAG_MB;
        }
        if i == last {
            header |= FLAG_ME;
        }
        if short {
            header |= FLAG_SR;
        }
        if !record.id.is_empty() {
            header |= FLAG_IL;
        }

        out.push(header);
        out.push(record.record_type.len() as u8);
        if short {
            out.push(record.payload.len() as u8);
        } else {
            out.extend_from_slice(&(record.payload.len() as u32).to_be_bytes());
        }
        if !record.id.is_empty() {
            out.push(record.id.len() as u8);
        }
        out.extend_from_slice(&record.record_type);
        out.extend_from_slice(&record.id);
        out.extend_from_slice(&record.payload);
    }
    out
}

pub fn decode_message(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut cursor = Cursor { bytes, pos: 0 };

    while !cursor.is_empty() {
        let header = cursor.byte()?;
        if header & FLAG_CF != 0 {
            return Err(Error::Ndef("chunked records are not supported".into()));
        }
        let type_len = cursor.byte()? as usize;
        let payload_len = if header & FLAG_SR != 0 {
            cursor.byte()? as usize
        } else {
            let b = cursor.take(4)?;
            u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize
        };
        let id_len = if header & FLAG_IL != 0 { cursor.byte()? as usize } else { 0 };

        let record_type = cursor.take(type_len)?.to_vec();
        let id = cursor.take(id_len)?.to_vec();
        let payload = cursor.take(payload_len)?.to_vec();

        records.push(Record { tnf: header & TNF_MASK, record_type, id, payload });

        if header & FLAG_ME != 0 {
            break;
        }
    }
    Ok(records)
}

/// Identifier carried by a message: the first record, if it is a non-blank
/// Text record. Empty messages and empty records carry none.
pub fn decode_identifier(bytes: &[u8]) -> Result<Option<String>> {
    let records = decode_message(bytes)?;
    let Some(first) = records.into_iter().find(|r| r.tnf != TNF_EMPTY) else {
        return Ok(None);
    };
    Ok(first.as_text()?.filter(|t| !t.trim().is_empty()))
}

pub fn encode_identifier(id: &str) -> Vec<u8> {
    encode_message(&[Record::text(id, "en")])
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| Error::Ndef(format!("truncated at byte {}", self.pos)))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}
