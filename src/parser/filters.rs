//! Stream filter pipeline.
//!
//! Content streams and lookup tables go through lopdf's own decompression.
//! Image samples run the local `/Filter` chain, which also covers
//! RunLength, the TIFF predictor and `DCTDecode` pass-through. `DCTDecode`
//! must be the last filter of the chain.

use std::io::Read;

use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};

use super::resources::resolve;

/// Result of running a stream's filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Raw samples, ready to be unpacked
    Samples(Vec<u8>),
    /// A baseline JPEG stream
    Jpeg(Vec<u8>),
}

/// A single decoding step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Flate,
    Lzw,
    AsciiHex,
    Ascii85,
    RunLength,
    Dct,
}

impl Filter {
    fn from_name(name: &[u8]) -> Result<Self> {
        match name {
            b"FlateDecode" | b"Fl" => Ok(Filter::Flate),
            b"LZWDecode" | b"LZW" => Ok(Filter::Lzw),
            b"ASCIIHexDecode" | b"AHx" => Ok(Filter::AsciiHex),
            b"ASCII85Decode" | b"A85" => Ok(Filter::Ascii85),
            b"RunLengthDecode" | b"RL" => Ok(Filter::RunLength),
            b"DCTDecode" | b"DCT" => Ok(Filter::Dct),
            other => Err(Error::Other(format!(
                "unsupported filter {}",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

/// Parameters from a `/DecodeParms` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DecodeParams {
    predictor: i64,
    colors: usize,
    bits_per_component: usize,
    columns: usize,
    early_change: bool,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
            early_change: true,
        }
    }
}

impl DecodeParams {
    fn from_dict(dict: Option<&Dictionary>) -> Self {
        let mut params = Self::default();
        let Some(dict) = dict else {
            return params;
        };

        let int = |key: &[u8]| dict.get(key).ok().and_then(|o| o.as_i64().ok());
        if let Some(p) = int(b"Predictor") {
            params.predictor = p;
        }
        if let Some(c) = int(b"Colors").filter(|c| *c > 0) {
            params.colors = c as usize;
        }
        if let Some(b) = int(b"BitsPerComponent").filter(|b| *b > 0) {
            params.bits_per_component = b as usize;
        }
        if let Some(c) = int(b"Columns").filter(|c| *c > 0) {
            params.columns = c as usize;
        }
        if let Some(e) = int(b"EarlyChange") {
            params.early_change = e != 0;
        }
        params
    }

    /// Bytes per row of predicted data, without the PNG tag byte.
    fn row_bytes(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Distance in bytes to the corresponding byte of the previous pixel.
    fn pixel_bytes(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Decode a non-image stream (content streams, lookup tables).
pub fn decode_data(doc: &LopdfDocument, stream: &Stream) -> Result<Vec<u8>> {
    match stream.dict.get(b"Filter") {
        Err(_) | Ok(Object::Null) => return Ok(stream.content.clone()),
        Ok(Object::Array(arr)) if arr.is_empty() => return Ok(stream.content.clone()),
        Ok(_) => {}
    }

    match stream.decompressed_content() {
        Ok(data) => Ok(data),
        Err(e) => {
            log::debug!("lopdf could not decompress stream ({}), using filter chain", e);
            match decode_image_data(doc, stream)? {
                Decoded::Samples(data) => Ok(data),
                Decoded::Jpeg(_) => Err(Error::Other(
                    "DCTDecode is only valid for image streams".to_string(),
                )),
            }
        }
    }
}

/// Run the filter chain of an image stream.
pub fn decode_image_data(doc: &LopdfDocument, stream: &Stream) -> Result<Decoded> {
    let chain = filter_chain(doc, &stream.dict)?;
    let mut data = stream.content.clone();

    for (i, (filter, params)) in chain.iter().enumerate() {
        let last = i + 1 == chain.len();
        data = match filter {
            Filter::Flate => unpredict(inflate(&data)?, params)?,
            Filter::Lzw => unpredict(lzw(&data, params.early_change)?, params)?,
            Filter::AsciiHex => ascii_hex(&data)?,
            Filter::Ascii85 => ascii85(&data)?,
            Filter::RunLength => run_length(&data),
            Filter::Dct if last => return Ok(Decoded::Jpeg(data)),
            Filter::Dct => {
                return Err(Error::Other(
                    "DCTDecode must be the last filter".to_string(),
                ))
            }
        };
    }

    Ok(Decoded::Samples(data))
}

fn filter_chain(doc: &LopdfDocument, dict: &Dictionary) -> Result<Vec<(Filter, DecodeParams)>> {
    let entry = |key: &[u8]| dict.get(key).ok().and_then(|o| resolve(doc, o));

    let names: Vec<&[u8]> = match entry(b"Filter") {
        Some(Object::Name(name)) => vec![name.as_slice()],
        Some(Object::Array(arr)) => arr
            .iter()
            .map(|o| resolve(doc, o).and_then(|o| o.as_name().ok()))
            .collect::<Option<_>>()
            .ok_or_else(|| Error::Other("malformed /Filter array".to_string()))?,
        Some(Object::Null) | None => Vec::new(),
        Some(_) => return Err(Error::Other("malformed /Filter entry".to_string())),
    };

    let params: Vec<Option<&Dictionary>> = match entry(b"DecodeParms") {
        Some(Object::Dictionary(d)) => vec![Some(d)],
        Some(Object::Array(arr)) => arr
            .iter()
            .map(|o| resolve(doc, o).and_then(|o| o.as_dict().ok()))
            .collect(),
        _ => Vec::new(),
    };

    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let filter = Filter::from_name(name)?;
            let params = DecodeParams::from_dict(params.get(i).copied().flatten());
            Ok((filter, params))
        })
        .collect()
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut output = Vec::new();

    match decoder.read_to_end(&mut output) {
        Ok(_) => Ok(output),
        Err(e) if !output.is_empty() => {
            log::warn!(
                "FlateDecode recovered {} bytes before corruption: {}",
                output.len(),
                e
            );
            Ok(output)
        }
        Err(e) => Err(Error::Other(format!("FlateDecode error: {}", e))),
    }
}

fn lzw(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    use weezl::{decode::Decoder, BitOrder};

    let mut decoder = if early_change {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        Decoder::new(BitOrder::Msb, 8)
    };
    decoder
        .decode(data)
        .map_err(|e| Error::Other(format!("LZWDecode error: {:?}", e)))
}

fn unpredict(data: Vec<u8>, params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data),
        2 => tiff_predictor(data, params),
        10..=15 => png_predictor(&data, params),
        p => Err(Error::Other(format!("unsupported predictor {}", p))),
    }
}

/// TIFF predictor 2: horizontal differencing within each row.
fn tiff_predictor(mut data: Vec<u8>, params: &DecodeParams) -> Result<Vec<u8>> {
    let row_bytes = params.row_bytes();
    let colors = params.colors;

    match params.bits_per_component {
        8 => {
            for row in data.chunks_mut(row_bytes) {
                for i in colors..row.len() {
                    row[i] = row[i].wrapping_add(row[i - colors]);
                }
            }
        }
        16 => {
            let stride = colors * 2;
            for row in data.chunks_mut(row_bytes) {
                let mut i = stride;
                while i + 1 < row.len() {
                    let left = u16::from_be_bytes([row[i - stride], row[i - stride + 1]]);
                    let cur = u16::from_be_bytes([row[i], row[i + 1]]);
                    let [hi, lo] = cur.wrapping_add(left).to_be_bytes();
                    row[i] = hi;
                    row[i + 1] = lo;
                    i += 2;
                }
            }
        }
        bpc => {
            return Err(Error::Other(format!(
                "TIFF predictor with {} bits per component",
                bpc
            )))
        }
    }

    Ok(data)
}

/// PNG predictors 10-15: every row carries its own filter tag.
fn png_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let row_bytes = params.row_bytes();
    let bpp = params.pixel_bytes();

    let mut output = Vec::with_capacity(data.len());
    let mut prior = vec![0u8; row_bytes];

    for chunk in data.chunks(row_bytes + 1) {
        let tag = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_bytes, 0);

        for i in 0..row_bytes {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prior[i];
            let up_left = if i >= bpp { prior[i - bpp] } else { 0 };
            row[i] = match tag {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                t => return Err(Error::Other(format!("invalid PNG predictor tag {}", t))),
            };
        }

        output.extend_from_slice(&row);
        prior = row;
    }

    Ok(output)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn ascii_hex(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;

    for &b in data {
        if b == b'>' {
            break;
        }
        if b.is_ascii_whitespace() {
            continue;
        }
        let nibble = (b as char)
            .to_digit(16)
            .ok_or_else(|| Error::Other(format!("ASCIIHexDecode: invalid byte 0x{:02x}", b)))?
            as u8;
        match high.take() {
            Some(h) => output.push(h << 4 | nibble),
            None => high = Some(nibble),
        }
    }
    if let Some(h) = high {
        output.push(h << 4);
    }

    Ok(output)
}

fn ascii85(data: &[u8]) -> Result<Vec<u8>> {
    let data = data.strip_prefix(b"<~").unwrap_or(data);
    let mut output = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut n = 0;

    for &b in data {
        match b {
            b'~' => break,
            b'z' if n == 0 => output.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[n] = b - b'!';
                n += 1;
                if n == 5 {
                    output.extend_from_slice(&ascii85_group(&group).to_be_bytes());
                    n = 0;
                }
            }
            b if b.is_ascii_whitespace() => {}
            b => {
                return Err(Error::Other(format!(
                    "ASCII85Decode: invalid byte 0x{:02x}",
                    b
                )))
            }
        }
    }

    if n == 1 {
        return Err(Error::Other("ASCII85Decode: dangling byte".to_string()));
    }
    if n > 1 {
        for slot in group.iter_mut().skip(n) {
            *slot = b'u' - b'!';
        }
        output.extend_from_slice(&ascii85_group(&group).to_be_bytes()[..n - 1]);
    }

    Ok(output)
}

fn ascii85_group(group: &[u8; 5]) -> u32 {
    group
        .iter()
        .fold(0u32, |acc, &d| acc.wrapping_mul(85).wrapping_add(d as u32))
}

fn run_length(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len() * 2);
    let mut i = 0;

    while i < data.len() {
        let len = data[i] as usize;
        i += 1;
        match len {
            128 => break,
            0..=127 => {
                let end = (i + len + 1).min(data.len());
                output.extend_from_slice(&data[i..end]);
                i = end;
            }
            _ => {
                if let Some(&b) = data.get(i) {
                    output.extend(std::iter::repeat(b).take(257 - len));
                }
                i += 1;
            }
        }
    }

    output
}
