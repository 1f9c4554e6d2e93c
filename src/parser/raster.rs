//! Raster decoding of image XObjects into pixel buffers.

use image::{DynamicImage, ImageFormat};
use lopdf::{Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};
use crate::model::{PixelBuffer, PixelFormat};

use super::filters::{decode_data, decode_image_data, Decoded};
use super::resources::resolve;

/// Largest image decoded, in pixels.
const MAX_IMAGE_PIXELS: u64 = 1 << 28;

/// Short sample data is zero-padded only up to this multiple of its length.
const MAX_PADDING_FACTOR: usize = 4;

/// Colour space of an image's samples.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Palette lookup; `lookup` holds `(hival + 1) * base.components()` bytes
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
    /// Single colorant, rendered as inverted gray
    Separation,
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Separation | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }

    fn output_format(&self) -> PixelFormat {
        match self {
            ColorSpace::Gray | ColorSpace::Separation => PixelFormat::Gray8,
            ColorSpace::Rgb | ColorSpace::Cmyk => PixelFormat::Rgb8,
            ColorSpace::Indexed { base, .. } => base.output_format(),
        }
    }

    fn parse(doc: &LopdfDocument, obj: &Object) -> Result<Self> {
        let obj = resolve(doc, obj).ok_or_else(|| unsupported("dangling /ColorSpace"))?;
        match obj {
            Object::Name(name) => Self::from_name(name),
            Object::Array(arr) => {
                let family = arr
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .ok_or_else(|| unsupported("malformed /ColorSpace array"))?;
                match family {
                    b"CalGray" => Ok(ColorSpace::Gray),
                    b"CalRGB" => Ok(ColorSpace::Rgb),
                    b"ICCBased" => Self::icc_based(doc, arr.get(1)),
                    b"Indexed" | b"I" => Self::indexed(doc, arr),
                    b"Separation" => Ok(ColorSpace::Separation),
                    // [/DeviceRGB] and friends
                    other if arr.len() == 1 => Self::from_name(other),
                    other => Err(unsupported(&format!(
                        "unsupported color space {}",
                        String::from_utf8_lossy(other)
                    ))),
                }
            }
            _ => Err(unsupported("malformed /ColorSpace")),
        }
    }

    fn from_name(name: &[u8]) -> Result<Self> {
        match name {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(ColorSpace::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(ColorSpace::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
            other => Err(unsupported(&format!(
                "unsupported color space {}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn icc_based(doc: &LopdfDocument, profile: Option<&Object>) -> Result<Self> {
        let n = profile
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_stream().ok())
            .and_then(|s| s.dict.get(b"N").ok())
            .and_then(|n| n.as_i64().ok());
        match n {
            Some(1) => Ok(ColorSpace::Gray),
            Some(3) => Ok(ColorSpace::Rgb),
            Some(4) => Ok(ColorSpace::Cmyk),
            _ => Err(unsupported("ICCBased profile without a usable /N")),
        }
    }

    fn indexed(doc: &LopdfDocument, arr: &[Object]) -> Result<Self> {
        if arr.len() < 4 {
            return Err(unsupported("malformed /Indexed color space"));
        }
        let base = Self::parse(doc, &arr[1])?;
        if matches!(base, ColorSpace::Indexed { .. }) {
            return Err(unsupported("nested /Indexed color space"));
        }
        let hival = resolve(doc, &arr[2])
            .and_then(|o| o.as_i64().ok())
            .filter(|h| (0..=255).contains(h))
            .ok_or_else(|| unsupported("invalid /Indexed hival"))? as u8;

        let mut lookup = match resolve(doc, &arr[3]) {
            Some(Object::String(bytes, _)) => bytes.clone(),
            Some(Object::Stream(stream)) => decode_data(doc, stream)?,
            _ => return Err(unsupported("invalid /Indexed lookup table")),
        };
        lookup.resize((hival as usize + 1) * base.components(), 0);

        Ok(ColorSpace::Indexed {
            base: Box::new(base),
            hival,
            lookup,
        })
    }
}

fn unsupported(message: &str) -> Error {
    Error::Other(message.to_string())
}

/// Decode an image XObject into a pixel buffer.
pub fn decode_image(doc: &LopdfDocument, stream: &Stream) -> Result<PixelBuffer> {
    let dict = &stream.dict;
    let dimension = |long: &[u8], short: &[u8]| {
        dict.get(long)
            .or_else(|_| dict.get(short))
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_i64().ok())
            .filter(|v| *v > 0 && *v <= u32::MAX as i64)
            .map(|v| v as u32)
    };
    let width = dimension(b"Width", b"W").ok_or_else(|| unsupported("missing /Width"))?;
    let height = dimension(b"Height", b"H").ok_or_else(|| unsupported("missing /Height"))?;
    if u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS {
        return Err(unsupported(&format!(
            "image size {}x{} exceeds {} pixels",
            width, height, MAX_IMAGE_PIXELS
        )));
    }

    let data = match decode_image_data(doc, stream)? {
        Decoded::Jpeg(jpeg) => return decode_jpeg(&jpeg),
        Decoded::Samples(data) => data,
    };

    let image_mask = dict
        .get(b"ImageMask")
        .or_else(|_| dict.get(b"IM"))
        .and_then(Object::as_bool)
        .unwrap_or(false);

    let bits = dict
        .get(b"BitsPerComponent")
        .or_else(|_| dict.get(b"BPC"))
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(if image_mask { 1 } else { 8 });
    let bits = match bits {
        1 | 2 | 4 | 8 | 16 => bits as u8,
        other => {
            return Err(unsupported(&format!(
                "unsupported bits per component {}",
                other
            )))
        }
    };

    let color_space = if image_mask {
        ColorSpace::Gray
    } else {
        let cs = dict
            .get(b"ColorSpace")
            .or_else(|_| dict.get(b"CS"))
            .map_err(|_| unsupported("missing /ColorSpace"))?;
        ColorSpace::parse(doc, cs)?
    };

    let layout = SampleLayout {
        width: width as usize,
        height: height as usize,
        components: color_space.components(),
        bits,
    };
    let decode_array = dict.get(b"Decode").or_else(|_| dict.get(b"D")).ok();
    let decode = decode_ranges(decode_array, &color_space, bits);
    let samples = unpack_samples(&data, &layout)?;

    let pixels = to_pixels(&samples, &layout, &decode, &color_space);
    PixelBuffer::new(width, height, color_space.output_format(), pixels)
        .ok_or_else(|| unsupported("decoded sample count does not match image size"))
}

fn decode_jpeg(data: &[u8]) -> Result<PixelBuffer> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| Error::Other(format!("DCTDecode error: {}", e)))?;

    let (format, raw, width, height) = match img {
        DynamicImage::ImageLuma8(gray) => {
            let (w, h) = gray.dimensions();
            (PixelFormat::Gray8, gray.into_raw(), w, h)
        }
        other => {
            let rgb = other.to_rgb8();
            let (w, h) = rgb.dimensions();
            (PixelFormat::Rgb8, rgb.into_raw(), w, h)
        }
    };
    PixelBuffer::new(width, height, format, raw)
        .ok_or_else(|| unsupported("JPEG decoder returned an inconsistent buffer"))
}

/// Geometry of packed sample data.
#[derive(Debug, Clone, Copy)]
struct SampleLayout {
    width: usize,
    height: usize,
    components: usize,
    bits: u8,
}

impl SampleLayout {
    fn row_bytes(&self) -> Option<usize> {
        self.width
            .checked_mul(self.components)?
            .checked_mul(self.bits as usize)
            .map(|bits| bits.div_ceil(8))
    }

    fn max_value(&self) -> f32 {
        ((1u32 << self.bits) - 1) as f32
    }
}

/// Unpack rows of `bits`-wide samples. Moderately short data is zero-padded.
fn unpack_samples(data: &[u8], layout: &SampleLayout) -> Result<Vec<u16>> {
    let too_large = || unsupported("image dimensions overflow");
    let row_bytes = layout.row_bytes().ok_or_else(too_large)?;
    let expected = row_bytes.checked_mul(layout.height).ok_or_else(too_large)?;

    let padded;
    let data = if data.len() < expected {
        if expected > data.len().saturating_mul(MAX_PADDING_FACTOR) {
            return Err(unsupported(&format!(
                "image data is {} bytes, expected {}",
                data.len(),
                expected
            )));
        }
        log::warn!(
            "Image data is {} bytes, expected {}; padding with zeros",
            data.len(),
            expected
        );
        let mut buf = data.to_vec();
        buf.resize(expected, 0);
        padded = buf;
        &padded[..]
    } else {
        &data[..expected]
    };

    let per_row = layout.width * layout.components;
    let mut samples = Vec::with_capacity(per_row * layout.height);

    for row in data.chunks(row_bytes.max(1)).take(layout.height) {
        match layout.bits {
            8 => samples.extend(row[..per_row].iter().map(|&b| b as u16)),
            16 => samples.extend(
                row.chunks_exact(2)
                    .take(per_row)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
            ),
            bits => {
                let mask = (1u16 << bits) - 1;
                for i in 0..per_row {
                    let bit = i * bits as usize;
                    let shift = 8 - bits as usize - bit % 8;
                    samples.push((row[bit / 8] as u16 >> shift) & mask);
                }
            }
        }
    }

    Ok(samples)
}

/// Per-component `[Dmin, Dmax]` ranges from `/Decode`, or the defaults.
fn decode_ranges(decode: Option<&Object>, color_space: &ColorSpace, bits: u8) -> Vec<(f32, f32)> {
    let default_max = match color_space {
        ColorSpace::Indexed { .. } => ((1u32 << bits) - 1) as f32,
        _ => 1.0,
    };
    let defaults = vec![(0.0, default_max); color_space.components()];

    let Some(values) = decode
        .and_then(|o| o.as_array().ok())
        .map(|arr| arr.iter().filter_map(|o| o.as_float().ok()).collect::<Vec<f32>>())
    else {
        return defaults;
    };
    if values.len() < defaults.len() * 2 {
        return defaults;
    }
    values.chunks_exact(2).take(defaults.len()).map(|p| (p[0], p[1])).collect()
}

fn to_pixels(
    samples: &[u16],
    layout: &SampleLayout,
    decode: &[(f32, f32)],
    color_space: &ColorSpace,
) -> Vec<u8> {
    let max = layout.max_value();
    let comps = layout.components;
    let unit = |v: u16, (dmin, dmax): (f32, f32)| dmin + v as f32 * (dmax - dmin) / max;
    let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;

    let channels = color_space.output_format().channels();
    let mut out = Vec::with_capacity(layout.width * layout.height * channels);
    for pixel in samples.chunks_exact(comps) {
        match color_space {
            ColorSpace::Gray => out.push(to_byte(unit(pixel[0], decode[0]))),
            ColorSpace::Separation => out.push(255 - to_byte(unit(pixel[0], decode[0]))),
            ColorSpace::Rgb => {
                for (c, &v) in pixel.iter().enumerate() {
                    out.push(to_byte(unit(v, decode[c])));
                }
            }
            ColorSpace::Cmyk => {
                let mut cmyk = [0u8; 4];
                for (c, &v) in pixel.iter().enumerate() {
                    cmyk[c] = to_byte(unit(v, decode[c]));
                }
                out.extend_from_slice(&cmyk_to_rgb(cmyk));
            }
            ColorSpace::Indexed {
                base,
                hival,
                lookup,
            } => {
                let index = unit(pixel[0], decode[0]).round().clamp(0.0, *hival as f32) as usize;
                let n = base.components();
                let entry = &lookup[index * n..index * n + n];
                match base.as_ref() {
                    ColorSpace::Cmyk => out.extend_from_slice(&cmyk_to_rgb([
                        entry[0], entry[1], entry[2], entry[3],
                    ])),
                    ColorSpace::Separation => out.push(255 - entry[0]),
                    _ => out.extend_from_slice(entry),
                }
            }
        }
    }
    out
}

/// Naive CMYK to RGB conversion.
#[allow(clippy::many_single_char_names)]
fn cmyk_to_rgb([c, m, y, k]: [u8; 4]) -> [u8; 3] {
    let c = f32::from(c) / 255.0;
    let m = f32::from(m) / 255.0;
    let y = f32::from(y) / 255.0;
    let k = f32::from(k) / 255.0;

    [
        (255.0 * (1.0 - c) * (1.0 - k)).round() as u8,
        (255.0 * (1.0 - m) * (1.0 - k)).round() as u8,
        (255.0 * (1.0 - y) * (1.0 - k)).round() as u8,
    ]
}
