//! DirectDraw Surface reader for 2D textures.
//!
//! Handles the legacy header only: BC1/BC2/BC3 via FourCC and 32-bit
//! uncompressed RGBA/BGRA. The DX10 extension header, cube maps and volume
//! textures are rejected.

use std::fs;
use std::path::Path;

const MAGIC: &[u8; 4] = b"DDS ";
const HEADER_SIZE: usize = 124;
const PIXEL_FORMAT_SIZE: u32 = 32;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_FOURCC: u32 = 0x4;
const DDPF_RGB: u32 = 0x40;

const DDSCAPS2_CUBEMAP: u32 = 0x200;
const DDSCAPS2_VOLUME: u32 = 0x20_0000;

const MAX_MIPS: u32 = 32;
/// Largest width or height accepted from a header.
pub const MAX_DIMENSION: u32 = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdsFormat {
    Bc1,
    Bc2,
    Bc3,
    Rgba8,
    Bgra8,
}

impl DdsFormat {
    pub fn is_block_compressed(self) -> bool {
        matches!(self, Self::Bc1 | Self::Bc2 | Self::Bc3)
    }

    /// Bytes per 4x4 block for BC formats, per pixel otherwise.
    pub fn unit_bytes(self) -> usize {
        match self {
            Self::Bc1 => 8,
            Self::Bc2 | Self::Bc3 => 16,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }

    /// Byte size of one mip level, `None` if it does not fit in `usize`.
    pub fn level_size(self, width: u32, height: u32) -> Option<usize> {
        let (units_x, units_y) = if self.is_block_compressed() {
            (width.div_ceil(4).max(1), height.div_ceil(4).max(1))
        } else {
            (width.max(1), height.max(1))
        };
        usize::try_from(units_x)
            .ok()?
            .checked_mul(usize::try_from(units_y).ok()?)?
            .checked_mul(self.unit_bytes())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsMip {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsImage {
    pub width: u32,
    pub height: u32,
    pub format: DdsFormat,
    pub mips: Vec<DdsMip>,
}

pub fn load_dds(path: &Path) -> Result<DdsImage, String> {
    let bytes = fs::read(path)
        .map_err(|e| format!("Failed to read DDS file {}: {e}", path.display()))?;
    parse_dds(&bytes).map_err(|e| format!("Failed to parse DDS file {}: {e}", path.display()))
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

pub fn parse_dds(bytes: &[u8]) -> Result<DdsImage, String> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err("missing 'DDS ' magic".to_string());
    }
    let header = bytes
        .get(MAGIC.len()..MAGIC.len() + HEADER_SIZE)
        .ok_or_else(|| format!("truncated header ({} bytes)", bytes.len()))?;

    let size = read_u32(header, 0);
    if size as usize != HEADER_SIZE {
        return Err(format!("header size is {size}, expected {HEADER_SIZE}"));
    }
    let height = read_u32(header, 8);
    let width = read_u32(header, 12);
    let mip_count = read_u32(header, 24).max(1);
    if width == 0 || height == 0 {
        return Err(format!("invalid dimensions {width}x{height}"));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(format!(
            "dimensions {width}x{height} exceed the {MAX_DIMENSION} limit"
        ));
    }
    if mip_count > MAX_MIPS {
        return Err(format!("implausible mip count {mip_count}"));
    }

    let pf_size = read_u32(header, 72);
    if pf_size != PIXEL_FORMAT_SIZE {
        return Err(format!("pixel format size is {pf_size}, expected {PIXEL_FORMAT_SIZE}"));
    }
    let pf_flags = read_u32(header, 76);
    let caps2 = read_u32(header, 108);
    if caps2 & (DDSCAPS2_CUBEMAP | DDSCAPS2_VOLUME) != 0 {
        return Err("cube maps and volume textures are not supported".to_string());
    }

    let format = if pf_flags & DDPF_FOURCC != 0 {
        match &header[80..84] {
            b"DXT1" => DdsFormat::Bc1,
            b"DXT3" => DdsFormat::Bc2,
            b"DXT5" => DdsFormat::Bc3,
            b"DX10" => return Err("DX10 extended header is not supported".to_string()),
            other => {
                return Err(format!(
                    "unsupported FourCC '{}'",
                    String::from_utf8_lossy(other)
                ))
            }
        }
    } else if pf_flags & DDPF_RGB != 0 {
        let bit_count = read_u32(header, 84);
        let r_mask = read_u32(header, 88);
        match (bit_count, r_mask) {
            (32, 0x0000_00ff) => DdsFormat::Rgba8,
            (32, 0x00ff_0000) => DdsFormat::Bgra8,
            _ => {
                return Err(format!(
                    "unsupported uncompressed layout ({bit_count} bits, R mask {r_mask:#010x})"
                ))
            }
        }
    } else {
        return Err(format!("unsupported pixel format flags {pf_flags:#x}"));
    };
    let has_alpha = pf_flags & DDPF_ALPHAPIXELS != 0;

    let mut offset = MAGIC.len() + HEADER_SIZE;
    let mut mips = Vec::with_capacity(mip_count as usize);
    let (mut w, mut h) = (width, height);
    for level in 0..mip_count {
        let len = format
            .level_size(w, h)
            .ok_or_else(|| format!("mip {level} ({w}x{h}) size overflows"))?;
        let end = offset
            .checked_add(len)
            .ok_or_else(|| format!("mip {level} ({w}x{h}) offset overflows"))?;
        let data = bytes.get(offset..end).ok_or_else(|| {
            format!(
                "truncated data at mip {level} ({w}x{h}): need {len} bytes at offset {offset}, file has {}",
                bytes.len()
            )
        })?;
        let mut data = data.to_vec();
        if !format.is_block_compressed() && !has_alpha {
            for px in data.chunks_exact_mut(4) {
                px[3] = 0xff;
            }
        }
        mips.push(DdsMip {
            width: w,
            height: h,
            data,
        });
        offset = end;
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }

    Ok(DdsImage {
        width,
        height,
        format,
        mips,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(width: u32, height: u32, mips: u32, pf_flags: u32, fourcc: &[u8; 4]) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_SIZE];
        let mut put = |off: usize, v: u32| h[off..off + 4].copy_from_slice(&v.to_le_bytes());
        put(0, HEADER_SIZE as u32);
        put(4, 0x1 | 0x2 | 0x4 | 0x1000 | 0x20000);
        put(8, height);
        put(12, width);
        put(24, mips);
        put(72, PIXEL_FORMAT_SIZE);
        put(76, pf_flags);
        h[80..84].copy_from_slice(fourcc);
        let mut out = MAGIC.to_vec();
        out.extend(h);
        out
    }

    fn with_rgb_masks(mut file: Vec<u8>, r_mask: u32) -> Vec<u8> {
        let base = MAGIC.len();
        file[base + 84..base + 88].copy_from_slice(&32u32.to_le_bytes());
        file[base + 88..base + 92].copy_from_slice(&r_mask.to_le_bytes());
        file
    }

    #[test]
    fn parses_dxt1_mip_chain() {
        let mut file = header(8, 8, 4, DDPF_FOURCC, b"DXT1");
        // 8x8 -> 4 blocks, 4x4 -> 1, 2x2 -> 1, 1x1 -> 1; 8 bytes each.
        file.extend(vec![0xAB; (4 + 1 + 1 + 1) * 8]);
        let img = parse_dds(&file).expect("parse");
        assert_eq!(img.format, DdsFormat::Bc1);
        assert_eq!((img.width, img.height), (8, 8));
        let dims: Vec<_> = img.mips.iter().map(|m| (m.width, m.height, m.data.len())).collect();
        assert_eq!(dims, vec![(8, 8, 32), (4, 4, 8), (2, 2, 8), (1, 1, 8)]);
    }

    #[test]
    fn fourcc_selects_bc_format() {
        for (cc, fmt) in [(b"DXT3", DdsFormat::Bc2), (b"DXT5", DdsFormat::Bc3)] {
            let mut file = header(4, 4, 1, DDPF_FOURCC, cc);
            file.extend(vec![0; 16]);
            assert_eq!(parse_dds(&file).expect("parse").format, fmt);
        }
    }

    #[test]
    fn zero_mip_count_means_one_level() {
        let mut file = header(4, 4, 0, DDPF_FOURCC, b"DXT5");
        file.extend(vec![0; 16]);
        assert_eq!(parse_dds(&file).expect("parse").mips.len(), 1);
    }

    #[test]
    fn uncompressed_layouts_by_red_mask() {
        let mut rgba = with_rgb_masks(header(2, 1, 1, DDPF_RGB | DDPF_ALPHAPIXELS, &[0; 4]), 0xff);
        rgba.extend([1, 2, 3, 4, 5, 6, 7, 8]);
        let img = parse_dds(&rgba).expect("parse rgba");
        assert_eq!(img.format, DdsFormat::Rgba8);
        assert_eq!(img.mips[0].data, vec![1, 2, 3, 4, 5, 6, 7, 8]);

        let mut bgrx = with_rgb_masks(header(1, 1, 1, DDPF_RGB, &[0; 4]), 0x00ff_0000);
        bgrx.extend([9, 8, 7, 0]);
        let img = parse_dds(&bgrx).expect("parse bgrx");
        assert_eq!(img.format, DdsFormat::Bgra8);
        assert_eq!(img.mips[0].data, vec![9, 8, 7, 0xff], "missing alpha is opaque");
    }

    #[test]
    fn non_multiple_of_four_rounds_up_blocks() {
        assert_eq!(DdsFormat::Bc1.level_size(5, 3), Some(16));
        assert_eq!(DdsFormat::Bc3.level_size(1, 1), Some(16));
        assert_eq!(DdsFormat::Rgba8.level_size(3, 2), Some(24));
    }

    #[test]
    fn level_size_reports_overflow() {
        assert_eq!(DdsFormat::Rgba8.level_size(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn huge_dimensions_are_rejected_without_panicking() {
        let file = with_rgb_masks(
            header(u32::MAX, u32::MAX, 1, DDPF_RGB | DDPF_ALPHAPIXELS, &[0; 4]),
            0xff,
        );
        let err = parse_dds(&file).unwrap_err();
        assert!(err.contains("exceed"), "{err}");

        let just_over = header(MAX_DIMENSION + 1, 4, 1, DDPF_FOURCC, b"DXT1");
        assert!(parse_dds(&just_over).is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_dds(b"PNG").unwrap_err().contains("magic"));
        assert!(parse_dds(b"DDS \x7c\x00").unwrap_err().contains("truncated header"));

        let dx10 = header(4, 4, 1, DDPF_FOURCC, b"DX10");
        assert!(parse_dds(&dx10).unwrap_err().contains("DX10"));

        let unknown = header(4, 4, 1, DDPF_FOURCC, b"ATI2");
        assert!(parse_dds(&unknown).unwrap_err().contains("ATI2"));

        let mut bad_size = header(4, 4, 1, DDPF_FOURCC, b"DXT1");
        bad_size[4] = 100;
        assert!(parse_dds(&bad_size).unwrap_err().contains("header size"));
    }

    #[test]
    fn truncated_mip_data_is_an_error() {
        let mut file = header(8, 8, 2, DDPF_FOURCC, b"DXT1");
        file.extend(vec![0; 32]);
        let err = parse_dds(&file).unwrap_err();
        assert!(err.contains("mip 1"), "{err}");
    }

    #[test]
    fn load_dds_prefixes_path() {
        let err = load_dds(Path::new("/no/such/texture.dds")).unwrap_err();
        assert!(err.contains("texture.dds"), "{err}");
    }
}
