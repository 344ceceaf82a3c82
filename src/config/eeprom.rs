//! Persisted image codec
//!
//! Layout: `{version, size:u32 LE, 0xBE, 0xEF, chk, payload}`. Every field is
//! fixed width and little-endian, so the encoded length depends only on the
//! structure definitions, never on the values. The checksum is a whole-image
//! XOR fold computed with the stored `chk` byte zeroed; a valid image XORs
//! to zero.

use crate::config::master::MasterConfig;

/// Bumped on any change to the persisted layout; mismatch means reset
pub const EEPROM_CONF_VERSION: u8 = 75;

/// Flash reserved for the configuration image, at the top of the part
pub const FLASH_TO_RESERVE_FOR_CONFIG: usize = 0x800;

pub const MAGIC_BE: u8 = 0xBE;
pub const MAGIC_EF: u8 = 0xEF;

const VERSION_OFFSET: usize = 0;
const SIZE_OFFSET: usize = 1;
const MAGIC_BE_OFFSET: usize = 5;
const MAGIC_EF_OFFSET: usize = 6;
const CHK_OFFSET: usize = 7;
pub const HEADER_SIZE: usize = 8;

/// Sequential little-endian writer over a fixed buffer
///
/// Overflow is latched instead of panicking; callers check [`overflowed`]
/// after encoding.
///
/// [`overflowed`]: ImageWriter::overflowed
pub(crate) struct ImageWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    overflowed: bool,
}

impl<'a> ImageWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            overflowed: false,
        }
    }

    fn put(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            self.overflowed = true;
            return;
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }

    pub fn put_u8(&mut self, v: u8) {
        self.put(&[v]);
    }

    pub fn put_i8(&mut self, v: i8) {
        self.put(&[v as u8]);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.put(&v.to_le_bytes());
    }

    pub fn put_i16(&mut self, v: i16) {
        self.put(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.put(&v.to_le_bytes());
    }

    pub fn put_f32(&mut self, v: f32) {
        self.put(&v.to_le_bytes());
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    fn skip_header(&mut self) {
        self.put(&[0; HEADER_SIZE]);
    }
}

/// Sequential little-endian reader
///
/// Reads past the end return zero; the store validates the image length
/// before decoding, so an underrun only happens on a codec bug.
pub(crate) struct ImageReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ImageReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let end = self.pos + N;
        if end > self.buf.len() {
            self.pos = self.buf.len();
            return [0; N];
        }
        let mut out = [0; N];
        out.copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;
        out
    }

    pub fn get_u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    pub fn get_i8(&mut self) -> i8 {
        self.take::<1>()[0] as i8
    }

    pub fn get_u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    pub fn get_i16(&mut self) -> i16 {
        i16::from_le_bytes(self.take())
    }

    pub fn get_u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    pub fn get_f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn skip(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.buf.len());
    }
}

/// XOR fold over `data`
pub(crate) fn calculate_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |chk, &b| chk ^ b)
}

/// Encode a full image into `buf`, returning its length
///
/// `None` when the image does not fit `buf`.
pub(crate) fn encode_image(config: &MasterConfig, buf: &mut [u8]) -> Option<usize> {
    let mut w = ImageWriter::new(buf);
    w.put_u8(EEPROM_CONF_VERSION);
    w.put_u32(0); // size, patched below
    w.put_u8(MAGIC_BE);
    w.put_u8(MAGIC_EF);
    w.put_u8(0); // chk, patched below
    config.write_to(&mut w);

    if w.overflowed() {
        return None;
    }
    let len = w.position();
    buf[SIZE_OFFSET..SIZE_OFFSET + 4].copy_from_slice(&(len as u32).to_le_bytes());
    buf[CHK_OFFSET] = calculate_checksum(&buf[..len]);
    Some(len)
}

/// Decode the payload of an already-validated image
pub(crate) fn decode_image(buf: &[u8]) -> MasterConfig {
    let mut r = ImageReader::new(buf);
    r.skip(HEADER_SIZE);
    MasterConfig::read_from(&mut r)
}

/// The invariant image length, derived from the structure definitions
pub(crate) fn expected_image_len() -> usize {
    let mut scratch = [0u8; FLASH_TO_RESERVE_FOR_CONFIG];
    let mut w = ImageWriter::new(&mut scratch);
    w.skip_header();
    MasterConfig::defaults().write_to(&mut w);
    debug_assert!(!w.overflowed());
    w.position()
}

/// Header, length and checksum validation
pub(crate) fn is_image_valid(buf: &[u8], expected_len: usize) -> bool {
    if buf.len() < HEADER_SIZE || expected_len > buf.len() {
        return false;
    }
    if buf[VERSION_OFFSET] != EEPROM_CONF_VERSION {
        return false;
    }
    let mut size_bytes = [0u8; 4];
    size_bytes.copy_from_slice(&buf[SIZE_OFFSET..SIZE_OFFSET + 4]);
    let size = u32::from_le_bytes(size_bytes) as usize;
    if size != expected_len {
        return false;
    }
    if buf[MAGIC_BE_OFFSET] != MAGIC_BE || buf[MAGIC_EF_OFFSET] != MAGIC_EF {
        return false;
    }
    calculate_checksum(&buf[..size]) == 0
}
