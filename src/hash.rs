use std::path::Path;

/// CRC32 content hashing (reflected polynomial 0xEDB88320).
///
/// The checkpoint key for the whole consistency layer: client and server must
/// produce bit-identical hashes for identical content, so the table and
/// polynomial are fixed here rather than configurable.
const POLYNOMIAL: u32 = 0xEDB8_8320;

const CRC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = POLYNOMIAL ^ (crc >> 1);
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Streaming CRC32 over a sequence of chunks.
///
/// `Crc32::new()` begins a sum, `update` feeds a chunk, `finalize` returns
/// the digest. Feeding one buffer in a single chunk or byte-by-byte produces
/// the same result.
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            let index = ((self.state ^ byte as u32) & 0xFF) as usize;
            self.state = (self.state >> 8) ^ CRC_TABLE[index];
        }
    }

    pub fn finalize(self) -> u32 {
        !self.state
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl std::io::Write for Crc32 {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// One-shot CRC32 of a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(data);
    hasher.finalize()
}

/// Stream-hash a file without loading it fully into memory.
/// Uses a 256 KB buffer to reduce syscall overhead vs the default 8 KB.
pub fn hash_file(path: &Path) -> std::io::Result<u32> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::with_capacity(256 * 1024, file);
    let mut hasher = Crc32::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        // Standard CRC32 check value.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
        assert_eq!(crc32(b"a"), 0xE8B7_BE43);
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut hasher = Crc32::new();
        for chunk in data.chunks(5) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finalize(), crc32(data));
    }

    #[test]
    fn test_write_sink_matches_one_shot() {
        use std::io::Write;
        let data = b"pack my box with five dozen liquor jugs";
        let mut hasher = Crc32::new();
        hasher.write_all(data).unwrap();
        hasher.flush().unwrap();
        assert_eq!(hasher.finalize(), crc32(data));
    }

    #[test]
    fn test_different_content_different_hash() {
        assert_ne!(crc32(b"Hello"), crc32(b"World"));
    }

    #[test]
    fn test_hash_file_matches_buffer_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hashed.bin");
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();
        assert_eq!(hash_file(&path).unwrap(), crc32(&data));
    }
}
