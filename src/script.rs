use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::op::Operation;

pub const MAGIC: &[u8; 8] = b"OTSYNC01";
pub const FORMAT_VERSION: u32 = 1;

/// Serialized form of a diffed edit: the ordered operations plus enough
/// context to refuse a stale or corrupted application.
///
/// `base_hash` is the CRC32 of the content the operations were computed
/// against; `new_blake3` verifies the result after applying them.
#[derive(Debug, Serialize, Deserialize)]
pub struct EditScript {
    pub version: u32,
    pub path: String,
    pub base_hash: u32,
    pub ops: Vec<Operation>,
    pub new_blake3: [u8; 32],
}

impl EditScript {
    pub fn new(path: String, base_hash: u32, ops: Vec<Operation>, new_content: &[u8]) -> Self {
        Self {
            version: FORMAT_VERSION,
            path,
            base_hash,
            ops,
            new_blake3: *blake3::hash(new_content).as_bytes(),
        }
    }

    /// Magic header + zstd-compressed bincode body.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let encoded = bincode::serialize(self).context("Failed to serialize edit script")?;
        let compressed =
            zstd::bulk::compress(&encoded, 3).context("Failed to compress edit script")?;
        let mut out = Vec::with_capacity(MAGIC.len() + compressed.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() < MAGIC.len() || &raw[..MAGIC.len()] != MAGIC {
            bail!("Invalid edit script: missing magic header");
        }
        let decoder = zstd::Decoder::new(&raw[MAGIC.len()..])
            .context("Failed to create zstd decoder")?;
        let script: EditScript =
            bincode::deserialize_from(decoder).context("Failed to deserialize edit script")?;
        if script.version != FORMAT_VERSION {
            bail!(
                "Unsupported edit script version: {} (expected {})",
                script.version,
                FORMAT_VERSION
            );
        }
        for op in &script.ops {
            op.validate()
                .with_context(|| format!("Invalid operation in edit script for {}", script.path))?;
        }
        Ok(script)
    }

    /// True when `content` matches the post-apply hash.
    pub fn verifies(&self, content: &[u8]) -> bool {
        blake3::hash(content) == blake3::Hash::from_bytes(self.new_blake3)
    }
}
