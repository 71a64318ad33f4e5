//! 哈希门面：任意可序列化对象图的稳定字符串摘要。
//!
//! 摘要对编解码器的字节形态取 SHA-256，因此同一值在同一版本下跨进程
//! 稳定，可用于跨 rank 的一致性自检或配置指纹。

use crate::codec;
use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// 计算对象的十六进制 SHA-256 摘要。
pub fn hash_object<T: Serialize>(value: &T) -> Result<String> {
    let bytes = codec::encode(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
