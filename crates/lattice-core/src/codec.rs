//! 需要序列化的载荷所使用的字节编解码器。
//!
//! # 设计背景（Why）
//! - "免序列化判定"失败的类型必须先变成字节流才能进底座；线格式是一个
//!   单点决策，集中在本模块，换格式只动这一个文件；
//! - 当前格式为 serde_json：自描述、便于跨语言桥接调试，缺点是体积；
//!   集合语义只依赖"同一数据编码结果确定"这一点，与格式无关。
//!
//! # 契约说明（What）
//! - 编解码失败映射为 `Serialization` 分类的 [`CoreError`] 并保留根因，
//!   对本次集合调用致命。

use crate::error::{CoreError, ErrorCategory, Result, codes};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// 把值编码为字节流。
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        CoreError::new(codes::CODEC_ENCODE, ErrorCategory::Serialization, "payload encoding failed")
            .with_cause(e)
    })
}

/// 从字节流解码出值。
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        CoreError::new(codes::CODEC_DECODE, ErrorCategory::Serialization, "payload decoding failed")
            .with_cause(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let x = vec!["Hello".to_string(), "World".to_string()];
        let bytes = encode(&x).unwrap();
        let y: Vec<String> = decode(&bytes).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn decoding_garbage_is_a_serialization_error() {
        let err = decode::<Vec<String>>(&[0xFF, 0x00]).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Serialization);
    }
}
