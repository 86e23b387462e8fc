//! 压缩文件的封装格式与编解码器接口。
//!
//! 压缩文件内容：`<原文件名 UTF-8> '|' <编解码器输出>`。
//! 文件名中不允许出现分隔符 `|`。

use crate::fs::error::{FsError, Result};

/// 文件名与压缩数据之间的分隔符
pub const DELIMITER: u8 = b'|';

/// 压缩文件的扩展名标记
pub const COMPRESSED_EXT: &str = "lz4";

/// 外部无损压缩器
pub trait Codec: std::fmt::Debug + Send + Sync {
    fn compress(&self, data: &[u8]) -> Vec<u8>;
    fn decompress(&self, data: &[u8]) -> std::result::Result<Vec<u8>, String>;
}

/// LZ4 块格式，前置原始长度
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn compress(&self, data: &[u8]) -> Vec<u8> {
        lz4_flex::compress_prepend_size(data)
    }

    fn decompress(&self, data: &[u8]) -> std::result::Result<Vec<u8>, String> {
        lz4_flex::decompress_size_prepended(data).map_err(|e| e.to_string())
    }
}

/// 压缩结果报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressionReport {
    pub source: String,
    pub target: String,
    pub original_size: u64,
    pub compressed_size: u64,
}

impl CompressionReport {
    pub fn is_smaller(&self) -> bool {
        self.compressed_size < self.original_size
    }
}

/// 解压结果报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressionReport {
    pub source: String,
    pub restored: String,
    pub size: u64,
}

/// 把扩展名替换为压缩标记：`notes.txt` -> `notes.lz4`，无扩展名则追加
pub fn compressed_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    };
    format!("{}.{}", stem, COMPRESSED_EXT)
}

pub fn is_compressed_name(name: &str) -> bool {
    name.len() > COMPRESSED_EXT.len() + 1 && name.ends_with(&format!(".{}", COMPRESSED_EXT))
}

/// 组装压缩文件内容
pub fn frame(original_name: &str, content: &[u8], codec: &dyn Codec) -> Result<Vec<u8>> {
    if original_name.as_bytes().contains(&DELIMITER) {
        return Err(FsError::InvalidName(original_name.to_string()));
    }
    let body = codec.compress(content);
    let mut framed = Vec::with_capacity(original_name.len() + 1 + body.len());
    framed.extend_from_slice(original_name.as_bytes());
    framed.push(DELIMITER);
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// 拆开压缩文件，返回原文件名与解压后的内容
pub fn unframe(framed: &[u8], codec: &dyn Codec) -> Result<(String, Vec<u8>)> {
    let pos = framed
        .iter()
        .position(|&b| b == DELIMITER)
        .ok_or_else(|| FsError::CorruptData("missing name delimiter".into()))?;

    let name = std::str::from_utf8(&framed[..pos])
        .map_err(|e| FsError::CorruptData(format!("original name is not UTF-8: {}", e)))?
        .to_string();
    if name.is_empty() {
        return Err(FsError::CorruptData("empty original name".into()));
    }

    let content = codec
        .decompress(&framed[pos + 1..])
        .map_err(FsError::CorruptData)?;
    Ok((name, content))
}
