use encoding_rs::{Encoding, BIG5, GBK, UTF_8};
use log::{debug, info, warn};
use regex::Regex;

use crate::error::ReaderError;

/// 乱码字符占比阈值
const CORRUPT_RATIO_LIMIT: f64 = 0.01;
/// 汉字占比阈值
const HAN_RATIO_LIMIT: f64 = 0.1;
/// 汉字较少时允许的乱码字符数
const CORRUPT_COUNT_LIMIT: usize = 10;

/// 文本解码器
///
/// 把字节解码为字符串；无法解码时返回 None
pub trait TextDecoder: Send + Sync {
    /// 编码名称
    fn name(&self) -> &str;

    /// 解码字节
    fn decode(&self, bytes: &[u8]) -> Option<String>;
}

/// 基于 encoding_rs 的解码器
pub struct EncodingRsDecoder {
    encoding: &'static Encoding,
}

impl EncodingRsDecoder {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self { encoding }
    }
}

impl TextDecoder for EncodingRsDecoder {
    fn name(&self) -> &str {
        self.encoding.name()
    }

    fn decode(&self, bytes: &[u8]) -> Option<String> {
        // 优先识别 BOM (Byte Order Mark)，UTF-16 文件也能正确读取
        let (text, _encoding_used, had_errors) = self.encoding.decode(bytes);
        if had_errors {
            debug!("{} 解码时出现无法映射的字节", self.encoding.name());
        }
        Some(text.into_owned())
    }
}

/// 乱码检测统计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStats {
    /// 总字符数
    pub length: usize,
    /// 可疑字符数：替换符/BOM、连续三个以上的 "?"、非空白控制字符
    pub corrupt_count: usize,
    /// 汉字（CJK 统一表意文字）占比
    pub han_ratio: f64,
}

impl TextStats {
    /// 统计文本特征
    pub fn measure(text: &str) -> Self {
        let mut length = 0;
        let mut han = 0;
        let mut corrupt_count = 0;
        let mut question_run = 0;

        for c in text.chars() {
            length += 1;

            if c == '?' {
                question_run += 1;
                // 每段连续 "?" 只计一次
                if question_run == 3 {
                    corrupt_count += 1;
                }
                continue;
            }
            question_run = 0;

            if c == '\u{FFFD}' || c == '\u{FEFF}' {
                corrupt_count += 1;
            } else if c.is_control() && !c.is_whitespace() {
                corrupt_count += 1;
            } else if is_han(c) {
                han += 1;
            }
        }

        let han_ratio = if length == 0 {
            0.0
        } else {
            han as f64 / length as f64
        };

        Self {
            length,
            corrupt_count,
            han_ratio,
        }
    }

    /// 可疑字符占比
    pub fn corrupt_ratio(&self) -> f64 {
        if self.length == 0 {
            0.0
        } else {
            self.corrupt_count as f64 / self.length as f64
        }
    }

    /// 是否判定为乱码
    pub fn looks_corrupted(&self) -> bool {
        self.corrupt_ratio() > CORRUPT_RATIO_LIMIT
            || (self.han_ratio < HAN_RATIO_LIMIT && self.corrupt_count > CORRUPT_COUNT_LIMIT)
    }
}

fn is_han(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// 检测文本是否像乱码
pub fn looks_corrupted(text: &str) -> bool {
    TextStats::measure(text).looks_corrupted()
}

/// 解码结果
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedText {
    pub text: String,
    /// 实际采用的编码名称
    pub encoding: String,
    /// 是否采用了备用编码
    pub used_fallback: bool,
}

/// 编码解析器
///
/// 先按 UTF-8 解码，判定为乱码时依次尝试备用的中文编码（GBK、Big5），
/// 全部失败时返回原始的 UTF-8 结果，不会报错
pub struct EncodingResolver {
    primary: Box<dyn TextDecoder>,
    fallbacks: Vec<Box<dyn TextDecoder>>,
    chapter_hint: Regex,
}

impl EncodingResolver {
    /// 创建默认解析器：UTF-8，备用 GBK（解码器兼容 GB18030）与 Big5
    pub fn new() -> Self {
        let fallbacks: Vec<Box<dyn TextDecoder>> = vec![
            Box::new(EncodingRsDecoder::new(GBK)),
            Box::new(EncodingRsDecoder::new(BIG5)),
        ];
        Self::with_decoders(Box::new(EncodingRsDecoder::new(UTF_8)), fallbacks)
    }

    /// 使用自定义解码器创建解析器
    pub fn with_decoders(
        primary: Box<dyn TextDecoder>,
        fallbacks: Vec<Box<dyn TextDecoder>>,
    ) -> Self {
        Self {
            primary,
            fallbacks,
            chapter_hint: Regex::new(r"第[零一二三四五六七八九十百千万〇0-9]+[章回]").unwrap(),
        }
    }

    /// 解码字节为文本
    ///
    /// # 参数
    /// - `bytes`: 原始文件字节
    ///
    /// # 返回
    /// 解码结果；纯函数，不会失败
    pub fn resolve(&self, bytes: &[u8]) -> DecodedText {
        let original = self.primary.decode(bytes).unwrap_or_default();
        let stats = TextStats::measure(&original);

        if !stats.looks_corrupted() {
            return DecodedText {
                text: original,
                encoding: self.primary.name().to_string(),
                used_fallback: false,
            };
        }

        info!(
            "{} 解码疑似乱码（可疑字符 {} / {}，汉字占比 {:.3}），尝试备用编码",
            self.primary.name(),
            stats.corrupt_count,
            stats.length,
            stats.han_ratio
        );

        for decoder in &self.fallbacks {
            let Some(candidate) = decoder.decode(bytes) else {
                debug!("{} 无法解码", decoder.name());
                continue;
            };

            if self.is_plausible(&candidate) {
                info!("采用备用编码 {}", decoder.name());
                return DecodedText {
                    text: candidate,
                    encoding: decoder.name().to_string(),
                    used_fallback: true,
                };
            }
            debug!("{} 解码结果未通过校验", decoder.name());
        }

        let failure = ReaderError::DecodeFailure(format!(
            "{} 个备用编码均未通过校验",
            self.fallbacks.len()
        ));
        warn!("{}，保留原始 {} 解码结果", failure, self.primary.name());
        DecodedText {
            text: original,
            encoding: self.primary.name().to_string(),
            used_fallback: false,
        }
    }

    /// 只返回解码文本
    pub fn resolve_text(&self, bytes: &[u8]) -> String {
        self.resolve(bytes).text
    }

    /// 备用编码结果的校验：汉字占比足够，且能找到章节标记
    fn is_plausible(&self, text: &str) -> bool {
        TextStats::measure(text).han_ratio > HAN_RATIO_LIMIT && self.chapter_hint.is_match(text)
    }
}

impl Default for EncodingResolver {
    fn default() -> Self {
        Self::new()
    }
}
