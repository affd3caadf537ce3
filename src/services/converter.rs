//! # 데이터 변환 서비스
//!
//! 원시 데이터(JSON 문자열 등)를 타입이 있는 값으로 변환합니다.
//! 변환 실패는 에러가 아니라 `None` 으로 표현되며, 원인은 로그로만 남깁니다.
//!
//! ```rust,ignore
//! use mongo_repo_core::services::converter::{Converter, JsonConverter};
//!
//! let converter = JsonConverter::new();
//! let player: Option<Player> = converter.convert(r#"{"name":"Kim","score":30}"#);
//! ```

use log::error;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::utils::string_utils::truncate_chars;

/// 로그에 남기는 입력 원문의 기본 최대 길이 (문자 수)
pub const DEFAULT_EXCERPT_LIMIT: usize = 128;

/// `R` 타입의 원시 데이터를 임의의 타입으로 변환하는 계약
pub trait Converter<R> {
    /// 변환에 성공하면 `Some`, 입력이 잘못되었으면 `None`
    ///
    /// 구현체는 잘못된 입력에 대해 패닉하거나 에러를 반환해서는 안 됩니다.
    fn convert<T: DeserializeOwned>(&self, data: R) -> Option<T>;
}

/// `serde_json` 기반 JSON 문자열 변환기
///
/// 상태가 없으므로 여러 스레드에서 공유해도 안전합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonConverter {
    excerpt_limit: usize,
}

impl Default for JsonConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonConverter {
    pub fn new() -> Self {
        Self { excerpt_limit: DEFAULT_EXCERPT_LIMIT }
    }

    /// 실패 로그에 남길 입력 원문의 최대 문자 수를 지정합니다.
    pub fn with_excerpt_limit(mut self, limit: usize) -> Self {
        self.excerpt_limit = limit;
        self
    }

    pub fn excerpt_limit(&self) -> usize {
        self.excerpt_limit
    }

    /// 이미 파싱된 JSON 값을 변환합니다. 실패 처리 규칙은 [`Converter::convert`] 와 같습니다.
    pub fn convert_value<T: DeserializeOwned>(&self, value: serde_json::Value) -> Option<T> {
        match serde_json::from_value(value.clone()) {
            Ok(converted) => Some(converted),
            Err(e) => {
                self.report(&value.to_string(), &e);
                None
            }
        }
    }

    /// 로그에 남길 입력 원문 일부
    fn excerpt<'a>(&self, raw: &'a str) -> &'a str {
        truncate_chars(raw, self.excerpt_limit)
    }

    fn report(&self, raw: &str, e: &serde_json::Error) {
        match e.classify() {
            Category::Syntax | Category::Data | Category::Eof => {
                error!("Invalid JSON: {}", self.excerpt(raw));
            }
            Category::Io => {
                error!("JSON conversion failed: {}", e);
            }
        }
    }
}

impl<'a> Converter<&'a str> for JsonConverter {
    fn convert<T: DeserializeOwned>(&self, data: &'a str) -> Option<T> {
        match serde_json::from_str(data) {
            Ok(converted) => Some(converted),
            Err(e) => {
                self.report(data, &e);
                None
            }
        }
    }
}
