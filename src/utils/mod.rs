//! 공통 유틸리티 함수 모듈
//!
//! 크레이트 전체에서 사용되는 공통 유틸리티 함수들을 제공합니다.
//!
//! # Modules
//!
//! - [`string_utils`] - 문자열 검증, 로그용 길이 제한
//! - [`logging`] - `env_logger` 초기화

pub mod string_utils;
pub mod logging;
