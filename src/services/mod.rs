//! 서비스 계층 모듈
//!
//! # Modules
//!
//! - [`converter`] - 원시 데이터(JSON) → 타입 변환

pub mod converter;

pub use converter::{Converter, JsonConverter};
