//! # Core Module
//!
//! 리포지토리 계층 전반에서 공유하는 핵심 타입을 제공합니다.
//!
//! ## 모듈 구성
//!
//! ### [`errors`] - 통합 에러 처리
//! - **AppError**: 저장소, 매핑, 미지원 연산 에러를 하나로 묶은 열거형
//! - **AppResult**: `Result<T, AppError>` 별칭
//!
//! ## 에러 전파 정책
//!
//! 잘못된 ID 형식이나 미지원 연산처럼 로컬에서 결정 가능한 실패는
//! 네트워크 왕복 없이 즉시 처리합니다. 그 외 저장소 실패는 재시도나
//! 백오프 없이 그대로 호출자에게 전달됩니다.

pub mod errors;

pub use errors::*;
