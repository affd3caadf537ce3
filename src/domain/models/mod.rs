//! 리포지토리 연산에 전달되는 값 객체들
//!
//! - [`query`] - 필터, 정렬, 업데이트 명세
//! - [`page`] - 페이지 요청과 결과
//! - [`aggregation`] - 집계 파이프라인
//! - [`bulk`] - 대량 쓰기 연산과 결과
//! - [`example`] - 예제 기반 쿼리 probe

pub mod aggregation;
pub mod bulk;
pub mod example;
pub mod page;
pub mod query;

pub use aggregation::Aggregation;
pub use bulk::{BulkOperation, BulkWriteFailure, BulkWriteResult};
pub use example::Example;
pub use page::{Page, PageRequest};
pub use query::{Direction, Query, Sort, Update};
