//! # Domain Layer Module
//!
//! 리포지토리가 다루는 도메인 어휘를 정의합니다.
//!
//! ```text
//! Domain Layer (이 모듈)
//! ├── entities  - Identifiable 계약과 식별자 헬퍼
//! └── models    - Query / Update / Page / Aggregation / Bulk 명세
//!      │
//!      ▼
//! Repositories (MongoRepo<T>)
//!      │
//!      ▼
//! DB (DocumentStore 구현체)
//! ```
//!
//! 엔티티는 `serde` 의 `Serialize`/`DeserializeOwned` 와 [`entities::Identifiable`]
//! 만 구현하면 됩니다. 컬렉션 이름은 엔티티가 아니라 리포지토리 생성 시 지정합니다.

pub mod entities;
pub mod models;
