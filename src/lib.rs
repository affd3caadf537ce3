//! 범용 MongoDB 리포지토리 코어
//!
//! 임의의 엔티티 타입에 대해 CRUD, 페이지 조회, 집계, 대량 쓰기, 커서 스트리밍을
//! 제공하는 제네릭 리포지토리와 JSON 변환기, 이들을 구성하는 팩토리를 제공합니다.
//!
//! # Features
//!
//! - **제네릭 리포지토리**: `MongoRepo<T>` 하나로 모든 컬렉션을 다룸
//! - **ID 형식 검증**: 잘못된 ObjectId 는 저장소에 도달하지 않음
//! - **RAII 커서**: 스코프를 벗어나면 서버 커서 자동 해제
//! - **JSON 변환기**: 실패를 `None` 과 길이 제한된 로그로 표현
//! - **교체 가능한 저장소**: MongoDB 또는 인메모리 저장소
//!
//! # MongoDB 버전
//!
//! 대량 쓰기(`update*`, `write_in_bulk`, `delete_all_by_ids` 등)는 MongoDB 8.0 이상에서
//! 클라이언트 레벨 `bulkWrite` 한 번으로 실행됩니다. 그보다 오래된 서버에서는
//! 연결 시 확인한 wire 버전에 따라 컬렉션 단위 연산으로 나누어 실행합니다.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Factories    │ ← 명시적 구성 (전역 상태 없음)
//! └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────┐
//! │  Repositories   │ ──▶ │  Converter   │
//! └─────────────────┘     └──────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  DocumentStore  │ ← MongoStore / InMemoryStore
//! └─────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mongo_repo_core::db::InMemoryStore;
//! use mongo_repo_core::factories::RepositoryFactory;
//!
//! let factory = RepositoryFactory::new(Arc::new(InMemoryStore::new()));
//! let players = factory.repository::<Player>("players")?;
//!
//! let saved = players.save(Player::new("Kim")).await?;
//! assert_eq!(players.count().await?, 1);
//! ```

pub mod core;
pub mod config;
pub mod db;
pub mod domain;
pub mod factories;
pub mod repositories;
pub mod services;
pub mod utils;
