//! 데이터 액세스 계층을 담당하는 리포지토리 모듈
//!
//! 엔티티 타입마다 구조체를 따로 만들지 않고, 하나의 제네릭 [`MongoRepo<T>`] 를
//! 컬렉션 이름과 함께 생성해 사용합니다.
//!
//! # Modules
//!
//! - [`mongo_repo`] - 범용 CRUD/집계/대량 쓰기 리포지토리
//! - [`cursor`] - RAII 엔티티 커서
//! - [`mapping`] - 엔티티 ⇄ BSON 문서 매핑
//!
//! # Examples
//!
//! ```rust,ignore
//! use mongo_repo_core::factories::RepositoryFactory;
//!
//! let factory = RepositoryFactory::connect(&MongoConfig::from_env()).await?;
//! let players = factory.repository::<Player>("players")?;
//! let top = players.find_all_sorted(Sort::desc("score")).await?;
//! ```

pub mod cursor;
pub mod mapping;
pub mod mongo_repo;

pub use cursor::EntityCursor;
pub use mongo_repo::MongoRepo;
