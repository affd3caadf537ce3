//! # Configuration Module
//!
//! 리포지토리 계층의 설정 관리를 담당하는 모듈입니다.
//! 환경 변수 기반의 설정값들을 구조체로 모아, 프로세스 시작 시점에
//! 한 번 읽어 팩토리에 명시적으로 전달합니다.
//!
//! ## 모듈 구성
//!
//! - [`data_config`] - 실행 환경, MongoDB 연결, `.env` 파일 로딩
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use mongo_repo_core::config::{load_env_file, MongoConfig};
//! use mongo_repo_core::factories::RepositoryFactory;
//!
//! load_env_file();
//! let config = MongoConfig::from_env();
//! let factory = RepositoryFactory::connect(&config).await?;
//! ```
//!
//! ## 환경 변수 설정 가이드
//!
//! ```bash
//! export PROFILE="dev"                       # dev, prod
//! export ENVIRONMENT="development"           # development, test, staging, production
//! export MONGODB_URI="mongodb://localhost:27017"
//! export DATABASE_NAME="catalog"
//! ```

pub mod data_config;

pub use data_config::*;
