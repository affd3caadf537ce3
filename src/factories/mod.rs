//! # Factories
//!
//! 변환기와 리포지토리를 생성하는 팩토리입니다. 애플리케이션 시작 시 한 번
//! 구성해서 필요한 곳에 명시적으로 전달합니다. 전역 싱글톤은 사용하지 않습니다.
//!
//! ```rust,ignore
//! use mongo_repo_core::config::{load_env_file, MongoConfig};
//! use mongo_repo_core::factories::RepositoryFactory;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     load_env_file();
//!     mongo_repo_core::utils::logging::init_logging();
//!
//!     let factory = RepositoryFactory::connect(&MongoConfig::from_env()).await?;
//!     let players = factory.repository::<Player>("players")?;
//!     let converter = factory.converter();
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use log::info;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::MongoConfig;
use crate::core::errors::AppResult;
use crate::db::{Database, DocumentStore, MongoStore};
use crate::domain::entities::Identifiable;
use crate::repositories::MongoRepo;
use crate::services::converter::JsonConverter;
use crate::utils::string_utils::validate_required_string;

/// 변환기 팩토리
pub struct ConverterFactory;

impl ConverterFactory {
    /// 기본 설정의 JSON 변환기
    pub fn json_converter() -> Arc<JsonConverter> {
        Arc::new(JsonConverter::new())
    }
}

/// 하나의 저장소 핸들을 공유하는 리포지토리 팩토리
#[derive(Clone)]
pub struct RepositoryFactory {
    store: Arc<dyn DocumentStore>,
    converter: Arc<JsonConverter>,
}

impl RepositoryFactory {
    /// 이미 구성된 저장소로 팩토리를 생성합니다.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            converter: ConverterFactory::json_converter(),
        }
    }

    /// MongoDB 에 연결하고 그 연결을 공유하는 팩토리를 생성합니다.
    pub async fn connect(config: &MongoConfig) -> AppResult<Self> {
        let database = Database::connect(config).await?;
        info!("🏭 RepositoryFactory ready: {}", database.database_name());
        Ok(Self::new(Arc::new(MongoStore::new(database))))
    }

    /// 컬렉션에 바인딩된 리포지토리를 생성합니다.
    ///
    /// 컬렉션 이름은 앞뒤 공백을 제거해 사용하며, 비어 있으면 `ValidationError` 입니다.
    pub fn repository<T>(&self, collection: &str) -> AppResult<MongoRepo<T>>
    where
        T: Identifiable + Serialize + DeserializeOwned + Send + Sync,
    {
        let collection = validate_required_string(collection, "collection")?;
        Ok(MongoRepo::new(Arc::clone(&self.store), collection))
    }

    pub fn converter(&self) -> Arc<JsonConverter> {
        Arc::clone(&self.converter)
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }
}
