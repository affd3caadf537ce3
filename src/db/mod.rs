//! Database Connection & Store Module
//!
//! MongoDB 연결 관리와 리포지토리가 사용하는 문서 저장소 구현을 담당합니다.
//!
//! # 구성
//!
//! - [`Database`] - MongoDB 클라이언트 연결 래퍼
//! - [`store`] - [`DocumentStore`] trait (리포지토리 ⇄ 저장소 경계)
//! - [`mongo_store`] - MongoDB 기반 [`DocumentStore`] 구현
//! - [`memory_store`] - 프로세스 내 [`DocumentStore`] 구현
//!
//! # 기본 사용법
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mongo_repo_core::config::MongoConfig;
//! use mongo_repo_core::db::{Database, MongoStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let database = Database::connect(&MongoConfig::from_env()).await?;
//!     let store = Arc::new(MongoStore::new(database));
//!     Ok(())
//! }
//! ```

pub mod memory_store;
pub mod mongo_store;
pub mod store;

pub use memory_store::InMemoryStore;
pub use mongo_store::MongoStore;
pub use store::{DocumentStore, DocumentStream};

use log::info;
use mongodb::{bson::doc, options::ClientOptions, Client};

use crate::config::MongoConfig;
use crate::core::errors::AppResult;

/// 클라이언트 레벨 `bulkWrite` 명령을 지원하는 최소 wire 버전 (MongoDB 8.0)
pub const CLIENT_BULK_WRITE_WIRE_VERSION: i32 = 25;

/// 서버 wire 버전으로 클라이언트 레벨 대량 쓰기 지원 여부를 판단합니다.
///
/// 버전을 모르면 모든 서버에서 동작하는 컬렉션 단위 쓰기를 사용하도록 `false` 입니다.
pub fn supports_client_bulk_write(max_wire_version: Option<i32>) -> bool {
    max_wire_version.is_some_and(|version| version >= CLIENT_BULK_WRITE_WIRE_VERSION)
}

/// MongoDB 데이터베이스 연결 래퍼
///
/// 드라이버 `Client` 는 내부적으로 연결 풀을 공유하므로 복제 비용이 낮습니다.
#[derive(Clone, Debug)]
pub struct Database {
    /// MongoDB 클라이언트 인스턴스
    client: Client,
    /// 사용할 데이터베이스 이름
    database_name: String,
    /// `hello` 응답의 `maxWireVersion`. 연결 검증 없이 생성했으면 `None`
    max_wire_version: Option<i32>,
}

impl Database {
    /// 설정에 따라 MongoDB 연결을 생성하고 `hello` 로 연결 상태를 검증합니다.
    ///
    /// 타임아웃 설정은 드라이버 클라이언트 옵션에 그대로 전달됩니다.
    /// 응답의 wire 버전은 대량 쓰기 방식을 고르는 데 사용됩니다.
    ///
    /// ## 사용 예제
    /// ```rust,ignore
    /// let database = Database::connect(&MongoConfig::new("mongodb://localhost:27017", "catalog")).await?;
    /// ```
    pub async fn connect(config: &MongoConfig) -> AppResult<Self> {
        let mut client_options = ClientOptions::parse(&config.uri).await?;

        // 서버 로그와 모니터링에 표시되는 이름
        client_options.app_name = Some(config.app_name.clone());

        if let Some(timeout) = config.connect_timeout {
            client_options.connect_timeout = Some(timeout);
        }
        if let Some(timeout) = config.server_selection_timeout {
            client_options.server_selection_timeout = Some(timeout);
        }

        let client = Client::with_options(client_options)?;

        let hello = client
            .database(&config.database_name)
            .run_command(doc! { "hello": 1 })
            .await?;
        let max_wire_version = hello.get_i32("maxWireVersion").ok();

        info!(
            "✅ MongoDB 연결 성공: {} (wire version {:?})",
            config.database_name, max_wire_version
        );

        let mut database = Self::from_client(client, config.database_name.clone());
        database.max_wire_version = max_wire_version;
        Ok(database)
    }

    /// 이미 구성된 클라이언트로 연결 래퍼를 생성합니다 (연결 검증 없음).
    pub fn from_client(client: Client, database_name: impl Into<String>) -> Self {
        Self {
            client,
            database_name: database_name.into(),
            max_wire_version: None,
        }
    }

    pub fn max_wire_version(&self) -> Option<i32> {
        self.max_wire_version
    }

    /// 서버가 클라이언트 레벨 `bulkWrite` (MongoDB 8.0+) 를 지원하는지 여부
    pub fn supports_client_bulk_write(&self) -> bool {
        supports_client_bulk_write(self.max_wire_version)
    }

    /// MongoDB 데이터베이스 인스턴스를 반환합니다.
    pub fn get_database(&self) -> mongodb::Database {
        self.client.database(&self.database_name)
    }

    /// MongoDB 클라이언트 인스턴스를 반환합니다.
    ///
    /// 클라이언트 레벨 작업(대량 쓰기, 세션 등)에 사용됩니다.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// 데이터베이스 이름을 반환합니다.
    pub fn database_name(&self) -> &str {
        &self.database_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_bulk_write_needs_mongodb_8() {
        assert!(supports_client_bulk_write(Some(25)));
        assert!(supports_client_bulk_write(Some(27)));
        assert!(!supports_client_bulk_write(Some(21)));
        assert!(!supports_client_bulk_write(None));
    }
}
