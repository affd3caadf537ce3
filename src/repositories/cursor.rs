//! 엔티티 커서
//!
//! 저장소 커서를 소유하고 문서를 하나씩 엔티티로 변환해 돌려줍니다.
//! 커서가 drop 되면 저장소 커서도 함께 해제되므로, 조기 반환이나 `?` 전파로
//! 스코프를 벗어나는 경우에도 별도 정리가 필요 없습니다.
//!
//! ```rust,ignore
//! let mut cursor = repo.stream(Query::matching(doc! { "team": "red" })).await?;
//! while let Some(player) = cursor.next().await {
//!     let player = player?;
//!     if player.score > 100 {
//!         break; // 커서는 여기서 해제됨
//!     }
//! }
//! ```

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use log::debug;
use serde::de::DeserializeOwned;

use crate::core::errors::AppResult;
use crate::db::store::DocumentStream;
use crate::domain::entities::Identifiable;
use crate::repositories::mapping::from_document;

pub struct EntityCursor<T> {
    inner: Option<DocumentStream>,
    collection: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> EntityCursor<T>
where
    T: Identifiable + DeserializeOwned,
{
    pub(crate) fn new(inner: DocumentStream, collection: impl Into<String>) -> Self {
        Self {
            inner: Some(inner),
            collection: collection.into(),
            _entity: PhantomData,
        }
    }

    /// 다음 엔티티. 커서가 소진되었거나 닫혔으면 `None`
    pub async fn next(&mut self) -> Option<AppResult<T>> {
        let item = self.inner.as_mut()?.next().await;
        match item {
            Some(item) => Some(item.and_then(from_document)),
            None => {
                self.release();
                None
            }
        }
    }

    /// 남은 엔티티를 모두 읽습니다. 첫 실패에서 중단합니다.
    pub async fn try_collect_all(mut self) -> AppResult<Vec<T>> {
        let mut entities = Vec::new();
        while let Some(entity) = self.next().await {
            entities.push(entity?);
        }
        Ok(entities)
    }

    /// 커서를 즉시 해제합니다.
    pub fn close(mut self) {
        self.release();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    fn release(&mut self) {
        if self.inner.take().is_some() {
            debug!("cursor released: {}", self.collection);
        }
    }
}

impl<T> Stream for EntityCursor<T>
where
    T: Identifiable + DeserializeOwned,
{
    type Item = AppResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(stream) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match stream.poll_next_unpin(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item.and_then(from_document))),
            Poll::Ready(None) => {
                this.release();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for EntityCursor<T> {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            debug!("cursor dropped before exhaustion: {}", self.collection);
        }
    }
}
