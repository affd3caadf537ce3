//! 집계 파이프라인 명세
//!
//! 각 단계는 MongoDB 집계 단계 문서 그대로이며, 실행은 전적으로
//! 저장소의 집계 엔진에 위임됩니다.

use mongodb::bson::{doc, Document};

use crate::domain::models::query::Sort;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregation {
    pipeline: Vec<Document>,
}

impl Aggregation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pipeline(pipeline: Vec<Document>) -> Self {
        Self { pipeline }
    }

    /// 무작위 표본 파이프라인 (`$sample`)
    pub fn sample_of(size: usize) -> Self {
        Self::new().sample(size)
    }

    /// 임의의 단계 문서를 추가합니다.
    pub fn stage(mut self, stage: Document) -> Self {
        self.pipeline.push(stage);
        self
    }

    pub fn matching(self, filter: Document) -> Self {
        self.stage(doc! { "$match": filter })
    }

    pub fn sort(self, sort: Sort) -> Self {
        self.stage(doc! { "$sort": sort.to_document() })
    }

    pub fn skip(self, skip: u64) -> Self {
        self.stage(doc! { "$skip": skip as i64 })
    }

    pub fn limit(self, limit: i64) -> Self {
        self.stage(doc! { "$limit": limit })
    }

    pub fn sample(self, size: usize) -> Self {
        self.stage(doc! { "$sample": { "size": size as i64 } })
    }

    pub fn group(self, group: Document) -> Self {
        self.stage(doc! { "$group": group })
    }

    pub fn project(self, projection: Document) -> Self {
        self.stage(doc! { "$project": projection })
    }

    pub fn pipeline(&self) -> &[Document] {
        &self.pipeline
    }

    pub fn into_pipeline(self) -> Vec<Document> {
        self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_pipeline() {
        assert_eq!(
            Aggregation::sample_of(5).into_pipeline(),
            vec![doc! { "$sample": { "size": 5_i64 } }]
        );
    }

    #[test]
    fn test_pipeline_keeps_stage_order() {
        let aggregation = Aggregation::new()
            .matching(doc! { "team": "red" })
            .sort(Sort::desc("score"))
            .limit(3);

        assert_eq!(
            aggregation.pipeline(),
            &[
                doc! { "$match": { "team": "red" } },
                doc! { "$sort": { "score": -1 } },
                doc! { "$limit": 3_i64 },
            ]
        );
    }
}
