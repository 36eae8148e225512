use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::rank_hits;
use crate::{Error, ProductMetadata, Result, SearchHit, StoreStats, Vector, VectorStore};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `VectorStore` backed by a managed vector database over a small JSON
/// contract: `PUT/GET/DELETE /collections/{name}/points/{id}`,
/// `POST /collections/{name}/points/query`, `GET /collections/{name}/stats`.
///
/// Transport and server failures surface as retryable backend errors;
/// 404 maps to absent / no-op, matching the local backend.
pub struct RemoteVectorStore {
    http: Client,
    base_url: String,
    collection: String,
    dimension: usize,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vector: &'a [f32],
    metadata: &'a ProductMetadata,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    min_score: f32,
}

#[derive(Deserialize)]
struct QueryResponse {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct FetchResponse {
    vector: Vec<f32>,
}

fn transport_err(e: reqwest::Error) -> Error {
    Error::Backend(e.to_string())
}

impl RemoteVectorStore {
    pub fn connect(base_url: &str, collection: &str, dimension: usize) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport_err)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            dimension,
        })
    }

    fn point_url(&self, product_id: &str) -> String {
        format!(
            "{}/collections/{}/points/{}",
            self.base_url, self.collection, product_id
        )
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}/{}", self.base_url, self.collection, suffix)
    }

    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::Backend(format!(
                "remote store returned {}",
                status
            )))
        }
    }
}

impl VectorStore for RemoteVectorStore {
    fn upsert(&self, product_id: &str, vector: Vector, metadata: ProductMetadata) -> Result<()> {
        if vector.dim() != self.dimension {
            return Err(Error::InvalidDimension {
                expected: self.dimension,
                actual: vector.dim(),
            });
        }
        let body = UpsertRequest {
            vector: vector.as_slice(),
            metadata: &metadata,
        };
        let response = self
            .http
            .put(self.point_url(product_id))
            .json(&body)
            .send()
            .map_err(transport_err)?;
        Self::check(response)?;
        debug!(product_id, collection = %self.collection, "remote upsert");
        Ok(())
    }

    fn query(&self, query: &Vector, limit: usize, min_score: f32) -> Result<Vec<SearchHit>> {
        let body = QueryRequest {
            vector: query.as_slice(),
            limit,
            min_score,
        };
        let response = self
            .http
            .post(self.collection_url("points/query"))
            .json(&body)
            .send()
            .map_err(transport_err)?;
        let parsed: QueryResponse = Self::check(response)?.json().map_err(transport_err)?;

        // Re-rank locally: the threshold and tie-break contract holds even
        // when the remote side is sloppy about either.
        let mut hits: Vec<SearchHit> = parsed
            .hits
            .into_iter()
            .filter(|hit| hit.score >= min_score)
            .collect();
        rank_hits(&mut hits, limit);
        Ok(hits)
    }

    fn fetch(&self, product_id: &str) -> Result<Option<Vector>> {
        let response = self
            .http
            .get(self.point_url(product_id))
            .send()
            .map_err(transport_err)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let parsed: FetchResponse = Self::check(response)?.json().map_err(transport_err)?;
        Ok(Some(Vector::new(parsed.vector)))
    }

    fn delete(&self, product_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.point_url(product_id))
            .send()
            .map_err(transport_err)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response)?;
        Ok(())
    }

    fn stats(&self) -> Option<StoreStats> {
        let response = self.http.get(self.collection_url("stats")).send().ok()?;
        response.error_for_status().ok()?.json().ok()
    }
}
