use crate::config::{ApiConfig, Platform};
use crate::error::FetchError;
use crate::model::{
    RoomStatus, SessionRecord, StatRecord, SuperChatEntry, dedup_by_anchor_room, field_list,
    list_or_field, parse_records,
};
use crate::period::MonthCode;
use serde_json::Value;

// Thin client over the gift statistics API. One instance is shared by every
// request; it holds no per-request state.
#[derive(Debug, Clone)]
pub struct StatsClient {
    http: reqwest::Client,
    api: ApiConfig,
}

impl StatsClient {
    pub fn new(api: &ApiConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(api.timeout()).build()?;
        Ok(Self {
            http,
            api: api.clone(),
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        tracing::debug!(url, ?query, "GET");
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    pub async fn fetch_by_month(
        &self,
        platform: Platform,
        month: MonthCode,
    ) -> Result<Vec<StatRecord>, FetchError> {
        let url = format!("{}/by_month", self.api.base(platform));
        let code = month.code();
        let payload = self.get_json(&url, &[("month", &code)]).await?;
        Ok(parse_records(list_or_field(payload, "data")))
    }

    pub async fn fetch_rooms(&self, platform: Platform) -> Result<Vec<RoomStatus>, FetchError> {
        let payload = self.get_json(self.api.base(platform), &[]).await?;
        Ok(parse_records(list_or_field(payload, "data")))
    }

    pub async fn fetch_sessions(
        &self,
        platform: Platform,
        room_id: &str,
        month: MonthCode,
    ) -> Result<Vec<SessionRecord>, FetchError> {
        let url = format!("{}/live_sessions", self.api.base(platform));
        let code = month.code();
        let payload = self
            .get_json(&url, &[("room_id", room_id), ("month", &code)])
            .await?;
        Ok(parse_records(field_list(payload, "sessions")))
    }

    pub async fn fetch_super_chats(
        &self,
        platform: Platform,
        room_id: &str,
        month: MonthCode,
    ) -> Result<Vec<SuperChatEntry>, FetchError> {
        let url = format!("{}/sc", self.api.base(platform));
        let code = month.code();
        let payload = self
            .get_json(&url, &[("room_id", room_id), ("month", &code)])
            .await?;
        Ok(parse_records(list_or_field(payload, "list")))
    }

    /// Finds the first room whose anchor name contains `keyword`, trying VR
    /// before PSP. A platform that fails to answer is logged and skipped.
    pub async fn locate_room(&self, keyword: &str) -> Option<(Platform, RoomStatus)> {
        for platform in Platform::ALL {
            match self.fetch_rooms(platform).await {
                Ok(rooms) => {
                    if let Some(room) = rooms.into_iter().find(|r| r.matches(keyword)) {
                        return Some((platform, room));
                    }
                }
                Err(err) => {
                    tracing::warn!(%platform, error = %err, "room lookup failed");
                }
            }
        }
        None
    }

    // Both platforms concurrently; a failing platform contributes nothing.
    pub async fn fetch_all_by_month(&self, month: MonthCode) -> Vec<StatRecord> {
        let (vr, psp) = tokio::join!(
            self.fetch_by_month(Platform::Vr, month),
            self.fetch_by_month(Platform::Psp, month)
        );
        let mut merged = Vec::new();
        for (platform, result) in [(Platform::Vr, vr), (Platform::Psp, psp)] {
            match result {
                Ok(records) => merged.extend(records),
                Err(err) => tracing::warn!(%platform, error = %err, "monthly fetch failed"),
            }
        }
        dedup_by_anchor_room(merged)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::serve;
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    type Params = Query<HashMap<String, String>>;

    fn api(base: &str) -> ApiConfig {
        ApiConfig {
            vr_base: format!("{base}/vr/gift"),
            psp_base: format!("{base}/psp/gift"),
            timeout_secs: 2.0,
        }
    }

    fn month(code: &str) -> MonthCode {
        crate::period::normalize_month(code).unwrap()
    }

    #[tokio::test]
    async fn by_month_sends_code_and_parses_list() {
        let router = Router::new().route(
            "/vr/gift/by_month",
            get(|Query(params): Params| async move {
                Json(json!([
                    {"anchor_name": params.get("month").cloned().unwrap_or_default(), "gift": 1},
                    "junk"
                ]))
            }),
        );
        let client = StatsClient::new(&api(&serve(router).await)).unwrap();
        let records = client
            .fetch_by_month(Platform::Vr, month("2025-09"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].anchor_name, "202509");
    }

    #[tokio::test]
    async fn wrapped_and_wrong_shapes() {
        let router = Router::new()
            .route(
                "/vr/gift/by_month",
                get(|| async { Json(json!({"data": [{"anchor_name": "A"}]})) }),
            )
            .route(
                "/psp/gift/by_month",
                get(|| async { Json(json!({"unexpected": true})) }),
            )
            .route(
                "/vr/gift/live_sessions",
                get(|| async { Json(json!([{"start_time": "x"}])) }),
            )
            .route(
                "/vr/gift/sc",
                get(|Query(params): Params| async move {
                    Json(json!({"list": [{"uname": params.get("room_id").cloned().unwrap_or_default()}]}))
                }),
            );
        let client = StatsClient::new(&api(&serve(router).await)).unwrap();
        let m = month("202509");
        assert_eq!(client.fetch_by_month(Platform::Vr, m).await.unwrap().len(), 1);
        assert!(client.fetch_by_month(Platform::Psp, m).await.unwrap().is_empty());
        // Sessions must come wrapped; a bare list is no data.
        assert!(client.fetch_sessions(Platform::Vr, "7", m).await.unwrap().is_empty());
        let chats = client.fetch_super_chats(Platform::Vr, "7", m).await.unwrap();
        assert_eq!(chats[0].uname, "7");
    }

    #[tokio::test]
    async fn http_errors_and_bad_json_are_fetch_errors() {
        let router = Router::new()
            .route(
                "/vr/gift",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route("/psp/gift", get(|| async { "not json" }));
        let client = StatsClient::new(&api(&serve(router).await)).unwrap();
        match client.fetch_rooms(Platform::Vr).await {
            Err(FetchError::Status { status, url }) => {
                assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
                assert!(url.ends_with("/vr/gift"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            client.fetch_rooms(Platform::Psp).await,
            Err(FetchError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let router = Router::new().route(
            "/vr/gift",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                Json(json!([]))
            }),
        );
        let base = serve(router).await;
        let client = StatsClient::new(&ApiConfig {
            timeout_secs: 0.2,
            ..api(&base)
        })
        .unwrap();
        assert!(matches!(
            client.fetch_rooms(Platform::Vr).await,
            Err(FetchError::Http(_))
        ));
    }

    #[tokio::test]
    async fn locate_room_skips_failing_platform() {
        let router = Router::new()
            .route("/vr/gift", get(|| async { StatusCode::BAD_GATEWAY }))
            .route(
                "/psp/gift",
                get(|| async {
                    Json(json!({"data": [
                        {"anchor_name": "小明同学", "room_id": 42, "status": 1}
                    ]}))
                }),
            );
        let client = StatsClient::new(&api(&serve(router).await)).unwrap();
        let (platform, room) = client.locate_room("小明").await.unwrap();
        assert_eq!(platform, Platform::Psp);
        assert_eq!(room.room_id, "42");
        assert!(client.locate_room("nobody").await.is_none());
    }

    #[tokio::test]
    async fn fetch_all_merges_and_dedups() {
        let router = Router::new()
            .route(
                "/vr/gift/by_month",
                get(|| async {
                    Json(json!([
                        {"anchor_name": "A", "room_id": 1},
                        {"anchor_name": "B", "room_id": 2}
                    ]))
                }),
            )
            .route(
                "/psp/gift/by_month",
                get(|| async {
                    Json(json!([
                        {"anchor_name": "A", "room_id": 1},
                        {"anchor_name": "C", "room_id": 3}
                    ]))
                }),
            );
        let client = StatsClient::new(&api(&serve(router).await)).unwrap();
        let merged = client.fetch_all_by_month(month("202509")).await;
        let names: Vec<_> = merged.iter().map(|r| r.anchor_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn fetch_all_tolerates_one_platform_down() {
        let router = Router::new().route(
            "/psp/gift/by_month",
            get(|| async { Json(json!([{"anchor_name": "P"}])) }),
        );
        let client = StatsClient::new(&api(&serve(router).await)).unwrap();
        let merged = client.fetch_all_by_month(month("202509")).await;
        assert_eq!(merged.len(), 1);
    }
}
