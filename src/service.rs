//! Request boundary: parsed query in, reply out.
//!
//! Every failure is turned into a single text reply here; nothing below this
//! layer knows about reply formatting.

use crate::config::{Config, Platform};
use crate::error::{FetchError, ReportError};
use crate::fetch::StatsClient;
use crate::font::FontRegistry;
use crate::model::RoomStatus;
use crate::period::{MONTH_FORMAT_HINT, MonthCode, month_or_current, parse_anchor_and_month};
use crate::report::revenue_card::{RevenueCard, render_revenue_card};
use crate::report::super_chat::{FORWARD_TITLE, render_super_chats};
use crate::report::{ReportContext, live_list, ranking, sessions};
use chrono::NaiveDateTime;
use std::sync::Arc;

pub const BRAWL_MONTH_HINT: &str = "月份格式不正确，请使用 YYYYMM，例如：202601";
pub const MISSING_ROOM: &str = "该用户缺少房间信息";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Ranking { platform: Platform, args: String },
    Brawl { args: String },
    Live { platform: Platform },
    Sessions { args: String },
    SuperChat { args: String },
    Revenue { args: String },
}

impl Query {
    pub fn command(&self) -> &'static str {
        match self {
            Query::Ranking { .. } => "斗虫",
            Query::Brawl { .. } => "大乱斗",
            Query::Live { .. } => "开播",
            Query::Sessions { .. } => "查直播",
            Query::SuperChat { .. } => "查SC",
            Query::Revenue { .. } => "查流水",
        }
    }

    fn usage(&self) -> String {
        format!("用法：/{} 主播名称 [YYYYMM|YYYY-MM]", self.command())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardNode {
    pub label: String,
    pub image: String,
}

// Ordered pages sent as one merged message by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardBundle {
    pub title: String,
    pub intro: String,
    pub nodes: Vec<ForwardNode>,
}

impl ForwardBundle {
    pub fn from_pages(title: &str, anchor: &str, pages: Vec<String>) -> Self {
        let total = pages.len();
        Self {
            title: title.to_string(),
            intro: format!("{anchor} {title}（共 {total} 页）"),
            nodes: pages
                .into_iter()
                .enumerate()
                .map(|(idx, image)| ForwardNode {
                    label: format!("第 {}/{total} 页", idx + 1),
                    image,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    // Base64 PNG.
    Image(String),
    Forward(ForwardBundle),
}

pub struct Service {
    client: StatsClient,
    fonts: Arc<FontRegistry>,
    config: Config,
}

impl Service {
    pub fn new(config: Config, fonts: Arc<FontRegistry>) -> Result<Self, FetchError> {
        Ok(Self {
            client: StatsClient::new(&config.api)?,
            fonts,
            config,
        })
    }

    pub async fn handle(&self, query: Query, user: u64) -> Reply {
        let now = chrono::Local::now().naive_local();
        self.handle_at(query, user, now).await
    }

    pub async fn handle_at(&self, query: Query, user: u64, now: NaiveDateTime) -> Reply {
        let command = query.command();
        tracing::info!(command, user, ?query, "request");
        match self.run(query, now).await {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    ReportError::Fetch { .. } => tracing::warn!(command, user, error = %err, "request failed"),
                    ReportError::Render(_) => tracing::error!(command, user, error = ?err, "render failed"),
                    _ => tracing::info!(command, user, reason = %err, "request rejected"),
                }
                Reply::Text(err.user_message())
            }
        }
    }

    fn context(&self, now: NaiveDateTime) -> ReportContext<'_> {
        ReportContext {
            fonts: &self.fonts,
            footer: &self.config.render.footer,
            now,
        }
    }

    async fn run(&self, query: Query, now: NaiveDateTime) -> Result<Reply, ReportError> {
        let current = MonthCode::of(now);
        match &query {
            Query::Ranking { platform, args } => {
                let month = month_or_current(args, current)
                    .ok_or_else(|| ReportError::Validation(MONTH_FORMAT_HINT.to_string()))?;
                self.ranking(*platform, month, now).await
            }
            Query::Brawl { args } => {
                let month = month_or_current(args, current)
                    .ok_or_else(|| ReportError::Validation(BRAWL_MONTH_HINT.to_string()))?;
                self.brawl(month, now).await
            }
            Query::Live { platform } => self.live(*platform, now).await,
            Query::Sessions { args } | Query::SuperChat { args } | Query::Revenue { args } => {
                let (keyword, month) = parse_anchor_and_month(args, current);
                if keyword.is_empty() {
                    return Err(ReportError::Validation(query.usage()));
                }
                tracing::debug!(keyword, %month, "anchor query");
                match &query {
                    Query::Sessions { .. } => self.sessions(&keyword, month, current, now).await,
                    Query::SuperChat { .. } => self.super_chats(&keyword, month, now).await,
                    _ => self.revenue(&keyword, month, current, now).await,
                }
            }
        }
    }

    async fn ranking(
        &self,
        platform: Platform,
        month: MonthCode,
        now: NaiveDateTime,
    ) -> Result<Reply, ReportError> {
        let mut records = self
            .client
            .fetch_by_month(platform, month)
            .await
            .map_err(ReportError::fetch("请求数据失败"))?;
        if records.is_empty() {
            return Err(ReportError::NoData(format!("无数据：{month}")));
        }
        let title = self.config.titles.ranking(platform);
        let image = ranking::render_ranking(&self.context(now), title, &mut records, month)?;
        Ok(Reply::Image(image))
    }

    // Unlike the merged revenue lookup, a failing platform aborts the brawl.
    async fn brawl(&self, month: MonthCode, now: NaiveDateTime) -> Result<Reply, ReportError> {
        let (vr, psp) = tokio::try_join!(
            async {
                self.client
                    .fetch_by_month(Platform::Vr, month)
                    .await
                    .map_err(ReportError::fetch("请求 VR 数据失败"))
            },
            async {
                self.client
                    .fetch_by_month(Platform::Psp, month)
                    .await
                    .map_err(ReportError::fetch("请求 PSP 数据失败"))
            },
        )?;
        let mut records = vr;
        records.extend(psp);
        if records.is_empty() {
            return Err(ReportError::NoData(format!("无数据：{month}")));
        }
        let title = &self.config.titles.brawl;
        let image = ranking::render_ranking(&self.context(now), title, &mut records, month)?;
        Ok(Reply::Image(image))
    }

    async fn live(&self, platform: Platform, now: NaiveDateTime) -> Result<Reply, ReportError> {
        let rooms = self
            .client
            .fetch_rooms(platform)
            .await
            .map_err(ReportError::fetch("请求数据失败"))?;
        let title = self.config.titles.live(platform);
        match live_list::render_live_list(&self.context(now), title, rooms)? {
            Some(image) => Ok(Reply::Image(image)),
            None => Ok(Reply::Text(live_list::NOBODY_LIVE.to_string())),
        }
    }

    async fn locate(&self, keyword: &str) -> Result<(Platform, RoomStatus), ReportError> {
        let (platform, room) = self
            .client
            .locate_room(keyword)
            .await
            .ok_or(ReportError::NotFound)?;
        if room.room_id.is_empty() {
            return Err(ReportError::NoData(MISSING_ROOM.to_string()));
        }
        Ok((platform, room))
    }

    fn anchor_name(room: &RoomStatus, keyword: &str) -> String {
        if room.anchor_name.is_empty() {
            keyword.to_string()
        } else {
            room.anchor_name.clone()
        }
    }

    async fn sessions(
        &self,
        keyword: &str,
        month: MonthCode,
        current: MonthCode,
        now: NaiveDateTime,
    ) -> Result<Reply, ReportError> {
        let (platform, room) = self.locate(keyword).await?;
        let records = self
            .client
            .fetch_sessions(platform, &room.room_id, month)
            .await
            .map_err(ReportError::fetch("未能获取直播场次"))?;
        let anchor = Self::anchor_name(&room, keyword);
        let image = sessions::render_sessions(
            &self.context(now),
            &anchor,
            &month.label(current),
            &room.room_id,
            &records,
        )?;
        Ok(Reply::Image(image))
    }

    async fn super_chats(
        &self,
        keyword: &str,
        month: MonthCode,
        now: NaiveDateTime,
    ) -> Result<Reply, ReportError> {
        let (platform, room) = self.locate(keyword).await?;
        let mut entries = self
            .client
            .fetch_super_chats(platform, &room.room_id, month)
            .await
            .map_err(ReportError::fetch("未能获取 SC 记录"))?;
        let anchor = Self::anchor_name(&room, keyword);
        let mut pages = render_super_chats(
            &self.context(now),
            &anchor,
            month,
            &room.room_id,
            &mut entries,
            self.config.render.sc_max_page_height,
        )?;
        if pages.len() > 1 {
            return Ok(Reply::Forward(ForwardBundle::from_pages(
                FORWARD_TITLE,
                &anchor,
                pages,
            )));
        }
        match pages.pop() {
            Some(image) => Ok(Reply::Image(image)),
            None => Err(ReportError::NoData("本月暂无 SC 记录".to_string())),
        }
    }

    async fn revenue(
        &self,
        keyword: &str,
        month: MonthCode,
        current: MonthCode,
        now: NaiveDateTime,
    ) -> Result<Reply, ReportError> {
        let records = self.client.fetch_all_by_month(month).await;
        let record = records
            .iter()
            .find(|r| r.matches(keyword))
            .ok_or(ReportError::NotFound)?;
        let mut card = RevenueCard::from_record(record, month, current);
        if card.anchor.is_empty() {
            card.anchor = keyword.to_string();
        }
        let image = render_revenue_card(&self.context(now), &card)?;
        Ok(Reply::Image(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::fetch::testing::serve;
    use crate::font::testing::system_registry;
    use crate::report::testing::{at, decode};
    use axum::Router;
    use axum::extract::Query as Params;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Json;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    const NOW: &str = "2025-09-15 12:00:00";

    fn service(base: &str) -> Option<Service> {
        let fonts = Arc::new(system_registry()?);
        let config = Config {
            api: ApiConfig {
                vr_base: format!("{base}/vr/gift"),
                psp_base: format!("{base}/psp/gift"),
                timeout_secs: 2.0,
            },
            ..Config::default()
        };
        Some(Service::new(config, fonts).unwrap())
    }

    fn json_route(payload: Value) -> axum::routing::MethodRouter {
        get(move || {
            let payload = payload.clone();
            async move { Json(payload) }
        })
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(text) => text,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn forward_bundle_labels_pages() {
        let bundle = ForwardBundle::from_pages("查SC", "小明", vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(bundle.intro, "小明 查SC（共 3 页）");
        let labels: Vec<_> = bundle.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["第 1/3 页", "第 2/3 页", "第 3/3 页"]);
        assert_eq!(bundle.nodes[2].image, "c");
    }

    #[test]
    fn usage_names_the_command() {
        let query = Query::SuperChat { args: String::new() };
        assert_eq!(query.usage(), "用法：/查SC 主播名称 [YYYYMM|YYYY-MM]");
    }

    #[tokio::test]
    async fn bad_month_and_missing_keyword_are_rejected() {
        let Some(service) = service("http://127.0.0.1:9") else {
            return;
        };
        let now = at(NOW);
        let reply = service
            .handle_at(Query::Ranking { platform: Platform::Vr, args: "2025-13".into() }, 1, now)
            .await;
        assert_eq!(text(reply), MONTH_FORMAT_HINT);
        let reply = service.handle_at(Query::Brawl { args: "soon".into() }, 1, now).await;
        assert_eq!(text(reply), BRAWL_MONTH_HINT);
        let reply = service.handle_at(Query::Revenue { args: " 202509 ".into() }, 1, now).await;
        assert_eq!(text(reply), "用法：/查流水 主播名称 [YYYYMM|YYYY-MM]");
    }

    #[tokio::test]
    async fn ranking_image_and_empty_month() {
        let router = Router::new()
            .route(
                "/vr/gift/by_month",
                json_route(json!([{"anchor_name": "A", "gift": 10}, {"anchor_name": "B", "gift": 20}])),
            )
            .route("/psp/gift/by_month", json_route(json!({"data": []})));
        let Some(service) = service(&serve(router).await) else {
            return;
        };
        let now = at(NOW);
        let reply = service
            .handle_at(Query::Ranking { platform: Platform::Vr, args: String::new() }, 1, now)
            .await;
        match reply {
            Reply::Image(b64) => assert_eq!(decode(&b64).height(), 160 + 60 * 3 + 40),
            other => panic!("unexpected {other:?}"),
        }
        let reply = service
            .handle_at(Query::Ranking { platform: Platform::Psp, args: "2025-08".into() }, 1, now)
            .await;
        assert_eq!(text(reply), "无数据：202508");
    }

    #[tokio::test]
    async fn brawl_aborts_when_one_platform_fails() {
        let router = Router::new()
            .route("/vr/gift/by_month", json_route(json!([{"anchor_name": "A"}])))
            .route("/psp/gift/by_month", get(|| async { StatusCode::BAD_GATEWAY }));
        let Some(service) = service(&serve(router).await) else {
            return;
        };
        let reply = service.handle_at(Query::Brawl { args: String::new() }, 1, at(NOW)).await;
        assert!(text(reply).starts_with("请求 PSP 数据失败："));
    }

    #[tokio::test]
    async fn nobody_live_is_text() {
        let router = Router::new().route(
            "/vr/gift",
            json_route(json!([{"anchor_name": "A", "status": 0}])),
        );
        let Some(service) = service(&serve(router).await) else {
            return;
        };
        let reply = service.handle_at(Query::Live { platform: Platform::Vr }, 1, at(NOW)).await;
        assert_eq!(text(reply), "当前没有主播正在直播。");
    }

    #[tokio::test]
    async fn anchor_lookups() {
        let router = Router::new()
            .route(
                "/vr/gift",
                json_route(json!([
                    {"anchor_name": "小明同学", "room_id": 42, "status": 1},
                    {"anchor_name": "无房间", "status": 0}
                ])),
            )
            .route("/psp/gift", json_route(json!([])))
            .route(
                "/vr/gift/live_sessions",
                get(|Params(params): Params<HashMap<String, String>>| async move {
                    assert_eq!(params.get("room_id").map(String::as_str), Some("42"));
                    Json(json!({"sessions": [
                        {"start_time": "2025-09-01 20:00:00", "end_time": "2025-09-01 21:00:00", "gift": 5}
                    ]}))
                }),
            )
            .route("/vr/gift/sc", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let Some(service) = service(&serve(router).await) else {
            return;
        };
        let now = at(NOW);
        let reply = service.handle_at(Query::Sessions { args: "小明".into() }, 1, now).await;
        match reply {
            Reply::Image(b64) => assert_eq!(decode(&b64).height(), 160 + 60 * 3 + 40),
            other => panic!("unexpected {other:?}"),
        }
        let reply = service.handle_at(Query::Sessions { args: "nobody".into() }, 1, now).await;
        assert_eq!(text(reply), "未找到用户");
        let reply = service.handle_at(Query::SuperChat { args: "无房间".into() }, 1, now).await;
        assert_eq!(text(reply), MISSING_ROOM);
        let reply = service.handle_at(Query::SuperChat { args: "小明 2025-08".into() }, 1, now).await;
        assert!(text(reply).starts_with("未能获取 SC 记录："));
    }

    #[tokio::test]
    async fn long_super_chat_month_becomes_forward_bundle() {
        let entries: Vec<Value> = (0..30)
            .map(|i| json!({"send_time": format!("2025-09-01 10:00:{i:02}"), "uname": "u", "price": 30, "message": "hi"}))
            .collect();
        let router = Router::new()
            .route("/vr/gift", json_route(json!([{"anchor_name": "小明", "room_id": 7}])))
            .route("/vr/gift/sc", json_route(json!({"list": entries})));
        let Some(mut service) = service(&serve(router).await) else {
            return;
        };
        service.config.render.sc_max_page_height = 1_000;
        match service.handle_at(Query::SuperChat { args: "小明".into() }, 1, at(NOW)).await {
            Reply::Forward(bundle) => {
                assert_eq!(bundle.title, "查SC");
                assert_eq!(bundle.nodes.len(), 3);
                assert_eq!(bundle.intro, "小明 查SC（共 3 页）");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn revenue_card_uses_merged_months() {
        let router = Router::new()
            .route("/vr/gift/by_month", get(|| async { StatusCode::BAD_GATEWAY }))
            .route(
                "/psp/gift/by_month",
                json_route(json!([{"anchor_name": "小明", "room_id": 7, "gift": 12.0}])),
            );
        let Some(service) = service(&serve(router).await) else {
            return;
        };
        let now = at(NOW);
        match service.handle_at(Query::Revenue { args: "小明".into() }, 1, now).await {
            Reply::Image(b64) => assert_eq!(decode(&b64).width(), 720),
            other => panic!("unexpected {other:?}"),
        }
        let reply = service.handle_at(Query::Revenue { args: "小红".into() }, 1, now).await;
        assert_eq!(text(reply), "未找到用户");
    }
}
