//! 画面遷移の調停
//!
//! 1つの `ViewState` をイベントで遷移させ、必要なAI呼び出し・履歴記録を
//! `Effect` として返す。I/Oは行わない（実行は `session` 側）。
//!
//! 発行したリクエストには単調増加の `RequestId` を付け、現在の画面が
//! 待っているIDと一致しない完了通知は画面には反映しない。

use crate::cache::{CachedPayload, ResultCache};
use crate::error::Result as AppResult;
use crate::history::{HistoryItem, SearchKind};
use crate::image_input::{ImageRef, PlantImage};
use plant_explorer_common::{GatewayError, HealthAssessment, InfoPayload};
use std::fmt;

const INFO_ERROR_PREFIX: &str = "Plant Info: ";
const HEALTH_ERROR_PREFIX: &str = "Health Analysis: ";

/// リクエスト識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 1チャネル（情報 or 健康診断）の読み込み状態
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Empty,
    Loading(RequestId),
    Ready(T),
    Failed(String),
}

impl<T> Slot<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Slot::Loading(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Slot::Failed(message) => Some(message),
            _ => None,
        }
    }

    fn is_waiting_for(&self, request: RequestId) -> bool {
        matches!(self, Slot::Loading(id) if *id == request)
    }

    /// 要求が必要か（未取得・失敗後の再試行）
    fn needs_request(&self) -> bool {
        matches!(self, Slot::Empty | Slot::Failed(_))
    }
}

/// 名前が決まった植物1件分のセッション
#[derive(Debug, Clone, PartialEq)]
pub struct PlantSession {
    pub plant_name: String,
    /// テキスト検索の場合は None
    pub image: Option<PlantImage>,
    pub info: Slot<InfoPayload>,
    pub health: Slot<HealthAssessment>,
}

impl PlantSession {
    fn new(plant_name: String, image: Option<PlantImage>) -> Self {
        Self {
            plant_name,
            image,
            info: Slot::Empty,
            health: Slot::Empty,
        }
    }

    pub fn image_ref(&self) -> Option<&ImageRef> {
        self.image.as_ref().map(PlantImage::image_ref)
    }

    fn matches(&self, plant_name: &str, image: Option<&ImageRef>) -> bool {
        self.plant_name == plant_name && self.image_ref() == image
    }
}

/// 実行中のテキスト検索
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSearch {
    pub request: RequestId,
    pub query: String,
}

/// 画面状態
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// 入力待ち
    Idle {
        preview: Option<PlantImage>,
        error: Option<String>,
        search: Option<PendingSearch>,
    },
    /// 写真から植物を特定中
    Identifying { request: RequestId, image: PlantImage },
    /// 情報 / 健康診断の選択
    ActionChoice(PlantSession),
    Info(PlantSession),
    Health(PlantSession),
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState::Idle {
            preview: None,
            error: None,
            search: None,
        }
    }
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Idle { .. } => "idle",
            ViewState::Identifying { .. } => "identifying",
            ViewState::ActionChoice(_) => "action-choice",
            ViewState::Info(_) => "info",
            ViewState::Health(_) => "health",
        }
    }

    pub fn plant_session(&self) -> Option<&PlantSession> {
        match self {
            ViewState::ActionChoice(s) | ViewState::Info(s) | ViewState::Health(s) => Some(s),
            _ => None,
        }
    }

    fn plant_session_mut(&mut self) -> Option<&mut PlantSession> {
        match self {
            ViewState::ActionChoice(s) | ViewState::Info(s) | ViewState::Health(s) => Some(s),
            _ => None,
        }
    }

    /// 表示中の画面が結果待ちか
    pub fn is_loading(&self) -> bool {
        match self {
            ViewState::Idle { search, .. } => search.is_some(),
            ViewState::Identifying { .. } => true,
            ViewState::ActionChoice(_) => false,
            ViewState::Info(s) => s.info.is_loading(),
            ViewState::Health(s) => s.health.is_loading(),
        }
    }
}

/// 入力イベント
#[derive(Debug, Clone)]
pub enum Event {
    /// 写真を選択
    SubmitImage(PlantImage),
    /// 植物名で検索
    SubmitSearch(String),
    /// 特定済みの写真を開き直す（履歴から）
    ReopenImage { plant_name: String, image: PlantImage },
    IdentifyCompleted {
        request: RequestId,
        result: Result<String, GatewayError>,
    },
    ShowInfo,
    ShowHealth,
    /// 選択画面に戻る
    BackToChoice,
    InfoLoaded {
        request: RequestId,
        plant_name: String,
        image: Option<ImageRef>,
        result: Result<InfoPayload, GatewayError>,
    },
    HealthLoaded {
        request: RequestId,
        plant_name: String,
        image: ImageRef,
        result: Result<HealthAssessment, GatewayError>,
    },
    /// 入力画面に戻る
    Clear,
}

impl Event {
    /// 履歴アイテムを開き直すイベント
    ///
    /// 写真の検索は保存済みの画像と名前から選択画面に戻る（再特定はしない）。
    /// 画像が残っていない場合は名前で検索し直す。
    pub fn reopen(item: &HistoryItem) -> AppResult<Event> {
        match (item.search_type, &item.image_url) {
            (SearchKind::Image, Some(image_url)) => Ok(Event::ReopenImage {
                plant_name: item.plant_name.clone(),
                image: PlantImage::from_data_url(image_url.as_str())?,
            }),
            _ => Ok(Event::SubmitSearch(item.plant_name.clone())),
        }
    }
}

/// 実行してほしい副作用
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Identify {
        request: RequestId,
        image: PlantImage,
    },
    FetchInfo {
        request: RequestId,
        plant_name: String,
        image: Option<ImageRef>,
    },
    AssessHealth {
        request: RequestId,
        plant_name: String,
        image: PlantImage,
    },
    RecordHistory {
        plant_name: String,
        kind: SearchKind,
        image: Option<PlantImage>,
    },
}

#[derive(Debug, Default)]
pub struct Coordinator {
    state: ViewState,
    cache: ResultCache,
    next_request: u64,
    preload: bool,
}

impl Coordinator {
    pub fn new(preload: bool) -> Self {
        Self {
            preload,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// イベントを適用し、発生した副作用を返す
    pub fn dispatch(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            Event::SubmitImage(image) => self.submit_image(image, &mut effects),
            Event::SubmitSearch(query) => self.submit_search(query, &mut effects),
            Event::ReopenImage { plant_name, image } => self.enter_choice(plant_name, image, &mut effects),
            Event::IdentifyCompleted { request, result } => self.identify_completed(request, result, &mut effects),
            Event::ShowInfo => self.show_info(&mut effects),
            Event::ShowHealth => self.show_health(&mut effects),
            Event::BackToChoice => self.back_to_choice(),
            Event::InfoLoaded { request, plant_name, image, result } => {
                self.info_loaded(request, plant_name, image, result, &mut effects)
            }
            Event::HealthLoaded { request, plant_name, image, result } => {
                self.health_loaded(request, plant_name, image, result)
            }
            Event::Clear => self.state = ViewState::default(),
        }
        tracing::debug!(state = self.state.name(), effects = effects.len(), "dispatched");
        effects
    }

    fn next_request_id(&mut self) -> RequestId {
        self.next_request += 1;
        RequestId(self.next_request)
    }

    fn submit_image(&mut self, image: PlantImage, effects: &mut Vec<Effect>) {
        let request = self.next_request_id();
        self.state = ViewState::Identifying {
            request,
            image: image.clone(),
        };
        effects.push(Effect::Identify { request, image });
    }

    fn submit_search(&mut self, query: String, effects: &mut Vec<Effect>) {
        let query = query.trim().to_string();
        if query.is_empty() {
            return;
        }

        if let Some(payload) = self.cache.info(&query, None).cloned() {
            tracing::debug!(plant = %query, "plant info cache hit");
            self.finish_search(query, payload, effects);
            return;
        }

        let request = self.next_request_id();
        self.state = ViewState::Idle {
            preview: None,
            error: None,
            search: Some(PendingSearch {
                request,
                query: query.clone(),
            }),
        };
        effects.push(Effect::FetchInfo {
            request,
            plant_name: query,
            image: None,
        });
    }

    fn finish_search(&mut self, query: String, payload: InfoPayload, effects: &mut Vec<Effect>) {
        if payload.info.is_found() {
            effects.push(Effect::RecordHistory {
                plant_name: query.clone(),
                kind: SearchKind::Text,
                image: None,
            });
        }
        let mut session = PlantSession::new(query, None);
        session.info = Slot::Ready(payload);
        self.state = ViewState::Info(session);
    }

    fn identify_completed(&mut self, request: RequestId, result: Result<String, GatewayError>, effects: &mut Vec<Effect>) {
        let image = match &self.state {
            ViewState::Identifying { request: waiting, image } if *waiting == request => image.clone(),
            _ => {
                tracing::debug!(%request, "stale identification ignored");
                return;
            }
        };

        match result {
            Ok(plant_name) => self.enter_choice(plant_name, image, effects),
            Err(e) => {
                tracing::debug!(error = %e, "identification failed");
                self.state = ViewState::Idle {
                    preview: Some(image),
                    error: Some(e.to_string()),
                    search: None,
                };
            }
        }
    }

    /// 名前の決まった写真で選択画面に入る（必要なら先読み）
    fn enter_choice(&mut self, plant_name: String, image: PlantImage, effects: &mut Vec<Effect>) {
        effects.push(Effect::RecordHistory {
            plant_name: plant_name.clone(),
            kind: SearchKind::Image,
            image: Some(image.clone()),
        });

        let mut session = PlantSession::new(plant_name, Some(image));
        self.fill_from_cache(&mut session);
        if self.preload {
            self.ensure_info(&mut session, effects);
            self.ensure_health(&mut session, effects);
        }
        self.state = ViewState::ActionChoice(session);
    }

    fn show_info(&mut self, effects: &mut Vec<Effect>) {
        let Some(mut session) = self.take_plant_session() else {
            tracing::debug!(state = self.state.name(), "show info ignored");
            return;
        };
        self.ensure_info(&mut session, effects);
        self.state = ViewState::Info(session);
    }

    fn show_health(&mut self, effects: &mut Vec<Effect>) {
        let has_image = self.state.plant_session().is_some_and(|s| s.image.is_some());
        if !has_image {
            tracing::info!(state = self.state.name(), "health check needs a photo, ignored");
            return;
        }
        let Some(mut session) = self.take_plant_session() else {
            return;
        };
        self.ensure_health(&mut session, effects);
        self.state = ViewState::Health(session);
    }

    fn back_to_choice(&mut self) {
        match std::mem::take(&mut self.state) {
            ViewState::Info(session) | ViewState::Health(session) => {
                self.state = ViewState::ActionChoice(session);
            }
            other => self.state = other,
        }
    }

    fn info_loaded(
        &mut self,
        request: RequestId,
        plant_name: String,
        image: Option<ImageRef>,
        result: Result<InfoPayload, GatewayError>,
        effects: &mut Vec<Effect>,
    ) {
        if let Ok(payload) = &result {
            self.cache
                .put(&plant_name, image.as_ref(), CachedPayload::Info(payload.clone()));
        }

        // テキスト検索の完了
        if let ViewState::Idle { search: Some(pending), .. } = &self.state {
            if pending.request == request {
                let query = pending.query.clone();
                match result {
                    Ok(payload) => self.finish_search(query, payload, effects),
                    Err(e) => {
                        self.state = ViewState::Idle {
                            preview: None,
                            error: Some(format!("{}{}", INFO_ERROR_PREFIX, e)),
                            search: None,
                        };
                    }
                }
                return;
            }
        }

        match self.state.plant_session_mut() {
            Some(session) if session.info.is_waiting_for(request) && session.matches(&plant_name, image.as_ref()) => {
                session.info = match result {
                    Ok(payload) => Slot::Ready(payload),
                    Err(e) => Slot::Failed(format!("{}{}", INFO_ERROR_PREFIX, e)),
                };
            }
            _ => tracing::debug!(%request, plant = %plant_name, "stale plant info ignored"),
        }
    }

    fn health_loaded(
        &mut self,
        request: RequestId,
        plant_name: String,
        image: ImageRef,
        result: Result<HealthAssessment, GatewayError>,
    ) {
        if let Ok(assessment) = &result {
            self.cache
                .put(&plant_name, Some(&image), CachedPayload::Health(assessment.clone()));
        }

        match self.state.plant_session_mut() {
            Some(session) if session.health.is_waiting_for(request) && session.matches(&plant_name, Some(&image)) => {
                session.health = match result {
                    Ok(assessment) => Slot::Ready(assessment),
                    Err(e) => Slot::Failed(format!("{}{}", HEALTH_ERROR_PREFIX, e)),
                };
            }
            _ => tracing::debug!(%request, plant = %plant_name, "stale health assessment ignored"),
        }
    }

    fn take_plant_session(&mut self) -> Option<PlantSession> {
        match std::mem::take(&mut self.state) {
            ViewState::ActionChoice(s) | ViewState::Info(s) | ViewState::Health(s) => Some(s),
            other => {
                self.state = other;
                None
            }
        }
    }

    fn fill_from_cache(&self, session: &mut PlantSession) {
        let Some(entry) = self.cache.get(&session.plant_name, session.image_ref()) else {
            return;
        };
        if let Some(info) = &entry.info {
            session.info = Slot::Ready(info.clone());
        }
        if let Some(health) = &entry.health {
            session.health = Slot::Ready(health.clone());
        }
    }

    /// 情報が未取得ならキャッシュを見て、なければ要求する
    fn ensure_info(&mut self, session: &mut PlantSession, effects: &mut Vec<Effect>) {
        if !session.info.needs_request() {
            return;
        }
        if let Some(info) = self.cache.info(&session.plant_name, session.image_ref()) {
            session.info = Slot::Ready(info.clone());
            return;
        }

        let request = self.next_request_id();
        session.info = Slot::Loading(request);
        effects.push(Effect::FetchInfo {
            request,
            plant_name: session.plant_name.clone(),
            image: session.image_ref().cloned(),
        });
    }

    /// 健康診断が未取得ならキャッシュを見て、なければ要求する（画像必須）
    fn ensure_health(&mut self, session: &mut PlantSession, effects: &mut Vec<Effect>) {
        if !session.health.needs_request() {
            return;
        }
        let Some(image) = session.image.clone() else {
            return;
        };
        if let Some(health) = self.cache.health(&session.plant_name, Some(image.image_ref())) {
            session.health = Slot::Ready(health.clone());
            return;
        }

        let request = self.next_request_id();
        session.health = Slot::Loading(request);
        effects.push(Effect::AssessHealth {
            request,
            plant_name: session.plant_name.clone(),
            image,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plant_explorer_common::{PlantDetails, PlantInfo};

    fn image(seed: &[u8]) -> PlantImage {
        PlantImage::from_bytes(seed, "image/jpeg").unwrap()
    }

    fn found(name: &str) -> InfoPayload {
        InfoPayload {
            info: PlantInfo::Found(PlantDetails {
                common_name: name.to_string(),
                ..Default::default()
            }),
            attributions: Vec::new(),
        }
    }

    fn cannot_assess() -> HealthAssessment {
        HealthAssessment::CannotAssess {
            reason: "Too dark".to_string(),
        }
    }

    fn identify(coordinator: &mut Coordinator, img: &PlantImage, name: &str) -> Vec<Effect> {
        let effects = coordinator.dispatch(Event::SubmitImage(img.clone()));
        let Some(Effect::Identify { request, .. }) = effects.first().cloned() else {
            panic!("identify effect expected: {:?}", effects);
        };
        coordinator.dispatch(Event::IdentifyCompleted {
            request,
            result: Ok(name.to_string()),
        })
    }

    fn fetch_info_request(effects: &[Effect]) -> Option<RequestId> {
        effects.iter().find_map(|e| match e {
            Effect::FetchInfo { request, .. } => Some(*request),
            _ => None,
        })
    }

    fn health_request(effects: &[Effect]) -> Option<RequestId> {
        effects.iter().find_map(|e| match e {
            Effect::AssessHealth { request, .. } => Some(*request),
            _ => None,
        })
    }

    // =============================================
    // テキスト検索
    // =============================================

    #[test]
    fn test_blank_search_is_ignored() {
        let mut coordinator = Coordinator::new(true);
        assert!(coordinator.dispatch(Event::SubmitSearch("   ".into())).is_empty());
        assert_eq!(coordinator.state(), &ViewState::default());
    }

    #[test]
    fn test_search_success_shows_info_and_records_history() {
        let mut coordinator = Coordinator::new(true);
        let effects = coordinator.dispatch(Event::SubmitSearch(" Fern ".into()));
        let request = fetch_info_request(&effects).unwrap();
        assert!(coordinator.is_loading());

        let effects = coordinator.dispatch(Event::InfoLoaded {
            request,
            plant_name: "Fern".into(),
            image: None,
            result: Ok(found("Fern")),
        });

        assert_eq!(
            effects,
            vec![Effect::RecordHistory {
                plant_name: "Fern".into(),
                kind: SearchKind::Text,
                image: None,
            }]
        );
        let ViewState::Info(session) = coordinator.state() else {
            panic!("info view expected");
        };
        assert_eq!(session.info.ready(), Some(&found("Fern")));
        assert!(!coordinator.is_loading());
    }

    #[test]
    fn test_search_not_found_is_not_recorded() {
        let mut coordinator = Coordinator::new(true);
        let request = fetch_info_request(&coordinator.dispatch(Event::SubmitSearch("Glowroot".into()))).unwrap();
        let effects = coordinator.dispatch(Event::InfoLoaded {
            request,
            plant_name: "Glowroot".into(),
            image: None,
            result: Ok(InfoPayload {
                info: PlantInfo::NotFound {
                    name: "Glowroot".into(),
                    message: "fictional".into(),
                },
                attributions: Vec::new(),
            }),
        });
        assert!(effects.is_empty());
        assert!(matches!(coordinator.state(), ViewState::Info(_)));
    }

    #[test]
    fn test_search_failure_returns_to_idle_with_error() {
        let mut coordinator = Coordinator::new(true);
        let request = fetch_info_request(&coordinator.dispatch(Event::SubmitSearch("Rose".into()))).unwrap();
        coordinator.dispatch(Event::InfoLoaded {
            request,
            plant_name: "Rose".into(),
            image: None,
            result: Err(GatewayError::MissingCredential),
        });
        let ViewState::Idle { error, search, .. } = coordinator.state() else {
            panic!("idle expected");
        };
        assert_eq!(error.as_deref(), Some("Plant Info: API Key not configured."));
        assert!(search.is_none());
    }

    #[test]
    fn test_repeated_search_uses_cache() {
        let mut coordinator = Coordinator::new(true);
        let request = fetch_info_request(&coordinator.dispatch(Event::SubmitSearch("Rose".into()))).unwrap();
        coordinator.dispatch(Event::InfoLoaded {
            request,
            plant_name: "Rose".into(),
            image: None,
            result: Ok(found("Rose")),
        });
        coordinator.dispatch(Event::Clear);

        let effects = coordinator.dispatch(Event::SubmitSearch("rose".into()));
        assert!(fetch_info_request(&effects).is_none());
        assert!(matches!(coordinator.state(), ViewState::Info(_)));
    }

    #[test]
    fn test_text_session_cannot_show_health() {
        let mut coordinator = Coordinator::new(true);
        let request = fetch_info_request(&coordinator.dispatch(Event::SubmitSearch("Rose".into()))).unwrap();
        coordinator.dispatch(Event::InfoLoaded {
            request,
            plant_name: "Rose".into(),
            image: None,
            result: Ok(found("Rose")),
        });
        assert!(coordinator.dispatch(Event::ShowHealth).is_empty());
        assert!(matches!(coordinator.state(), ViewState::Info(_)));
    }

    // =============================================
    // 画像から特定
    // =============================================

    #[test]
    fn test_identify_success_preloads_both_channels() {
        let mut coordinator = Coordinator::new(true);
        let img = image(b"pothos");
        let effects = identify(&mut coordinator, &img, "Pothos");

        assert!(matches!(&effects[0], Effect::RecordHistory { kind: SearchKind::Image, .. }));
        assert!(fetch_info_request(&effects).is_some());
        assert!(health_request(&effects).is_some());

        let ViewState::ActionChoice(session) = coordinator.state() else {
            panic!("action choice expected");
        };
        assert!(session.info.is_loading());
        assert!(session.health.is_loading());
        assert!(!coordinator.is_loading());
    }

    #[test]
    fn test_identify_without_preload_issues_nothing() {
        let mut coordinator = Coordinator::new(false);
        let effects = identify(&mut coordinator, &image(b"pothos"), "Pothos");
        assert_eq!(effects.len(), 1);

        let effects = coordinator.dispatch(Event::ShowInfo);
        assert!(fetch_info_request(&effects).is_some());
        assert!(coordinator.is_loading());
    }

    #[test]
    fn test_identify_failure_keeps_preview() {
        let mut coordinator = Coordinator::new(true);
        let img = image(b"blurry");
        let Some(Effect::Identify { request, .. }) = coordinator.dispatch(Event::SubmitImage(img.clone())).pop() else {
            panic!("identify effect expected");
        };
        coordinator.dispatch(Event::IdentifyCompleted {
            request,
            result: Err(GatewayError::Unidentified("Could not identify the plant.".into())),
        });

        let ViewState::Idle { preview, error, .. } = coordinator.state() else {
            panic!("idle expected");
        };
        assert_eq!(preview.as_ref(), Some(&img));
        assert_eq!(error.as_deref(), Some("Could not identify the plant."));
    }

    // =============================================
    // 表示切り替え
    // =============================================

    #[test]
    fn test_toggle_does_not_reissue_loading_requests() {
        let mut coordinator = Coordinator::new(true);
        identify(&mut coordinator, &image(b"pothos"), "Pothos");

        assert!(coordinator.dispatch(Event::ShowInfo).is_empty());
        assert!(coordinator.dispatch(Event::ShowHealth).is_empty());
        assert!(coordinator.dispatch(Event::ShowInfo).is_empty());
        assert!(matches!(coordinator.state(), ViewState::Info(_)));
    }

    #[test]
    fn test_health_cannot_assess_is_shown_without_error() {
        let mut coordinator = Coordinator::new(true);
        let img = image(b"dark");
        let request = health_request(&identify(&mut coordinator, &img, "Fern")).unwrap();
        coordinator.dispatch(Event::ShowHealth);

        coordinator.dispatch(Event::HealthLoaded {
            request,
            plant_name: "Fern".into(),
            image: img.image_ref().clone(),
            result: Ok(cannot_assess()),
        });

        let ViewState::Health(session) = coordinator.state() else {
            panic!("health view expected");
        };
        assert_eq!(session.health.ready(), Some(&cannot_assess()));
        assert!(session.health.error().is_none());
    }

    #[test]
    fn test_failure_marks_only_its_channel_and_retry_reissues() {
        let mut coordinator = Coordinator::new(true);
        let img = image(b"pothos");
        let effects = identify(&mut coordinator, &img, "Pothos");
        let info_request = fetch_info_request(&effects).unwrap();
        coordinator.dispatch(Event::ShowInfo);

        coordinator.dispatch(Event::InfoLoaded {
            request: info_request,
            plant_name: "Pothos".into(),
            image: Some(img.image_ref().clone()),
            result: Err(GatewayError::Transport("API error: 503".into())),
        });

        let ViewState::Info(session) = coordinator.state() else {
            panic!("info view expected");
        };
        assert_eq!(session.info.error(), Some("Plant Info: API error: 503"));
        assert!(session.health.is_loading());

        let effects = coordinator.dispatch(Event::ShowInfo);
        assert!(fetch_info_request(&effects).is_some());
    }

    #[test]
    fn test_back_to_choice() {
        let mut coordinator = Coordinator::new(true);
        identify(&mut coordinator, &image(b"pothos"), "Pothos");
        coordinator.dispatch(Event::ShowHealth);
        coordinator.dispatch(Event::BackToChoice);
        assert!(matches!(coordinator.state(), ViewState::ActionChoice(_)));
    }

    // =============================================
    // 履歴から開き直す
    // =============================================

    fn history_item(kind: SearchKind, image_url: Option<&str>) -> HistoryItem {
        HistoryItem {
            id: "h1".into(),
            plant_name: "Pothos".into(),
            search_type: kind,
            timestamp: 0,
            image_url: image_url.map(str::to_string),
            thumbnail: None,
        }
    }

    #[test]
    fn test_reopen_text_item_searches_again() {
        let event = Event::reopen(&history_item(SearchKind::Text, None)).unwrap();
        assert!(matches!(event, Event::SubmitSearch(ref name) if name == "Pothos"));
    }

    #[test]
    fn test_reopen_image_item_without_image_falls_back_to_search() {
        let event = Event::reopen(&history_item(SearchKind::Image, None)).unwrap();
        assert!(matches!(event, Event::SubmitSearch(_)));
    }

    #[test]
    fn test_reopen_image_item_with_broken_image_is_error() {
        assert!(Event::reopen(&history_item(SearchKind::Image, Some("not a data url"))).is_err());
    }

    #[test]
    fn test_reopen_image_skips_identification() {
        let img = image(b"pothos");
        let mut coordinator = Coordinator::new(true);
        let event = Event::reopen(&history_item(SearchKind::Image, Some(img.data_url()))).unwrap();

        let effects = coordinator.dispatch(event);
        assert!(!effects.iter().any(|e| matches!(e, Effect::Identify { .. })));
        assert!(matches!(&effects[0], Effect::RecordHistory { kind: SearchKind::Image, .. }));
        assert!(fetch_info_request(&effects).is_some());
        assert!(health_request(&effects).is_some());

        let ViewState::ActionChoice(session) = coordinator.state() else {
            panic!("action choice expected");
        };
        assert_eq!(session.plant_name, "Pothos");
        assert_eq!(session.image.as_ref(), Some(&img));
    }

    // =============================================
    // 古い応答の抑止
    // =============================================

    #[test]
    fn test_stale_completion_after_clear_is_ignored_but_cached() {
        let mut coordinator = Coordinator::new(true);
        let img = image(b"pothos");
        let request = fetch_info_request(&identify(&mut coordinator, &img, "Pothos")).unwrap();
        coordinator.dispatch(Event::Clear);

        coordinator.dispatch(Event::InfoLoaded {
            request,
            plant_name: "Pothos".into(),
            image: Some(img.image_ref().clone()),
            result: Ok(found("Pothos")),
        });

        assert_eq!(coordinator.state(), &ViewState::default());
        assert!(coordinator.cache().info("Pothos", Some(img.image_ref())).is_some());
    }

    #[test]
    fn test_stale_identification_after_new_image_is_ignored() {
        let mut coordinator = Coordinator::new(true);
        let Some(Effect::Identify { request: first, .. }) = coordinator.dispatch(Event::SubmitImage(image(b"one"))).pop() else {
            panic!("identify effect expected");
        };
        coordinator.dispatch(Event::SubmitImage(image(b"two")));

        let effects = coordinator.dispatch(Event::IdentifyCompleted {
            request: first,
            result: Ok("Rose".into()),
        });
        assert!(effects.is_empty());
        assert!(matches!(coordinator.state(), ViewState::Identifying { .. }));
    }

    #[test]
    fn test_cached_results_fill_new_session_for_same_image() {
        let mut coordinator = Coordinator::new(true);
        let img = image(b"pothos");
        let effects = identify(&mut coordinator, &img, "Pothos");
        coordinator.dispatch(Event::InfoLoaded {
            request: fetch_info_request(&effects).unwrap(),
            plant_name: "Pothos".into(),
            image: Some(img.image_ref().clone()),
            result: Ok(found("Pothos")),
        });
        coordinator.dispatch(Event::HealthLoaded {
            request: health_request(&effects).unwrap(),
            plant_name: "Pothos".into(),
            image: img.image_ref().clone(),
            result: Ok(cannot_assess()),
        });
        coordinator.dispatch(Event::Clear);

        let effects = identify(&mut coordinator, &img, "Pothos");
        assert_eq!(effects.len(), 1, "only the history record is expected: {:?}", effects);
        let session = coordinator.state().plant_session().unwrap();
        assert!(session.info.ready().is_some());
        assert!(session.health.ready().is_some());
    }
}
