//! セッション実行
//!
//! `Coordinator` が返した副作用を実行する。AI呼び出しは tokio タスクとして
//! 並行に走らせ、完了イベントをチャネル経由で調停役に戻す。
//! 履歴の記録はその場で待つ。

use crate::coordinator::{Coordinator, Effect, Event, ViewState};
use crate::gateway::{AiGateway, GenerativeModel};
use crate::history::HistoryStore;
use plant_explorer_common::GatewayError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Session<M> {
    coordinator: Coordinator,
    gateway: Arc<AiGateway<M>>,
    history: HistoryStore,
    completions_tx: mpsc::UnboundedSender<Event>,
    completions_rx: mpsc::UnboundedReceiver<Event>,
    in_flight: usize,
}

impl<M: GenerativeModel + 'static> Session<M> {
    pub fn new(coordinator: Coordinator, gateway: Arc<AiGateway<M>>, history: HistoryStore) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            coordinator,
            gateway,
            history,
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &ViewState {
        self.coordinator.state()
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// 実行中のAI呼び出し数
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// イベントを適用して副作用を実行する
    pub async fn submit(&mut self, event: Event) {
        let effects = self.coordinator.dispatch(event);
        for effect in effects {
            self.run(effect).await;
        }
    }

    /// 受信済みの完了イベントを待たずに適用する
    pub async fn pump(&mut self) {
        while let Ok(event) = self.completions_rx.try_recv() {
            self.complete(event).await;
        }
    }

    /// 表示中の画面が結果待ちでなくなるまで待つ
    pub async fn settle(&mut self) {
        self.pump().await;
        while self.coordinator.is_loading() && self.in_flight > 0 {
            if !self.receive_one().await {
                break;
            }
        }
    }

    /// 実行中のAI呼び出しがすべて終わるまで待つ
    pub async fn drain(&mut self) {
        while self.in_flight > 0 {
            if !self.receive_one().await {
                break;
            }
        }
    }

    async fn receive_one(&mut self) -> bool {
        match self.completions_rx.recv().await {
            Some(event) => {
                self.complete(event).await;
                true
            }
            None => false,
        }
    }

    async fn complete(&mut self, event: Event) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.submit(event).await;
    }

    async fn run(&mut self, effect: Effect) {
        let gateway = Arc::clone(&self.gateway);
        match effect {
            Effect::RecordHistory { plant_name, kind, image } => {
                let item = self.history.add(&plant_name, kind, image.as_ref()).await;
                tracing::debug!(id = %item.id, plant = %item.plant_name, kind = %item.search_type, "history recorded");
            }
            Effect::Identify { request, image } => self.spawn(
                async move {
                    Event::IdentifyCompleted {
                        request,
                        result: gateway.identify_from_image(&image).await,
                    }
                },
                Event::IdentifyCompleted { request, result: Err(task_failed()) },
            ),
            Effect::FetchInfo { request, plant_name, image } => {
                let lost = Event::InfoLoaded {
                    request,
                    plant_name: plant_name.clone(),
                    image: image.clone(),
                    result: Err(task_failed()),
                };
                self.spawn(
                    async move {
                        let result = gateway.fetch_plant_info(&plant_name).await;
                        Event::InfoLoaded { request, plant_name, image, result }
                    },
                    lost,
                )
            }
            Effect::AssessHealth { request, plant_name, image } => {
                let lost = Event::HealthLoaded {
                    request,
                    plant_name: plant_name.clone(),
                    image: image.image_ref().clone(),
                    result: Err(task_failed()),
                };
                self.spawn(
                    async move {
                        let result = gateway.assess_health(&image, &plant_name).await;
                        Event::HealthLoaded {
                            request,
                            plant_name,
                            image: image.image_ref().clone(),
                            result,
                        }
                    },
                    lost,
                )
            }
        }
    }

    /// タスクを走らせ、完了イベントを必ず1件返す
    ///
    /// タスクが異常終了した場合は `lost` を代わりに送る。
    fn spawn(&mut self, task: impl Future<Output = Event> + Send + 'static, lost: Event) {
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        let handle = tokio::spawn(task);
        tokio::spawn(async move {
            let event = match handle.await {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "gateway task failed");
                    lost
                }
            };
            // 受信側が閉じていれば結果は捨てる
            let _ = tx.send(event);
        });
    }
}

fn task_failed() -> GatewayError {
    GatewayError::Transport("AI request task failed unexpectedly.".to_string())
}
