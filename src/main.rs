use anyhow::{bail, Result};
use clap::Parser;
use dialoguer::Select;
use indicatif::ProgressBar;
use plant_explorer::cli::{Action, Cli, Commands};
use plant_explorer::config::Config;
use plant_explorer::coordinator::{Coordinator, Event, ViewState};
use plant_explorer::display;
use plant_explorer::error::PlantExplorerError;
use plant_explorer::gateway::{AiGateway, GeminiClient};
use plant_explorer::history::{HistorySlot, HistoryStore};
use plant_explorer::image_input::PlantImage;
use plant_explorer::session::Session;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const MENU_ITEMS: &[&str] = &["植物情報", "健康診断", "選択に戻る", "終了"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Search { name } => {
            println!("🌱 plant-explorer - 植物検索\n");

            let mut session = open_session(&config)?;
            session.submit(Event::SubmitSearch(name)).await;
            wait(&mut session, "植物情報を取得中...").await;
            print_search_result(&session)?;
        }

        Commands::Identify { image, action } => {
            println!("📷 plant-explorer - 写真から特定\n");

            let image = PlantImage::load(&image)?;
            let mut session = open_session(&config)?;
            session.submit(Event::SubmitImage(image)).await;
            wait(&mut session, "植物を特定中...").await;

            run_choice(&mut session, action).await?;
        }

        Commands::History { remove, clear, open } => {
            let store = open_history(&config)?;

            if let Some(id) = open {
                let Some(item) = store.find(&id) else {
                    bail!("履歴が見つかりません: {}", id);
                };
                println!("🕘 plant-explorer - 履歴から開く: {}\n", item.plant_name);

                let event = Event::reopen(&item)?;
                let is_search = matches!(event, Event::SubmitSearch(_));
                let mut session = open_session(&config)?;
                session.submit(event).await;
                wait(&mut session, "植物情報を取得中...").await;

                if is_search {
                    print_search_result(&session)?;
                } else {
                    run_choice(&mut session, None).await?;
                }
                return Ok(());
            }

            if clear {
                store.clear()?;
                println!("✔ 履歴を削除しました");
                return Ok(());
            }

            let items = match remove {
                Some(id) => {
                    let before = store.list().len();
                    let items = store.remove(&id);
                    if items.len() < before {
                        println!("✔ 削除しました: {}\n", id);
                    } else {
                        println!("履歴が見つかりません: {}\n", id);
                    }
                    items
                }
                None => store.list(),
            };
            print!("{}", display::render_history(&items));
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  APIエンドポイント: {}", config.api_base);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  先読み: {}", if config.preload { "有効" } else { "無効" });
                match config.history_file() {
                    Ok(path) => println!("  履歴ファイル: {}", path.display()),
                    Err(e) => println!("  履歴ファイル: {}", e),
                }
                println!("  履歴の最大件数: {}", config.history.max_items);
                println!("  重複判定の件数: {}", config.history.dedup_window);
                println!(
                    "  APIキー: {}",
                    if config.resolve_api_key().is_some() { "設定済み" } else { "未設定" }
                );
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_history(config: &Config) -> Result<HistoryStore> {
    let slot = HistorySlot::new(config.history_file()?);
    Ok(HistoryStore::new(slot, config.history))
}

fn open_session(config: &Config) -> Result<Session<GeminiClient>> {
    let client = GeminiClient::from_config(config)?;
    if !client.has_credential() {
        tracing::warn!("{}", PlantExplorerError::MissingApiKey);
    }
    Ok(Session::new(
        Coordinator::new(config.preload),
        Arc::new(AiGateway::new(client)),
        open_history(config)?,
    ))
}

/// 表示中の画面が結果待ちならスピナーを出して待つ
async fn wait(session: &mut Session<GeminiClient>, message: &str) {
    session.pump().await;
    if !session.coordinator().is_loading() {
        return;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    session.settle().await;
    spinner.finish_and_clear();
}

fn print_search_result(session: &Session<GeminiClient>) -> Result<()> {
    match session.state() {
        ViewState::Info(plant) => print!("{}", display::render_slot(&plant.info, display::render_info)),
        ViewState::Idle { error: Some(error), .. } => bail!("{}", error),
        _ => bail!("植物名を入力してください"),
    }
    Ok(())
}

/// 選択画面を表示し、指定の内容かメニューへ進む
async fn run_choice(session: &mut Session<GeminiClient>, action: Option<Action>) -> Result<()> {
    match session.state() {
        ViewState::ActionChoice(plant) => print!("{}", display::render_choice(plant)),
        ViewState::Idle { error, .. } => {
            bail!("植物を特定できませんでした: {}", error.as_deref().unwrap_or("-"))
        }
        _ => {}
    }

    match action {
        Some(Action::Info) => show(session, Event::ShowInfo).await,
        Some(Action::Health) => show(session, Event::ShowHealth).await,
        None => run_menu(session).await?,
    }
    Ok(())
}

async fn show(session: &mut Session<GeminiClient>, event: Event) {
    session.submit(event).await;
    wait(session, "AIに問い合わせ中...").await;

    match session.state() {
        ViewState::Info(plant) => print!("{}", display::render_slot(&plant.info, display::render_info)),
        ViewState::Health(plant) => print!("{}", display::render_slot(&plant.health, display::render_health)),
        ViewState::ActionChoice(plant) => print!("{}", display::render_choice(plant)),
        _ => {}
    }
}

async fn run_menu(session: &mut Session<GeminiClient>) -> Result<()> {
    loop {
        println!();
        let choice = tokio::task::block_in_place(|| {
            Select::new()
                .with_prompt("表示する内容を選んでください")
                .items(MENU_ITEMS)
                .default(0)
                .interact()
        })?;

        match choice {
            0 => show(session, Event::ShowInfo).await,
            1 => show(session, Event::ShowHealth).await,
            2 => show(session, Event::BackToChoice).await,
            _ => break,
        }
    }
    Ok(())
}
