use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plant-explorer")]
#[command(about = "植物の名前・写真からAIで植物情報と健康診断を表示するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 植物名で検索して情報を表示
    Search {
        /// 植物名（例: "Monstera Deliciosa"）
        #[arg(required = true)]
        name: String,
    },

    /// 写真から植物を特定
    Identify {
        /// 画像ファイル (jpg/jpeg/png/webp)
        #[arg(required = true)]
        image: PathBuf,

        /// 特定後に表示する内容（省略時は対話メニュー）
        #[arg(short, long)]
        action: Option<Action>,
    },

    /// 検索履歴を表示/編集
    History {
        /// 指定IDの履歴を削除
        #[arg(long)]
        remove: Option<String>,

        /// 履歴をすべて削除
        #[arg(long)]
        clear: bool,

        /// 指定IDの履歴を開き直す
        #[arg(long, conflicts_with_all = ["remove", "clear"])]
        open: Option<String>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// 特定後の表示内容
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// 植物情報
    Info,
    /// 健康診断
    Health,
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "i" => Ok(Action::Info),
            "health" | "h" => Ok(Action::Health),
            _ => Err(format!("Unknown action: {}. Use info or health", s)),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Info => write!(f, "info"),
            Action::Health => write!(f, "health"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_str() {
        assert_eq!("Info".parse::<Action>(), Ok(Action::Info));
        assert_eq!("h".parse::<Action>(), Ok(Action::Health));
        assert!("care".parse::<Action>().is_err());
    }

    #[test]
    fn test_parse_identify_with_action() {
        let cli = Cli::try_parse_from(["plant-explorer", "-v", "identify", "leaf.jpg", "--action", "health"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Identify { image, action } => {
                assert_eq!(image, PathBuf::from("leaf.jpg"));
                assert_eq!(action, Some(Action::Health));
            }
            _ => panic!("identify expected"),
        }
    }

    #[test]
    fn test_parse_history_clear() {
        let cli = Cli::try_parse_from(["plant-explorer", "history", "--clear"]).unwrap();
        assert!(matches!(cli.command, Commands::History { remove: None, clear: true, open: None }));
    }

    #[test]
    fn test_parse_history_open() {
        let cli = Cli::try_parse_from(["plant-explorer", "history", "--open", "abc"]).unwrap();
        match cli.command {
            Commands::History { open, .. } => assert_eq!(open.as_deref(), Some("abc")),
            _ => panic!("history expected"),
        }
        assert!(Cli::try_parse_from(["plant-explorer", "history", "--open", "abc", "--clear"]).is_err());
    }
}
