use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use styled_article::models::load_brief_from_toml;
use styled_article::utils::logging;
use styled_article::{Config, StyledArticleGenerator};

/// 按参考语料的写作风格生成一篇文章，结果以 JSON 输出
#[derive(Parser, Debug)]
#[command(name = "styled_article")]
#[command(version, about, long_about = None)]
struct Cli {
    /// 简报文件（TOML）
    #[arg(value_name = "BRIEF")]
    brief: PathBuf,

    /// 配置文件（TOML），未指定时只读取环境变量
    #[arg(short, long, env = "STYLED_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// 输出 JSON 格式日志
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging, cli.json_logs || config.json_logs)?;

    let brief = load_brief_from_toml(&cli.brief).await?;
    let generator = StyledArticleGenerator::from_config(&config).await?;

    let result = generator.generate_styled_article(&brief).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "styled_article",
            "brief.toml",
            "--config",
            "config.toml",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(cli.brief, PathBuf::from("brief.toml"));
        assert_eq!(cli.config, Some(PathBuf::from("config.toml")));
        assert!(cli.json_logs);
    }

    #[test]
    fn test_cli_requires_brief() {
        assert!(Cli::try_parse_from(["styled_article"]).is_err());
    }
}
