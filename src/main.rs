use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use homework_grader::clients::KnowledgeClient;
use homework_grader::services::RetrievalService;
use homework_grader::utils::logging;
use homework_grader::{Collaborators, Config, PageProcessor};

const USAGE: &str = "用法:\n  homework-grader grade <作业图片>\n  homework-grader search <查询文本>";

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(&config)?;
    logging::log_startup(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("grade") if args.len() == 2 => {
            let processor = PageProcessor::new(&config, Collaborators::from_config(&config)?);
            let report = processor.process(Path::new(&args[1])).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some("search") if args.len() >= 2 => {
            let query = args[1..].join(" ");
            let knowledge = Arc::new(KnowledgeClient::new(&config)?);
            let service = RetrievalService::new(knowledge, config.query_max_chars);
            let matched = service.search(&query).await?;
            println!("{}", serde_json::to_string_pretty(&matched)?);
        }
        _ => bail!("{}", USAGE),
    }

    Ok(())
}
