//! MindCare CLI - 离线心理状态评估对话

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mc_assess::AssessmentReport;
use mc_core::SessionId;
use mc_counsel::{CounselConfig, CounselingService};
use mc_durable::MemorySessionStore;
use mc_llm::{FallbackRouter, LlmGateway, ProviderConfig, ProviderKind, TokenBucket};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mc=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let service = build_service()?;

    println!("MindCare CLI v{}", env!("CARGO_PKG_VERSION"));
    println!("Type '/help' for available commands, '/quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let student_id = std::env::var("MINDCARE_STUDENT_ID").unwrap_or_else(|_| "local".to_string());
    let mut session_id = new_session(&service, &student_id).await?;

    loop {
        print!("you> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        match input {
            "/help" => {
                println!("Available commands:");
                println!("  /help         - Show this help message");
                println!("  /report       - Show the assessment result");
                println!("  /history      - Show this conversation");
                println!("  /new          - Start a new assessment");
                println!("  /quit         - Exit the CLI");
                println!("Anything else is sent as a message.");
            }
            "/report" => match service.get_report(session_id).await {
                Ok(report) => print_report(&report),
                Err(e) => println!("{e}"),
            },
            "/history" => {
                for message in service.history(session_id).await? {
                    println!("[{}] {}", message.role.as_str(), message.content);
                }
            }
            "/new" => {
                session_id = new_session(&service, &student_id).await?;
            }
            "/quit" | "/exit" => {
                println!("再见，照顾好自己。");
                break;
            }
            text => match service.send_message(session_id, text).await {
                Ok(reply) => {
                    println!("ai> {}", reply.reply);
                    println!(
                        "    [{} | {} | {}/{}]",
                        reply.emotion.display_name(),
                        reply.risk.display_name(),
                        reply.turn,
                        service.config().dialogue.max_turns
                    );
                    if reply.redirect.is_some() {
                        let report = service.get_report(session_id).await?;
                        print_report(&report);
                        println!("Type '/new' to start again or '/quit' to exit.");
                    }
                }
                Err(e) => println!("{e}"),
            },
        }
    }

    Ok(())
}

/// 内存存储，可选通过 MINDCARE_OLLAMA_URL 接入本地模型
fn build_service() -> anyhow::Result<CounselingService> {
    let service = CounselingService::new(Arc::new(MemorySessionStore::new()), CounselConfig::default());

    let Ok(endpoint) = std::env::var("MINDCARE_OLLAMA_URL") else {
        return Ok(service);
    };
    let router = FallbackRouter::from_configs(vec![ProviderConfig {
        kind: ProviderKind::Ollama,
        endpoint,
        api_key: None,
        model: std::env::var("MINDCARE_OLLAMA_MODEL").unwrap_or_else(|_| "qwen2.5:7b".to_string()),
        priority: 0,
        max_retries: 0,
        timeout: Duration::from_secs(120),
        enabled: true,
    }])?;
    let gateway = LlmGateway::new(TokenBucket::default_bucket(), router);
    Ok(service.with_generator(Arc::new(gateway)))
}

async fn new_session(service: &CounselingService, student_id: &str) -> anyhow::Result<SessionId> {
    let start = service.start_session(student_id).await?;
    println!("ai> {}", start.greeting);
    Ok(start.session.id)
}

fn print_report(report: &AssessmentReport) {
    println!();
    println!("===== 评估结果 =====");
    println!("{}", report.summary());
    println!("风险分: {:.1}", report.risk.score);
    for (emotion, count) in &report.emotion_distribution {
        println!("  {}: {}", emotion.display_name(), count);
    }
    if report.needs_counselor {
        println!("建议尽快联系学校心理咨询中心。");
    }
    for item in &report.recommendations {
        println!("  - {item}");
    }
    println!();
}
