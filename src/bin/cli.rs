//! greql CLI 工具
//!
//! 加载一个 JSON 图文档，在交互式 REPL 中求值 GReQL 查询

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use greql::cli::{
    check_vertical_display, execute_console_command, is_console_command, CommandResult,
    ConsoleState, GreqlCompleter, PrintMode, Printer,
};
use greql::import::import_json;
use greql::metrics::ExecutionMode;
use greql::{EngineConfig, QueryEngine};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const HISTORY_FILE: &str = ".greql_history";

#[derive(Parser, Debug)]
#[command(name = "greql-cli")]
#[command(about = "GReQL 交互式查询工具", version)]
struct Args {
    /// JSON 图文档
    graph: Option<PathBuf>,

    /// 引擎配置文件 (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 执行方式，覆盖配置文件
    #[arg(short, long, value_parser = parse_mode)]
    mode: Option<ExecutionMode>,

    /// 查询超时（毫秒），覆盖配置文件
    #[arg(short, long)]
    timeout: Option<u64>,

    /// 日志详细程度 (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// 执行单个查询后退出
    #[arg(short = 'e', long)]
    execute: Option<String>,
}

fn parse_mode(s: &str) -> std::result::Result<ExecutionMode, String> {
    match s {
        "interpreted" | "i" => Ok(ExecutionMode::Interpreted),
        "compiled" | "c" => Ok(ExecutionMode::Compiled),
        other => Err(format!("unknown execution mode '{}'", other)),
    }
}

fn setup_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "greql=warn",
            1 => "greql=info",
            2 => "greql=debug",
            _ => "greql=trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(ms) = args.timeout {
        config.timeout_ms = if ms == 0 { None } else { Some(ms) };
    }

    let graph = match &args.graph {
        Some(path) => {
            let (graph, stats) = import_json(path)
                .with_context(|| format!("cannot import {}", path.display()))?;
            eprintln!(
                "Loaded {}: {} vertices, {} edges ({} ms)",
                graph.id(),
                stats.vertices_imported,
                stats.edges_imported,
                stats.duration_ms
            );
            Some(graph)
        }
        None => None,
    };

    let mut state = ConsoleState::new(QueryEngine::new(config), graph);

    // 单个查询模式
    if let Some(query) = args.execute {
        let (value, _) = state.run_query(&query)?;
        println!("{}", value);
        return Ok(());
    }

    repl(&mut state)
}

fn repl(state: &mut ConsoleState) -> Result<()> {
    println!("GReQL CLI {}", greql::VERSION);
    println!("Type :help for commands, :quit to exit\n");

    let mut rl: Editor<GreqlCompleter, DefaultHistory> =
        Editor::new().context("failed to init rustyline")?;
    rl.set_helper(Some(GreqlCompleter::new()));
    let history = dirs::home_dir().map(|home| home.join(HISTORY_FILE));
    if let Some(path) = &history {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = format!("greql[{}]> ", state.engine.config().mode);
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("readline error"),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        if is_console_command(line) {
            match execute_console_command(line, state) {
                CommandResult::Continue => {}
                CommandResult::Exit => break,
                CommandResult::Message(msg) => state.write_output(&format!("{}\n", msg)),
                CommandResult::Error(msg) => eprintln!("{}", msg.red()),
            }
            continue;
        }

        let (query, vertical) = check_vertical_display(line);
        let printer = Printer::new(if vertical {
            PrintMode::Vertical
        } else {
            PrintMode::Table
        });
        match state.run_query(&query) {
            Ok((value, elapsed)) => {
                let output = printer.print_value(&value, elapsed.as_millis() as u64);
                state.write_output(&output);
            }
            Err(e) => eprintln!("{} {}", format!("[{:?}]", e.kind()).red().bold(), e),
        }
    }

    if let Some(path) = &history {
        let _ = rl.save_history(path);
    }
    println!("Bye");
    Ok(())
}
