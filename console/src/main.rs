//! 查询控制台
//!
//! 终端版查询仪表盘：
//! - 输入 SQL（以 `;` 结尾或空行提交）或 NoSQL JSON（空行提交）
//! - 结果以表格显示，错误显示在状态行
//! - 启动时并发加载白名单表的预览

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use common::models::query::ResultSet;
use common::telemetry::init_tracing;
use console::samples;
use console::{
    load_previews, render_results, ConsoleResult, GatewayClient, Mode, Phase, QueryConsole,
    StatusKind, TablePreview, Ticket, DEFAULT_GATEWAY_URL,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};

/// Query dashboard console
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gateway base URL
    #[arg(short, long, env = "GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    gateway: String,

    /// Query language of the editor
    #[arg(short, long, value_enum, default_value_t = Mode::Sql)]
    mode: Mode,

    /// Give up on a request after this many seconds (default: wait)
    #[arg(long, env = "GATEWAY_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Skip loading table previews at start-up
    #[arg(long)]
    no_preview: bool,
}

/// Completion of a background request.
enum Event {
    Outcome(u64, ConsoleResult<ResultSet>),
    Previews(ConsoleResult<Vec<TablePreview>>),
    Collections(ConsoleResult<Vec<String>>),
}

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn");
    let args = Args::parse();

    let client = GatewayClient::with_timeout(&args.gateway, args.timeout_secs.map(Duration::from_secs))?;
    let (events, mut inbox) = mpsc::unbounded_channel();
    let mut repl = Repl {
        client,
        console: QueryConsole::new(args.mode),
        buffer: Vec::new(),
        events,
    };

    repl.print_banner();
    if !args.no_preview {
        repl.spawn_previews();
    }
    repl.prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Flow::Quit = repl.handle_line(&line) {
                    break;
                }
            }
            Some(event) = inbox.recv() => repl.handle_event(event),
        }
        repl.prompt()?;
    }

    println!("Goodbye!");
    Ok(())
}

struct Repl {
    client: GatewayClient,
    console: QueryConsole,
    /// Lines of the query being typed.
    buffer: Vec<String>,
    events: UnboundedSender<Event>,
}

impl Repl {
    fn print_banner(&self) {
        println!("Query Console (gateway {})", self.client.base_url());
        println!("Mode: {}. Type ':help' for commands, ':quit' to exit.", self.console.mode());
        println!();
    }

    fn prompt(&self) -> std::io::Result<()> {
        let mut stdout = std::io::stdout();
        if self.buffer.is_empty() {
            write!(stdout, "{}> ", self.console.mode())?;
        } else {
            write!(stdout, "  -> ")?;
        }
        stdout.flush()
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        let trimmed = line.trim();
        if self.buffer.is_empty() && trimmed.starts_with(':') {
            return self.handle_command(trimmed);
        }

        if trimmed.is_empty() {
            if !self.buffer.is_empty() {
                self.submit_buffer();
            }
            return Flow::Continue;
        }

        self.buffer.push(line.to_string());
        if self.console.mode() == Mode::Sql && trimmed.ends_with(';') {
            self.submit_buffer();
        }
        Flow::Continue
    }

    fn handle_command(&mut self, command: &str) -> Flow {
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(n, a)| (n, a.trim()))
            .unwrap_or((command, ""));

        match name {
            ":quit" | ":exit" | ":q" => return Flow::Quit,
            ":help" | ":h" => print_help(),
            ":run" | ":r" => self.submit(),
            ":show" => println!("{}", self.console.query()),
            ":clear" => self.console.set_query(""),
            ":results" => println!("{}", render_results(self.console.results())),
            ":mode" if arg.is_empty() => println!("Mode: {}", self.console.mode()),
            ":mode" => match arg.parse::<Mode>() {
                Ok(mode) => {
                    self.console.set_mode(mode);
                    println!("Mode: {}", mode);
                }
                Err(e) => println!("{}", e),
            },
            ":tables" | ":preview" => self.spawn_previews(),
            ":collections" => self.spawn_collections(),
            ":examples" => println!("{}", samples::listing()),
            ":use" => match arg.parse::<usize>().ok().and_then(samples::sample) {
                Some(sample) => {
                    self.console.set_query(sample.query);
                    println!("-- {}\n{}", sample.title, sample.query);
                    println!("(':run' to execute)");
                }
                None => println!("Usage: :use <1-{}>", samples::SAMPLE_QUERIES.len()),
            },
            other => println!("Unknown command: {} (':help' lists commands)", other),
        }
        Flow::Continue
    }

    fn submit_buffer(&mut self) {
        let text = self.buffer.join("\n");
        self.buffer.clear();
        self.console.set_query(text);
        self.submit();
    }

    fn submit(&mut self) {
        match self.console.submit() {
            Some(ticket) => {
                println!("{}", self.console.run_label());
                self.spawn_request(ticket);
            }
            None => self.print_status(),
        }
    }

    fn spawn_request(&self, ticket: Ticket) {
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = client.submit(&ticket.submission).await;
            let _ = events.send(Event::Outcome(ticket.generation, outcome));
        });
    }

    fn spawn_previews(&self) {
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let previews = load_previews(&client).await;
            let _ = events.send(Event::Previews(previews));
        });
    }

    fn spawn_collections(&self) {
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let names = client.list_collections().await;
            let _ = events.send(Event::Collections(names));
        });
    }

    fn handle_event(&mut self, event: Event) {
        // Background output lands mid-prompt.
        println!();
        match event {
            Event::Outcome(generation, outcome) => {
                if !self.console.resolve(generation, outcome) {
                    tracing::debug!(generation, "discarded stale response");
                    return;
                }
                match self.console.phase() {
                    Phase::Resolved => println!("{}", render_results(self.console.results())),
                    _ => self.print_status(),
                }
            }
            Event::Previews(Ok(previews)) => {
                for preview in previews {
                    println!("{}\n", preview.to_text());
                }
            }
            Event::Previews(Err(e)) => println!("Could not load table previews: {}", e),
            Event::Collections(Ok(names)) if names.is_empty() => println!("No collections"),
            Event::Collections(Ok(names)) => println!("{}", names.join("\n")),
            Event::Collections(Err(e)) => println!("Could not list collections: {}", e),
        }
    }

    fn print_status(&self) {
        if let Some(status) = self.console.status() {
            match status.kind {
                StatusKind::Notice => println!("! {}", status.text),
                StatusKind::Error => println!("Error: {}", status.text),
            }
        }
    }
}

fn print_help() {
    println!("Enter a query and finish it with ';' (SQL) or an empty line.");
    println!();
    println!("Commands:");
    println!("  :run                 Run the current query again");
    println!("  :show                Show the current query");
    println!("  :clear               Clear the current query");
    println!("  :results             Show the last results");
    println!("  :mode [sql|nosql]    Show or switch the query language");
    println!("  :tables              Reload table previews");
    println!("  :collections         List document collections");
    println!("  :examples            List example queries");
    println!("  :use <n>             Load example query n");
    println!("  :quit                Exit");
    println!();
    println!("NoSQL queries are JSON, e.g.");
    println!(r#"  {{ "collection": "users", "filter": {{ "name": "Deepak" }} }}"#);
}
