use bus::{EventBus, PageEvent};
use clap::Parser;
use net::{FetchRequest, Fetcher, HttpFetcher};
use platform::HeadlessHost;
use runtime_nav::{NavigateConfig, NavigationResult, Session};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use url::Url;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Load a page, then navigate through the given URLs the way the runtime would in a tab.
#[derive(Debug, Parser)]
#[command(name = "frugal", version)]
struct Args {
    /// TOML file with navigation settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log runtime decisions to stderr.
    #[arg(long, short)]
    verbose: bool,

    start: String,

    /// Followed in order; relative URLs resolve against the current location.
    next: Vec<String>,
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() -> ExitCode {
    let args = Args::parse();
    if args.verbose && log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("frugal: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => NavigateConfig::load(path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => NavigateConfig::default(),
    };
    let start = Url::parse(&args.start).map_err(|e| format!("{}: {e}", args.start))?;

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::default());
    let initial = fetcher
        .fetch(&FetchRequest::get(start.clone()))
        .map_err(|e| format!("{start}: {e}"))?;
    if !initial.is_ok() {
        return Err(format!("{start}: status {}", initial.status));
    }
    println!("loaded {} ({})", initial.url, initial.status);

    let mut bus = EventBus::new();
    let events = bus.subscribe();
    let host = HeadlessHost::new(initial.url.clone());
    let mut session = Session::start(
        config,
        host,
        fetcher,
        bus,
        initial.url.clone(),
        &initial.body,
    );
    print_events(&events);

    for next in &args.next {
        let url = session
            .location()
            .join(next)
            .map_err(|e| format!("{next}: {e}"))?;
        match session.navigate(url.clone()) {
            Ok(NavigationResult::Success) => println!("{url}: success"),
            Ok(NavigationResult::Failure(reason)) => println!("{url}: {reason}"),
            Err(err) => println!("{url}: error: {err}"),
        }
        print_events(&events);
        if let Some(stats) = session.last_patch() {
            println!(
                "  patch: {} removed, {} appended, {} replaced, {} text, {} attributes",
                stats.removed,
                stats.appended,
                stats.replaced,
                stats.text_updates,
                stats.attribute_updates
            );
        }
    }

    let history = session.history();
    println!(
        "history: {} records, at {}",
        history.records().len(),
        history.index()
    );
    session.unload();
    Ok(())
}

fn print_events(events: &Receiver<PageEvent>) {
    for event in events.try_iter() {
        match event {
            PageEvent::ReadyStateChange(state) => println!("  {} {}", event.name(), state.as_str()),
            PageEvent::Popstate { url, index } => println!("  popstate {url} ({index})"),
            other => println!("  {}", other.name()),
        }
    }
}
