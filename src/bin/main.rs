//! testframe CLI - runs an XCTest-style test bundle from the command line.
//!
//! This crate has no tests of its own to discover from another language or
//! build system, so the binary registers a small built-in `SelfCheck` suite
//! that exercises assertions and expectations end to end; an embedding
//! project follows the same shape with its own [`TestCase`] impls in place
//! of `SelfCheck`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use testframe::entity::Entity;
use testframe::error::TestError;
use testframe::filter::Filter;
use testframe::location::SourceLocation;
use testframe::observation::Observer;
use testframe::record::ResultRecord;
use testframe::registration::{self, TestCase};
use testframe::{config, waiter};

const BUNDLE_NAME: &str = "testframe";

#[derive(Parser)]
#[command(name = "testframe")]
#[command(about = "Runs an XCTest-style test bundle", long_about = None)]
#[command(version)]
struct Cli {
    /// Test selectors: `ClassName` or `ClassName/methodName`. Every test
    /// runs if none are given.
    selectors: Vec<String>,

    /// Print the selected test tree as plain text and exit, without running
    /// anything.
    #[arg(long)]
    list: bool,

    /// Print the selected test tree as JSON and exit, without running
    /// anything.
    #[arg(long = "list-json")]
    list_json: bool,

    /// Configuration file path.
    #[arg(short, long, default_value = "testframe.toml")]
    config: PathBuf,

    /// Verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    testframe::profiling::init();
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("a logging subscriber was already installed");
    }

    let cfg = match config::load_config_or_default(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    waiter::configure_default_timeout(Duration::from_secs_f64(cfg.waiter.default_timeout_secs));
    waiter::configure_suspension_slice(Duration::from_millis(cfg.waiter.suspension_slice_millis));
    info!("loaded configuration from {}", cli.config.display());

    let classes: Vec<Box<dyn registration::ClassSuiteBuilder>> =
        vec![registration::class_builder::<SelfCheck>()];
    let filter = Filter::parse(&cli.selectors);
    let root = registration::build_root(BUNDLE_NAME, &classes, &filter);

    if cli.list {
        print_listing_text(&root);
        return ExitCode::SUCCESS;
    }
    if cli.list_json {
        println!("{}", serde_json::to_string_pretty(&entity_to_json(&root)).unwrap());
        return ExitCode::SUCCESS;
    }

    let mut engine = testframe::ExecutionEngine::new(BUNDLE_NAME, root);
    let case_count = engine.case_count();
    engine.add_observer(std::sync::Arc::new(TextReporter::new(case_count)));
    let record = engine.run();

    print_summary(&record);

    if record.total_failure_count() == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_listing_text(entity: &Entity) {
    let mut leaves = Vec::new();
    collect_leaf_names(entity, &mut leaves);
    for name in leaves {
        println!("{name}");
    }
}

fn collect_leaf_names<'a>(entity: &'a Entity, out: &mut Vec<&'a str>) {
    match entity {
        Entity::Case(case) => out.push(case.display_name()),
        Entity::Suite(suite) => {
            for child in suite.children() {
                collect_leaf_names(child, out);
            }
        }
    }
}

/// Builds the `{name, tests: [...]}` tree described in spec §6: leaves carry
/// no `tests` key.
fn entity_to_json(entity: &Entity) -> serde_json::Value {
    match entity {
        Entity::Case(case) => serde_json::json!({ "name": case.display_name() }),
        Entity::Suite(suite) => serde_json::json!({
            "name": suite.name(),
            "tests": suite.children().iter().map(entity_to_json).collect::<Vec<_>>(),
        }),
    }
}

/// The default textual observer: reports failures and skips in the
/// canonical `<file>:<line>: ...` forms as they happen, following the same
/// "colorize the whole line, keep the text parseable" approach as the
/// teacher's `ConsoleReporter`. Drives a progress bar across `case_count`
/// cases the same way the teacher ticks one per completed test.
struct TextReporter {
    progress: indicatif::ProgressBar,
}

impl TextReporter {
    fn new(case_count: usize) -> Self {
        let progress = indicatif::ProgressBar::new(case_count as u64);
        progress.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("#>-"),
        );
        Self { progress }
    }
}

impl Observer for TextReporter {
    fn case_did_finish(&self, _case_name: &str, _record: &ResultRecord) {
        self.progress.inc(1);
    }

    fn bundle_did_finish(&self, _bundle_name: &str, _record: &ResultRecord) {
        self.progress.finish_and_clear();
    }

    fn case_did_fail(&self, case_name: &str, description: &str, location: &SourceLocation) {
        let line = format!("{}:{}: error: {} : {}", location.file, location.line, case_name, description);
        self.progress.println(console::style(line).red().to_string());
    }

    fn case_was_skipped(&self, case_name: &str, description: &str, location: &SourceLocation) {
        let line = format!("{}:{}: {} : {}", location.file, location.line, case_name, description);
        self.progress.println(console::style(line).yellow().to_string());
    }
}

fn print_summary(record: &ResultRecord) {
    let executed = record.execution_count();
    let skipped = record.skip_count();
    let failures = record.total_failure_count();
    let unexpected = record.unexpected_failure_count();
    let test_duration = record.total_leaf_duration().as_secs_f64();
    let total_duration = record.duration().unwrap_or_default().as_secs_f64();

    let summary = format!(
        "Executed {executed} test(s), with {skipped} test(s) skipped and {failures} failure(s) ({unexpected} unexpected) in {test_duration:.3} ({total_duration:.3}) seconds"
    );
    println!();
    if failures == 0 {
        println!("{}", console::style(summary).green());
    } else {
        println!("{}", console::style(summary).red());
    }
}

/// A minimal built-in test class, standing in for the suite a real
/// embedding project would register in its own `main.rs`.
#[derive(Default)]
struct SelfCheck {
    counter_expectation: Option<std::sync::Arc<testframe::Expectation>>,
}

impl TestCase for SelfCheck {
    fn class_name() -> &'static str {
        "SelfCheck"
    }

    fn methods() -> Vec<(&'static str, fn(&mut Self) -> Result<(), TestError>)> {
        vec![
            ("testArithmetic", SelfCheck::test_arithmetic),
            ("testExpectationFulfillsFromAnotherThread", SelfCheck::test_expectation),
        ]
    }
}

impl SelfCheck {
    fn test_arithmetic(&mut self) -> Result<(), TestError> {
        testframe::assert::assert_equal(&(2 + 2), &4, "basic sanity", testframe::here!());
        Ok(())
    }

    fn test_expectation(&mut self) -> Result<(), TestError> {
        let expectation = testframe::expectation::new_expectation("counter fires", testframe::here!());
        self.counter_expectation = Some(expectation.clone());
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            expectation.fulfill(testframe::here!());
        });
        waiter::wait(
            vec![self.counter_expectation.take().unwrap()],
            Duration::from_secs(1),
            false,
            testframe::here!(),
        );
        Ok(())
    }
}
