//!
//! # Folder Tree
//! Builds the folder tree for a directory and reports document and folder
//! counts, word occurrences and the documents containing each word, with how
//! long each step took.
//!
//! # Example
//! Builds with the parallel method, runs the queries concurrently and searches
//! for two words ignoring case.
//! ```folder_tree ./works -m par -c -i --word the --word whale```

mod cli;

use std::fmt;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::CliArgs;
use folder_tree::{
    collect_documents, count_documents, count_folders, search, total_bytes, WordQuery,
};

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("folder_tree=debug,threadpool=debug,warn")
        } else {
            EnvFilter::new("folder_tree=info,warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &CliArgs) -> Result<()> {
    let config = args.to_config();
    let mut timer = RunTimer::default();

    let root = timer
        .time(format!("build ({})", config.build_method), || {
            folder_tree::build(&config)
        })
        .with_context(|| format!("unable to build tree for {}", config.path.display()))?;

    let mode = if args.concurrent { "concurrent" } else { "sequential" };
    let documents = timer.time(format!("count documents ({mode})"), || {
        count_documents(&root, args.concurrent)
    });
    let folders = timer.time(format!("count folders ({mode})"), || {
        count_folders(&root, args.concurrent)
    });
    let bytes = timer.time(format!("total bytes ({mode})"), || {
        total_bytes(&root, args.concurrent)
    });

    let mut words = Vec::with_capacity(args.words.len());
    for word in &args.words {
        let query = WordQuery::with_case(word, !args.ignore_case)
            .with_context(|| format!("bad search word {word:?}"))?;
        let occurrences = timer.time(format!("search '{word}' ({mode})"), || {
            search(&root, &query, args.concurrent)
        });
        let matched: Vec<std::sync::Arc<folder_tree::Document>> = timer
            .time(format!("get documents '{word}' ({mode})"), || {
                collect_documents(&root, &query, args.concurrent)
            });
        info!(word = %word, occurrences, documents = matched.len(), "searched");
        words.push(WordReport {
            word: word.clone(),
            occurrences,
            documents: matched
                .iter()
                .map(|d| d.path.display().to_string())
                .collect(),
        });
    }

    let report = Report {
        root: config.path.display().to_string(),
        method: config.build_method.to_string(),
        documents,
        folders,
        bytes,
        words,
        timings: timer.sorted(),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

#[derive(Serialize)]
struct WordReport {
    word: String,
    occurrences: u64,
    documents: Vec<String>,
}

#[derive(Serialize)]
struct Timing {
    label: String,
    micros: u128,
}

#[derive(Serialize)]
struct Report {
    root: String,
    method: String,
    documents: u64,
    folders: u64,
    bytes: u64,
    words: Vec<WordReport>,
    timings: Vec<Timing>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} (built {})", self.root, self.method)?;
        writeln!(f, "- Documents - {}", self.documents)?;
        writeln!(f, "- Folders - {}", self.folders)?;
        writeln!(f, "- Data (bytes) - {}", self.bytes)?;
        for word in &self.words {
            writeln!(
                f,
                "- '{}' - {} occurrences in {} documents",
                word.word,
                word.occurrences,
                word.documents.len()
            )?;
            for doc in &word.documents {
                writeln!(f, "    {doc}")?;
            }
        }
        writeln!(f, "-------------\nTimings (fastest first)")?;
        for timing in &self.timings {
            writeln!(f, "  {:>10}us  {}", timing.micros, timing.label)?;
        }
        Ok(())
    }
}

/// Records how long each labelled step of a run took.
#[derive(Default)]
struct RunTimer {
    results: Vec<(String, Duration)>,
}

impl RunTimer {
    fn time<T>(&mut self, label: String, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.results.push((label, started.elapsed()));
        out
    }

    fn sorted(self) -> Vec<Timing> {
        let mut results = self.results;
        results.sort_by_key(|(_, elapsed)| *elapsed);
        results
            .into_iter()
            .map(|(label, elapsed)| Timing {
                label,
                micros: elapsed.as_micros(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_counts_and_data_size() {
        let report = Report {
            root: "/works".into(),
            method: "parallel".into(),
            documents: 3,
            folders: 2,
            bytes: 2048,
            words: vec![WordReport {
                word: "the".into(),
                occurrences: 5,
                documents: vec!["/works/a.txt".into()],
            }],
            timings: vec![],
        };
        let text = report.to_string();
        assert!(text.contains("- Documents - 3\n"));
        assert!(text.contains("- Folders - 2\n"));
        assert!(text.contains("- Data (bytes) - 2048\n"));
        assert!(text.contains("- 'the' - 5 occurrences in 1 documents"));

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["bytes"], 2048);
    }
}
