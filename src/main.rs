use clap::{Arg, ArgAction, ArgGroup, Command};
use log::LevelFilter;
use phishguard::config::DEFAULT_CONFIG_PATH;
use phishguard::features::UrlFeatureExtractor;
use phishguard::model::ArtifactStore;
use phishguard::training::train_models;
use phishguard::{
    AnalysisReport, Config, DetectionKind, DetectionLog, DetectionSink, Detectors, Explainer,
    ReportFormat,
};
use std::io::Read;
use std::path::Path;
use std::process;

const DEFAULT_SEED: u64 = 42;

fn main() {
    let matches = Command::new("phishguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Phishing classifier for URLs and email text")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Classify a URL")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("email-file")
                .short('e')
                .long("email-file")
                .value_name("FILE")
                .help("Classify email text read from FILE, or stdin when FILE is -")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("train")
                .long("train")
                .help("Train both models and write them to the models directory")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .help("Random seed used for synthetic training data")
                .value_parser(clap::value_parser!(u64))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Show detection statistics")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stats-reset")
                .long("stats-reset")
                .help("Clear the detection log and feedback, then exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("recent")
                .long("recent")
                .value_name("N")
                .help("Show the N most recent detections")
                .value_parser(clap::value_parser!(usize))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("feedback")
                .long("feedback")
                .value_name("ID")
                .help("Record feedback for a logged detection")
                .value_parser(clap::value_parser!(u64))
                .requires("verdict")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("correct")
                .long("correct")
                .help("The detection was correct")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("incorrect")
                .long("incorrect")
                .help("The detection was wrong")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("verdict")
                .args(["correct", "incorrect"])
                .multiple(false),
        )
        .arg(
            Arg::new("comment")
                .long("comment")
                .value_name("TEXT")
                .help("Optional comment stored with the feedback")
                .requires("feedback")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("report")
                .long("report")
                .value_name("FORMAT")
                .help("Print a full analysis report (text, json)")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("no-log")
                .long("no-log")
                .help("Do not record the detection")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_PATH);

    let config = match Config::load_or_default(Path::new(config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if matches.get_flag("train") {
        let seed = matches.get_one::<u64>("seed").copied().unwrap_or(DEFAULT_SEED);
        run_training(&config, seed);
        return;
    }

    if matches.get_flag("stats")
        || matches.get_flag("stats-reset")
        || matches.contains_id("recent")
        || matches.contains_id("feedback")
    {
        let detection_log = open_log(&config);

        if matches.get_flag("stats-reset") {
            match detection_log.reset() {
                Ok(()) => println!("✅ Detection log and feedback cleared"),
                Err(e) => {
                    eprintln!("❌ Error resetting statistics: {e:#}");
                    process::exit(1);
                }
            }
            return;
        }

        if let Some(id) = matches.get_one::<u64>("feedback") {
            let is_correct = matches.get_flag("correct");
            let comment = matches.get_one::<String>("comment").cloned();
            match detection_log.record_feedback(*id, is_correct, comment) {
                Ok(_) => println!("✅ Feedback recorded for detection {id}"),
                Err(e) => {
                    eprintln!("❌ Error recording feedback: {e:#}");
                    process::exit(1);
                }
            }
        }
        if let Some(limit) = matches.get_one::<usize>("recent") {
            show_recent(&detection_log, *limit);
        }
        if matches.get_flag("stats") {
            show_stats(&detection_log);
        }
        return;
    }

    let report_format = match matches.get_one::<String>("report") {
        Some(format) => match format.parse::<ReportFormat>() {
            Ok(format) => Some(format),
            Err(e) => {
                eprintln!("❌ {e}");
                process::exit(1);
            }
        },
        None => None,
    };

    let target = if let Some(url) = matches.get_one::<String>("url") {
        Some((DetectionKind::Url, url.clone()))
    } else {
        matches
            .get_one::<String>("email-file")
            .map(|file| (DetectionKind::Email, read_email(file)))
    };

    let Some((kind, input)) = target else {
        eprintln!("Nothing to do. Use --url, --email-file, --train or --stats (see --help)");
        process::exit(2);
    };

    let record = config.logging.enabled && !matches.get_flag("no-log");
    analyze(&config, kind, &input, report_format, record);
}

fn analyze(
    config: &Config,
    kind: DetectionKind,
    input: &str,
    report_format: Option<ReportFormat>,
    record: bool,
) {
    let detectors = Detectors::load(config);
    let result = detectors.classify(kind, input);
    let explainer = Explainer::new(UrlFeatureExtractor::from_config(&config.url));
    let explanation = explainer.explain(kind, input, result.is_phishing, result.score);

    let log_id = if record {
        match open_log(config).record(kind, input, result.is_phishing, result.score) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Failed to record detection: {e:#}");
                None
            }
        }
    } else {
        None
    };

    if let Some(format) = report_format {
        let report = AnalysisReport::new(kind, input, &result, explanation);
        match report.render(format) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("❌ Error rendering report: {e:#}");
                process::exit(1);
            }
        }
    } else {
        if result.is_phishing {
            println!("🚨 {kind} classified as PHISHING");
        } else {
            println!("✅ {kind} classified as LEGITIMATE");
        }
        println!("  Score: {:.1}%", result.score * 100.0);
        println!("  {}", explanation.summary);

        if !explanation.key_factors.is_empty() {
            println!();
            println!("🔍 Key factors:");
            for factor in &explanation.key_factors {
                println!("  • {factor}");
            }
        }
        if kind == DetectionKind::Email && !result.matched_phrases.is_empty() {
            println!();
            println!("⚠️  Suspicious phrases: {}", result.matched_phrases.join(", "));
        }
        println!();
        println!("💡 Recommendations:");
        for recommendation in &explanation.recommendations {
            println!("  • {recommendation}");
        }
    }

    if let Some(id) = log_id {
        println!();
        println!("Logged as detection #{id} (use --feedback {id} --correct|--incorrect)");
    }
}

fn run_training(config: &Config, seed: u64) {
    println!("🧠 Training models (seed {seed})...");
    let store = ArtifactStore::new(config.models_dir.clone());
    match train_models(&store, &config.data_dir, seed) {
        Ok(summary) => {
            println!(
                "✅ URL model: {} samples, training accuracy {:.1}%",
                summary.url_samples,
                summary.url_accuracy * 100.0
            );
            println!("   Saved to {}", summary.url_model_path.display());
            println!(
                "✅ Email model: {} samples, {} terms, training accuracy {:.1}%",
                summary.email_samples,
                summary.email_vocabulary,
                summary.email_accuracy * 100.0
            );
            println!("   Saved to {}", summary.email_model_path.display());
            println!("   Vectorizer saved to {}", summary.email_vectorizer_path.display());
        }
        Err(e) => {
            eprintln!("❌ Training failed: {e:#}");
            process::exit(1);
        }
    }
}

fn show_stats(detection_log: &DetectionLog) {
    let stats = match detection_log.stats() {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("❌ Error reading statistics: {e:#}");
            process::exit(1);
        }
    };

    println!("📊 PhishGuard Statistics");
    println!("═══════════════════════");
    println!("  Database: {}", detection_log.db_path().display());
    println!("  Total Scans: {}", stats.total_scans);
    if stats.total_scans > 0 {
        let phishing_pct = stats.phishing_detected as f64 / stats.total_scans as f64 * 100.0;
        println!(
            "  Phishing Detected: {} ({:.1}%)",
            stats.phishing_detected, phishing_pct
        );
        println!(
            "  Average Confidence: {:.1}%",
            stats.average_confidence * 100.0
        );
        for (kind, counts) in &stats.by_kind {
            println!(
                "  {kind}: {} phishing, {} safe",
                counts.phishing, counts.safe
            );
        }
    }
    if let (Some(first), Some(last)) = (stats.first_scan, stats.last_scan) {
        println!("  First Scan: {}", first.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("  Last Scan: {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    match stats.feedback_accuracy() {
        Some(accuracy) => println!(
            "  Feedback: {} entries, {:.1}% marked correct",
            stats.feedback_total,
            accuracy * 100.0
        ),
        None => println!("  Feedback: none recorded"),
    }
}

fn show_recent(detection_log: &DetectionLog, limit: usize) {
    let records = match detection_log.recent(limit) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("❌ Error reading detection log: {e:#}");
            process::exit(1);
        }
    };
    if records.is_empty() {
        println!("No detections recorded yet");
        return;
    }

    println!("{:<6} {:<20} {:<6} {:<10} {:>6}  Input", "ID", "Time", "Type", "Verdict", "Score");
    for record in records {
        println!(
            "{:<6} {:<20} {:<6} {:<10} {:>5.1}%  {}",
            record.id,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.kind,
            if record.is_phishing { "PHISHING" } else { "SAFE" },
            record.confidence * 100.0,
            truncate_string(&record.input.replace('\n', " "), 50)
        );
    }
}

fn open_log(config: &Config) -> DetectionLog {
    match DetectionLog::new(config.log_dir.clone(), config.logging.input_truncate_chars) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("❌ Error opening detection log: {e:#}");
            process::exit(1);
        }
    }
}

fn read_email(file: &str) -> String {
    let content = if file == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map(|_| buffer)
    } else {
        std::fs::read_to_string(file)
    };
    match content {
        Ok(content) => content,
        Err(e) => {
            eprintln!("❌ Error reading email file {file}: {e}");
            process::exit(1);
        }
    }
}

fn generate_default_config(path: &str) {
    match Config::write_default(Path::new(path)) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e:#}");
            process::exit(1);
        }
    }
}

fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
