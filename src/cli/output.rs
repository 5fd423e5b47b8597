//! Colored output helpers for CLI

use owo_colors::OwoColorize;

use crate::rag::ingest::IngestReport;
use crate::types::{AnswerResponse, AppError, Translation};
use crate::utils::config::RedactedConfig;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n",
                "ragbot".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n   ragbot v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "Hint:".yellow().bold(), message.italic());
        } else {
            eprintln!("  [HINT] {}", message);
        }
    }

    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Prints the error and, on its own line, the remediation hint if any.
    pub fn failure(&self, err: &AppError) {
        self.error(&err.root().to_string());
        if let Some(hint) = err.hint() {
            self.hint(hint);
        }
    }

    pub fn ingest_report(&self, report: &IngestReport) {
        self.success(&format!(
            "Ingested {} chunks into '{}'",
            report.chunks, report.collection
        ));
        self.kv("source", &report.source);
        self.kv(
            "embeddings",
            &format!("{}/{}", report.embedding_provider, report.embedding_model),
        );
        self.kv("duration", &format!("{} ms", report.duration_ms));
    }

    pub fn answer(&self, response: &AnswerResponse) {
        self.header("Answer");
        println!("\n{}\n", response.answer);
        self.header("Sources");
        for source in &response.sources {
            self.list_item(source);
        }
        if response.sources.is_empty() {
            self.warning("no passages were retrieved");
        }
    }

    pub fn translation(&self, translation: &Translation) {
        self.header("Translation");
        self.kv("原文", &translation.original);
        self.kv("译文", &translation.translation);
        self.kv("例句", &translation.example);
    }

    pub fn report(&self, report: &str) {
        self.header("Weekly report");
        println!("\n{}\n", report);
    }

    pub fn config(&self, config: &RedactedConfig<'_>) {
        self.header("Configuration");
        for (key, value) in config.rows() {
            self.kv(key, &value);
        }
    }
}
