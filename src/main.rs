//! Page Composer CLI
//!
//! Usage:
//!   page-composer manifest <FILE> [--name N] [--allow-duplicates] [--min-slots N] [--max-slots N] [--no-style-check]
//!   page-composer compose --site <TOML> <PAGE_ID>
//!   page-composer validate --site <TOML> [LAYOUT]
//!   page-composer scope <CSS FILE> --scope <ID>

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use page_composer::{
    css, parse_template, Diagnostic, PageId, ParseOptions, Site, TemplateDocument,
};

#[derive(Parser)]
#[command(name = "page-composer")]
#[command(about = "Layout templates and page inheritance for tree-structured sites")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log at trace level
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a layout template and print its slot manifest as JSON
    Manifest {
        /// Template file (reads from stdin if not provided)
        input: Option<PathBuf>,

        /// Layout name; defaults to the file stem
        #[arg(short, long)]
        name: Option<String>,

        /// Keep the first of each duplicated slot name instead of failing
        #[arg(long)]
        allow_duplicates: bool,

        #[arg(long)]
        min_slots: Option<usize>,

        #[arg(long)]
        max_slots: Option<usize>,

        /// Skip scanning the template's style text
        #[arg(long)]
        no_style_check: bool,
    },

    /// Resolve a page of a site and print its effective composition as JSON
    Compose {
        /// Site configuration (TOML)
        #[arg(short, long)]
        site: PathBuf,

        page_id: u64,
    },

    /// Print diagnostics for one or all layouts of a site
    Validate {
        #[arg(short, long)]
        site: PathBuf,

        layout: Option<String>,
    },

    /// Rewrite a stylesheet so it only applies inside a scope
    Scope {
        input: PathBuf,

        #[arg(short, long)]
        scope: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PAGE_COMPOSER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();

    let code = match cli.command {
        Commands::Manifest {
            input,
            name,
            allow_duplicates,
            min_slots,
            max_slots,
            no_style_check,
        } => {
            let mut options = ParseOptions::new()
                .with_duplicate_slots(allow_duplicates)
                .with_style_validation(!no_style_check);
            options.min_slots = min_slots;
            options.max_slots = max_slots;
            manifest(input.as_deref(), name, &options)
        }
        Commands::Compose { site, page_id } => compose(&site, page_id),
        Commands::Validate { site, layout } => validate(&site, layout.as_deref()),
        Commands::Scope { input, scope } => scope_file(&input, &scope),
    };

    std::process::exit(code);
}

fn read_input(input: Option<&Path>) -> Result<String, String> {
    match input {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Error reading file '{}': {}", path.display(), e)),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map(|_| buffer)
                .map_err(|e| format!("Error reading from stdin: {}", e))
        }
    }
}

fn load_site(path: &Path) -> Result<Site, String> {
    let site = Site::from_file(path)
        .map_err(|e| format!("Error loading site '{}': {}", path.display(), e))?;
    for diagnostic in &site.report.diagnostics {
        eprintln!("{}", diagnostic);
    }
    for failure in &site.report.failures {
        eprintln!("Error in module '{}': {}", failure.module, failure.error);
    }
    Ok(site)
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
}

fn manifest(input: Option<&Path>, name: Option<String>, options: &ParseOptions) -> i32 {
    let source = match read_input(input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let filename = input
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());
    let name = name
        .or_else(|| input.and_then(|p| p.file_stem()).map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "layout".to_string());

    match parse_template(&TemplateDocument::new(name, source.as_str()), options) {
        Ok(layout) => {
            print_diagnostics(&layout.parsing_diagnostics);
            match layout.slot_manifest.to_json() {
                Ok(json) => {
                    println!("{}", json);
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }
        Err(e) => {
            eprint!("{}", e.format(&source, &filename));
            1
        }
    }
}

fn compose(site_path: &Path, page_id: u64) -> i32 {
    let site = match load_site(site_path) {
        Ok(site) => site,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    match site.compose(PageId(page_id)) {
        Ok(composition) => {
            print_diagnostics(&composition.diagnostics());
            match composition.to_json() {
                Ok(json) => {
                    println!("{}", json);
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn validate(site_path: &Path, layout: Option<&str>) -> i32 {
    let site = match load_site(site_path) {
        Ok(site) => site,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let names: Vec<String> = match layout {
        Some(name) => vec![name.to_string()],
        None => site
            .registry
            .list_layouts()
            .iter()
            .map(|l| l.name.clone())
            .collect(),
    };

    let mut code = 0;
    for name in names {
        match site.registry.validate_layout(&name) {
            Ok(diagnostics) if diagnostics.is_empty() => println!("{}: ok", name),
            Ok(diagnostics) => {
                println!("{}: {} diagnostic(s)", name, diagnostics.len());
                for diagnostic in diagnostics {
                    println!("  {}", diagnostic);
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                code = 1;
            }
        }
    }
    code
}

fn scope_file(input: &Path, scope_id: &str) -> i32 {
    let source = match read_input(Some(input)) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    match css::scope(&source, scope_id) {
        Ok(scoped) => {
            print!("{}", scoped.css);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}
