//! svcdef CLI
//!
//! Command-line interface for recovering HTTP bindings and doc comments from
//! protobuf service definitions.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use svcdef_common::{Annotation, HttpBinding, Method, OutputFormat, ProjectConfig, Service};
use svcdef_parser::{parse_sources, DescriptorSource, ParsedFile, SourceFile};
use svcdef_resolver::Workspace;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "svcdef")]
#[command(version, about = "Recover HTTP bindings and doc comments from protobuf services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve services against a descriptor set and show where every request
    /// field travels
    #[command(after_help = "EXAMPLES:\n  \
        # Compile the descriptor set first\n  \
        protoc --include_imports --include_source_info -o set.pb sum.proto\n\n  \
        # Show the resolved bindings\n  \
        svcdef parse --descriptor set.pb --source sum.proto\n\n  \
        # Use a project file and print JSON\n  \
        svcdef parse --config svcdef.yaml --json")]
    Parse {
        /// Binary FileDescriptorSet (protoc -o)
        #[arg(short, long)]
        descriptor: Option<PathBuf>,

        /// .proto file to scan for a service (repeatable)
        #[arg(short, long = "source")]
        sources: Vec<PathBuf>,

        /// Project file (svcdef.yaml); flags override its settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the resolved tree as JSON
        #[arg(long)]
        json: bool,

        /// Parse source files on separate threads
        #[arg(long)]
        parallel: bool,

        /// Check descriptor cross-references before resolving
        #[arg(long)]
        validate: bool,
    },

    /// Parse service blocks only, without a descriptor set
    Inspect {
        /// .proto file to scan for a service (repeatable)
        #[arg(short, long = "source", required = true)]
        sources: Vec<PathBuf>,

        /// Print the parsed tree as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Effective settings for `parse` after merging the project file and flags
#[derive(Debug, Clone, PartialEq)]
struct ParseSettings {
    descriptor: PathBuf,
    sources: Vec<PathBuf>,
    parallel: bool,
    validate: bool,
    output: OutputFormat,
}

struct ParseFlags {
    descriptor: Option<PathBuf>,
    sources: Vec<PathBuf>,
    json: bool,
    parallel: bool,
    validate: bool,
}

impl ParseSettings {
    fn merge(config: Option<ProjectConfig>, flags: ParseFlags) -> Result<Self> {
        let config = config.unwrap_or_default();

        let Some(descriptor) = flags.descriptor.or(config.descriptor) else {
            bail!("No descriptor set given (use --descriptor or `descriptor:` in the project file)");
        };
        let sources = if flags.sources.is_empty() {
            config.sources
        } else {
            flags.sources
        };
        if sources.is_empty() {
            bail!("No source files given (use --source or `sources:` in the project file)");
        }

        Ok(Self {
            descriptor,
            sources,
            parallel: flags.parallel || config.parallel,
            validate: flags.validate || config.validate,
            output: if flags.json {
                OutputFormat::Json
            } else {
                config.output
            },
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Parse {
            descriptor,
            sources,
            config,
            json,
            parallel,
            validate,
        } => {
            let project = match config {
                Some(path) => Some(
                    ProjectConfig::load(&path)
                        .with_context(|| format!("Failed to load project file {}", path.display()))?,
                ),
                None => None,
            };
            let settings = ParseSettings::merge(
                project,
                ParseFlags {
                    descriptor,
                    sources,
                    json,
                    parallel,
                    validate,
                },
            )?;
            parse_command(&settings, cli.verbose)?;
        }
        Commands::Inspect { sources, json } => {
            inspect_command(&sources, json)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "svcdef=debug" } else { "svcdef=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_command(settings: &ParseSettings, verbose: bool) -> Result<()> {
    tracing::debug!(?settings, "effective settings");
    let json = settings.output == OutputFormat::Json;
    if !json {
        println!(
            "{} Loading descriptor set: {}",
            "→".cyan(),
            settings.descriptor.display()
        );
    }

    let descriptors = DescriptorSource::from_file(&settings.descriptor)
        .context("Failed to load FileDescriptorSet")?;
    if settings.validate {
        descriptors
            .validate()
            .context("Descriptor set failed validation")?;
        if !json {
            println!("{} Descriptor references check out", "✓".green());
        }
    }

    let sources = read_sources(&settings.sources)?;
    let workspace = Workspace::load(&descriptors, &sources, settings.parallel)
        .context("Failed to resolve services")?;

    if json {
        println!("{}", workspace.to_json().context("Failed to serialize")?);
        return Ok(());
    }

    let catalog = workspace.catalog();
    println!("\n{}", "✓ Resolution successful!".green().bold());
    println!(
        "  Services: {}  Messages: {}  Enums: {}",
        workspace.files().len(),
        catalog.messages().len(),
        catalog.enums().len()
    );

    let dangling = catalog.dangling_fields();
    if !dangling.is_empty() {
        println!(
            "{} {} field(s) reference types missing from the descriptor set",
            "!".yellow(),
            dangling.len()
        );
        if verbose {
            for id in dangling {
                let message = catalog.message(id.message);
                let field = catalog.field(id);
                println!(
                    "    {}.{} ({})",
                    message.full_name,
                    field.name,
                    field.field_type.name
                );
            }
        }
    }

    for file in workspace.files() {
        print_service(&file.service, &file.file, verbose);
    }

    Ok(())
}

fn inspect_command(paths: &[PathBuf], json: bool) -> Result<()> {
    let sources = read_sources(paths)?;
    let parsed = parse_sources(&sources, false).context("Failed to parse service definitions")?;

    if json {
        let services: Vec<&Service> = parsed.iter().filter_map(|p| p.service.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&services)?);
        return Ok(());
    }

    println!("\n{}", "✓ Parse successful!".green().bold());
    for ParsedFile { name, service } in &parsed {
        match service {
            Some(service) => print_service(service, name, true),
            None => println!("\n{} {}", name.bold(), "(no service)".dimmed()),
        }
    }
    Ok(())
}

fn read_sources(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    paths
        .iter()
        .map(|path| read_source(path))
        .collect()
}

fn read_source(path: &Path) -> Result<SourceFile> {
    SourceFile::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_service(service: &Service, file: &str, verbose: bool) {
    println!("\n{} {}", service.name.yellow().bold(), format!("({})", file).dimmed());
    for method in &service.methods {
        print_method(method, verbose);
    }
}

fn print_method(method: &Method, verbose: bool) {
    let request = stream_prefix(method.request_streaming, &method.request_type);
    let response = stream_prefix(method.response_streaming, &method.response_type);
    println!("  • {}({}) → {}", method.name.cyan(), request, response);

    if verbose && !method.description.is_empty() {
        for line in method.description.lines() {
            println!("      {}", line.dimmed());
        }
    }
    if method.annotation == Annotation::Missing {
        println!("      {}", "no HTTP annotation".dimmed());
    }
    for binding in &method.bindings {
        print_binding(binding);
    }
}

fn print_binding(binding: &HttpBinding) {
    match binding.declared_route() {
        Some(_) if !binding.verb.is_empty() => {
            println!("      {} {}", binding.verb.to_uppercase().green(), binding.path)
        }
        Some((verb, path)) => println!("      {} {}", verb.to_uppercase().green(), path),
        None => println!("      {}", "(no verb)".red()),
    }

    // Unresolved trees only carry the raw option fields
    if binding.params.is_empty() {
        for field in &binding.fields {
            println!("        {}: {}", field.kind, field.value);
        }
        return;
    }
    for param in &binding.params {
        println!("        {:<16} {}", param.name, param.location);
    }
}

fn stream_prefix(streaming: bool, name: &str) -> String {
    if streaming {
        format!("stream {}", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> ParseFlags {
        ParseFlags {
            descriptor: None,
            sources: vec![],
            json: false,
            parallel: false,
            validate: false,
        }
    }

    #[test]
    fn test_flags_override_project_file() {
        let config = ProjectConfig {
            version: 1,
            descriptor: Some(PathBuf::from("/p/set.pb")),
            sources: vec![PathBuf::from("/p/a.proto")],
            validate: true,
            ..Default::default()
        };
        let settings = ParseSettings::merge(
            Some(config),
            ParseFlags {
                sources: vec![PathBuf::from("b.proto")],
                json: true,
                ..flags()
            },
        )
        .unwrap();

        assert_eq!(settings.descriptor, PathBuf::from("/p/set.pb"));
        assert_eq!(settings.sources, vec![PathBuf::from("b.proto")]);
        assert!(settings.validate);
        assert!(!settings.parallel);
        assert_eq!(settings.output, OutputFormat::Json);
    }

    #[test]
    fn test_missing_inputs_are_errors() {
        assert!(ParseSettings::merge(None, flags()).is_err());
        let only_descriptor = ParseFlags {
            descriptor: Some(PathBuf::from("set.pb")),
            ..flags()
        };
        assert!(ParseSettings::merge(None, only_descriptor).is_err());
    }
}
