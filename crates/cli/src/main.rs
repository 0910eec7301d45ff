use clap::{Parser, Subcommand};
use megsync_core::{
    derive_destination_name, resolve, scan_subject_folders, ConfigFile, CopyDisposition,
    DispositionSink, FifMetadataReader, JsonLinesSink, RegistryProvider, SubjectId, SyncService,
    TeeSink, TracingSink, VisitCandidate, VisitFolderName, YamlRegistryFile,
};
use megsync_types::VisitDate;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "megsync")]
#[command(about = "MEG recording synchronisation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full synchronisation pass
    Sync {
        /// YAML configuration file
        #[arg(long)]
        config: PathBuf,
        /// Registry snapshot (overrides the configuration file)
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Also write the disposition log as JSON lines to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// List source archive folders with their subject verdict
    Subjects {
        /// YAML configuration file
        #[arg(long)]
        config: PathBuf,
    },
    /// Show the visit/paradigm groups resolved for one subject folder
    Resolve {
        /// YAML configuration file
        #[arg(long)]
        config: PathBuf,
        /// Subject folder name under the source root
        subject_folder: String,
    },
    /// Print the destination filename of a recording
    ReconcileName {
        /// Source recording filename
        filename: String,
        /// Visit folder name carrying the date token
        visit_folder: String,
        /// Apply the fixation renaming
        #[arg(long)]
        fixation: bool,
    },
    /// Check one visit against a registry snapshot
    CheckRegistry {
        /// Registry snapshot (YAML)
        #[arg(long)]
        registry: PathBuf,
        /// Subject id (six digits)
        subject: String,
        /// Visit date (YYYYMMDD)
        date: String,
        /// Paradigm name
        paradigm: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("megsync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Sync {
            config,
            registry,
            log_file,
        }) => {
            let file = ConfigFile::load(&config)?;
            let cfg = Arc::new(file.to_sync_config()?);
            let registry_path = registry
                .or(file.registry)
                .ok_or("no registry snapshot given (use --registry or set 'registry')")?;
            let snapshot = YamlRegistryFile::new(registry_path).fetch()?;
            let service = SyncService::new(cfg, FifMetadataReader, snapshot);

            let mut sink: Box<dyn DispositionSink> = match log_file {
                Some(path) => {
                    let writer = std::io::BufWriter::new(std::fs::File::create(&path)?);
                    Box::new(TeeSink::new(JsonLinesSink::new(writer), TracingSink))
                }
                None => Box::new(TracingSink),
            };
            let report = service.run(sink.as_mut())?;

            for disposition in CopyDisposition::ALL {
                println!("{}: {}", disposition, report.count(disposition));
            }
            println!("skipped subjects: {}", report.skipped_subjects.len());
            println!("skipped groups: {}", report.skipped_groups.len());
            for group in &report.skipped_groups {
                println!("  {} {}: {}", group.subject, group.key, group.reason);
            }
        }
        Some(Commands::Subjects { config }) => {
            let cfg = ConfigFile::load(&config)?.to_sync_config()?;
            let folders = scan_subject_folders(cfg.source_root())?;
            if folders.is_empty() {
                println!("No subject folders found.");
            }
            for folder in folders {
                let verdict = if folder.subject.is_some() { "valid" } else { "invalid" };
                println!("{}\t{}", folder.name, verdict);
            }
        }
        Some(Commands::Resolve {
            config,
            subject_folder,
        }) => {
            let cfg = ConfigFile::load(&config)?.to_sync_config()?;
            let groups = resolve(
                &cfg.source_root().join(&subject_folder),
                cfg.years(),
                cfg.paradigms(),
            )?;
            if groups.is_empty() {
                println!("No recordings of interest in {}.", subject_folder);
            }
            for (key, files) in groups {
                println!("{}", key);
                for file in files {
                    println!("  {}", file);
                }
            }
        }
        Some(Commands::ReconcileName {
            filename,
            visit_folder,
            fixation,
        }) => {
            let visit = VisitFolderName::parse(&visit_folder);
            match derive_destination_name(&filename, &visit, fixation) {
                Ok(name) => println!("{}", name),
                Err(e) => {
                    eprintln!("Error reconciling {}: {}", filename, e);
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::CheckRegistry {
            registry,
            subject,
            date,
            paradigm,
        }) => {
            let subject = SubjectId::from_folder_name(&subject)
                .ok_or_else(|| format!("'{}' is not a valid subject id", subject))?;
            let candidate = VisitCandidate {
                date: VisitDate::parse_compact(&date)?,
                paradigm,
            };
            let snapshot = YamlRegistryFile::new(registry).fetch()?;
            if snapshot.is_inconsistent(&subject, &candidate) {
                println!("inconsistent");
                std::process::exit(1);
            }
            println!("consistent");
        }
        None => {
            println!("Use 'megsync --help' for commands");
        }
    }

    Ok(())
}
