mod commands;
mod reader;
mod store;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};

use pbmig_core::{ChangeDescriptor, CollectionUpdate, MigrationConfig};
use reader::{parse_field, parse_rule, read_change, read_collection, read_fields, resolve_config};
use store::MigrationStore;

#[derive(Parser)]
#[command(
    name = "pbmig",
    version,
    about = "PocketBase migration generator: render, inspect and revert migration scripts"
)]
struct Cli {
    /// Migrations directory (overrides POCKETBASE_MIGRATIONS_DIR and the config file)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Project config file
    #[arg(long, global = true, default_value = reader::CONFIG_FILE)]
    config: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WriteArgs {
    /// Print the script instead of writing it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a collection from a JSON descriptor
    Create {
        /// Collection descriptor (name, type, fields, rules)
        descriptor: PathBuf,

        #[command(flatten)]
        write: WriteArgs,
    },

    /// Rename a collection or change its access rules
    Update {
        collection: String,

        /// New collection name
        #[arg(long)]
        rename: Option<String>,

        /// List rule ("null" clears it)
        #[arg(long)]
        list_rule: Option<String>,

        /// Create rule ("null" clears it)
        #[arg(long)]
        create_rule: Option<String>,

        /// Update rule ("null" clears it)
        #[arg(long)]
        update_rule: Option<String>,

        /// Delete rule ("null" clears it)
        #[arg(long)]
        delete_rule: Option<String>,

        #[command(flatten)]
        write: WriteArgs,
    },

    /// Delete a collection
    Delete {
        collection: String,

        #[command(flatten)]
        write: WriteArgs,
    },

    /// Add one field to a collection
    AddField {
        collection: String,

        /// Field descriptor as inline JSON
        field: String,

        #[command(flatten)]
        write: WriteArgs,
    },

    /// Remove one field from a collection by name
    RemoveField {
        collection: String,

        field: String,

        #[command(flatten)]
        write: WriteArgs,
    },

    /// Replace the whole field list of a collection
    UpdateFields {
        collection: String,

        /// JSON array of fields, or an object with a "fields" array
        fields: PathBuf,

        #[command(flatten)]
        write: WriteArgs,
    },

    /// Render any change descriptor (JSON tagged by "action")
    Render {
        change: PathBuf,

        #[command(flatten)]
        write: WriteArgs,
    },

    /// Validate a change descriptor and report diagnostics
    Validate {
        change: PathBuf,

        /// Output format: human (default) or json
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// List migration files, oldest first
    List,

    /// Print a migration file
    View { name: String },

    /// Classify a migration and print what it changes as JSON
    Inspect { name: String },

    /// Print the collection request a migration corresponds to
    Payload { name: String },

    /// Write a migration that undoes an existing one
    Revert {
        name: String,

        /// Refuse to write a revert that can only fail
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        write: WriteArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match resolve_config(
        cli.dir,
        Some(&cli.config),
        std::env::var(reader::MIGRATIONS_DIR_ENV).ok(),
    ) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    let store = MigrationStore::new(&config.migrations_dir, &config.extension);

    let result = match cli.command {
        Commands::Create { descriptor, write } => read_collection(&descriptor, &config)
            .and_then(|c| generate(ChangeDescriptor::Create(c), &config, &store, &write)),
        Commands::Update {
            collection,
            rename,
            list_rule,
            create_rule,
            update_rule,
            delete_rule,
            write,
        } => {
            let update = CollectionUpdate {
                new_name: rename,
                list_rule: list_rule.as_deref().map(parse_rule),
                create_rule: create_rule.as_deref().map(parse_rule),
                update_rule: update_rule.as_deref().map(parse_rule),
                delete_rule: delete_rule.as_deref().map(parse_rule),
            };
            generate(
                ChangeDescriptor::UpdateCollection { collection, update },
                &config,
                &store,
                &write,
            )
        }
        Commands::Delete { collection, write } => generate(
            ChangeDescriptor::Delete { collection },
            &config,
            &store,
            &write,
        ),
        Commands::AddField {
            collection,
            field,
            write,
        } => parse_field(&field).and_then(|field| {
            generate(
                ChangeDescriptor::AddField { collection, field },
                &config,
                &store,
                &write,
            )
        }),
        Commands::RemoveField {
            collection,
            field,
            write,
        } => generate(
            ChangeDescriptor::RemoveField { collection, field },
            &config,
            &store,
            &write,
        ),
        Commands::UpdateFields {
            collection,
            fields,
            write,
        } => read_fields(&fields).and_then(|fields| {
            generate(
                ChangeDescriptor::UpdateFields { collection, fields },
                &config,
                &store,
                &write,
            )
        }),
        Commands::Render { change, write } => read_change(&change, &config)
            .and_then(|change| generate(change, &config, &store, &write)),
        Commands::Validate { change, format } => {
            match read_change(&change, &config)
                .and_then(|change| commands::validate::run_validate(&change, &format))
            {
                Ok((output, error_count)) => {
                    println!("{output}");
                    if error_count > 0 {
                        process::exit(1);
                    }
                    return;
                }
                Err(e) => Err(e),
            }
        }
        Commands::List => commands::inspect::run_list(&store),
        Commands::View { name } => commands::inspect::run_view(&store, &name),
        Commands::Inspect { name } => commands::inspect::run_inspect(&store, &name),
        Commands::Payload { name } => commands::inspect::run_payload(&store, &name),
        Commands::Revert {
            name,
            strict,
            write,
        } => commands::revert::run_revert(&name, &config, &store, strict, write.dry_run),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => fail(&e),
    }
}

fn generate(
    change: ChangeDescriptor,
    config: &MigrationConfig,
    store: &MigrationStore,
    write: &WriteArgs,
) -> Result<String, String> {
    commands::generate::run_generate(&change, config, store, write.dry_run)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    process::exit(1);
}
