use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use oci_ops_tools::audit::range::DEFAULT_CHUNK_DAYS;
use oci_ops_tools::commands;
use oci_ops_tools::commands::audit_export::ExportOptions;
use oci_ops_tools::commands::list_resources::ResourceKind;
use oci_ops_tools::commands::start_stop::{
    Action, PollSettings, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS,
};
use oci_ops_tools::config::DEFAULT_PROFILE;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "oci-ops")]
#[command(about = "Oracle Cloud Infrastructure operations tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export audit events for a date range to a JSON file
    ///
    /// The range is queried in windows of at most --chunk-days days. A window
    /// whose request fails is reported in the summary and the export continues.
    AuditExport {
        /// First day (YYYY-MM-DD, DD.MM.YYYY or DD.MM.YY)
        #[arg(long)]
        start: String,

        /// Last day, inclusive (same formats as --start)
        #[arg(long)]
        end: String,

        /// Output JSON file path
        #[arg(short, long)]
        output: String,

        /// Profile in the OCI config file
        #[arg(long, default_value = DEFAULT_PROFILE)]
        profile: String,

        /// Semicolon-separated regular expressions matched against the event name
        #[arg(long)]
        event_filter: Option<String>,

        /// OCI config file (default: $OCI_CONFIG_FILE or ~/.oci/config)
        #[arg(long)]
        config_file: Option<String>,

        /// Compartment to query (default: the profile's tenancy)
        #[arg(long)]
        compartment_id: Option<String>,

        /// Maximum days per query window
        #[arg(long, default_value_t = DEFAULT_CHUNK_DAYS)]
        chunk_days: i64,

        /// Field the filter matches, as JSON pointer or dotted path
        #[arg(long)]
        event_field: Option<String>,

        /// One event per line instead of indented JSON
        #[arg(long)]
        compact: bool,

        /// Write the run summary as JSON to this file
        #[arg(long)]
        summary: Option<String>,

        /// Retries per page on throttling and server errors
        #[arg(long, default_value = "0")]
        max_retries: u32,
    },

    /// Convert an exported event file to CSV
    EventsToCsv {
        /// Exported JSON file (.json, .json.gz or .json.zst)
        input: String,

        /// Output CSV file
        output: String,
    },

    /// Show the compartment tree
    Compartments {
        /// Profile in the OCI config file
        #[arg(long, default_value = DEFAULT_PROFILE)]
        profile: String,

        /// OCI config file (default: $OCI_CONFIG_FILE or ~/.oci/config)
        #[arg(long)]
        config_file: Option<String>,

        /// Root compartment (default: the profile's tenancy)
        #[arg(long)]
        root: Option<String>,

        /// Stop after this many compartments (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_compartments: usize,

        /// Output format: tree, json or csv
        #[arg(long, value_parser = ["tree", "json", "csv"])]
        format: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List resources in every compartment
    ListResources {
        /// Resource kind to list
        #[arg(long, value_enum)]
        resource: ResourceKind,

        /// Profile in the OCI config file
        #[arg(long, default_value = DEFAULT_PROFILE)]
        profile: String,

        /// OCI config file (default: $OCI_CONFIG_FILE or ~/.oci/config)
        #[arg(long)]
        config_file: Option<String>,

        /// Root compartment (default: the profile's tenancy)
        #[arg(long)]
        root: Option<String>,

        /// Stop after this many compartments (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_compartments: usize,

        /// Output file path
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List compute instances in one compartment
    ListInstances {
        /// Compartment OCID
        #[arg(long)]
        compartment_id: String,

        /// Profile in the OCI config file
        #[arg(long, default_value = DEFAULT_PROFILE)]
        profile: String,

        /// OCI config file (default: $OCI_CONFIG_FILE or ~/.oci/config)
        #[arg(long)]
        config_file: Option<String>,

        /// Print start-stop config entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start, stop or query instances listed in an instance config file
    StartStop {
        /// JSON instance config file
        #[arg(long)]
        config_file: String,

        /// Action to perform
        #[arg(long, value_enum, default_value = "status")]
        action: Action,

        /// Instance name as given in the config file
        #[arg(long)]
        instance: Option<String>,

        /// List the instance names in the config file
        #[arg(long)]
        list: bool,

        /// State checks after start/stop
        #[arg(long, default_value_t = DEFAULT_POLL_ATTEMPTS)]
        poll_attempts: u32,

        /// Seconds between state checks
        #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
        poll_interval: u64,
    },

    /// Generate shell completion scripts
    GenerateCompletion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::AuditExport {
            start,
            end,
            output,
            profile,
            event_filter,
            config_file,
            compartment_id,
            chunk_days,
            event_field,
            compact,
            summary,
            max_retries,
        } => {
            commands::audit_export::run(&ExportOptions {
                start: &start,
                end: &end,
                output: &output,
                profile: &profile,
                config_file: config_file.as_deref(),
                compartment_id: compartment_id.as_deref(),
                event_filter: event_filter.as_deref(),
                event_field: event_field.as_deref(),
                chunk_days,
                compact,
                summary: summary.as_deref(),
                max_retries,
            })
            .await
        }
        Commands::EventsToCsv { input, output } => commands::events_to_csv::run(&input, &output),
        Commands::Compartments {
            profile,
            config_file,
            root,
            max_compartments,
            format,
            output,
        } => {
            commands::compartments::run(
                config_file.as_deref(),
                &profile,
                root.as_deref(),
                max_compartments,
                format.as_deref(),
                output.as_deref(),
            )
            .await
        }
        Commands::ListResources {
            resource,
            profile,
            config_file,
            root,
            max_compartments,
            output,
        } => {
            commands::list_resources::run(
                config_file.as_deref(),
                &profile,
                resource,
                root.as_deref(),
                max_compartments,
                output.as_deref(),
            )
            .await
        }
        Commands::ListInstances {
            compartment_id,
            profile,
            config_file,
            json,
        } => {
            commands::list_instances::run(config_file.as_deref(), &profile, &compartment_id, json)
                .await
        }
        Commands::StartStop {
            config_file,
            action,
            instance,
            list,
            poll_attempts,
            poll_interval,
        } => {
            commands::start_stop::run(
                &config_file,
                action,
                instance.as_deref(),
                list,
                PollSettings {
                    attempts: poll_attempts,
                    interval: Duration::from_secs(poll_interval),
                },
            )
            .await
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "oci-ops", &mut std::io::stdout());
            Ok(())
        }
    }
}
