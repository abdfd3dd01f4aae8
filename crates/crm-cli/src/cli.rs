//! CLI argument definitions for `crm-migrate`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use crm_model::LoadOperation;

#[derive(Parser)]
#[command(
    name = "crm-migrate",
    version,
    about = "Map spreadsheet columns to CRM fields and load the data",
    long_about = "Map spreadsheet columns to CRM object fields and load the data.\n\n\
                  Mappings are proposed by name similarity, sentence embeddings and\n\
                  optionally a language model, validated against the object schema,\n\
                  and loaded record by record or through the Bulk API."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow source cell values in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Settings file (default: platform config folder).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect a CSV file: columns, inferred types, samples.
    Import(ImportArgs),

    /// Propose column-to-field mappings for a CSV file.
    Suggest(SuggestArgs),

    /// Check a saved mapping against an object describe.
    Validate(ValidateArgs),

    /// Preview converted records without loading them.
    Convert(ConvertArgs),

    /// Write a CSV template for an object.
    Template(TemplateArgs),

    /// Load a CSV file into a live org.
    Load(LoadArgs),

    /// List objects available in a live org.
    Objects(ObjectsArgs),

    /// Show existing records of an object in a live org.
    Sample(SampleArgs),

    /// List saved mapping configurations.
    Mappings,
}

#[derive(Args)]
pub struct ImportArgs {
    #[arg(value_name = "CSV")]
    pub file: PathBuf,

    /// Rows sampled for type inference.
    #[arg(long, default_value_t = crm_ingest::DEFAULT_SAMPLE_SIZE)]
    pub sample: usize,

    /// Print the dataset profile as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Object schema input: a describe JSON file plus optional record types.
#[derive(Args)]
pub struct SchemaArgs {
    /// Object describe JSON (`GET /sobjects/{object}/describe`).
    #[arg(long, value_name = "PATH")]
    pub describe: PathBuf,

    /// Record type query result (`{"records": [...]}`).
    #[arg(long = "record-types", value_name = "PATH")]
    pub record_types: Option<PathBuf>,
}

#[derive(Args)]
pub struct SuggestArgs {
    #[arg(value_name = "CSV")]
    pub file: PathBuf,

    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Minimum confidence (overrides settings).
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Skip the embedding stage.
    #[arg(long = "no-semantic")]
    pub no_semantic: bool,

    /// Enable the language-model stage.
    #[arg(long)]
    pub llm: bool,

    /// Language-model provider (overrides settings).
    #[arg(long = "llm-provider", value_enum)]
    pub llm_provider: Option<ProviderArg>,

    /// Save the mappings under this configuration name.
    #[arg(long, value_name = "NAME")]
    pub save: Option<String>,

    /// Write the configuration to this file instead of the mapping folder.
    #[arg(long, value_name = "PATH", requires = "save")]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Mapping file path or saved configuration name.
    #[arg(long, value_name = "FILE|NAME")]
    pub mapping: String,

    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Source file to check against the saved column signature.
    #[arg(long, value_name = "CSV")]
    pub source: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConvertArgs {
    #[arg(value_name = "CSV")]
    pub file: PathBuf,

    /// Mapping file path or saved configuration name.
    #[arg(long, value_name = "FILE|NAME")]
    pub mapping: String,

    #[command(flatten)]
    pub schema: SchemaArgs,

    #[arg(long, value_enum, default_value = "insert")]
    pub operation: OperationArg,

    /// Number of rows to convert.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Args)]
pub struct TemplateArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,

    /// Output CSV path (default: `{object}_template.csv`).
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Include common optional fields.
    #[arg(long = "include-optional")]
    pub include_optional: bool,

    /// Add a second row describing each column.
    #[arg(long = "sample-row")]
    pub sample_row: bool,
}

/// Org connection flags. Unset values fall back to settings.
#[derive(Args)]
pub struct ConnectionArgs {
    #[arg(long = "instance-url", value_name = "URL")]
    pub instance_url: Option<String>,

    /// Access token (also read from CRM_MIGRATE_ACCESS_TOKEN).
    #[arg(long = "access-token", value_name = "TOKEN")]
    pub access_token: Option<String>,
}

#[derive(Args)]
pub struct LoadArgs {
    #[arg(value_name = "CSV")]
    pub file: PathBuf,

    /// Mapping file path or saved configuration name.
    #[arg(long, value_name = "FILE|NAME")]
    pub mapping: String,

    #[arg(long, value_enum, default_value = "insert")]
    pub operation: OperationArg,

    /// Record type id, developer name or label.
    #[arg(long = "record-type")]
    pub record_type: Option<String>,

    /// Load even when the mapping has validation errors.
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args)]
pub struct ObjectsArgs {
    /// Filter by name or label.
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long = "no-custom")]
    pub no_custom: bool,

    #[arg(long = "no-standard")]
    pub no_standard: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args)]
pub struct SampleArgs {
    /// Object API name.
    pub object: String,

    #[arg(long, default_value_t = crm_load::DEFAULT_SAMPLE_LIMIT)]
    pub limit: usize,

    /// Only records of this record type (id, developer name or label).
    #[arg(long = "record-type")]
    pub record_type: Option<String>,

    /// Show the fields on the page layout instead of the default selection.
    #[arg(long)]
    pub layout: bool,

    /// Query these fields instead (repeatable).
    #[arg(long = "field", value_name = "FIELD", conflicts_with = "layout")]
    pub fields: Vec<String>,

    /// Print the records as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OperationArg {
    Insert,
    Update,
}

impl From<OperationArg> for LoadOperation {
    fn from(value: OperationArg) -> Self {
        match value {
            OperationArg::Insert => LoadOperation::Insert,
            OperationArg::Update => LoadOperation::Update,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ProviderArg {
    Claude,
    #[value(name = "openai")]
    OpenAi,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
