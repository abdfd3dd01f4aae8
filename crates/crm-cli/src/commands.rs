use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use crossbeam_channel::unbounded;
use tracing::{info, info_span, trace, warn};

use crm_cli::inputs::{
    build_configuration, check_signature, load_describe, load_mapping, select_record_type,
};
use crm_cli::logging::redact_value;
use crm_cli::settings::{ACCESS_TOKEN_ENV, LLM_API_KEY_ENV, Settings};
use crm_ingest::{import_csv, import_csv_with_sample, preview, read_records, write_template};
use crm_load::{
    LoadExecutor, LoadRequest, LoadUpdate, RestConnection, SessionToken, SharedSession,
    StaticToken, fetch_catalog, fetch_layout_fields, fetch_object, sample_object, sample_records,
    spawn_load,
};
use crm_map::{LlmProvider, MappingRepository, MappingResolver, save_to_path};
use crm_model::{LoadOperation, search_objects};
use crm_transform::RecordTransformer;
use crm_validate::validate_mapping;

use crate::cli::{
    ConnectionArgs, ConvertArgs, ImportArgs, LoadArgs, ObjectsArgs, ProviderArg, SampleArgs,
    SuggestArgs, TemplateArgs, ValidateArgs,
};
use crate::summary::{
    LoadProgressView, print_dataset, print_load_result, print_mappings, print_objects,
    print_records, print_resolution, print_sample, print_validation,
};

/// How a command finished when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Completed, but found validation errors or failed rows.
    Issues,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::Issues => 1,
        }
    }
}

pub fn run_import(args: &ImportArgs) -> Result<Outcome> {
    let dataset = import_csv_with_sample(&args.file, args.sample)?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&dataset).context("serialize dataset")?
        );
    } else {
        print_dataset(&dataset);
    }
    Ok(Outcome::Success)
}

pub fn run_suggest(settings: &Settings, args: &SuggestArgs) -> Result<Outcome> {
    let dataset = import_csv(&args.file)?;
    let object = load_describe(&args.schema.describe, args.schema.record_types.as_deref())?;

    let mut config = settings.resolver_config(std::env::var(LLM_API_KEY_ENV).ok());
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if args.no_semantic {
        config.use_semantic = false;
    }
    if args.llm {
        config.use_llm = true;
    }
    if let Some(provider) = args.llm_provider {
        config.llm_provider = match provider {
            ProviderArg::Claude => LlmProvider::Claude,
            ProviderArg::OpenAi => LlmProvider::OpenAi,
        };
    }
    if config.use_llm && !config.llm_ready() {
        warn!("LLM matching requested but no API key found; set {LLM_API_KEY_ENV}");
    }

    let mut resolver = MappingResolver::new(&config);
    let resolution = resolver.resolve(&dataset, &object);
    print_resolution(&resolution, &object);

    let validation = validate_mapping(&resolution.mappings, &object);
    println!();
    print_validation(&validation);

    if let Some(name) = &args.save {
        let saved = build_configuration(
            name,
            &object.name,
            &resolution.mappings,
            &dataset.column_names(),
        )
        .with_description(args.description.clone().unwrap_or_default());
        let path = match &args.output {
            Some(path) => {
                save_to_path(&saved, path)?;
                path.clone()
            }
            None => MappingRepository::new(settings.mappings_dir()).save(&saved)?,
        };
        println!("Saved mapping '{name}' to {}", path.display());
    }
    Ok(Outcome::Success)
}

pub fn run_validate(settings: &Settings, args: &ValidateArgs) -> Result<Outcome> {
    let repository = MappingRepository::new(settings.mappings_dir());
    let config = load_mapping(&args.mapping, &repository)?;
    let object = load_describe(&args.schema.describe, args.schema.record_types.as_deref())?;
    if config.salesforce_object != object.name {
        warn!(
            mapping_object = %config.salesforce_object,
            describe_object = %object.name,
            "Mapping was built for a different object"
        );
    }

    if let Some(source) = &args.source {
        let dataset = import_csv(source)?;
        let missing = check_signature(&config, &dataset.column_names());
        if !missing.is_empty() {
            println!("Source file is missing expected columns: {}", missing.join(", "));
        }
    }

    let result = validate_mapping(&config.mappings, &object);
    print_validation(&result);
    Ok(if result.has_errors() {
        Outcome::Issues
    } else {
        Outcome::Success
    })
}

pub fn run_convert(settings: &Settings, args: &ConvertArgs) -> Result<Outcome> {
    let repository = MappingRepository::new(settings.mappings_dir());
    let config = load_mapping(&args.mapping, &repository)?;
    let object = load_describe(&args.schema.describe, args.schema.record_types.as_deref())?;
    let rows = preview(&args.file, args.limit)?;

    for (idx, row) in rows.iter().enumerate() {
        for mapping in &config.mappings {
            if let Some(raw) = row.get(&mapping.source_column) {
                trace!(
                    row = idx + 1,
                    column = %mapping.source_column,
                    value = redact_value(raw),
                    "Source value"
                );
            }
        }
    }

    let operation: LoadOperation = args.operation.into();
    let records = RecordTransformer::new(&object, &config.mappings, operation).transform_all(&rows);
    print_records(&records);
    Ok(Outcome::Success)
}

pub fn run_template(args: &TemplateArgs) -> Result<Outcome> {
    let object = load_describe(&args.schema.describe, args.schema.record_types.as_deref())?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}_template.csv", object.name)));
    let fields = write_template(&object, &output, args.include_optional, args.sample_row)?;
    println!(
        "Wrote {} column template for {} to {}",
        fields.len(),
        object.name,
        output.display()
    );
    Ok(Outcome::Success)
}

pub fn run_load(settings: &Settings, args: &LoadArgs) -> Result<Outcome> {
    let repository = MappingRepository::new(settings.mappings_dir());
    let config = load_mapping(&args.mapping, &repository)?;
    let operation: LoadOperation = args.operation.into();
    let _span = info_span!("load_command", mapping = %config.name, %operation).entered();

    let dataset = import_csv(&args.file)?;
    let missing = check_signature(&config, &dataset.column_names());
    if !missing.is_empty() {
        println!("Warning: source file is missing columns: {}", missing.join(", "));
    }

    let session = connect(settings, &args.connection)?;
    let object = fetch_object(&session, &config.salesforce_object)?;

    let validation = validate_mapping(&config.mappings, &object);
    if validation.has_errors() || validation.has_warnings() {
        print_validation(&validation);
    }
    if validation.has_errors() && !args.force {
        println!("Fix the mapping errors or pass --force to load anyway.");
        return Ok(Outcome::Issues);
    }

    let record_type_id = select_record_type(&object, args.record_type.as_deref())?;
    let rows = read_records(&args.file)?;
    info!(rows = rows.len(), object = %object.name, "Read source rows");
    let total = rows.len();
    let object_name = object.name.clone();
    let request = LoadRequest::new(object, config.mappings.clone(), rows, operation)
        .with_record_type(record_type_id);

    let (sender, receiver) = unbounded();
    let handle = spawn_load(LoadExecutor::new(session), request, sender);
    let view = LoadProgressView::new(total);
    let mut outcome = None;
    for update in receiver.iter() {
        view.apply(&update);
        match update {
            LoadUpdate::Complete(result) => outcome = Some(Ok(result)),
            LoadUpdate::Cancelled => outcome = Some(Err(anyhow!("load cancelled"))),
            LoadUpdate::Error(error) => outcome = Some(Err(anyhow!(error))),
            _ => {}
        }
    }
    handle
        .join()
        .map_err(|_| anyhow!("load thread panicked"))?;

    let result = outcome.ok_or_else(|| anyhow!("load finished without a result"))??;
    print_load_result(&object_name, &result);
    Ok(if result.failed_rows > 0 {
        Outcome::Issues
    } else {
        Outcome::Success
    })
}

pub fn run_objects(settings: &Settings, args: &ObjectsArgs) -> Result<Outcome> {
    let session = connect(settings, &args.connection)?;
    let objects = fetch_catalog(&session, !args.no_custom, !args.no_standard)?;
    let shown = match args.search.as_deref() {
        Some(query) => search_objects(query, &objects),
        None => objects.iter().collect(),
    };
    print_objects(&shown);
    Ok(Outcome::Success)
}

pub fn run_sample(settings: &Settings, args: &SampleArgs) -> Result<Outcome> {
    let session = connect(settings, &args.connection)?;
    let object = fetch_object(&session, &args.object)?;
    let record_type_id = select_record_type(&object, args.record_type.as_deref())?;

    let sample = if !args.fields.is_empty() {
        let unknown: Vec<&str> = args
            .fields
            .iter()
            .map(String::as_str)
            .filter(|name| !object.has_field(name))
            .collect();
        if !unknown.is_empty() {
            bail!("unknown field(s) on {}: {}", object.name, unknown.join(", "));
        }
        sample_records(&session, &object.name, &args.fields, args.limit, record_type_id.as_deref())?
    } else {
        let layout = if args.layout {
            let fields = fetch_layout_fields(&session, &object.name, record_type_id.as_deref())?;
            if fields.is_empty() {
                println!("No page layout found; showing the default field selection.");
            }
            Some(fields)
        } else {
            None
        };
        sample_object(
            &session,
            &object,
            args.limit,
            record_type_id.as_deref(),
            layout.as_deref(),
        )?
    };

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&sample).context("serialize sample")?
        );
    } else {
        print_sample(&object.name, &sample);
    }
    Ok(Outcome::Success)
}

pub fn run_mappings(settings: &Settings) -> Result<Outcome> {
    let repository = MappingRepository::new(settings.mappings_dir());
    let configs = repository.list()?;
    print_mappings(&configs);
    Ok(Outcome::Success)
}

fn connect(settings: &Settings, args: &ConnectionArgs) -> Result<SharedSession<RestConnection>> {
    let Some(instance_url) = args
        .instance_url
        .clone()
        .or_else(|| settings.connection.instance_url.clone())
    else {
        bail!("no instance URL; pass --instance-url or set [connection] instance_url");
    };
    let Some(access_token) = args
        .access_token
        .clone()
        .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
        .or_else(|| settings.connection.access_token.clone())
        .filter(|token| !token.trim().is_empty())
    else {
        bail!("no access token; pass --access-token or set {ACCESS_TOKEN_ENV}");
    };

    let token = SessionToken {
        instance_url,
        access_token,
    };
    let connection = RestConnection::connect(Box::new(StaticToken(token)))
        .map_err(|error| anyhow!("{}: {error}", error.user_message()))?;
    Ok(SharedSession::new(connection))
}
