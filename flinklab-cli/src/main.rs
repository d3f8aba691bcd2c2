use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use flinklab_aws::provider::{json_to_value, value_to_json};
use flinklab_aws::{AwsProvider, ImageQuery};
use flinklab_core::differ::create_plan;
use flinklab_core::effect::Effect;
use flinklab_core::graph::{destroy_order, verify_declaration_order};
use flinklab_core::plan::Plan;
use flinklab_core::provider::Provider;
use flinklab_core::record::{Record, RecordId, RemoteState, Value};
use flinklab_stack::topology::DEFAULT_KEY_NAME;
use flinklab_stack::{StackConfig, desired_records, resolve_outputs};
use flinklab_state::{LocalBackend, RecordState, StateBackend, StateFile};

#[derive(Parser)]
#[command(name = "flinklab")]
#[command(about = "Provision the Flink/DynamoDB lab sandbox", long_about = None)]
struct Cli {
    /// Name of the pre-existing key pair the instance launches with
    #[arg(long, global = true, default_value = DEFAULT_KEY_NAME)]
    key_name: String,

    /// Path to the state file
    #[arg(long, global = true, default_value = LocalBackend::DEFAULT_STATE_FILE)]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the topology without touching the target environment
    Validate,
    /// Show the execution plan without applying changes
    Plan,
    /// Apply changes to reach the declared state
    Apply,
    /// Destroy all records declared in the topology
    Destroy {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Print the outputs of the last successful apply
    Outputs,
    /// Force-release a stuck state lock
    ForceUnlock {
        /// Lock ID shown in the lock error
        lock_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate => run_validate(&cli.key_name).await,
        Commands::Plan => run_plan(&cli.key_name, &cli.state).await,
        Commands::Apply => run_apply(&cli.key_name, &cli.state).await,
        Commands::Destroy { auto_approve } => {
            run_destroy(&cli.key_name, &cli.state, auto_approve).await
        }
        Commands::Outputs => run_outputs(&cli.state).await,
        Commands::ForceUnlock { lock_id } => run_force_unlock(&cli.state, &lock_id).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

// =============================================================================
// Commands
// =============================================================================

async fn run_validate(key_name: &str) -> Result<(), String> {
    let provider = connect().await?;
    let records = topology(&provider, key_name);

    validate_records(&records)?;
    verify_declaration_order(&records).map_err(|e| e.to_string())?;

    let managed = records.iter().filter(|r| !r.is_data_source()).count();
    let lookups = records.len() - managed;
    println!(
        "{}",
        format!(
            "Topology is valid: {} managed records, {} lookup.",
            managed, lookups
        )
        .green()
    );
    Ok(())
}

async fn run_plan(key_name: &str, state_path: &PathBuf) -> Result<(), String> {
    let provider = connect().await?;
    let records = topology(&provider, key_name);
    validate_records(&records)?;
    verify_declaration_order(&records).map_err(|e| e.to_string())?;

    let backend = LocalBackend::with_path(state_path.clone());
    let state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    let image_attrs = resolve_image_record(&provider, &records).await?;
    let current = read_current_states(&provider, &records, &state).await?;
    let binding_map = build_binding_map(&records, &state, &current, image_attrs);

    let resolved = resolve_all_refs(&records, &binding_map);
    let plan = create_plan(&resolved, &current);

    if plan.is_empty() {
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&plan);
    Ok(())
}

async fn run_apply(key_name: &str, state_path: &PathBuf) -> Result<(), String> {
    let provider = connect().await?;
    let records = topology(&provider, key_name);
    validate_records(&records)?;
    verify_declaration_order(&records).map_err(|e| e.to_string())?;

    let backend = LocalBackend::with_path(state_path.clone());
    let mut state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    let lock = backend.acquire_lock("apply").await.map_err(|e| e.to_string())?;
    let result = apply_locked(&provider, &records, &backend, &mut state).await;
    let _ = backend.release_lock(&lock).await;
    result
}

async fn apply_locked(
    provider: &AwsProvider,
    records: &[Record],
    backend: &LocalBackend,
    state: &mut StateFile,
) -> Result<(), String> {
    let image_attrs = resolve_image_record(provider, records).await?;
    let current = read_current_states(provider, records, state).await?;
    let mut binding_map = build_binding_map(records, state, &current, image_attrs);

    let resolved = resolve_all_refs(records, &binding_map);
    let plan = create_plan(&resolved, &current);

    if plan.is_empty() {
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&plan);
    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let by_id: HashMap<RecordId, &Record> = records.iter().map(|r| (r.id.clone(), r)).collect();
    let mut applied = 0;

    // Any failure aborts the run immediately; records applied so far stay in
    // the state file for the operator to inspect or retry.
    for effect in plan.effects() {
        match effect {
            Effect::Create(record) => {
                let resolved_record = resolve_record_refs(record, &binding_map);

                match provider.create(&resolved_record).await {
                    Ok(remote) => {
                        println!("  {} {}", "✓".green(), effect);
                        applied += 1;
                        persist_success(
                            backend,
                            state,
                            &mut binding_map,
                            by_id[&record.id],
                            &resolved_record,
                            &remote,
                        )
                        .await?;
                    }
                    Err(e) => {
                        println!("  {} {} - {}", "✗".red(), effect, e);
                        return Err(format!("Apply aborted after {} changes: {}", applied, e));
                    }
                }
            }
            Effect::Update { id, from, to } => {
                let resolved_record = resolve_record_refs(to, &binding_map);
                let identifier = from
                    .identifier
                    .clone()
                    .ok_or_else(|| format!("{} has no recorded identifier to update", id))?;

                match provider.update(id, &identifier, &resolved_record).await {
                    Ok(remote) => {
                        println!("  {} {}", "✓".green(), effect);
                        applied += 1;
                        persist_success(
                            backend,
                            state,
                            &mut binding_map,
                            by_id[id],
                            &resolved_record,
                            &remote,
                        )
                        .await?;
                    }
                    Err(e) => {
                        println!("  {} {} - {}", "✗".red(), effect, e);
                        return Err(format!("Apply aborted after {} changes: {}", applied, e));
                    }
                }
            }
            Effect::Delete(_) | Effect::Read(_) => {}
        }
    }

    // Read-after-create: surface the declared outputs
    let outputs = resolve_outputs(&binding_map).map_err(|e| e.to_string())?;
    state.set_outputs(outputs.clone());
    state.increment_serial();
    backend.write_state(state).await.map_err(|e| e.to_string())?;

    println!();
    println!(
        "{}",
        format!("Apply complete! {} changes applied.", applied)
            .green()
            .bold()
    );
    println!();
    println!("{}", "Outputs:".bold());
    for (name, value) in &outputs {
        println!("  {} = {}", name.cyan(), value);
    }

    Ok(())
}

async fn run_destroy(
    key_name: &str,
    state_path: &PathBuf,
    auto_approve: bool,
) -> Result<(), String> {
    let provider = connect().await?;
    let records = topology(&provider, key_name);

    let backend = LocalBackend::with_path(state_path.clone());
    let mut state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    // Dependents first, then their targets
    let order = destroy_order(&records).map_err(|e| e.to_string())?;

    let mut to_destroy = Vec::new();
    for record in order.iter().filter(|r| !r.is_data_source()) {
        if let Some(record_state) = state.find_record(&record.id.kind, &record.id.name) {
            let live = provider
                .read(&record.id, Some(record_state.identifier.as_str()))
                .await
                .map_err(|e| e.to_string())?;
            if live.exists {
                to_destroy.push((record.id.clone(), record_state.identifier.clone()));
            }
        }
    }

    if to_destroy.is_empty() {
        println!("{}", "No records to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for (id, _) in &to_destroy {
        println!("  {} {}", "-".red().bold(), id);
    }
    println!();
    println!("Plan: {} to destroy.", to_destroy.len().to_string().red());
    println!();

    if !auto_approve && !confirm_destroy()? {
        println!();
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    let lock = backend
        .acquire_lock("destroy")
        .await
        .map_err(|e| e.to_string())?;
    let result = destroy_locked(&provider, &backend, &mut state, &to_destroy).await;
    let _ = backend.release_lock(&lock).await;
    result
}

async fn destroy_locked(
    provider: &AwsProvider,
    backend: &LocalBackend,
    state: &mut StateFile,
    to_destroy: &[(RecordId, String)],
) -> Result<(), String> {
    println!("{}", "Destroying records...".red().bold());
    println!();

    let mut destroyed = 0;

    for (id, identifier) in to_destroy {
        let effect = Effect::Delete(id.clone());
        match provider.delete(id, identifier).await {
            Ok(()) => {
                println!("  {} {}", "✓".green(), effect);
                destroyed += 1;
                state.remove_record(&id.kind, &id.name);
                state.increment_serial();
                backend.write_state(state).await.map_err(|e| e.to_string())?;
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), effect, e);
                return Err(format!(
                    "Destroy aborted after {} records: {}",
                    destroyed, e
                ));
            }
        }
    }

    state.set_outputs(Default::default());
    state.increment_serial();
    backend.write_state(state).await.map_err(|e| e.to_string())?;

    println!();
    println!(
        "{}",
        format!("Destroy complete! {} records destroyed.", destroyed)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_outputs(state_path: &PathBuf) -> Result<(), String> {
    let backend = LocalBackend::with_path(state_path.clone());
    let state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "No state file found; run apply first.".to_string())?;

    if state.outputs.is_empty() {
        return Err("No outputs recorded; run apply first.".to_string());
    }

    for (name, value) in &state.outputs {
        println!("{} = {}", name.cyan(), value);
    }
    Ok(())
}

async fn run_force_unlock(state_path: &PathBuf, lock_id: &str) -> Result<(), String> {
    let backend = LocalBackend::with_path(state_path.clone());
    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", "Lock released.".green());
    Ok(())
}

// =============================================================================
// Run Preparation
// =============================================================================

async fn connect() -> Result<AwsProvider, String> {
    let provider = AwsProvider::connect().await.map_err(|e| e.to_string())?;
    println!(
        "{}",
        format!("Using AWS region {}", provider.region()).cyan()
    );
    Ok(provider)
}

fn topology(provider: &AwsProvider, key_name: &str) -> Vec<Record> {
    let config = StackConfig::new(provider.region()).with_key_name(key_name);
    desired_records(&config)
}

fn validate_records(records: &[Record]) -> Result<(), String> {
    let mut all_errors = Vec::new();

    for record in records {
        if let Some(schema) = flinklab_aws::schemas::schema_for(&record.id.kind)
            && let Err(errors) = schema.validate(&record.attributes)
        {
            for error in errors {
                all_errors.push(format!("{}: {}", record.id, error));
            }
        }

        if let Err(errors) =
            flinklab_aws::validation::validate_record(&record.id.kind, &record.attributes)
        {
            for error in errors {
                all_errors.push(format!("{}: {}", record.id, error));
            }
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors.join("\n"))
    }
}

/// Resolve the machine-image data source; its attributes feed the binding map
async fn resolve_image_record(
    provider: &AwsProvider,
    records: &[Record],
) -> Result<HashMap<String, Value>, String> {
    let image = records
        .iter()
        .find(|r| r.is_data_source())
        .ok_or_else(|| "Topology has no machine-image lookup".to_string())?;

    let get = |key: &str| {
        image
            .attributes
            .get(key)
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .ok_or_else(|| format!("{} is missing '{}'", image.id, key))
    };

    let query = ImageQuery {
        name_pattern: get("name_pattern")?,
        virtualization_type: get("virtualization_type")?,
        architecture: get("architecture")?,
        owner: get("owner")?,
    };

    let resolved = provider
        .resolve_image(&query)
        .await
        .map_err(|e| e.to_string())?;

    let mut attrs = HashMap::new();
    attrs.insert("image_id".to_string(), Value::string(&resolved.image_id));
    if let Some(name) = resolved.name {
        attrs.insert("name".to_string(), Value::string(name));
    }
    if let Some(date) = resolved.creation_date {
        attrs.insert("creation_date".to_string(), Value::string(date));
    }
    Ok(attrs)
}

/// Live-read every managed record by its recorded identifier.
///
/// Existence comes from the live read; attribute diffs run against the
/// last-applied attributes in the state file, because Cloud Control reads
/// omit several create-only properties.
async fn read_current_states(
    provider: &AwsProvider,
    records: &[Record],
    state: &StateFile,
) -> Result<HashMap<RecordId, RemoteState>, String> {
    let mut current = HashMap::new();

    for record in records {
        if record.is_data_source() {
            continue;
        }

        let record_state = state.find_record(&record.id.kind, &record.id.name);
        let live = provider
            .read(&record.id, record_state.map(|r| r.identifier.as_str()))
            .await
            .map_err(|e| e.to_string())?;

        let for_diff = match (live.exists, record_state) {
            (true, Some(record_state)) => {
                let mut attrs = HashMap::new();
                for (k, v) in &record_state.attributes {
                    if let Some(value) = json_to_value(v) {
                        attrs.insert(k.clone(), value);
                    }
                }
                let mut diff_state = RemoteState::existing(record.id.clone(), attrs);
                if let Some(identifier) = &live.identifier {
                    diff_state = diff_state.with_identifier(identifier.clone());
                }
                diff_state
            }
            _ => RemoteState::not_found(record.id.clone()),
        };

        current.insert(record.id.clone(), for_diff);
    }

    Ok(current)
}

// =============================================================================
// Reference Resolution
// =============================================================================

/// Build the binding map used to resolve reference edges: declared attributes
/// overlaid with everything already known about each record.
fn build_binding_map(
    records: &[Record],
    state: &StateFile,
    current: &HashMap<RecordId, RemoteState>,
    image_attrs: HashMap<String, Value>,
) -> HashMap<String, HashMap<String, Value>> {
    let mut binding_map: HashMap<String, HashMap<String, Value>> = HashMap::new();

    for record in records {
        let mut attrs = record.attributes.clone();

        if let Some(remote) = current.get(&record.id)
            && remote.exists
        {
            for (k, v) in &remote.attributes {
                attrs.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        if let Some(record_state) = state.find_record(&record.id.kind, &record.id.name) {
            for (k, v) in &record_state.attributes {
                if let Some(value) = json_to_value(v) {
                    attrs.entry(k.clone()).or_insert(value);
                }
            }
        }

        binding_map.insert(record.binding.clone(), attrs);
    }

    binding_map.insert("ami".to_string(), image_attrs);
    binding_map
}

/// Substitute a value's reference edges from the binding map where possible.
/// References to records that have not materialized yet stay as they are.
fn resolve_ref_value(value: &Value, binding_map: &HashMap<String, HashMap<String, Value>>) -> Value {
    match value {
        Value::Ref(binding, attribute) => match binding_map
            .get(binding)
            .and_then(|attrs| attrs.get(attribute))
        {
            Some(resolved) if !matches!(resolved, Value::Ref(_, _)) => resolved.clone(),
            _ => value.clone(),
        },
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|v| resolve_ref_value(v, binding_map))
                .collect(),
        ),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_ref_value(v, binding_map)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn resolve_record_refs(
    record: &Record,
    binding_map: &HashMap<String, HashMap<String, Value>>,
) -> Record {
    let mut resolved = record.clone();
    for (key, value) in &record.attributes {
        resolved
            .attributes
            .insert(key.clone(), resolve_ref_value(value, binding_map));
    }
    resolved
}

fn resolve_all_refs(
    records: &[Record],
    binding_map: &HashMap<String, HashMap<String, Value>>,
) -> Vec<Record> {
    records
        .iter()
        .map(|r| resolve_record_refs(r, binding_map))
        .collect()
}

// =============================================================================
// Persistence
// =============================================================================

/// Record a successful create/update: refresh the binding map with the
/// materialized attributes and write the state file.
async fn persist_success(
    backend: &LocalBackend,
    state: &mut StateFile,
    binding_map: &mut HashMap<String, HashMap<String, Value>>,
    record: &Record,
    resolved_record: &Record,
    remote: &RemoteState,
) -> Result<(), String> {
    let mut attrs = resolved_record.attributes.clone();
    for (k, v) in &remote.attributes {
        attrs.insert(k.clone(), v.clone());
    }

    let identifier = remote
        .identifier
        .clone()
        .ok_or_else(|| format!("{} was created without an identifier", record.id))?;

    let mut record_state = RecordState::new(&record.id.kind, &record.id.name, identifier);
    for (k, v) in &attrs {
        let json = value_to_json(v).map_err(|e| e.to_string())?;
        record_state.attributes.insert(k.clone(), json);
    }

    binding_map.insert(record.binding.clone(), attrs);

    state.upsert_record(record_state);
    state.increment_serial();
    backend.write_state(state).await.map_err(|e| e.to_string())
}

// =============================================================================
// Display
// =============================================================================

fn print_plan(plan: &Plan) {
    println!("{}", "Plan:".bold());
    println!();

    for effect in plan.effects() {
        let line = effect.to_string();
        match effect {
            Effect::Create(_) => println!("  {}", line.green()),
            Effect::Update { .. } => println!("  {}", line.yellow()),
            Effect::Delete(_) => println!("  {}", line.red()),
            Effect::Read(_) => println!("  {}", line),
        }
    }

    println!();
    println!("{}", plan.summary());
}

fn confirm_destroy() -> Result<bool, String> {
    println!(
        "{}",
        "Do you really want to destroy all records?".yellow().bold()
    );
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;

    Ok(input.trim() == "yes")
}
