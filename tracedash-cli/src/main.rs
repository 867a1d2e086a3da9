mod cli;
mod prompts;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;

use tracedash_core::dashboard::{
    run_dashboard, ClientConfig, DashboardClient, DashboardHandle, DashboardTab, FileSnapshotStore,
    WsTransport,
};
use tracedash_core::{
    export_matrix, get_config_path, matrix_to_json, matrix_to_markdown, priority_label, ApiClient,
    Config, CoverageLevel, Dataset, ExportFormat, NewUseCase, Requirement, RequirementFilter,
    RequirementForm, RequirementStatus, RequirementType, TraceabilityMatrix,
};

use crate::cli::{Cli, Command, ConfigCommand, MatrixFormat};
use crate::view::TerminalView;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => get_config_path()?,
    };
    let mut config = Config::load_or_default(&config_path)?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }

    match &cli.command {
        Command::Matrix { file, format, output } => {
            show_matrix(&config, file.as_deref(), *format, output.as_deref()).await?;
        }
        Command::List {
            status,
            priority,
            r#type,
            title,
            file,
        } => {
            let filter = build_filter(status, priority, r#type, title)?;
            list_requirements(&config, &filter, file.as_deref()).await?;
        }
        Command::Add {
            title,
            description,
            r#type,
            priority,
            criteria,
            stakeholders,
            interactive,
        } => {
            // Default to interactive mode if no specific arguments are provided
            let should_be_interactive = *interactive
                || (title.is_none()
                    && description.is_none()
                    && r#type.is_none()
                    && priority.is_none()
                    && criteria.is_empty()
                    && stakeholders.is_none());

            let api = ApiClient::new(&config.api_url)?;
            if should_be_interactive {
                add_requirement_interactive(&api).await?;
            } else {
                let form = RequirementForm {
                    title: title.clone().unwrap_or_default(),
                    description: description.clone().unwrap_or_default(),
                    req_type: r#type
                        .clone()
                        .unwrap_or_else(|| RequirementType::Functional.as_wire().to_string()),
                    priority: priority.clone().unwrap_or_else(|| "3".to_string()),
                    acceptance_criteria: criteria.join("\n"),
                    stakeholders: stakeholders.clone().unwrap_or_default(),
                };
                submit_requirement(&api, &form).await?;
            }
        }
        Command::AddUseCase {
            title,
            description,
            actor,
            steps,
            requirements,
            priority,
        } => {
            let request = NewUseCase {
                title: title.trim().to_string(),
                description: description.trim().to_string(),
                actor: actor.trim().to_string(),
                preconditions: Vec::new(),
                postconditions: Vec::new(),
                main_flow: steps.iter().map(|s| s.trim().to_string()).collect(),
                alternative_flows: Vec::new(),
                requirements: requirements.iter().cloned().collect(),
                priority: *priority,
            };
            let api = ApiClient::new(&config.api_url)?;
            let created = api.create_use_case(&request).await?;
            println!("{}", "Use case added successfully!".green());
            println!("ID: {}", created.id.green());
        }
        Command::Trace { id } => {
            show_trace(&config, id).await?;
        }
        Command::Fetch { output } => {
            let api = ApiClient::new(&config.api_url)?;
            let dataset = api.fetch_dataset().await?;
            dataset.save(output)?;
            println!(
                "{} Saved {} requirements and {} use cases to {}",
                "✓".green(),
                dataset.requirements.len(),
                dataset.use_cases.len(),
                output.display()
            );
        }
        Command::Dashboard {
            machine,
            host,
            secure,
            offline,
        } => {
            if let Some(machine) = machine {
                config.machine_id = machine.clone();
            }
            if let Some(host) = host {
                config.dashboard_host = host.clone();
            }
            if *secure {
                config.secure = true;
            }
            run_terminal_dashboard(&config, !*offline).await?;
        }
        Command::Config(config_cmd) => {
            handle_config_command(config_cmd, &config, &config_path)?;
        }
    }

    Ok(())
}

async fn load_dataset(config: &Config, file: Option<&Path>) -> Result<Dataset> {
    match file {
        Some(path) => Dataset::load(path),
        None => {
            let api = ApiClient::new(&config.api_url)?;
            api.fetch_dataset()
                .await
                .with_context(|| format!("Failed to fetch data from {}", api.base_url()))
        }
    }
}

async fn show_matrix(
    config: &Config,
    file: Option<&Path>,
    format: MatrixFormat,
    output: Option<&Path>,
) -> Result<()> {
    let dataset = load_dataset(config, file).await?;
    let matrix = dataset.matrix();

    if let Some(path) = output {
        let export_format = match format {
            MatrixFormat::Markdown => ExportFormat::Markdown,
            MatrixFormat::Json => ExportFormat::Json,
            MatrixFormat::Table => ExportFormat::from_path(path),
        };
        export_matrix(&matrix, export_format, path)?;
        println!("{} Matrix written to {}", "✓".green(), path.display());
        return Ok(());
    }

    match format {
        MatrixFormat::Table => print_matrix_table(&matrix),
        MatrixFormat::Markdown => print!("{}", matrix_to_markdown(&matrix)),
        MatrixFormat::Json => println!("{}", matrix_to_json(&matrix)?),
    }
    Ok(())
}

fn print_matrix_table(matrix: &TraceabilityMatrix) {
    if matrix.is_empty() {
        println!("{}", "No requirements found.".yellow());
        return;
    }

    let mut header = format!("{:<10} | {:<30} | {:<3} |", "ID", "Title", "Pri");
    for uc in &matrix.use_cases {
        header.push_str(&format!(" {:<7} |", truncate(&uc.label, 7)));
    }
    header.push_str(" Coverage");
    println!("{}", header.bold());
    println!("{}", "-".repeat(header.chars().count() + 6));

    for row in &matrix.rows {
        print!(
            "{:<10} | {:<30} | {:<3} |",
            row.requirement.label(),
            truncate(&row.requirement.title, 30),
            priority_label(row.requirement.priority)
        );
        for cell in &row.coverage {
            let mark = if cell.covered { "x".green() } else { "-".dimmed() };
            print!(" {:<7} |", mark);
        }
        println!(" {}", coverage_badge(row.rounded_percentage(), row.total_coverage, row.level()));
    }

    if matrix.use_cases.is_empty() {
        println!();
        println!("{}", "No use cases found; every requirement is uncovered.".yellow());
    }
}

fn coverage_badge(percentage: u32, total: usize, level: CoverageLevel) -> colored::ColoredString {
    let text = format!("{}% ({} use cases)", percentage, total);
    match level {
        CoverageLevel::Good => text.green(),
        CoverageLevel::Warning => text.yellow(),
        CoverageLevel::Critical => text.red(),
    }
}

fn build_filter(
    status: &Option<String>,
    priority: &Option<u8>,
    req_type: &Option<String>,
    title: &Option<String>,
) -> Result<RequirementFilter> {
    Ok(RequirementFilter {
        title: title.clone(),
        req_type: req_type.as_deref().map(parse_type).transpose()?,
        priority: *priority,
        status: status.as_deref().map(parse_status).transpose()?,
    })
}

async fn list_requirements(config: &Config, filter: &RequirementFilter, file: Option<&Path>) -> Result<()> {
    let requirements: Vec<Requirement> = match file {
        Some(path) => {
            let dataset = Dataset::load(path)?;
            filter.apply(&dataset.requirements).into_iter().cloned().collect()
        }
        None => {
            let api = ApiClient::new(&config.api_url)?;
            api.list_requirements(filter).await?
        }
    };

    if requirements.is_empty() {
        println!("{}", "No requirements found.".yellow());
        return Ok(());
    }

    println!(
        "{:<10} | {:<36} | {:<15} | {:<10} | {:<8} | {:<20}",
        "ID", "Title", "Type", "Status", "Priority", "Stakeholders"
    );
    println!("{}", "-".repeat(120));

    for req in requirements {
        println!(
            "{:<10} | {:<36} | {:<15} | {:<10} | {:<8} | {:<20}",
            req.label(),
            truncate(&req.title, 36),
            req.req_type.to_string(),
            status_badge(req.status),
            priority_badge(req.priority),
            req.stakeholders.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}

fn status_badge(status: RequirementStatus) -> colored::ColoredString {
    match status {
        RequirementStatus::Draft => "Draft".yellow(),
        RequirementStatus::Review => "Review".cyan(),
        RequirementStatus::Approved => "Approved".green(),
        RequirementStatus::Implemented => "Implemented".blue(),
        RequirementStatus::Verified => "Verified".green().bold(),
        RequirementStatus::Rejected => "Rejected".red(),
        RequirementStatus::Other => "Other".dimmed(),
    }
}

fn priority_badge(priority: u8) -> colored::ColoredString {
    let label = priority_label(priority);
    match priority {
        1 | 2 => label.red(),
        3 => label.yellow(),
        _ => label.green(),
    }
}

async fn add_requirement_interactive(api: &ApiClient) -> Result<()> {
    let mut form = RequirementForm::default();

    loop {
        crate::prompts::prompt_requirement_form(&mut form)?;

        match submit_requirement(api, &form).await {
            Ok(()) => {
                form.clear();
                return Ok(());
            }
            Err(e) => {
                eprintln!("{} {}", "Error:".red().bold(), e);
                if !crate::prompts::prompt_retry()? {
                    println!("Requirement not submitted.");
                    return Ok(());
                }
            }
        }
    }
}

async fn submit_requirement(api: &ApiClient, form: &RequirementForm) -> Result<()> {
    let request = form.to_request()?;
    let created = api.create_requirement(&request).await?;
    println!("{}", "Requirement added successfully!".green());
    println!("ID: {}", created.id.green());
    Ok(())
}

async fn show_trace(config: &Config, id: &str) -> Result<()> {
    let api = ApiClient::new(&config.api_url)?;
    let trace = api.requirement_trace(id).await?;
    let req = &trace.requirement;

    println!("{} {}", req.label().blue().bold(), req.title.bold());
    println!("{}: {}", "Type".cyan(), req.req_type);
    println!("{}: {}", "Status".cyan(), status_badge(req.status));
    println!("{}: {}", "Priority".cyan(), priority_badge(req.priority));
    if !req.description.is_empty() {
        println!("\n{}", req.description);
    }

    println!("\n{}", "Use Cases:".blue());
    if trace.use_cases.is_empty() {
        println!("  {}", "None".yellow());
    }
    for uc in &trace.use_cases {
        println!("  {} {}", uc.label().green(), uc.title);
    }

    if !trace.dependencies.is_empty() {
        println!("\n{}", "Dependencies:".blue());
        for dep in &trace.dependencies {
            println!("  {}", describe_dependency(dep));
        }
    }

    Ok(())
}

/// "source -> target (type)" when the record has those keys, raw JSON otherwise
fn describe_dependency(dep: &serde_json::Value) -> String {
    let field = |key: &str| dep.get(key).and_then(|v| v.as_str());
    match (field("source_id"), field("target_id")) {
        (Some(source), Some(target)) => match field("type") {
            Some(kind) => format!("{} -> {} ({})", source, target, kind),
            None => format!("{} -> {}", source, target),
        },
        _ => dep.to_string(),
    }
}

async fn run_terminal_dashboard(config: &Config, online: bool) -> Result<()> {
    let url = config.socket_url()?;
    let cache_path = config.snapshot_cache_path()?;
    log::info!("Telemetry socket {}, cache {:?}", url, cache_path);

    let client_config = ClientConfig {
        url,
        poll_interval: config.poll_interval(),
        reconnect_delay: config.reconnect_delay(),
    };
    let client = DashboardClient::new(client_config, FileSnapshotStore::new(&cache_path), online);
    let view = TerminalView::new(std::io::stdout(), config.machine_id.clone());
    let (handle, control) = DashboardHandle::new();

    let ctrl_c = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.shutdown();
        }
    });

    // Blocking reads cannot be cancelled, so stdin gets its own thread
    let commands = handle.clone();
    std::thread::spawn(move || read_commands(commands));

    let client = run_dashboard(client, WsTransport::new(), view, control).await;
    println!();
    match client.last_snapshot() {
        Some(_) => println!("{} Last snapshot cached at {}", "✓".green(), cache_path.display()),
        None => println!("{}", "No telemetry received.".yellow()),
    }
    Ok(())
}

fn read_commands(handle: DashboardHandle) {
    for line in std::io::stdin().lines() {
        let Ok(line) = line else {
            break;
        };
        match line.trim() {
            "1" => handle.activate_tab(DashboardTab::MachineStatus),
            "2" => handle.activate_tab(DashboardTab::Requirements),
            "3" => handle.activate_tab(DashboardTab::VehicleMetrics),
            "offline" => handle.set_online(false),
            "online" => handle.set_online(true),
            "q" | "quit" => {
                handle.shutdown();
                break;
            }
            "" => {}
            other => log::warn!("Unknown command '{}'", other),
        }
    }
}

fn handle_config_command(cmd: &ConfigCommand, config: &Config, config_path: &Path) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            println!("{}", "Configuration:".blue().bold());
            println!();
            println!("{}: {}", "API URL".cyan(), config.api_url);
            println!("{}: {}", "Dashboard host".cyan(), config.dashboard_host);
            println!("{}: {}", "Secure".cyan(), config.secure);
            println!("{}: {}", "Machine".cyan(), config.machine_id);
            println!("{}: {}", "Socket".cyan(), config.socket_url()?);
            println!("{}: {}", "Cache".cyan(), config.snapshot_cache_path()?.display());
            println!("{}: {} ms", "Poll interval".cyan(), config.poll_interval_ms);
            println!("{}: {} ms", "Reconnect delay".cyan(), config.reconnect_delay_ms);
        }
        ConfigCommand::Path => {
            println!("{}", config_path.display());
        }
        ConfigCommand::Init => {
            config.save(config_path)?;
            println!("{} Configuration written to {}", "✓".green(), config_path.display());
        }
    }
    Ok(())
}

fn parse_status(status_str: &str) -> Result<RequirementStatus> {
    RequirementStatus::parse(status_str).ok_or_else(|| {
        anyhow::anyhow!("Invalid status. Use 'draft', 'review', 'approved', 'implemented', 'verified', or 'rejected'.")
    })
}

fn parse_type(type_str: &str) -> Result<RequirementType> {
    RequirementType::parse(type_str).ok_or_else(|| {
        anyhow::anyhow!("Invalid type. Use 'functional', 'non-functional', 'business', 'technical', 'security', 'performance', or 'usability'.")
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
