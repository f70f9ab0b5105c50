use colored::Colorize;
use harvestflow_build::BuildSettings;
use harvestflow_cloud::ResourceClient;
use std::path::Path;

pub async fn handle(config_path: Option<&Path>, check_auth: bool) -> anyhow::Result<()> {
    println!("{}", "Validating configuration...".blue());

    let (path, config) = match harvestflow_config::load_resolved(config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Configuration error".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let settings = BuildSettings::from_config(&config);
    if let Err(e) = settings.validate() {
        eprintln!();
        eprintln!("{}", "✗ Configuration error".red().bold());
        eprintln!("  {}", e);
        std::process::exit(1);
    }

    println!("Config file: {}", path.display().to_string().cyan());
    println!("{}", "✓ Configuration is valid".green().bold());
    println!();
    println!("Summary:");
    println!("  Endpoint:  {}", config.harvester_url.cyan());
    if config.harvester_insecure {
        println!("             {}", "(TLS verification disabled)".yellow());
    }

    let source = match &settings.image.url {
        Some(url) => url.as_str(),
        None => "(existing image)",
    };
    println!(
        "  Image:     {}/{} from {}",
        settings.image.namespace,
        settings.image.name.cyan(),
        source
    );
    if let Some(checksum) = &settings.image.checksum {
        println!("  Checksum:  {}", checksum);
    }
    println!(
        "  Builder:   {} CPU, {} memory, {} disk in {}",
        settings.cpu_cores,
        settings.memory,
        settings.volume_size,
        settings.namespace.cyan()
    );
    println!("  Network:   {}", settings.network);
    println!(
        "  Timeouts:  image {}s, vm {}s, teardown {}s",
        settings.image_wait.timeout.as_secs(),
        settings.vm_wait.timeout.as_secs(),
        settings.teardown_wait.timeout.as_secs()
    );

    if check_auth {
        println!();
        let client = super::connect(&config)?;
        let status = client.check_auth().await?;
        if status.authenticated {
            println!(
                "{} {}",
                "✓ Authenticated:".green().bold(),
                status.account_info.unwrap_or_default()
            );
        } else {
            eprintln!("{}", "✗ Authentication failed".red().bold());
            eprintln!("  {}", status.error.unwrap_or_default());
            std::process::exit(1);
        }
    }

    Ok(())
}
