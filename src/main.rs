mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_stream::StreamExt;

use cli::{Cli, Commands};
use mf_core::config::Config;
use mf_pipeline::Rendered;
use mf_server::context::AppContext;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise use defaults based on the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediaforge=trace,mf_server=debug,mf_pipeline=debug,mf_parser=debug,mf_av=debug,tower_http=debug".to_string()
        } else {
            "mediaforge=info,mf_server=info,mf_pipeline=info,mf_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let mut config = Config::load_or_default(cli.config.as_deref());
    if let Some(storage) = cli.storage {
        config.storage.root = storage;
    }

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            tracing::info!("Starting mediaforge server");
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(mf_server::start(config))?;
            Ok(())
        }
        Commands::Parse { url, json } => parse_url(&url, json),
        Commands::Render { url, output } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(render(config, &url, &output))
        }
        Commands::CheckTools => check_tools(&config),
        Commands::Validate => validate_config(cli.config.as_deref(), &config),
        Commands::Version => {
            println!("mediaforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Accept either a bare path or a full URL.
fn request_path(url: &str) -> &str {
    match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => url,
    }
}

fn parse_url(url: &str, json: bool) -> Result<()> {
    let parsed = mf_parser::parse(request_path(url))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    println!("Domain: {}", parsed.domain().unwrap_or("(none)"));
    println!("Asset: {}", parsed.public_id());
    if parsed.chain().is_empty() {
        println!("No transformations");
    }
    for (i, spec) in parsed.chain().iter().enumerate() {
        println!("  {}. {spec}", i + 1);
    }
    Ok(())
}

async fn render(config: Config, url: &str, output: &Path) -> Result<()> {
    let ctx = AppContext::from_config(config);
    let (domain, asset, chain) = mf_parser::parse(request_path(url))?.into_parts();

    let route = ctx.dispatcher.route(domain.as_deref(), &asset)?;
    let source = ctx.assets.read_asset(asset.public_id()).await?;
    let rendered = ctx
        .dispatcher
        .execute(route, source, &chain, ctx.assets.as_ref())
        .await?;

    let mime = rendered.mime();
    let written = match rendered {
        Rendered::Image { bytes, .. } => {
            tokio::fs::write(output, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            bytes.len()
        }
        Rendered::Video { job, .. } => {
            let (sink, mut stream) = ctx.dispatcher.video().sink();
            let transcode = tokio::spawn(job.run(sink));

            let mut data = Vec::new();
            while let Some(chunk) = stream.next().await {
                data.extend_from_slice(&chunk?);
            }
            transcode.await?;

            tokio::fs::write(output, &data)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            data.len()
        }
    };

    println!("Wrote {written} bytes ({mime}) to {}", output.display());
    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = mf_av::ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Image transformations work; video requests will fail.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>, config: &Config) -> Result<()> {
    match path {
        Some(p) => println!("Validating config: {}", p.display()),
        None => println!("No config file given; validating defaults"),
    }

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("Configuration is valid");
        return Ok(());
    }

    for warning in &warnings {
        println!("  warning: {warning}");
    }
    anyhow::bail!("{} configuration warning(s)", warnings.len())
}
