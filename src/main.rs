#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() {
    cli::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use backlify::api::{ApiClient, HttpTransport};
    use backlify::config::Config;
    use backlify::context::AppContext;
    use backlify::graph;
    use backlify::schema::Schema;
    use backlify::svg::SvgRenderer;
    use backlify::validate;
    use backlify::workflow;
    use std::env;
    use std::fs;
    use std::process;
    use tracing_subscriber::EnvFilter;

    #[derive(Clone, Copy)]
    enum Format {
        Graph,
        Svg,
        Schema,
    }

    impl Format {
        fn from_str(s: &str) -> Option<Self> {
            match s {
                "graph" => Some(Self::Graph),
                "svg" => Some(Self::Svg),
                "schema" => Some(Self::Schema),
                _ => None,
            }
        }
    }

    fn usage(program: &str) -> ! {
        eprintln!("Usage: {} <schema.json> [options]", program);
        eprintln!("       {} --prompt <text> [options]", program);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  -o, --output <file>   Output file (default: stdout)");
        eprintln!("  -f, --format <fmt>    Output format: graph, svg, schema (default: graph)");
        eprintln!("  -c, --config <file>   JSON config file");
        eprintln!("      --check           Validate every table and exit");
        eprintln!("      --prompt <text>   Generate the schema from a description first");
        process::exit(1);
    }

    pub async fn run() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_writer(std::io::stderr)
            .init();

        let args: Vec<String> = env::args().collect();
        if args.len() < 2 {
            usage(&args[0]);
        }

        let mut input_path: Option<String> = None;
        let mut output_path: Option<String> = None;
        let mut config_path: Option<String> = None;
        let mut prompt: Option<String> = None;
        let mut format = Format::Graph;
        let mut check = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-o" | "--output" => {
                    i += 1;
                    if i < args.len() {
                        output_path = Some(args[i].clone());
                    }
                }
                "-f" | "--format" => {
                    i += 1;
                    if i < args.len() {
                        format = Format::from_str(&args[i]).unwrap_or_else(|| {
                            eprintln!("Invalid format: {}", args[i]);
                            process::exit(1);
                        });
                    }
                }
                "-c" | "--config" => {
                    i += 1;
                    if i < args.len() {
                        config_path = Some(args[i].clone());
                    }
                }
                "--prompt" => {
                    i += 1;
                    if i < args.len() {
                        prompt = Some(args[i].clone());
                    }
                }
                "--check" => check = true,
                "-h" | "--help" => usage(&args[0]),
                arg if !arg.starts_with('-') && input_path.is_none() => {
                    input_path = Some(arg.to_string());
                }
                _ => {
                    eprintln!("Unknown option: {}", args[i]);
                    process::exit(1);
                }
            }
            i += 1;
        }

        let config = match config_path {
            Some(path) => Config::load(&path).unwrap_or_else(|e| {
                eprintln!("{}", e);
                process::exit(1);
            }),
            None => Config::default(),
        };

        let schema = match (prompt, input_path) {
            (Some(prompt), _) => {
                let client = ApiClient::new(HttpTransport::new(&config.api_base_url));
                let mut ctx = AppContext::in_memory(config.clone());
                match workflow::generate_schema(&mut ctx, &client, &prompt).await {
                    Ok(schema) => schema,
                    Err(e) => {
                        eprintln!("Generation failed: {}", e);
                        process::exit(1);
                    }
                }
            }
            (None, Some(path)) => {
                let input = match fs::read_to_string(&path) {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("Failed to read {}: {}", path, e);
                        process::exit(1);
                    }
                };
                match Schema::from_json(&input) {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("Invalid schema: {}", e);
                        process::exit(1);
                    }
                }
            }
            (None, None) => usage(&args[0]),
        };

        if check {
            let mut failed = false;
            for table in &schema.tables {
                if let Err(e) = validate::validate_table(&table.name, &table.columns) {
                    eprintln!("{}: {}", table.name, e);
                    failed = true;
                }
            }
            if failed {
                process::exit(1);
            }
            tracing::info!(tables = schema.tables.len(), "schema is valid");
            return;
        }

        let output = match format {
            Format::Graph => graph::hydrate(&schema, &config.graph).to_json(),
            Format::Svg => SvgRenderer::default().render(&graph::hydrate(&schema, &config.graph)),
            Format::Schema => schema.to_json(),
        };

        match output_path {
            Some(path) => {
                if let Err(e) = fs::write(&path, &output) {
                    eprintln!("Failed to write {}: {}", path, e);
                    process::exit(1);
                }
            }
            None => print!("{}", output),
        }
    }
}
