//! redigraph CLI, a command-line client for FalkorDB graph servers
//!
//! Connects through the redigraph client, so Sentinel and Cluster
//! deployments are detected the same way the library does.

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use redigraph::query::{QueryOptions, QueryParam, QueryReply};
use redigraph::{GraphDb, GraphValue};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "redigraph", version, about = "FalkorDB graph client")]
struct Cli {
    /// Server URL
    #[arg(long, default_value = "falkor://127.0.0.1:6379", global = true, env = "FALKORDB_URL")]
    url: String,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a Cypher query
    Query {
        /// The Cypher query string
        cypher: String,

        /// Graph name
        #[arg(long, default_value = "default")]
        graph: String,

        /// Use read-only mode
        #[arg(long)]
        readonly: bool,

        /// Query parameter as `name=value`; may be repeated
        #[arg(long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,

        /// Server-side timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// List graphs on the server
    List,
    /// Show the execution plan of a query
    Explain {
        cypher: String,

        #[arg(long, default_value = "default")]
        graph: String,
    },
    /// Run a query and show its profiled plan
    Profile {
        cypher: String,

        #[arg(long, default_value = "default")]
        graph: String,
    },
    /// Show the slowest recent queries of a graph
    Slowlog {
        #[arg(long, default_value = "default")]
        graph: String,
    },
    /// Show server INFO
    Info {
        /// INFO section, e.g. `server`
        section: Option<String>,
    },
    /// Start an interactive REPL
    Shell {
        #[arg(long, default_value = "default")]
        graph: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = match GraphDb::connect_url(&cli.url).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let format = cli.format;
    let result = match cli.command {
        Commands::Query { cypher, graph, readonly, params, timeout } => {
            match query_options(&params, timeout) {
                Ok(options) => run_query(&db, &graph, &cypher, readonly, &options, format).await,
                Err(e) => Err(e),
            }
        }
        Commands::List => run_list(&db, format).await,
        Commands::Explain { cypher, graph } => run_plan(&db, &graph, &cypher, false).await,
        Commands::Profile { cypher, graph } => run_plan(&db, &graph, &cypher, true).await,
        Commands::Slowlog { graph } => run_slowlog(&db, &graph, format).await,
        Commands::Info { section } => run_info(&db, section.as_deref(), format).await,
        Commands::Shell { graph } => run_shell(&db, &graph, format).await,
    };

    db.close().await;
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn query_options(params: &[String], timeout: Option<u64>) -> Result<QueryOptions, Box<dyn std::error::Error>> {
    let mut options = QueryOptions::new();
    for param in params {
        let (name, value) = param
            .split_once('=')
            .ok_or_else(|| format!("invalid parameter '{}', expected NAME=VALUE", param))?;
        options = options.with_param(name.trim(), parse_param(value.trim()));
    }
    if let Some(ms) = timeout {
        options = options.with_timeout(ms);
    }
    Ok(options)
}

/// Numbers, booleans and `null` are typed; anything else is a string,
/// with one layer of surrounding quotes removed
fn parse_param(value: &str) -> QueryParam {
    if let Ok(i) = value.parse::<i64>() {
        return QueryParam::from(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        return QueryParam::from(f);
    }
    match value {
        "true" => QueryParam::from(true),
        "false" => QueryParam::from(false),
        "null" => QueryParam::Null,
        _ => {
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            QueryParam::from(unquoted)
        }
    }
}

async fn run_query(
    db: &GraphDb,
    graph: &str,
    cypher: &str,
    readonly: bool,
    options: &QueryOptions,
    format: OutputFormat,
) -> CliResult {
    let graph = db.select_graph(graph);
    let reply = if readonly {
        graph.ro_query_with(cypher, options).await?
    } else {
        graph.query_with(cypher, options).await?
    };
    print_reply(&reply, format)
}

fn print_reply(reply: &QueryReply, format: OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reply)?);
        }
        OutputFormat::Csv => {
            if let (Some(headers), Some(rows)) = (&reply.headers, &reply.data) {
                println!("{}", headers.join(","));
                for row in rows {
                    let cells: Vec<String> = row.values().map(format_csv_value).collect();
                    println!("{}", cells.join(","));
                }
            }
        }
        OutputFormat::Table => {
            match (&reply.headers, &reply.data) {
                (Some(headers), Some(rows)) => {
                    let mut table = Table::new();
                    table.set_content_arrangement(ContentArrangement::Dynamic);
                    table.set_header(headers);

                    for row in rows {
                        let cells: Vec<String> = row.values().map(|v| v.to_string()).collect();
                        table.add_row(cells);
                    }

                    println!("{}", table);
                    println!("{} row(s)", rows.len());
                }
                _ => println!("(no results)"),
            }
            for line in &reply.metadata {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

async fn run_list(db: &GraphDb, format: OutputFormat) -> CliResult {
    let graphs = db.list().await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&graphs)?),
        _ => {
            for name in graphs {
                println!("{}", name);
            }
        }
    }
    Ok(())
}

async fn run_plan(db: &GraphDb, graph: &str, cypher: &str, profile: bool) -> CliResult {
    let graph = db.select_graph(graph);
    let plan = if profile {
        graph.profile(cypher).await?
    } else {
        graph.explain(cypher).await?
    };
    for line in plan {
        println!("{}", line);
    }
    Ok(())
}

async fn run_slowlog(db: &GraphDb, graph: &str, format: OutputFormat) -> CliResult {
    let entries = db.select_graph(graph).slow_log().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Csv => {
            println!("timestamp,command,query,took_ms");
            for entry in &entries {
                println!(
                    "{},{},{},{}",
                    entry.timestamp.to_rfc3339(),
                    entry.command,
                    csv_escape(&entry.query),
                    entry.took
                );
            }
        }
        OutputFormat::Table => {
            if entries.is_empty() {
                println!("(no slow queries)");
                return Ok(());
            }
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Timestamp", "Command", "Query", "Took (ms)"]);
            for entry in &entries {
                table.add_row(vec![
                    entry.timestamp.to_rfc3339(),
                    entry.command.clone(),
                    entry.query.clone(),
                    format!("{:.3}", entry.took),
                ]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

async fn run_info(db: &GraphDb, section: Option<&str>, format: OutputFormat) -> CliResult {
    let info = db.info(section).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        _ => match info.as_object() {
            Some(fields) => {
                for (key, value) in fields {
                    match value {
                        serde_json::Value::String(s) => println!("{}: {}", key, s),
                        other => println!("{}: {}", key, other),
                    }
                }
            }
            None => println!("{}", info),
        },
    }
    Ok(())
}

async fn run_shell(db: &GraphDb, graph: &str, format: OutputFormat) -> CliResult {
    println!("redigraph interactive shell ({} topology)", db.topology());
    println!("Type Cypher queries, or :help for commands. :quit to exit.\n");

    let stdin = std::io::stdin();
    let mut line = String::new();
    let mut current = graph.to_string();
    let mut readonly = false;

    loop {
        eprint!("{}> ", current);

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let outcome = match trimmed.split_once(' ').unwrap_or((trimmed, "")) {
            (":quit" | ":exit" | ":q", _) => break,
            (":help" | ":h", _) => {
                println!("Commands:");
                println!("  :use <graph>      Switch the current graph");
                println!("  :list             List graphs");
                println!("  :readonly         Toggle read-only queries");
                println!("  :explain <cypher> Show the execution plan");
                println!("  :profile <cypher> Run and show the profiled plan");
                println!("  :slowlog          Show slow queries of the current graph");
                println!("  :quit             Exit shell");
                println!("  <cypher>          Execute a Cypher query");
                Ok(())
            }
            (":use", name) if !name.trim().is_empty() => {
                current = name.trim().to_string();
                Ok(())
            }
            (":list", _) => run_list(db, format).await,
            (":readonly", _) => {
                readonly = !readonly;
                println!("read-only: {}", readonly);
                Ok(())
            }
            (":explain", cypher) => run_plan(db, &current, cypher, false).await,
            (":profile", cypher) => run_plan(db, &current, cypher, true).await,
            (":slowlog", _) => run_slowlog(db, &current, format).await,
            _ => run_query(db, &current, trimmed, readonly, &QueryOptions::new(), format).await,
        };

        if let Err(e) = outcome {
            eprintln!("Error: {}", e);
        }
    }

    println!("Bye!");
    Ok(())
}

fn format_csv_value(v: &GraphValue) -> String {
    match v {
        GraphValue::Null => String::new(),
        GraphValue::String(s) => csv_escape(s),
        GraphValue::Integer(_) | GraphValue::Double(_) | GraphValue::Boolean(_) => v.to_string(),
        other => csv_escape(&other.to_json().to_string()),
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
