use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{debug, error, info};

use docstore::{
    Ctx, DocumentStore, Repository, marshal, params,
    types::{self, Document},
};

#[derive(Parser, Debug)]
#[command(version, about = "Command line access to a document store")]
struct Cli {
    /// Connection URI (overrides DOCSTORE_URI)
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Database name (overrides DOCSTORE_DATABASE)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Operation timeout in milliseconds (overrides DOCSTORE_DEFAULT_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the primary is reachable
    Ping,

    /// Count documents matching a filter
    Count {
        collection: String,
        #[arg(long, default_value = "{}")]
        filter: String,
    },

    /// Fetch the first document matching a filter
    Get {
        collection: String,
        #[arg(long, default_value = "{}")]
        filter: String,
        /// Field to omit from the result, can be repeated
        #[arg(long = "exclude")]
        excluded: Vec<String>,
    },

    /// Fetch documents matching a filter
    Find {
        collection: String,
        #[arg(long, default_value = "{}")]
        filter: String,
        /// Maximum number of documents, 0 for no limit
        #[arg(long, default_value_t = 0)]
        limit: i64,
        /// Field to omit from the results, can be repeated
        #[arg(long = "exclude")]
        excluded: Vec<String>,
        /// Sort specification, e.g. '{"age": -1}'
        #[arg(long, default_value = "{}")]
        sort: String,
    },

    /// Insert a JSON object, or an array of objects
    Insert { collection: String, documents: String },

    /// Apply update operators to matching documents
    Update {
        collection: String,
        filter: String,
        update: String,
        /// Update every match instead of the first one
        #[arg(long)]
        many: bool,
    },

    /// Delete matching documents
    Delete {
        collection: String,
        filter: String,
        /// Delete every match instead of the first one
        #[arg(long)]
        many: bool,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("configuration error :: {0}")]
    Config(#[from] params::Error),
    #[error("input error :: {0}")]
    Input(#[from] marshal::Error),
    #[error("repository error :: {0}")]
    Repository(#[from] docstore::Error),
    #[error("output error :: {0}")]
    Output(#[from] serde_json::Error),
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_documents(docs: Vec<Document>) -> Result<(), CliError> {
    let values = docs.into_iter().map(marshal::document_to_json).collect();
    print_json(&serde_json::Value::Array(values))
}

async fn execute(repo: &Repository, ctx: &Ctx, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Ping => {
            let alive = repo.ping(ctx).await?;
            print_json(&serde_json::json!({ "ok": alive }))?;
        }

        Commands::Count { collection, filter } => {
            let filter = marshal::document_from_json_str(&filter)?;
            let count = repo.count(ctx, &collection, filter).await?;
            print_json(&serde_json::json!({ "count": count }))?;
        }

        Commands::Get {
            collection,
            filter,
            excluded,
        } => {
            let filter = marshal::document_from_json_str(&filter)?;
            let doc: Document = repo
                .fetch_one(ctx, &collection, filter, types::exclude(excluded))
                .await?;
            print_json(&marshal::document_to_json(doc))?;
        }

        Commands::Find {
            collection,
            filter,
            limit,
            excluded,
            sort,
        } => {
            let filter = marshal::document_from_json_str(&filter)?;
            let sort = marshal::document_from_json_str(&sort)?;
            let docs: Vec<Document> = repo
                .fetch_many(
                    ctx,
                    &collection,
                    filter,
                    limit,
                    types::exclude(excluded),
                    sort,
                )
                .await?;
            print_documents(docs)?;
        }

        Commands::Insert {
            collection,
            documents,
        } => {
            let mut docs = marshal::documents_from_json_str(&documents)?;
            let ids = if docs.len() == 1 {
                let doc = docs.remove(0);
                vec![repo.save_one(ctx, &collection, &doc).await?]
            } else {
                repo.save_many(ctx, &collection, &docs).await?
            };
            info!("inserted #{} documents into `{}`", ids.len(), collection);
            print_json(&serde_json::json!({ "inserted_ids": ids }))?;
        }

        Commands::Update {
            collection,
            filter,
            update,
            many,
        } => {
            let filter = marshal::document_from_json_str(&filter)?;
            let update = marshal::document_from_json_str(&update)?;
            let modified = if many {
                repo.update_many(ctx, &collection, filter, update).await?
            } else {
                repo.update_one(ctx, &collection, filter, update).await?
            };
            print_json(&serde_json::json!({ "modified": modified }))?;
        }

        Commands::Delete {
            collection,
            filter,
            many,
        } => {
            let filter = marshal::document_from_json_str(&filter)?;
            let deleted = if many {
                repo.delete_many(ctx, &collection, filter).await?
            } else {
                repo.delete_one(ctx, &collection, filter).await?
            };
            print_json(&serde_json::json!({ "deleted": deleted }))?;
        }
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let conf = params::load()?;

    let uri = cli.uri.as_deref().unwrap_or(&conf.uri);
    let database = cli.database.as_deref().unwrap_or(&conf.database);

    let repo = Repository::connect(uri, database).await?;

    // the deadline starts once the connection is up
    let mut ctx = Ctx::background();
    if let Some(timeout) = cli.timeout_ms.map(Duration::from_millis).or(conf.default_timeout) {
        debug!("operation timeout set to {:?}", timeout);
        ctx = ctx.with_timeout(timeout);
    }

    let result = execute(&repo, &ctx, cli.command).await;

    repo.disconnect().await;

    result
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
