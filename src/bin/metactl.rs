use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "metactl")]
#[command(about = "CLI for metaplane partition management")]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:10710")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Status,
    Partition,

    #[command(subcommand)]
    DataNode(DataNodeCommands),

    #[command(subcommand)]
    StorageGroup(StorageGroupCommands),

    #[command(subcommand)]
    RegionGroup(RegionGroupCommands),
}

#[derive(Subcommand)]
enum DataNodeCommands {
    Register {
        #[arg(long)]
        id: i32,

        /// Internal endpoint as ip:port
        #[arg(long)]
        endpoint: String,
    },
}

#[derive(Subcommand)]
enum StorageGroupCommands {
    Set {
        #[arg(short, long)]
        name: String,

        #[arg(long, default_value = "1")]
        schema_replication_factor: i32,

        #[arg(long, default_value = "1")]
        data_replication_factor: i32,

        #[arg(long)]
        ttl_ms: Option<i64>,
    },
    Delete {
        #[arg(short, long)]
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupType {
    Schema,
    Data,
}

#[derive(Subcommand)]
enum RegionGroupCommands {
    Create {
        #[arg(short, long)]
        storage_group: String,

        #[arg(short = 't', long, value_enum, default_value = "data")]
        group_type: GroupType,

        #[arg(short, long)]
        region_id: i32,

        /// Replica placement as id@ip:port; repeat for each replica
        #[arg(long = "replica", required = true)]
        replicas: Vec<String>,
    },
}

fn parse_endpoint(raw: &str) -> Result<Value> {
    let (ip, port) = raw
        .rsplit_once(':')
        .with_context(|| format!("endpoint {raw:?} is not ip:port"))?;
    let port: i32 = port
        .parse()
        .with_context(|| format!("invalid port in {raw:?}"))?;
    Ok(serde_json::json!({ "ip": ip, "port": port }))
}

fn parse_replica(raw: &str) -> Result<Value> {
    let (id, endpoint) = raw
        .split_once('@')
        .with_context(|| format!("replica {raw:?} is not id@ip:port"))?;
    let id: i32 = id
        .parse()
        .with_context(|| format!("invalid data node id in {raw:?}"))?;
    Ok(serde_json::json!({
        "data_node_id": id,
        "internal_endpoint": parse_endpoint(endpoint)?,
    }))
}

async fn print_response(resp: reqwest::Response) -> Result<()> {
    let status = resp.status();
    let body: Value = resp.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        anyhow::bail!("request failed with {}", status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base_url = cli.addr;

    match cli.command {
        Commands::Status => {
            print_response(client.get(format!("{}/status", base_url)).send().await?).await?;
        }
        Commands::Partition => {
            print_response(client.get(format!("{}/partition", base_url)).send().await?).await?;
        }
        Commands::DataNode(DataNodeCommands::Register { id, endpoint }) => {
            let body = serde_json::json!({
                "data_node_id": id,
                "internal_endpoint": parse_endpoint(&endpoint)?,
            });
            let resp = client
                .post(format!("{}/data-nodes", base_url))
                .json(&body)
                .send()
                .await?;
            print_response(resp).await?;
        }
        Commands::StorageGroup(cmd) => match cmd {
            StorageGroupCommands::Set {
                name,
                schema_replication_factor,
                data_replication_factor,
                ttl_ms,
            } => {
                let body = serde_json::json!({
                    "name": name,
                    "ttl_ms": ttl_ms.unwrap_or(i64::MAX),
                    "schema_replication_factor": schema_replication_factor,
                    "data_replication_factor": data_replication_factor,
                    "time_partition_interval_ms": 604_800_000i64,
                });
                let resp = client
                    .post(format!("{}/storage-groups", base_url))
                    .json(&body)
                    .send()
                    .await?;
                print_response(resp).await?;
            }
            StorageGroupCommands::Delete { name } => {
                let resp = client
                    .delete(format!("{}/storage-groups/{}", base_url, name))
                    .send()
                    .await?;
                print_response(resp).await?;
            }
        },
        Commands::RegionGroup(RegionGroupCommands::Create {
            storage_group,
            group_type,
            region_id,
            replicas,
        }) => {
            let locations = replicas
                .iter()
                .map(|r| parse_replica(r))
                .collect::<Result<Vec<_>>>()?;
            let group_type = match group_type {
                GroupType::Schema => "SchemaRegion",
                GroupType::Data => "DataRegion",
            };
            let body = serde_json::json!({
                "region_groups": {
                    (storage_group): [{
                        "region_id": { "group_type": group_type, "id": region_id },
                        "data_node_locations": locations,
                    }]
                }
            });
            let resp = client
                .post(format!("{}/region-groups", base_url))
                .json(&body)
                .send()
                .await?;
            print_response(resp).await?;
        }
    }

    Ok(())
}
