use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use informer::modules::coordinator::{SaveAllRequest, save_all};
use informer::modules::logging::init_file_logger;
use informer::modules::requests::{
    AddRobotRequest, AddUserRequest, DeleteUserRequest, KeywordRequest, RobotData,
    UpdateRobotRequest,
};
use informer::modules::routing::route;
use informer::modules::service::UpdateService;
use informer::modules::store::ConfigStore;
use informer::modules::types::SettingsBlockKind;
use log::{LevelFilter, error};
use serde::Serialize;
use serde_json::json;

#[derive(Parser)]
#[command(
    name = "informer",
    version,
    about = "Inspect and edit the informer robot configuration without the panel"
)]
struct Cli {
    #[arg(short = 'l', long = "log-file", default_value = "informer-cli.log")]
    log_file: String,

    #[arg(short = 'c', long = "config", default_value = "./data/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the stored settings and robots as JSON
    Show,
    /// Show which robots would forward a post title and whom they would mention
    Route {
        #[arg(short, long)]
        title: String,
    },
    AddRobot {
        name: String,
        #[arg(long, default_value = "")]
        token: String,
        #[arg(long, default_value = "")]
        secret: String,
        #[arg(long)]
        receive_all: bool,
    },
    /// Change the given fields of a robot and keep the others
    UpdateRobot {
        index: usize,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        secret: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        receive_all: Option<bool>,
    },
    AddUser {
        robot_index: usize,
        phone: String,
        #[arg(long)]
        always_at: bool,
    },
    DeleteUser {
        robot_index: usize,
        phone: String,
    },
    AddKeyword {
        robot_index: usize,
        phone: String,
        keyword: String,
    },
    DeleteKeyword {
        robot_index: usize,
        phone: String,
        keyword: String,
    },
    SetWaitTime {
        min: i64,
        max: i64,
    },
    /// Submit every settings block from a JSON file shaped like the panel's save-all body
    SaveAll {
        #[arg(long)]
        from: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Command, service: &UpdateService) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Show => print_json(&*service.snapshot())?,
        Command::Route { title } => {
            let snapshot = service.snapshot();
            let dispatches = route(&snapshot.robots, &title);
            if dispatches.is_empty() {
                println!("No robot forwards {title:?}");
            }
            for dispatch in dispatches {
                println!("{dispatch}");
            }
        }
        Command::AddRobot {
            name,
            token,
            secret,
            receive_all,
        } => {
            let robot = service
                .add_robot(AddRobotRequest {
                    name,
                    token,
                    secret,
                    receive_all,
                })
                .await?;
            print_json(&robot)?;
        }
        Command::UpdateRobot {
            index,
            name,
            token,
            secret,
            enabled,
            receive_all,
        } => {
            let current = service.snapshot().robot(index)?.clone();
            let robot = service
                .update_robot(UpdateRobotRequest {
                    robot_index: index,
                    robot_data: RobotData {
                        name: name.unwrap_or(current.name),
                        token: token.unwrap_or(current.token),
                        secret: secret.unwrap_or(current.secret),
                        enabled: enabled.unwrap_or(current.enabled),
                        receive_all: receive_all.unwrap_or(current.receive_all),
                    },
                })
                .await?;
            print_json(&robot)?;
        }
        Command::AddUser {
            robot_index,
            phone,
            always_at,
        } => {
            let recipient = service
                .add_user(AddUserRequest {
                    robot_index,
                    phone,
                    always_at,
                })
                .await?;
            print_json(&recipient)?;
        }
        Command::DeleteUser { robot_index, phone } => {
            let robot = service
                .delete_user(DeleteUserRequest { robot_index, phone })
                .await?;
            print_json(&robot)?;
        }
        Command::AddKeyword {
            robot_index,
            phone,
            keyword,
        } => {
            let recipient = service
                .add_keyword(KeywordRequest {
                    robot_index,
                    phone,
                    keyword,
                })
                .await?;
            print_json(&recipient)?;
        }
        Command::DeleteKeyword {
            robot_index,
            phone,
            keyword,
        } => {
            let recipient = service
                .delete_keyword(KeywordRequest {
                    robot_index,
                    phone,
                    keyword,
                })
                .await?;
            print_json(&recipient)?;
        }
        Command::SetWaitTime { min, max } => {
            let block = service
                .update_settings_block(
                    SettingsBlockKind::WaitTime,
                    json!({ "min": min, "max": max }),
                )
                .await?;
            print_json(&block)?;
        }
        Command::SaveAll { from } => {
            let text = fs::read_to_string(&from)?;
            let request: SaveAllRequest = serde_json::from_str(&text)?;
            let report = save_all(service, request).await;
            print_json(&report)?;
            if !report.is_success() {
                return Err(report.summary().into());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_file_logger(Path::new(&cli.log_file), LevelFilter::Info)?;

    let store = ConfigStore::open(&cli.config).await?;
    let service = UpdateService::new(Arc::new(store));

    if let Err(err) = run(cli.command, &service).await {
        error!("Command failed: {err}");
        return Err(err);
    }
    Ok(())
}
