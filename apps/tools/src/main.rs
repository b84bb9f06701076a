use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use server_api::{create_command, delete_command, get_command, list_commands, ApiContext};
use shared::{
    domain::CommandId,
    error::{ApiError, ApiException},
    protocol::{CommandCreateDto, CommandReadDto},
};
use storage::SqliteCommanderRepo;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/commander.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert the demo commands if their ids are free.
    Seed,
    List,
    Show {
        id: i64,
    },
    Add {
        #[arg(long)]
        how_to: String,
        #[arg(long)]
        line: String,
        #[arg(long)]
        platform: String,
    },
    Delete {
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let repo = SqliteCommanderRepo::new(&cli.database_url).await?;

    let ctx = ApiContext::new(Arc::new(repo.clone()));

    match cli.command {
        Command::Seed => {
            let inserted = repo.seed_canned_commands().await?;
            println!("seeded {inserted} command(s)");
        }
        Command::List => {
            for command in list_commands(&ctx).await.map_err(exception)? {
                print_command(&command);
            }
        }
        Command::Show { id } => {
            let command = get_command(&ctx, CommandId(id)).await.map_err(exception)?;
            print_command(&command);
        }
        Command::Add {
            how_to,
            line,
            platform,
        } => {
            let created = create_command(
                &ctx,
                CommandCreateDto {
                    how_to,
                    line,
                    platform,
                },
            )
            .await
            .map_err(exception)?;
            println!("created {}", created.location);
        }
        Command::Delete { id } => {
            delete_command(&ctx, CommandId(id)).await.map_err(exception)?;
            println!("deleted command_id={id}");
        }
    }

    Ok(())
}

fn exception(err: ApiError) -> ApiException {
    err.into()
}

fn print_command(command: &CommandReadDto) {
    println!(
        "{}\t{}\t{}\t{}",
        command.id, command.how_to, command.line, command.platform
    );
}
