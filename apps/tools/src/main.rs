use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use server_api::{apply_command, calendar_turns, delete_template, timeline_view, ApiContext, TimelineView};
use shared::{domain::TemplateName, protocol::TimelineCommand};
use storage::{load_calendar, Storage};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "./config.json")]
    config: PathBuf,
    /// JSON calendar file; the built-in season is used when omitted.
    #[arg(long)]
    calendar: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every turn key in chronological order.
    Calendar,
    /// Print the resolved timeline. `--json` dumps the full view.
    Show {
        #[arg(long)]
        json: bool,
    },
    Assign {
        turn: String,
        template: String,
    },
    Unassign {
        turn: String,
    },
    Move {
        source: String,
        destination: String,
    },
    /// Delete a template body and every assignment that references it.
    RemoveTemplate {
        template: String,
    },
    RenameTemplate {
        from: String,
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = Storage::new(cli.config.to_string_lossy().as_ref())?;
    let ctx = ApiContext::new(storage, load_calendar(cli.calendar.as_deref())?);

    let command = match cli.command {
        Command::Calendar => {
            for turn in calendar_turns(&ctx) {
                println!("{:>3}  {}", turn.index, turn.key);
            }
            return Ok(());
        }
        Command::Show { json } => {
            let view = timeline_view(&ctx).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_view(&view);
            }
            return Ok(());
        }
        Command::RemoveTemplate { template } => {
            let template = TemplateName::from(template);
            let update = delete_template(&ctx, &template).await?;
            info!(%template, config = %cli.config.display(), "template removed");
            print_view(&update.view);
            return Ok(());
        }
        Command::Assign { turn, template } => TimelineCommand::Assign {
            turn: turn.into(),
            template: template.into(),
        },
        Command::Unassign { turn } => TimelineCommand::Unassign { turn: turn.into() },
        Command::Move {
            source,
            destination,
        } => TimelineCommand::Move {
            source: source.into(),
            destination: destination.into(),
        },
        Command::RenameTemplate { from, to } => TimelineCommand::RenameTemplate {
            from: from.into(),
            to: to.into(),
        },
    };

    let command_name = command.name();
    let update = apply_command(&ctx, command).await?;
    info!(
        command = command_name,
        config = %cli.config.display(),
        "timeline updated"
    );
    print_view(&update.view);
    Ok(())
}

fn print_view(view: &TimelineView) {
    for span in &view.spans {
        println!(
            "{:<24} {} .. {} ({} turns)",
            span.template.display_label(),
            span.start,
            span.end,
            span.len
        );
    }
    if view.spans.is_empty() {
        println!("no assignments");
    }
    for dangling in &view.dangling {
        println!("warning: {} uses unknown template '{}'", dangling.turn, dangling.template);
    }
    for key in &view.orphaned {
        println!("warning: '{key}' is not a calendar turn");
    }
}
