use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use board_core::{BoardClient, DropEvent};
use shared::domain::{ContainerKind, GestureId, ProjectId, Task, TaskDraft, UserId};
use store::memory::MemoryStore;
use store::DocumentStore;

mod config;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides the configured user namespace.
    #[arg(long)]
    user: Option<String>,
    /// Overrides the configured project to select.
    #[arg(long)]
    project: Option<String>,
}

fn print_board(title: &str, views: &[(ContainerKind, Vec<Task>)]) {
    println!("== {title}");
    for (kind, view) in views {
        let titles: Vec<&str> = view.iter().map(|task| task.title.as_str()).collect();
        println!("  {kind:>10}: {titles:?}", kind = kind.as_str());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(user) = args.user {
        settings.user_id = user;
    }
    if let Some(project) = args.project {
        settings.project = project;
    }

    let store = Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>;
    let client = BoardClient::start(store, UserId::from(settings.user_id)).await?;
    tracing::info!(user = %client.user_id(), "board client ready");
    if settings.project != "default" {
        client
            .select_project(ProjectId::from(settings.project))
            .await?;
    }

    for title in ["sketch the flow", "wire the store", "ship it"] {
        client
            .create_task(TaskDraft {
                title: title.to_string(),
                description: String::new(),
            })
            .await?;
    }

    let snapshot = |client: Arc<BoardClient>| async move {
        let mut views = Vec::new();
        for kind in ContainerKind::ALL {
            views.push((kind, client.sorted_view(kind).await));
        }
        views
    };

    print_board("after creation", &snapshot(Arc::clone(&client)).await);

    // pull the last task to the top of todo
    client
        .handle_drop(DropEvent {
            gesture: GestureId::generate(),
            source: ContainerKind::Todo,
            target: ContainerKind::Todo,
            previous_index: 2,
            current_index: 0,
        })
        .await?;
    print_board("after reorder", &snapshot(Arc::clone(&client)).await);

    // start working on the first task
    client
        .handle_drop(DropEvent {
            gesture: GestureId::generate(),
            source: ContainerKind::Todo,
            target: ContainerKind::InProgress,
            previous_index: 0,
            current_index: 0,
        })
        .await?;
    print_board("after move", &snapshot(Arc::clone(&client)).await);

    Ok(())
}
