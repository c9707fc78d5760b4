//! End-to-end flow against the in-memory store: project lifecycle, task
//! creation, same-container reorder, cross-container move, cascade delete.

use std::sync::Arc;
use std::time::Duration;

use board_core::{BoardClient, DropEvent, DEFAULT_PROJECT};
use shared::domain::{ContainerKind, GestureId, ProjectId, Task, TaskDraft, TaskId, UserId};
use store::memory::MemoryStore;
use store::path;
use store::DocumentStore;
use tokio::time::sleep;

const WAIT: Duration = Duration::from_secs(2);

async fn wait_for_view(
    client: &BoardClient,
    kind: ContainerKind,
    predicate: impl Fn(&[Task]) -> bool,
) -> Vec<Task> {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let view = client.sorted_view(kind).await;
        if predicate(&view) {
            return view;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("view did not converge: {view:?}");
        }
        sleep(Duration::from_millis(10)).await;
    }
}

fn titles(view: &[Task]) -> Vec<&str> {
    view.iter().map(|task| task.title.as_str()).collect()
}

#[tokio::test]
async fn full_board_flow_converges() {
    let memory = Arc::new(MemoryStore::new());
    let user = UserId::from("flow-user");
    let client = BoardClient::start(memory.clone() as Arc<dyn DocumentStore>, user.clone())
        .await
        .expect("client");
    assert_eq!(
        client.current_project().await,
        Some(ProjectId::from(DEFAULT_PROJECT))
    );

    client.create_project("roadmap").await.expect("project");
    assert_eq!(
        client.current_project().await,
        Some(ProjectId::from("roadmap"))
    );

    let mut created: Vec<TaskId> = Vec::new();
    for title in ["plan", "build", "ship"] {
        let id = client
            .create_task(TaskDraft {
                title: title.to_string(),
                description: String::new(),
            })
            .await
            .expect("task");
        created.push(id);
    }

    let view = wait_for_view(&client, ContainerKind::Todo, |view| view.len() == 3).await;
    assert_eq!(titles(&view), vec!["plan", "build", "ship"]);

    // pull "ship" to the top of todo
    client
        .handle_drop(DropEvent {
            gesture: GestureId::generate(),
            source: ContainerKind::Todo,
            target: ContainerKind::Todo,
            previous_index: 2,
            current_index: 0,
        })
        .await
        .expect("reorder");
    let view = wait_for_view(&client, ContainerKind::Todo, |view| {
        titles(view) == vec!["ship", "plan", "build"]
    })
    .await;
    assert_eq!(view[0].id, created[2]);

    // start working on "plan"
    client
        .handle_drop(DropEvent {
            gesture: GestureId::generate(),
            source: ContainerKind::Todo,
            target: ContainerKind::InProgress,
            previous_index: 1,
            current_index: 0,
        })
        .await
        .expect("move");
    let in_progress =
        wait_for_view(&client, ContainerKind::InProgress, |view| view.len() == 1).await;
    assert_eq!(titles(&in_progress), vec!["plan"]);
    let todo = wait_for_view(&client, ContainerKind::Todo, |view| view.len() == 2).await;
    assert_eq!(titles(&todo), vec!["ship", "build"]);

    // the projects listing mirrors the created project
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let projects = client.projects().await;
        if projects.iter().any(|p| p.title == "roadmap") {
            break;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("projects listing never converged: {projects:?}");
        }
        sleep(Duration::from_millis(10)).await;
    }

    client.delete_project().await.expect("delete");
    assert_eq!(
        client.current_project().await,
        Some(ProjectId::from(DEFAULT_PROJECT))
    );

    // the store no longer holds the project document or its tasks
    let project = ProjectId::from("roadmap");
    let project_doc = path::project_doc(&user, &project).expect("path");
    let rx = memory
        .subscribe_document(&project_doc)
        .await
        .expect("subscribe");
    assert!(!rx.borrow().exists());
    for kind in ContainerKind::ALL {
        let collection = path::container_collection(&user, &project, kind).expect("path");
        let rx = memory
            .subscribe_collection(&collection)
            .await
            .expect("subscribe");
        assert!(rx.borrow().documents.is_empty());
    }
}
