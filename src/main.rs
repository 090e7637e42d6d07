use std::sync::Arc;
use std::time::Duration;

use dashboard_engine::collab::{LocalRelay, Transport, UserInfo};
use dashboard_engine::config::EngineConfig;
use dashboard_engine::data::DataRequest;
use dashboard_engine::geometry::Point;
use dashboard_engine::repo::{DashboardRepository, MemoryRepository};
use dashboard_engine::workspace::{DropPayload, Workspace};

const DATA_WAIT_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = EngineConfig::from_env()?;
    let repo: Arc<dyn DashboardRepository> = Arc::new(MemoryRepository::new());
    let relay: Arc<dyn Transport> = Arc::new(LocalRelay::new());

    let mut alice = Workspace::open(&config, repo.clone(), Some(relay.clone()))?;
    let bob_config = EngineConfig { user: UserInfo::new("bob", "#2f80ed"), ..config.clone() };
    let mut bob = Workspace::open(&bob_config, repo, Some(relay))?;
    alice.pump_remote();
    bob.pump_remote();

    // Alice builds the dashboard and saves it so Bob can load the same widgets.
    let payload = DropPayload::from([("widgetType".to_owned(), "chart".to_owned())]);
    let chart = alice.on_drop(&payload, Point::new(40.0, 40.0));
    alice.add_widget_of_kind("metric")?;
    alice.save()?;
    bob.load_dashboard(&config.dashboard_id)?;
    alice.pump_remote();
    bob.pump_remote();

    if let Some(chart) = chart.as_deref() {
        alice.attach_data(chart, DataRequest::default())?;
        if let Some(handle) = alice.widget_data(chart) {
            let mut rx = handle.subscribe();
            tokio::time::timeout(Duration::from_secs(DATA_WAIT_SECS), rx.wait_for(|s| s.data.is_some())).await??;
        }

        // Drag the chart 100px right; Bob sees the preview and the final layout.
        alice.on_pointer_down(Point::new(100.0, 100.0));
        alice.on_pointer_move(Point::new(200.0, 100.0));
        alice.on_pointer_up();
        bob.pump_remote();
    }

    println!("--- alice ---\n{}", alice.render());
    println!("--- bob ---\n{}", bob.render());
    for user in bob.users().values() {
        println!("present: {} ({}) {}", user.id, user.color, user.name);
    }

    alice.close();
    bob.close();
    Ok(())
}
