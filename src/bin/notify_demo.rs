//! Demo that pushes a test alert through the multiplexer (stdout/log only
//! when no webhook channels are configured).

use tournament_caster::{AlertPayload, NotifierMux, Severity};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    let _ = dotenvy::dotenv();
    let mux = NotifierMux::from_env();

    let alert = AlertPayload {
        severity: Severity::Info,
        title: "notify demo".into(),
        body: "test alert from tournament-caster".into(),
        timestamp_iso: chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string(),
    };
    mux.notify(&alert).await;

    println!("notify-demo done");
}
