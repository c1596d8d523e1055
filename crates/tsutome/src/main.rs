//! `tsutome-server`: serves the Tsutome API with demo data.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tsutome::prelude::*;

#[tokio::main]
async fn main() -> Result<(), TsutomeError> {
    // A missing .env is fine; real deployments set the environment directly.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("ignoring unreadable .env: {e}");
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tsutome=info,tsutome_session=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        secure_cookie = config.secure_cookie,
        "starting Tsutome"
    );

    let accounts = AccountDirectory::new();
    let admin = accounts.register("AdminTsutome", "AdminTsutome", Role::Admin)?;
    let hero = accounts.register("hero", "hero", Role::Player)?;

    let server = TsutomeServerBuilder::from_config(config).build(accounts).await?;
    seed_quests(server.quests(), admin.id, hero.id);

    tracing::info!(addr = %server.local_addr()?, "listening");
    server.run().await
}

fn seed_quests(board: &QuestBoard, admin: PlayerId, hero: PlayerId) {
    board.add_tsutome(hero, "Wash the dishes", "Grease Slime");
    board.add_tsutome(hero, "File the tax return", "Paper Golem");
    board.add_shuren(hero, "Morning stretch");
    board.add_shuren(hero, "Read 20 pages");
    board.add_tsutome(admin, "Review new players", "Backlog Hydra");
}
