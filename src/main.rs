use poise::serenity_prelude::{self as serenity};
use scammer_guard::{
    BOT_NAME, Config, Data, ERROR_TARGET, Error, STORE_TARGET, commands, handlers, logging,
};
use serenity::{ApplicationId, GatewayIntents, GuildId};
use tracing::{error, info};

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    logging::init()?;

    let config = Config::from_env()?;
    info!(?config, "Configuration loaded");

    // Open the record store and start its writer task
    let (data, store_task) = Data::open(&config)?;
    let store = data.store().clone();
    let guild_id = GuildId::new(config.guild_id);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            pre_command: |ctx| Box::pin(logging::log_command_start(ctx)),
            post_command: |ctx| Box::pin(logging::log_command_end(ctx)),
            on_error: |error| Box::pin(logging::on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                    .await?;
                logging::log_console(format!(
                    "Registered {} command(s) in guild {guild_id}",
                    framework.options().commands.len()
                ));
                Ok(data)
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged();
    let mut client = serenity::ClientBuilder::new(&config.token, intents)
        .application_id(ApplicationId::new(config.application_id))
        .event_handler(handlers::Handler)
        .framework(framework)
        .await?;

    // Ctrl-C stops the shards, then the store once queued writes are done
    let shard_manager = client.shard_manager.clone();
    let shutdown_store = store.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(target: ERROR_TARGET, error = %e, "Failed to listen for ctrl-c");
            return;
        }
        logging::log_console("Shutdown requested");
        shard_manager.shutdown_all().await;
        shutdown_store.shutdown().await;
    });

    info!("Starting {BOT_NAME}...");
    if let Err(err) = client.start().await {
        error!(target: ERROR_TARGET, error = %err, "Client stopped with an error");
    }

    store.shutdown().await;
    if let Err(e) = store_task.await {
        error!(target: STORE_TARGET, error = %e, "Record store task panicked");
    }

    Ok(())
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error building runtime: {err}");
            std::process::exit(1);
        }
    };

    // Handle any errors that occurred during execution
    if let Err(err) = runtime.block_on(async_main()) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
