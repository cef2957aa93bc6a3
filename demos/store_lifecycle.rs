use scammer_guard::store::{NewScammer, RecordStore, Removal, StoreHandle, StorePaths};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("Scammer Store Lifecycle");
    println!("-----------------------");

    let dir = tempfile::tempdir()?;
    let paths = StorePaths::in_dir(dir.path());
    let (store, task) = StoreHandle::spawn(RecordStore::open(paths.clone())?);

    let user_id = 12345;
    let guild_id = 67890;

    // 1. Mark the user
    let entry = store
        .add_scammer(NewScammer {
            user_id,
            username: "mallory".to_string(),
            reason: "phishing".to_string(),
            added_by: "alice".to_string(),
            added_by_id: 1,
            guild_id,
        })
        .await?;
    println!("Added: {entry}");

    let active = store.active_scammer(user_id, guild_id).await?;
    println!("Active entry present: {}", active.is_some());

    // 2. Reverse it
    let removed = store
        .remove_scammer(
            user_id,
            guild_id,
            Removal {
                removed_by: "bob".to_string(),
                removed_by_id: 2,
                reason: "mistake".to_string(),
            },
        )
        .await?;
    println!("Removed: {removed:?}");

    let active = store.active_scammer(user_id, guild_id).await?;
    println!("Active entry present: {}", active.is_some());
    println!(
        "Entries kept for the guild: {}",
        store.guild_scammers(guild_id, false).await?.len()
    );

    // 3. Show what landed on disk
    println!("\n{}:", paths.scammers.display());
    println!("{}", std::fs::read_to_string(&paths.scammers)?);

    store.shutdown().await;
    task.await?;
    println!("Store task stopped");
    Ok(())
}
