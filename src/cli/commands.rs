use crate::app::{AppContext, GatorError, Result};
use crate::cli::Commands;
use crate::domain::User;
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::store::Store;

/// Run one command. The current user is resolved up front for commands that
/// need one, so handlers never look at the config themselves.
pub async fn dispatch(ctx: &mut AppContext, command: Commands) -> Result<()> {
    let user = if command.requires_login() {
        Some(ctx.current_user()?)
    } else {
        None
    };

    match (command, user) {
        (Commands::Register { name }, _) => register(ctx, &name),
        (Commands::Login { name }, _) => login(ctx, &name),
        (Commands::Reset, _) => reset(ctx),
        (Commands::Users, _) => list_users(ctx),
        (
            Commands::Agg {
                interval,
                concurrency,
                timeout,
                once,
            },
            _,
        ) => {
            let config = SchedulerConfig {
                interval,
                concurrency,
                fetch_timeout: timeout,
            };
            aggregate(ctx, config, once).await
        }
        (Commands::Feeds, _) => list_feeds(ctx),
        (Commands::AddFeed { name, url }, Some(user)) => add_feed(ctx, &user, &name, &url),
        (Commands::RemoveFeed { url }, Some(user)) => remove_feed(ctx, &user, &url),
        (Commands::Follow { url }, Some(user)) => follow(ctx, &user, &url),
        (Commands::Following, Some(user)) => following(ctx, &user),
        (Commands::Unfollow { url }, Some(user)) => unfollow(ctx, &user, &url),
        (Commands::Browse { limit }, Some(user)) => browse(ctx, &user, limit),
        (_, None) => Err(GatorError::Validation(
            "this command requires a logged-in user".into(),
        )),
    }
}

pub fn register(ctx: &mut AppContext, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GatorError::Validation("user name must not be empty".into()));
    }

    let user = ctx.store.create_user(name)?;
    ctx.config.set_current_user(&user.name)?;

    println!("User {} was created and is now logged in", user.name);
    println!("  id:      {}", user.id);
    println!("  created: {}", user.created_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

pub fn login(ctx: &mut AppContext, name: &str) -> Result<()> {
    let user = ctx.store.get_user(name.trim())?;
    ctx.config.set_current_user(&user.name)?;

    println!("Logged in as {}", user.name);
    Ok(())
}

pub fn reset(ctx: &mut AppContext) -> Result<()> {
    ctx.store.reset()?;
    ctx.config.clear_current_user()?;

    println!("Database has been reset");
    Ok(())
}

pub fn list_users(ctx: &AppContext) -> Result<()> {
    let users = ctx.store.list_users()?;

    if users.is_empty() {
        println!("No users");
        return Ok(());
    }

    let current = ctx.config.current_user_name.as_deref();
    for user in users {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }

    Ok(())
}

pub async fn aggregate(ctx: &AppContext, config: SchedulerConfig, once: bool) -> Result<()> {
    let scheduler = Scheduler::new(ctx.store.clone(), ctx.fetcher.clone(), config);

    if once {
        let report = scheduler.run_tick().await?;
        println!(
            "Fetched {} feeds: {} new posts, {} errors",
            report.succeeded, report.inserted, report.failed
        );
        return Ok(());
    }

    println!(
        "Collecting feeds every {} (press Ctrl-C to stop)",
        SchedulerConfig::format_interval(scheduler.config().interval)
    );
    scheduler.run(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.list_feeds()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for entry in feeds {
        println!(
            "* {} ({}) <{}>",
            entry.feed.name, entry.feed.url, entry.owner_name
        );
    }

    Ok(())
}

pub fn add_feed(ctx: &AppContext, user: &User, name: &str, url: &str) -> Result<()> {
    let (feed, _) = ctx.subscriptions.add_feed(user, name, url)?;

    println!("Added feed: {} ({})", feed.name, feed.url);
    println!("{} is now following it", user.name);
    Ok(())
}

pub fn remove_feed(ctx: &AppContext, user: &User, url: &str) -> Result<()> {
    let feed = ctx.subscriptions.remove_feed(user, url)?;

    println!("Removed feed: {} ({})", feed.name, feed.url);
    Ok(())
}

pub fn follow(ctx: &AppContext, user: &User, url: &str) -> Result<()> {
    let (feed, _) = ctx.subscriptions.follow(user, url)?;

    println!("{} <{}>", feed.name, user.name);
    Ok(())
}

pub fn following(ctx: &AppContext, user: &User) -> Result<()> {
    let feeds = ctx.subscriptions.following(user)?;

    println!("Feeds for user: {}", user.name);
    for feed in feeds {
        println!("* {}", feed);
    }

    Ok(())
}

pub fn unfollow(ctx: &AppContext, user: &User, url: &str) -> Result<()> {
    let feed = ctx.subscriptions.unfollow(user, url)?;

    println!("Unfollowed feed '{}' for user: {}", feed.name, user.name);
    Ok(())
}

pub fn browse(ctx: &AppContext, user: &User, limit: usize) -> Result<()> {
    let posts = ctx.store.list_posts_for_user(user.id, limit)?;

    if posts.is_empty() {
        println!("No posts yet; run `gator agg` to collect some");
        return Ok(());
    }

    for post in posts {
        let date = post
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "          ".to_string());

        println!("{} {}", date, post.display_title());
        println!("           {}", post.url);
        if let Some(description) = post.description.as_deref() {
            println!("           {}", excerpt(description, 120));
        }
    }

    Ok(())
}

/// First `max_chars` characters of `text` on a single line.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
