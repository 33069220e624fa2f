mod app;
mod routes;
mod settings;

use crate::app::AppContext;

use anyhow::{Context, Result, bail};
use embykit_core::client::{ClientConfig, Credentials};
use embykit_core::navigation::NavigationDecision;
use serde_json::{Map, Value};

const USAGE: &str = "\
usage: embykit <command> [args]

commands:
  status                      session, task and version summary
  open <path>                 check whether a page may be opened
  config [name]               show settings (all, or one field)
  set <name> <json>           change one setting and save
  engines <a, b, ...>         set the translation engine order and save
  passwd <current> <new>      change the password
  watch                       follow the background task until Ctrl-C
  logout                      end the backend session
  init                        write the default client config file

Credentials are read from EMBYKIT_USER / EMBYKIT_PASSWORD when the backend
requires a login. The backend address comes from the client config file or
EMBYKIT_BASE_URL.";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().cloned() else {
        println!("{}", USAGE);
        return Ok(());
    };

    if command == "init" {
        let path = settings::get_client_config_path();
        settings::save_client_config(&ClientConfig::default())?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let config = settings::load_client_config();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("embykit-client")
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async move {
        let app = AppContext::connect(config)?;
        let result = run(&app, &command, &args[1..]).await;
        app.shutdown();
        result
    })
}

async fn run(app: &AppContext, command: &str, args: &[String]) -> Result<()> {
    app.initialize().await;
    if command == "logout" {
        return logout(app, args).await;
    }
    login_from_env(app).await?;

    match (command, args) {
        ("status", []) => print_status(app).await,
        ("open", [path]) => {
            match app.navigate(path).await {
                NavigationDecision::Proceed { route, path } => println!("ok: {} ({})", route, path),
                NavigationDecision::Redirect { to } => println!("login required: redirect to {}", to),
                NavigationDecision::NotFound => println!("no such page: {}", path),
            }
            Ok(())
        }
        ("config", []) => {
            require_settings(app).await?;
            let json = Value::Object(app.settings.snapshot().to_json());
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }
        ("config", [name]) => {
            require_settings(app).await?;
            match app.settings.snapshot().get(name) {
                Some(value) => println!("{}", value.to_json()),
                None => bail!("unknown setting: {}", name),
            }
            Ok(())
        }
        ("set", [name, raw]) => {
            require_settings(app).await?;
            let value: Value =
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            let mut edits = Map::new();
            edits.insert(name.clone(), value);
            save(app, Some(&edits)).await
        }
        ("engines", parts) if !parts.is_empty() => {
            require_settings(app).await?;
            app.settings.set_engines_text(parts.join(" "));
            save(app, None).await
        }
        ("passwd", [current, new]) => {
            app.session
                .change_password(current, new)
                .await
                .map_err(|e| anyhow::anyhow!("Password change failed: {}", e))?;
            println!("password changed");
            Ok(())
        }
        ("watch", []) => watch_tasks(app).await,
        _ => bail!("unrecognized command\n\n{}", USAGE),
    }
}

async fn logout(app: &AppContext, args: &[String]) -> Result<()> {
    if !args.is_empty() {
        bail!("unrecognized command\n\n{}", USAGE);
    }
    app.logout().await;
    println!("logged out");
    Ok(())
}

async fn login_from_env(app: &AppContext) -> Result<()> {
    if app.session.state().permits_protected_route() {
        return Ok(());
    }
    let (Ok(username), Ok(password)) = (
        std::env::var("EMBYKIT_USER"),
        std::env::var("EMBYKIT_PASSWORD"),
    ) else {
        return Ok(());
    };
    let state = app.login(Credentials::new(username, password)).await?;
    if state.must_change_password {
        eprintln!("warning: the backend requires a password change (embykit passwd)");
    }
    Ok(())
}

async fn require_settings(app: &AppContext) -> Result<()> {
    if !app.session.state().permits_protected_route() {
        bail!("not logged in (set EMBYKIT_USER and EMBYKIT_PASSWORD)");
    }
    if !app.settings.fetch().await {
        let reason = app
            .settings
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("Failed to load settings: {}", reason);
    }
    Ok(())
}

async fn save(app: &AppContext, edits: Option<&Map<String, Value>>) -> Result<()> {
    if app.settings.save(edits).await {
        println!("saved");
        Ok(())
    } else {
        let reason = app
            .settings
            .error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("Failed to save settings: {}", reason)
    }
}

async fn print_status(app: &AppContext) -> Result<()> {
    let session = app.session.state();
    match (&session.init_error, &session.username) {
        (Some(err), _) => println!("backend: unreachable ({})", err),
        (None, Some(user)) => println!("session: logged in as {}", user),
        (None, None) if !session.is_auth_required => println!("session: open access"),
        (None, None) => println!("session: not logged in"),
    }
    if session.must_change_password {
        println!("session: password change required");
    }

    if app.tasks.poll_once().await {
        let task = app.tasks.status();
        println!(
            "task: {} ({:.0}%) {}",
            task.current_action, task.progress, task.message
        );
    }

    if let Some(current) = app.about.current_version() {
        match app.about.latest_version() {
            Some(latest) if app.about.is_update_available() => {
                println!("version: {} (update available: {})", current, latest)
            }
            _ => println!("version: {}", current),
        }
    }
    Ok(())
}

async fn watch_tasks(app: &AppContext) -> Result<()> {
    app.tasks.start();
    let mut rx = app.tasks.subscribe();
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let task = rx.borrow_and_update().clone();
                println!(
                    "[{}] {} ({:.0}%) {}",
                    if task.is_running { "running" } else { "idle" },
                    task.current_action,
                    task.progress,
                    task.message
                );
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}
